//! XSD element declarations

use crate::error::{Error, Result, ValidationError};
use crate::namespaces::QName;
use std::fmt;
use std::sync::Arc;

use super::complex_types::ComplexType;
use super::identities::IdentityConstraint;
use super::particles::Occurs;
use super::schemas::DerivationSet;
use super::simple_types::SimpleType;
use super::Link;

/// A type definition: simple or complex
#[derive(Debug, Clone)]
pub enum TypeDef {
    /// Simple type
    Simple(Arc<SimpleType>),
    /// Complex type (possibly a back-reference to a type still compiling)
    Complex(Link<ComplexType>),
}

impl TypeDef {
    /// Type name, None for anonymous types
    pub fn name(&self) -> Option<QName> {
        match self {
            TypeDef::Simple(simple) => simple.name.clone(),
            TypeDef::Complex(link) => link.get().and_then(|complex| complex.name.clone()),
        }
    }

    /// Check if this is a simple type
    pub fn is_simple(&self) -> bool {
        matches!(self, TypeDef::Simple(_))
    }

    /// Get the simple type
    pub fn as_simple(&self) -> Option<&Arc<SimpleType>> {
        match self {
            TypeDef::Simple(simple) => Some(simple),
            TypeDef::Complex(_) => None,
        }
    }

    /// Get the complex type
    pub fn as_complex(&self) -> Option<Arc<ComplexType>> {
        match self {
            TypeDef::Simple(_) => None,
            TypeDef::Complex(link) => link.get(),
        }
    }

    /// Check if both handles denote the same compiled type
    pub fn same_type(&self, other: &TypeDef) -> bool {
        match (self, other) {
            (TypeDef::Simple(a), TypeDef::Simple(b)) => Arc::ptr_eq(a, b),
            (TypeDef::Complex(a), TypeDef::Complex(b)) => a.same_target(b),
            _ => false,
        }
    }

    /// Check a text value against this type
    pub fn validate_text(&self, value: &str) -> std::result::Result<(), ValidationError> {
        match self {
            TypeDef::Simple(simple) => simple.validate(value),
            TypeDef::Complex(link) => match link.get() {
                Some(complex) => complex.validate_text(value),
                None => Err(ValidationError::new("type definition is no longer available")),
            },
        }
    }
}

impl From<Arc<SimpleType>> for TypeDef {
    fn from(simple: Arc<SimpleType>) -> Self {
        TypeDef::Simple(simple)
    }
}

impl From<Arc<ComplexType>> for TypeDef {
    fn from(complex: Arc<ComplexType>) -> Self {
        TypeDef::Complex(Link::Resolved(complex))
    }
}

impl fmt::Display for TypeDef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.name() {
            Some(name) => write!(f, "{}", name),
            None if self.is_simple() => write!(f, "anonymous simple type"),
            None => write!(f, "anonymous complex type"),
        }
    }
}

/// A compiled element declaration
#[derive(Debug, Clone)]
pub struct Element {
    /// Element name
    pub name: QName,
    /// Element type
    pub type_def: TypeDef,
    /// Whether xsi:nil is allowed
    pub nillable: bool,
    /// Abstract elements only appear through substitution
    pub is_abstract: bool,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
    /// Head of the substitution group this element belongs to
    pub substitution_group: Option<Link<Element>>,
    /// Blocked substitutions
    pub block: DerivationSet,
    /// Final derivations
    pub final_set: DerivationSet,
    /// Identity constraints (key, keyref, unique)
    pub identities: Vec<IdentityConstraint>,
}

impl Element {
    /// Create an element with the given type and default properties
    pub fn new(name: QName, type_def: TypeDef) -> Self {
        Self {
            name,
            type_def,
            nillable: false,
            is_abstract: false,
            default: None,
            fixed: None,
            substitution_group: None,
            block: DerivationSet::default(),
            final_set: DerivationSet::default(),
            identities: Vec::new(),
        }
    }

    /// Set the value constraint, checking default/fixed consistency
    pub fn with_value_constraint(
        mut self,
        default: Option<String>,
        fixed: Option<String>,
    ) -> Result<Self> {
        if default.is_some() && fixed.is_some() {
            return Err(Error::malformed(format!(
                "element '{}' has both 'default' and 'fixed'",
                self.name
            )));
        }
        self.default = default;
        self.fixed = fixed;
        Ok(self)
    }

    /// Default or fixed value
    pub fn value_constraint(&self) -> Option<&str> {
        self.fixed.as_deref().or(self.default.as_deref())
    }

    /// Get the complex type, if the element has one
    pub fn complex_type(&self) -> Option<Arc<ComplexType>> {
        self.type_def.as_complex()
    }

    /// Get the substitution group head
    pub fn substitution_head(&self) -> Option<Arc<Element>> {
        self.substitution_group.as_ref().and_then(Link::get)
    }
}

/// An element particle in a content model
#[derive(Debug, Clone)]
pub struct ElementParticle {
    /// Element name (the referenced name for `ref` particles)
    pub name: QName,
    /// Occurrence bounds
    pub occurs: Occurs,
    /// The declaration
    pub element: Link<Element>,
}

impl ElementParticle {
    /// Get the declaration
    pub fn declaration(&self) -> Option<Arc<Element>> {
        self.element.get()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::builtins::{any_type, builtin_simple_type};

    #[test]
    fn test_type_def_identity() {
        let string = builtin_simple_type("string").unwrap();
        let a = TypeDef::from(Arc::clone(&string));
        let b = TypeDef::Simple(string);
        assert!(a.same_type(&b));
        assert!(!a.same_type(&TypeDef::from(any_type())));
        assert_eq!(
            TypeDef::from(any_type()).name().map(|n| n.local_name),
            Some("anyType".to_string())
        );
    }

    #[test]
    fn test_value_constraint() {
        let string = TypeDef::Simple(builtin_simple_type("string").unwrap());
        let element = Element::new(QName::local("e"), string.clone())
            .with_value_constraint(None, Some("x".into()))
            .unwrap();
        assert_eq!(element.value_constraint(), Some("x"));

        let result = Element::new(QName::local("e"), string)
            .with_value_constraint(Some("a".into()), Some("b".into()));
        assert!(matches!(result, Err(Error::MalformedAttribute(_))));
    }

    #[test]
    fn test_validate_text() {
        let int = TypeDef::Simple(builtin_simple_type("int").unwrap());
        assert!(int.validate_text("42").is_ok());
        assert!(int.validate_text("forty-two").is_err());
    }
}
