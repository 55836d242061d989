//! XSD complex types

use crate::error::ValidationError;
use crate::namespaces::QName;
use std::fmt;
use std::sync::Arc;

use super::attributes::AttributeSet;
use super::elements::TypeDef;
use super::groups::ElementGrouping;
use super::schemas::DerivationSet;
use super::simple_types::SimpleType;
use super::wildcards::AnyAttribute;

/// Derivation method of a complex type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivationMethod {
    /// Content and attributes appended to the base
    Extension,
    /// Content and attributes replaced under tighter constraints
    Restriction,
}

impl fmt::Display for DerivationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extension => write!(f, "extension"),
            Self::Restriction => write!(f, "restriction"),
        }
    }
}

/// Content of a complex type
#[derive(Debug, Clone, Default)]
pub enum ContentModel {
    /// No child elements, no text
    #[default]
    Empty,
    /// Child elements described by a grouping
    Elements(ElementGrouping),
    /// Text content of a simple type
    Simple(Arc<SimpleType>),
}

/// A compiled complex type
#[derive(Debug, Clone)]
pub struct ComplexType {
    /// Type name (None for anonymous types)
    pub name: Option<QName>,
    /// Base type for derived types
    pub base: Option<TypeDef>,
    /// How this type was derived from its base
    pub derivation: Option<DerivationMethod>,
    /// Abstract types cannot be used directly
    pub is_abstract: bool,
    /// Mixed content allows text between child elements
    pub mixed: bool,
    /// Blocked derivations
    pub block: DerivationSet,
    /// Final derivations
    pub final_set: DerivationSet,
    /// Attribute uses, base attributes first for extensions
    pub attributes: AttributeSet,
    /// Attribute wildcard
    pub attribute_wildcard: Option<AnyAttribute>,
    /// Content model
    pub content: ContentModel,
}

impl ComplexType {
    /// Create an empty, underived complex type
    pub fn new(name: Option<QName>) -> Self {
        Self {
            name,
            base: None,
            derivation: None,
            is_abstract: false,
            mixed: false,
            block: DerivationSet::default(),
            final_set: DerivationSet::default(),
            attributes: AttributeSet::new(),
            attribute_wildcard: None,
            content: ContentModel::Empty,
        }
    }

    /// Check if this type was derived from a base
    pub fn is_derived(&self) -> bool {
        self.base.is_some()
    }

    /// Check if this type was derived by extension
    pub fn is_extension(&self) -> bool {
        self.derivation == Some(DerivationMethod::Extension)
    }

    /// Check if this type was derived by restriction
    pub fn is_restriction(&self) -> bool {
        self.derivation == Some(DerivationMethod::Restriction)
    }

    /// Child element grouping, if the content is element-only or mixed
    pub fn grouping(&self) -> Option<&ElementGrouping> {
        match &self.content {
            ContentModel::Elements(grouping) => Some(grouping),
            _ => None,
        }
    }

    /// Simple content type, if any
    pub fn simple_content(&self) -> Option<&Arc<SimpleType>> {
        match &self.content {
            ContentModel::Simple(simple) => Some(simple),
            _ => None,
        }
    }

    /// Check if this type has simple content
    pub fn has_simple_content(&self) -> bool {
        matches!(self.content, ContentModel::Simple(_))
    }

    /// Check if this type has no content at all
    pub fn is_empty(&self) -> bool {
        match &self.content {
            ContentModel::Empty => true,
            ContentModel::Elements(grouping) => grouping.is_empty(),
            ContentModel::Simple(_) => false,
        }
    }

    /// Base complex type, if the base is complex
    pub fn base_complex(&self) -> Option<Arc<ComplexType>> {
        self.base.as_ref().and_then(TypeDef::as_complex)
    }

    /// Check text content of an element of this type
    ///
    /// Simple content is checked exactly as its simple type would; mixed
    /// content accepts any text; other content only accepts white space.
    pub fn validate_text(&self, value: &str) -> Result<(), ValidationError> {
        match &self.content {
            ContentModel::Simple(simple) => simple.validate(value),
            _ if self.mixed => Ok(()),
            _ if value.trim().is_empty() => Ok(()),
            _ => Err(ValidationError::new("character data is not allowed by this type")
                .with_value(value)
                .with_type_name(self.to_string())),
        }
    }
}

impl fmt::Display for ComplexType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "anonymous complex type"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::builtins::{any_type, builtin_simple_type};

    #[test]
    fn test_simple_content_text() {
        let mut t = ComplexType::new(Some(QName::local("price")));
        t.content = ContentModel::Simple(builtin_simple_type("decimal").unwrap());
        assert!(t.has_simple_content());
        assert!(t.validate_text("9.99").is_ok());
        assert!(t.validate_text("cheap").is_err());
    }

    #[test]
    fn test_element_only_text() {
        let t = ComplexType::new(None);
        assert!(t.is_empty());
        assert!(!t.is_derived());
        assert!(t.validate_text("  \n").is_ok());
        assert!(t.validate_text("text").is_err());
        assert!(any_type().validate_text("text").is_ok());
    }
}
