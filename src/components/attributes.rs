//! XSD attribute declarations and attribute groups
//!
//! An [`AttributeSet`] keeps attribute uses in declaration order, keyed by
//! qualified name. Inserting the same declaration twice is a no-op; inserting
//! a different declaration under a name already present is a conflict.

use crate::error::{Error, Result};
use crate::namespaces::QName;
use indexmap::IndexMap;
use std::fmt;
use std::sync::Arc;

use super::simple_types::SimpleType;
use super::wildcards::AnyAttribute;

/// Attribute use mode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttributeUse {
    /// Attribute is optional
    #[default]
    Optional,
    /// Attribute must not appear
    Prohibited,
    /// Attribute is required
    Required,
}

impl AttributeUse {
    /// Parse from the `use` attribute value
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "optional" => Ok(Self::Optional),
            "prohibited" => Ok(Self::Prohibited),
            "required" => Ok(Self::Required),
            other => Err(Error::malformed(format!(
                "use value '{}' must be 'optional', 'prohibited' or 'required'",
                other
            ))),
        }
    }
}

impl fmt::Display for AttributeUse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Optional => write!(f, "optional"),
            Self::Prohibited => write!(f, "prohibited"),
            Self::Required => write!(f, "required"),
        }
    }
}

/// A compiled attribute declaration
#[derive(Debug, Clone)]
pub struct Attribute {
    /// Attribute name
    pub name: QName,
    /// Value type
    pub simple_type: Arc<SimpleType>,
    /// Use mode
    pub use_mode: AttributeUse,
    /// Default value
    pub default: Option<String>,
    /// Fixed value
    pub fixed: Option<String>,
}

impl Attribute {
    /// Create an optional attribute without value constraint
    pub fn new(name: QName, simple_type: Arc<SimpleType>) -> Self {
        Self {
            name,
            simple_type,
            use_mode: AttributeUse::Optional,
            default: None,
            fixed: None,
        }
    }

    /// Set the use mode
    pub fn with_use(mut self, use_mode: AttributeUse) -> Self {
        self.use_mode = use_mode;
        self
    }

    /// Set the value constraint, checking default/fixed consistency
    pub fn with_value_constraint(
        mut self,
        default: Option<String>,
        fixed: Option<String>,
    ) -> Result<Self> {
        if default.is_some() && fixed.is_some() {
            return Err(Error::malformed(format!(
                "attribute '{}' has both 'default' and 'fixed'",
                self.name
            )));
        }
        if default.is_some() && self.use_mode != AttributeUse::Optional {
            return Err(Error::malformed(format!(
                "attribute '{}' has a default but use is '{}'",
                self.name, self.use_mode
            )));
        }
        for value in default.iter().chain(fixed.iter()) {
            self.simple_type.validate(value)?;
        }
        self.default = default;
        self.fixed = fixed;
        Ok(self)
    }

    /// Check if the attribute is required
    pub fn is_required(&self) -> bool {
        self.use_mode == AttributeUse::Required
    }

    /// Check if the attribute is prohibited
    pub fn is_prohibited(&self) -> bool {
        self.use_mode == AttributeUse::Prohibited
    }

    /// Default or fixed value
    pub fn value_constraint(&self) -> Option<&str> {
        self.fixed.as_deref().or(self.default.as_deref())
    }

    /// Check if two declarations are interchangeable
    pub fn same_declaration(&self, other: &Attribute) -> bool {
        self.name == other.name
            && Arc::ptr_eq(&self.simple_type, &other.simple_type)
            && self.use_mode == other.use_mode
            && self.default == other.default
            && self.fixed == other.fixed
    }
}

/// Ordered set of attribute uses
#[derive(Debug, Clone, Default)]
pub struct AttributeSet {
    attributes: IndexMap<QName, Arc<Attribute>>,
}

impl AttributeSet {
    /// Create an empty set
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an attribute use
    ///
    /// The same declaration is kept once; a different declaration with the
    /// same name is a `MalformedAttribute` conflict.
    pub fn insert(&mut self, attribute: Arc<Attribute>) -> Result<()> {
        if let Some(existing) = self.attributes.get(&attribute.name) {
            if Arc::ptr_eq(existing, &attribute) || existing.same_declaration(&attribute) {
                return Ok(());
            }
            return Err(Error::malformed(format!(
                "conflicting declarations for attribute '{}'",
                attribute.name
            )));
        }
        self.attributes.insert(attribute.name.clone(), attribute);
        Ok(())
    }

    /// Insert an attribute use unless the name is already taken
    ///
    /// Returns false if an attribute with the same name was kept instead.
    pub fn insert_if_absent(&mut self, attribute: Arc<Attribute>) -> bool {
        if self.attributes.contains_key(&attribute.name) {
            return false;
        }
        self.attributes.insert(attribute.name.clone(), attribute);
        true
    }

    /// Get an attribute by qualified name
    pub fn get(&self, name: &QName) -> Option<&Arc<Attribute>> {
        self.attributes.get(name)
    }

    /// Get an attribute by local name
    pub fn get_local(&self, local_name: &str) -> Option<&Arc<Attribute>> {
        self.attributes
            .values()
            .find(|a| a.name.local_name == local_name)
    }

    /// Check if an attribute with this name is present
    pub fn contains(&self, name: &QName) -> bool {
        self.attributes.contains_key(name)
    }

    /// Iterate attribute uses in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Attribute>> {
        self.attributes.values()
    }

    /// Attribute names in declaration order
    pub fn names(&self) -> Vec<&QName> {
        self.attributes.keys().collect()
    }

    /// Number of attribute uses
    pub fn len(&self) -> usize {
        self.attributes.len()
    }

    /// Check if the set is empty
    pub fn is_empty(&self) -> bool {
        self.attributes.is_empty()
    }

    /// Required attributes
    pub fn required(&self) -> impl Iterator<Item = &Arc<Attribute>> {
        self.attributes.values().filter(|a| a.is_required())
    }
}

/// A compiled named attribute group
#[derive(Debug, Clone)]
pub struct AttributeGroup {
    /// Group name
    pub name: QName,
    /// Attribute uses, nested group references flattened
    pub attributes: AttributeSet,
    /// Attribute wildcard
    pub wildcard: Option<AnyAttribute>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::builtins::builtin_simple_type;

    fn attribute(name: &str, type_name: &str) -> Attribute {
        Attribute::new(QName::local(name), builtin_simple_type(type_name).unwrap())
    }

    #[test]
    fn test_attribute_use() {
        assert_eq!(AttributeUse::from_str("required").unwrap(), AttributeUse::Required);
        assert!(matches!(
            AttributeUse::from_str("mandatory"),
            Err(Error::MalformedAttribute(_))
        ));
    }

    #[test]
    fn test_value_constraint() {
        let a = attribute("lang", "language")
            .with_value_constraint(Some("en".into()), None)
            .unwrap();
        assert_eq!(a.value_constraint(), Some("en"));

        let both = attribute("x", "string")
            .with_value_constraint(Some("a".into()), Some("b".into()));
        assert!(matches!(both, Err(Error::MalformedAttribute(_))));

        let required_default = attribute("x", "string")
            .with_use(AttributeUse::Required)
            .with_value_constraint(Some("a".into()), None);
        assert!(required_default.is_err());

        let bad_default = attribute("n", "int").with_value_constraint(Some("abc".into()), None);
        assert!(matches!(bad_default, Err(Error::Validation(_))));
    }

    #[test]
    fn test_set_deduplicates_same_declaration() {
        let shared = Arc::new(attribute("a", "string"));
        let mut set = AttributeSet::new();
        set.insert(Arc::clone(&shared)).unwrap();
        set.insert(Arc::clone(&shared)).unwrap();
        set.insert(Arc::new(attribute("a", "string"))).unwrap();
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn test_set_rejects_conflicting_declaration() {
        let mut set = AttributeSet::new();
        set.insert(Arc::new(attribute("a", "string"))).unwrap();
        let result = set.insert(Arc::new(attribute("a", "int")));
        assert!(matches!(result, Err(Error::MalformedAttribute(_))));
    }

    #[test]
    fn test_set_keeps_order() {
        let mut set = AttributeSet::new();
        for name in ["z", "a", "m"] {
            set.insert(Arc::new(attribute(name, "string"))).unwrap();
        }
        assert!(!set.insert_if_absent(Arc::new(attribute("a", "int"))));
        let names: Vec<&str> = set.iter().map(|a| a.name.local_name.as_str()).collect();
        assert_eq!(names, vec!["z", "a", "m"]);
        assert_eq!(set.get_local("a").map(|a| a.simple_type.to_string()), Some(format!("{{{}}}string", crate::XSD_NAMESPACE)));
    }
}
