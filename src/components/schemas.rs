//! Compiled schemas
//!
//! A [`Schema`] is the output of a compile session for one target namespace:
//! its own top-level declarations (include targets merged in), plus handles to
//! the schemas it imports. Imports are links, not copies, so two schemas that
//! import each other share one graph.

use crate::error::{Error, Result};
use crate::namespaces::QName;
use indexmap::{IndexMap, IndexSet};
use std::fmt;
use std::sync::Arc;

use super::attributes::{Attribute, AttributeGroup};
use super::complex_types::ComplexType;
use super::elements::{Element, TypeDef};
use super::groups::GroupDef;
use super::simple_types::SimpleType;
use super::Link;

/// Form default for elements and attributes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FormDefault {
    /// Unqualified (default)
    #[default]
    Unqualified,
    /// Qualified
    Qualified,
}

impl FormDefault {
    /// Parse from the `form`/`elementFormDefault`/`attributeFormDefault` value
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "qualified" => Ok(Self::Qualified),
            "unqualified" => Ok(Self::Unqualified),
            other => Err(Error::malformed(format!(
                "form value '{}' must be 'qualified' or 'unqualified'",
                other
            ))),
        }
    }

    /// Check if qualified
    pub fn is_qualified(&self) -> bool {
        matches!(self, Self::Qualified)
    }
}

impl fmt::Display for FormDefault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Qualified => write!(f, "qualified"),
            Self::Unqualified => write!(f, "unqualified"),
        }
    }
}

/// Derivation flags for `block`, `final` and their schema-wide defaults
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DerivationSet {
    /// Extension derivation
    pub extension: bool,
    /// Restriction derivation
    pub restriction: bool,
    /// Substitution (block only)
    pub substitution: bool,
    /// List derivation (simple types)
    pub list: bool,
    /// Union derivation (simple types)
    pub union: bool,
}

impl DerivationSet {
    /// Create with all flags set
    pub fn all() -> Self {
        Self {
            extension: true,
            restriction: true,
            substitution: true,
            list: true,
            union: true,
        }
    }

    /// Parse from attribute value
    pub fn parse(value: &str) -> Result<Self> {
        if value.trim() == "#all" {
            return Ok(Self::all());
        }

        let mut result = Self::default();
        for token in value.split_whitespace() {
            match token {
                "extension" => result.extension = true,
                "restriction" => result.restriction = true,
                "substitution" => result.substitution = true,
                "list" => result.list = true,
                "union" => result.union = true,
                other => {
                    return Err(Error::malformed(format!(
                        "unknown derivation method '{}' in '{}'",
                        other, value
                    )))
                }
            }
        }
        Ok(result)
    }

    /// Check if any flag is set
    pub fn is_empty(&self) -> bool {
        !self.extension && !self.restriction && !self.substitution && !self.list && !self.union
    }
}

/// An `xs:import` of a compiled schema
#[derive(Debug, Clone)]
pub struct ImportedSchema {
    /// Imported namespace
    pub namespace: Option<String>,
    /// Resolved schema location, if one was given
    pub location: Option<String>,
    /// The imported schema; None when the import could not be resolved
    pub schema: Option<Link<Schema>>,
}

impl ImportedSchema {
    /// Get the imported schema, if resolved
    pub fn get(&self) -> Option<Arc<Schema>> {
        self.schema.as_ref().and_then(Link::get)
    }
}

/// A compiled schema
#[derive(Debug)]
pub struct Schema {
    /// Target namespace
    pub target_namespace: Option<String>,
    /// elementFormDefault
    pub element_form_default: FormDefault,
    /// attributeFormDefault
    pub attribute_form_default: FormDefault,
    /// blockDefault
    pub block_default: DerivationSet,
    /// finalDefault
    pub final_default: DerivationSet,
    /// Top-level elements by local name
    pub elements: IndexMap<String, Arc<Element>>,
    /// Top-level complex types by local name
    pub complex_types: IndexMap<String, Arc<ComplexType>>,
    /// Top-level simple types by local name
    pub simple_types: IndexMap<String, Arc<SimpleType>>,
    /// Top-level groups by local name
    pub groups: IndexMap<String, Arc<GroupDef>>,
    /// Top-level attribute groups by local name
    pub attribute_groups: IndexMap<String, Arc<AttributeGroup>>,
    /// Top-level attributes by local name
    pub attributes: IndexMap<String, Arc<Attribute>>,
    /// Imported schemas
    pub imports: Vec<ImportedSchema>,
    /// Source locations this schema was assembled from (includes merged in)
    pub locations: IndexSet<String>,
}

impl Schema {
    /// Create an empty schema for a target namespace
    pub fn new(target_namespace: Option<String>) -> Self {
        Self {
            target_namespace,
            element_form_default: FormDefault::default(),
            attribute_form_default: FormDefault::default(),
            block_default: DerivationSet::default(),
            final_default: DerivationSet::default(),
            elements: IndexMap::new(),
            complex_types: IndexMap::new(),
            simple_types: IndexMap::new(),
            groups: IndexMap::new(),
            attribute_groups: IndexMap::new(),
            attributes: IndexMap::new(),
            imports: Vec::new(),
            locations: IndexSet::new(),
        }
    }

    /// Qualified name of a top-level component of this schema
    pub fn qname(&self, local_name: &str) -> QName {
        QName::new(self.target_namespace.as_deref(), local_name)
    }

    /// Get a top-level element
    pub fn element(&self, name: &str) -> Option<&Arc<Element>> {
        self.elements.get(name)
    }

    /// Get a top-level complex type
    pub fn complex_type(&self, name: &str) -> Option<&Arc<ComplexType>> {
        self.complex_types.get(name)
    }

    /// Get a top-level simple type
    pub fn simple_type(&self, name: &str) -> Option<&Arc<SimpleType>> {
        self.simple_types.get(name)
    }

    /// Get a top-level type of either kind
    pub fn type_def(&self, name: &str) -> Option<TypeDef> {
        self.complex_types
            .get(name)
            .map(|complex| TypeDef::from(Arc::clone(complex)))
            .or_else(|| self.simple_types.get(name).map(|simple| TypeDef::Simple(Arc::clone(simple))))
    }

    /// Get a top-level group
    pub fn group(&self, name: &str) -> Option<&Arc<GroupDef>> {
        self.groups.get(name)
    }

    /// Get a top-level attribute group
    pub fn attribute_group(&self, name: &str) -> Option<&Arc<AttributeGroup>> {
        self.attribute_groups.get(name)
    }

    /// Get a top-level attribute
    pub fn attribute(&self, name: &str) -> Option<&Arc<Attribute>> {
        self.attributes.get(name)
    }

    /// Get an imported schema by namespace
    pub fn imported(&self, namespace: Option<&str>) -> Option<Arc<Schema>> {
        self.imports
            .iter()
            .filter(|import| import.namespace.as_deref() == namespace)
            .find_map(ImportedSchema::get)
    }

    /// Number of top-level components
    pub fn component_count(&self) -> usize {
        self.elements.len()
            + self.complex_types.len()
            + self.simple_types.len()
            + self.groups.len()
            + self.attribute_groups.len()
            + self.attributes.len()
    }
}

impl fmt::Display for Schema {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Schema(targetNamespace={}, {} components, {} imports)",
            self.target_namespace.as_deref().unwrap_or("-"),
            self.component_count(),
            self.imports.len()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_form_default() {
        assert!(FormDefault::from_str("qualified").unwrap().is_qualified());
        assert!(matches!(
            FormDefault::from_str("sometimes"),
            Err(Error::MalformedAttribute(_))
        ));
    }

    #[test]
    fn test_derivation_set() {
        let all = DerivationSet::parse("#all").unwrap();
        assert_eq!(all, DerivationSet::all());

        let some = DerivationSet::parse("extension restriction").unwrap();
        assert!(some.extension && some.restriction && !some.list);
        assert!(DerivationSet::parse("").unwrap().is_empty());
        assert!(DerivationSet::parse("extension bogus").is_err());
    }

    #[test]
    fn test_empty_schema() {
        let schema = Schema::new(Some("urn:a".into()));
        assert_eq!(schema.component_count(), 0);
        assert_eq!(schema.qname("x"), QName::namespaced("urn:a", "x"));
        assert!(schema.imported(Some("urn:b")).is_none());
        assert_eq!(
            schema.to_string(),
            "Schema(targetNamespace=urn:a, 0 components, 0 imports)"
        );
    }
}
