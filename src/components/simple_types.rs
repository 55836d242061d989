//! XSD simple types
//!
//! A simple type is either a built-in, a restriction of another simple type
//! (with an ordered facet list), a list of an item type, or a union of member
//! types.

use crate::error::ValidationError;
use crate::namespaces::QName;
use std::fmt;
use std::sync::Arc;

use super::builtins::{builtin_simple_type, BuiltinType};
use super::facets::{Facets, WhiteSpace};

/// Variety of a simple type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SimpleTypeVariety {
    /// Single value
    Atomic,
    /// Whitespace-separated sequence of item values
    List,
    /// Value of one of the member types
    Union,
}

/// How a simple type is derived
#[derive(Debug, Clone)]
pub enum SimpleDerivation {
    /// Built-in datatype
    Builtin(BuiltinType),
    /// Restriction of a base type by facets
    Restriction {
        /// Base type
        base: Arc<SimpleType>,
    },
    /// List of an item type
    List {
        /// Item type
        item: Arc<SimpleType>,
    },
    /// Union of member types, tried in declaration order
    Union {
        /// Member types
        members: Vec<Arc<SimpleType>>,
    },
}

/// A compiled simple type
#[derive(Debug, Clone)]
pub struct SimpleType {
    /// Type name (None for anonymous types)
    pub name: Option<QName>,
    /// Derivation of this type
    pub derivation: SimpleDerivation,
    /// Facets of this derivation step
    pub facets: Facets,
    /// White space normalization applied before checking
    pub white_space: WhiteSpace,
}

impl SimpleType {
    /// Create a restriction of `base`
    pub fn restriction(name: Option<QName>, base: Arc<SimpleType>, facets: Facets) -> Self {
        let white_space = facets.white_space().unwrap_or(base.white_space);
        Self {
            name,
            derivation: SimpleDerivation::Restriction { base },
            facets,
            white_space,
        }
    }

    /// Create a list of `item`
    pub fn list(name: Option<QName>, item: Arc<SimpleType>) -> Self {
        Self {
            name,
            derivation: SimpleDerivation::List { item },
            facets: Facets::empty(),
            white_space: WhiteSpace::Collapse,
        }
    }

    /// Create a union of `members`
    pub fn union(name: Option<QName>, members: Vec<Arc<SimpleType>>) -> Self {
        Self {
            name,
            derivation: SimpleDerivation::Union { members },
            facets: Facets::empty(),
            white_space: WhiteSpace::Collapse,
        }
    }

    /// Get the variety
    pub fn variety(&self) -> SimpleTypeVariety {
        match &self.derivation {
            SimpleDerivation::Builtin(_) => SimpleTypeVariety::Atomic,
            SimpleDerivation::Restriction { base } => base.variety(),
            SimpleDerivation::List { .. } => SimpleTypeVariety::List,
            SimpleDerivation::Union { .. } => SimpleTypeVariety::Union,
        }
    }

    /// Get the base type, if any
    pub fn base_type(&self) -> Option<Arc<SimpleType>> {
        match &self.derivation {
            SimpleDerivation::Builtin(builtin) => builtin.base.and_then(builtin_simple_type),
            SimpleDerivation::Restriction { base } => Some(Arc::clone(base)),
            SimpleDerivation::List { .. } | SimpleDerivation::Union { .. } => {
                builtin_simple_type("anySimpleType")
            }
        }
    }

    /// Get the primitive built-in this type is derived from (atomic types only)
    pub fn primitive(&self) -> Option<&BuiltinType> {
        match &self.derivation {
            SimpleDerivation::Builtin(builtin) => Some(builtin),
            SimpleDerivation::Restriction { base } => base.primitive(),
            _ => None,
        }
    }

    /// Check if this is a built-in type
    pub fn is_builtin(&self) -> bool {
        matches!(self.derivation, SimpleDerivation::Builtin(_))
    }

    /// Check if this type derives from a type with the given name
    pub fn is_derived_from(&self, name: &QName) -> bool {
        if self.name.as_ref() == Some(name) {
            return true;
        }
        match self.base_type() {
            Some(base) => base.is_derived_from(name),
            None => false,
        }
    }

    /// Check a literal against this type
    pub fn validate(&self, value: &str) -> Result<(), ValidationError> {
        let normalized = self.white_space.normalize(value);
        self.check_normalized(&normalized)
            .map_err(|e| e.with_type_name(self.display_name()))
    }

    /// Find the union member that accepts a literal
    ///
    /// For non-union types this is the type itself when it accepts the value.
    pub fn member_for(&self, value: &str) -> Option<&SimpleType> {
        let normalized = self.white_space.normalize(value);
        match &self.derivation {
            SimpleDerivation::Union { members } => members
                .iter()
                .find(|member| member.validate(&normalized).is_ok())
                .map(|member| member.as_ref()),
            SimpleDerivation::Restriction { base } if base.variety() == SimpleTypeVariety::Union => {
                if self.facets.check(&normalized, normalized.chars().count()).is_err() {
                    return None;
                }
                base.member_for(&normalized)
            }
            _ => self.check_normalized(&normalized).ok().map(|_| self),
        }
    }

    fn check_normalized(&self, value: &str) -> Result<(), ValidationError> {
        match &self.derivation {
            SimpleDerivation::Builtin(builtin) => builtin.check(value)?,
            SimpleDerivation::Restriction { base } => base.validate(value)?,
            SimpleDerivation::List { item } => {
                for token in value.split_whitespace() {
                    item.validate(token)?;
                }
            }
            SimpleDerivation::Union { members } => {
                if !members.iter().any(|member| member.validate(value).is_ok()) {
                    return Err(ValidationError::new("no member type of the union accepts the value")
                        .with_value(value));
                }
            }
        }

        let length = match self.variety() {
            SimpleTypeVariety::List => value.split_whitespace().count(),
            _ => value.chars().count(),
        };
        self.facets.check(value, length)
    }

    fn display_name(&self) -> String {
        match &self.name {
            Some(name) => name.to_string(),
            None => "anonymous simple type".to_string(),
        }
    }
}

impl fmt::Display for SimpleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.display_name())
    }
}
