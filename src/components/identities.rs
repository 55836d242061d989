//! XSD identity constraints (xs:key, xs:keyref, xs:unique)
//!
//! Selector and field XPaths are kept as written; they are evaluated against
//! instance documents, which is outside this crate.

use crate::error::{Error, Result};
use crate::namespaces::QName;
use std::fmt;

/// Kind of identity constraint
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentityKind {
    /// Values must be present and unique
    Key,
    /// Values must be unique when present
    Unique,
    /// Values must match a key or unique constraint
    Keyref,
}

impl IdentityKind {
    /// Parse from element local name
    pub fn from_local_name(name: &str) -> Option<Self> {
        match name {
            "key" => Some(Self::Key),
            "unique" => Some(Self::Unique),
            "keyref" => Some(Self::Keyref),
            _ => None,
        }
    }
}

impl fmt::Display for IdentityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Key => write!(f, "key"),
            Self::Unique => write!(f, "unique"),
            Self::Keyref => write!(f, "keyref"),
        }
    }
}

/// A compiled identity constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdentityConstraint {
    /// Constraint kind
    pub kind: IdentityKind,
    /// Constraint name
    pub name: QName,
    /// Selector XPath
    pub selector: String,
    /// Field XPaths, in order
    pub fields: Vec<String>,
    /// Referenced key (keyref only)
    pub refer: Option<QName>,
}

impl IdentityConstraint {
    /// Build a constraint, checking that its parts are present
    pub fn new(
        kind: IdentityKind,
        name: QName,
        selector: Option<String>,
        fields: Vec<String>,
        refer: Option<QName>,
    ) -> Result<Self> {
        let selector = selector.ok_or_else(|| {
            Error::malformed(format!("{} '{}' has no selector", kind, name))
        })?;
        if fields.is_empty() {
            return Err(Error::malformed(format!("{} '{}' has no field", kind, name)));
        }
        match (kind, &refer) {
            (IdentityKind::Keyref, None) => {
                return Err(Error::malformed(format!(
                    "keyref '{}' has no 'refer' attribute",
                    name
                )));
            }
            (IdentityKind::Key | IdentityKind::Unique, Some(_)) => {
                return Err(Error::malformed(format!(
                    "'refer' is only allowed on keyref, not on {} '{}'",
                    kind, name
                )));
            }
            _ => {}
        }

        Ok(Self {
            kind,
            name,
            selector,
            fields,
            refer,
        })
    }
}
