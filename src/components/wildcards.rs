//! XSD wildcards
//!
//! - `xs:any` admits elements from a set of namespaces
//! - `xs:anyAttribute` admits attributes from a set of namespaces
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Wildcards

use crate::error::{Error, Result};
use super::particles::Occurs;
use std::fmt;

/// Process contents mode for wildcards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProcessContents {
    /// Validate strictly - element/attribute must be declared
    #[default]
    Strict,
    /// Validate if declaration found, otherwise accept
    Lax,
    /// Skip validation entirely
    Skip,
}

impl ProcessContents {
    /// Parse from the `processContents` attribute value
    pub fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "strict" => Ok(Self::Strict),
            "lax" => Ok(Self::Lax),
            "skip" => Ok(Self::Skip),
            other => Err(Error::malformed(format!(
                "processContents value '{}' must be 'strict', 'lax' or 'skip'",
                other
            ))),
        }
    }
}

impl fmt::Display for ProcessContents {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lax => write!(f, "lax"),
            Self::Skip => write!(f, "skip"),
        }
    }
}

/// Namespace constraint for wildcards
///
/// `None` entries stand for "no namespace" (`##local`).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum NamespaceConstraint {
    /// Any namespace is allowed (##any)
    #[default]
    Any,
    /// Any namespace except the given one and no namespace (##other)
    Other(Option<String>),
    /// Explicit list of allowed namespaces
    List(Vec<Option<String>>),
}

impl NamespaceConstraint {
    /// Parse the `namespace` attribute of a wildcard
    pub fn parse(value: Option<&str>, target_namespace: Option<&str>) -> Result<Self> {
        let value = match value {
            None => return Ok(Self::Any),
            Some(value) => value.trim(),
        };

        match value {
            "##any" => Ok(Self::Any),
            "##other" => Ok(Self::Other(target_namespace.map(String::from))),
            _ => {
                let mut namespaces: Vec<Option<String>> = Vec::new();
                for token in value.split_whitespace() {
                    let namespace = match token {
                        "##local" => None,
                        "##targetNamespace" => target_namespace.map(String::from),
                        s if s.starts_with("##") => {
                            return Err(Error::malformed(format!(
                                "wrong value '{}' in 'namespace' attribute",
                                s
                            )));
                        }
                        s => Some(s.to_string()),
                    };
                    if !namespaces.contains(&namespace) {
                        namespaces.push(namespace);
                    }
                }
                Ok(Self::List(namespaces))
            }
        }
    }

    /// Check if a namespace is admitted
    pub fn allows(&self, namespace: Option<&str>) -> bool {
        match self {
            Self::Any => true,
            Self::Other(excluded) => {
                namespace.is_some() && namespace != excluded.as_deref()
            }
            Self::List(namespaces) => namespaces.iter().any(|ns| ns.as_deref() == namespace),
        }
    }

    /// Namespaces admitted by both constraints
    pub fn intersection(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, c) | (c, Self::Any) => c.clone(),
            (Self::Other(a), Self::Other(b)) if a == b => self.clone(),
            (Self::List(list), c) | (c, Self::List(list)) => Self::List(
                list.iter()
                    .filter(|ns| c.allows(ns.as_deref()))
                    .cloned()
                    .collect(),
            ),
            // Two different ##other: admits neither excluded namespace
            (Self::Other(_), Self::Other(_)) => Self::List(Vec::new()),
        }
    }

    /// Namespaces admitted by either constraint
    pub fn union(&self, other: &Self) -> Self {
        match (self, other) {
            (Self::Any, _) | (_, Self::Any) => Self::Any,
            (Self::List(a), Self::List(b)) => {
                let mut merged = a.clone();
                for ns in b {
                    if !merged.contains(ns) {
                        merged.push(ns.clone());
                    }
                }
                Self::List(merged)
            }
            (Self::Other(excluded), Self::List(list)) | (Self::List(list), Self::Other(excluded)) => {
                if list.contains(&None) || list.contains(excluded) {
                    Self::Any
                } else {
                    Self::Other(excluded.clone())
                }
            }
            (Self::Other(a), Self::Other(b)) if a == b => self.clone(),
            (Self::Other(_), Self::Other(_)) => Self::Any,
        }
    }
}

impl fmt::Display for NamespaceConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => write!(f, "##any"),
            Self::Other(_) => write!(f, "##other"),
            Self::List(namespaces) => {
                let tokens: Vec<&str> = namespaces
                    .iter()
                    .map(|ns| ns.as_deref().unwrap_or("##local"))
                    .collect();
                write!(f, "{}", tokens.join(" "))
            }
        }
    }
}

/// Element wildcard (xs:any)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyElement {
    /// Admitted namespaces
    pub namespace: NamespaceConstraint,
    /// How matched content is processed
    pub process_contents: ProcessContents,
    /// Occurrence bounds
    pub occurs: Occurs,
}

impl AnyElement {
    /// Create a new element wildcard
    pub fn new(namespace: NamespaceConstraint, process_contents: ProcessContents, occurs: Occurs) -> Self {
        Self {
            namespace,
            process_contents,
            occurs,
        }
    }

    /// Check if an element in the given namespace is admitted
    pub fn matches(&self, namespace: Option<&str>) -> bool {
        self.namespace.allows(namespace)
    }
}

/// Attribute wildcard (xs:anyAttribute)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnyAttribute {
    /// Admitted namespaces
    pub namespace: NamespaceConstraint,
    /// How matched attributes are processed
    pub process_contents: ProcessContents,
}

impl AnyAttribute {
    /// Create a new attribute wildcard
    pub fn new(namespace: NamespaceConstraint, process_contents: ProcessContents) -> Self {
        Self {
            namespace,
            process_contents,
        }
    }

    /// Check if an attribute in the given namespace is admitted
    pub fn matches(&self, namespace: Option<&str>) -> bool {
        self.namespace.allows(namespace)
    }

    /// Wildcard admitting what both admit; the process mode of `self` is kept
    pub fn intersect(&self, other: &AnyAttribute) -> AnyAttribute {
        AnyAttribute::new(self.namespace.intersection(&other.namespace), self.process_contents)
    }

    /// Wildcard admitting what either admits; the process mode of `self` is kept
    pub fn unite(&self, other: &AnyAttribute) -> AnyAttribute {
        AnyAttribute::new(self.namespace.union(&other.namespace), self.process_contents)
    }
}
