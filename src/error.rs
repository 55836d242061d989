//! Error types for xsdc
//!
//! Every failure of a schema compilation is reported through [`Error`]. None of
//! the variants are recovered inside the compiler: the first one raised aborts
//! the compilation of the whole document set.

use std::fmt;
use thiserror::Error;

use crate::namespaces::QName;

/// Result type alias using xsdc Error
pub type Result<T> = std::result::Result<T, Error>;

/// Declaration category searched by the reference resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Category {
    /// Simple or complex type definition
    Type,
    /// Element declaration
    Element,
    /// Named model group
    Group,
    /// Attribute declaration
    Attribute,
    /// Attribute group
    AttributeGroup,
}

impl Category {
    /// Get the category as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Type => "type",
            Category::Element => "element",
            Category::Group => "group",
            Category::Attribute => "attribute",
            Category::AttributeGroup => "attributeGroup",
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Main error type for xsdc operations
#[derive(Error, Debug)]
pub enum Error {
    /// Attribute value that cannot be interpreted (bad integer, unknown enumerated value, ...)
    #[error("malformed attribute: {0}")]
    MalformedAttribute(SchemaError),

    /// Child construct not allowed by the parent's grammar, or a second exclusive child
    #[error("unexpected child: {0}")]
    UnexpectedChild(SchemaError),

    /// A `ref`, `base` or `type` name not found in any visible schema
    #[error("unresolved {category} reference '{name}'")]
    UnresolvedReference {
        /// Category that was searched
        category: Category,
        /// Requested name
        name: QName,
    },

    /// Import of the schema's own namespace, or an include with a foreign namespace
    #[error("namespace conflict: {0}")]
    NamespaceConflict(SchemaError),

    /// Construct that is recognized but not compiled (e.g. `redefine`)
    #[error("unsupported construct: {0}")]
    UnsupportedConstruct(SchemaError),

    /// Derivation or grouping that refers back to itself where eager expansion is required
    #[error("circular definition: {0}")]
    CircularDefinition(SchemaError),

    /// A literal rejected by a compiled simple type
    #[error("validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Resource loading error
    #[error("resource error: {0}")]
    Resource(String),

    /// Limit exceeded error
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// XML parsing error
    #[error("XML error: {0}")]
    Xml(String),

    /// URL parsing error
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl Error {
    /// Create a malformed attribute error
    pub fn malformed(message: impl Into<String>) -> Self {
        Error::MalformedAttribute(SchemaError::new(message))
    }

    /// Create an unexpected child error
    pub fn unexpected_child(message: impl Into<String>) -> Self {
        Error::UnexpectedChild(SchemaError::new(message))
    }

    /// Create a namespace conflict error
    pub fn namespace_conflict(message: impl Into<String>) -> Self {
        Error::NamespaceConflict(SchemaError::new(message))
    }

    /// Create an unsupported construct error
    pub fn unsupported(message: impl Into<String>) -> Self {
        Error::UnsupportedConstruct(SchemaError::new(message))
    }

    /// Create a circular definition error
    pub fn circular(message: impl Into<String>) -> Self {
        Error::CircularDefinition(SchemaError::new(message))
    }

    /// Create an unresolved reference error
    pub fn unresolved(category: Category, name: QName) -> Self {
        Error::UnresolvedReference { category, name }
    }

    /// Attach the qualified name of the offending construct, if the error carries one
    pub fn in_component(self, component: &QName) -> Self {
        match self {
            Error::MalformedAttribute(e) => Error::MalformedAttribute(e.in_component(component)),
            Error::UnexpectedChild(e) => Error::UnexpectedChild(e.in_component(component)),
            Error::NamespaceConflict(e) => Error::NamespaceConflict(e.in_component(component)),
            Error::UnsupportedConstruct(e) => {
                Error::UnsupportedConstruct(e.in_component(component))
            }
            Error::CircularDefinition(e) => Error::CircularDefinition(e.in_component(component)),
            other => other,
        }
    }

    /// Attach the source location of the schema document, if not already set
    pub fn at_location(self, location: &str) -> Self {
        let attach = |e: SchemaError| {
            if e.location.is_some() {
                e
            } else {
                e.with_location(location)
            }
        };
        match self {
            Error::MalformedAttribute(e) => Error::MalformedAttribute(attach(e)),
            Error::UnexpectedChild(e) => Error::UnexpectedChild(attach(e)),
            Error::NamespaceConflict(e) => Error::NamespaceConflict(attach(e)),
            Error::UnsupportedConstruct(e) => Error::UnsupportedConstruct(attach(e)),
            Error::CircularDefinition(e) => Error::CircularDefinition(attach(e)),
            other => other,
        }
    }

    /// Qualified name of the construct the error refers to, where known
    pub fn component(&self) -> Option<&QName> {
        match self {
            Error::MalformedAttribute(e)
            | Error::UnexpectedChild(e)
            | Error::NamespaceConflict(e)
            | Error::UnsupportedConstruct(e)
            | Error::CircularDefinition(e) => e.component.as_ref(),
            Error::UnresolvedReference { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// Schema compilation error with context
#[derive(Debug, Clone)]
pub struct SchemaError {
    /// Error message
    pub message: String,
    /// Qualified name of the construct being compiled
    pub component: Option<QName>,
    /// Source location of the schema document
    pub location: Option<String>,
}

impl SchemaError {
    /// Create a new schema error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            component: None,
            location: None,
        }
    }

    /// Set the component, keeping the innermost one if already present
    pub fn in_component(mut self, component: &QName) -> Self {
        if self.component.is_none() {
            self.component = Some(component.clone());
        }
        self
    }

    /// Set the location
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref component) = self.component {
            write!(f, " (in '{}')", component)?;
        }

        if let Some(ref loc) = self.location {
            write!(f, " [{}]", loc)?;
        }

        Ok(())
    }
}

impl std::error::Error for SchemaError {}

/// Rejection of a literal by a compiled simple type
#[derive(Debug, Clone)]
pub struct ValidationError {
    /// Error message
    pub message: String,
    /// Rejected literal
    pub value: Option<String>,
    /// Name of the type that rejected the literal
    pub type_name: Option<String>,
    /// Original reason
    pub reason: Option<String>,
}

impl ValidationError {
    /// Create a new validation error
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            value: None,
            type_name: None,
            reason: None,
        }
    }

    /// Set the rejected literal
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set the type name, keeping the innermost one if already present
    pub fn with_type_name(mut self, type_name: impl Into<String>) -> Self {
        if self.type_name.is_none() {
            self.type_name = Some(type_name.into());
        }
        self
    }

    /// Set the reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)?;

        if let Some(ref value) = self.value {
            write!(f, ": '{}'", value)?;
        }

        if let Some(ref type_name) = self.type_name {
            write!(f, " (type {})", type_name)?;
        }

        if let Some(ref reason) = self.reason {
            write!(f, "\n\nReason: {}", reason)?;
        }

        Ok(())
    }
}

impl std::error::Error for ValidationError {}
