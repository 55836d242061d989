//! Construct handlers
//!
//! While a schema document is read, every recognized XSD element becomes a
//! [`Handler`] in a [`HandlerArena`]: the construct kind, the raw attributes,
//! the namespace scope and the ids of its accepted children. Handlers hold no
//! compiled state; the compiler keeps its own memo table keyed by handler id.

pub mod builder;
pub mod dispatch;

pub use builder::{DocumentBuilder, SchemaDocument};

use crate::components::{parse_occurs, DerivationSet, FacetKind, Occurs};
use crate::documents::RawAttribute;
use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use crate::XSD_NAMESPACE;
use std::fmt;
use std::ops::Index;
use std::sync::Arc;

/// Schema-language construct of a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    /// xs:schema
    Schema,
    /// xs:complexType
    ComplexType,
    /// xs:simpleType
    SimpleType,
    /// xs:element
    Element,
    /// xs:attribute
    Attribute,
    /// xs:attributeGroup
    AttributeGroup,
    /// xs:group
    Group,
    /// xs:sequence
    Sequence,
    /// xs:choice
    Choice,
    /// xs:all
    All,
    /// xs:any
    Any,
    /// xs:anyAttribute
    AnyAttribute,
    /// xs:simpleContent
    SimpleContent,
    /// xs:complexContent
    ComplexContent,
    /// xs:extension
    Extension,
    /// xs:restriction
    Restriction,
    /// xs:list
    List,
    /// xs:union
    Union,
    /// xs:import
    Import,
    /// xs:include
    Include,
    /// xs:redefine
    Redefine,
    /// xs:key
    Key,
    /// xs:keyref
    Keyref,
    /// xs:unique
    Unique,
    /// xs:selector
    Selector,
    /// xs:field
    Field,
    /// A constraining facet (xs:enumeration, xs:pattern, ...)
    Facet(FacetKind),
}

impl Construct {
    /// Map an XSD element local name to its construct
    pub fn from_local_name(name: &str) -> Option<Self> {
        let construct = match name {
            "schema" => Self::Schema,
            "complexType" => Self::ComplexType,
            "simpleType" => Self::SimpleType,
            "element" => Self::Element,
            "attribute" => Self::Attribute,
            "attributeGroup" => Self::AttributeGroup,
            "group" => Self::Group,
            "sequence" => Self::Sequence,
            "choice" => Self::Choice,
            "all" => Self::All,
            "any" => Self::Any,
            "anyAttribute" => Self::AnyAttribute,
            "simpleContent" => Self::SimpleContent,
            "complexContent" => Self::ComplexContent,
            "extension" => Self::Extension,
            "restriction" => Self::Restriction,
            "list" => Self::List,
            "union" => Self::Union,
            "import" => Self::Import,
            "include" => Self::Include,
            "redefine" => Self::Redefine,
            "key" => Self::Key,
            "keyref" => Self::Keyref,
            "unique" => Self::Unique,
            "selector" => Self::Selector,
            "field" => Self::Field,
            other => return FacetKind::from_local_name(other).map(Self::Facet),
        };
        Some(construct)
    }

    /// XSD element local name of this construct
    pub fn local_name(&self) -> &'static str {
        match self {
            Self::Schema => "schema",
            Self::ComplexType => "complexType",
            Self::SimpleType => "simpleType",
            Self::Element => "element",
            Self::Attribute => "attribute",
            Self::AttributeGroup => "attributeGroup",
            Self::Group => "group",
            Self::Sequence => "sequence",
            Self::Choice => "choice",
            Self::All => "all",
            Self::Any => "any",
            Self::AnyAttribute => "anyAttribute",
            Self::SimpleContent => "simpleContent",
            Self::ComplexContent => "complexContent",
            Self::Extension => "extension",
            Self::Restriction => "restriction",
            Self::List => "list",
            Self::Union => "union",
            Self::Import => "import",
            Self::Include => "include",
            Self::Redefine => "redefine",
            Self::Key => "key",
            Self::Keyref => "keyref",
            Self::Unique => "unique",
            Self::Selector => "selector",
            Self::Field => "field",
            Self::Facet(kind) => kind.as_str(),
        }
    }

    /// Check if this is a sequence, choice or all compositor
    pub fn is_compositor(&self) -> bool {
        matches!(self, Self::Sequence | Self::Choice | Self::All)
    }

    /// Check if this is a key, keyref or unique constraint
    pub fn is_identity(&self) -> bool {
        matches!(self, Self::Key | Self::Keyref | Self::Unique)
    }
}

impl fmt::Display for Construct {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "xs:{}", self.local_name())
    }
}

/// Identity of a handler within its arena
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandlerId(usize);

impl HandlerId {
    /// Position in the arena
    pub fn index(&self) -> usize {
        self.0
    }
}

/// Raw attributes of a construct
///
/// Lookups accept both the unqualified form and the form qualified with the
/// XSD namespace.
#[derive(Debug, Clone, Default)]
pub struct Attributes {
    items: Vec<RawAttribute>,
}

impl Attributes {
    /// Wrap attributes as read from a start tag
    pub fn new(items: Vec<RawAttribute>) -> Self {
        Self { items }
    }

    /// Get an attribute value
    pub fn get(&self, name: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|a| a.namespace.is_none() && a.local_name == name)
            .or_else(|| {
                self.items.iter().find(|a| {
                    a.namespace.as_deref() == Some(XSD_NAMESPACE) && a.local_name == name
                })
            })
            .map(|a| a.value.as_str())
    }

    /// Get a boolean attribute; absent is false
    pub fn flag(&self, name: &str) -> Result<bool> {
        match self.get(name).map(str::trim) {
            None => Ok(false),
            Some("true") | Some("1") => Ok(true),
            Some("false") | Some("0") => Ok(false),
            Some(other) => Err(Error::malformed(format!(
                "'{}' must be a boolean, found '{}'",
                name, other
            ))),
        }
    }

    /// Get `minOccurs`/`maxOccurs`
    pub fn occurs(&self) -> Result<Occurs> {
        parse_occurs(self.get("minOccurs"), self.get("maxOccurs"))
    }

    /// Get a `block`/`final` style attribute
    pub fn derivation_set(&self, name: &str) -> Result<Option<DerivationSet>> {
        self.get(name).map(DerivationSet::parse).transpose()
    }

    /// Number of attributes
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if there are no attributes
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Iterate the attributes in document order
    pub fn iter(&self) -> impl Iterator<Item = &RawAttribute> {
        self.items.iter()
    }
}

/// One construct captured during descent
#[derive(Debug, Clone)]
pub struct Handler {
    /// Construct kind
    pub construct: Construct,
    /// Raw attributes
    pub attributes: Attributes,
    /// Accepted children, in document order
    pub children: Vec<HandlerId>,
    /// Parent handler (None for the schema root)
    pub parent: Option<HandlerId>,
    /// Namespace bindings in scope
    pub scope: Arc<NamespaceContext>,
}

impl Handler {
    /// Get an attribute value
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes.get(name)
    }

    /// Get the `name` attribute
    pub fn name(&self) -> Option<&str> {
        self.attributes.get("name").map(str::trim)
    }

    /// Get the `name` attribute, failing if absent
    pub fn required_name(&self) -> Result<&str> {
        self.name().ok_or_else(|| {
            Error::malformed(format!("{} is missing the 'name' attribute", self.construct))
        })
    }

    /// Resolve a QName-valued attribute in this handler's scope
    pub fn reference(&self, name: &str) -> Option<QName> {
        self.attributes
            .get(name)
            .map(|value| self.scope.resolve_reference(value))
    }
}

/// Arena of handlers for one document
#[derive(Debug, Clone, Default)]
pub struct HandlerArena {
    handlers: Vec<Handler>,
}

impl HandlerArena {
    /// Create an empty arena
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a handler
    pub fn push(&mut self, handler: Handler) -> HandlerId {
        self.handlers.push(handler);
        HandlerId(self.handlers.len() - 1)
    }

    /// Get a handler
    pub fn get(&self, id: HandlerId) -> Option<&Handler> {
        self.handlers.get(id.0)
    }

    /// Number of handlers
    pub fn len(&self) -> usize {
        self.handlers.len()
    }

    /// Check if the arena is empty
    pub fn is_empty(&self) -> bool {
        self.handlers.is_empty()
    }

    /// Construct of a handler's parent
    pub fn parent_construct(&self, id: HandlerId) -> Option<Construct> {
        self.get(id)
            .and_then(|h| h.parent)
            .and_then(|p| self.get(p))
            .map(|p| p.construct)
    }

    /// Children of a handler, in document order
    pub fn children(&self, id: HandlerId) -> impl Iterator<Item = (HandlerId, &Handler)> {
        self.get(id)
            .map(|h| h.children.as_slice())
            .unwrap_or(&[])
            .iter()
            .filter_map(move |child| self.get(*child).map(|h| (*child, h)))
    }

    /// First child satisfying a predicate on its construct
    pub fn find_child(
        &self,
        id: HandlerId,
        predicate: impl Fn(Construct) -> bool,
    ) -> Option<(HandlerId, &Handler)> {
        self.children(id).find(|(_, h)| predicate(h.construct))
    }

    /// Attach a finished child to its parent
    pub(crate) fn on_child_finished(&mut self, parent: HandlerId, child: HandlerId) {
        if let Some(handler) = self.handlers.get_mut(parent.0) {
            handler.children.push(child);
        }
    }
}

impl Index<HandlerId> for HandlerArena {
    type Output = Handler;

    fn index(&self, id: HandlerId) -> &Handler {
        &self.handlers[id.0]
    }
}
