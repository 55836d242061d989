//! Compiled schema components
//!
//! Everything in this module is immutable once produced. Components refer to
//! each other through `Arc`; a reference that points back at a component still
//! being compiled (an element whose type contains the same element, a group
//! reached again through its own content) is a [`Link::Forward`] holding a weak
//! handle, so the compiled graph never owns itself.

pub mod attributes;
pub mod builtins;
pub mod complex_types;
pub mod elements;
pub mod facets;
pub mod groups;
pub mod identities;
pub mod particles;
pub mod schemas;
pub mod simple_types;
pub mod wildcards;

use std::fmt;
use std::sync::{Arc, Weak};

pub use attributes::{Attribute, AttributeGroup, AttributeSet, AttributeUse};
pub use builtins::{any_simple_type, any_type, builtin_simple_type, BuiltinType};
pub use complex_types::{ComplexType, ContentModel, DerivationMethod};
pub use elements::{Element, ElementParticle, TypeDef};
pub use facets::{Facet, FacetKind, Facets, WhiteSpace};
pub use groups::{ElementGrouping, GroupDef, GroupParticle, GroupingKind, ModelGroup};
pub use identities::{IdentityConstraint, IdentityKind};
pub use particles::{parse_occurs, Occurs, UNBOUNDED};
pub use schemas::{DerivationSet, FormDefault, ImportedSchema, Schema};
pub use simple_types::{SimpleDerivation, SimpleType, SimpleTypeVariety};
pub use wildcards::{AnyAttribute, AnyElement, NamespaceConstraint, ProcessContents};

/// Handle to a compiled component
///
/// `Resolved` owns the target. `Forward` is the handle handed out while the
/// target was still being compiled; it upgrades as long as the schema that
/// owns the target is alive.
pub enum Link<T> {
    /// Fully compiled target
    Resolved(Arc<T>),
    /// Back-reference to a component compiled further up the call graph
    Forward(Weak<T>),
}

impl<T> Link<T> {
    /// Get the target, if it is still alive
    pub fn get(&self) -> Option<Arc<T>> {
        match self {
            Link::Resolved(target) => Some(Arc::clone(target)),
            Link::Forward(weak) => weak.upgrade(),
        }
    }

    /// Check whether this is a back-reference
    pub fn is_forward(&self) -> bool {
        matches!(self, Link::Forward(_))
    }

    /// Check whether this handle points at the given component
    pub fn points_to(&self, target: &Arc<T>) -> bool {
        self.as_ptr() == Arc::as_ptr(target)
    }

    /// Check whether two handles point at the same component
    pub fn same_target(&self, other: &Link<T>) -> bool {
        self.as_ptr() == other.as_ptr()
    }

    fn as_ptr(&self) -> *const T {
        match self {
            Link::Resolved(target) => Arc::as_ptr(target),
            Link::Forward(weak) => weak.as_ptr(),
        }
    }
}

impl<T> Clone for Link<T> {
    fn clone(&self) -> Self {
        match self {
            Link::Resolved(target) => Link::Resolved(Arc::clone(target)),
            Link::Forward(weak) => Link::Forward(Weak::clone(weak)),
        }
    }
}

impl<T> From<Arc<T>> for Link<T> {
    fn from(target: Arc<T>) -> Self {
        Link::Resolved(target)
    }
}

// Targets are not printed: a forward link may close a cycle
impl<T> fmt::Debug for Link<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Link::Resolved(_) => write!(f, "Link::Resolved({:p})", self.as_ptr()),
            Link::Forward(_) => write!(f, "Link::Forward({:p})", self.as_ptr()),
        }
    }
}
