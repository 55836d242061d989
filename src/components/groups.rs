//! XSD content model groupings
//!
//! [`ElementGrouping`] is the one tagged family for everything that can
//! appear in a content model: the three compositors, named group references,
//! element particles and element wildcards.
//!
//! Reference: https://www.w3.org/TR/xmlschema11-1/#Model_Groups

use crate::namespaces::QName;
use std::collections::HashSet;
use std::fmt;
use std::sync::Arc;

use super::elements::ElementParticle;
use super::particles::Occurs;
use super::wildcards::AnyElement;
use super::Link;

/// Kind of a grouping node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupingKind {
    /// Ordered compositor
    Sequence,
    /// Alternative compositor
    Choice,
    /// Unordered compositor
    All,
    /// Reference to a named group
    Group,
    /// Element particle
    Element,
    /// Element wildcard
    Any,
}

impl fmt::Display for GroupingKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Sequence => "sequence",
            Self::Choice => "choice",
            Self::All => "all",
            Self::Group => "group",
            Self::Element => "element",
            Self::Any => "any",
        };
        f.write_str(name)
    }
}

/// Children of a compositor
#[derive(Debug, Clone, Default)]
pub struct ModelGroup {
    /// Occurrence bounds of the compositor
    pub occurs: Occurs,
    /// Children in declaration order
    pub children: Vec<ElementGrouping>,
}

impl ModelGroup {
    /// Create a compositor body
    pub fn new(occurs: Occurs, children: Vec<ElementGrouping>) -> Self {
        Self { occurs, children }
    }
}

/// A reference to a named group
#[derive(Debug, Clone)]
pub struct GroupParticle {
    /// Name of the referenced group
    pub name: QName,
    /// Occurrence bounds of the reference
    pub occurs: Occurs,
    /// The referenced definition
    pub definition: Link<GroupDef>,
}

/// A named group definition
#[derive(Debug, Clone)]
pub struct GroupDef {
    /// Group name
    pub name: QName,
    /// The compositor the group wraps
    pub child: Option<ElementGrouping>,
}

/// A content model node
#[derive(Debug, Clone)]
pub enum ElementGrouping {
    /// xs:sequence
    Sequence(Arc<ModelGroup>),
    /// xs:choice
    Choice(Arc<ModelGroup>),
    /// xs:all
    All(Arc<ModelGroup>),
    /// xs:group ref
    Group(Arc<GroupParticle>),
    /// xs:element (local or ref)
    Element(Arc<ElementParticle>),
    /// xs:any
    Any(Arc<AnyElement>),
}

impl ElementGrouping {
    /// Get the kind of this node
    pub fn kind(&self) -> GroupingKind {
        match self {
            Self::Sequence(_) => GroupingKind::Sequence,
            Self::Choice(_) => GroupingKind::Choice,
            Self::All(_) => GroupingKind::All,
            Self::Group(_) => GroupingKind::Group,
            Self::Element(_) => GroupingKind::Element,
            Self::Any(_) => GroupingKind::Any,
        }
    }

    /// Occurrence bounds of this node
    pub fn occurs(&self) -> Occurs {
        match self {
            Self::Sequence(g) | Self::Choice(g) | Self::All(g) => g.occurs,
            Self::Group(g) => g.occurs,
            Self::Element(e) => e.occurs,
            Self::Any(a) => a.occurs,
        }
    }

    /// Compositor body, for sequence/choice/all
    pub fn model_group(&self) -> Option<&Arc<ModelGroup>> {
        match self {
            Self::Sequence(g) | Self::Choice(g) | Self::All(g) => Some(g),
            _ => None,
        }
    }

    /// Direct children; group references are not expanded
    pub fn children(&self) -> &[ElementGrouping] {
        match self.model_group() {
            Some(group) => &group.children,
            None => &[],
        }
    }

    /// Check if this is a compositor with no children
    pub fn is_empty(&self) -> bool {
        self.model_group().map_or(false, |g| g.children.is_empty())
    }

    /// Check if two handles are the same compiled node
    pub fn same_node(&self, other: &ElementGrouping) -> bool {
        match (self, other) {
            (Self::Sequence(a), Self::Sequence(b))
            | (Self::Choice(a), Self::Choice(b))
            | (Self::All(a), Self::All(b)) => Arc::ptr_eq(a, b),
            (Self::Group(a), Self::Group(b)) => Arc::ptr_eq(a, b),
            (Self::Element(a), Self::Element(b)) => Arc::ptr_eq(a, b),
            (Self::Any(a), Self::Any(b)) => Arc::ptr_eq(a, b),
            _ => false,
        }
    }

    /// Names of the element particles reachable from this node, in order,
    /// expanding group references once each
    pub fn element_names(&self) -> Vec<QName> {
        let mut names = Vec::new();
        let mut visited = HashSet::new();
        self.collect_names(&mut names, &mut visited);
        names
    }

    fn collect_names(&self, names: &mut Vec<QName>, visited: &mut HashSet<*const GroupDef>) {
        match self {
            Self::Sequence(g) | Self::Choice(g) | Self::All(g) => {
                for child in &g.children {
                    child.collect_names(names, visited);
                }
            }
            Self::Group(particle) => {
                if let Some(definition) = particle.definition.get() {
                    if visited.insert(Arc::as_ptr(&definition)) {
                        if let Some(child) = &definition.child {
                            child.collect_names(names, visited);
                        }
                    }
                }
            }
            Self::Element(particle) => names.push(particle.name.clone()),
            Self::Any(_) => {}
        }
    }
}

// Compact form: `sequence(a, choice(b, c[0..1]))`
impl fmt::Display for ElementGrouping {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sequence(g) | Self::Choice(g) | Self::All(g) => {
                write!(f, "{}(", self.kind())?;
                for (i, child) in g.children.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}", child)?;
                }
                write!(f, ")")?;
            }
            Self::Group(g) => write!(f, "group({})", g.name.local_name)?,
            Self::Element(e) => write!(f, "{}", e.name.local_name)?,
            Self::Any(_) => write!(f, "any")?,
        }
        let occurs = self.occurs();
        if !occurs.is_once() {
            write!(f, "{}", occurs)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::builtins::builtin_simple_type;
    use crate::components::elements::{Element, TypeDef};
    use crate::components::wildcards::{NamespaceConstraint, ProcessContents};

    fn element(name: &str, occurs: Occurs) -> ElementGrouping {
        let declaration = Arc::new(Element::new(
            QName::local(name),
            TypeDef::Simple(builtin_simple_type("string").unwrap()),
        ));
        ElementGrouping::Element(Arc::new(ElementParticle {
            name: QName::local(name),
            occurs,
            element: Link::Resolved(declaration),
        }))
    }

    #[test]
    fn test_display() {
        let choice = ElementGrouping::Choice(Arc::new(ModelGroup::new(
            Occurs::once(),
            vec![element("b", Occurs::once()), element("c", Occurs::optional())],
        )));
        let any = ElementGrouping::Any(Arc::new(AnyElement::new(
            NamespaceConstraint::Any,
            ProcessContents::Lax,
            Occurs::zero_or_more(),
        )));
        let sequence = ElementGrouping::Sequence(Arc::new(ModelGroup::new(
            Occurs::once(),
            vec![element("a", Occurs::once()), choice, any],
        )));
        assert_eq!(
            sequence.to_string(),
            "sequence(a, choice(b, c[0..1]), any[0..unbounded])"
        );
        assert_eq!(
            sequence.element_names().iter().map(|n| n.local_name.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_group_reference_expansion() {
        let definition = Arc::new(GroupDef {
            name: QName::local("g"),
            child: Some(ElementGrouping::Sequence(Arc::new(ModelGroup::new(
                Occurs::once(),
                vec![element("x", Occurs::once())],
            )))),
        });
        let reference = ElementGrouping::Group(Arc::new(GroupParticle {
            name: QName::local("g"),
            occurs: Occurs::new(0, None),
            definition: Link::Resolved(definition),
        }));
        assert_eq!(reference.to_string(), "group(g)[0..unbounded]");
        assert_eq!(reference.kind(), GroupingKind::Group);
        assert!(reference.children().is_empty());
        assert_eq!(reference.element_names(), vec![QName::local("x")]);
    }

    #[test]
    fn test_same_node() {
        let a = element("a", Occurs::once());
        let b = a.clone();
        assert!(a.same_node(&b));
        assert!(!a.same_node(&element("a", Occurs::once())));
    }
}
