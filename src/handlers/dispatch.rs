//! Child dispatch
//!
//! Decides, for a parent handler and the name of a child element, whether a
//! child handler is created. Annotations and foreign-namespace elements are
//! skipped with their whole subtree. A construct the parent's grammar does not
//! allow, or a second child of an exclusive slot, is an `UnexpectedChild`
//! error raised on the spot.

use super::{Construct, HandlerArena, HandlerId};
use crate::error::{Error, Result};
use crate::namespaces::QName;
use crate::XSD_NAMESPACE;

use Construct::*;

/// Slots of which a parent accepts at most one child, across all members
type Exclusive = &'static [&'static [Construct]];

const GROUPINGS: &[Construct] = &[Group, All, Choice, Sequence];
const COMPLEX_TYPE_CONTENT: &[Construct] =
    &[Group, All, Choice, Sequence, SimpleContent, ComplexContent];
const DERIVATIONS: &[Construct] = &[Restriction, Extension];
const SIMPLE_DERIVATIONS: &[Construct] = &[Restriction, List, Union];
const TYPE_DEFINITIONS: &[Construct] = &[SimpleType, ComplexType];

/// Decide how a child element is handled
///
/// Returns the construct to instantiate, or None when the child and its
/// subtree are skipped.
pub fn accept_child(arena: &HandlerArena, parent: HandlerId, child: &QName) -> Result<Option<Construct>> {
    if child.namespace.as_deref() != Some(XSD_NAMESPACE) {
        tracing::trace!(element = %child, "skipping foreign element");
        return Ok(None);
    }
    if child.local_name == "annotation" {
        return Ok(None);
    }

    let construct = match Construct::from_local_name(&child.local_name) {
        Some(construct) => construct,
        None => {
            tracing::debug!(element = %child.local_name, "skipping unsupported XSD element");
            return Ok(None);
        }
    };

    let parent_construct = arena[parent].construct;
    let grandparent = arena.parent_construct(parent);

    if !allows(parent_construct, grandparent, construct) {
        return Err(Error::unexpected_child(format!(
            "{} is not allowed inside {}",
            construct, parent_construct
        )));
    }

    for slot in exclusive(parent_construct, grandparent) {
        if !slot.contains(&construct) {
            continue;
        }
        if let Some((_, existing)) = arena.find_child(parent, |c| slot.contains(&c)) {
            return Err(Error::unexpected_child(format!(
                "{} cannot follow {} inside {}: at most one is allowed",
                construct, existing.construct, parent_construct
            )));
        }
    }

    Ok(Some(construct))
}

fn is_attribute_use(c: Construct) -> bool {
    matches!(c, Attribute | AttributeGroup | AnyAttribute)
}

/// Grammar of each construct; restriction and extension depend on where they appear
fn allows(parent: Construct, grandparent: Option<Construct>, child: Construct) -> bool {
    match parent {
        Schema => matches!(
            child,
            Include | Import | Redefine | SimpleType | ComplexType | Element | Attribute
                | AttributeGroup | Group
        ),
        Redefine => matches!(child, SimpleType | ComplexType | Group | AttributeGroup),
        ComplexType => COMPLEX_TYPE_CONTENT.contains(&child) || is_attribute_use(child),
        SimpleContent | ComplexContent => DERIVATIONS.contains(&child),
        Extension | Restriction => match grandparent {
            Some(ComplexContent) => GROUPINGS.contains(&child) || is_attribute_use(child),
            Some(SimpleContent) if parent == Extension => is_attribute_use(child),
            Some(SimpleContent) => {
                matches!(child, SimpleType | Facet(_)) || is_attribute_use(child)
            }
            Some(SimpleType) if parent == Restriction => matches!(child, SimpleType | Facet(_)),
            _ => false,
        },
        SimpleType => SIMPLE_DERIVATIONS.contains(&child),
        List | Union | Attribute => child == SimpleType,
        Element => TYPE_DEFINITIONS.contains(&child) || child.is_identity(),
        AttributeGroup => is_attribute_use(child),
        Group => matches!(child, All | Choice | Sequence),
        Sequence | Choice => matches!(child, Element | Group | Choice | Sequence | Any),
        All => matches!(child, Element | Any | Group),
        Key | Keyref | Unique => matches!(child, Selector | Field),
        Any | AnyAttribute | Import | Include | Selector | Field | Facet(_) => false,
    }
}

fn exclusive(parent: Construct, grandparent: Option<Construct>) -> Exclusive {
    match parent {
        ComplexType => &[COMPLEX_TYPE_CONTENT, &[AnyAttribute]],
        SimpleContent | ComplexContent => &[DERIVATIONS],
        Extension | Restriction => match grandparent {
            Some(ComplexContent) => &[GROUPINGS, &[AnyAttribute]],
            Some(SimpleContent) => &[&[SimpleType], &[AnyAttribute]],
            _ => &[&[SimpleType]],
        },
        SimpleType => &[SIMPLE_DERIVATIONS],
        List | Attribute => &[&[SimpleType]],
        Element => &[TYPE_DEFINITIONS],
        AttributeGroup => &[&[AnyAttribute]],
        Group => &[&[All, Choice, Sequence]],
        Key | Keyref | Unique => &[&[Selector]],
        _ => &[],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::FacetKind;
    use crate::handlers::{Attributes, Handler};
    use crate::namespaces::NamespaceContext;
    use std::sync::Arc;

    fn xs(name: &str) -> QName {
        QName::namespaced(XSD_NAMESPACE, name)
    }

    fn add(arena: &mut HandlerArena, construct: Construct, parent: Option<HandlerId>) -> HandlerId {
        let id = arena.push(Handler {
            construct,
            attributes: Attributes::default(),
            children: Vec::new(),
            parent,
            scope: Arc::new(NamespaceContext::new()),
        });
        if let Some(parent) = parent {
            arena.on_child_finished(parent, id);
        }
        id
    }

    #[test]
    fn test_skips_annotation_and_foreign() {
        let mut arena = HandlerArena::new();
        let schema = add(&mut arena, Schema, None);
        assert_eq!(accept_child(&arena, schema, &xs("annotation")).unwrap(), None);
        assert_eq!(accept_child(&arena, schema, &xs("notation")).unwrap(), None);
        assert_eq!(
            accept_child(&arena, schema, &QName::namespaced("urn:ext", "element")).unwrap(),
            None
        );
        assert_eq!(accept_child(&arena, schema, &xs("element")).unwrap(), Some(Element));
    }

    #[test]
    fn test_grammar_rejects_misplaced_construct() {
        let mut arena = HandlerArena::new();
        let schema = add(&mut arena, Schema, None);
        let sequence_in_schema = accept_child(&arena, schema, &xs("sequence"));
        assert!(matches!(sequence_in_schema, Err(Error::UnexpectedChild(_))));

        let ct = add(&mut arena, ComplexType, Some(schema));
        let seq = add(&mut arena, Sequence, Some(ct));
        assert!(matches!(
            accept_child(&arena, seq, &xs("attribute")),
            Err(Error::UnexpectedChild(_))
        ));
        assert_eq!(accept_child(&arena, seq, &xs("any")).unwrap(), Some(Any));
    }

    #[test]
    fn test_second_exclusive_child() {
        let mut arena = HandlerArena::new();
        let schema = add(&mut arena, Schema, None);
        let ct = add(&mut arena, ComplexType, Some(schema));
        assert_eq!(accept_child(&arena, ct, &xs("attribute")).unwrap(), Some(Attribute));
        add(&mut arena, Sequence, Some(ct));

        let result = accept_child(&arena, ct, &xs("choice"));
        assert!(matches!(result, Err(Error::UnexpectedChild(_))));
        // Attributes may follow the content model
        assert_eq!(accept_child(&arena, ct, &xs("attribute")).unwrap(), Some(Attribute));
    }

    #[test]
    fn test_restriction_grammar_depends_on_context() {
        let mut arena = HandlerArena::new();
        let schema = add(&mut arena, Schema, None);
        let st = add(&mut arena, SimpleType, Some(schema));
        let simple_restriction = add(&mut arena, Restriction, Some(st));
        assert_eq!(
            accept_child(&arena, simple_restriction, &xs("enumeration")).unwrap(),
            Some(Facet(FacetKind::Enumeration))
        );
        assert!(accept_child(&arena, simple_restriction, &xs("sequence")).is_err());

        let ct = add(&mut arena, ComplexType, Some(schema));
        let cc = add(&mut arena, ComplexContent, Some(ct));
        let complex_restriction = add(&mut arena, Restriction, Some(cc));
        assert_eq!(
            accept_child(&arena, complex_restriction, &xs("sequence")).unwrap(),
            Some(Sequence)
        );
        assert!(accept_child(&arena, complex_restriction, &xs("enumeration")).is_err());
    }

    #[test]
    fn test_union_accepts_many_simple_types() {
        let mut arena = HandlerArena::new();
        let schema = add(&mut arena, Schema, None);
        let st = add(&mut arena, SimpleType, Some(schema));
        let union = add(&mut arena, Union, Some(st));
        add(&mut arena, SimpleType, Some(union));
        assert_eq!(accept_child(&arena, union, &xs("simpleType")).unwrap(), Some(SimpleType));

        let list = add(&mut arena, List, Some(st));
        add(&mut arena, SimpleType, Some(list));
        assert!(accept_child(&arena, list, &xs("simpleType")).is_err());
    }
}
