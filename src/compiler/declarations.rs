//! Declarations and particles
//!
//! Elements, attributes, named groups and their references, compositors,
//! wildcards and identity constraints.

use super::{is_top_level, Compiled, Compiler, NodeRef, Pending};
use crate::components::{
    any_simple_type, any_type, AnyAttribute, AnyElement, Attribute, AttributeGroup, AttributeSet,
    AttributeUse, Element, ElementGrouping, ElementParticle, FormDefault, GroupDef, GroupParticle,
    IdentityConstraint, IdentityKind, Link, ModelGroup, NamespaceConstraint, ProcessContents,
    TypeDef,
};
use crate::error::{Error, Result};
use crate::handlers::Construct;
use crate::names::validate_ncname;
use crate::namespaces::QName;
use std::sync::Arc;

impl Compiler<'_> {
    pub(super) fn compile_global_element(&mut self, node: NodeRef) -> Result<Arc<Element>> {
        let name = self.declared_name(node)?;
        let placeholder_name = name.clone();
        let build_name = name.clone();
        self.compile_cyclic(
            node,
            move || Element::new(placeholder_name, TypeDef::Simple(any_simple_type())),
            Pending::Element,
            move |compiler| compiler.build_element(node, build_name, true),
        )
        .map_err(|e| e.in_component(&name))
    }

    pub(super) fn compile_element_particle(&mut self, node: NodeRef) -> Result<ElementGrouping> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);
        let occurs = handler.attributes.occurs()?;

        if let Some(reference) = handler.reference("ref") {
            let (name, element) = self.lookup_element(doc.unit, &reference)?;
            return Ok(ElementGrouping::Element(Arc::new(ElementParticle {
                name,
                occurs,
                element,
            })));
        }

        let local = handler.required_name()?;
        validate_ncname(local)?;
        let form = match handler.attribute("form") {
            Some(form) => FormDefault::from_str(form)?,
            None => self.form_default(node, "elementFormDefault")?,
        };
        let name = if form.is_qualified() {
            QName::new(doc.namespace.clone(), local)
        } else {
            QName::local(local)
        };

        let element = self
            .build_element(node, name.clone(), false)
            .map_err(|e| e.in_component(&name))?;
        Ok(ElementGrouping::Element(Arc::new(ElementParticle {
            name,
            occurs,
            element: Link::Resolved(Arc::new(element)),
        })))
    }

    fn build_element(&mut self, node: NodeRef, name: QName, top_level: bool) -> Result<Element> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);

        let substitution_group = match handler.reference("substitutionGroup") {
            Some(head) if top_level => Some(self.lookup_element(doc.unit, &head)?.1),
            Some(_) => {
                return Err(Error::malformed(
                    "'substitutionGroup' is only allowed on top-level elements",
                ))
            }
            None => None,
        };

        let inline = self.first_child(node, |c| matches!(c, Construct::SimpleType | Construct::ComplexType));
        let type_def = match (handler.reference("type"), inline) {
            (Some(_), Some(_)) => {
                return Err(Error::malformed(
                    "element has both a 'type' attribute and an inline type definition",
                ))
            }
            (Some(type_name), None) => self.lookup_type(doc.unit, &type_name)?,
            (None, Some(inline)) => self.compile_type(inline)?,
            (None, None) => substitution_group
                .as_ref()
                .and_then(Link::get)
                .map(|head| head.type_def.clone())
                .unwrap_or_else(|| TypeDef::from(any_type())),
        };

        let mut element = Element::new(name, type_def).with_value_constraint(
            handler.attribute("default").map(String::from),
            handler.attribute("fixed").map(String::from),
        )?;
        if let (TypeDef::Simple(simple), Some(value)) = (&element.type_def, element.value_constraint()) {
            simple.validate(value)?;
        }

        element.nillable = handler.attributes.flag("nillable")?;
        element.is_abstract = handler.attributes.flag("abstract")?;
        element.block = match handler.attributes.derivation_set("block")? {
            Some(block) => block,
            None => self.derivation_default(node, "blockDefault")?,
        };
        element.final_set = match handler.attributes.derivation_set("final")? {
            Some(final_set) => final_set,
            None => self.derivation_default(node, "finalDefault")?,
        };
        element.substitution_group = substitution_group;

        for (child, construct) in self.child_nodes(node) {
            if construct.is_identity() {
                if let Compiled::IdentityConstraint(identity) = self.compress(child)? {
                    element.identities.push(identity);
                }
            }
        }
        Ok(element)
    }

    /// Compile an inline type definition
    pub(super) fn compile_type(&mut self, node: NodeRef) -> Result<TypeDef> {
        match self.compress(node)? {
            Compiled::Type(type_def) => Ok(type_def),
            other => Err(Error::unexpected_child(format!(
                "expected a type definition, found {}",
                other.kind()
            ))),
        }
    }

    /// Compile a particle of a content model
    pub(super) fn compile_grouping(&mut self, node: NodeRef) -> Result<ElementGrouping> {
        match self.compress(node)? {
            Compiled::Grouping(grouping) => Ok(grouping),
            other => Err(Error::unexpected_child(format!(
                "expected a content model particle, found {}",
                other.kind()
            ))),
        }
    }

    pub(super) fn compile_group_definition(&mut self, node: NodeRef) -> Result<Arc<GroupDef>> {
        let name = self.declared_name(node)?;
        let placeholder_name = name.clone();
        let build_name = name.clone();
        self.compile_cyclic(
            node,
            move || GroupDef {
                name: placeholder_name,
                child: None,
            },
            Pending::Group,
            move |compiler| {
                let child = match compiler.first_child(node, |c| c.is_compositor()) {
                    Some(child) => Some(compiler.compile_grouping(child)?),
                    None => None,
                };
                Ok(GroupDef {
                    name: build_name,
                    child,
                })
            },
        )
        .map_err(|e| e.in_component(&name))
    }

    pub(super) fn compile_group_reference(&mut self, node: NodeRef) -> Result<ElementGrouping> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);
        let reference = handler.reference("ref").ok_or_else(|| {
            Error::malformed("xs:group inside a content model needs a 'ref' attribute")
        })?;
        let occurs = handler.attributes.occurs()?;
        let (name, definition) = self.lookup_group(doc.unit, &reference)?;
        Ok(ElementGrouping::Group(Arc::new(GroupParticle {
            name,
            occurs,
            definition,
        })))
    }

    pub(super) fn compile_model_group(&mut self, node: NodeRef) -> Result<ElementGrouping> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);
        let occurs = handler.attributes.occurs()?;

        let mut children = Vec::new();
        for (child, _) in self.child_nodes(node) {
            children.push(self.compile_grouping(child)?);
        }

        let group = Arc::new(ModelGroup::new(occurs, children));
        Ok(match handler.construct {
            Construct::Choice => ElementGrouping::Choice(group),
            Construct::All => {
                if occurs.max != Some(1) || occurs.min > 1 {
                    return Err(Error::malformed(format!(
                        "xs:all must occur at most once, found {}",
                        occurs
                    )));
                }
                ElementGrouping::All(group)
            }
            _ => ElementGrouping::Sequence(group),
        })
    }

    pub(super) fn compile_any(&mut self, node: NodeRef) -> Result<ElementGrouping> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);
        let occurs = handler.attributes.occurs()?;
        let namespace = NamespaceConstraint::parse(handler.attribute("namespace"), doc.namespace.as_deref())?;
        let process_contents = process_contents(handler.attribute("processContents"))?;
        Ok(ElementGrouping::Any(Arc::new(AnyElement::new(
            namespace,
            process_contents,
            occurs,
        ))))
    }

    pub(super) fn compile_any_attribute(&mut self, node: NodeRef) -> Result<AnyAttribute> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);
        let namespace = NamespaceConstraint::parse(handler.attribute("namespace"), doc.namespace.as_deref())?;
        let process_contents = process_contents(handler.attribute("processContents"))?;
        Ok(AnyAttribute::new(namespace, process_contents))
    }

    pub(super) fn compile_attribute(&mut self, node: NodeRef) -> Result<Arc<Attribute>> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);
        let top_level = is_top_level(doc.document.arena.parent_construct(node.id));

        let use_mode = handler
            .attribute("use")
            .map(AttributeUse::from_str)
            .transpose()?;
        let default = handler.attribute("default").map(String::from);
        let fixed = handler.attribute("fixed").map(String::from);

        if let Some(reference) = handler.reference("ref") {
            if top_level {
                return Err(Error::malformed("a top-level attribute cannot have a 'ref'"));
            }
            let global = self.lookup_attribute(doc.unit, &reference)?;
            if use_mode.is_none() && default.is_none() && fixed.is_none() {
                return Ok(global);
            }
            let (default, fixed) = if default.is_some() || fixed.is_some() {
                (default, fixed)
            } else {
                (global.default.clone(), global.fixed.clone())
            };
            let attribute = Attribute::new(global.name.clone(), Arc::clone(&global.simple_type))
                .with_use(use_mode.unwrap_or(global.use_mode))
                .with_value_constraint(default, fixed)
                .map_err(|e| e.in_component(&global.name))?;
            return Ok(Arc::new(attribute));
        }

        let local = handler.required_name()?;
        validate_ncname(local)?;
        if local == "xmlns" {
            return Err(Error::malformed("an attribute cannot be named 'xmlns'"));
        }
        let name = if top_level {
            if use_mode.is_some() {
                return Err(Error::malformed("'use' is not allowed on a top-level attribute"));
            }
            QName::new(doc.namespace.clone(), local)
        } else {
            let form = match handler.attribute("form") {
                Some(form) => FormDefault::from_str(form)?,
                None => self.form_default(node, "attributeFormDefault")?,
            };
            if form.is_qualified() {
                QName::new(doc.namespace.clone(), local)
            } else {
                QName::local(local)
            }
        };

        let inline = self.first_child(node, |c| c == Construct::SimpleType);
        let simple_type = match (handler.reference("type"), inline) {
            (Some(_), Some(_)) => {
                return Err(Error::malformed(
                    "attribute has both a 'type' attribute and an inline simpleType",
                )
                .in_component(&name))
            }
            (Some(type_name), None) => self
                .lookup_simple_type(doc.unit, &type_name)
                .map_err(|e| e.in_component(&name))?,
            (None, Some(inline)) => match self.compile_type(inline)? {
                TypeDef::Simple(simple) => simple,
                TypeDef::Complex(_) => {
                    return Err(Error::malformed("attribute type must be simple").in_component(&name))
                }
            },
            (None, None) => any_simple_type(),
        };

        let attribute = Attribute::new(name.clone(), simple_type)
            .with_use(use_mode.unwrap_or_default())
            .with_value_constraint(default, fixed)
            .map_err(|e| e.in_component(&name))?;
        Ok(Arc::new(attribute))
    }

    pub(super) fn compile_attribute_group(&mut self, node: NodeRef) -> Result<Arc<AttributeGroup>> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);
        if let Some(reference) = handler.reference("ref") {
            return self.lookup_attribute_group(doc.unit, &reference);
        }

        let name = self.declared_name(node)?;
        let (attributes, wildcard) = self
            .collect_attributes(node)
            .map_err(|e| e.in_component(&name))?;
        Ok(Arc::new(AttributeGroup {
            name,
            attributes,
            wildcard,
        }))
    }

    /// Attribute uses and wildcard declared directly under a node
    ///
    /// Attributes declared locally win over same-named attributes that come in
    /// through an attribute group. The wildcard is the intersection of the
    /// local wildcard with the wildcards of all referenced groups.
    pub(super) fn collect_attributes(
        &mut self,
        node: NodeRef,
    ) -> Result<(AttributeSet, Option<AnyAttribute>)> {
        let mut local = AttributeSet::new();
        let mut grouped = AttributeSet::new();
        let mut local_wildcard = None;
        let mut group_wildcards = Vec::new();

        for (child, construct) in self.child_nodes(node) {
            match construct {
                Construct::Attribute => {
                    if let Compiled::Attribute(attribute) = self.compress(child)? {
                        local.insert(attribute)?;
                    }
                }
                Construct::AttributeGroup => {
                    if let Compiled::AttributeGroup(group) = self.compress(child)? {
                        for attribute in group.attributes.iter() {
                            grouped.insert(Arc::clone(attribute))?;
                        }
                        if let Some(wildcard) = &group.wildcard {
                            group_wildcards.push(wildcard.clone());
                        }
                    }
                }
                Construct::AnyAttribute => {
                    if let Compiled::AttributeWildcard(wildcard) = self.compress(child)? {
                        local_wildcard = Some(wildcard);
                    }
                }
                _ => {}
            }
        }

        for attribute in grouped.iter() {
            if !local.insert_if_absent(Arc::clone(attribute)) {
                tracing::debug!(attribute = %attribute.name, "local declaration overrides attribute group");
            }
        }

        let wildcard = group_wildcards
            .into_iter()
            .fold(local_wildcard, |acc, wildcard| match acc {
                Some(acc) => Some(acc.intersect(&wildcard)),
                None => Some(wildcard),
            });
        Ok((local, wildcard))
    }

    pub(super) fn compile_identity(&mut self, node: NodeRef) -> Result<IdentityConstraint> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);
        let kind = IdentityKind::from_local_name(handler.construct.local_name())
            .ok_or_else(|| Error::unsupported(format!("{} is not an identity constraint", handler.construct)))?;
        let name = self.declared_name(node)?;

        let mut selector = None;
        let mut fields = Vec::new();
        for (child, construct) in self.child_nodes(node) {
            let xpath = doc
                .handler(child.id)
                .attribute("xpath")
                .map(|xpath| xpath.trim().to_string())
                .ok_or_else(|| Error::malformed(format!("{} is missing the 'xpath' attribute", construct)));
            match construct {
                Construct::Selector => selector = Some(xpath?),
                Construct::Field => fields.push(xpath?),
                _ => {}
            }
        }

        IdentityConstraint::new(kind, name.clone(), selector, fields, handler.reference("refer"))
            .map_err(|e| e.in_component(&name))
    }
}

fn process_contents(value: Option<&str>) -> Result<ProcessContents> {
    value
        .map(ProcessContents::from_str)
        .transpose()
        .map(Option::unwrap_or_default)
}
