//! Type definitions and derivation
//!
//! Complex types derived by extension get their content model flattened: the
//! base grouping followed by the extension's own, so `base(a, b) + (c)` reads
//! `sequence(a, b, c)`. Derived attribute sets start from the base's.
//!
//! Deriving needs the base complete. A base is only a cycle when it is itself
//! in the middle of looking up its own base chain. A base that is merely
//! building its content (it holds an element of the derived type) is compiled
//! again from inside the derived type's base lookup.

use super::{is_top_level, Compiled, Compiler, Deferral, Memo, NodeRef, Pending};
use crate::components::{
    AnyAttribute, AttributeSet, ComplexType, ContentModel, DerivationMethod, ElementGrouping,
    Facet, Facets, Link, ModelGroup, Occurs, SimpleType, SimpleTypeVariety, TypeDef,
};
use crate::error::{Error, Result};
use crate::handlers::Construct;
use crate::namespaces::QName;
use std::sync::{Arc, Weak};

/// Append `addition` to the content model `base`
///
/// A sequence base that occurs once is extended in place, and a once-occurring
/// sequence addition contributes its children rather than itself. A group
/// reference that occurs once is looked through. Anything else is wrapped in a
/// new sequence of the two.
pub fn flatten(base: &ElementGrouping, addition: &ElementGrouping) -> ElementGrouping {
    if base.is_empty() {
        return addition.clone();
    }
    if addition.is_empty() {
        return base.clone();
    }

    match base {
        ElementGrouping::Sequence(sequence) if sequence.occurs.is_once() => {
            let mut children = sequence.children.clone();
            match addition {
                ElementGrouping::Sequence(more) if more.occurs.is_once() => {
                    children.extend(more.children.iter().cloned())
                }
                other => children.push(other.clone()),
            }
            ElementGrouping::Sequence(Arc::new(ModelGroup::new(Occurs::once(), children)))
        }
        ElementGrouping::Group(particle) if particle.occurs.is_once() => {
            match particle.definition.get().and_then(|group| group.child.clone()) {
                Some(child) if !child.is_empty() => flatten(&child, addition),
                Some(_) | None if !particle.definition.is_forward() => addition.clone(),
                _ => wrap(base, addition),
            }
        }
        _ => wrap(base, addition),
    }
}

fn wrap(base: &ElementGrouping, addition: &ElementGrouping) -> ElementGrouping {
    ElementGrouping::Sequence(Arc::new(ModelGroup::new(
        Occurs::once(),
        vec![base.clone(), addition.clone()],
    )))
}

fn unite(base: Option<&AnyAttribute>, local: Option<AnyAttribute>) -> Option<AnyAttribute> {
    match (base, local) {
        (Some(base), Some(local)) => Some(local.unite(base)),
        (Some(base), None) => Some(base.clone()),
        (None, local) => local,
    }
}

/// Base attributes followed by the derived type's own
fn extend_attributes(base: &AttributeSet, local: &AttributeSet) -> Result<AttributeSet> {
    let mut merged = base.clone();
    for attribute in local.iter() {
        merged.insert(Arc::clone(attribute))?;
    }
    Ok(merged)
}

fn settled(base: &QName, link: &Link<ComplexType>) -> Result<Arc<ComplexType>> {
    link.get()
        .ok_or_else(|| Error::circular(format!("base type '{}' is not available", base)))
}

impl Compiler<'_> {
    pub(super) fn compile_complex_type(&mut self, node: NodeRef) -> Result<Arc<ComplexType>> {
        let doc = self.document(node.doc);
        let name = if is_top_level(doc.document.arena.parent_construct(node.id)) {
            Some(self.declared_name(node)?)
        } else {
            None
        };
        let placeholder_name = name.clone();
        let build_name = name.clone();
        let result = self.compile_cyclic(
            node,
            move || ComplexType::new(placeholder_name),
            Pending::ComplexType,
            move |compiler| compiler.build_complex_type(node, build_name),
        );
        let result = match (result, self.deferral) {
            (Err(_), Some(deferral)) if deferral.base == node => {
                self.deferral = None;
                self.compile_derived_first(deferral)
            }
            (result, _) => result,
        };
        match &name {
            Some(name) => result.map_err(|e| e.in_component(name)),
            None => result,
        }
    }

    fn compile_derived_first(&mut self, deferral: Deferral) -> Result<Arc<ComplexType>> {
        tracing::debug!("compiling a derived type ahead of its base");
        self.compress(deferral.derived)?;
        match self.compress(deferral.base)? {
            Compiled::Type(TypeDef::Complex(link)) => link
                .get()
                .ok_or_else(|| Error::circular("base type is not available after its derived type")),
            other => Err(Error::malformed(format!("expected a complex type, found {}", other.kind()))),
        }
    }

    /// Complex type whose compilation owns a pending placeholder
    fn pending_type(&self, weak: &Weak<ComplexType>) -> Option<NodeRef> {
        self.memo.iter().find_map(|(node, memo)| match memo {
            Memo::Pending(Pending::ComplexType(pending)) if pending.ptr_eq(weak) => Some(*node),
            _ => None,
        })
    }

    /// Error for a base that resolved to a type still being compiled
    ///
    /// A named type whose base is only building its content leaves a deferral
    /// for that base to pick up.
    fn pending_base(
        &mut self,
        node: NodeRef,
        named: bool,
        base_name: &QName,
        weak: &Weak<ComplexType>,
    ) -> Error {
        match self.pending_type(weak) {
            Some(base) if named && !self.base_chain.contains(&base) => {
                tracing::debug!(base = %base_name, "base type is building its content, deferring");
                self.deferral = Some(Deferral { derived: node, base });
            }
            _ => {}
        }
        Error::circular(format!("type derives from '{}', which depends on it", base_name))
    }

    /// Run `f` outside of any base chain, for content that is not a derivation step
    fn in_content<T>(&mut self, f: impl FnOnce(&mut Self) -> Result<T>) -> Result<T> {
        let outer = std::mem::take(&mut self.base_chain);
        let result = f(self);
        self.base_chain = outer;
        result
    }

    fn build_complex_type(&mut self, node: NodeRef, name: Option<QName>) -> Result<ComplexType> {
        let doc = self.document(node.doc);
        let handler = doc.handler(node.id);

        let mut complex = ComplexType::new(name);
        complex.is_abstract = handler.attributes.flag("abstract")?;
        complex.mixed = handler.attributes.flag("mixed")?;
        complex.block = match handler.attributes.derivation_set("block")? {
            Some(block) => block,
            None => self.derivation_default(node, "blockDefault")?,
        };
        complex.final_set = match handler.attributes.derivation_set("final")? {
            Some(final_set) => final_set,
            None => self.derivation_default(node, "finalDefault")?,
        };

        let content = self.first_child(node, |c| {
            matches!(c, Construct::SimpleContent | Construct::ComplexContent)
        });
        let content = match content {
            Some(content) => content,
            None => {
                return self.in_content(|compiler| {
                    if let Some(grouping) =
                        compiler.first_child(node, |c| c.is_compositor() || c == Construct::Group)
                    {
                        complex.content = ContentModel::Elements(compiler.compile_grouping(grouping)?);
                    }
                    let (attributes, wildcard) = compiler.collect_attributes(node)?;
                    complex.attributes = attributes;
                    complex.attribute_wildcard = wildcard;
                    Ok(complex)
                });
            }
        };

        let content_handler = doc.handler(content.id);
        let derivation = self
            .first_child(content, |c| matches!(c, Construct::Extension | Construct::Restriction))
            .ok_or_else(|| {
                Error::malformed(format!(
                    "{} needs an xs:restriction or xs:extension",
                    content_handler.construct
                ))
            })?;
        let base_name = doc.handler(derivation.id).reference("base").ok_or_else(|| {
            Error::malformed(format!(
                "{} of a complex type needs a 'base' attribute",
                doc.handler(derivation.id).construct
            ))
        })?;
        self.base_chain.push(node);
        let base = match self.lookup_type(doc.unit, &base_name) {
            Ok(TypeDef::Complex(Link::Forward(weak))) => {
                let named = complex.name.is_some();
                Err(self.pending_base(node, named, &base_name, &weak))
            }
            other => other,
        };
        self.base_chain.pop();
        let base = base?;

        let method = match doc.handler(derivation.id).construct {
            Construct::Extension => DerivationMethod::Extension,
            _ => DerivationMethod::Restriction,
        };
        if content_handler.construct == Construct::ComplexContent
            && content_handler.attribute("mixed").is_some()
        {
            complex.mixed = content_handler.attributes.flag("mixed")?;
        }
        self.in_content(|compiler| match (content_handler.construct, method) {
            (Construct::ComplexContent, DerivationMethod::Extension) => {
                compiler.extend_complex_content(&mut complex, derivation, &base_name, &base)
            }
            (Construct::ComplexContent, DerivationMethod::Restriction) => {
                compiler.restrict_complex_content(&mut complex, derivation, &base_name, &base)
            }
            (_, DerivationMethod::Extension) => {
                compiler.extend_simple_content(&mut complex, derivation, &base_name, &base)
            }
            (_, DerivationMethod::Restriction) => {
                compiler.restrict_simple_content(&mut complex, derivation, &base_name, &base)
            }
        })?;

        complex.base = Some(base);
        complex.derivation = Some(method);
        Ok(complex)
    }

    fn extend_complex_content(
        &mut self,
        complex: &mut ComplexType,
        derivation: NodeRef,
        base_name: &QName,
        base: &TypeDef,
    ) -> Result<()> {
        let base_type = match base {
            TypeDef::Complex(link) => settled(base_name, link)?,
            TypeDef::Simple(_) => {
                return Err(Error::malformed(format!(
                    "complexContent cannot extend the simple type '{}'",
                    base_name
                )))
            }
        };

        let local = match self.first_child(derivation, |c| c.is_compositor() || c == Construct::Group) {
            Some(grouping) => Some(self.compile_grouping(grouping)?),
            None => None,
        };
        complex.content = match (&base_type.content, local) {
            (ContentModel::Elements(base), Some(local)) => ContentModel::Elements(flatten(base, &local)),
            (ContentModel::Elements(base), None) => ContentModel::Elements(base.clone()),
            (ContentModel::Empty, Some(local)) => ContentModel::Elements(local),
            (ContentModel::Empty, None) => ContentModel::Empty,
            (ContentModel::Simple(simple), None) => ContentModel::Simple(Arc::clone(simple)),
            (ContentModel::Simple(_), Some(_)) => {
                return Err(Error::malformed(format!(
                    "cannot add element content to '{}', which has simple content",
                    base_name
                )))
            }
        };
        complex.mixed = complex.mixed || base_type.mixed;

        let (attributes, wildcard) = self.collect_attributes(derivation)?;
        complex.attributes = extend_attributes(&base_type.attributes, &attributes)?;
        complex.attribute_wildcard = unite(base_type.attribute_wildcard.as_ref(), wildcard);
        Ok(())
    }

    fn restrict_complex_content(
        &mut self,
        complex: &mut ComplexType,
        derivation: NodeRef,
        base_name: &QName,
        base: &TypeDef,
    ) -> Result<()> {
        match base {
            TypeDef::Complex(link) => {
                settled(base_name, link)?;
            }
            TypeDef::Simple(_) => {
                return Err(Error::malformed(format!(
                    "complexContent cannot restrict the simple type '{}'",
                    base_name
                )))
            }
        }

        if let Some(grouping) = self.first_child(derivation, |c| c.is_compositor() || c == Construct::Group) {
            complex.content = ContentModel::Elements(self.compile_grouping(grouping)?);
        }
        let (attributes, wildcard) = self.collect_attributes(derivation)?;
        complex.attributes = attributes;
        complex.attribute_wildcard = wildcard;
        Ok(())
    }

    fn extend_simple_content(
        &mut self,
        complex: &mut ComplexType,
        derivation: NodeRef,
        base_name: &QName,
        base: &TypeDef,
    ) -> Result<()> {
        let (attributes, wildcard) = self.collect_attributes(derivation)?;
        match base {
            TypeDef::Simple(simple) => {
                complex.content = ContentModel::Simple(Arc::clone(simple));
                complex.attributes = attributes;
                complex.attribute_wildcard = wildcard;
            }
            TypeDef::Complex(link) => {
                let base_type = settled(base_name, link)?;
                let simple = base_type.simple_content().cloned().ok_or_else(|| {
                    Error::malformed(format!(
                        "simpleContent base '{}' does not have simple content",
                        base_name
                    ))
                })?;
                complex.content = ContentModel::Simple(simple);
                complex.attributes = extend_attributes(&base_type.attributes, &attributes)?;
                complex.attribute_wildcard = unite(base_type.attribute_wildcard.as_ref(), wildcard);
            }
        }
        Ok(())
    }

    fn restrict_simple_content(
        &mut self,
        complex: &mut ComplexType,
        derivation: NodeRef,
        base_name: &QName,
        base: &TypeDef,
    ) -> Result<()> {
        let base_simple = match base {
            TypeDef::Simple(simple) => Arc::clone(simple),
            TypeDef::Complex(link) => {
                let base_type = settled(base_name, link)?;
                base_type.simple_content().cloned().ok_or_else(|| {
                    Error::malformed(format!(
                        "simpleContent base '{}' does not have simple content",
                        base_name
                    ))
                })?
            }
        };

        let inline = match self.first_child(derivation, |c| c == Construct::SimpleType) {
            Some(inline) => Some(self.compile_inline_simple(inline)?),
            None => None,
        };
        let facets = self.collect_facets(derivation)?;
        let simple = if inline.is_some() || !facets.is_empty() {
            Arc::new(SimpleType::restriction(
                None,
                inline.unwrap_or(base_simple),
                facets,
            ))
        } else {
            base_simple
        };
        complex.content = ContentModel::Simple(simple);

        let (attributes, wildcard) = self.collect_attributes(derivation)?;
        complex.attributes = attributes;
        complex.attribute_wildcard = wildcard;
        Ok(())
    }

    pub(super) fn compile_simple_type(&mut self, node: NodeRef) -> Result<Arc<SimpleType>> {
        let doc = self.document(node.doc);
        let name = if is_top_level(doc.document.arena.parent_construct(node.id)) {
            Some(self.declared_name(node)?)
        } else {
            None
        };
        let result = self.build_simple_type(node, name.clone()).map(Arc::new);
        match &name {
            Some(name) => result.map_err(|e| e.in_component(name)),
            None => result,
        }
    }

    fn build_simple_type(&mut self, node: NodeRef, name: Option<QName>) -> Result<SimpleType> {
        let doc = self.document(node.doc);
        let derivation = self
            .first_child(node, |c| {
                matches!(c, Construct::Restriction | Construct::List | Construct::Union)
            })
            .ok_or_else(|| Error::malformed("xs:simpleType needs xs:restriction, xs:list or xs:union"))?;
        let handler = doc.handler(derivation.id);
        let inline = self.first_child(derivation, |c| c == Construct::SimpleType);

        match handler.construct {
            Construct::Restriction => {
                let base = match (handler.reference("base"), inline) {
                    (Some(_), Some(_)) => {
                        return Err(Error::malformed(
                            "xs:restriction has both a 'base' attribute and an inline simpleType",
                        ))
                    }
                    (Some(base), None) => self.lookup_simple_type(doc.unit, &base)?,
                    (None, Some(inline)) => self.compile_inline_simple(inline)?,
                    (None, None) => {
                        return Err(Error::malformed(
                            "xs:restriction needs a 'base' attribute or an inline simpleType",
                        ))
                    }
                };
                let facets = self.collect_facets(derivation)?;
                Ok(SimpleType::restriction(name, base, facets))
            }
            Construct::List => {
                let item = match (handler.reference("itemType"), inline) {
                    (Some(_), Some(_)) => {
                        return Err(Error::malformed(
                            "xs:list has both an 'itemType' attribute and an inline simpleType",
                        ))
                    }
                    (Some(item), None) => self.lookup_simple_type(doc.unit, &item)?,
                    (None, Some(inline)) => self.compile_inline_simple(inline)?,
                    (None, None) => {
                        return Err(Error::malformed(
                            "xs:list needs an 'itemType' attribute or an inline simpleType",
                        ))
                    }
                };
                if item.variety() == SimpleTypeVariety::List {
                    return Err(Error::malformed(format!("list item type {} is itself a list", item)));
                }
                Ok(SimpleType::list(name, item))
            }
            _ => {
                let mut members = Vec::new();
                if let Some(member_types) = handler.attribute("memberTypes") {
                    for token in member_types.split_whitespace() {
                        let member = handler.scope.resolve_reference(token);
                        members.push(self.lookup_simple_type(doc.unit, &member)?);
                    }
                }
                for (child, construct) in self.child_nodes(derivation) {
                    if construct == Construct::SimpleType {
                        members.push(self.compile_inline_simple(child)?);
                    }
                }
                if members.is_empty() {
                    return Err(Error::malformed(
                        "xs:union needs 'memberTypes' or inline simpleType members",
                    ));
                }
                Ok(SimpleType::union(name, members))
            }
        }
    }

    fn compile_inline_simple(&mut self, node: NodeRef) -> Result<Arc<SimpleType>> {
        match self.compile_type(node)? {
            TypeDef::Simple(simple) => Ok(simple),
            TypeDef::Complex(_) => Err(Error::malformed("expected an inline simple type")),
        }
    }

    /// Facets declared directly under a restriction
    fn collect_facets(&mut self, derivation: NodeRef) -> Result<Facets> {
        let doc = self.document(derivation.doc);
        let mut facets = Vec::new();
        for (child, construct) in self.child_nodes(derivation) {
            if let Construct::Facet(kind) = construct {
                let value = doc.handler(child.id).attribute("value").ok_or_else(|| {
                    Error::malformed(format!("{} is missing the 'value' attribute", construct))
                })?;
                facets.push(Facet::new(kind, value)?);
            }
        }
        Facets::new(facets)
    }
}

#[cfg(test)]
mod tests {
    use super::super::{CompileOptions, Compiled, SchemaCache};
    use super::*;
    use crate::components::{any_type, Element, ElementParticle, GroupDef, GroupParticle};
    use crate::error::Category;
    use crate::loaders::Loader;
    use crate::locations::Location;
    use pretty_assertions::assert_eq;

    fn leaf(name: &str) -> ElementGrouping {
        let element = Arc::new(Element::new(QName::local(name), TypeDef::from(any_type())));
        ElementGrouping::Element(Arc::new(ElementParticle {
            name: QName::local(name),
            occurs: Occurs::once(),
            element: Link::Resolved(element),
        }))
    }

    fn sequence(occurs: Occurs, children: Vec<ElementGrouping>) -> ElementGrouping {
        ElementGrouping::Sequence(Arc::new(ModelGroup::new(occurs, children)))
    }

    #[test]
    fn test_flatten_sequences() {
        let base = sequence(Occurs::once(), vec![leaf("a"), leaf("b")]);
        let addition = sequence(Occurs::once(), vec![leaf("c")]);
        assert_eq!(flatten(&base, &addition).to_string(), "sequence(a, b, c)");

        let repeated = sequence(Occurs::zero_or_more(), vec![leaf("c")]);
        assert_eq!(
            flatten(&base, &repeated).to_string(),
            "sequence(a, b, sequence(c)[0..unbounded])"
        );
    }

    #[test]
    fn test_flatten_empty_sides() {
        let empty = sequence(Occurs::once(), vec![]);
        let c = sequence(Occurs::once(), vec![leaf("c")]);
        assert_eq!(flatten(&empty, &c).to_string(), "sequence(c)");
        assert_eq!(flatten(&c, &empty).to_string(), "sequence(c)");
    }

    #[test]
    fn test_flatten_wraps_other_groupings() {
        let choice = ElementGrouping::Choice(Arc::new(ModelGroup::new(
            Occurs::once(),
            vec![leaf("a"), leaf("b")],
        )));
        let c = sequence(Occurs::once(), vec![leaf("c")]);
        assert_eq!(
            flatten(&choice, &c).to_string(),
            "sequence(choice(a, b), sequence(c))"
        );
    }

    #[test]
    fn test_flatten_looks_through_group_reference() {
        let definition = Arc::new(GroupDef {
            name: QName::local("g"),
            child: Some(sequence(Occurs::once(), vec![leaf("a"), leaf("b")])),
        });
        let group = ElementGrouping::Group(Arc::new(GroupParticle {
            name: QName::local("g"),
            occurs: Occurs::once(),
            definition: Link::Resolved(definition),
        }));
        let c = sequence(Occurs::once(), vec![leaf("c")]);
        assert_eq!(flatten(&group, &c).to_string(), "sequence(a, b, c)");
    }

    fn compile_type(body: &str, name: &str) -> Result<TypeDef> {
        let xml = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t" xmlns="urn:t">{}</xs:schema>"#,
            body
        );
        let loader = Loader::new().with_source("main.xsd", xml);
        let options = CompileOptions::default();
        let cache = SchemaCache::default();
        let mut compiler = Compiler::new(&loader, &options, &cache);
        compiler.load(&Location::Memory("main.xsd".into()))?;
        let node = compiler.declaration(Category::Type, name).unwrap();
        match compiler.compress(node)? {
            Compiled::Type(type_def) => Ok(type_def),
            other => panic!("expected a type, got {}", other.kind()),
        }
    }

    #[test]
    fn test_extension_appends_content_and_attributes() {
        let t = compile_type(
            r#"<xs:complexType name="base">
                 <xs:sequence><xs:element name="a"/><xs:element name="b"/></xs:sequence>
                 <xs:attribute name="id" type="xs:ID"/>
               </xs:complexType>
               <xs:complexType name="derived">
                 <xs:complexContent>
                   <xs:extension base="base">
                     <xs:sequence><xs:element name="c"/></xs:sequence>
                     <xs:attribute name="kind" type="xs:token"/>
                   </xs:extension>
                 </xs:complexContent>
               </xs:complexType>"#,
            "derived",
        )
        .unwrap();
        let derived = t.as_complex().unwrap();
        assert!(derived.is_extension());
        assert_eq!(derived.grouping().unwrap().to_string(), "sequence(a, b, c)");
        let names: Vec<String> = derived.attributes.iter().map(|a| a.name.to_string()).collect();
        assert_eq!(names, vec!["id", "kind"]);
        assert_eq!(derived.base_complex().unwrap().name, Some(QName::namespaced("urn:t", "base")));
    }

    #[test]
    fn test_extension_with_conflicting_attribute() {
        let result = compile_type(
            r#"<xs:complexType name="base"><xs:attribute name="id" type="xs:ID"/></xs:complexType>
               <xs:complexType name="derived">
                 <xs:complexContent>
                   <xs:extension base="base"><xs:attribute name="id" type="xs:string"/></xs:extension>
                 </xs:complexContent>
               </xs:complexType>"#,
            "derived",
        );
        assert!(matches!(result, Err(Error::MalformedAttribute(_))));
    }

    #[test]
    fn test_restriction_replaces_content() {
        let t = compile_type(
            r#"<xs:complexType name="base">
                 <xs:sequence><xs:element name="a"/><xs:element name="b" minOccurs="0"/></xs:sequence>
                 <xs:attribute name="id" type="xs:ID"/>
               </xs:complexType>
               <xs:complexType name="narrow">
                 <xs:complexContent>
                   <xs:restriction base="base"><xs:sequence><xs:element name="a"/></xs:sequence></xs:restriction>
                 </xs:complexContent>
               </xs:complexType>"#,
            "narrow",
        )
        .unwrap();
        let narrow = t.as_complex().unwrap();
        assert!(narrow.is_restriction());
        assert_eq!(narrow.grouping().unwrap().to_string(), "sequence(a)");
        assert!(narrow.attributes.is_empty());
    }

    #[test]
    fn test_simple_content_extension_and_restriction() {
        let body = r#"<xs:complexType name="price">
                 <xs:simpleContent>
                   <xs:extension base="xs:decimal"><xs:attribute name="currency" type="xs:string"/></xs:extension>
                 </xs:simpleContent>
               </xs:complexType>
               <xs:complexType name="smallPrice">
                 <xs:simpleContent>
                   <xs:restriction base="price"><xs:maxInclusive value="100"/></xs:restriction>
                 </xs:simpleContent>
               </xs:complexType>"#;

        let price = compile_type(body, "price").unwrap();
        let price = price.as_complex().unwrap();
        assert!(price.validate_text("12.50").is_ok());
        assert_eq!(price.attributes.len(), 1);

        let small = compile_type(body, "smallPrice").unwrap();
        let small = small.as_complex().unwrap();
        assert!(small.validate_text("99").is_ok());
        assert!(small.validate_text("101").is_err());
    }

    #[test]
    fn test_self_derivation_is_circular() {
        let result = compile_type(
            r#"<xs:complexType name="loop">
                 <xs:complexContent><xs:extension base="loop"/></xs:complexContent>
               </xs:complexType>"#,
            "loop",
        );
        assert!(matches!(result, Err(Error::CircularDefinition(_))));

        let result = compile_type(
            r#"<xs:simpleType name="s"><xs:restriction base="s"/></xs:simpleType>"#,
            "s",
        );
        assert!(matches!(result, Err(Error::CircularDefinition(_))));
    }

    #[test]
    fn test_base_compiled_before_type_deriving_from_it() {
        let body = r#"<xs:complexType name="node">
                 <xs:sequence><xs:element name="child" type="special" minOccurs="0"/></xs:sequence>
               </xs:complexType>
               <xs:complexType name="special">
                 <xs:complexContent>
                   <xs:extension base="node"><xs:sequence><xs:element name="extra"/></xs:sequence></xs:extension>
                 </xs:complexContent>
               </xs:complexType>"#;
        let xml = format!(
            r#"<xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:t" xmlns="urn:t">{}</xs:schema>"#,
            body
        );
        let loader = Loader::new().with_source("main.xsd", xml);
        let options = CompileOptions::default();
        let cache = SchemaCache::default();
        let mut compiler = Compiler::new(&loader, &options, &cache);
        compiler.load(&Location::Memory("main.xsd".into())).unwrap();

        let node = compiler.declaration(Category::Type, "node").unwrap();
        let Compiled::Type(node_type) = compiler.compress(node).unwrap() else {
            panic!("expected a type");
        };
        assert!(compiler.deferral.is_none());
        assert!(compiler.base_chain.is_empty());

        let special = compiler.declaration(Category::Type, "special").unwrap();
        let Compiled::Type(special_type) = compiler.compress(special).unwrap() else {
            panic!("expected a type");
        };
        let special_type = special_type.as_complex().unwrap();
        assert!(Arc::ptr_eq(&special_type.base_complex().unwrap(), &node_type.as_complex().unwrap()));
        assert_eq!(special_type.grouping().unwrap().to_string(), "sequence(child, extra)");
    }

    #[test]
    fn test_anonymous_extension_of_enclosing_type_is_circular() {
        let result = compile_type(
            r#"<xs:complexType name="outer">
                 <xs:sequence>
                   <xs:element name="inner" minOccurs="0">
                     <xs:complexType>
                       <xs:complexContent><xs:extension base="outer"/></xs:complexContent>
                     </xs:complexType>
                   </xs:element>
                 </xs:sequence>
               </xs:complexType>"#,
            "outer",
        );
        assert!(matches!(result, Err(Error::CircularDefinition(_))));
    }

    #[test]
    fn test_simple_type_varieties() {
        let body = r#"<xs:simpleType name="colour">
                 <xs:restriction base="xs:string">
                   <xs:enumeration value="A"/><xs:enumeration value="B"/>
                 </xs:restriction>
               </xs:simpleType>
               <xs:simpleType name="colours"><xs:list itemType="colour"/></xs:simpleType>
               <xs:simpleType name="sizeOrAuto">
                 <xs:union memberTypes="xs:int">
                   <xs:simpleType><xs:restriction base="xs:token"><xs:enumeration value="auto"/></xs:restriction></xs:simpleType>
                 </xs:union>
               </xs:simpleType>
               <xs:simpleType name="bad">
                 <xs:restriction base="xs:string"><xs:enumeration value="A"/><xs:pattern value="[A-Z]"/></xs:restriction>
               </xs:simpleType>"#;

        let simple = |name: &str| compile_type(body, name).map(|t| t.as_simple().cloned().unwrap());

        let colour = simple("colour").unwrap();
        assert_eq!(colour.facets.enumeration(), vec!["A", "B"]);
        assert!(colour.validate("C").is_err());

        let colours = simple("colours").unwrap();
        assert_eq!(colours.variety(), SimpleTypeVariety::List);
        assert!(colours.validate("A B A").is_ok());

        let size = simple("sizeOrAuto").unwrap();
        assert!(size.validate("12").is_ok());
        assert!(size.validate("auto").is_ok());
        assert!(size.validate("big").is_err());

        assert!(matches!(simple("bad"), Err(Error::MalformedAttribute(_))));
    }
}
