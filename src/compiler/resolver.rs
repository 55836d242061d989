//! Reference resolution
//!
//! A `ref`, `type` or `base` name is looked up in the referring unit first,
//! then through its imports depth-first in declaration order. Names in the XSD
//! namespace go to the built-in types before anything else; a name with no
//! namespace falls back to the built-ins after every visible schema missed.

use super::{Compiled, Compiler, ImportTarget, NodeRef};
use crate::components::{
    any_type, builtin_simple_type, Attribute, AttributeGroup, Element, GroupDef, Link, Schema,
    SimpleType, TypeDef,
};
use crate::error::{Category, Error, Result};
use crate::namespaces::QName;
use crate::XSD_NAMESPACE;
use std::collections::HashSet;
use std::sync::Arc;

enum Found {
    /// Declaration handler of a unit compiled in this session
    Node(NodeRef),
    /// Component of a schema compiled earlier, or a built-in
    Component(QName, Compiled),
}

fn builtin(category: Category, local_name: &str) -> Option<Found> {
    if category != Category::Type {
        return None;
    }
    let type_def = if local_name == "anyType" {
        TypeDef::from(any_type())
    } else {
        TypeDef::Simple(builtin_simple_type(local_name)?)
    };
    Some(Found::Component(
        QName::namespaced(XSD_NAMESPACE, local_name),
        Compiled::Type(type_def),
    ))
}

fn matches_namespace(reference: &QName, namespace: &Option<String>) -> bool {
    reference.namespace.is_none() || reference.namespace == *namespace
}

fn find_in_schema(
    schema: &Arc<Schema>,
    category: Category,
    name: &QName,
    seen: &mut HashSet<*const Schema>,
) -> Option<Found> {
    if !seen.insert(Arc::as_ptr(schema)) {
        return None;
    }

    if matches_namespace(name, &schema.target_namespace) {
        let local = name.local_name.as_str();
        let compiled = match category {
            Category::Type => schema.type_def(local).map(Compiled::Type),
            Category::Element => schema
                .element(local)
                .map(|element| Compiled::Element(Link::Resolved(Arc::clone(element)))),
            Category::Group => schema
                .group(local)
                .map(|group| Compiled::GroupDefinition(Link::Resolved(Arc::clone(group)))),
            Category::Attribute => schema.attribute(local).cloned().map(Compiled::Attribute),
            Category::AttributeGroup => schema
                .attribute_group(local)
                .cloned()
                .map(Compiled::AttributeGroup),
        };
        if let Some(compiled) = compiled {
            return Some(Found::Component(schema.qname(local), compiled));
        }
    }

    schema
        .imports
        .iter()
        .filter_map(|import| import.get())
        .find_map(|imported| find_in_schema(&imported, category, name, seen))
}

impl Compiler<'_> {
    /// Resolve a reference made from a unit and compile its target
    ///
    /// Returns the declared name of the target with the compiled component.
    pub(super) fn lookup(
        &mut self,
        unit: usize,
        category: Category,
        name: &QName,
    ) -> Result<(QName, Compiled)> {
        match self.find(unit, category, name) {
            Some(Found::Node(node)) => {
                let declared = self.declared_name(node)?;
                let compiled = self.compress(node)?;
                Ok((declared, compiled))
            }
            Some(Found::Component(declared, compiled)) => Ok((declared, compiled)),
            None => {
                tracing::debug!(category = %category, name = %name, "reference not found");
                Err(Error::unresolved(category, name.clone()))
            }
        }
    }

    fn find(&self, unit: usize, category: Category, name: &QName) -> Option<Found> {
        if name.is_in(Some(XSD_NAMESPACE)) {
            if let Some(found) = builtin(category, &name.local_name) {
                return Some(found);
            }
        }

        let mut visited = HashSet::new();
        let mut seen = HashSet::new();
        if let Some(found) = self.find_in_unit(unit, category, name, &mut visited, &mut seen) {
            return Some(found);
        }

        if name.namespace.is_none() {
            builtin(category, &name.local_name)
        } else {
            None
        }
    }

    fn find_in_unit(
        &self,
        unit: usize,
        category: Category,
        name: &QName,
        visited: &mut HashSet<usize>,
        seen: &mut HashSet<*const Schema>,
    ) -> Option<Found> {
        if !visited.insert(unit) {
            return None;
        }

        let schema_unit = &self.units[unit];
        if matches_namespace(name, &schema_unit.target_namespace) {
            if let Some(node) = schema_unit.symbols.get(&(category, name.local_name.clone())) {
                return Some(Found::Node(*node));
            }
        }

        for import in &schema_unit.imports {
            let found = match &import.target {
                ImportTarget::Unit(target) => self.find_in_unit(*target, category, name, visited, seen),
                ImportTarget::Cached(schema) => find_in_schema(schema, category, name, seen),
                ImportTarget::ByNamespace | ImportTarget::Unresolved => None,
            };
            if found.is_some() {
                return found;
            }
        }
        None
    }

    pub(super) fn lookup_type(&mut self, unit: usize, name: &QName) -> Result<TypeDef> {
        match self.lookup(unit, Category::Type, name)? {
            (_, Compiled::Type(type_def)) => Ok(type_def),
            _ => Err(Error::unresolved(Category::Type, name.clone())),
        }
    }

    pub(super) fn lookup_simple_type(&mut self, unit: usize, name: &QName) -> Result<Arc<SimpleType>> {
        match self.lookup_type(unit, name)? {
            TypeDef::Simple(simple) => Ok(simple),
            TypeDef::Complex(_) => Err(Error::malformed(format!(
                "'{}' is a complex type where a simple type is required",
                name
            ))),
        }
    }

    pub(super) fn lookup_element(&mut self, unit: usize, name: &QName) -> Result<(QName, Link<Element>)> {
        match self.lookup(unit, Category::Element, name)? {
            (declared, Compiled::Element(link)) => Ok((declared, link)),
            _ => Err(Error::unresolved(Category::Element, name.clone())),
        }
    }

    pub(super) fn lookup_group(&mut self, unit: usize, name: &QName) -> Result<(QName, Link<GroupDef>)> {
        match self.lookup(unit, Category::Group, name)? {
            (declared, Compiled::GroupDefinition(link)) => Ok((declared, link)),
            _ => Err(Error::unresolved(Category::Group, name.clone())),
        }
    }

    pub(super) fn lookup_attribute(&mut self, unit: usize, name: &QName) -> Result<Arc<Attribute>> {
        match self.lookup(unit, Category::Attribute, name)? {
            (_, Compiled::Attribute(attribute)) => Ok(attribute),
            _ => Err(Error::unresolved(Category::Attribute, name.clone())),
        }
    }

    pub(super) fn lookup_attribute_group(
        &mut self,
        unit: usize,
        name: &QName,
    ) -> Result<Arc<AttributeGroup>> {
        match self.lookup(unit, Category::AttributeGroup, name)? {
            (_, Compiled::AttributeGroup(group)) => Ok(group),
            _ => Err(Error::unresolved(Category::AttributeGroup, name.clone())),
        }
    }
}
