//! Schema compilation
//!
//! A [`Compiler`] runs one compile session. It loads the root document and
//! everything reachable from it through `include` and `import`, indexes the
//! top-level declarations of every schema unit, and then compresses each
//! declaration handler into an immutable component.
//!
//! Compression is memoized per handler, so a declaration referenced from many
//! places compiles once and every reference shares the same `Arc`. A handler
//! that is reached again while it is still being compiled yields a
//! [`Link::Forward`] for elements, complex types and named groups; for any
//! other construct it is a [`Error::CircularDefinition`].
//!
//! A failed compression rolls the memo back to where it stood when that
//! compression began, so no entry built on top of the failure survives.

mod declarations;
mod derivation;
mod registry;
mod resolver;

pub use derivation::flatten;
pub use registry::{SchemaCache, SchemaKey, SchemaRegistry};

use crate::components::{
    AnyAttribute, AttributeGroup, Attribute, ComplexType, DerivationSet, Element, ElementGrouping,
    FormDefault, GroupDef, IdentityConstraint, ImportedSchema, Link, Schema, TypeDef,
};
use crate::error::{Category, Error, Result};
use crate::handlers::{Construct, Handler, HandlerId, SchemaDocument};
use crate::limits::Limits;
use crate::loaders::Loader;
use crate::locations::Location;
use crate::names::validate_ncname;
use crate::namespaces::QName;
use crate::XSD_NAMESPACE;
use indexmap::{IndexMap, IndexSet};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};

/// Options of a compile session
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CompileOptions {
    /// Resource limits
    pub limits: Limits,
    /// Continue when an imported document cannot be loaded
    pub tolerate_unresolved_imports: bool,
}

impl CompileOptions {
    /// Create options with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Keep compiling when an import's document cannot be loaded
    pub fn tolerate_unresolved_imports(mut self, tolerate: bool) -> Self {
        self.tolerate_unresolved_imports = tolerate;
        self
    }
}

/// Handle to one handler of one loaded document
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeRef {
    doc: usize,
    id: HandlerId,
}

impl NodeRef {
    /// Handler within its document
    pub fn handler_id(&self) -> HandlerId {
        self.id
    }
}

/// Result of compressing one handler
#[derive(Debug, Clone)]
pub enum Compiled {
    /// Top-level element declaration
    Element(Link<Element>),
    /// Particle of a content model
    Grouping(ElementGrouping),
    /// Named model group definition
    GroupDefinition(Link<GroupDef>),
    /// Simple or complex type
    Type(TypeDef),
    /// Attribute declaration or reference
    Attribute(Arc<Attribute>),
    /// Attribute group definition or reference
    AttributeGroup(Arc<AttributeGroup>),
    /// Attribute wildcard
    AttributeWildcard(AnyAttribute),
    /// Identity constraint of an element
    IdentityConstraint(IdentityConstraint),
}

impl Compiled {
    /// Name of the component kind
    pub fn kind(&self) -> &'static str {
        match self {
            Compiled::Element(_) => "element",
            Compiled::Grouping(_) => "particle",
            Compiled::GroupDefinition(_) => "group",
            Compiled::Type(_) => "type",
            Compiled::Attribute(_) => "attribute",
            Compiled::AttributeGroup(_) => "attributeGroup",
            Compiled::AttributeWildcard(_) => "anyAttribute",
            Compiled::IdentityConstraint(_) => "identity constraint",
        }
    }

    /// Check whether two results are the same component
    pub fn same_as(&self, other: &Compiled) -> bool {
        match (self, other) {
            (Compiled::Element(a), Compiled::Element(b)) => a.same_target(b),
            (Compiled::Grouping(a), Compiled::Grouping(b)) => a.same_node(b),
            (Compiled::GroupDefinition(a), Compiled::GroupDefinition(b)) => a.same_target(b),
            (Compiled::Type(a), Compiled::Type(b)) => a.same_type(b),
            (Compiled::Attribute(a), Compiled::Attribute(b)) => Arc::ptr_eq(a, b),
            (Compiled::AttributeGroup(a), Compiled::AttributeGroup(b)) => Arc::ptr_eq(a, b),
            (Compiled::AttributeWildcard(a), Compiled::AttributeWildcard(b)) => a == b,
            (Compiled::IdentityConstraint(a), Compiled::IdentityConstraint(b)) => a == b,
            _ => false,
        }
    }
}

/// Placeholder handed out while a cyclic-capable component is compiled
#[derive(Debug)]
enum Pending {
    Element(Weak<Element>),
    ComplexType(Weak<ComplexType>),
    Group(Weak<GroupDef>),
    Other,
}

#[derive(Debug)]
enum Memo {
    Pending(Pending),
    Done(Compiled),
}

/// A named type that needed the complete form of a base still being built
///
/// The base's compression restarts by compiling `derived` first, which
/// compiles the base from inside its own base lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Deferral {
    derived: NodeRef,
    base: NodeRef,
}

/// A schema document with the unit it belongs to
#[derive(Debug)]
pub(crate) struct LoadedDocument {
    location: Location,
    document: SchemaDocument,
    unit: usize,
    /// Effective target namespace; a chameleon include takes its includer's
    namespace: Option<String>,
}

impl LoadedDocument {
    fn handler(&self, id: HandlerId) -> &Handler {
        &self.document.arena[id]
    }
}

#[derive(Debug)]
enum ImportTarget {
    Unit(usize),
    Cached(Arc<Schema>),
    /// No location given; matched against loaded schemas once loading ends
    ByNamespace,
    Unresolved,
}

#[derive(Debug)]
struct UnitImport {
    namespace: Option<String>,
    location: Option<String>,
    target: ImportTarget,
}

/// Documents sharing one target namespace: a root document plus its includes
#[derive(Debug)]
struct SchemaUnit {
    target_namespace: Option<String>,
    location: String,
    root_doc: usize,
    symbols: IndexMap<(Category, String), NodeRef>,
    imports: Vec<UnitImport>,
    locations: IndexSet<String>,
    redefines: Vec<NodeRef>,
}

impl SchemaUnit {
    fn new(target_namespace: Option<String>, location: String) -> Self {
        Self {
            target_namespace,
            location,
            root_doc: 0,
            symbols: IndexMap::new(),
            imports: Vec::new(),
            locations: IndexSet::new(),
            redefines: Vec::new(),
        }
    }
}

fn is_top_level(parent: Option<Construct>) -> bool {
    matches!(parent, Some(Construct::Schema) | Some(Construct::Redefine))
}

fn category_of(construct: Construct) -> Option<Category> {
    match construct {
        Construct::Element => Some(Category::Element),
        Construct::SimpleType | Construct::ComplexType => Some(Category::Type),
        Construct::Group => Some(Category::Group),
        Construct::Attribute => Some(Category::Attribute),
        Construct::AttributeGroup => Some(Category::AttributeGroup),
        _ => None,
    }
}

/// One compile session over a set of schema documents
pub struct Compiler<'a> {
    loader: &'a Loader,
    options: &'a CompileOptions,
    cache: &'a SchemaCache,
    documents: Vec<Arc<LoadedDocument>>,
    units: Vec<SchemaUnit>,
    unit_index: HashMap<String, usize>,
    memo: IndexMap<NodeRef, Memo>,
    /// Complex types whose `base` lookup is in progress, innermost last
    base_chain: Vec<NodeRef>,
    deferral: Option<Deferral>,
}

impl<'a> Compiler<'a> {
    /// Create a session; schemas in `cache` satisfy imports without reloading
    pub fn new(loader: &'a Loader, options: &'a CompileOptions, cache: &'a SchemaCache) -> Self {
        Self {
            loader,
            options,
            cache,
            documents: Vec::new(),
            units: Vec::new(),
            unit_index: HashMap::new(),
            memo: IndexMap::new(),
            base_chain: Vec::new(),
            deferral: None,
        }
    }

    /// Load a schema document and everything it includes or imports
    ///
    /// Returns the index of the document's schema unit. The first document
    /// loaded is the root of the session.
    pub fn load(&mut self, location: &Location) -> Result<usize> {
        self.load_unit(location, None, 0)
    }

    /// Load a schema document from text
    pub fn load_str(&mut self, location: &Location, xml: &str) -> Result<usize> {
        self.load_unit(location, Some(xml.to_string()), 0)
    }

    /// Number of schema units loaded so far
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    /// Top-level declaration handler of the root unit
    pub fn declaration(&self, category: Category, local_name: &str) -> Option<NodeRef> {
        self.units
            .first()
            .and_then(|unit| unit.symbols.get(&(category, local_name.to_string())))
            .copied()
    }

    /// Compress a handler into its component, reusing earlier results
    pub fn compress(&mut self, node: NodeRef) -> Result<Compiled> {
        match self.memo.get(&node) {
            Some(Memo::Done(compiled)) => return Ok(compiled.clone()),
            Some(Memo::Pending(pending)) => {
                return match pending {
                    Pending::Element(weak) => Ok(Compiled::Element(Link::Forward(weak.clone()))),
                    Pending::ComplexType(weak) => {
                        Ok(Compiled::Type(TypeDef::Complex(Link::Forward(weak.clone()))))
                    }
                    Pending::Group(weak) => Ok(Compiled::GroupDefinition(Link::Forward(weak.clone()))),
                    Pending::Other => {
                        let doc = self.document(node.doc);
                        let handler = doc.handler(node.id);
                        Err(Error::circular(format!(
                            "{} '{}' refers to itself",
                            handler.construct,
                            handler.name().unwrap_or("anonymous")
                        )))
                    }
                };
            }
            None => {}
        }

        let doc = self.document(node.doc);
        let construct = doc.handler(node.id).construct;
        let top_level = is_top_level(doc.document.arena.parent_construct(node.id));

        let mark = self.memo.len();
        let cyclic = matches!(construct, Construct::ComplexType)
            || (top_level && matches!(construct, Construct::Element | Construct::Group));
        if !cyclic {
            self.memo.insert(node, Memo::Pending(Pending::Other));
        }

        let result = match construct {
            Construct::Element if top_level => {
                self.compile_global_element(node).map(|e| Compiled::Element(Link::Resolved(e)))
            }
            Construct::Element => self.compile_element_particle(node).map(Compiled::Grouping),
            Construct::ComplexType => self
                .compile_complex_type(node)
                .map(|complex| Compiled::Type(TypeDef::from(complex))),
            Construct::SimpleType => self
                .compile_simple_type(node)
                .map(|simple| Compiled::Type(TypeDef::Simple(simple))),
            Construct::Group if top_level => self
                .compile_group_definition(node)
                .map(|group| Compiled::GroupDefinition(Link::Resolved(group))),
            Construct::Group => self.compile_group_reference(node).map(Compiled::Grouping),
            Construct::Sequence | Construct::Choice | Construct::All => {
                self.compile_model_group(node).map(Compiled::Grouping)
            }
            Construct::Any => self.compile_any(node).map(Compiled::Grouping),
            Construct::Attribute => self.compile_attribute(node).map(Compiled::Attribute),
            Construct::AttributeGroup => {
                self.compile_attribute_group(node).map(Compiled::AttributeGroup)
            }
            Construct::AnyAttribute => self.compile_any_attribute(node).map(Compiled::AttributeWildcard),
            Construct::Key | Construct::Keyref | Construct::Unique => {
                self.compile_identity(node).map(Compiled::IdentityConstraint)
            }
            other => Err(Error::unsupported(format!(
                "{} is compiled as part of its enclosing construct",
                other
            ))),
        };

        match result {
            Ok(compiled) => {
                self.memo.insert(node, Memo::Done(compiled.clone()));
                Ok(compiled)
            }
            Err(e) => {
                self.memo.truncate(mark);
                Err(e.at_location(&doc.location.as_str()))
            }
        }
    }

    /// Build a component that may be reached again while it is built
    ///
    /// The placeholder's weak handle is registered for `node` before `build`
    /// runs, so a reference back to `node` becomes a forward link to the
    /// component being built. On failure every memo entry added since, some of
    /// which may link forward to the discarded placeholder, is dropped.
    fn compile_cyclic<T>(
        &mut self,
        node: NodeRef,
        placeholder: impl FnOnce() -> T,
        pending: fn(Weak<T>) -> Pending,
        build: impl FnOnce(&mut Self) -> Result<T>,
    ) -> Result<Arc<T>> {
        let mark = self.memo.len();
        let mut outcome = Ok(());
        let component = Arc::new_cyclic(|weak| {
            self.memo.insert(node, Memo::Pending(pending(weak.clone())));
            match build(self) {
                Ok(component) => component,
                Err(e) => {
                    outcome = Err(e);
                    placeholder()
                }
            }
        });
        match outcome {
            Ok(()) => Ok(component),
            Err(e) => {
                self.memo.truncate(mark);
                Err(e)
            }
        }
    }

    /// Finish the session, producing one schema per unit, the root first
    pub fn finish(mut self) -> Result<Vec<(SchemaKey, Arc<Schema>)>> {
        for unit in &self.units {
            if let Some(node) = unit.redefines.first() {
                let location = self.documents[node.doc].location.as_str();
                return Err(Error::unsupported("xs:redefine is not supported").at_location(&location));
            }
        }

        self.resolve_namespace_imports();

        let mut prepared = Vec::with_capacity(self.units.len());
        for unit in 0..self.units.len() {
            prepared.push(Some(self.compile_unit(unit)?));
        }

        let keys: Vec<SchemaKey> = self
            .units
            .iter()
            .map(|unit| SchemaKey {
                namespace: unit.target_namespace.clone(),
                location: unit.location.clone(),
            })
            .collect();
        let imports = self
            .units
            .iter_mut()
            .map(|unit| std::mem::take(&mut unit.imports))
            .collect();

        let mut assembler = Assembler {
            prepared,
            imports,
            built: vec![None; keys.len()],
            pending: vec![None; keys.len()],
        };
        let schemas = (0..keys.len()).map(|unit| assembler.build_arc(unit)).collect::<Vec<_>>();
        Ok(keys.into_iter().zip(schemas).collect())
    }

    fn document(&self, doc: usize) -> Arc<LoadedDocument> {
        Arc::clone(&self.documents[doc])
    }

    /// Child handlers of a node with their constructs, in document order
    fn child_nodes(&self, node: NodeRef) -> Vec<(NodeRef, Construct)> {
        self.documents[node.doc]
            .document
            .arena
            .children(node.id)
            .map(|(id, handler)| (NodeRef { doc: node.doc, id }, handler.construct))
            .collect()
    }

    fn first_child(&self, node: NodeRef, predicate: impl Fn(Construct) -> bool) -> Option<NodeRef> {
        self.documents[node.doc]
            .document
            .arena
            .find_child(node.id, predicate)
            .map(|(id, _)| NodeRef { doc: node.doc, id })
    }

    /// Qualified name of a top-level declaration
    fn declared_name(&self, node: NodeRef) -> Result<QName> {
        let doc = &self.documents[node.doc];
        let local = doc.handler(node.id).required_name()?;
        Ok(QName::new(doc.namespace.clone(), local))
    }

    /// A schema-wide default read from the root element of the node's document
    fn schema_attribute(&self, node: NodeRef, name: &str) -> Option<&str> {
        self.documents[node.doc].document.root_handler().attribute(name)
    }

    fn form_default(&self, node: NodeRef, name: &str) -> Result<FormDefault> {
        self.schema_attribute(node, name)
            .map(FormDefault::from_str)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    fn derivation_default(&self, node: NodeRef, name: &str) -> Result<DerivationSet> {
        self.schema_attribute(node, name)
            .map(DerivationSet::parse)
            .transpose()
            .map(Option::unwrap_or_default)
    }

    fn load_unit(&mut self, location: &Location, xml: Option<String>, depth: usize) -> Result<usize> {
        let key = location.as_str();
        if let Some(&unit) = self.unit_index.get(&key) {
            return Ok(unit);
        }
        self.options.limits.check_schema_depth(depth)?;

        let xml = match xml {
            Some(xml) => xml,
            None => self.loader.load(location)?,
        };
        let document = SchemaDocument::parse(&xml, &self.options.limits).map_err(|e| e.at_location(&key))?;
        let namespace = document.target_namespace();
        tracing::debug!(location = %key, namespace = ?namespace, "loaded schema document");

        // Registered before its imports are followed, so an import cycle ends here
        let unit = self.units.len();
        self.units.push(SchemaUnit::new(namespace.clone(), key.clone()));
        self.unit_index.insert(key.clone(), unit);

        let doc = self.add_document(location.clone(), document, unit, namespace);
        self.units[unit].root_doc = doc;
        self.collect(unit, doc, depth).map_err(|e| e.at_location(&key))?;
        Ok(unit)
    }

    fn add_document(
        &mut self,
        location: Location,
        document: SchemaDocument,
        unit: usize,
        namespace: Option<String>,
    ) -> usize {
        self.documents.push(Arc::new(LoadedDocument {
            location,
            document,
            unit,
            namespace,
        }));
        self.documents.len() - 1
    }

    /// Index one document of a unit: includes, then imports, then declarations
    fn collect(&mut self, unit: usize, doc: usize, depth: usize) -> Result<()> {
        let loaded = self.document(doc);
        let arena = &loaded.document.arena;
        let root = loaded.document.root;
        self.units[unit].locations.insert(loaded.location.as_str());

        for (_, handler) in arena.children(root) {
            if handler.construct != Construct::Include {
                continue;
            }
            let href = handler
                .attribute("schemaLocation")
                .ok_or_else(|| Error::malformed("xs:include is missing the 'schemaLocation' attribute"))?;
            let target = loaded.location.resolve(href)?;
            self.include(unit, &target, depth + 1)?;
        }

        for (id, handler) in arena.children(root) {
            match handler.construct {
                Construct::Redefine => self.units[unit].redefines.push(NodeRef { doc, id }),
                Construct::Import => self.import(unit, &loaded.location, handler, depth + 1)?,
                _ => {}
            }
        }

        for (id, handler) in arena.children(root) {
            let category = match category_of(handler.construct) {
                Some(category) => category,
                None => continue,
            };
            let name = handler.required_name()?;
            validate_ncname(name)?;
            let node = NodeRef { doc, id };
            if self.units[unit]
                .symbols
                .insert((category, name.to_string()), node)
                .is_some()
            {
                tracing::debug!(category = %category, name, "later declaration replaces an earlier one");
            }
        }
        Ok(())
    }

    fn include(&mut self, unit: usize, target: &Location, depth: usize) -> Result<()> {
        let key = target.as_str();
        if self.units[unit].locations.contains(&key) {
            tracing::debug!(location = %key, "document already included");
            return Ok(());
        }
        self.options.limits.check_schema_depth(depth)?;

        let xml = self.loader.load(target)?;
        let document = SchemaDocument::parse(&xml, &self.options.limits).map_err(|e| e.at_location(&key))?;
        let unit_namespace = self.units[unit].target_namespace.clone();
        match document.target_namespace() {
            None => {
                if unit_namespace.is_some() {
                    tracing::debug!(location = %key, "chameleon include takes the including namespace");
                }
            }
            Some(namespace) if unit_namespace.as_deref() == Some(namespace.as_str()) => {}
            Some(namespace) => {
                return Err(Error::namespace_conflict(format!(
                    "included document '{}' has target namespace '{}', expected {}",
                    key,
                    namespace,
                    unit_namespace
                        .as_deref()
                        .map(|ns| format!("'{}'", ns))
                        .unwrap_or_else(|| "no namespace".to_string())
                )))
            }
        }

        let doc = self.add_document(target.clone(), document, unit, unit_namespace);
        self.collect(unit, doc, depth)
    }

    fn import(&mut self, unit: usize, base: &Location, handler: &Handler, depth: usize) -> Result<()> {
        let namespace = handler
            .attribute("namespace")
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(String::from);
        let unit_namespace = self.units[unit].target_namespace.clone();
        if namespace == unit_namespace {
            return Err(Error::namespace_conflict(format!(
                "a schema cannot import its own namespace ({})",
                namespace.as_deref().unwrap_or("no namespace")
            )));
        }
        if namespace.as_deref() == Some(XSD_NAMESPACE) {
            tracing::debug!("import of the XSD namespace resolves to the built-in types");
            return Ok(());
        }

        let (location, target) = match handler.attribute("schemaLocation") {
            None => (None, ImportTarget::ByNamespace),
            Some(href) => {
                let target_location = base.resolve(href)?;
                let key = target_location.as_str();
                let target = if let Some(schema) = self.cache.by_location(&key) {
                    tracing::debug!(location = %key, "import satisfied from the schema cache");
                    ImportTarget::Cached(schema)
                } else {
                    match self.load_unit(&target_location, None, depth) {
                        Ok(imported) => ImportTarget::Unit(imported),
                        Err(e @ (Error::Resource(_) | Error::Io(_)))
                            if self.options.tolerate_unresolved_imports =>
                        {
                            tracing::warn!(location = %key, error = %e, "imported document could not be loaded");
                            ImportTarget::Unresolved
                        }
                        Err(e) => return Err(e),
                    }
                };
                (Some(key), target)
            }
        };

        let imported_namespace = match &target {
            ImportTarget::Unit(imported) => Some(self.units[*imported].target_namespace.clone()),
            ImportTarget::Cached(schema) => Some(schema.target_namespace.clone()),
            ImportTarget::ByNamespace | ImportTarget::Unresolved => None,
        };
        if let Some(imported_namespace) = imported_namespace {
            if imported_namespace != namespace {
                return Err(Error::namespace_conflict(format!(
                    "imported document '{}' has target namespace {}, but the import declares {}",
                    location.as_deref().unwrap_or("-"),
                    imported_namespace.as_deref().unwrap_or("none"),
                    namespace.as_deref().unwrap_or("none")
                )));
            }
        }

        self.units[unit].imports.push(UnitImport {
            namespace,
            location,
            target,
        });
        Ok(())
    }

    /// Match location-less imports against the units loaded in this session
    fn resolve_namespace_imports(&mut self) {
        let namespaces: Vec<Option<String>> =
            self.units.iter().map(|unit| unit.target_namespace.clone()).collect();
        for unit in &mut self.units {
            for import in &mut unit.imports {
                if !matches!(import.target, ImportTarget::ByNamespace) {
                    continue;
                }
                import.target = match namespaces.iter().position(|ns| *ns == import.namespace) {
                    Some(found) => ImportTarget::Unit(found),
                    None => match self.cache.by_namespace(import.namespace.as_deref()) {
                        Some(schema) => ImportTarget::Cached(schema),
                        None => {
                            tracing::debug!(
                                namespace = ?import.namespace,
                                "import without schemaLocation matches no loaded schema"
                            );
                            ImportTarget::Unresolved
                        }
                    },
                };
            }
        }
    }

    /// Compile every top-level declaration of a unit into a schema without imports
    fn compile_unit(&mut self, unit: usize) -> Result<Schema> {
        let symbols: Vec<((Category, String), NodeRef)> = self.units[unit]
            .symbols
            .iter()
            .map(|(key, node)| (key.clone(), *node))
            .collect();
        self.options.limits.check_schema_components(symbols.len())?;

        let root = NodeRef {
            doc: self.units[unit].root_doc,
            id: self.documents[self.units[unit].root_doc].document.root,
        };
        let mut schema = Schema::new(self.units[unit].target_namespace.clone());
        schema.element_form_default = self.form_default(root, "elementFormDefault")?;
        schema.attribute_form_default = self.form_default(root, "attributeFormDefault")?;
        schema.block_default = self.derivation_default(root, "blockDefault")?;
        schema.final_default = self.derivation_default(root, "finalDefault")?;
        schema.locations = self.units[unit].locations.clone();

        for ((_, name), node) in symbols {
            match self.compress(node)? {
                Compiled::Element(link) => {
                    if let Some(element) = link.get() {
                        schema.elements.insert(name, element);
                    }
                }
                Compiled::Type(TypeDef::Complex(link)) => {
                    if let Some(complex) = link.get() {
                        schema.complex_types.insert(name, complex);
                    }
                }
                Compiled::Type(TypeDef::Simple(simple)) => {
                    schema.simple_types.insert(name, simple);
                }
                Compiled::GroupDefinition(link) => {
                    if let Some(group) = link.get() {
                        schema.groups.insert(name, group);
                    }
                }
                Compiled::Attribute(attribute) => {
                    schema.attributes.insert(name, attribute);
                }
                Compiled::AttributeGroup(group) => {
                    schema.attribute_groups.insert(name, group);
                }
                other => {
                    tracing::debug!(kind = other.kind(), name = %name, "ignoring non-declaration result");
                }
            }
        }

        tracing::debug!(
            namespace = ?schema.target_namespace,
            components = schema.component_count(),
            "compiled schema unit"
        );
        Ok(schema)
    }
}

/// Ties compiled units together along their imports
struct Assembler {
    prepared: Vec<Option<Schema>>,
    imports: Vec<Vec<UnitImport>>,
    built: Vec<Option<Arc<Schema>>>,
    pending: Vec<Option<Weak<Schema>>>,
}

impl Assembler {
    fn build_arc(&mut self, unit: usize) -> Arc<Schema> {
        if let Some(schema) = &self.built[unit] {
            return Arc::clone(schema);
        }
        let schema = Arc::new_cyclic(|weak| {
            self.pending[unit] = Some(weak.clone());
            let mut schema = self.prepared[unit].take().unwrap_or_else(|| Schema::new(None));
            for import in std::mem::take(&mut self.imports[unit]) {
                let link = match import.target {
                    ImportTarget::Unit(target) => Some(self.link(target)),
                    ImportTarget::Cached(cached) => Some(Link::Resolved(cached)),
                    ImportTarget::ByNamespace | ImportTarget::Unresolved => None,
                };
                schema.imports.push(ImportedSchema {
                    namespace: import.namespace,
                    location: import.location,
                    schema: link,
                });
            }
            schema
        });
        self.pending[unit] = None;
        self.built[unit] = Some(Arc::clone(&schema));
        schema
    }

    fn link(&mut self, unit: usize) -> Link<Schema> {
        if let Some(weak) = &self.pending[unit] {
            return Link::Forward(weak.clone());
        }
        Link::Resolved(self.build_arc(unit))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::ContentModel;
    use pretty_assertions::assert_eq;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn session<T>(sources: &[(&str, &str)], run: impl FnOnce(&mut Compiler<'_>) -> T) -> T {
        let mut loader = Loader::new();
        for (name, xml) in sources {
            loader.add_source(*name, *xml);
        }
        let options = CompileOptions::default();
        let cache = SchemaCache::default();
        let mut compiler = Compiler::new(&loader, &options, &cache);
        run(&mut compiler)
    }

    fn schema(body: &str) -> String {
        format!(r#"<xs:schema {} targetNamespace="urn:t" xmlns="urn:t">{}</xs:schema>"#, XS, body)
    }

    #[test]
    fn test_compress_is_idempotent() {
        let xml = schema(
            r#"<xs:complexType name="T"><xs:sequence><xs:element name="a"/></xs:sequence></xs:complexType>
               <xs:element name="root" type="T"/>"#,
        );
        session(&[("main.xsd", &xml)], |compiler| {
            compiler.load(&Location::Memory("main.xsd".into())).unwrap();
            for (category, name) in [(Category::Type, "T"), (Category::Element, "root")] {
                let node = compiler.declaration(category, name).unwrap();
                let first = compiler.compress(node).unwrap();
                let second = compiler.compress(node).unwrap();
                assert!(first.same_as(&second), "{} compiled twice", name);
            }
        });
    }

    #[test]
    fn test_element_type_is_shared() {
        let xml = schema(
            r#"<xs:complexType name="T"/>
               <xs:element name="root" type="T"/>"#,
        );
        session(&[("main.xsd", &xml)], |compiler| {
            compiler.load(&Location::Memory("main.xsd".into())).unwrap();
            let t = compiler.compress(compiler.declaration(Category::Type, "T").unwrap()).unwrap();
            let root = compiler
                .compress(compiler.declaration(Category::Element, "root").unwrap())
                .unwrap();
            let (Compiled::Type(t), Compiled::Element(root)) = (t, root) else {
                panic!("unexpected results");
            };
            assert!(root.get().unwrap().type_def.same_type(&t));
        });
    }

    #[test]
    fn test_recursive_element_gets_forward_link() {
        let xml = schema(
            r#"<xs:element name="node">
                 <xs:complexType>
                   <xs:sequence><xs:element ref="node" minOccurs="0"/></xs:sequence>
                 </xs:complexType>
               </xs:element>"#,
        );
        session(&[("main.xsd", &xml)], |compiler| {
            compiler.load(&Location::Memory("main.xsd".into())).unwrap();
            let node = compiler.declaration(Category::Element, "node").unwrap();
            let Compiled::Element(link) = compiler.compress(node).unwrap() else {
                panic!("expected an element");
            };
            let element = link.get().unwrap();
            let complex = element.complex_type().unwrap();
            let ContentModel::Elements(grouping) = &complex.content else {
                panic!("expected element content");
            };
            let ElementGrouping::Element(particle) = &grouping.children()[0] else {
                panic!("expected an element particle");
            };
            assert!(particle.element.is_forward());
            assert!(particle.element.points_to(&element));
        });
    }

    #[test]
    fn test_self_referencing_attribute_group_is_circular() {
        let xml = schema(
            r#"<xs:attributeGroup name="g"><xs:attributeGroup ref="g"/></xs:attributeGroup>"#,
        );
        session(&[("main.xsd", &xml)], |compiler| {
            compiler.load(&Location::Memory("main.xsd".into())).unwrap();
            let node = compiler.declaration(Category::AttributeGroup, "g").unwrap();
            assert!(matches!(compiler.compress(node), Err(Error::CircularDefinition(_))));
        });
    }

    #[test]
    fn test_failed_cyclic_build_leaves_no_forward_links() {
        let xml = schema(
            r#"<xs:element name="leaf" type="xs:string"/>
               <xs:element name="node">
                 <xs:complexType>
                   <xs:sequence><xs:element ref="node" minOccurs="0"/></xs:sequence>
                   <xs:attribute ref="missing"/>
                 </xs:complexType>
               </xs:element>"#,
        );
        session(&[("main.xsd", &xml)], |compiler| {
            compiler.load(&Location::Memory("main.xsd".into())).unwrap();
            let leaf = compiler.declaration(Category::Element, "leaf").unwrap();
            compiler.compress(leaf).unwrap();
            let before = compiler.memo.len();

            let node = compiler.declaration(Category::Element, "node").unwrap();
            assert!(matches!(
                compiler.compress(node),
                Err(Error::UnresolvedReference { .. })
            ));
            assert_eq!(compiler.memo.len(), before);
            assert!(matches!(compiler.memo.get(&leaf), Some(Memo::Done(_))));

            assert!(matches!(
                compiler.compress(node),
                Err(Error::UnresolvedReference { .. })
            ));
            assert_eq!(compiler.memo.len(), before);
        });
    }

    #[test]
    fn test_redefine_is_unsupported() {
        let base = schema(r#"<xs:simpleType name="s"><xs:restriction base="xs:string"/></xs:simpleType>"#);
        let main = schema(
            r#"<xs:redefine schemaLocation="base.xsd">
                 <xs:simpleType name="s"><xs:restriction base="s"/></xs:simpleType>
               </xs:redefine>"#,
        );
        let loader = Loader::new().with_source("main.xsd", main).with_source("base.xsd", base);
        let options = CompileOptions::default();
        let cache = SchemaCache::default();
        let mut compiler = Compiler::new(&loader, &options, &cache);
        compiler.load(&Location::Memory("main.xsd".into())).unwrap();
        assert!(matches!(compiler.finish(), Err(Error::UnsupportedConstruct(_))));
    }

    #[test]
    fn test_self_import_is_a_conflict() {
        let xml = schema(r#"<xs:import namespace="urn:t"/>"#);
        session(&[("main.xsd", &xml)], |compiler| {
            let result = compiler.load(&Location::Memory("main.xsd".into()));
            assert!(matches!(result, Err(Error::NamespaceConflict(_))));
        });
    }

    #[test]
    fn test_import_cycle_loads_each_unit_once() {
        let a = format!(
            r#"<xs:schema {} targetNamespace="urn:a"><xs:import namespace="urn:b" schemaLocation="b.xsd"/></xs:schema>"#,
            XS
        );
        let b = format!(
            r#"<xs:schema {} targetNamespace="urn:b"><xs:import namespace="urn:a" schemaLocation="a.xsd"/></xs:schema>"#,
            XS
        );
        let loader = Loader::new().with_source("a.xsd", a).with_source("b.xsd", b);
        let options = CompileOptions::default();
        let cache = SchemaCache::default();
        let mut compiler = Compiler::new(&loader, &options, &cache);
        compiler.load(&Location::Memory("a.xsd".into())).unwrap();
        assert_eq!(compiler.unit_count(), 2);

        let schemas = compiler.finish().unwrap();
        let (_, a) = &schemas[0];
        let (_, b) = &schemas[1];
        assert!(Arc::ptr_eq(&a.imported(Some("urn:b")).unwrap(), b));
        assert!(Arc::ptr_eq(&b.imported(Some("urn:a")).unwrap(), a));
    }
}
