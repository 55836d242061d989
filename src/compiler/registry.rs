//! Schema registry
//!
//! The registry is the entry point for compiling schemas. It owns a loader and
//! a cache of every schema compiled so far, keyed by target namespace and
//! source location. A later compile that imports an already compiled location
//! links to the cached schema instead of loading it again.

use super::{CompileOptions, Compiler};
use crate::components::Schema;
use crate::error::{Error, Result};
use crate::loaders::Loader;
use crate::locations::Location;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

/// Cache key of a compiled schema
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SchemaKey {
    /// Target namespace
    pub namespace: Option<String>,
    /// Location of the schema's root document
    pub location: String,
}

/// Compiled schemas by key
#[derive(Debug, Default)]
pub struct SchemaCache {
    by_key: HashMap<SchemaKey, Arc<Schema>>,
    by_location: HashMap<String, SchemaKey>,
}

impl SchemaCache {
    /// Get a schema by namespace and location
    pub fn get(&self, namespace: Option<&str>, location: &str) -> Option<Arc<Schema>> {
        let key = SchemaKey {
            namespace: namespace.map(String::from),
            location: location.to_string(),
        };
        self.by_key.get(&key).cloned()
    }

    /// Get the schema compiled from a location
    pub fn by_location(&self, location: &str) -> Option<Arc<Schema>> {
        self.by_location
            .get(location)
            .and_then(|key| self.by_key.get(key))
            .cloned()
    }

    /// Get a schema with the given target namespace
    pub fn by_namespace(&self, namespace: Option<&str>) -> Option<Arc<Schema>> {
        self.by_key
            .iter()
            .find(|(key, _)| key.namespace.as_deref() == namespace)
            .map(|(_, schema)| Arc::clone(schema))
    }

    /// Add a schema
    pub fn insert(&mut self, key: SchemaKey, schema: Arc<Schema>) {
        self.by_location.insert(key.location.clone(), key.clone());
        self.by_key.insert(key, schema);
    }

    /// Number of cached schemas
    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    /// Check if the cache is empty
    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    /// Cached keys
    pub fn keys(&self) -> impl Iterator<Item = &SchemaKey> {
        self.by_key.keys()
    }
}

/// Entry point for compiling schemas
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    loader: Loader,
    options: CompileOptions,
    cache: Mutex<SchemaCache>,
}

impl SchemaRegistry {
    /// Create a registry loading from the filesystem with default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a loader (for in-memory documents)
    pub fn with_loader(mut self, loader: Loader) -> Self {
        self.loader = loader;
        self
    }

    /// Set the compile options
    pub fn with_options(mut self, options: CompileOptions) -> Self {
        self.loader = self.loader.with_limits(options.limits.clone());
        self.options = options;
        self
    }

    /// The loader
    pub fn loader(&self) -> &Loader {
        &self.loader
    }

    /// The compile options
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compile the schema at a location, with everything it includes and imports
    ///
    /// A location compiled before is answered from the cache.
    pub fn compile(&self, location: &str) -> Result<Arc<Schema>> {
        let location = Location::from_str(location)?;
        self.compile_location(&location, None)
    }

    /// Compile schema text registered under a name
    ///
    /// Relative `schemaLocation` hints in the text resolve against `name` and
    /// are served by the loader.
    pub fn compile_str(&self, name: &str, xml: &str) -> Result<Arc<Schema>> {
        let location = Location::Memory(name.to_string());
        self.compile_location(&location, Some(xml))
    }

    fn compile_location(&self, location: &Location, xml: Option<&str>) -> Result<Arc<Schema>> {
        let mut cache = self.lock()?;
        let key = location.as_str();
        if let Some(schema) = cache.by_location(&key) {
            tracing::debug!(location = %key, "schema answered from cache");
            return Ok(schema);
        }

        let mut compiler = Compiler::new(&self.loader, &self.options, &cache);
        match xml {
            Some(xml) => compiler.load_str(location, xml)?,
            None => compiler.load(location)?,
        };
        let compiled = compiler.finish()?;

        let root = compiled
            .first()
            .map(|(_, schema)| Arc::clone(schema))
            .ok_or_else(|| Error::Resource(format!("compiling '{}' produced no schema", key)))?;
        tracing::info!(location = %key, schemas = compiled.len(), "compiled schema");
        for (key, schema) in compiled {
            cache.insert(key, schema);
        }
        Ok(root)
    }

    /// Get a compiled schema by namespace and location
    pub fn get(&self, namespace: Option<&str>, location: &str) -> Option<Arc<Schema>> {
        self.lock().ok()?.get(namespace, location)
    }

    /// Number of compiled schemas
    pub fn len(&self) -> usize {
        self.lock().map(|cache| cache.len()).unwrap_or(0)
    }

    /// Check if nothing has been compiled
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn lock(&self) -> Result<MutexGuard<'_, SchemaCache>> {
        self.cache
            .lock()
            .map_err(|_| Error::Resource("schema cache lock poisoned".to_string()))
    }
}
