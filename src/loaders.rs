//! Resource loading utilities
//!
//! This module loads schema documents from memory or the filesystem. Remote
//! locations are never fetched; a URL can only be served if a document was
//! registered in memory under that exact URL.

use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::Location;
use std::collections::HashMap;
use std::fs;

/// Resource loader for schema documents
#[derive(Debug, Clone, Default)]
pub struct Loader {
    /// Resource limits
    limits: Limits,
    /// Documents registered in memory, keyed by location string
    sources: HashMap<String, String>,
}

impl Loader {
    /// Create a new loader with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Register an in-memory document
    pub fn with_source(mut self, name: impl Into<String>, content: impl Into<String>) -> Self {
        self.add_source(name, content);
        self
    }

    /// Register an in-memory document
    pub fn add_source(&mut self, name: impl Into<String>, content: impl Into<String>) {
        self.sources.insert(name.into(), content.into());
    }

    /// Check whether a document is registered in memory under this location
    pub fn has_source(&self, location: &Location) -> bool {
        self.sources.contains_key(&location.as_str())
    }

    /// Load a resource as a string
    pub fn load(&self, location: &Location) -> Result<String> {
        let key = location.as_str();
        if let Some(content) = self.sources.get(&key) {
            self.limits.check_xml_size(content.len())?;
            return Ok(content.clone());
        }

        match location {
            Location::Path(path) => {
                let content = fs::read_to_string(path).map_err(|e| {
                    Error::Resource(format!("Failed to read file '{}': {}", path.display(), e))
                })?;

                // Check size limits
                self.limits.check_xml_size(content.len())?;

                Ok(content)
            }
            Location::Url(url) => Err(Error::Resource(format!(
                "Remote schema locations are not fetched: {}",
                url
            ))),
            Location::Memory(name) => Err(Error::Resource(format!(
                "No in-memory schema registered as '{}'",
                name
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_load_from_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "<root>test</root>").unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new();
        let content = loader.load(&location).unwrap();

        assert!(content.contains("<root>test</root>"));
    }

    #[test]
    fn test_load_from_memory() {
        let loader = Loader::new().with_source("a.xsd", "<root>test</root>");
        let location = Location::Memory("a.xsd".to_string());

        assert!(loader.has_source(&location));
        assert_eq!(loader.load(&location).unwrap(), "<root>test</root>");
    }

    #[test]
    fn test_missing_memory_source() {
        let loader = Loader::new();
        let result = loader.load(&Location::Memory("nope.xsd".to_string()));
        assert!(matches!(result, Err(Error::Resource(_))));
    }

    #[test]
    fn test_remote_is_refused_unless_registered() {
        let location = Location::from_str("http://example.com/a.xsd").unwrap();
        assert!(Loader::new().load(&location).is_err());

        let loader = Loader::new().with_source("http://example.com/a.xsd", "<a/>");
        assert_eq!(loader.load(&location).unwrap(), "<a/>");
    }

    #[test]
    fn test_size_limit() {
        let mut file = NamedTempFile::new().unwrap();
        let large_content = "x".repeat(11 * 1024 * 1024); // 11 MB
        write!(file, "{}", large_content).unwrap();

        let location = Location::Path(file.path().to_path_buf());
        let loader = Loader::new().with_limits(Limits::strict());
        let result = loader.load(&location);

        // Strict limits (10 MB max) should reject 11MB file
        assert!(result.is_err());
    }
}
