//! Resource location resolution
//!
//! This module handles resolution of schema locations (file paths, URLs and
//! in-memory names) and the joining of a `schemaLocation` hint against the
//! document that contains it.

use crate::error::Result;
use std::fmt;
use std::path::{Component, Path, PathBuf};
use url::Url;

/// Resource location - can be a URL, file path, or in-memory name
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Location {
    /// File system path
    Path(PathBuf),
    /// URL (http, https, ftp, etc.)
    Url(Url),
    /// Name of a document registered in memory
    Memory(String),
}

impl Location {
    /// Create a location from a string (auto-detect type)
    pub fn from_str(s: &str) -> Result<Self> {
        // Try to parse as URL first
        if let Ok(url) = Url::parse(s) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Ok(Location::Path(path));
                }
            } else if url.scheme().len() > 1 {
                // Single letter schemes are Windows drive letters
                return Ok(Location::Url(url));
            }
        }

        // Try as file path
        let path = PathBuf::from(s);
        if path.exists() || s.starts_with('/') || s.starts_with('.') {
            return Ok(Location::Path(path));
        }

        // Otherwise treat as in-memory name
        Ok(Location::Memory(s.to_string()))
    }

    /// Resolve a `schemaLocation` relative to this location
    pub fn resolve(&self, relative: &str) -> Result<Location> {
        let relative = relative.trim();
        if let Ok(url) = Url::parse(relative) {
            if url.scheme() == "file" {
                if let Ok(path) = url.to_file_path() {
                    return Ok(Location::Path(normalize(&path)));
                }
            } else if url.scheme().len() > 1 {
                return Ok(Location::Url(url));
            }
        }

        match self {
            Location::Path(base) => {
                let joined = match base.parent() {
                    Some(dir) => dir.join(relative),
                    None => PathBuf::from(relative),
                };
                Ok(Location::Path(normalize(&joined)))
            }
            Location::Url(base) => Ok(Location::Url(base.join(relative)?)),
            Location::Memory(base) => {
                if relative.starts_with('/') {
                    return Ok(Location::Memory(relative.to_string()));
                }
                let joined = match base.rsplit_once('/') {
                    Some((dir, _)) => format!("{}/{}", dir, relative),
                    None => relative.to_string(),
                };
                Ok(Location::Memory(normalize_str(&joined)))
            }
        }
    }

    /// Get the location as a string
    pub fn as_str(&self) -> String {
        match self {
            Location::Path(p) => p.to_string_lossy().to_string(),
            Location::Url(u) => u.to_string(),
            Location::Memory(s) => s.clone(),
        }
    }

    /// Check if this is a remote location (URL)
    pub fn is_remote(&self) -> bool {
        matches!(self, Location::Url(_))
    }

    /// Check if this is a local file
    pub fn is_file(&self) -> bool {
        matches!(self, Location::Path(_))
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.as_str())
    }
}

/// Lexically remove `.` and `..` segments so the same file has one key
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

fn normalize_str(name: &str) -> String {
    let mut segments: Vec<&str> = Vec::new();
    for segment in name.split('/') {
        match segment {
            "." | "" => {}
            ".." => {
                if segments.pop().is_none() {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }
    segments.join("/")
}
