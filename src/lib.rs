//! # xsdc
//!
//! An XML Schema (XSD 1.0) definition compiler.
//!
//! Schema documents are parsed into a tree of construct handlers, and each
//! top-level declaration is then compiled into an immutable, cross-referenced
//! component graph: elements, complex and simple types, model groups,
//! attributes, attribute groups and wildcards. References between components
//! are shared `Arc` handles, so every `ref="x"` in a schema points at the one
//! compiled `x`.
//!
//! ## Features
//!
//! - `include` (including chameleon includes) and `import` across documents
//! - Recursive elements and groups, compiled to a finite graph
//! - Complex type extension with flattened content models
//! - Simple type restriction, list and union with facet checking
//! - Built-in XSD datatypes
//! - Resource limits against oversized or runaway schema sets
//!
//! ## Example
//!
//! ```rust,no_run
//! use xsdc::SchemaRegistry;
//!
//! let registry = SchemaRegistry::new();
//! let schema = registry.compile("path/to/schema.xsd")?;
//!
//! for (name, element) in &schema.elements {
//!     println!("{}: {}", name, element.type_def);
//! }
//! # Ok::<(), xsdc::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod namespaces;
pub mod names;
pub mod locations;

// Resource loading
pub mod loaders;
pub mod documents;

// Compiled components
pub mod components;

// Construct handlers and compilation
pub mod handlers;
pub mod compiler;

// Re-exports for convenience
pub use compiler::{CompileOptions, SchemaRegistry};
pub use components::{ComplexType, Element, ElementGrouping, Schema, SimpleType, TypeDef};
pub use error::{Error, Result};
pub use limits::Limits;
pub use loaders::Loader;
pub use namespaces::QName;

/// Version of the xsdc library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// XSD 1.0 namespace
pub const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema";

/// XML namespace
pub const XML_NAMESPACE: &str = "http://www.w3.org/XML/1998/namespace";

