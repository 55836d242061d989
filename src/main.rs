//! Command-line interface for xsdc

#[cfg(feature = "cli")]
use clap::{Parser, Subcommand};

#[cfg(feature = "cli")]
use std::path::{Path, PathBuf};
#[cfg(feature = "cli")]
use std::sync::Arc;

#[cfg(feature = "cli")]
use tracing_subscriber::EnvFilter;

#[cfg(feature = "cli")]
use xsdc::{CompileOptions, Limits, Schema, SchemaRegistry, TypeDef};

#[cfg(feature = "cli")]
#[derive(Parser, Debug)]
#[command(name = "xsdc")]
#[command(author, version, about = "XML Schema definition compiler", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Keep going when an imported document cannot be loaded
    #[arg(long, global = true)]
    tolerate_unresolved_imports: bool,

    /// Maximum include/import nesting
    #[arg(long, global = true)]
    max_schema_depth: Option<usize>,
}

#[cfg(feature = "cli")]
#[derive(Subcommand, Debug)]
enum Commands {
    /// Compile a schema and display its components
    Inspect {
        /// Path to the XSD schema file
        #[arg(value_name = "SCHEMA")]
        schema: PathBuf,

        /// Show detailed information about a specific element
        #[arg(short, long)]
        element: Option<String>,

        /// Show detailed information about a specific type
        #[arg(short = 't', long)]
        type_name: Option<String>,

        /// Show imported schemas
        #[arg(long)]
        imports: bool,

        /// Output as JSON
        #[arg(short, long)]
        json: bool,
    },

    /// Compile a schema and report whether it is valid
    Check {
        /// Paths to XSD schema files
        #[arg(value_name = "SCHEMA", required = true)]
        schemas: Vec<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut limits = Limits::default();
    if let Some(depth) = cli.max_schema_depth {
        limits.max_schema_depth = depth;
    }
    let options = CompileOptions::default()
        .with_limits(limits)
        .tolerate_unresolved_imports(cli.tolerate_unresolved_imports);
    let registry = SchemaRegistry::new().with_options(options);

    let result = match cli.command {
        Commands::Inspect {
            schema,
            element,
            type_name,
            imports,
            json,
        } => cmd_inspect(&registry, schema, element, type_name, imports, json),
        Commands::Check { schemas } => cmd_check(&registry, schemas),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

#[cfg(feature = "cli")]
fn compile(registry: &SchemaRegistry, path: &Path) -> xsdc::Result<Arc<Schema>> {
    registry.compile(&path.to_string_lossy())
}

#[cfg(feature = "cli")]
fn cmd_inspect(
    registry: &SchemaRegistry,
    schema_path: PathBuf,
    element: Option<String>,
    type_name: Option<String>,
    show_imports: bool,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let schema = compile(registry, &schema_path)?;

    if let Some(name) = element {
        return print_element_details(&schema, &name, json_output);
    }
    if let Some(name) = type_name {
        return print_type_details(&schema, &name, json_output);
    }

    if json_output {
        println!("{}", serde_json::to_string_pretty(&schema_json(&schema, show_imports))?);
        return Ok(());
    }

    print_schema_summary(&schema);

    println!("\n=== Global Elements ===");
    for (name, element) in &schema.elements {
        println!("  {} : {}", name, element.type_def);
    }

    println!("\n=== Global Types ===");
    for (name, complex) in &schema.complex_types {
        println!("  {} (complex) {}", name, content_summary(complex));
    }
    for name in schema.simple_types.keys() {
        println!("  {} (simple)", name);
    }

    if !schema.groups.is_empty() {
        println!("\n=== Model Groups ===");
        for (name, group) in &schema.groups {
            match &group.child {
                Some(child) => println!("  {} = {}", name, child),
                None => println!("  {} (empty)", name),
            }
        }
    }

    if show_imports {
        println!("\n=== Imports ===");
        for import in &schema.imports {
            let state = if import.get().is_some() { "resolved" } else { "unresolved" };
            println!(
                "  {} [{}] {}",
                import.namespace.as_deref().unwrap_or("(no namespace)"),
                import.location.as_deref().unwrap_or("-"),
                state
            );
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn content_summary(complex: &xsdc::ComplexType) -> String {
    match complex.grouping() {
        Some(grouping) => grouping.to_string(),
        None if complex.has_simple_content() => "simple content".to_string(),
        None => "empty".to_string(),
    }
}

#[cfg(feature = "cli")]
fn print_schema_summary(schema: &Schema) {
    println!("xsdc v{}", xsdc::VERSION);
    println!();
    println!("Schema Information:");
    match &schema.target_namespace {
        Some(ns) => println!("  Target Namespace: {}", ns),
        None => println!("  Target Namespace: (none)"),
    }
    println!("  Element Form Default: {}", schema.element_form_default);
    println!("  Attribute Form Default: {}", schema.attribute_form_default);
    println!();
    println!("Statistics:");
    println!("  Global Elements: {}", schema.elements.len());
    println!("  Global Types: {}", schema.complex_types.len() + schema.simple_types.len());
    println!("  Global Attributes: {}", schema.attributes.len());
    println!("  Model Groups: {}", schema.groups.len());
    println!("  Attribute Groups: {}", schema.attribute_groups.len());
    println!("  Imports: {}", schema.imports.len());
}

#[cfg(feature = "cli")]
fn schema_json(schema: &Schema, include_imports: bool) -> serde_json::Value {
    use serde_json::{json, Map, Value};

    let mut output = Map::new();
    output.insert("targetNamespace".to_string(), json!(schema.target_namespace));
    output.insert(
        "elementFormDefault".to_string(),
        json!(schema.element_form_default.to_string()),
    );
    output.insert(
        "attributeFormDefault".to_string(),
        json!(schema.attribute_form_default.to_string()),
    );

    let mut stats = Map::new();
    stats.insert("globalElements".to_string(), json!(schema.elements.len()));
    stats.insert(
        "globalTypes".to_string(),
        json!(schema.complex_types.len() + schema.simple_types.len()),
    );
    stats.insert("globalAttributes".to_string(), json!(schema.attributes.len()));
    stats.insert("modelGroups".to_string(), json!(schema.groups.len()));
    stats.insert("attributeGroups".to_string(), json!(schema.attribute_groups.len()));
    output.insert("statistics".to_string(), Value::Object(stats));

    let elements: Vec<Value> = schema
        .elements
        .values()
        .map(|element| {
            json!({
                "name": element.name.to_string(),
                "type": element.type_def.to_string(),
                "nillable": element.nillable,
                "abstract": element.is_abstract,
            })
        })
        .collect();
    output.insert("elements".to_string(), Value::Array(elements));

    let mut types: Vec<Value> = schema
        .complex_types
        .values()
        .map(|complex| {
            json!({
                "name": complex.name.as_ref().map(|n| n.to_string()),
                "kind": "complex",
                "content": content_summary(complex),
                "attributes": complex.attributes.iter().map(|a| a.name.to_string()).collect::<Vec<_>>(),
            })
        })
        .collect();
    types.extend(schema.simple_types.values().map(|simple| {
        json!({
            "name": simple.name.as_ref().map(|n| n.to_string()),
            "kind": "simple",
            "variety": format!("{:?}", simple.variety()).to_lowercase(),
        })
    }));
    output.insert("types".to_string(), Value::Array(types));

    if include_imports {
        let imports: Vec<Value> = schema
            .imports
            .iter()
            .map(|import| {
                json!({
                    "namespace": import.namespace,
                    "location": import.location,
                    "resolved": import.get().is_some(),
                })
            })
            .collect();
        output.insert("imports".to_string(), Value::Array(imports));
    }

    Value::Object(output)
}

#[cfg(feature = "cli")]
fn print_element_details(
    schema: &Schema,
    name: &str,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let element = schema
        .element(name)
        .ok_or_else(|| format!("Element '{}' not found in schema", name))?;

    let content = element.complex_type().map(|complex| content_summary(&complex));
    let head = element.substitution_head().map(|head| head.name.to_string());
    if json_output {
        let json = serde_json::json!({
            "name": element.name.to_string(),
            "localName": element.name.local_name,
            "namespace": element.name.namespace,
            "type": element.type_def.to_string(),
            "content": content,
            "nillable": element.nillable,
            "abstract": element.is_abstract,
            "substitutionGroup": head,
            "default": element.default,
            "fixed": element.fixed,
        });
        println!("{}", serde_json::to_string_pretty(&json)?);
    } else {
        println!("Element: {}", element.name);
        println!("  Type: {}", element.type_def);
        if let Some(content) = content {
            println!("  Content: {}", content);
        }
        if let Some(head) = head {
            println!("  Substitution Group: {}", head);
        }
        println!("  Nillable: {}", element.nillable);
        println!("  Abstract: {}", element.is_abstract);
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn print_type_details(
    schema: &Schema,
    name: &str,
    json_output: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let type_def = schema
        .type_def(name)
        .ok_or_else(|| format!("Type '{}' not found in schema", name))?;

    match type_def {
        TypeDef::Simple(simple) => {
            if json_output {
                let json = serde_json::json!({
                    "name": simple.name.as_ref().map(|n| n.to_string()),
                    "kind": "simple",
                    "variety": format!("{:?}", simple.variety()).to_lowercase(),
                    "base": simple.base_type().and_then(|b| b.name.clone()).map(|n| n.to_string()),
                    "enumeration": simple.facets.enumeration(),
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("Type: {} (simple)", simple);
                println!("  Variety: {:?}", simple.variety());
                for facet in simple.facets.iter() {
                    println!("  Facet: {} = {}", facet.kind(), facet.value());
                }
            }
        }
        TypeDef::Complex(link) => {
            let complex = link
                .get()
                .ok_or_else(|| format!("Type '{}' is no longer available", name))?;
            let attributes: Vec<String> = complex.attributes.iter().map(|a| a.name.to_string()).collect();
            if json_output {
                let json = serde_json::json!({
                    "name": complex.name.as_ref().map(|n| n.to_string()),
                    "kind": "complex",
                    "base": complex.base.as_ref().and_then(TypeDef::name).map(|n| n.to_string()),
                    "derivation": complex.derivation.map(|d| d.to_string()),
                    "mixed": complex.mixed,
                    "abstract": complex.is_abstract,
                    "content": content_summary(&complex),
                    "attributes": attributes,
                });
                println!("{}", serde_json::to_string_pretty(&json)?);
            } else {
                println!("Type: {} (complex)", complex);
                println!("  Content: {}", content_summary(&complex));
                for attribute in attributes {
                    println!("  Attribute: {}", attribute);
                }
            }
        }
    }
    Ok(())
}

#[cfg(feature = "cli")]
fn cmd_check(registry: &SchemaRegistry, schemas: Vec<PathBuf>) -> Result<(), Box<dyn std::error::Error>> {
    let mut failures = 0;
    for path in &schemas {
        match compile(registry, path) {
            Ok(schema) => println!("✓ {}: {} components", path.display(), schema.component_count()),
            Err(e) => {
                failures += 1;
                println!("✗ {}: {}", path.display(), e);
            }
        }
    }

    if failures > 0 {
        return Err(format!("{} of {} schemas failed to compile", failures, schemas.len()).into());
    }
    Ok(())
}

#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("CLI feature not enabled. Rebuild with --features cli");
    std::process::exit(1);
}
