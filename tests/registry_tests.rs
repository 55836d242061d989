//! Registry tests against schema files on disk

use pretty_assertions::assert_eq;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;
use xsdc::error::Category;
use xsdc::{CompileOptions, Error, Limits, QName, SchemaRegistry};

const LIBRARY_NS: &str = "http://example.com/library";
const COMMON_NS: &str = "http://example.com/common";

fn fixture(name: &str) -> String {
    let path: PathBuf = [env!("CARGO_MANIFEST_DIR"), "tests", "fixtures", name]
        .iter()
        .collect();
    path.to_string_lossy().into_owned()
}

#[test]
fn test_library_schema() {
    let registry = SchemaRegistry::new();
    let schema = registry.compile(&fixture("library.xsd")).unwrap();

    assert_eq!(schema.target_namespace.as_deref(), Some(LIBRARY_NS));
    assert_eq!(schema.locations.len(), 2);
    assert!(schema.complex_type("bookType").is_some());

    let common = schema.imported(Some(COMMON_NS)).unwrap();
    assert!(common.simple_type("isbnType").is_some());
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_library_book_content() {
    let schema = SchemaRegistry::new().compile(&fixture("library.xsd")).unwrap();

    let book_type = schema.complex_type("bookType").unwrap();
    let names = book_type.grouping().unwrap().element_names();
    assert_eq!(
        names,
        vec![
            QName::local("id"),
            QName::namespaced(LIBRARY_NS, "title"),
            QName::namespaced(LIBRARY_NS, "isbn"),
        ]
    );
    assert!(book_type.attributes.get_local("lang").is_some());

    let common = schema.imported(Some(COMMON_NS)).unwrap();
    assert!(Arc::ptr_eq(
        &book_type.base_complex().unwrap(),
        common.complex_type("itemType").unwrap()
    ));
}

#[test]
fn test_library_element() {
    let schema = SchemaRegistry::new().compile(&fixture("library.xsd")).unwrap();

    let library = schema.element("library").unwrap();
    assert_eq!(library.name, QName::namespaced(LIBRARY_NS, "library"));
    let complex = library.complex_type().unwrap();
    assert!(complex.name.is_none());

    let book = &complex.grouping().unwrap().children()[0];
    assert!(book.occurs().is_unbounded());

    let version = complex
        .attributes
        .get(&QName::namespaced(COMMON_NS, "version"))
        .unwrap();
    assert!(version.simple_type.validate("1.5").is_ok());
    assert!(version.simple_type.validate("one").is_err());
}

#[test]
fn test_isbn_pattern() {
    let schema = SchemaRegistry::new().compile(&fixture("common.xsd")).unwrap();
    let isbn = schema.simple_type("isbnType").unwrap();
    assert!(isbn.validate("978-0123456789").is_ok());
    assert!(isbn.validate("9780123456789").is_err());
}

#[test]
fn test_imported_schema_is_shared_with_registry() {
    let registry = SchemaRegistry::new();
    let library = registry.compile(&fixture("library.xsd")).unwrap();
    let common = registry.compile(&fixture("common.xsd")).unwrap();
    assert!(Arc::ptr_eq(&library.imported(Some(COMMON_NS)).unwrap(), &common));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_broken_schema_reports_reference() {
    let result = SchemaRegistry::new().compile(&fixture("broken.xsd"));
    match result {
        Err(Error::UnresolvedReference { category, name }) => {
            assert_eq!(category, Category::Attribute);
            assert_eq!(name, QName::local("missing"));
        }
        other => panic!("expected an unresolved reference, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_missing_file() {
    let result = SchemaRegistry::new().compile(&fixture("does-not-exist.xsd"));
    assert!(matches!(result, Err(Error::Resource(_)) | Err(Error::Io(_))));
}

#[test]
fn test_import_cycle_on_disk() {
    let dir = TempDir::new().unwrap();
    let xs = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;
    fs::write(
        dir.path().join("a.xsd"),
        format!(
            r#"<xs:schema {} xmlns:b="urn:b" targetNamespace="urn:a">
                 <xs:import namespace="urn:b" schemaLocation="b.xsd"/>
                 <xs:element name="a" type="b:bType"/>
                 <xs:complexType name="aType"><xs:sequence><xs:element name="x" type="xs:string"/></xs:sequence></xs:complexType>
               </xs:schema>"#,
            xs
        ),
    )
    .unwrap();
    fs::write(
        dir.path().join("b.xsd"),
        format!(
            r#"<xs:schema {} xmlns:a="urn:a" targetNamespace="urn:b">
                 <xs:import namespace="urn:a" schemaLocation="a.xsd"/>
                 <xs:complexType name="bType">
                   <xs:sequence><xs:element name="inner" type="a:aType"/></xs:sequence>
                 </xs:complexType>
               </xs:schema>"#,
            xs
        ),
    )
    .unwrap();

    let registry = SchemaRegistry::new();
    let a = registry
        .compile(&dir.path().join("a.xsd").to_string_lossy())
        .unwrap();
    let b = a.imported(Some("urn:b")).unwrap();
    assert!(Arc::ptr_eq(&b.imported(Some("urn:a")).unwrap(), &a));

    let b_type = b.complex_type("bType").unwrap();
    assert!(Arc::ptr_eq(&a.element("a").unwrap().complex_type().unwrap(), b_type));
    assert_eq!(registry.len(), 2);
}

#[test]
fn test_include_depth_limit() {
    let dir = TempDir::new().unwrap();
    let xs = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;
    for i in 0..4 {
        let body = if i < 3 {
            format!(r#"<xs:include schemaLocation="s{}.xsd"/>"#, i + 1)
        } else {
            String::new()
        };
        fs::write(
            dir.path().join(format!("s{}.xsd", i)),
            format!(r#"<xs:schema {}>{}</xs:schema>"#, xs, body),
        )
        .unwrap();
    }

    let root = dir.path().join("s0.xsd").to_string_lossy().into_owned();
    let limits = Limits {
        max_schema_depth: 2,
        ..Limits::default()
    };
    let shallow = SchemaRegistry::new().with_options(CompileOptions::default().with_limits(limits));
    assert!(matches!(shallow.compile(&root), Err(Error::LimitExceeded(_))));

    let schema = SchemaRegistry::new().compile(&root).unwrap();
    assert_eq!(schema.locations.len(), 4);
}
