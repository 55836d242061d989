//! Event-driven schema document reader
//!
//! This module tokenizes XML text into namespace-resolved start/end element
//! events and hands them to an [`EventSink`]. It keeps no tree: the sink sees
//! each event exactly once, in document order.

use crate::error::{Error, Result};
use crate::namespaces::{NamespaceContext, QName};
use crate::names::split_qname;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use std::sync::Arc;

/// An attribute as read from a start tag, namespace already resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawAttribute {
    /// Namespace URI (None for unprefixed attributes)
    pub namespace: Option<String>,
    /// Local name
    pub local_name: String,
    /// Unescaped value
    pub value: String,
}

impl RawAttribute {
    /// Create an unqualified attribute
    pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            namespace: None,
            local_name: local_name.into(),
            value: value.into(),
        }
    }

    /// Create a namespace-qualified attribute
    pub fn qualified(
        namespace: impl Into<String>,
        local_name: impl Into<String>,
        value: impl Into<String>,
    ) -> Self {
        Self {
            namespace: Some(namespace.into()),
            local_name: local_name.into(),
            value: value.into(),
        }
    }
}

/// A start-element event
#[derive(Debug, Clone)]
pub struct StartElement {
    /// Resolved element name
    pub name: QName,
    /// Attributes, `xmlns` declarations excluded
    pub attributes: Vec<RawAttribute>,
    /// Namespace bindings in scope at this element
    pub scope: Arc<NamespaceContext>,
}

impl StartElement {
    /// Create a start event with an empty namespace scope
    pub fn new(name: QName, attributes: Vec<RawAttribute>) -> Self {
        Self {
            name,
            attributes,
            scope: Arc::new(NamespaceContext::new()),
        }
    }

    /// Replace the namespace scope
    pub fn with_scope(mut self, scope: Arc<NamespaceContext>) -> Self {
        self.scope = scope;
        self
    }
}

/// Receiver of document events
pub trait EventSink {
    /// Called for every start tag (and for the start half of an empty tag)
    fn start_element(&mut self, element: StartElement) -> Result<()>;

    /// Called for every end tag (and for the end half of an empty tag)
    fn end_element(&mut self) -> Result<()>;
}

/// Read an XML document and drive the sink with its element events
///
/// Text, comments, processing instructions and the XML declaration are skipped.
pub fn read_document<S: EventSink + ?Sized>(xml: &str, sink: &mut S) -> Result<()> {
    let mut reader = Reader::from_str(xml);
    reader.trim_text(true);

    let root_scope = Arc::new(NamespaceContext::new());
    let mut scopes: Vec<Arc<NamespaceContext>> = Vec::new();

    loop {
        let event = reader.read_event().map_err(|e| {
            Error::Xml(format!(
                "Error parsing XML at position {}: {}",
                reader.buffer_position(),
                e
            ))
        })?;

        match event {
            Event::Start(e) => {
                let parent = scopes.last().unwrap_or(&root_scope);
                let start = parse_start(&e, parent)?;
                scopes.push(Arc::clone(&start.scope));
                sink.start_element(start)?;
            }
            Event::Empty(e) => {
                let parent = scopes.last().unwrap_or(&root_scope);
                let start = parse_start(&e, parent)?;
                sink.start_element(start)?;
                sink.end_element()?;
            }
            Event::End(_) => {
                scopes.pop();
                sink.end_element()?;
            }
            Event::Eof => break,
            _ => {} // Ignore other events (text, comments, processing instructions, etc.)
        }
    }

    if !scopes.is_empty() {
        return Err(Error::Xml(format!(
            "Unexpected end of document: {} element(s) left open",
            scopes.len()
        )));
    }

    Ok(())
}

/// Parse a start tag into an event, extending the parent's namespace scope
fn parse_start(start: &BytesStart, parent: &Arc<NamespaceContext>) -> Result<StartElement> {
    let mut declared: Vec<(Option<String>, String)> = Vec::new();
    let mut raw: Vec<(String, String)> = Vec::new();

    for attr_result in start.attributes() {
        let attr = attr_result.map_err(|e| Error::Xml(format!("Failed to parse attribute: {}", e)))?;

        let attr_name = std::str::from_utf8(attr.key.as_ref())
            .map_err(|e| Error::Xml(format!("Invalid attribute name: {}", e)))?
            .to_string();

        let attr_value = attr
            .unescape_value()
            .map_err(|e| Error::Xml(format!("Failed to unescape attribute value: {}", e)))?
            .to_string();

        // Handle namespace declarations
        if attr_name == "xmlns" {
            declared.push((None, attr_value));
        } else if let Some(prefix) = attr_name.strip_prefix("xmlns:") {
            declared.push((Some(prefix.to_string()), attr_value));
        } else {
            raw.push((attr_name, attr_value));
        }
    }

    let scope = if declared.is_empty() {
        Arc::clone(parent)
    } else {
        let mut scope = NamespaceContext::clone(parent);
        for (prefix, namespace) in declared {
            match prefix {
                Some(prefix) => scope.add_prefix(prefix, namespace),
                None => scope.set_default_namespace(namespace),
            }
        }
        Arc::new(scope)
    };

    let name_bytes = start.name();
    let name = std::str::from_utf8(name_bytes.as_ref())
        .map_err(|e| Error::Xml(format!("Invalid element name: {}", e)))?;
    let name = scope.resolve(name)?;

    let mut attributes = Vec::with_capacity(raw.len());
    for (attr_name, value) in raw {
        // Unprefixed attributes are in no namespace
        let attribute = match split_qname(&attr_name) {
            (Some(prefix), local) => {
                let namespace = scope
                    .get_namespace(prefix)
                    .ok_or_else(|| Error::Xml(format!("Unknown prefix: {}", prefix)))?;
                RawAttribute::qualified(namespace, local, value)
            }
            (None, local) => RawAttribute::new(local, value),
        };
        attributes.push(attribute);
    }

    Ok(StartElement {
        name,
        attributes,
        scope,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct Recorder {
        events: Vec<String>,
        scopes: Vec<Arc<NamespaceContext>>,
    }

    impl EventSink for Recorder {
        fn start_element(&mut self, element: StartElement) -> Result<()> {
            let attrs: Vec<String> = element
                .attributes
                .iter()
                .map(|a| format!("{}={}", a.local_name, a.value))
                .collect();
            self.events
                .push(format!("start {} [{}]", element.name, attrs.join(",")));
            self.scopes.push(element.scope);
            Ok(())
        }

        fn end_element(&mut self) -> Result<()> {
            self.events.push("end".to_string());
            Ok(())
        }
    }

    #[test]
    fn test_events_in_document_order() {
        let xml = r#"<?xml version="1.0"?>
            <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema">
                <!-- comment -->
                <xs:element name="a"/>
                <xs:complexType name="t"><xs:sequence/></xs:complexType>
            </xs:schema>"#;
        let mut recorder = Recorder::default();
        read_document(xml, &mut recorder).unwrap();

        let xs = "{http://www.w3.org/2001/XMLSchema}";
        assert_eq!(
            recorder.events,
            vec![
                format!("start {}schema []", xs),
                format!("start {}element [name=a]", xs),
                "end".to_string(),
                format!("start {}complexType [name=t]", xs),
                format!("start {}sequence []", xs),
                "end".to_string(),
                "end".to_string(),
                "end".to_string(),
            ]
        );
    }

    #[test]
    fn test_scope_is_inherited_and_extended() {
        let xml = r#"<a xmlns="urn:default" xmlns:p="urn:p"><b xmlns:q="urn:q"/></a>"#;
        let mut recorder = Recorder::default();
        read_document(xml, &mut recorder).unwrap();

        assert_eq!(recorder.events[0], "start {urn:default}a []");
        let inner = &recorder.scopes[1];
        assert_eq!(inner.get_namespace("p"), Some("urn:p"));
        assert_eq!(inner.get_namespace("q"), Some("urn:q"));
        assert_eq!(recorder.scopes[0].get_namespace("q"), None);
    }

    #[test]
    fn test_qualified_attributes() {
        let xml = r#"<a xmlns:xs="http://www.w3.org/2001/XMLSchema" xs:name="n" plain="v"/>"#;
        let mut recorder = Recorder::default();
        read_document(xml, &mut recorder).unwrap();
        assert_eq!(recorder.events[0], "start a [name=n,plain=v]");
    }

    #[test]
    fn test_unknown_prefix_is_an_error() {
        let mut recorder = Recorder::default();
        let result = read_document("<p:a/>", &mut recorder);
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_malformed_xml() {
        let mut recorder = Recorder::default();
        assert!(read_document("<a><b></a>", &mut recorder).is_err());
    }
}
