//! Handler construction from document events

use super::dispatch::accept_child;
use super::{Attributes, Construct, Handler, HandlerArena, HandlerId};
use crate::documents::{read_document, EventSink, StartElement};
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::XSD_NAMESPACE;

enum Frame {
    Handler(HandlerId),
    /// Inside a skipped subtree (annotation, foreign element)
    Skipped,
}

/// Event sink that builds the handler arena of one schema document
pub struct DocumentBuilder<'a> {
    limits: &'a Limits,
    arena: HandlerArena,
    stack: Vec<Frame>,
    root: Option<HandlerId>,
}

impl<'a> DocumentBuilder<'a> {
    /// Create a builder checking the given limits
    pub fn new(limits: &'a Limits) -> Self {
        Self {
            limits,
            arena: HandlerArena::new(),
            stack: Vec::new(),
            root: None,
        }
    }

    /// Finish building, returning the document
    pub fn finish(self) -> Result<SchemaDocument> {
        if !self.stack.is_empty() {
            return Err(Error::Xml("document ended inside an open element".to_string()));
        }
        let root = self
            .root
            .ok_or_else(|| Error::Xml("document has no root element".to_string()))?;
        Ok(SchemaDocument {
            arena: self.arena,
            root,
        })
    }
}

impl EventSink for DocumentBuilder<'_> {
    fn start_element(&mut self, element: StartElement) -> Result<()> {
        self.limits.check_xml_depth(self.stack.len() + 1)?;
        self.limits.check_attributes(element.attributes.len())?;

        let parent = match self.stack.last() {
            Some(Frame::Skipped) => {
                self.stack.push(Frame::Skipped);
                return Ok(());
            }
            Some(Frame::Handler(parent)) => Some(*parent),
            None => None,
        };

        let construct = match parent {
            Some(parent) => match accept_child(&self.arena, parent, &element.name)? {
                Some(construct) => construct,
                None => {
                    self.stack.push(Frame::Skipped);
                    return Ok(());
                }
            },
            None => {
                if self.root.is_some() {
                    return Err(Error::Xml("document has more than one root element".to_string()));
                }
                if !element.name.is_in(Some(XSD_NAMESPACE)) || element.name.local_name != "schema" {
                    return Err(Error::unexpected_child(format!(
                        "document root must be xs:schema, found '{}'",
                        element.name
                    )));
                }
                Construct::Schema
            }
        };

        let id = self.arena.push(Handler {
            construct,
            attributes: Attributes::new(element.attributes),
            children: Vec::new(),
            parent,
            scope: element.scope,
        });
        if parent.is_none() {
            self.root = Some(id);
        }
        self.stack.push(Frame::Handler(id));
        Ok(())
    }

    fn end_element(&mut self) -> Result<()> {
        match self.stack.pop() {
            Some(Frame::Handler(id)) => {
                if let Some(parent) = self.arena[id].parent {
                    self.arena.on_child_finished(parent, id);
                }
                Ok(())
            }
            Some(Frame::Skipped) => Ok(()),
            None => Err(Error::Xml("end tag without a matching start tag".to_string())),
        }
    }
}

/// The handler tree of one parsed schema document
#[derive(Debug, Clone)]
pub struct SchemaDocument {
    /// All handlers of the document
    pub arena: HandlerArena,
    /// The xs:schema handler
    pub root: HandlerId,
}

impl SchemaDocument {
    /// Parse schema text into handlers
    pub fn parse(xml: &str, limits: &Limits) -> Result<Self> {
        limits.check_xml_size(xml.len())?;
        let mut builder = DocumentBuilder::new(limits);
        read_document(xml, &mut builder)?;
        builder.finish()
    }

    /// The xs:schema handler
    pub fn root_handler(&self) -> &Handler {
        &self.arena[self.root]
    }

    /// Declared target namespace
    pub fn target_namespace(&self) -> Option<String> {
        self.root_handler()
            .attribute("targetNamespace")
            .map(str::trim)
            .filter(|ns| !ns.is_empty())
            .map(String::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const XS: &str = r#"xmlns:xs="http://www.w3.org/2001/XMLSchema""#;

    fn parse(body: &str) -> Result<SchemaDocument> {
        let xml = format!(r#"<xs:schema {} targetNamespace="urn:t">{}</xs:schema>"#, XS, body);
        SchemaDocument::parse(&xml, &Limits::default())
    }

    fn outline(doc: &SchemaDocument, id: HandlerId, out: &mut Vec<String>, depth: usize) {
        out.push(format!("{}{}", "  ".repeat(depth), doc.arena[id].construct.local_name()));
        for (child, _) in doc.arena.children(id) {
            outline(doc, child, out, depth + 1);
        }
    }

    #[test]
    fn test_builds_tree_in_document_order() {
        let doc = parse(
            r#"<xs:annotation><xs:documentation>skipped</xs:documentation></xs:annotation>
               <xs:complexType name="t">
                 <xs:sequence>
                   <xs:element name="a"/>
                   <xs:element name="b" minOccurs="0"/>
                 </xs:sequence>
                 <xs:attribute name="id" type="xs:ID"/>
               </xs:complexType>
               <xs:element name="root" type="t"/>"#,
        )
        .unwrap();

        let mut out = Vec::new();
        outline(&doc, doc.root, &mut out, 0);
        assert_eq!(
            out,
            vec![
                "schema",
                "  complexType",
                "    sequence",
                "      element",
                "      element",
                "    attribute",
                "  element",
            ]
        );
        assert_eq!(doc.target_namespace().as_deref(), Some("urn:t"));
    }

    #[test]
    fn test_root_must_be_schema() {
        let result = SchemaDocument::parse(&format!("<xs:element {}/>", XS), &Limits::default());
        assert!(matches!(result, Err(Error::UnexpectedChild(_))));
    }

    #[test]
    fn test_second_exclusive_child_fails_immediately() {
        let result = parse(
            r#"<xs:complexType name="t">
                 <xs:sequence/>
                 <xs:choice/>
               </xs:complexType>"#,
        );
        assert!(matches!(result, Err(Error::UnexpectedChild(_))));
    }

    #[test]
    fn test_depth_limit() {
        let mut limits = Limits::default();
        limits.max_xml_depth = 3;
        let xml = format!(
            r#"<xs:schema {}><xs:complexType name="t"><xs:sequence><xs:element name="a"/></xs:sequence></xs:complexType></xs:schema>"#,
            XS
        );
        assert!(matches!(
            SchemaDocument::parse(&xml, &limits),
            Err(Error::LimitExceeded(_))
        ));
    }

    #[test]
    fn test_foreign_subtree_is_skipped() {
        let doc = parse(
            r#"<xs:element name="e">
                 <ext:info xmlns:ext="urn:ext"><xs:sequence/></ext:info>
               </xs:element>"#,
        )
        .unwrap();
        let (element, _) = doc.arena.children(doc.root).next().unwrap();
        assert_eq!(doc.arena.children(element).count(), 0);
    }
}
