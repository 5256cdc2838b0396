//! XML parsing utilities.
//!
//! Builds a small namespace-resolved element tree with quick-xml. quick-xml
//! never expands entities, and documents carrying DOCTYPE or ENTITY
//! declarations are rejected before parsing starts.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use thiserror::Error;

/// SOAP namespace URIs.
pub const SOAP_11_NS: &str = "http://schemas.xmlsoap.org/soap/envelope/";
pub const SOAP_12_NS: &str = "http://www.w3.org/2003/05/soap-envelope";
pub const XSI_NS: &str = "http://www.w3.org/2001/XMLSchema-instance";
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";

/// XML could not be turned into a tree.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum XmlError {
    #[error("DOCTYPE declarations are not allowed")]
    Doctype,

    #[error("Entity declarations are not allowed")]
    Entity,

    #[error("XML parse error: {0}")]
    Syntax(String),

    #[error("Document has no root element")]
    Empty,
}

/// An element with its resolved namespace, attributes, text and children.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct XmlNode {
    /// Element local name
    pub name: String,
    /// Element namespace URI
    pub namespace: Option<String>,
    /// Attributes as (local name, value); prefixes are dropped
    pub attributes: Vec<(String, String)>,
    /// Concatenated text and CDATA content
    pub text: String,
    pub children: Vec<XmlNode>,
}

impl XmlNode {
    /// First child with the given local name.
    pub fn child(&self, name: &str) -> Option<&XmlNode> {
        self.children.iter().find(|c| c.name == name)
    }

    /// All children with the given local name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a XmlNode> + 'a {
        self.children.iter().filter(move |c| c.name == name)
    }

    /// Attribute value by local name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    pub fn is(&self, name: &str, namespace: &str) -> bool {
        self.name == name && self.namespace.as_deref() == Some(namespace)
    }
}

/// Parse a complete document and return its root element.
pub fn parse_document(xml: &str) -> Result<XmlNode, XmlError> {
    check_xxe_patterns(xml)?;

    let mut reader = NsReader::from_str(xml);
    reader.config_mut().trim_text(true);

    let mut stack: Vec<XmlNode> = Vec::new();
    let mut root: Option<XmlNode> = None;

    loop {
        let (ns, event) = reader
            .read_resolved_event()
            .map_err(|e| XmlError::Syntax(e.to_string()))?;
        let namespace = resolved_namespace(ns);

        match event {
            Event::Start(ref e) => {
                stack.push(element(e, namespace)?);
            }

            Event::Empty(ref e) => {
                let node = element(e, namespace)?;
                attach(&mut stack, &mut root, node);
            }

            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| XmlError::Syntax("unexpected closing tag".to_string()))?;
                attach(&mut stack, &mut root, node);
            }

            Event::Text(ref e) => {
                let text = e.unescape().map_err(|e| XmlError::Syntax(e.to_string()))?;
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&text);
                }
            }

            Event::CData(ref e) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(e));
                }
            }

            Event::Eof => break,

            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Syntax("unclosed element at end of document".to_string()));
    }

    root.ok_or(XmlError::Empty)
}

fn attach(stack: &mut [XmlNode], root: &mut Option<XmlNode>, node: XmlNode) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(node),
        None => {
            if root.is_none() {
                *root = Some(node);
            }
        }
    }
}

fn resolved_namespace(ns: ResolveResult<'_>) -> Option<String> {
    match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    }
}

fn element(e: &BytesStart<'_>, namespace: Option<String>) -> Result<XmlNode, XmlError> {
    let mut attributes = Vec::new();
    for attr in e.attributes().flatten() {
        let key = attr.key;
        if key.as_namespace_binding().is_some() {
            continue;
        }
        let name = String::from_utf8_lossy(key.local_name().as_ref()).into_owned();
        let value = attr
            .unescape_value()
            .map_err(|e| XmlError::Syntax(e.to_string()))?
            .into_owned();
        attributes.push((name, value));
    }

    Ok(XmlNode {
        name: String::from_utf8_lossy(e.local_name().as_ref()).into_owned(),
        namespace,
        attributes,
        text: String::new(),
        children: Vec::new(),
    })
}

/// Reject DOCTYPE and entity declarations.
pub fn check_xxe_patterns(xml: &str) -> Result<(), XmlError> {
    let lowered = xml.to_ascii_lowercase();
    if lowered.contains("<!doctype") {
        return Err(XmlError::Doctype);
    }

    if lowered.contains("<!entity") {
        return Err(XmlError::Entity);
    }

    Ok(())
}

/// Strip a namespace prefix from a qualified name (`tns:Foo` -> `Foo`).
pub fn local_part(qname: &str) -> &str {
    qname.rsplit(':').next().unwrap_or(qname)
}

/// Escape text for element content and attribute values.
pub fn xml_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
