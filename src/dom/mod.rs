//! Read-only element tree consumed by the parser engine.
//!
//! The engine never touches XML directly; it navigates through the
//! [`TreeNode`] trait (first child, next sibling, attribute lookup, local
//! tag name). [`XmlDocument`] is the built-in implementation: an
//! element-only tree read from a quick-xml event stream. Text and comment
//! nodes are never materialized, so sibling navigation only ever sees
//! elements.

use indexmap::IndexMap;
use smol_str::SmolStr;
use std::rc::Rc;
use thiserror::Error;

/// A position in the input tree, as seen by grammar rules.
///
/// Implementations are handles: cloning must be cheap, and navigation
/// returns fresh handles rather than borrowed references.
pub trait TreeNode: Clone + 'static {
    /// Tag name without any namespace prefix.
    fn local_name(&self) -> &str;

    /// Attribute value by full (prefixed) attribute name.
    fn attribute(&self, name: &str) -> Option<&str>;

    /// All attributes in document order, full names preserved.
    fn attributes(&self) -> Vec<(SmolStr, SmolStr)>;

    /// First child element, if any.
    fn first_child(&self) -> Option<Self>;

    /// Next sibling element, if any.
    fn next_sibling(&self) -> Option<Self>;
}

/// Collect the child elements of a node in document order.
pub fn child_elements<N: TreeNode>(node: &N) -> Vec<N> {
    let mut result = Vec::new();
    let mut child = node.first_child();
    while let Some(c) = child {
        child = c.next_sibling();
        result.push(c);
    }
    result
}

/// True if `node` has a direct child element with the given local name.
pub fn has_child_named<N: TreeNode>(node: &N, name: &str) -> bool {
    let mut child = node.first_child();
    while let Some(c) = child {
        if c.local_name() == name {
            return true;
        }
        child = c.next_sibling();
    }
    false
}

/// Errors reading an XML document into the element tree.
#[derive(Debug, Error)]
pub enum DomError {
    /// XML is not well formed.
    #[error("XML error: {0}")]
    Xml(String),

    /// The document contains no root element.
    #[error("missing root element")]
    NoRootElement,
}

// ============================================================================
// ELEMENT STORAGE
// ============================================================================

#[derive(Debug)]
struct RawElement {
    local_name: SmolStr,
    attrs: IndexMap<SmolStr, SmolStr>,
    first_child: Option<usize>,
    next_sibling: Option<usize>,
}

#[derive(Debug)]
struct DocInner {
    elements: Vec<RawElement>,
    root: usize,
}

/// An element-only XML document.
///
/// Elements are stored in a flat arena; [`XmlElement`] handles index into
/// it and share the arena via `Rc`, so handles are cheap to clone.
#[derive(Clone, Debug)]
pub struct XmlDocument {
    inner: Rc<DocInner>,
}

/// Handle to one element of an [`XmlDocument`].
#[derive(Clone, Debug)]
pub struct XmlElement {
    inner: Rc<DocInner>,
    index: usize,
}

impl XmlDocument {
    /// Read a document from XML text.
    pub fn parse(text: &str) -> Result<Self, DomError> {
        use quick_xml::Reader;
        use quick_xml::events::{BytesStart, Event};

        let mut elements: Vec<RawElement> = Vec::new();
        // (element index, index of its last seen child) per open element
        let mut stack: Vec<(usize, Option<usize>)> = Vec::new();
        let mut root: Option<usize> = None;

        let push_element = |e: &BytesStart<'_>,
                            elements: &mut Vec<RawElement>,
                            stack: &mut Vec<(usize, Option<usize>)>,
                            root: &mut Option<usize>|
         -> Result<usize, DomError> {
            let name_qname = e.name();
            let name = std::str::from_utf8(name_qname.as_ref())
                .map_err(|err| DomError::Xml(format!("invalid tag name: {err}")))?;
            let local = name.rsplit(':').next().unwrap_or(name);

            let mut attrs = IndexMap::new();
            for attr_result in e.attributes() {
                let attr =
                    attr_result.map_err(|err| DomError::Xml(format!("attribute error: {err}")))?;
                let key = std::str::from_utf8(attr.key.as_ref())
                    .map_err(|err| DomError::Xml(format!("attribute key error: {err}")))?;
                let value = attr
                    .unescape_value()
                    .map_err(|err| DomError::Xml(format!("attribute value error: {err}")))?;
                attrs.insert(SmolStr::from(key), SmolStr::from(value.as_ref()));
            }

            let index = elements.len();
            elements.push(RawElement {
                local_name: SmolStr::from(local),
                attrs,
                first_child: None,
                next_sibling: None,
            });

            match stack.last_mut() {
                Some((parent, last_child)) => {
                    match last_child {
                        Some(prev) => elements[*prev].next_sibling = Some(index),
                        None => elements[*parent].first_child = Some(index),
                    }
                    *last_child = Some(index);
                }
                None => {
                    if root.is_none() {
                        *root = Some(index);
                    }
                }
            }
            Ok(index)
        };

        let mut reader = Reader::from_str(text);
        reader.config_mut().trim_text(true);

        loop {
            match reader.read_event() {
                Ok(Event::Start(ref e)) => {
                    let index = push_element(e, &mut elements, &mut stack, &mut root)?;
                    stack.push((index, None));
                }
                Ok(Event::Empty(ref e)) => {
                    push_element(e, &mut elements, &mut stack, &mut root)?;
                }
                Ok(Event::End(_)) => {
                    stack.pop();
                }
                Ok(Event::Eof) => break,
                Err(e) => {
                    return Err(DomError::Xml(format!(
                        "XML parse error at position {}: {e}",
                        reader.error_position()
                    )));
                }
                // Text, comments, declarations, processing instructions
                Ok(_) => {}
            }
        }

        let root = root.ok_or(DomError::NoRootElement)?;
        Ok(Self {
            inner: Rc::new(DocInner { elements, root }),
        })
    }

    /// The document's root element.
    pub fn root(&self) -> XmlElement {
        XmlElement {
            inner: Rc::clone(&self.inner),
            index: self.inner.root,
        }
    }
}

impl XmlElement {
    fn raw(&self) -> &RawElement {
        &self.inner.elements[self.index]
    }

    fn handle(&self, index: usize) -> XmlElement {
        XmlElement {
            inner: Rc::clone(&self.inner),
            index,
        }
    }
}

impl TreeNode for XmlElement {
    fn local_name(&self) -> &str {
        &self.raw().local_name
    }

    fn attribute(&self, name: &str) -> Option<&str> {
        self.raw().attrs.get(name).map(|v| v.as_str())
    }

    fn attributes(&self) -> Vec<(SmolStr, SmolStr)> {
        self.raw()
            .attrs
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }

    fn first_child(&self) -> Option<Self> {
        self.raw().first_child.map(|i| self.handle(i))
    }

    fn next_sibling(&self) -> Option<Self> {
        self.raw().next_sibling.map(|i| self.handle(i))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOC: &str = r#"
        <xs:schema xmlns:xs="http://www.w3.org/2001/XMLSchema" targetNamespace="urn:demo">
            <!-- a comment between elements -->
            <xs:element name="first" type="xs:string"/>
            some stray text
            <xs:complexType name="Second">
                <xs:sequence>
                    <xs:element name="inner" type="xs:int"/>
                </xs:sequence>
            </xs:complexType>
        </xs:schema>"#;

    #[test]
    fn test_reads_elements_only() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let root = doc.root();
        assert_eq!(root.local_name(), "schema");
        assert_eq!(root.attribute("targetNamespace"), Some("urn:demo"));

        let children = child_elements(&root);
        let names: Vec<&str> = children.iter().map(|c| c.local_name()).collect();
        // comments and text never materialize
        assert_eq!(names, vec!["element", "complexType"]);
    }

    #[test]
    fn test_nested_navigation() {
        let doc = XmlDocument::parse(DOC).unwrap();
        let root = doc.root();
        let complex = root.first_child().unwrap().next_sibling().unwrap();
        assert_eq!(complex.attribute("name"), Some("Second"));
        assert!(has_child_named(&complex, "sequence"));
        let seq = complex.first_child().unwrap();
        let inner = seq.first_child().unwrap();
        assert_eq!(inner.attribute("name"), Some("inner"));
        assert!(inner.next_sibling().is_none());
    }

    #[test]
    fn test_malformed_input() {
        assert!(matches!(
            XmlDocument::parse("<a><b></a>"),
            Err(DomError::Xml(_))
        ));
        assert!(matches!(
            XmlDocument::parse("   "),
            Err(DomError::NoRootElement)
        ));
    }
}
