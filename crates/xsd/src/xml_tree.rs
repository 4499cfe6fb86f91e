//! Owned XML element tree read with `quick-xml`.
//!
//! Both schema documents and instance documents are small, so they are read
//! fully into memory before any structural interpretation happens.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum XmlTreeError {
    #[error("{0}")]
    Xml(#[from] quick_xml::Error),

    #[error("invalid UTF-8: {0}")]
    Utf8(#[from] std::str::Utf8Error),

    #[error("document has no root element")]
    NoRoot,

    #[error("document has more than one root element")]
    MultipleRoots,

    #[error("text content outside of the root element")]
    TextOutsideRoot,

    #[error("unexpected end of document inside element '{0}'")]
    UnexpectedEof(String),
}

/// A parsed element with its attributes, child elements and direct text.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlElement {
    /// Raw (possibly prefixed) element name
    pub name: String,
    /// Raw attribute names with unescaped values, in document order
    pub attributes: Vec<(String, String)>,
    pub children: Vec<XmlElement>,
    /// Concatenation of all direct text and CDATA nodes
    pub text: String,
}

impl XmlElement {
    /// Parse a complete document into its root element.
    pub fn parse(xml: &str) -> Result<Self, XmlTreeError> {
        let mut reader = Reader::from_str(xml);
        let mut stack: Vec<XmlElement> = Vec::new();
        let mut root: Option<XmlElement> = None;

        loop {
            match reader.read_event()? {
                Event::Start(start) => {
                    if root.is_some() {
                        return Err(XmlTreeError::MultipleRoots);
                    }
                    stack.push(Self::from_start(&start)?);
                }
                Event::Empty(start) => {
                    if root.is_some() {
                        return Err(XmlTreeError::MultipleRoots);
                    }
                    let element = Self::from_start(&start)?;
                    close_element(element, &mut stack, &mut root);
                }
                Event::End(_) => match stack.pop() {
                    Some(element) => close_element(element, &mut stack, &mut root),
                    None => return Err(XmlTreeError::NoRoot),
                },
                Event::Text(text) => {
                    let text = text.unescape()?;
                    match stack.last_mut() {
                        Some(current) => current.text.push_str(&text),
                        None if text.trim().is_empty() => {}
                        None => return Err(XmlTreeError::TextOutsideRoot),
                    }
                }
                Event::CData(data) => match stack.last_mut() {
                    Some(current) => current.text.push_str(std::str::from_utf8(&data)?),
                    None => return Err(XmlTreeError::TextOutsideRoot),
                },
                Event::Eof => break,
                // declarations, comments, processing instructions, doctype
                _ => {}
            }
        }

        if let Some(open) = stack.pop() {
            return Err(XmlTreeError::UnexpectedEof(open.name));
        }
        root.ok_or(XmlTreeError::NoRoot)
    }

    fn from_start(start: &BytesStart<'_>) -> Result<Self, XmlTreeError> {
        let name = std::str::from_utf8(start.name().as_ref())?.to_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = std::str::from_utf8(attr.key.as_ref())?.to_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
            text: String::new(),
        })
    }

    /// Element name without its namespace prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }

    /// Namespace prefix of the element name, if any.
    pub fn prefix(&self) -> Option<&str> {
        self.name.split_once(':').map(|(prefix, _)| prefix)
    }

    /// Look up an attribute by its exact (raw) name.
    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Namespace declarations made on this element, as `(prefix, uri)` pairs.
    ///
    /// The default namespace is reported with an empty prefix.
    pub fn namespace_declarations(&self) -> impl Iterator<Item = (&str, &str)> {
        self.attributes.iter().filter_map(|(key, value)| {
            if key == "xmlns" {
                Some(("", value.as_str()))
            } else {
                key.strip_prefix("xmlns:")
                    .map(|prefix| (prefix, value.as_str()))
            }
        })
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }
}

fn close_element(element: XmlElement, stack: &mut Vec<XmlElement>, root: &mut Option<XmlElement>) {
    match stack.last_mut() {
        Some(parent) => parent.children.push(element),
        None => *root = Some(element),
    }
}

/// Strip a namespace prefix from a raw XML name.
pub fn local_part(name: &str) -> &str {
    name.rsplit_once(':').map(|(_, local)| local).unwrap_or(name)
}

/// Whether a raw attribute name is a namespace declaration.
pub fn is_namespace_declaration(name: &str) -> bool {
    name == "xmlns" || name.starts_with("xmlns:")
}
