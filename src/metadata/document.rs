//! An owned element tree for the extended metadata XML.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};

use crate::error::MetadataViolation;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Content {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Content>,
}

impl Element {
    fn from_start(start: &BytesStart<'_>) -> Result<Self, MetadataViolation> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attribute in start.attributes() {
            let attribute = attribute.map_err(malformed)?;
            attributes.push(Attribute {
                name: String::from_utf8_lossy(attribute.key.as_ref()).into_owned(),
                value: attribute.unescape_value().map_err(malformed)?.into_owned(),
            });
        }
        Ok(Self {
            name,
            attributes,
            children: Vec::new(),
        })
    }

    pub fn attribute(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(|attribute| attribute.value.as_str())
    }

    /// Child elements, skipping text
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|child| match child {
            Content::Element(element) => Some(element),
            Content::Text(_) => None,
        })
    }

    /// All text directly inside this element, concatenated
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|child| match child {
                Content::Text(text) => Some(text.as_str()),
                Content::Element(_) => None,
            })
            .collect()
    }

    fn push_text(&mut self, text: &str) {
        match self.children.last_mut() {
            Some(Content::Text(existing)) => existing.push_str(text),
            _ => self.children.push(Content::Text(text.to_owned())),
        }
    }
}

/// A parsed metadata document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetadataDocument {
    encoding: Option<String>,
    root: Element,
}

impl MetadataDocument {
    /// Parse a well-formed XML document with a single root element.
    pub fn parse(text: &str) -> Result<Self, MetadataViolation> {
        let mut reader = Reader::from_str(text);
        let mut encoding = None;
        let mut root: Option<Element> = None;
        let mut open: Vec<Element> = Vec::new();

        loop {
            let event = reader.read_event().map_err(|err| {
                MetadataViolation::MalformedXml(format!(
                    "{err} at byte {}",
                    reader.error_position()
                ))
            })?;
            match event {
                Event::Decl(decl) => {
                    if let Some(declared) = decl.encoding() {
                        let declared = declared.map_err(malformed)?;
                        encoding = Some(String::from_utf8_lossy(&declared).into_owned());
                    }
                }
                Event::Start(start) => open.push(Element::from_start(&start)?),
                Event::Empty(start) => {
                    let element = Element::from_start(&start)?;
                    attach(&mut open, &mut root, element)?;
                }
                Event::End(_) => {
                    let Some(element) = open.pop() else {
                        return Err(MetadataViolation::MalformedXml(
                            "unmatched closing tag".to_owned(),
                        ));
                    };
                    attach(&mut open, &mut root, element)?;
                }
                Event::Text(text) => {
                    let text = text.unescape().map_err(malformed)?;
                    add_text(&mut open, &text)?;
                }
                Event::CData(data) => {
                    let data = data.into_inner();
                    add_text(&mut open, &String::from_utf8_lossy(&data))?;
                }
                Event::Eof => break,
                // comments, processing instructions and doctype
                _ => {}
            }
        }

        if let Some(element) = open.last() {
            return Err(MetadataViolation::MalformedXml(format!(
                "element <{}> is never closed",
                element.name
            )));
        }
        let Some(root) = root else {
            return Err(MetadataViolation::MalformedXml(
                "document has no root element".to_owned(),
            ));
        };

        Ok(Self { encoding, root })
    }

    /// The `encoding` declared in the XML declaration, if any
    pub fn encoding(&self) -> Option<&str> {
        self.encoding.as_deref()
    }

    pub fn root(&self) -> &Element {
        &self.root
    }
}

fn malformed(err: impl std::fmt::Display) -> MetadataViolation {
    MetadataViolation::MalformedXml(err.to_string())
}

fn attach(
    open: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), MetadataViolation> {
    match open.last_mut() {
        Some(parent) => parent.children.push(Content::Element(element)),
        None if root.is_none() => *root = Some(element),
        None => {
            return Err(MetadataViolation::MalformedXml(format!(
                "second root element <{}>",
                element.name
            )));
        }
    }
    Ok(())
}

fn add_text(open: &mut [Element], text: &str) -> Result<(), MetadataViolation> {
    match open.last_mut() {
        Some(parent) => parent.push_text(text),
        None if text.trim().is_empty() => {}
        None => {
            return Err(MetadataViolation::MalformedXml(
                "text outside the root element".to_owned(),
            ));
        }
    }
    Ok(())
}
