//! Minimal element tree used for scraper definitions and scraper output.
//!
//! Only what the interpreter needs is modelled: element names, attributes,
//! text, and child order. Navigation mirrors the DOM helpers the rule format
//! was written against:
//!
//! - [`Element::first_child`] finds the first element child by tag name,
//!   ignoring ASCII case;
//! - [`Element::children_named`] walks that child and its following siblings
//!   with the same name;
//! - [`Element::attr`] / [`Element::text`] read attributes and direct text.

use crate::error::{Result, ScraperError};
use quick_xml::Reader;
use quick_xml::escape::{resolve_html5_entity, resolve_predefined_entity};
use quick_xml::events::{BytesStart, Event};
use std::borrow::Cow;

/// Name of the synthetic element returned by [`parse_document`].
pub const DOCUMENT: &str = "#document";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Element(Element),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Element {
    pub name: String,
    pub attributes: Vec<(String, String)>,
    pub children: Vec<Node>,
}

impl Element {
    pub fn new(name: impl Into<String>) -> Self {
        Element { name: name.into(), attributes: Vec::new(), children: Vec::new() }
    }

    /// Value of attribute `name`, if present.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes.iter().find(|(k, _)| k == name).map(|(_, v)| v.as_str())
    }

    /// Value of attribute `name`, or `""` when absent.
    pub fn attr_or_empty(&self, name: &str) -> &str {
        self.attr(name).unwrap_or("")
    }

    pub fn has_attr(&self, name: &str) -> bool {
        self.attr(name).is_some()
    }

    /// Element children in document order.
    pub fn elements(&self) -> impl Iterator<Item = &Element> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// First element child whose tag equals `name` (ASCII case-insensitive).
    pub fn first_child(&self, name: &str) -> Option<&Element> {
        self.elements().find(|e| e.name.eq_ignore_ascii_case(name))
    }

    /// The first child named `name` followed by its siblings of the same name.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.elements().filter(move |e| e.name.eq_ignore_ascii_case(name))
    }

    /// Concatenated direct text content (CDATA included, nested elements skipped).
    pub fn text(&self) -> String {
        self.children
            .iter()
            .filter_map(|n| match n {
                Node::Text(t) => Some(t.as_str()),
                Node::Element(_) => None,
            })
            .collect()
    }

    /// Text of the first child named `name`, when that child has any text.
    pub fn child_text(&self, name: &str) -> Option<String> {
        self.first_child(name).map(Element::text).filter(|t| !t.is_empty())
    }

    /// Serialise back to markup. Used to hand sub-trees to code that expects
    /// an XML string (url descriptors, custom function payloads).
    pub fn to_xml(&self) -> String {
        let mut out = String::new();
        self.write_xml(&mut out);
        out
    }

    fn write_xml(&self, out: &mut String) {
        out.push('<');
        out.push_str(&self.name);
        for (k, v) in &self.attributes {
            out.push(' ');
            out.push_str(k);
            out.push_str("=\"");
            out.push_str(&escape(v));
            out.push('"');
        }
        if self.children.is_empty() {
            out.push_str("/>");
            return;
        }
        out.push('>');
        for child in &self.children {
            match child {
                Node::Element(e) => e.write_xml(out),
                Node::Text(t) => out.push_str(&escape(t)),
            }
        }
        out.push_str("</");
        out.push_str(&self.name);
        out.push('>');
    }
}

fn escape(text: &str) -> String {
    quick_xml::escape::escape(text).into_owned()
}

/// Parse `xml` into a tree rooted at a synthetic [`DOCUMENT`] element.
pub fn parse_document(xml: &str) -> Result<Element> {
    let mut reader = Reader::from_str(xml);
    reader.config_mut().expand_empty_elements = true;

    let mut stack: Vec<Element> = vec![Element::new(DOCUMENT)];

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ScraperError::Xml(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(start) => stack.push(open_element(&start)?),
            Event::End(_) => {
                let done = stack.pop().ok_or_else(|| ScraperError::Xml("unbalanced end tag".to_string()))?;
                let parent = stack.last_mut().ok_or_else(|| ScraperError::Xml("unbalanced end tag".to_string()))?;
                parent.children.push(Node::Element(done));
            }
            Event::Text(text) => {
                let value = text
                    .unescape_with(resolve_entity)
                    .map(Cow::into_owned)
                    .unwrap_or_else(|_| unescape_lenient(&String::from_utf8_lossy(&text)));
                push_text(&mut stack, value);
            }
            Event::CData(data) => push_text(&mut stack, String::from_utf8_lossy(&data).into_owned()),
            Event::Eof => break,
            _ => {}
        }
    }

    if stack.len() != 1 {
        return Err(ScraperError::Xml("unexpected end of document".to_string()));
    }
    let document = stack.pop().unwrap_or_else(|| Element::new(DOCUMENT));
    if document.elements().next().is_none() {
        return Err(ScraperError::Xml("document has no root element".to_string()));
    }
    Ok(document)
}

/// Parse `xml` and return its root element.
pub fn parse_root(xml: &str) -> Result<Element> {
    let document = parse_document(xml)?;
    document
        .children
        .into_iter()
        .find_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
        .ok_or_else(|| ScraperError::Xml("document has no root element".to_string()))
}

fn open_element(start: &BytesStart<'_>) -> Result<Element> {
    let mut element = Element::new(String::from_utf8_lossy(start.name().as_ref()).into_owned());
    for attr in start.attributes() {
        let attr = attr.map_err(|e| ScraperError::Xml(e.to_string()))?;
        let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
        let value = attr
            .unescape_value_with(resolve_entity)
            .map(Cow::into_owned)
            .unwrap_or_else(|_| unescape_lenient(&String::from_utf8_lossy(&attr.value)));
        element.attributes.push((key, value));
    }
    Ok(element)
}

// Scraper output routinely carries HTML entities XML does not define.
fn resolve_entity(name: &str) -> Option<&'static str> {
    resolve_predefined_entity(name).or_else(|| resolve_html5_entity(name))
}

/// Decode each reference on its own; ones nobody knows stay as written.
fn unescape_lenient(raw: &str) -> String {
    regex!(r"&(#[xX][0-9a-fA-F]+|#[0-9]+|[A-Za-z][A-Za-z0-9]*);")
        .replace_all(raw, |caps: &regex::Captures<'_>| {
            let name = &caps[1];
            let decoded = match name.strip_prefix('#') {
                Some(number) => char_reference(number).map(String::from),
                None => resolve_entity(name).map(str::to_string),
            };
            decoded.unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn char_reference(number: &str) -> Option<char> {
    let code = match number.strip_prefix(['x', 'X']) {
        Some(hex) => u32::from_str_radix(hex, 16).ok()?,
        None => number.parse().ok()?,
    };
    char::from_u32(code)
}

fn push_text(stack: &mut [Element], value: String) {
    if let Some(parent) = stack.last_mut() {
        // Merge adjacent text/CDATA runs so `text()` sees one string.
        if let Some(Node::Text(prev)) = parent.children.last_mut() {
            prev.push_str(&value);
        } else {
            parent.children.push(Node::Text(value));
        }
    }
}
