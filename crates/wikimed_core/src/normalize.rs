//! Upstream response normalization.
//!
//! WikiMed answers either with XML documents or with short plain-text bodies.
//! XML is converted to JSON using the xmltodict layout that agent prompts were
//! written against:
//!
//! - element names become keys, in document order
//! - attributes become `@name` keys
//! - text alongside attributes or children becomes `#text`
//! - text-only elements become strings, empty elements become `null`
//! - repeated sibling elements collapse into an array

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};
use thiserror::Error;

const ATTRIBUTE_PREFIX: char = '@';
const TEXT_KEY: &str = "#text";

/// Message used for the `error` field when XML conversion fails.
pub const XML_PARSE_FAILURE: &str = "Failed to parse XML response";

#[derive(Error, Debug)]
pub enum XmlError {
    #[error("XML syntax error: {0}")]
    Syntax(#[from] quick_xml::Error),

    #[error("malformed document: {0}")]
    Structure(&'static str),
}

/// Whether a response should go through XML conversion.
pub fn looks_like_xml(content_type: Option<&str>, body: &str) -> bool {
    let declared = content_type
        .map(|ct| ct.to_ascii_lowercase().contains("xml"))
        .unwrap_or(false);
    declared || body.trim().starts_with('<')
}

struct Element {
    name: String,
    attributes: Vec<(String, String)>,
    children: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Result<Self, XmlError> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Vec::new();
        for attr in start.attributes() {
            let attr = attr.map_err(quick_xml::Error::from)?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr.unescape_value()?.into_owned();
            attributes.push((key, value));
        }

        Ok(Self {
            name,
            attributes,
            children: Map::new(),
            text: String::new(),
        })
    }

    fn into_value(self) -> Value {
        let text = self.text.trim();

        if self.attributes.is_empty() && self.children.is_empty() {
            return if text.is_empty() {
                Value::Null
            } else {
                Value::String(text.to_string())
            };
        }

        let mut map = Map::new();
        for (key, value) in self.attributes {
            map.insert(format!("{ATTRIBUTE_PREFIX}{key}"), Value::String(value));
        }
        for (key, value) in self.children {
            map.insert(key, value);
        }
        if !text.is_empty() {
            map.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }
        Value::Object(map)
    }
}

fn push_child(children: &mut Map<String, Value>, name: String, value: Value) {
    match children.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            children.insert(name, value);
        }
    }
}

/// Attach a finished element to its parent, or record it as the document root.
fn close_element(
    element: Element,
    stack: &mut [Element],
    root: &mut Option<(String, Value)>,
) -> Result<(), XmlError> {
    let name = element.name.clone();
    let value = element.into_value();
    match stack.last_mut() {
        Some(parent) => push_child(&mut parent.children, name, value),
        None if root.is_some() => {
            return Err(XmlError::Structure("more than one root element"));
        }
        None => *root = Some((name, value)),
    }
    Ok(())
}

/// Parse an XML document into a JSON value keyed by the root element name.
pub fn xml_to_json(xml: &str) -> Result<Value, XmlError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        match reader.read_event()? {
            Event::Start(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::Structure("more than one root element"));
                }
                stack.push(Element::open(&start)?);
            }
            Event::Empty(start) => {
                if stack.is_empty() && root.is_some() {
                    return Err(XmlError::Structure("more than one root element"));
                }
                let element = Element::open(&start)?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or(XmlError::Structure("closing tag without an open element"))?;
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(text) => {
                let text = text.unescape()?;
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&text),
                    None if text.trim().is_empty() => {}
                    None => return Err(XmlError::Structure("text outside the root element")),
                }
            }
            Event::CData(data) => {
                let data = data.into_inner();
                let data = String::from_utf8_lossy(&data);
                match stack.last_mut() {
                    Some(current) => current.text.push_str(&data),
                    None => return Err(XmlError::Structure("CDATA outside the root element")),
                }
            }
            Event::Eof => break,
            // declaration, comments, processing instructions, doctype
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(XmlError::Structure("unclosed element at end of input"));
    }

    let (name, value) = root.ok_or(XmlError::Structure("no element found"))?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

/// Convert XML text to indented JSON text.
///
/// Never fails: a document that does not parse comes back as
/// `{"error": "Failed to parse XML response", "raw": <input>}`.
pub fn normalize(xml: &str) -> String {
    match xml_to_json(xml) {
        Ok(value) => to_pretty(&value),
        Err(e) => {
            tracing::error!("XML to JSON conversion failed: {}", e);
            serde_json::json!({ "error": XML_PARSE_FAILURE, "raw": xml }).to_string()
        }
    }
}

pub(crate) fn to_pretty(value: &Value) -> String {
    // Serializing a Value cannot fail; fall back to compact output regardless.
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
