//! XML to JSON conversion for provider and appliance responses.
//!
//! Conversion follows the usual attribute/text conventions: attributes become `@name` keys,
//! mixed text becomes `#text`, repeated children become arrays and empty elements `null`.
//! [`normalize_sets`] then collapses the `item`/`member` list wrappers used by the EC2 query
//! API, the ELBv2 query API and PAN-OS configuration documents.

use netscout_core::Record;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::CollectorError;

static SET_WRAPPERS: [&str; 2] = ["item", "member"];

#[derive(Debug, Default)]
struct Element {
    name: String,
    attributes: Map<String, Value>,
    children: Map<String, Value>,
    text: String,
}

impl Element {
    fn open(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Map::new();
        for attribute in start.attributes().flatten() {
            let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
            let raw = String::from_utf8_lossy(&attribute.value).into_owned();
            attributes.insert(format!("@{key}"), Value::String(unescape_or_raw(&raw)));
        }
        Self { name, attributes, ..Self::default() }
    }

    fn push_child(&mut self, name: String, value: Value) {
        match self.children.get_mut(&name) {
            Some(Value::Array(existing)) => existing.push(value),
            Some(existing) => {
                let first = existing.take();
                *existing = Value::Array(vec![first, value]);
            }
            None => {
                self.children.insert(name, value);
            }
        }
    }

    fn close(self) -> (String, Value) {
        let text = self.text.trim().to_string();
        if self.attributes.is_empty() && self.children.is_empty() {
            let value = if text.is_empty() { Value::Null } else { Value::String(text) };
            return (self.name, value);
        }

        let mut object = self.attributes;
        for (key, value) in self.children {
            object.insert(key, value);
        }
        if !text.is_empty() {
            object.insert("#text".to_string(), Value::String(text));
        }
        (self.name, Value::Object(object))
    }
}

fn unescape_or_raw(raw: &str) -> String {
    quick_xml::escape::unescape(raw).map(|value| value.into_owned()).unwrap_or_else(|_| raw.to_string())
}

/// Parses a whole document into `{ root_name: value }`.
pub fn to_value(xml: &str) -> Result<Value, CollectorError> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    loop {
        let event = reader.read_event().map_err(|error| {
            CollectorError::Parse(format!(
                "malformed XML at byte {}: {error}",
                reader.error_position()
            ))
        })?;

        match event {
            Event::Start(start) => stack.push(Element::open(&start)),
            Event::Empty(start) => {
                let (name, value) = Element::open(&start).close();
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::End(_) => {
                let Some(element) = stack.pop() else {
                    return Err(CollectorError::Parse("unexpected closing tag".to_string()));
                };
                let (name, value) = element.close();
                attach(&mut stack, &mut root, name, value)?;
            }
            Event::Text(text) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&unescape_or_raw(&String::from_utf8_lossy(&text)));
                }
            }
            Event::CData(data) => {
                if let Some(current) = stack.last_mut() {
                    current.text.push_str(&String::from_utf8_lossy(&data));
                }
            }
            Event::GeneralRef(reference) => {
                if let Some(current) = stack.last_mut() {
                    let entity = format!("&{};", String::from_utf8_lossy(&reference));
                    current.text.push_str(&unescape_or_raw(&entity));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if !stack.is_empty() {
        return Err(CollectorError::Parse("document ended before all elements closed".to_string()));
    }

    let Some((name, value)) = root else {
        return Err(CollectorError::Parse("document has no root element".to_string()));
    };
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<(String, Value)>,
    name: String,
    value: Value,
) -> Result<(), CollectorError> {
    if let Some(parent) = stack.last_mut() {
        parent.push_child(name, value);
        return Ok(());
    }
    if root.is_some() {
        return Err(CollectorError::Parse("document has more than one root element".to_string()));
    }
    *root = Some((name, value));
    Ok(())
}

/// Collapses `{"item": ...}` and `{"member": ...}` wrappers into arrays, recursively.
pub fn normalize_sets(value: Value) -> Value {
    match value {
        Value::Object(mut object) => {
            if object.len() == 1 {
                let wrapper = SET_WRAPPERS.iter().find(|key| object.contains_key(**key));
                if let Some(key) = wrapper {
                    let inner = object.remove(*key).unwrap_or(Value::Null);
                    return match inner {
                        Value::Array(items) => {
                            Value::Array(items.into_iter().map(normalize_sets).collect())
                        }
                        Value::Null => Value::Array(Vec::new()),
                        single => Value::Array(vec![normalize_sets(single)]),
                    };
                }
            }
            Value::Object(
                object.into_iter().map(|(key, value)| (key, normalize_sets(value))).collect(),
            )
        }
        Value::Array(items) => Value::Array(items.into_iter().map(normalize_sets).collect()),
        other => other,
    }
}

pub fn path<'a>(value: &'a Value, segments: &[&str]) -> Option<&'a Value> {
    segments.iter().try_fold(value, |current, segment| current.get(*segment))
}

/// Turns a list-ish value into records: objects pass through, scalars are wrapped as
/// `{"value": ...}`, a single object becomes a one-element list and `null` an empty one.
pub fn into_records(value: Value) -> Vec<Record> {
    match value {
        Value::Null => Vec::new(),
        Value::Array(items) => items.into_iter().filter(|item| !item.is_null()).map(into_record).collect(),
        single => vec![into_record(single)],
    }
}

fn into_record(value: Value) -> Record {
    match value {
        Value::Object(object) => object,
        other => {
            let mut record = Map::new();
            record.insert("value".to_string(), other);
            record
        }
    }
}

/// Concatenated text content of a message-like node such as PAN-OS `<msg><line>..</line></msg>`.
pub fn text_content(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        Value::Array(items) => {
            items.iter().map(text_content).filter(|text| !text.is_empty()).collect::<Vec<_>>().join("; ")
        }
        Value::Object(object) => object
            .iter()
            .filter(|(key, _)| !key.starts_with('@'))
            .map(|(_, value)| text_content(value))
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join("; "),
        _ => String::new(),
    }
}
