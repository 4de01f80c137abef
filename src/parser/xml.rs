use anyhow::{anyhow, bail, Result};
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;
use serde_json::{Map, Value};

/// Key under which an element's attributes are collected.
pub const ATTRIBUTES_KEY: &str = "@attributes";
/// Key for the text of an element that also has attributes or children.
pub const TEXT_KEY: &str = "#text";

/// Element being assembled while its children are read.
#[derive(Debug)]
struct Node {
    name: String,
    attributes: Map<String, Value>,
    children: Vec<(String, Value)>,
    text: String,
}

impl Node {
    fn open(start: &BytesStart) -> Result<Self> {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attributes = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| anyhow!("bad attribute on <{}>: {}", name, e))?;
            let key = String::from_utf8_lossy(attr.key.as_ref()).into_owned();
            let value = attr
                .unescape_value()
                .map_err(|e| anyhow!("bad attribute value on <{}>: {}", name, e))?;
            attributes.insert(key, Value::String(value.into_owned()));
        }
        Ok(Self { name, attributes, children: Vec::new(), text: String::new() })
    }

    /// Text-only elements become strings and empty ones `null`; repeated children become arrays.
    fn into_value(self) -> Value {
        let text = self.text.trim();
        if self.children.is_empty() && self.attributes.is_empty() {
            return match text.is_empty() {
                true => Value::Null,
                false => Value::String(text.to_owned()),
            };
        }

        let mut object = Map::new();
        if !self.attributes.is_empty() {
            object.insert(ATTRIBUTES_KEY.to_owned(), Value::Object(self.attributes));
        }
        if !text.is_empty() {
            object.insert(TEXT_KEY.to_owned(), Value::String(text.to_owned()));
        }
        for (name, value) in self.children {
            match object.get_mut(&name) {
                Some(Value::Array(items)) => items.push(value),
                Some(existing) => {
                    let first = existing.take();
                    *existing = Value::Array(vec![first, value]);
                }
                None => {
                    object.insert(name, value);
                }
            }
        }
        Value::Object(object)
    }
}

/// Converts an XML document into structured data, returning the root element's content.
pub fn xml_to_value(xml: &str) -> Result<Value> {
    let mut reader = Reader::from_str(xml);
    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<Value> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Node::open(&e)?),
            Ok(Event::Empty(e)) => {
                let node = Node::open(&e)?;
                close(node, &mut stack, &mut root)?;
            }
            Ok(Event::End(_)) => {
                let node = stack.pop().ok_or_else(|| anyhow!("unexpected closing tag"))?;
                close(node, &mut stack, &mut root)?;
            }
            Ok(Event::Text(t)) => {
                if let Some(node) = stack.last_mut() {
                    let text = t.decode().map_err(|e| anyhow!("bad text in <{}>: {}", node.name, e))?;
                    node.text.push_str(&text);
                }
            }
            Ok(Event::CData(c)) => {
                if let Some(node) = stack.last_mut() {
                    node.text.push_str(&String::from_utf8_lossy(&c.into_inner()));
                }
            }
            Ok(Event::GeneralRef(r)) => {
                if let Some(node) = stack.last_mut() {
                    match r.resolve_char_ref().map_err(|e| anyhow!("bad reference: {}", e))? {
                        Some(ch) => node.text.push(ch),
                        None => {
                            let name = r.decode().map_err(|e| anyhow!("bad reference: {}", e))?;
                            let resolved = resolve_predefined_entity(&name)
                                .ok_or_else(|| anyhow!("unknown entity &{};", name))?;
                            node.text.push_str(resolved);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => bail!("malformed XML at position {}: {}", reader.error_position(), e),
            _ => (), // declarations, comments, processing instructions
        }
    }

    if let Some(open) = stack.last() {
        bail!("unclosed element <{}>", open.name);
    }
    root.ok_or_else(|| anyhow!("document has no root element"))
}

fn close(node: Node, stack: &mut Vec<Node>, root: &mut Option<Value>) -> Result<()> {
    match stack.last_mut() {
        Some(parent) => {
            let name = node.name.to_owned();
            parent.children.push((name, node.into_value()));
        }
        None if root.is_none() => *root = Some(node.into_value()),
        None => bail!("more than one root element"),
    }
    Ok(())
}
