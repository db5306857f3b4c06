//! XML parser building an owned element tree

use crate::errors::{XmlError, XmlResult};
use crate::tree::{NamespaceDeclaration, XmlAttribute, XmlElement, XmlNode, split_qualified};
use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use std::collections::BTreeMap;
use tracing::trace;

type Scope = BTreeMap<String, String>;

/// Parse `input` into its root element, resolving every prefix against the
/// declarations in scope.
///
/// # Errors
///
/// Returns `XmlError::Parse` for malformed markup and `XmlError::Malformed`
/// for a document without exactly one root element.
pub fn parse_document(input: &str) -> XmlResult<XmlElement> {
    let mut reader = Reader::from_str(input);
    reader.config_mut().trim_text(false);

    let mut stack: Vec<XmlElement> = Vec::new();
    let mut scopes: Vec<Scope> = Vec::new();
    let mut root = None;

    loop {
        let event = reader
            .read_event()
            .map_err(|e| XmlError::parse(format!("at byte {}: {e}", reader.buffer_position())))?;
        match event {
            Event::Start(e) => {
                let element = open_element(&e, &mut scopes)?;
                stack.push(element);
            }
            Event::Empty(e) => {
                let element = open_element(&e, &mut scopes)?;
                scopes.pop();
                close_element(element, &mut stack, &mut root)?;
            }
            Event::End(_) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::malformed("closing tag without an open element"))?;
                scopes.pop();
                close_element(element, &mut stack, &mut root)?;
            }
            Event::Text(e) => {
                let text = e.unescape().map_err(|e| XmlError::parse(e.to_string()))?;
                if let Some(parent) = stack.last_mut() {
                    parent.children.push(XmlNode::Text(text.into_owned()));
                }
            }
            Event::CData(e) => {
                if let Some(parent) = stack.last_mut() {
                    parent
                        .children
                        .push(XmlNode::Text(String::from_utf8_lossy(&e).into_owned()));
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(XmlError::malformed(format!(
            "element <{}> is never closed",
            open.qualified_name()
        )));
    }
    root.ok_or_else(|| XmlError::malformed("document has no root element"))
}

fn open_element(start: &BytesStart<'_>, scopes: &mut Vec<Scope>) -> XmlResult<XmlElement> {
    let qualified = String::from_utf8_lossy(start.name().as_ref()).into_owned();
    let (prefix, name) = split_qualified(&qualified);
    let mut scope = scopes.last().cloned().unwrap_or_default();
    let mut element = XmlElement::new(name).with_prefix(prefix);

    let mut attributes = Vec::new();
    for attribute in start.attributes() {
        let attribute = attribute.map_err(|e| XmlError::parse(e.to_string()))?;
        let key = String::from_utf8_lossy(attribute.key.as_ref()).into_owned();
        let value = attribute
            .unescape_value()
            .map_err(|e| XmlError::parse(e.to_string()))?
            .into_owned();
        if key == "xmlns" {
            scope.insert(String::new(), value.clone());
            element.declarations.push(NamespaceDeclaration {
                prefix: None,
                uri: value,
            });
        } else if let Some(declared) = key.strip_prefix("xmlns:") {
            scope.insert(declared.to_string(), value.clone());
            element.declarations.push(NamespaceDeclaration {
                prefix: Some(declared.to_string()),
                uri: value,
            });
        } else {
            attributes.push((key, value));
        }
    }

    element.namespace = scope.get(prefix.unwrap_or_default()).cloned();
    for (key, value) in attributes {
        let (prefix, name) = split_qualified(&key);
        element.attributes.push(XmlAttribute {
            prefix: prefix.map(str::to_string),
            name: name.to_string(),
            namespace: prefix.and_then(|p| scope.get(p).cloned()),
            value,
        });
    }

    trace!(element = %qualified, namespace = ?element.namespace, "Opened XML element");
    scopes.push(scope);
    Ok(element)
}

fn close_element(
    mut element: XmlElement,
    stack: &mut [XmlElement],
    root: &mut Option<XmlElement>,
) -> XmlResult<()> {
    // Indentation between child elements is layout, not content.
    if element.has_child_elements() {
        element
            .children
            .retain(|child| !matches!(child, XmlNode::Text(text) if text.trim().is_empty()));
    }
    match stack.last_mut() {
        Some(parent) => {
            parent.push_element(element);
            Ok(())
        }
        None if root.is_none() => {
            *root = Some(element);
            Ok(())
        }
        None => Err(XmlError::malformed("more than one root element")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_nested_elements_and_attributes() {
        let root = parse_document(
            r#"<orders><order id="1"><total>10</total></order><order id="2"/></orders>"#,
        )
        .unwrap();
        assert_eq!(root.name, "orders");
        let orders: Vec<_> = root.elements().collect();
        assert_eq!(orders.len(), 2);
        assert_eq!(orders[0].attributes[0].value, "1");
        assert_eq!(orders[0].elements().next().unwrap().text(), "10");
        assert!(orders[1].children.is_empty());
    }

    #[test]
    fn test_parse_resolves_namespaces() {
        let root = parse_document(
            r#"<x:orders xmlns:x="urn:x" xmlns="urn:d"><order x:cost="5" cost="6"/></x:orders>"#,
        )
        .unwrap();
        assert_eq!(root.namespace.as_deref(), Some("urn:x"));
        assert_eq!(root.declarations.len(), 2);
        assert!(root.attributes.is_empty());

        let order = root.elements().next().unwrap();
        assert_eq!(order.namespace.as_deref(), Some("urn:d"));
        assert_eq!(order.attributes[0].namespace.as_deref(), Some("urn:x"));
        assert_eq!(order.attributes[1].namespace, None);
    }

    #[test]
    fn test_parse_unescapes_text_and_cdata() {
        let root = parse_document("<a>x &amp; y<![CDATA[<z>]]></a>").unwrap();
        assert_eq!(root.text(), "x & y<z>");
    }

    #[test]
    fn test_parse_keeps_text_whitespace() {
        let text = "<p>\n  <name>  Ozzie </name>\n  <blank> </blank>\n</p>";
        let root = parse_document(text).unwrap();
        assert_eq!(root.children.len(), 2);
        let children: Vec<_> = root.elements().collect();
        assert_eq!(children[0].text(), "  Ozzie ");
        assert_eq!(children[1].text(), " ");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        assert!(parse_document("<a><b></a>").is_err());
        assert!(parse_document("").is_err());
        assert!(parse_document("<a/><b/>").is_err());
    }
}
