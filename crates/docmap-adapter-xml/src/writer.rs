//! XML serialization

use crate::config::XmlConfig;
use crate::tree::{XmlElement, XmlNode};
use quick_xml::escape::escape;

const DECLARATION: &str = r#"<?xml version="1.0" encoding="UTF-8"?>"#;

/// Serialize `root` as a document.
#[must_use]
pub fn write_document(root: &XmlElement, config: &XmlConfig) -> String {
    let mut out = String::new();
    if config.declaration {
        out.push_str(DECLARATION);
        if config.indent.is_some() {
            out.push('\n');
        }
    }
    write_element(&mut out, root, config.indent, 0);
    out
}

fn write_element(out: &mut String, element: &XmlElement, indent: Option<usize>, depth: usize) {
    let name = element.qualified_name();
    out.push('<');
    out.push_str(&name);
    for declaration in &element.declarations {
        match &declaration.prefix {
            Some(prefix) => out.push_str(&format!(" xmlns:{prefix}=\"")),
            None => out.push_str(" xmlns=\""),
        }
        out.push_str(&escape(declaration.uri.as_str()));
        out.push('"');
    }
    for attribute in &element.attributes {
        out.push_str(&format!(
            " {}=\"{}\"",
            attribute.qualified_name(),
            escape(attribute.value.as_str())
        ));
    }
    if element.children.is_empty() {
        out.push_str("/>");
        return;
    }
    out.push('>');

    // Mixed content is written inline so text is not altered.
    let width = indent.filter(|_| element.children.iter().all(XmlNode::is_element));
    for child in &element.children {
        if let Some(width) = width {
            out.push('\n');
            out.push_str(&" ".repeat(width * (depth + 1)));
        }
        match child {
            XmlNode::Element(child) => write_element(out, child, indent, depth + 1),
            XmlNode::Text(text) => out.push_str(&escape(text.as_str())),
        }
    }
    if let Some(width) = width {
        out.push('\n');
        out.push_str(&" ".repeat(width * depth));
    }
    out.push_str("</");
    out.push_str(&name);
    out.push('>');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse_document;

    #[test]
    fn test_write_compact() {
        let text = r#"<orders><order id="a&amp;b"><total>1 &lt; 2</total></order></orders>"#;
        let root = parse_document(text).unwrap();
        assert_eq!(write_document(&root, &XmlConfig::default()), text);
    }

    #[test]
    fn test_write_indented_with_declaration() {
        let root = parse_document(r#"<a xmlns:x="urn:x"><x:b>1</x:b><c/></a>"#).unwrap();
        let config = XmlConfig::new().declaration(true).indent(2);
        assert_eq!(
            write_document(&root, &config),
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <a xmlns:x=\"urn:x\">\n  <x:b>1</x:b>\n  <c/>\n</a>"
        );
    }
}
