//! XML document adapter
//!
//! The first path segment names the root element. Prefixed segments match
//! on the namespace URI bound to the prefix, unprefixed elements match the
//! default namespace, and unprefixed attributes match only attributes
//! without a namespace.

use crate::config::XmlConfig;
use crate::parser::parse_document;
use crate::tree::{NamespaceDeclaration, XmlAttribute, XmlElement, XmlNode};
use crate::writer::write_document;
use docmap_model::{
    AdapterError, AdapterResult, CollectionType, DocumentAdapter, Field, FieldGroup, FieldNode,
    FieldType, Namespace, Path, PathSegment, Repetition, Scalar,
};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Adapter over a single XML document
#[derive(Debug, Clone)]
pub struct XmlAdapter {
    doc_id: String,
    config: XmlConfig,
    /// Prefix to URI; the empty prefix binds the default namespace
    namespaces: BTreeMap<String, String>,
    input: Option<String>,
    root: Option<XmlElement>,
    materialized: bool,
    output: Option<String>,
}

impl XmlAdapter {
    /// Create an adapter for `doc_id` with an empty document.
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            config: XmlConfig::default(),
            namespaces: BTreeMap::new(),
            input: None,
            root: None,
            materialized: false,
            output: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: XmlConfig) -> Self {
        self.config = config;
        self
    }

    /// Bind `prefix` to `uri`; an empty prefix binds the default namespace.
    #[must_use]
    pub fn with_namespace(mut self, prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        self.namespaces.insert(prefix.into(), uri.into());
        self
    }

    /// Bind every namespace in `namespaces`.
    #[must_use]
    pub fn with_namespaces<'a>(
        mut self,
        namespaces: impl IntoIterator<Item = &'a Namespace>,
    ) -> Self {
        for namespace in namespaces {
            self.namespaces
                .insert(namespace.prefix.clone(), namespace.uri.clone());
        }
        self
    }

    /// Seed the adapter with XML text, parsed before the first read or write.
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self.root = None;
        self.materialized = false;
        self
    }

    /// The root element, once materialized or written.
    #[must_use]
    pub fn root(&self) -> Option<&XmlElement> {
        self.root.as_ref()
    }

    fn materialize(&mut self) -> AdapterResult<()> {
        if self.materialized {
            return Ok(());
        }
        if let Some(text) = &self.input {
            let root = parse_document(text).map_err(|e| e.into_adapter_error(&self.doc_id))?;
            // Declarations in the document never override explicit bindings.
            let mut declared = Vec::new();
            root.walk(&mut |element| declared.extend(element.declarations.iter().cloned()));
            for declaration in declared {
                self.namespaces
                    .entry(declaration.prefix.unwrap_or_default())
                    .or_insert(declaration.uri);
            }
            debug!(
                doc_id = %self.doc_id,
                root = %root.qualified_name(),
                "Materialized XML document"
            );
            self.root = Some(root);
        }
        self.materialized = true;
        Ok(())
    }

    fn namespace_for(&self, prefix: Option<&str>) -> Option<&str> {
        self.namespaces
            .get(prefix.unwrap_or_default())
            .map(String::as_str)
    }

    fn element_matches(&self, element: &XmlElement, segment: &PathSegment) -> bool {
        if element.name != segment.name {
            return false;
        }
        match segment.namespace_prefix.as_deref() {
            Some(prefix) => match self.namespace_for(Some(prefix)) {
                Some(uri) => element.namespace.as_deref() == Some(uri),
                None => element.prefix.as_deref() == Some(prefix),
            },
            None => element.namespace.as_deref() == self.namespace_for(None),
        }
    }

    fn attribute_matches(&self, attribute: &XmlAttribute, segment: &PathSegment) -> bool {
        if attribute.name != segment.name {
            return false;
        }
        match segment.namespace_prefix.as_deref() {
            Some(prefix) => match self.namespace_for(Some(prefix)) {
                Some(uri) => attribute.namespace.as_deref() == Some(uri),
                None => attribute.prefix.as_deref() == Some(prefix),
            },
            None => attribute.namespace.is_none() && attribute.prefix.is_none(),
        }
    }

    fn new_element(&self, segment: &PathSegment) -> XmlElement {
        let prefix = segment.namespace_prefix.as_deref();
        XmlElement::new(segment.name.as_str())
            .with_prefix(prefix)
            .with_namespace(self.namespace_for(prefix))
    }

    fn new_attribute(&self, segment: &PathSegment, value: String) -> XmlAttribute {
        let prefix = segment.namespace_prefix.clone();
        XmlAttribute {
            namespace: prefix
                .as_deref()
                .and_then(|p| self.namespace_for(Some(p)))
                .map(str::to_string),
            prefix,
            name: segment.name.clone(),
            value,
        }
    }

    fn matching_children<'a>(
        &self,
        element: &'a XmlElement,
        segment: &PathSegment,
    ) -> Vec<&'a XmlElement> {
        element
            .elements()
            .filter(|child| self.element_matches(child, segment))
            .collect()
    }

    fn resolve(
        &self,
        element: &XmlElement,
        path: &Path,
        position: usize,
    ) -> AdapterResult<Option<FieldNode>> {
        let Some(segment) = path.segments().get(position) else {
            return Ok(Some(self.node_from_element(element, path)));
        };

        if segment.is_attribute {
            let value = element
                .attributes
                .iter()
                .find(|a| self.attribute_matches(a, segment))
                .map_or("", |a| a.value.as_str());
            return Ok(Some(
                Field::new(self.doc_id.as_str(), path.clone())
                    .with_value(value)
                    .into(),
            ));
        }

        let matches = self.matching_children(element, segment);
        match &segment.repetition {
            Repetition::None => match matches.first() {
                Some(child) => self.resolve(child, path, position + 1),
                None => Ok(None),
            },
            Repetition::Indexed(index) => match matches.get(*index as usize) {
                Some(child) => self.resolve(child, path, position + 1),
                None => Ok(None),
            },
            Repetition::Unindexed => {
                let mut group = FieldGroup::new(
                    Field::new(self.doc_id.as_str(), path.clone())
                        .with_type(FieldType::Complex)
                        .with_collection_type(CollectionType::List),
                );
                for (i, child) in matches.iter().enumerate() {
                    let index = u32::try_from(i).unwrap_or(u32::MAX);
                    let concrete = path.with_index(position, index);
                    if let Some(mut node) = self.resolve(child, &concrete, position + 1)? {
                        node.field_mut().index = Some(index);
                        group.push(node);
                    }
                }
                Ok(Some(group.into()))
            }
            Repetition::MapKeyed(_) => Err(AdapterError::unsupported(
                path,
                "XML elements cannot be keyed",
            )),
        }
    }

    fn node_from_element(&self, element: &XmlElement, path: &Path) -> FieldNode {
        if !element.has_child_elements() {
            return Field::new(self.doc_id.as_str(), path.clone())
                .with_value(element.text())
                .into();
        }

        let mut group = FieldGroup::new(
            Field::new(self.doc_id.as_str(), path.clone()).with_type(FieldType::Complex),
        );
        for attribute in &element.attributes {
            let mut segment = PathSegment::attribute(attribute.name.as_str());
            segment.namespace_prefix.clone_from(&attribute.prefix);
            if let Ok(child_path) = path.with_appended_segment(segment) {
                let field = Field::new(self.doc_id.as_str(), child_path);
                group.push(field.with_value(attribute.value.as_str()));
            }
        }

        let mut seen: BTreeMap<String, u32> = BTreeMap::new();
        for child in element.elements() {
            let qualified = child.qualified_name();
            let repeats = element
                .elements()
                .filter(|e| e.qualified_name() == qualified)
                .count()
                > 1;
            let mut segment = PathSegment::element(child.name.as_str());
            segment.namespace_prefix.clone_from(&child.prefix);
            if repeats {
                let next = seen.entry(qualified).or_insert(0);
                segment.repetition = Repetition::Indexed(*next);
                *next += 1;
            }
            if let Ok(child_path) = path.with_appended_segment(segment) {
                group.push(self.node_from_element(child, &child_path));
            }
        }
        group.into()
    }

    fn write_field(&mut self, path: &Path, value: Option<String>) -> AdapterResult<()> {
        let root_segment = path.root();
        if root_segment.is_attribute {
            return Err(AdapterError::unwritable(path, "the root must be an element"));
        }
        if matches!(root_segment.repetition, Repetition::Indexed(i) if i > 0) {
            return Err(AdapterError::unwritable(path, "a document has a single root"));
        }

        let mut root = match self.root.take() {
            Some(root) if self.element_matches(&root, root_segment) => root,
            Some(root) => {
                let found = root.qualified_name();
                self.root = Some(root);
                return Err(AdapterError::unwritable(
                    path,
                    format!("document root is <{found}>"),
                ));
            }
            None => self.new_element(root_segment),
        };
        let result = self.write_into(&mut root, path, 1, value);
        self.root = Some(root);
        result
    }

    fn write_into(
        &self,
        element: &mut XmlElement,
        path: &Path,
        position: usize,
        value: Option<String>,
    ) -> AdapterResult<()> {
        let Some(segment) = path.segments().get(position) else {
            trace!(element = %element.qualified_name(), "Writing XML text");
            element.set_text(value.as_deref());
            return Ok(());
        };

        if segment.is_attribute {
            if let Some(value) = value {
                trace!(attribute = %segment.qualified_name(), "Writing XML attribute");
                element.set_attribute(self.new_attribute(segment, value));
            }
            return Ok(());
        }

        let positions: Vec<usize> = element
            .children
            .iter()
            .enumerate()
            .filter_map(|(i, node)| match node {
                XmlNode::Element(child) if self.element_matches(child, segment) => {
                    Some(i)
                }
                _ => None,
            })
            .collect();

        let target = match &segment.repetition {
            Repetition::None => match positions.first() {
                Some(existing) => *existing,
                None => element.push_element(self.new_element(segment)),
            },
            Repetition::Indexed(index) => {
                let index = AdapterError::check_index(path, *index)?;
                match positions.get(index) {
                    Some(existing) => *existing,
                    None => {
                        let mut created = element.push_element(self.new_element(segment));
                        for _ in positions.len()..index {
                            created = element.push_element(self.new_element(segment));
                        }
                        created
                    }
                }
            }
            Repetition::Unindexed => element.push_element(self.new_element(segment)),
            Repetition::MapKeyed(_) => {
                return Err(AdapterError::unsupported(path, "XML elements cannot be keyed"));
            }
        };

        let child = element
            .element_at_mut(target)
            .ok_or_else(|| AdapterError::unwritable(path, "element vanished during write"))?;
        self.write_into(child, path, position + 1, value)
    }

    fn locate(&self, path: &Path, depth: usize) -> Option<&XmlElement> {
        let root = self.root.as_ref()?;
        if !self.element_matches(root, path.root()) {
            return None;
        }
        let mut current = root;
        for segment in &path.segments()[1..depth] {
            let matches = self.matching_children(current, segment);
            current = matches.get(segment.index().unwrap_or(0) as usize).copied()?;
        }
        Some(current)
    }

    fn stamp_declarations(&mut self) {
        let Some(root) = self.root.as_mut() else {
            return;
        };
        for (prefix, uri) in &self.namespaces {
            let prefix = (!prefix.is_empty()).then_some(prefix.as_str());
            if !root.declares(prefix) {
                root.declarations.push(NamespaceDeclaration {
                    prefix: prefix.map(str::to_string),
                    uri: uri.clone(),
                });
            }
        }
    }
}

impl DocumentAdapter for XmlAdapter {
    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn read(&self, path: &Path) -> AdapterResult<Option<FieldNode>> {
        let Some(root) = &self.root else {
            return Ok(None);
        };
        let segment = path.root();
        if segment.is_attribute || !self.element_matches(root, segment) {
            return Ok(None);
        }
        match &segment.repetition {
            Repetition::MapKeyed(_) => Err(AdapterError::unsupported(
                path,
                "XML elements cannot be keyed",
            )),
            Repetition::Indexed(index) if *index > 0 => Ok(None),
            _ => self.resolve(root, path, 1),
        }
    }

    fn write(&mut self, path: &Path, value: &FieldNode) -> AdapterResult<()> {
        self.materialize()?;
        match value {
            FieldNode::Field(field) => {
                self.write_field(path, field.value.as_ref().map(Scalar::render))
            }
            FieldNode::Group(group) => {
                for child in group.children() {
                    if child.path() == path {
                        return Err(AdapterError::unwritable(
                            path,
                            "group member repeats the group path",
                        ));
                    }
                    self.write(child.path(), child)?;
                }
                Ok(())
            }
        }
    }

    fn collection_size(&self, path: &Path) -> AdapterResult<u32> {
        let Some(position) = path.last_collection_position() else {
            return Err(AdapterError::unsupported(path, "path does not address a collection"));
        };
        if position == 0 {
            return Ok(u32::from(self.locate(path, 1).is_some()));
        }
        let count = self
            .locate(path, position)
            .map_or(0, |parent| self.matching_children(parent, &path.segments()[position]).len());
        Ok(u32::try_from(count).unwrap_or(u32::MAX))
    }

    fn pre_source_execution(&mut self) -> AdapterResult<()> {
        self.materialize()
    }

    fn pre_target_execution(&mut self) -> AdapterResult<()> {
        self.materialize()
    }

    fn post_target_execution(&mut self) -> AdapterResult<()> {
        self.materialize()?;
        self.stamp_declarations();
        self.output = self
            .root
            .as_ref()
            .map(|root| write_document(root, &self.config));
        debug!(
            doc_id = %self.doc_id,
            bytes = self.output.as_ref().map_or(0, String::len),
            "Serialized XML document"
        );
        Ok(())
    }

    fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    fn field(path_text: &str, value: &str) -> FieldNode {
        Field::new("out", path(path_text)).with_value(value).into()
    }

    fn source(xml: &str) -> XmlAdapter {
        let mut adapter = XmlAdapter::new("in").with_input(xml);
        adapter.pre_source_execution().unwrap();
        adapter
    }

    #[test]
    fn test_write_attribute_on_new_structure() {
        let mut adapter = XmlAdapter::new("out");
        adapter.pre_target_execution().unwrap();
        adapter
            .write(&path("/orders/order/id/@custId"), &field("/orders/order/id/@custId", "b"))
            .unwrap();
        adapter.post_target_execution().unwrap();

        assert_eq!(
            adapter.output(),
            Some(r#"<orders><order><id custId="b"/></order></orders>"#)
        );
    }

    #[test]
    fn test_namespaced_attribute_is_distinct() {
        let mut adapter = XmlAdapter::new("out").with_namespace("x", "urn:x");
        adapter.pre_target_execution().unwrap();
        adapter
            .write(&path("/orders/order/@x:totalCost"), &field("/orders/order/@x:totalCost", "10"))
            .unwrap();
        adapter
            .write(&path("/orders/order/@totalCost"), &field("/orders/order/@totalCost", "20"))
            .unwrap();

        let prefixed = adapter.read(&path("/orders/order/@x:totalCost")).unwrap().unwrap();
        let plain = adapter.read(&path("/orders/order/@totalCost")).unwrap().unwrap();
        assert_eq!(prefixed.value(), Some(&Scalar::from("10")));
        assert_eq!(plain.value(), Some(&Scalar::from("20")));

        adapter.post_target_execution().unwrap();
        assert_eq!(
            adapter.output(),
            Some(r#"<orders xmlns:x="urn:x"><order x:totalCost="10" totalCost="20"/></orders>"#)
        );
    }

    #[test]
    fn test_read_text_attribute_and_absent() {
        let adapter = source(r#"<orders><order id="7"><total>12.5</total></order></orders>"#);
        let total = adapter.read(&path("/orders/order/total")).unwrap().unwrap();
        assert_eq!(total.value(), Some(&Scalar::from("12.5")));

        let id = adapter.read(&path("/orders/order/@id")).unwrap().unwrap();
        assert_eq!(id.value(), Some(&Scalar::from("7")));

        let missing = adapter.read(&path("/orders/order/@nope")).unwrap().unwrap();
        assert_eq!(missing.value(), Some(&Scalar::from("")));

        assert!(adapter.read(&path("/orders/customer")).unwrap().is_none());
        assert!(adapter.read(&path("/invoices/order")).unwrap().is_none());
    }

    #[test]
    fn test_read_keeps_surrounding_whitespace() {
        let adapter = source("<p>\n  <name>  Ozzie </name>\n</p>");
        let name = adapter.read(&path("/p/name")).unwrap().unwrap();
        assert_eq!(name.value(), Some(&Scalar::from("  Ozzie ")));
    }

    #[test]
    fn test_write_rejects_index_beyond_limit() {
        let mut adapter = XmlAdapter::new("out");
        let text = format!("/list/item<{}>", docmap_model::MAX_INDEX);
        let err = adapter.write(&path(&text), &field(&text, "x")).unwrap_err();
        assert!(matches!(err, AdapterError::Unwritable { .. }));
        assert!(adapter.root().map_or(true, |root| root.children.is_empty()));
    }

    #[test]
    fn test_read_collection_expands_with_indices() {
        let adapter = source(concat!(
            "<orders><order><id>a</id></order><order><id>b</id></order>",
            "<order><id>c</id></order></orders>",
        ));
        let node = adapter.read(&path("/orders/order<>/id")).unwrap().unwrap();
        let FieldNode::Group(group) = node else {
            panic!("expected group");
        };
        assert_eq!(group.indices(), vec![0, 1, 2]);
        let second = group.child_with_index(1).unwrap();
        assert_eq!(second.path().format(), "/orders/order<1>/id");
        assert_eq!(second.value(), Some(&Scalar::from("b")));

        let third = adapter.read(&path("/orders/order<2>/id")).unwrap().unwrap();
        assert_eq!(third.value(), Some(&Scalar::from("c")));
        assert_eq!(adapter.collection_size(&path("/orders/order<>")).unwrap(), 3);
    }

    #[test]
    fn test_read_complex_element() {
        let adapter = source(concat!(
            r#"<orders><order id="1"><item>a</item><item>b</item>"#,
            r#"<total>2</total></order></orders>"#,
        ));
        let node = adapter.read(&path("/orders/order")).unwrap().unwrap();
        let leaves: Vec<_> = node.leaves().iter().map(|f| f.path.format()).collect();
        assert_eq!(
            leaves,
            vec![
                "/orders/order/@id",
                "/orders/order/item<0>",
                "/orders/order/item<1>",
                "/orders/order/total"
            ]
        );
    }

    #[test]
    fn test_indexed_write_pads_and_unindexed_appends() {
        let mut adapter = XmlAdapter::new("out");
        adapter.write(&path("/list/item<2>"), &field("/list/item<2>", "c")).unwrap();
        adapter.write(&path("/list/item<0>"), &field("/list/item<0>", "a")).unwrap();
        adapter.write(&path("/list/item<>"), &field("/list/item<>", "d")).unwrap();
        adapter.post_target_execution().unwrap();

        assert_eq!(
            adapter.output(),
            Some("<list><item>a</item><item/><item>c</item><item>d</item></list>")
        );
    }

    #[test]
    fn test_default_namespace_from_seed_document() {
        let adapter = source(r#"<orders xmlns="urn:o"><order>1</order></orders>"#);
        let node = adapter.read(&path("/orders/order")).unwrap().unwrap();
        assert_eq!(node.value(), Some(&Scalar::from("1")));
    }

    #[test]
    fn test_write_rejects_other_root_and_keys() {
        let mut adapter = source("<orders/>");
        assert!(adapter.write(&path("/invoices/id"), &field("/invoices/id", "1")).is_err());
        assert!(adapter.write(&path("/orders/line{a}"), &field("/orders/line{a}", "1")).is_err());
        assert!(adapter.read(&path("/orders/line{a}")).is_err());
    }
}
