//! Field model: single fields, groups, and field actions

use crate::path::Path;
use crate::value::{FieldType, Scalar};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Container shape of a repeated field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CollectionType {
    #[default]
    None,
    List,
    Array,
    Map,
}

/// Whether the engine can process a field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FieldStatus {
    #[default]
    Supported,
    Unsupported,
    Error,
}

/// A named value transform attached to a field
///
/// Deserializes from a bare identifier (`trim`) or from
/// `{ name, parameters }`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "ActionSpec")]
pub struct FieldAction {
    pub name: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub parameters: BTreeMap<String, String>,
}

impl FieldAction {
    /// Create an action without parameters.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            parameters: BTreeMap::new(),
        }
    }

    /// Add a parameter.
    #[must_use]
    pub fn with_parameter(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.parameters.insert(key.into(), value.into());
        self
    }

    /// Look up a parameter by name.
    #[must_use]
    pub fn parameter(&self, key: &str) -> Option<&str> {
        self.parameters.get(key).map(String::as_str)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ActionSpec {
    Name(String),
    Full {
        name: String,
        #[serde(default)]
        parameters: BTreeMap<String, ParameterValue>,
    },
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ParameterValue {
    Text(String),
    Integer(i64),
    Number(f64),
    Flag(bool),
}

impl From<ActionSpec> for FieldAction {
    fn from(spec: ActionSpec) -> Self {
        match spec {
            ActionSpec::Name(name) => FieldAction::new(name),
            ActionSpec::Full { name, parameters } => FieldAction {
                name,
                parameters: parameters
                    .into_iter()
                    .map(|(key, value)| {
                        let text = match value {
                            ParameterValue::Text(s) => s,
                            ParameterValue::Integer(i) => i.to_string(),
                            ParameterValue::Number(n) => n.to_string(),
                            ParameterValue::Flag(b) => b.to_string(),
                        };
                        (key, text)
                    })
                    .collect(),
            },
        }
    }
}

/// A single addressed field, optionally carrying a value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Field {
    /// Document the field belongs to; empty selects the default document
    #[serde(default)]
    pub doc_id: String,

    /// Location within the document
    pub path: Path,

    /// Declared type
    #[serde(default)]
    pub field_type: FieldType,

    /// Current value, absent when unset or null
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Scalar>,

    /// Container shape when the field repeats
    #[serde(default)]
    pub collection_type: CollectionType,

    /// Position within a collection, or the declared output index for
    /// separate mappings
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub index: Option<u32>,

    /// Actions applied in declared order
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<FieldAction>,

    /// Processing status
    #[serde(default)]
    pub status: FieldStatus,
}

impl Field {
    /// Create a string field at `path` in document `doc_id`.
    pub fn new(doc_id: impl Into<String>, path: Path) -> Self {
        Self {
            doc_id: doc_id.into(),
            path,
            field_type: FieldType::String,
            value: None,
            collection_type: CollectionType::None,
            index: None,
            actions: Vec::new(),
            status: FieldStatus::Supported,
        }
    }

    /// Set the declared type.
    #[must_use]
    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }

    /// Set the value.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<Scalar>) -> Self {
        self.value = Some(value.into());
        self
    }

    /// Set an optional value.
    #[must_use]
    pub fn with_optional_value(mut self, value: Option<Scalar>) -> Self {
        self.value = value;
        self
    }

    /// Set the index.
    #[must_use]
    pub fn with_index(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }

    /// Set the collection type.
    #[must_use]
    pub fn with_collection_type(mut self, collection_type: CollectionType) -> Self {
        self.collection_type = collection_type;
        self
    }

    /// Append an action.
    #[must_use]
    pub fn with_action(mut self, action: FieldAction) -> Self {
        self.actions.push(action);
        self
    }

    /// Set the status.
    #[must_use]
    pub fn with_status(mut self, status: FieldStatus) -> Self {
        self.status = status;
        self
    }
}

/// A field holding an ordered list of child fields: either a structural
/// complex value or the materialized elements of a repeated value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldGroup {
    /// Header describing the group itself
    pub field: Field,

    children: Vec<FieldNode>,
}

impl FieldGroup {
    /// Create an empty group.
    #[must_use]
    pub fn new(field: Field) -> Self {
        Self {
            field,
            children: Vec::new(),
        }
    }

    /// Append a child.
    pub fn push(&mut self, child: impl Into<FieldNode>) -> &mut Self {
        self.children.push(child.into());
        self
    }

    /// Child at list position `position`.
    #[must_use]
    pub fn child_at(&self, position: usize) -> Option<&FieldNode> {
        self.children.get(position)
    }

    /// Child carrying collection index `index`.
    #[must_use]
    pub fn child_with_index(&self, index: u32) -> Option<&FieldNode> {
        self.children.iter().find(|c| c.index() == Some(index))
    }

    /// Number of children.
    #[must_use]
    pub fn len(&self) -> usize {
        self.children.len()
    }

    /// Whether the group has no children.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.children.is_empty()
    }

    /// All children in order.
    #[must_use]
    pub fn children(&self) -> &[FieldNode] {
        &self.children
    }

    /// Collection indices of the children, in list order.
    #[must_use]
    pub fn indices(&self) -> Vec<u32> {
        self.children.iter().filter_map(FieldNode::index).collect()
    }
}

/// Either a single field or a group
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum FieldNode {
    Field(Field),
    Group(FieldGroup),
}

impl FieldNode {
    /// The field, or the group's header.
    #[must_use]
    pub fn field(&self) -> &Field {
        match self {
            FieldNode::Field(field) => field,
            FieldNode::Group(group) => &group.field,
        }
    }

    /// Mutable access to the field or the group's header.
    pub fn field_mut(&mut self) -> &mut Field {
        match self {
            FieldNode::Field(field) => field,
            FieldNode::Group(group) => &mut group.field,
        }
    }

    /// Location of the node.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.field().path
    }

    /// Collection index of the node.
    #[must_use]
    pub fn index(&self) -> Option<u32> {
        self.field().index
    }

    /// Value of a single field; groups carry none.
    #[must_use]
    pub fn value(&self) -> Option<&Scalar> {
        match self {
            FieldNode::Field(field) => field.value.as_ref(),
            FieldNode::Group(_) => None,
        }
    }

    /// Whether this is a group.
    #[must_use]
    pub fn is_group(&self) -> bool {
        matches!(self, FieldNode::Group(_))
    }

    /// Every single field beneath this node, depth first.
    #[must_use]
    pub fn leaves(&self) -> Vec<&Field> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// The node at `path`, this one or any descendant.
    #[must_use]
    pub fn find(&self, path: &Path) -> Option<&FieldNode> {
        if self.path() == path {
            return Some(self);
        }
        match self {
            FieldNode::Field(_) => None,
            FieldNode::Group(group) => group.children.iter().find_map(|child| child.find(path)),
        }
    }
}

fn collect_leaves<'a>(node: &'a FieldNode, out: &mut Vec<&'a Field>) {
    match node {
        FieldNode::Field(field) => out.push(field),
        FieldNode::Group(group) => {
            for child in &group.children {
                collect_leaves(child, out);
            }
        }
    }
}

impl From<Field> for FieldNode {
    fn from(field: Field) -> Self {
        FieldNode::Field(field)
    }
}

impl From<FieldGroup> for FieldNode {
    fn from(group: FieldGroup) -> Self {
        FieldNode::Group(group)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(text: &str) -> Path {
        Path::parse(text).unwrap()
    }

    #[test]
    fn test_field_builder() {
        let field = Field::new("src", path("/orders/order/id"))
            .with_type(FieldType::Integer)
            .with_value(42)
            .with_action(FieldAction::new("trim"));

        assert_eq!(field.doc_id, "src");
        assert_eq!(field.field_type, FieldType::Integer);
        assert_eq!(field.value, Some(Scalar::Integer(42)));
        assert_eq!(field.actions.len(), 1);
        assert_eq!(field.status, FieldStatus::Supported);
    }

    #[test]
    fn test_group_children() {
        let mut group = FieldGroup::new(
            Field::new("src", path("/orders/order<>")).with_collection_type(CollectionType::List),
        );
        group.push(Field::new("src", path("/orders/order<0>")).with_index(0));
        group.push(Field::new("src", path("/orders/order<1>")).with_index(1));

        assert_eq!(group.len(), 2);
        assert!(!group.is_empty());
        assert_eq!(group.indices(), vec![0, 1]);
        assert_eq!(
            group.child_at(1).unwrap().path().format(),
            "/orders/order<1>"
        );
        assert!(group.child_with_index(0).is_some());
        assert!(group.child_with_index(5).is_none());
    }

    #[test]
    fn test_leaves() {
        let mut inner = FieldGroup::new(Field::new("src", path("/a/b")));
        inner.push(Field::new("src", path("/a/b/c")).with_value("1"));
        let mut outer = FieldGroup::new(Field::new("src", path("/a")));
        outer.push(inner);
        outer.push(Field::new("src", path("/a/d")).with_value("2"));

        let node = FieldNode::from(outer);
        let leaves = node.leaves();
        assert_eq!(leaves.len(), 2);
        assert_eq!(leaves[0].path.format(), "/a/b/c");
        assert!(node.value().is_none());
    }

    #[test]
    fn test_find_descendant() {
        let mut inner = FieldGroup::new(Field::new("src", path("/a/b")));
        inner.push(Field::new("src", path("/a/b/c")).with_value("1"));
        let mut outer = FieldGroup::new(Field::new("src", path("/a")));
        outer.push(inner);

        let node = FieldNode::from(outer);
        assert_eq!(node.find(&path("/a")).unwrap().path().format(), "/a");
        assert!(node.find(&path("/a/b")).unwrap().is_group());
        assert_eq!(
            node.find(&path("/a/b/c")).unwrap().value(),
            Some(&Scalar::String("1".to_string()))
        );
        assert!(node.find(&path("/a/x")).is_none());
    }

    #[test]
    fn test_action_deserialize_forms() {
        let actions: Vec<FieldAction> = serde_json::from_str(
            r#"["trim", {"name": "sub-string", "parameters": {"startIndex": 1, "endIndex": "3"}}]"#,
        )
        .unwrap();
        assert_eq!(actions[0], FieldAction::new("trim"));
        assert_eq!(actions[1].name, "sub-string");
        assert_eq!(actions[1].parameter("startIndex"), Some("1"));
        assert_eq!(actions[1].parameter("endIndex"), Some("3"));
    }

    #[test]
    fn test_field_deserialize_defaults() {
        let field: Field = serde_json::from_str(r#"{"path": "/person/name"}"#).unwrap();
        assert!(field.doc_id.is_empty());
        assert_eq!(field.field_type, FieldType::String);
        assert_eq!(field.collection_type, CollectionType::None);
        assert!(field.actions.is_empty());
    }
}
