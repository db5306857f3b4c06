//! JSON document adapter
//!
//! The document root is an anonymous value and every path segment is a
//! property lookup from there. `name<n>` and `name<>` address array
//! elements, `name{key}` a property of a nested object, and `name{}` every
//! property of that object. Attribute segments address leaf properties.

use crate::config::JsonConfig;
use crate::errors::JsonError;
use docmap_model::{
    AdapterError, AdapterResult, CollectionType, DocumentAdapter, Field, FieldGroup, FieldNode,
    FieldType, Path, PathSegment, Repetition, Scalar,
};
use serde_json::{Map, Number, Value};
use tracing::{debug, trace};

/// Adapter over a single JSON document
#[derive(Debug, Clone)]
pub struct JsonAdapter {
    doc_id: String,
    config: JsonConfig,
    input: Option<String>,
    root: Option<Value>,
    output: Option<String>,
}

impl JsonAdapter {
    /// Create an adapter for `doc_id` with an empty document.
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            config: JsonConfig::default(),
            input: None,
            root: None,
            output: None,
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: JsonConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the adapter with JSON text, parsed before the first read or write.
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self.root = None;
        self
    }

    /// The document value, once materialized or written.
    #[must_use]
    pub fn value(&self) -> Option<&Value> {
        self.root.as_ref()
    }

    fn materialize(&mut self) -> AdapterResult<()> {
        if self.root.is_some() {
            return Ok(());
        }
        let root = match &self.input {
            Some(text) => serde_json::from_str(text)
                .map_err(|e| JsonError::from(e).into_adapter_error(&self.doc_id))?,
            None => Value::Object(Map::new()),
        };
        debug!(doc_id = %self.doc_id, "Materialized JSON document");
        self.root = Some(root);
        Ok(())
    }

    fn resolve(&self, current: &Value, path: &Path, position: usize) -> Option<FieldNode> {
        let Some(segment) = path.segments().get(position) else {
            return Some(self.node_from_value(path, current));
        };
        let property = current.as_object()?.get(&segment.qualified_name())?;

        match &segment.repetition {
            Repetition::None => self.resolve(property, path, position + 1),
            Repetition::Indexed(index) => {
                let element = property.as_array()?.get(*index as usize)?;
                self.resolve(element, path, position + 1)
            }
            Repetition::MapKeyed(key) if !key.is_empty() => {
                let entry = property.as_object()?.get(key)?;
                self.resolve(entry, path, position + 1)
            }
            Repetition::Unindexed => {
                let items = property.as_array()?;
                let mut group = self.collection_group(path, CollectionType::List);
                for (i, item) in items.iter().enumerate() {
                    let index = u32::try_from(i).unwrap_or(u32::MAX);
                    let concrete = path.with_index(position, index);
                    if let Some(mut node) = self.resolve(item, &concrete, position + 1) {
                        node.field_mut().index = Some(index);
                        group.push(node);
                    }
                }
                Some(group.into())
            }
            Repetition::MapKeyed(_) => {
                let entries = property.as_object()?;
                let mut group = self.collection_group(path, CollectionType::Map);
                for (i, (key, entry)) in entries.iter().enumerate() {
                    let concrete =
                        path.with_repetition(position, Repetition::MapKeyed(key.clone()));
                    if let Some(mut node) = self.resolve(entry, &concrete, position + 1) {
                        node.field_mut().index = Some(u32::try_from(i).unwrap_or(u32::MAX));
                        group.push(node);
                    }
                }
                Some(group.into())
            }
        }
    }

    fn collection_group(&self, path: &Path, collection_type: CollectionType) -> FieldGroup {
        FieldGroup::new(
            Field::new(self.doc_id.as_str(), path.clone())
                .with_type(FieldType::Complex)
                .with_collection_type(collection_type),
        )
    }

    fn node_from_value(&self, path: &Path, value: &Value) -> FieldNode {
        match value {
            Value::Object(properties) => {
                let mut group = FieldGroup::new(
                    Field::new(self.doc_id.as_str(), path.clone()).with_type(FieldType::Complex),
                );
                if path.is_attribute() {
                    return group.into();
                }
                for (name, child) in properties {
                    let segment = PathSegment::element(name.as_str());
                    if let Ok(child_path) = path.with_appended_segment(segment) {
                        group.push(self.node_from_value(&child_path, child));
                    }
                }
                group.into()
            }
            Value::Array(items) => {
                let mut group = self.collection_group(path, CollectionType::Array);
                let last = path.len() - 1;
                for (i, item) in items.iter().enumerate() {
                    let index = u32::try_from(i).unwrap_or(u32::MAX);
                    let mut node = self.node_from_value(&path.with_index(last, index), item);
                    node.field_mut().index = Some(index);
                    group.push(node);
                }
                group.into()
            }
            scalar => {
                let value = scalar_from_json(scalar);
                let field_type = value.as_ref().map_or(FieldType::String, Scalar::field_type);
                Field::new(self.doc_id.as_str(), path.clone())
                    .with_type(field_type)
                    .with_optional_value(value)
                    .into()
            }
        }
    }

    /// Walk `path` up to (not including) `depth`, taking the first element
    /// of any collection that is not indexed.
    fn locate(&self, path: &Path, depth: usize) -> Option<&Value> {
        let mut current = self.root.as_ref()?;
        for segment in &path.segments()[..depth] {
            let property = current.as_object()?.get(&segment.qualified_name())?;
            current = match &segment.repetition {
                Repetition::None => property,
                Repetition::Indexed(index) => property.as_array()?.get(*index as usize)?,
                Repetition::Unindexed => property.as_array()?.first()?,
                Repetition::MapKeyed(key) if key.is_empty() => {
                    property.as_object()?.values().next()?
                }
                Repetition::MapKeyed(key) => property.as_object()?.get(key)?,
            };
        }
        Some(current)
    }
}

/// Convert a JSON scalar; objects and arrays are not scalars.
fn scalar_from_json(value: &Value) -> Option<Scalar> {
    match value {
        Value::Bool(b) => Some(Scalar::Boolean(*b)),
        Value::Number(n) => match n.as_i64() {
            Some(integral) => Some(Scalar::Long(integral)),
            None => n.as_f64().map(Scalar::Double),
        },
        Value::String(s) => Some(Scalar::String(s.clone())),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

fn scalar_to_json(path: &Path, value: Option<&Scalar>) -> AdapterResult<Value> {
    let Some(value) = value else {
        return Ok(Value::Null);
    };
    Ok(match value {
        Scalar::Boolean(b) => Value::Bool(*b),
        Scalar::Byte(v) => Value::from(*v),
        Scalar::Short(v) => Value::from(*v),
        Scalar::Integer(v) => Value::from(*v),
        Scalar::Long(v) => Value::from(*v),
        Scalar::Float(v) => Number::from_f64(f64::from(*v))
            .map(Value::Number)
            .ok_or_else(|| AdapterError::unwritable(path, format!("{v} is not a finite number")))?,
        Scalar::Double(v) => Number::from_f64(*v)
            .map(Value::Number)
            .ok_or_else(|| AdapterError::unwritable(path, format!("{v} is not a finite number")))?,
        Scalar::Char(_) | Scalar::String(_) | Scalar::ByteArray(_) => Value::String(value.render()),
    })
}

fn write_at(current: &mut Value, path: &Path, position: usize, value: Value) -> AdapterResult<()> {
    if current.is_null() {
        *current = Value::Object(Map::new());
    }
    let Value::Object(object) = current else {
        return Err(AdapterError::unwritable(
            path,
            format!("segment {position} is not inside an object"),
        ));
    };
    let segment = &path.segments()[position];
    let name = segment.qualified_name();

    if position + 1 == path.len() {
        trace!(property = %name, "Writing JSON property");
        return place(object, name, &segment.repetition, value, path);
    }
    let next = descend(object, name, &segment.repetition, path)?;
    write_at(next, path, position + 1, value)
}

fn descend<'a>(
    object: &'a mut Map<String, Value>,
    name: String,
    repetition: &Repetition,
    path: &Path,
) -> AdapterResult<&'a mut Value> {
    match repetition {
        Repetition::None => Ok(object.entry(name).or_insert(Value::Null)),
        Repetition::Indexed(index) => {
            let index = AdapterError::check_index(path, *index)?;
            let items = array_entry(object, name, path)?;
            if items.len() <= index {
                items.resize(index + 1, Value::Null);
            }
            Ok(&mut items[index])
        }
        Repetition::Unindexed => {
            let items = array_entry(object, name, path)?;
            items.push(Value::Null);
            let last = items.len() - 1;
            Ok(&mut items[last])
        }
        Repetition::MapKeyed(key) if key.is_empty() => {
            Err(AdapterError::unwritable(path, "a map key is required to write"))
        }
        Repetition::MapKeyed(key) => {
            let entries = object_entry(object, name, path)?;
            Ok(entries.entry(key.clone()).or_insert(Value::Null))
        }
    }
}

fn place(
    object: &mut Map<String, Value>,
    name: String,
    repetition: &Repetition,
    value: Value,
    path: &Path,
) -> AdapterResult<()> {
    match repetition {
        Repetition::None => {
            object.insert(name, value);
            Ok(())
        }
        Repetition::MapKeyed(key) if key.is_empty() => {
            Err(AdapterError::unwritable(path, "a map key is required to write"))
        }
        _ => {
            *descend(object, name, repetition, path)? = value;
            Ok(())
        }
    }
}

fn array_entry<'a>(
    object: &'a mut Map<String, Value>,
    name: String,
    path: &Path,
) -> AdapterResult<&'a mut Vec<Value>> {
    let slot = object.entry(name).or_insert_with(|| Value::Array(Vec::new()));
    if slot.is_null() {
        *slot = Value::Array(Vec::new());
    }
    match slot {
        Value::Array(items) => Ok(items),
        _ => Err(AdapterError::unwritable(path, "property is not an array")),
    }
}

fn object_entry<'a>(
    object: &'a mut Map<String, Value>,
    name: String,
    path: &Path,
) -> AdapterResult<&'a mut Map<String, Value>> {
    let slot = object.entry(name).or_insert_with(|| Value::Object(Map::new()));
    if slot.is_null() {
        *slot = Value::Object(Map::new());
    }
    match slot {
        Value::Object(entries) => Ok(entries),
        _ => Err(AdapterError::unwritable(path, "property is not an object")),
    }
}

impl DocumentAdapter for JsonAdapter {
    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn read(&self, path: &Path) -> AdapterResult<Option<FieldNode>> {
        Ok(self
            .root
            .as_ref()
            .and_then(|root| self.resolve(root, path, 0)))
    }

    fn write(&mut self, path: &Path, value: &FieldNode) -> AdapterResult<()> {
        self.materialize()?;
        match value {
            FieldNode::Field(field) => {
                let json = scalar_to_json(path, field.value.as_ref())?;
                let root = self.root.get_or_insert_with(|| Value::Object(Map::new()));
                write_at(root, path, 0, json)
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
        let segment = &path.segments()[position];
        let count = self
            .locate(path, position)
            .and_then(Value::as_object)
            .and_then(|object| object.get(&segment.qualified_name()))
            .map_or(0, |property| match (property, &segment.repetition) {
                (Value::Object(entries), Repetition::MapKeyed(_)) => entries.len(),
                (Value::Array(items), Repetition::Indexed(_) | Repetition::Unindexed) => {
                    items.len()
                }
                _ => 0,
            });
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
        let root = self.root.as_ref().map_or(Value::Null, Clone::clone);
        let text = if self.config.pretty {
            serde_json::to_string_pretty(&root)
        } else {
            serde_json::to_string(&root)
        }
        .map_err(|e| JsonError::Write(e.to_string()).into_adapter_error(&self.doc_id))?;
        debug!(doc_id = %self.doc_id, bytes = text.len(), "Serialized JSON document");
        self.output = Some(text);
        Ok(())
    }

    fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}
