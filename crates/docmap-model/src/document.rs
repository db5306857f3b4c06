//! In-memory mapping document: data sources, mappings, lookup tables,
//! constants, and properties
#![allow(clippy::must_use_candidate)] // Accessors and builders omit pervasive #[must_use].

use crate::field::Field;
use crate::value::FieldType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Implicit document id for sources when a field names none.
pub const DEFAULT_SOURCE_DOC_ID: &str = "DOC.Source";

/// Implicit document id for targets when a field names none.
pub const DEFAULT_TARGET_DOC_ID: &str = "DOC.Target";

/// Pseudo-document exposing the mapping document's constants.
pub const CONSTANTS_DOC_ID: &str = "DOC.Constants";

/// Pseudo-document exposing the mapping document's properties.
pub const PROPERTIES_DOC_ID: &str = "DOC.Properties";

/// Whether `doc_id` is one of the reserved ids.
pub fn is_reserved_doc_id(doc_id: &str) -> bool {
    matches!(
        doc_id,
        DEFAULT_SOURCE_DOC_ID | DEFAULT_TARGET_DOC_ID | CONSTANTS_DOC_ID | PROPERTIES_DOC_ID
    )
}

/// A complete mapping document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingDocument {
    /// Document name
    #[serde(default)]
    pub name: String,

    /// Documents read from or written to
    #[serde(default)]
    pub data_sources: Vec<DataSource>,

    /// Mappings, executed in order
    #[serde(default)]
    pub mappings: Vec<Mapping>,

    /// Named lookup tables
    #[serde(default)]
    pub lookup_tables: Vec<LookupTable>,

    /// Named constant values
    #[serde(default)]
    pub constants: Vec<Constant>,

    /// Named property values, overridable at runtime
    #[serde(default)]
    pub properties: Vec<Property>,
}

impl MappingDocument {
    /// Create an empty document.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Add a data source.
    #[must_use]
    pub fn with_data_source(mut self, data_source: DataSource) -> Self {
        self.data_sources.push(data_source);
        self
    }

    /// Add a mapping.
    #[must_use]
    pub fn with_mapping(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Add a lookup table.
    #[must_use]
    pub fn with_lookup_table(mut self, table: LookupTable) -> Self {
        self.lookup_tables.push(table);
        self
    }

    /// Add a constant.
    #[must_use]
    pub fn with_constant(mut self, constant: Constant) -> Self {
        self.constants.push(constant);
        self
    }

    /// Add a property.
    #[must_use]
    pub fn with_property(mut self, property: Property) -> Self {
        self.properties.push(property);
        self
    }

    /// First lookup table named `name`.
    pub fn lookup_table(&self, name: &str) -> Option<&LookupTable> {
        self.lookup_tables.iter().find(|t| t.name == name)
    }

    /// Data source with id `id`.
    pub fn data_source(&self, id: &str) -> Option<&DataSource> {
        self.data_sources.iter().find(|d| d.id == id)
    }

    /// Data sources with the given role.
    pub fn data_sources_with_role(
        &self,
        role: DataSourceRole,
    ) -> impl Iterator<Item = &DataSource> {
        self.data_sources.iter().filter(move |d| d.role == role)
    }
}

/// Whether a document is read or written
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DataSourceRole {
    Source,
    Target,
}

/// Namespace binding for tree-structured formats; an empty prefix is the
/// default namespace
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Namespace {
    #[serde(default)]
    pub prefix: String,
    pub uri: String,
}

impl Namespace {
    /// Create a namespace binding.
    pub fn new(prefix: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            uri: uri.into(),
        }
    }
}

/// A document taking part in the mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DataSource {
    /// Document id referenced by fields
    pub id: String,

    /// Source or target
    pub role: DataSourceRole,

    /// Format name used to pick an adapter (`xml`, `json`, `csv`, ...)
    pub format: String,

    /// Location hint
    #[serde(default)]
    pub uri: String,

    /// Namespace bindings for tree formats
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub namespaces: Vec<Namespace>,

    /// Format-specific adapter options
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub options: BTreeMap<String, String>,
}

impl DataSource {
    /// Create a data source.
    pub fn new(id: impl Into<String>, role: DataSourceRole, format: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            role,
            format: format.into(),
            uri: String::new(),
            namespaces: Vec::new(),
            options: BTreeMap::new(),
        }
    }

    /// Add a namespace binding.
    #[must_use]
    pub fn with_namespace(mut self, namespace: Namespace) -> Self {
        self.namespaces.push(namespace);
        self
    }

    /// Set an adapter option.
    #[must_use]
    pub fn with_option(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.options.insert(key.into(), value.into());
        self
    }

    /// Look up an adapter option.
    pub fn option(&self, key: &str) -> Option<&str> {
        self.options.get(key).map(String::as_str)
    }
}

/// Shape of a source-to-target correspondence
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MappingKind {
    Map,
    Separate,
    Combine,
    Collection,
    Lookup,
}

impl std::fmt::Display for MappingKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MappingKind::Map => "MAP",
            MappingKind::Separate => "SEPARATE",
            MappingKind::Combine => "COMBINE",
            MappingKind::Collection => "COLLECTION",
            MappingKind::Lookup => "LOOKUP",
        };
        f.write_str(name)
    }
}

/// One declared mapping
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Mapping {
    /// Identifier used in audits and validations
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,

    /// Mapping shape
    pub kind: MappingKind,

    /// Source fields, in declared order
    #[serde(default)]
    pub inputs: Vec<Field>,

    /// Target fields, in declared order
    #[serde(default)]
    pub outputs: Vec<Field>,

    /// Delimiter for separate and combine
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub delimiter: Option<String>,

    /// Lookup table applied to the input value
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lookup_table_name: Option<String>,

    /// Nested mappings replayed once per element of a collection mapping
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mappings: Vec<Mapping>,
}

impl Mapping {
    /// Create an empty mapping of `kind`.
    pub fn new(kind: MappingKind) -> Self {
        Self {
            id: None,
            kind,
            inputs: Vec::new(),
            outputs: Vec::new(),
            delimiter: None,
            lookup_table_name: None,
            mappings: Vec::new(),
        }
    }

    /// Set the id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Add an input field.
    #[must_use]
    pub fn with_input(mut self, field: Field) -> Self {
        self.inputs.push(field);
        self
    }

    /// Add an output field.
    #[must_use]
    pub fn with_output(mut self, field: Field) -> Self {
        self.outputs.push(field);
        self
    }

    /// Set the delimiter.
    #[must_use]
    pub fn with_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.delimiter = Some(delimiter.into());
        self
    }

    /// Set the lookup table name.
    #[must_use]
    pub fn with_lookup_table(mut self, name: impl Into<String>) -> Self {
        self.lookup_table_name = Some(name.into());
        self
    }

    /// Add a nested mapping.
    #[must_use]
    pub fn with_nested(mut self, mapping: Mapping) -> Self {
        self.mappings.push(mapping);
        self
    }

    /// Identifier for diagnostics: the declared id or the kind.
    pub fn label(&self) -> String {
        self.id.clone().unwrap_or_else(|| self.kind.to_string())
    }
}

/// One typed substitution
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LookupEntry {
    #[serde(default)]
    pub source_type: FieldType,
    pub source_value: String,
    #[serde(default)]
    pub target_type: FieldType,
    pub target_value: String,
}

impl LookupEntry {
    /// Create a string-to-string entry.
    pub fn new(source_value: impl Into<String>, target_value: impl Into<String>) -> Self {
        Self {
            source_type: FieldType::String,
            source_value: source_value.into(),
            target_type: FieldType::String,
            target_value: target_value.into(),
        }
    }

    /// Set the source and target types.
    #[must_use]
    pub fn with_types(mut self, source_type: FieldType, target_type: FieldType) -> Self {
        self.source_type = source_type;
        self.target_type = target_type;
        self
    }
}

/// Named, ordered set of substitutions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookupTable {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub entries: Vec<LookupEntry>,
}

impl LookupTable {
    /// Create an empty table.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            entries: Vec::new(),
        }
    }

    /// Append an entry.
    #[must_use]
    pub fn with_entry(mut self, entry: LookupEntry) -> Self {
        self.entries.push(entry);
        self
    }

    /// First entry whose source side matches.
    pub fn find(&self, source_type: FieldType, source_value: &str) -> Option<&LookupEntry> {
        self.entries
            .iter()
            .find(|e| e.source_type == source_type && e.source_value == source_value)
    }
}

/// Named constant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Constant {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub field_type: FieldType,
}

impl Constant {
    /// Create a string constant.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            field_type: FieldType::String,
        }
    }

    /// Set the type.
    #[must_use]
    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }
}

/// Named property
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Property {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub field_type: FieldType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

impl Property {
    /// Create a string property.
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            field_type: FieldType::String,
            scope: None,
        }
    }

    /// Set the type.
    #[must_use]
    pub fn with_type(mut self, field_type: FieldType) -> Self {
        self.field_type = field_type;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::path::Path;

    #[test]
    fn test_document_builder() {
        let doc = MappingDocument::new("orders")
            .with_data_source(DataSource::new("src", DataSourceRole::Source, "xml"))
            .with_data_source(DataSource::new("tgt", DataSourceRole::Target, "json"))
            .with_lookup_table(LookupTable::new("colors"))
            .with_mapping(
                Mapping::new(MappingKind::Map)
                    .with_input(Field::new("src", Path::parse("/a/b").unwrap()))
                    .with_output(Field::new("tgt", Path::parse("/b").unwrap())),
            );

        assert_eq!(doc.data_sources_with_role(DataSourceRole::Source).count(), 1);
        assert!(doc.lookup_table("colors").is_some());
        assert!(doc.data_source("tgt").is_some());
        assert_eq!(doc.mappings[0].label(), "MAP");
    }

    #[test]
    fn test_lookup_find_first_match() {
        let table = LookupTable::new("codes")
            .with_entry(LookupEntry::new("A", "Alpha"))
            .with_entry(LookupEntry::new("A", "Again"))
            .with_entry(
                LookupEntry::new("1", "One").with_types(FieldType::Integer, FieldType::String),
            );

        assert_eq!(table.find(FieldType::String, "A").unwrap().target_value, "Alpha");
        assert_eq!(table.find(FieldType::Integer, "1").unwrap().target_value, "One");
        assert!(table.find(FieldType::String, "1").is_none());
    }

    #[test]
    fn test_reserved_ids() {
        assert!(is_reserved_doc_id(CONSTANTS_DOC_ID));
        assert!(is_reserved_doc_id(DEFAULT_TARGET_DOC_ID));
        assert!(!is_reserved_doc_id("orders"));
    }

    #[test]
    fn test_deserialize_document_yaml() {
        let yaml = r"
name: sample
dataSources:
  - id: src
    role: SOURCE
    format: xml
    namespaces:
      - prefix: x
        uri: http://example.com/x/
mappings:
  - kind: SEPARATE
    delimiter: ' '
    inputs:
      - docId: src
        path: /person/name
    outputs:
      - docId: tgt
        path: /first
        index: 0
lookupTables:
  - name: colors
    entries:
      - sourceValue: R
        targetValue: Red
";
        let doc: MappingDocument = serde_yaml::from_str(yaml).unwrap();
        assert_eq!(doc.name, "sample");
        assert_eq!(doc.data_sources[0].namespaces[0].prefix, "x");
        assert_eq!(doc.mappings[0].kind, MappingKind::Separate);
        assert_eq!(doc.mappings[0].outputs[0].index, Some(0));
        assert_eq!(doc.lookup_tables[0].entries[0].source_type, FieldType::String);
    }
}
