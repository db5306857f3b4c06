//! Mapping document loader
//!
//! Loads a [`MappingDocument`] from YAML or JSON. Every field path is parsed
//! up front so a malformed path fails the load with the offending text, and
//! field actions without a registered handler are dropped and reported
//! instead of failing the load.

use crate::error::LoadError;
use docmap_model::{Field, Mapping, MappingDocument, Path, Scope, ValidationEntry};
use docmap_transform::ActionRegistry;
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// A loaded document together with the warnings raised while loading it
#[derive(Debug, Clone)]
pub struct LoadReport {
    pub document: MappingDocument,
    pub warnings: Vec<ValidationEntry>,
}

/// Mapping document loader
#[derive(Debug, Clone)]
pub struct MappingDsl {
    actions: Arc<ActionRegistry>,
}

impl MappingDsl {
    /// Create a loader that knows the built-in field actions.
    #[must_use]
    pub fn new() -> Self {
        Self {
            actions: Arc::new(ActionRegistry::with_builtins()),
        }
    }

    /// Create a loader that keeps only actions known to `actions`.
    #[must_use]
    pub fn with_actions(actions: Arc<ActionRegistry>) -> Self {
        Self { actions }
    }

    /// Parse a mapping document from YAML.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Parse` for malformed YAML or a document of the
    /// wrong shape, and `LoadError::Path` for a malformed field path.
    pub fn parse_yaml(&self, yaml: &str) -> Result<LoadReport, LoadError> {
        let raw: Value = serde_yaml::from_str(yaml)?;
        self.load(raw)
    }

    /// Parse a mapping document from JSON.
    ///
    /// # Errors
    ///
    /// See [`MappingDsl::parse_yaml`].
    pub fn parse_json(&self, json: &str) -> Result<LoadReport, LoadError> {
        let raw: Value = serde_json::from_str(json)?;
        self.load(raw)
    }

    /// Parse a mapping document from a file; `.json` files are read as
    /// JSON, anything else as YAML.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Io` when the file cannot be read, otherwise see
    /// [`MappingDsl::parse_yaml`].
    pub fn parse_file(&self, path: &std::path::Path) -> Result<LoadReport, LoadError> {
        let content = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            self.parse_json(&content)
        } else {
            self.parse_yaml(&content)
        }
    }

    /// Serialize a mapping document to YAML.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Parse` when serialization fails.
    pub fn to_yaml(document: &MappingDocument) -> Result<String, LoadError> {
        serde_yaml::to_string(document).map_err(LoadError::from)
    }

    /// Serialize a mapping document to pretty JSON.
    ///
    /// # Errors
    ///
    /// Returns `LoadError::Parse` when serialization fails.
    pub fn to_json(document: &MappingDocument) -> Result<String, LoadError> {
        serde_json::to_string_pretty(document).map_err(LoadError::from)
    }

    fn load(&self, raw: Value) -> Result<LoadReport, LoadError> {
        check_paths(&raw)?;
        let mut document: MappingDocument = serde_json::from_value(raw)?;

        let mut warnings = Vec::new();
        for mapping in &mut document.mappings {
            self.drop_unknown_actions(mapping, &mut warnings);
        }
        debug!(
            document = %document.name,
            mappings = document.mappings.len(),
            dropped_actions = warnings.len(),
            "Loaded mapping document"
        );
        Ok(LoadReport { document, warnings })
    }

    fn drop_unknown_actions(&self, mapping: &mut Mapping, warnings: &mut Vec<ValidationEntry>) {
        let id = mapping.id.clone();
        for field in mapping.inputs.iter_mut().chain(mapping.outputs.iter_mut()) {
            self.drop_field_actions(field, id.as_deref(), warnings);
        }
        for nested in &mut mapping.mappings {
            self.drop_unknown_actions(nested, warnings);
        }
    }

    fn drop_field_actions(
        &self,
        field: &mut Field,
        mapping_id: Option<&str>,
        warnings: &mut Vec<ValidationEntry>,
    ) {
        for name in self.actions.retain_known(&mut field.actions) {
            warnings.push(
                ValidationEntry::warn(
                    Scope::Mapping,
                    format!("Unknown field action '{name}' was dropped"),
                )
                .with_optional_id(mapping_id)
                .with_doc_id(field.doc_id.as_str())
                .with_path(field.path.format()),
            );
        }
    }
}

impl Default for MappingDsl {
    fn default() -> Self {
        Self::new()
    }
}

/// Parse every `path` under an `inputs` or `outputs` list.
fn check_paths(value: &Value) -> Result<(), LoadError> {
    match value {
        Value::Object(entries) => {
            for (key, child) in entries {
                if key == "inputs" || key == "outputs" {
                    for field in child.as_array().into_iter().flatten() {
                        if let Some(path) = field.get("path").and_then(Value::as_str) {
                            Path::parse(path)?;
                        }
                    }
                }
                check_paths(child)?;
            }
            Ok(())
        }
        Value::Array(items) => items.iter().try_for_each(check_paths),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use docmap_model::{DataSourceRole, FieldType, MappingKind};

    const ORDERS: &str = r"
name: orders
dataSources:
  - id: src
    role: SOURCE
    format: xml
  - id: tgt
    role: TARGET
    format: json
    options:
      pretty: 'true'
mappings:
  - id: name
    kind: MAP
    inputs:
      - docId: src
        path: /orders/order/@name
        actions:
          - trim
          - name: append
            parameters:
              string: '!'
    outputs:
      - docId: tgt
        path: /order/name
  - kind: COLLECTION
    inputs:
      - docId: src
        path: /orders/order/line<>
    outputs:
      - docId: tgt
        path: /order/lines<>
    mappings:
      - kind: MAP
        inputs:
          - docId: src
            path: /orders/order/line<>/@qty
        outputs:
          - docId: tgt
            path: /order/lines<>/qty
            fieldType: INTEGER
lookupTables:
  - name: colors
    entries:
      - sourceValue: R
        targetValue: Red
";

    #[test]
    fn test_parse_yaml_document() {
        let report = MappingDsl::new().parse_yaml(ORDERS).unwrap();
        let document = report.document;
        assert!(report.warnings.is_empty());
        assert_eq!(document.name, "orders");
        assert_eq!(document.data_sources[1].role, DataSourceRole::Target);
        assert_eq!(document.data_sources[1].option("pretty"), Some("true"));

        let first = &document.mappings[0];
        assert_eq!(first.kind, MappingKind::Map);
        assert_eq!(first.inputs[0].actions.len(), 2);
        assert_eq!(first.inputs[0].actions[1].parameter("string"), Some("!"));

        let collection = &document.mappings[1];
        assert_eq!(collection.kind, MappingKind::Collection);
        assert_eq!(collection.mappings[0].outputs[0].field_type, FieldType::Integer);
        assert_eq!(document.lookup_tables[0].entries[0].target_value, "Red");
    }

    #[test]
    fn test_unknown_actions_are_dropped_with_warning() {
        let yaml = r"
name: drops
mappings:
  - id: m1
    kind: MAP
    inputs:
      - path: /a
        actions: [trim, frobnicate]
    outputs:
      - path: /b
        actions:
          - name: teleport
            parameters:
              to: mars
";
        let report = MappingDsl::new().parse_yaml(yaml).unwrap();
        let mapping = &report.document.mappings[0];
        assert_eq!(mapping.inputs[0].actions.len(), 1);
        assert!(mapping.outputs[0].actions.is_empty());

        assert_eq!(report.warnings.len(), 2);
        assert_eq!(report.warnings[0].scope, Scope::Mapping);
        assert_eq!(report.warnings[0].id.as_deref(), Some("m1"));
        assert_eq!(report.warnings[0].path.as_deref(), Some("/a"));
        assert!(report.warnings[1].message.contains("teleport"));
    }

    #[test]
    fn test_malformed_path_fails_load() {
        let yaml = r"
name: broken
mappings:
  - kind: MAP
    inputs:
      - path: /a/@b/c
    outputs:
      - path: /x
";
        let err = MappingDsl::new().parse_yaml(yaml).unwrap_err();
        assert!(matches!(err, LoadError::Path(_)));
    }

    #[test]
    fn test_yaml_syntax_error_has_location() {
        let err = MappingDsl::new().parse_yaml("name: [unclosed").unwrap_err();
        assert!(matches!(err, LoadError::Parse { line: Some(_), .. }));
    }

    #[test]
    fn test_json_and_yaml_agree() {
        let dsl = MappingDsl::new();
        let from_yaml = dsl.parse_yaml(ORDERS).unwrap().document;
        let json = MappingDsl::to_json(&from_yaml).unwrap();
        let from_json = dsl.parse_json(&json).unwrap().document;
        assert_eq!(from_yaml, from_json);

        let yaml = MappingDsl::to_yaml(&from_json).unwrap();
        assert_eq!(dsl.parse_yaml(&yaml).unwrap().document, from_yaml);
    }
}
