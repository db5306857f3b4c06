//! Read-only pseudo-documents exposing a mapping document's constants and
//! properties
//!
//! Each named value is addressed as `/<name>` and read typed per its declared
//! field type.

use docmap_model::{
    AdapterError, AdapterResult, CONSTANTS_DOC_ID, DocumentAdapter, Field, FieldNode, FieldType,
    MappingDocument, PROPERTIES_DOC_ID, Path, Repetition, Scalar,
};
use docmap_transform::TypeConversionRegistry;
use std::collections::BTreeMap;
use tracing::warn;

/// Adapter over a fixed set of named values
#[derive(Debug, Clone)]
pub struct PropertiesAdapter {
    doc_id: String,
    values: BTreeMap<String, Scalar>,
}

impl PropertiesAdapter {
    /// Pseudo-document for the document's constants.
    #[must_use]
    pub fn constants(document: &MappingDocument, conversions: &TypeConversionRegistry) -> Self {
        let mut adapter = Self::empty(CONSTANTS_DOC_ID);
        for constant in &document.constants {
            adapter.insert(&constant.name, &constant.value, constant.field_type, conversions);
        }
        adapter
    }

    /// Pseudo-document for the document's properties, with `overrides`
    /// replacing declared values of the same name. An override for an
    /// undeclared name is exposed as a string.
    #[must_use]
    pub fn properties(
        document: &MappingDocument,
        overrides: &BTreeMap<String, String>,
        conversions: &TypeConversionRegistry,
    ) -> Self {
        let mut adapter = Self::empty(PROPERTIES_DOC_ID);
        for property in &document.properties {
            let value = overrides.get(&property.name).unwrap_or(&property.value);
            adapter.insert(&property.name, value, property.field_type, conversions);
        }
        for (name, value) in overrides {
            if !adapter.values.contains_key(name) {
                adapter.insert(name, value, FieldType::String, conversions);
            }
        }
        adapter
    }

    fn empty(doc_id: &str) -> Self {
        Self {
            doc_id: doc_id.to_string(),
            values: BTreeMap::new(),
        }
    }

    fn insert(
        &mut self,
        name: &str,
        raw: &str,
        field_type: FieldType,
        conversions: &TypeConversionRegistry,
    ) {
        let text = Scalar::from(raw);
        let value = if field_type.is_scalar() {
            conversions.convert_to(&text, field_type).unwrap_or_else(|e| {
                warn!(
                    doc_id = %self.doc_id,
                    entry = name,
                    %field_type,
                    error = %e,
                    "Keeping named value as text"
                );
                text
            })
        } else {
            text
        };
        self.values.insert(name.to_string(), value);
    }

    /// Value stored under `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scalar> {
        self.values.get(name)
    }

    /// Number of named values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Whether no values are exposed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl DocumentAdapter for PropertiesAdapter {
    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn read(&self, path: &Path) -> AdapterResult<Option<FieldNode>> {
        let root = path.root();
        if path.len() != 1 || root.is_attribute || root.repetition != Repetition::None {
            return Err(AdapterError::unsupported(path, "named values are addressed as /<name>"));
        }
        Ok(self.values.get(&root.qualified_name()).map(|value| {
            Field::new(self.doc_id.clone(), path.clone())
                .with_type(value.field_type())
                .with_value(value.clone())
                .into()
        }))
    }

    fn write(&mut self, path: &Path, _value: &FieldNode) -> AdapterResult<()> {
        Err(AdapterError::unwritable(path, format!("'{}' is read-only", self.doc_id)))
    }

    fn collection_size(&self, path: &Path) -> AdapterResult<u32> {
        Err(AdapterError::unsupported(path, "named values are not collections"))
    }
}
