//! Core validation rules

use crate::engine::{Construct, ConstructKind, ValidationContext, Validator};
use docmap_model::{
    CONSTANTS_DOC_ID, Field, FieldType, Mapping, MappingKind, PROPERTIES_DOC_ID, PathSegment,
    Scalar, Scope, Status, ValidationEntry, is_reserved_doc_id,
};
use regex::Regex;
use std::collections::HashMap;
use std::sync::LazyLock;

/// Longest accepted identifier
pub const MAX_ID_LENGTH: usize = 256;

pub use docmap_model::MAX_INDEX;

static DATA_SOURCE_ID: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z0-9_.:-]+$").ok());

/// Names occurring more than once, in order of first appearance.
pub(crate) fn duplicates<'a>(names: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order = Vec::new();
    for name in names {
        let count = counts.entry(name).or_insert(0);
        if *count == 0 {
            order.push(name);
        }
        *count += 1;
    }
    order.into_iter().filter(|name| counts[name] > 1).collect()
}

/// Validate an identifier's length, returning the problem if any.
#[must_use]
pub fn validate_id_length(id: &str) -> Option<String> {
    let length = id.chars().count();
    if length == 0 {
        Some("must not be empty".to_string())
    } else if length > MAX_ID_LENGTH {
        Some(format!("length {length} exceeds {MAX_ID_LENGTH}"))
    } else {
        None
    }
}

/// Data source identity and format
pub struct DataSourceValidator;

impl Validator for DataSourceValidator {
    fn name(&self) -> &'static str {
        "data-source"
    }

    fn supports(&self, kind: ConstructKind) -> bool {
        matches!(kind, ConstructKind::Document | ConstructKind::DataSource)
    }

    fn validate(
        &self,
        target: Construct<'_>,
        _context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        _id: Option<&str>,
        status: Status,
    ) {
        match target {
            Construct::Document(document) => {
                let ids = document.data_sources.iter().map(|ds| ds.id.as_str());
                for id in duplicates(ids) {
                    sink.push(
                        ValidationEntry::new(
                            Scope::DataSource,
                            status,
                            format!("Duplicated data source id '{id}'"),
                        )
                        .with_id(id),
                    );
                }
            }
            Construct::DataSource(data_source) => {
                let id = data_source.id.as_str();
                if let Some(problem) = validate_id_length(id) {
                    sink.push(
                        ValidationEntry::new(
                            Scope::DataSource,
                            status,
                            format!("Data source id {problem}"),
                        )
                        .with_id(id),
                    );
                } else if !DATA_SOURCE_ID.as_ref().is_some_and(|re| re.is_match(id)) {
                    sink.push(
                        ValidationEntry::new(
                            Scope::DataSource,
                            status,
                            format!("Data source id '{id}' contains invalid characters"),
                        )
                        .with_id(id),
                    );
                }
                if id == CONSTANTS_DOC_ID || id == PROPERTIES_DOC_ID {
                    sink.push(
                        ValidationEntry::new(
                            Scope::DataSource,
                            status,
                            format!("Data source id '{id}' is reserved"),
                        )
                        .with_id(id),
                    );
                }
                if data_source.format.trim().is_empty() {
                    let message = "Data source format is empty";
                    sink.push(ValidationEntry::new(Scope::DataSource, status, message).with_id(id));
                }
            }
            _ => {}
        }
    }
}

/// Lookup table names and contents
pub struct LookupTableValidator;

impl Validator for LookupTableValidator {
    fn name(&self) -> &'static str {
        "lookup-table"
    }

    fn supports(&self, kind: ConstructKind) -> bool {
        matches!(kind, ConstructKind::Document | ConstructKind::LookupTable)
    }

    fn validate(
        &self,
        target: Construct<'_>,
        _context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        _id: Option<&str>,
        status: Status,
    ) {
        match target {
            Construct::Document(document) => {
                let names = document.lookup_tables.iter().map(|t| t.name.as_str());
                for name in duplicates(names) {
                    sink.push(
                        ValidationEntry::new(
                            Scope::LookupTables,
                            status,
                            format!("Duplicated lookup table name '{name}'"),
                        )
                        .with_id(name),
                    );
                }
            }
            Construct::LookupTable(table) => {
                if let Some(problem) = validate_id_length(&table.name) {
                    sink.push(
                        ValidationEntry::new(
                            Scope::LookupTables,
                            status,
                            format!("Lookup table name {problem}"),
                        )
                        .with_id(table.name.as_str()),
                    );
                }
                if table.entries.is_empty() {
                    sink.push(
                        ValidationEntry::warn(
                            Scope::LookupTables,
                            format!("Lookup table '{}' has no entries", table.name),
                        )
                        .with_id(table.name.as_str()),
                    );
                }
            }
            _ => {}
        }
    }
}

/// Constant and property names, and their values against their declared
/// types
pub struct NamedValueValidator;

impl NamedValueValidator {
    fn check<'a>(
        scope: Scope,
        kind: &str,
        values: impl Iterator<Item = (&'a str, &'a str, FieldType)> + Clone,
        context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        status: Status,
    ) {
        for name in duplicates(values.clone().map(|(name, _, _)| name)) {
            sink.push(
                ValidationEntry::new(scope, status, format!("Duplicated {kind} name '{name}'"))
                    .with_id(name),
            );
        }
        for (name, value, field_type) in values {
            if let Some(problem) = validate_id_length(name) {
                sink.push(
                    ValidationEntry::new(scope, status, format!("{kind} name {problem}"))
                        .with_id(name),
                );
            }
            let text = Scalar::from(value);
            if let Err(e) = context.conversions.convert_to(&text, field_type) {
                sink.push(
                    ValidationEntry::new(
                        scope,
                        status,
                        format!("Value of {kind} '{name}' is not a valid {field_type}: {e}"),
                    )
                    .with_id(name),
                );
            }
        }
    }
}

impl Validator for NamedValueValidator {
    fn name(&self) -> &'static str {
        "named-value"
    }

    fn supports(&self, kind: ConstructKind) -> bool {
        kind == ConstructKind::Document
    }

    fn validate(
        &self,
        target: Construct<'_>,
        context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        _id: Option<&str>,
        status: Status,
    ) {
        let Construct::Document(document) = target else {
            return;
        };
        let constants = document
            .constants
            .iter()
            .map(|c| (c.name.as_str(), c.value.as_str(), c.field_type));
        Self::check(Scope::Constants, "constant", constants, context, sink, status);

        let properties = document
            .properties
            .iter()
            .map(|p| (p.name.as_str(), p.value.as_str(), p.field_type));
        Self::check(Scope::Properties, "property", properties, context, sink, status);
    }
}

/// Mapping shape, lookup references, and type conversions
pub struct MappingValidator;

impl MappingValidator {
    fn check_counts(mapping: &Mapping) -> Vec<String> {
        let inputs = mapping.inputs.len();
        let outputs = mapping.outputs.len();
        let mut problems = Vec::new();
        match mapping.kind {
            MappingKind::Map | MappingKind::Lookup | MappingKind::Collection => {
                if inputs != 1 {
                    problems.push(format!("expects exactly one input field, found {inputs}"));
                }
                if outputs != 1 {
                    problems.push(format!("expects exactly one output field, found {outputs}"));
                }
            }
            MappingKind::Separate => {
                if inputs != 1 {
                    problems.push(format!("expects exactly one input field, found {inputs}"));
                }
                if outputs == 0 {
                    problems.push("expects at least one output field".to_string());
                }
            }
            MappingKind::Combine => {
                if inputs == 0 {
                    problems.push("expects at least one input field".to_string());
                }
                if outputs != 1 {
                    problems.push(format!("expects exactly one output field, found {outputs}"));
                }
            }
        }
        if mapping.kind == MappingKind::Collection {
            if mapping.mappings.is_empty() {
                problems.push("has no nested mappings".to_string());
            }
            if mapping.inputs.iter().any(|f| !f.path.has_collection()) {
                problems.push("input path does not address a collection".to_string());
            }
            if mapping.outputs.iter().any(|f| !f.path.has_collection()) {
                problems.push("output path does not address a collection".to_string());
            }
        }
        if mapping.kind == MappingKind::Lookup && mapping.lookup_table_name.is_none() {
            problems.push("does not name a lookup table".to_string());
        }
        problems
    }

    /// Type pairs the engine will convert for this mapping.
    fn conversion_pairs(mapping: &Mapping) -> Vec<(FieldType, FieldType)> {
        let scalar = |t: FieldType| t.is_scalar();
        match mapping.kind {
            MappingKind::Map => mapping
                .inputs
                .first()
                .zip(mapping.outputs.first())
                .map(|(i, o)| (i.field_type, o.field_type))
                .filter(|(from, to)| scalar(*from) && scalar(*to))
                .into_iter()
                .collect(),
            MappingKind::Separate => mapping
                .outputs
                .iter()
                .map(|o| (FieldType::String, o.field_type))
                .filter(|(_, to)| scalar(*to))
                .collect(),
            MappingKind::Combine => mapping
                .outputs
                .iter()
                .map(|o| (FieldType::String, o.field_type))
                .filter(|(_, to)| scalar(*to))
                .collect(),
            MappingKind::Lookup | MappingKind::Collection => Vec::new(),
        }
    }
}

impl Validator for MappingValidator {
    fn name(&self) -> &'static str {
        "mapping"
    }

    fn supports(&self, kind: ConstructKind) -> bool {
        kind == ConstructKind::Mapping
    }

    fn validate(
        &self,
        target: Construct<'_>,
        context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        id: Option<&str>,
        status: Status,
    ) {
        let Construct::Mapping(mapping) = target else {
            return;
        };
        let label = mapping.label();

        for problem in Self::check_counts(mapping) {
            sink.push(
                ValidationEntry::new(Scope::Mapping, status, format!("{label} mapping {problem}"))
                    .with_optional_id(id),
            );
        }

        if let Some(table) = &mapping.lookup_table_name {
            if context.document.lookup_table(table).is_none() {
                sink.push(
                    ValidationEntry::new(
                        Scope::Mapping,
                        status,
                        format!("Lookup table '{table}' referenced by {label} does not exist"),
                    )
                    .with_optional_id(id),
                );
            }
        }

        for (from, to) in Self::conversion_pairs(mapping) {
            if !context.conversions.supports(from, to) {
                sink.push(
                    ValidationEntry::new(
                        Scope::Mapping,
                        status,
                        format!("Conversion from {from} to {to} is not supported"),
                    )
                    .with_optional_id(id),
                );
                continue;
            }
            for concern in context.conversions.concerns(from, to) {
                sink.push(
                    ValidationEntry::warn(
                        Scope::Mapping,
                        format!("Conversion from {from} to {to} has concern {concern}"),
                    )
                    .with_optional_id(id),
                );
            }
        }
    }
}

/// Document references and index bounds of individual fields
pub struct FieldValidator;

impl FieldValidator {
    fn is_known_doc_id(field: &Field, context: &ValidationContext<'_>) -> bool {
        field.doc_id.is_empty()
            || is_reserved_doc_id(&field.doc_id)
            || context.document.data_source(&field.doc_id).is_some()
    }
}

impl Validator for FieldValidator {
    fn name(&self) -> &'static str {
        "field"
    }

    fn supports(&self, kind: ConstructKind) -> bool {
        kind == ConstructKind::Field
    }

    fn validate(
        &self,
        target: Construct<'_>,
        context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        id: Option<&str>,
        status: Status,
    ) {
        let Construct::Field(field) = target else {
            return;
        };
        let path = field.path.format();

        if !Self::is_known_doc_id(field, context) {
            sink.push(
                ValidationEntry::new(
                    Scope::Field,
                    status,
                    format!("Field references unknown document '{}'", field.doc_id),
                )
                .with_optional_id(id)
                .with_doc_id(field.doc_id.as_str())
                .with_path(path.as_str()),
            );
        }

        let path_indices = field.path.segments().iter().filter_map(PathSegment::index);
        for index in field.index.into_iter().chain(path_indices) {
            if index >= MAX_INDEX {
                sink.push(
                    ValidationEntry::new(
                        Scope::Field,
                        status,
                        format!("Index {index} must be below {MAX_INDEX}"),
                    )
                    .with_optional_id(id)
                    .with_doc_id(field.doc_id.as_str())
                    .with_path(path.as_str()),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicates_in_first_order() {
        let names = ["b", "a", "b", "c", "a", "b"];
        assert_eq!(duplicates(names.into_iter()), vec!["b", "a"]);
        assert!(duplicates(["x", "y"].into_iter()).is_empty());
    }

    #[test]
    fn test_id_length() {
        assert!(validate_id_length("").is_some());
        assert!(validate_id_length("ok").is_none());
        assert!(validate_id_length(&"x".repeat(MAX_ID_LENGTH)).is_none());
        assert!(validate_id_length(&"x".repeat(MAX_ID_LENGTH + 1)).is_some());
    }

    #[test]
    fn test_count_rules() {
        let separate = Mapping::new(MappingKind::Separate);
        let problems = MappingValidator::check_counts(&separate);
        assert_eq!(problems.len(), 2);

        let combine = Mapping::new(MappingKind::Combine);
        assert_eq!(MappingValidator::check_counts(&combine).len(), 2);

        let collection = Mapping::new(MappingKind::Collection);
        assert_eq!(MappingValidator::check_counts(&collection).len(), 3);
    }
}
