//! Integration tests for docmap-validation
//!
//! These tests validate complete mapping documents loaded from YAML.

use docmap_model::{
    DataSource, DataSourceRole, Field, FieldType, LookupEntry, LookupTable, Mapping,
    MappingDocument, MappingKind, Path, Scope, Status,
};
use docmap_validation::{ValidationEngine, ValidationReporter, validate};

fn field(doc_id: &str, path: &str) -> Field {
    Field::new(doc_id, Path::parse(path).expect("valid path"))
}

fn table(name: &str) -> LookupTable {
    LookupTable::new(name).with_entry(LookupEntry::new("a", "b"))
}

#[test]
fn test_duplicate_lookup_table_yields_exactly_one_error() {
    let document = MappingDocument::new("lookups")
        .with_lookup_table(table("qwerty"))
        .with_lookup_table(table("qwerty"));

    let result = validate(&document);
    let errors: Vec<_> = result
        .entries()
        .iter()
        .filter(|e| e.status == Status::Error)
        .collect();
    assert_eq!(errors.len(), 1);
    assert_eq!(errors[0].scope, Scope::LookupTables);
    assert_eq!(errors[0].id.as_deref(), Some("qwerty"));

    let fixed = MappingDocument::new("lookups").with_lookup_table(table("qwerty"));
    assert_eq!(validate(&fixed).error_count(), 0);
}

#[test]
fn test_triplicated_lookup_table_still_yields_one_error() {
    let document = MappingDocument::new("lookups")
        .with_lookup_table(table("qwerty"))
        .with_lookup_table(table("qwerty"))
        .with_lookup_table(table("qwerty"));

    assert_eq!(validate(&document).error_count(), 1);
}

#[test]
fn test_valid_yaml_document_has_no_errors() -> anyhow::Result<()> {
    let yaml = r"
name: orders
dataSources:
  - id: src
    role: SOURCE
    format: xml
    namespaces:
      - prefix: ord
        uri: urn:orders
  - id: tgt
    role: TARGET
    format: json
mappings:
  - id: order-id
    kind: MAP
    inputs:
      - docId: src
        path: /ord:orders/ord:order/@id
    outputs:
      - docId: tgt
        path: /orderId
  - id: name
    kind: SEPARATE
    inputs:
      - docId: src
        path: /ord:orders/ord:order/name
    outputs:
      - docId: tgt
        path: /first
        index: 0
      - docId: tgt
        path: /last
        index: 1
lookupTables:
  - name: colors
    entries:
      - sourceValue: R
        targetValue: Red
";
    let document: MappingDocument = serde_yaml::from_str(yaml)?;
    let result = validate(&document);

    assert!(!result.has_errors(), "{}", ValidationReporter::new().render(&result));
    Ok(())
}

#[test]
fn test_mapping_shape_and_references() {
    let document = MappingDocument::new("shapes")
        .with_data_source(DataSource::new("src", DataSourceRole::Source, "json"))
        .with_mapping(
            Mapping::new(MappingKind::Lookup)
                .with_id("lookup")
                .with_lookup_table("missing")
                .with_input(field("src", "/color"))
                .with_output(field("tgt", "/colour")),
        )
        .with_mapping(
            Mapping::new(MappingKind::Combine)
                .with_id("combine")
                .with_output(field("src", "/full")),
        );

    let result = validate(&document);
    let messages: Vec<_> = result.entries().iter().map(|e| e.message.as_str()).collect();

    assert!(messages.iter().any(|m| m.contains("'missing'")));
    assert!(messages.iter().any(|m| m.contains("unknown document 'tgt'")));
    assert!(messages.iter().any(|m| m.contains("at least one input")));
    assert_eq!(result.error_count(), 3);
}

#[test]
fn test_conversion_support_and_concerns() {
    let document = MappingDocument::new("types")
        .with_mapping(
            Mapping::new(MappingKind::Map)
                .with_id("narrowing")
                .with_input(field("", "/a").with_type(FieldType::Double))
                .with_output(field("", "/b").with_type(FieldType::Integer)),
        )
        .with_mapping(
            Mapping::new(MappingKind::Map)
                .with_id("binary")
                .with_input(field("", "/a").with_type(FieldType::ByteArray))
                .with_output(field("", "/b").with_type(FieldType::Integer)),
        );

    let result = validate(&document);

    let narrowing: Vec<_> = result
        .entries()
        .iter()
        .filter(|e| e.id.as_deref() == Some("narrowing"))
        .collect();
    assert_eq!(narrowing.len(), 2);
    assert!(narrowing.iter().all(|e| e.status == Status::Warn));

    let binary: Vec<_> = result
        .entries()
        .iter()
        .filter(|e| e.id.as_deref() == Some("binary"))
        .collect();
    assert_eq!(binary.len(), 1);
    assert_eq!(binary[0].status, Status::Error);
}

#[test]
fn test_collection_mapping_requires_collections() {
    let nested = Mapping::new(MappingKind::Map)
        .with_input(field("", "/items<>/sku"))
        .with_output(field("", "/lines<>/code"));
    let document = MappingDocument::new("collections").with_mapping(
        Mapping::new(MappingKind::Collection)
            .with_id("items")
            .with_input(field("", "/items"))
            .with_output(field("", "/lines<>"))
            .with_nested(nested),
    );

    let result = ValidationEngine::new().validate(&document);
    assert_eq!(result.error_count(), 1);
    assert!(result.entries()[0].message.contains("input path"));
}

#[test]
fn test_data_source_identity_rules() {
    let document = MappingDocument::new("sources")
        .with_data_source(DataSource::new("a b", DataSourceRole::Source, "xml"))
        .with_data_source(DataSource::new("dup", DataSourceRole::Source, "xml"))
        .with_data_source(DataSource::new("dup", DataSourceRole::Target, "json"))
        .with_data_source(DataSource::new("DOC.Constants", DataSourceRole::Source, "xml"))
        .with_data_source(DataSource::new("x".repeat(300), DataSourceRole::Source, "xml"));

    let result = validate(&document);
    assert_eq!(result.error_count(), 4);
    assert!(result.in_scope(Scope::DataSource).count() == 4);
}

#[test]
fn test_index_bounds() {
    let document = MappingDocument::new("indices").with_mapping(
        Mapping::new(MappingKind::Map)
            .with_input(field("", "/a<1000000>/b"))
            .with_output(field("", "/c").with_index(5)),
    );

    let result = validate(&document);
    assert_eq!(result.error_count(), 1);
    assert_eq!(result.entries()[0].path.as_deref(), Some("/a<1000000>/b"));
}
