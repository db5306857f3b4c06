//! Integration tests: mapping documents executed end to end across the XML,
//! JSON, and CSV adapters.

use anyhow::Context;
use docmap_mapping::{AdapterRegistry, MappingDsl, MappingEngine, MappingSession};
use docmap_model::{FieldNode, Path, Scope, Status};
use serde_json::{Value, json};
use std::collections::BTreeMap;

fn execute(yaml: &str, contents: &[(&str, &str)]) -> anyhow::Result<MappingSession> {
    let mut session = MappingSession::new();
    execute_in(yaml, contents, &mut session)?;
    Ok(session)
}

fn execute_in(
    yaml: &str,
    contents: &[(&str, &str)],
    session: &mut MappingSession,
) -> anyhow::Result<()> {
    let report = MappingDsl::new().parse_yaml(yaml).context("loading mapping document")?;
    let contents: BTreeMap<String, String> = contents
        .iter()
        .map(|(id, text)| ((*id).to_string(), (*text).to_string()))
        .collect();
    AdapterRegistry::with_defaults().bind_all(&report.document, session, contents)?;
    MappingEngine::new().execute(&report.document, session)?;
    Ok(())
}

fn json_output(session: &MappingSession, doc_id: &str) -> anyhow::Result<Value> {
    let text = session.output(doc_id).context("target produced no output")?;
    Ok(serde_json::from_str(text)?)
}

#[test]
fn test_separate_reports_missing_segment() -> anyhow::Result<()> {
    let yaml = r"
name: separate
dataSources:
  - { id: in, role: SOURCE, format: json }
  - { id: out, role: TARGET, format: json }
mappings:
  - id: split-name
    kind: SEPARATE
    delimiter: ' '
    inputs:
      - { docId: in, path: /name }
    outputs:
      - { docId: out, path: /title, index: 0 }
      - { docId: out, path: /middle, index: 1 }
      - { docId: out, path: /firstName, index: 2 }
      - { docId: out, path: /lastName, index: 3 }
";
    let session = execute(yaml, &[("in", r#"{"name": "Dr. Mr. Ozzie"}"#)])?;

    let warnings: Vec<_> = session
        .audits()
        .iter()
        .filter(|a| a.status == Status::Warn)
        .collect();
    assert_eq!(warnings.len(), 1);
    assert_eq!(
        warnings[0].message,
        "Separate returned fewer segments count=3 when outputField.path=/lastName requested index=3"
    );
    assert_eq!(warnings[0].id.as_deref(), Some("split-name"));
    assert!(!session.has_errors());

    assert_eq!(
        json_output(&session, "out")?,
        json!({"title": "Dr.", "middle": "Mr.", "firstName": "Ozzie"})
    );
    Ok(())
}

#[test]
fn test_combine_keeps_null_positions() -> anyhow::Result<()> {
    let yaml = r"
name: combine
dataSources:
  - { id: in, role: SOURCE, format: json }
  - { id: out, role: TARGET, format: json }
mappings:
  - kind: COMBINE
    inputs:
      - { docId: in, path: /first }
      - { docId: in, path: /middle }
      - { docId: in, path: /phone }
      - { docId: in, path: /zip }
    outputs:
      - { docId: out, path: /contact }
";
    let source = r#"{"first": "Ozzie", "middle": null, "phone": "5551212", "zip": "81111"}"#;
    let session = execute(yaml, &[("in", source)])?;

    assert!(session.audits().is_empty());
    assert_eq!(json_output(&session, "out")?, json!({"contact": "Ozzie  5551212 81111"}));
    Ok(())
}

#[test]
fn test_collection_into_unindexed_target() -> anyhow::Result<()> {
    let yaml = r"
name: orders-to-invoices
dataSources:
  - { id: orders, role: SOURCE, format: xml }
  - { id: invoices, role: TARGET, format: xml }
mappings:
  - kind: COLLECTION
    inputs:
      - { docId: orders, path: /orders/order<> }
    outputs:
      - { docId: invoices, path: /invoices/invoice<> }
    mappings:
      - kind: MAP
        inputs:
          - { docId: orders, path: /orders/order<>/@id }
        outputs:
          - { docId: invoices, path: /invoices/invoice<>/@ref }
      - kind: MAP
        inputs:
          - { docId: orders, path: /orders/order<>/total }
        outputs:
          - { docId: invoices, path: /invoices/invoice<>/amount }
";
    let source = concat!(
        r#"<orders><order id="1"><total>10</total></order>"#,
        r#"<order id="2"><total>20</total></order></orders>"#,
    );
    let session = execute(yaml, &[("orders", source)])?;

    assert!(!session.has_errors(), "{:?}", session.audits());
    assert_eq!(
        session.output("invoices"),
        Some(concat!(
            r#"<invoices><invoice ref="1"><amount>10</amount></invoice>"#,
            r#"<invoice ref="2"><amount>20</amount></invoice></invoices>"#,
        ))
    );

    let target = session.adapter("invoices").context("target bound")?;
    let refs = target
        .read(&Path::parse("/invoices/invoice<>/@ref")?)?
        .context("target collection present")?;
    let FieldNode::Group(group) = refs else {
        anyhow::bail!("expected a group");
    };
    assert_eq!(group.indices(), vec![0, 1]);
    let first = group.child_at(0).and_then(FieldNode::value).map(|v| v.render());
    assert_eq!(first, Some("1".to_string()));
    assert_eq!(session.mappings_executed(), 5);
    Ok(())
}

#[test]
fn test_nested_collections_keep_their_own_context() -> anyhow::Result<()> {
    let yaml = r"
name: nested
dataSources:
  - { id: in, role: SOURCE, format: json }
  - { id: out, role: TARGET, format: json }
mappings:
  - kind: COLLECTION
    inputs: [{ docId: in, path: /orders<> }]
    outputs: [{ docId: out, path: /out<> }]
    mappings:
      - kind: COLLECTION
        inputs: [{ docId: in, path: /orders<>/lines<> }]
        outputs: [{ docId: out, path: /out<>/items<> }]
        mappings:
          - kind: MAP
            inputs: [{ docId: in, path: /orders<>/lines<>/sku }]
            outputs: [{ docId: out, path: /out<>/items<>/code }]
";
    let source = json!({
        "orders": [
            {"lines": [{"sku": "A"}, {"sku": "B"}]},
            {"lines": [{"sku": "C"}]}
        ]
    })
    .to_string();
    let session = execute(yaml, &[("in", &source)])?;

    assert!(!session.has_errors(), "{:?}", session.audits());
    assert_eq!(
        json_output(&session, "out")?,
        json!({"out": [
            {"items": [{"code": "A"}, {"code": "B"}]},
            {"items": [{"code": "C"}]}
        ]})
    );
    assert_eq!(session.context_depth(), 0);
    Ok(())
}

#[test]
fn test_csv_rows_to_json_objects() -> anyhow::Result<()> {
    let yaml = r"
name: people
dataSources:
  - { id: people, role: SOURCE, format: csv }
  - { id: out, role: TARGET, format: json }
mappings:
  - kind: COLLECTION
    inputs: [{ docId: people, path: /rows<> }]
    outputs: [{ docId: out, path: /people<> }]
    mappings:
      - kind: MAP
        inputs: [{ docId: people, path: /rows<>/name, actions: [uppercase] }]
        outputs: [{ docId: out, path: /people<>/name }]
      - kind: MAP
        inputs: [{ docId: people, path: /rows<>/age }]
        outputs: [{ docId: out, path: /people<>/age, fieldType: INTEGER }]
";
    let session = execute(yaml, &[("people", "name,age\nJohn,30\nJane,25\n")])?;

    assert!(!session.has_errors(), "{:?}", session.audits());
    assert_eq!(
        json_output(&session, "out")?,
        json!({"people": [{"name": "JOHN", "age": 30}, {"name": "JANE", "age": 25}]})
    );
    assert_eq!(session.fields_written(), 4);
    Ok(())
}

#[test]
fn test_namespaced_attribute_write() -> anyhow::Result<()> {
    let yaml = r"
name: costs
dataSources:
  - { id: in, role: SOURCE, format: json }
  - id: out
    role: TARGET
    format: xml
    namespaces:
      - { prefix: x, uri: 'http://example.com/x/' }
mappings:
  - kind: MAP
    inputs: [{ docId: in, path: /cost }]
    outputs: [{ docId: out, path: /orders/order/@x:totalCost }]
  - kind: MAP
    inputs: [{ docId: in, path: /price }]
    outputs: [{ docId: out, path: /orders/order/@totalCost }]
";
    let session = execute(yaml, &[("in", r#"{"cost": 10, "price": 20}"#)])?;

    assert!(!session.has_errors(), "{:?}", session.audits());
    assert_eq!(
        session.output("out"),
        Some(concat!(
            r#"<orders xmlns:x="http://example.com/x/">"#,
            r#"<order x:totalCost="10" totalCost="20"/></orders>"#,
        ))
    );
    Ok(())
}

#[test]
fn test_constants_and_runtime_properties() -> anyhow::Result<()> {
    let yaml = r"
name: named-values
dataSources:
  - { id: out, role: TARGET, format: json }
constants:
  - { name: currency, value: EUR }
properties:
  - { name: batch, value: '1', fieldType: LONG }
mappings:
  - kind: MAP
    inputs: [{ docId: DOC.Constants, path: /currency }]
    outputs: [{ docId: out, path: /currency }]
  - kind: MAP
    inputs: [{ docId: DOC.Properties, path: /batch }]
    outputs: [{ docId: out, path: /batch, fieldType: LONG }]
";
    let mut session = MappingSession::new();
    session.set_property("batch", "42");
    execute_in(yaml, &[], &mut session)?;

    assert!(!session.has_errors(), "{:?}", session.audits());
    assert_eq!(json_output(&session, "out")?, json!({"currency": "EUR", "batch": 42}));
    Ok(())
}

#[test]
fn test_lookup_and_unknown_action() -> anyhow::Result<()> {
    let yaml = r"
name: colors
dataSources:
  - { id: in, role: SOURCE, format: json }
  - { id: out, role: TARGET, format: json }
lookupTables:
  - name: colors
    entries:
      - { sourceValue: R, targetValue: Red }
      - { sourceValue: G, targetValue: Green }
mappings:
  - kind: LOOKUP
    lookupTableName: colors
    inputs: [{ docId: in, path: /code, actions: [trim, sparkle] }]
    outputs: [{ docId: out, path: /color }]
";
    let report = MappingDsl::new().parse_yaml(yaml)?;
    assert_eq!(report.warnings.len(), 1);
    assert_eq!(report.warnings[0].scope, Scope::Mapping);

    let session = execute(yaml, &[("in", r#"{"code": " G "}"#)])?;
    assert!(!session.has_errors(), "{:?}", session.audits());
    assert_eq!(json_output(&session, "out")?, json!({"color": "Green"}));
    Ok(())
}

#[test]
fn test_typed_lookup_from_xml_and_json() -> anyhow::Result<()> {
    let yaml = r"
name: statuses
dataSources:
  - { id: xml, role: SOURCE, format: xml }
  - { id: json, role: SOURCE, format: json }
  - { id: out, role: TARGET, format: json }
lookupTables:
  - name: statuses
    entries:
      - { sourceType: INTEGER, sourceValue: '1', targetValue: Open }
      - { sourceType: INTEGER, sourceValue: '2', targetValue: Closed }
mappings:
  - kind: LOOKUP
    lookupTableName: statuses
    inputs: [{ docId: xml, path: /order/@status, fieldType: INTEGER }]
    outputs: [{ docId: out, path: /fromXml }]
  - kind: LOOKUP
    lookupTableName: statuses
    inputs: [{ docId: json, path: /status, fieldType: INTEGER }]
    outputs: [{ docId: out, path: /fromJson }]
";
    let session = execute(
        yaml,
        &[("xml", r#"<order status="2"/>"#), ("json", r#"{"status": 1}"#)],
    )?;

    assert!(session.audits().is_empty(), "{:?}", session.audits());
    assert_eq!(
        json_output(&session, "out")?,
        json!({"fromXml": "Closed", "fromJson": "Open"})
    );
    Ok(())
}

#[test]
fn test_xml_text_keeps_whitespace() -> anyhow::Result<()> {
    let yaml = r"
name: names
dataSources:
  - { id: in, role: SOURCE, format: xml }
  - { id: out, role: TARGET, format: json }
mappings:
  - kind: MAP
    inputs: [{ docId: in, path: /p/name }]
    outputs: [{ docId: out, path: /name }]
  - kind: MAP
    inputs: [{ docId: in, path: /p/name, actions: [trim] }]
    outputs: [{ docId: out, path: /trimmed }]
";
    let session = execute(yaml, &[("in", "<p>\n  <name>  Ozzie </name>\n</p>")])?;

    assert_eq!(
        json_output(&session, "out")?,
        json!({"name": "  Ozzie ", "trimmed": "Ozzie"})
    );
    Ok(())
}

#[test]
fn test_field_failure_does_not_stop_execution() -> anyhow::Result<()> {
    let yaml = r"
name: partial
dataSources:
  - { id: in, role: SOURCE, format: json }
  - { id: out, role: TARGET, format: xml }
mappings:
  - id: wrong-root
    kind: MAP
    inputs: [{ docId: in, path: /a }]
    outputs: [{ docId: out, path: /doc/a }]
  - id: other-root
    kind: MAP
    inputs: [{ docId: in, path: /b }]
    outputs: [{ docId: out, path: /elsewhere/b }]
";
    let session = execute(yaml, &[("in", r#"{"a": "1", "b": "2"}"#)])?;

    assert_eq!(session.error_count(), 1);
    let audit = &session.audits()[0];
    assert_eq!(audit.id.as_deref(), Some("other-root"));
    assert_eq!(audit.doc_id.as_deref(), Some("out"));
    assert_eq!(session.output("out"), Some("<doc><a>1</a></doc>"));
    Ok(())
}
