use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("temporary file should be created");
    path
}

fn run_validate(mapping: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_docmap"))
        .args(["validate", "--mapping", mapping.to_string_lossy().as_ref()])
        .output()
        .expect("docmap validate should execute")
}

fn assert_exit_code(output: &Output, expected: i32) {
    let actual = output.status.code().unwrap_or(-1);
    assert_eq!(
        actual,
        expected,
        "unexpected exit code; stdout: {}; stderr: {}",
        String::from_utf8_lossy(&output.stdout),
        String::from_utf8_lossy(&output.stderr)
    );
}

#[test]
fn validate_returns_success_for_clean_document() {
    let dir = TempDir::new().unwrap();
    let mapping = write(
        &dir,
        "mapping.yaml",
        r"
name: clean
dataSources:
  - { id: in, role: SOURCE, format: json }
  - { id: out, role: TARGET, format: xml }
mappings:
  - kind: MAP
    inputs: [{ docId: in, path: /name }]
    outputs: [{ docId: out, path: /person/@name }]
",
    );
    let output = run_validate(&mapping);

    assert_exit_code(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Errors: 0"));
    assert!(stdout.contains("Warnings: 0"));
    assert!(stdout.contains("Validation passed with no warnings."));
}

#[test]
fn validate_reports_errors() {
    let dir = TempDir::new().unwrap();
    let mapping = write(
        &dir,
        "mapping.yaml",
        r"
name: broken
dataSources:
  - { id: in, role: SOURCE, format: json }
mappings:
  - id: lookup-missing
    kind: LOOKUP
    lookupTableName: nowhere
    inputs: [{ docId: in, path: /code }]
    outputs: [{ docId: out, path: /color }]
",
    );
    let output = run_validate(&mapping);

    assert_exit_code(&output, 1);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[ERROR]"));
    assert!(stdout.contains("(id=lookup-missing)"));
    assert!(stdout.contains("Validation failed."));
}

#[test]
fn validate_reports_dropped_actions_as_warnings() {
    let dir = TempDir::new().unwrap();
    let mapping = write(
        &dir,
        "mapping.json",
        r#"{
  "name": "json-document",
  "dataSources": [
    {"id": "in", "role": "SOURCE", "format": "json"},
    {"id": "out", "role": "TARGET", "format": "json"}
  ],
  "mappings": [
    {
      "kind": "MAP",
      "inputs": [{"docId": "in", "path": "/a", "actions": ["trim", "shout"]}],
      "outputs": [{"docId": "out", "path": "/b"}]
    }
  ]
}"#,
    );
    let output = run_validate(&mapping);

    assert_exit_code(&output, 0);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[WARN]"));
    assert!(stdout.contains("shout"));
    assert!(stdout.contains("Validation passed."));
}

#[test]
fn validate_fails_on_malformed_path() {
    let dir = TempDir::new().unwrap();
    let mapping = write(
        &dir,
        "mapping.yaml",
        r"
name: bad-path
dataSources:
  - { id: in, role: SOURCE, format: json }
mappings:
  - kind: MAP
    inputs: [{ docId: in, path: 'no-leading-slash' }]
    outputs: [{ docId: in, path: /b }]
",
    );
    let output = run_validate(&mapping);

    assert_exit_code(&output, 1);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("loading mapping document"));
}
