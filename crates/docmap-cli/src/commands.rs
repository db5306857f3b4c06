//! `validate` and `map` command implementations

use crate::config::CliConfig;
use anyhow::{Context, bail};
use docmap_mapping::{AdapterRegistry, LoadReport, MappingDsl, MappingEngine, MappingSession};
use docmap_model::{Audit, DataSourceRole, Status, ValidationEntry};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Options of the `map` command
#[derive(Debug, Clone)]
pub struct MapOptions {
    pub mapping: PathBuf,
    pub sources: Vec<(String, PathBuf)>,
    pub targets: Vec<(String, PathBuf)>,
    pub properties: Vec<(String, String)>,
}

/// Split an `id=value` argument.
pub fn parse_binding(arg: &str) -> Result<(String, String), String> {
    match arg.split_once('=') {
        Some((id, value)) if !id.is_empty() && !value.is_empty() => {
            Ok((id.to_string(), value.to_string()))
        }
        _ => Err(format!("expected <id>=<value>, got '{arg}'")),
    }
}

fn load(path: &Path) -> anyhow::Result<LoadReport> {
    MappingDsl::new()
        .parse_file(path)
        .with_context(|| format!("loading mapping document {}", path.display()))
}

/// Load and validate a mapping document.
pub fn validate(mapping: &Path, config: &CliConfig) -> anyhow::Result<ExitCode> {
    let report = load(mapping)?;
    info!(mapping = %mapping.display(), "Validating mapping document");

    let engine = MappingEngine::new().with_config(config.engine.clone());
    let result = engine.validate(&report.document);

    let entries: Vec<&ValidationEntry> = report.warnings.iter().chain(result.entries()).collect();
    print_validations(&entries);
    let errors = count(entries.iter().map(|e| e.status), Status::Error);
    let warnings = count(entries.iter().map(|e| e.status), Status::Warn);
    println!("Errors: {errors}");
    println!("Warnings: {warnings}");

    if errors > 0 {
        println!("Validation failed.");
        return Ok(ExitCode::FAILURE);
    }
    if warnings == 0 {
        println!("Validation passed with no warnings.");
    } else {
        println!("Validation passed.");
    }
    Ok(ExitCode::SUCCESS)
}

/// Execute a mapping document against the given files.
pub async fn map(options: MapOptions, config: &CliConfig) -> anyhow::Result<ExitCode> {
    let report = load(&options.mapping)?;
    let mut document = report.document;
    config.apply_to(&mut document);

    for (id, _) in options.sources.iter().chain(&options.targets) {
        if document.data_source(id).is_none() {
            bail!("'{id}' is not a data source of {}", options.mapping.display());
        }
    }
    for (id, _) in &options.targets {
        if document.data_source(id).map(|s| s.role) != Some(DataSourceRole::Target) {
            bail!("'{id}' is not a target data source");
        }
    }

    let mut contents = BTreeMap::new();
    for (id, path) in &options.sources {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading source '{id}' from {}", path.display()))?;
        contents.insert(id.clone(), text);
    }

    let timeout = Duration::from_secs(config.timeout_secs());
    let engine = MappingEngine::new().with_config(config.engine.clone());
    let properties = options.properties.clone();
    info!(
        mapping = %options.mapping.display(),
        sources = options.sources.len(),
        timeout_secs = timeout.as_secs(),
        "Running mapping"
    );

    let task = tokio::task::spawn_blocking(move || -> anyhow::Result<MappingSession> {
        let mut session = MappingSession::new();
        for (name, value) in properties {
            session.set_property(name, value);
        }
        AdapterRegistry::with_defaults().bind_all(&document, &mut session, contents)?;
        engine.execute(&document, &mut session)?;
        Ok(session)
    });
    let session = tokio::time::timeout(timeout, task)
        .await
        .with_context(|| format!("mapping did not finish within {}s", timeout.as_secs()))?
        .context("mapping task failed")??;

    for (id, path) in &options.targets {
        match session.output(id) {
            Some(text) => {
                std::fs::write(path, text)
                    .with_context(|| format!("writing target '{id}' to {}", path.display()))?;
                debug!(doc_id = %id, path = %path.display(), bytes = text.len(), "Wrote target");
            }
            None => warn!(doc_id = %id, "Target produced no output"),
        }
    }

    let validations: Vec<&ValidationEntry> =
        report.warnings.iter().chain(session.validations()).collect();
    print_validations(&validations);
    print_audits(session.audits());
    println!("Mappings executed: {}", session.mappings_executed());
    println!("Fields written: {}", session.fields_written());
    println!("Errors: {}", session.error_count());
    println!("Warnings: {}", session.warning_count() + report.warnings.len());

    Ok(if session.has_errors() {
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    })
}

fn count(statuses: impl Iterator<Item = Status>, wanted: Status) -> usize {
    statuses.filter(|s| *s == wanted).count()
}

fn print_validations(entries: &[&ValidationEntry]) {
    if entries.is_empty() {
        return;
    }
    println!("Validation:");
    for entry in entries {
        println!("  {entry}");
    }
}

fn print_audits(audits: &[Audit]) {
    if audits.is_empty() {
        return;
    }
    println!("Audits:");
    for audit in audits {
        match &audit.id {
            Some(id) => println!("  {audit} [mapping={id}]"),
            None => println!("  {audit}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_binding() {
        assert_eq!(
            parse_binding("in=orders.xml").unwrap(),
            ("in".to_string(), "orders.xml".to_string())
        );
        assert_eq!(
            parse_binding("batch=a=b").unwrap(),
            ("batch".to_string(), "a=b".to_string())
        );
        assert!(parse_binding("orders.xml").is_err());
        assert!(parse_binding("=orders.xml").is_err());
    }

    #[test]
    fn test_count_statuses() {
        let statuses = [Status::Error, Status::Warn, Status::Error, Status::Info];
        assert_eq!(count(statuses.into_iter(), Status::Error), 2);
        assert_eq!(count(statuses.into_iter(), Status::Warn), 1);
    }
}
