//! Format-specific data source rules

use crate::engine::{Construct, ConstructKind, ValidationContext, Validator};
use crate::rules::{MAX_INDEX, duplicates};
use docmap_model::{DataSource, Scope, Status, ValidationEntry};

fn data_source<'a>(target: Construct<'a>, format: &str) -> Option<&'a DataSource> {
    match target {
        Construct::DataSource(ds) if ds.format.eq_ignore_ascii_case(format) => Some(ds),
        _ => None,
    }
}

/// Namespace declarations of XML data sources
pub struct XmlDataSourceValidator;

impl Validator for XmlDataSourceValidator {
    fn name(&self) -> &'static str {
        "xml-data-source"
    }

    fn supports(&self, kind: ConstructKind) -> bool {
        kind == ConstructKind::DataSource
    }

    fn validate(
        &self,
        target: Construct<'_>,
        _context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        _id: Option<&str>,
        status: Status,
    ) {
        let Some(ds) = data_source(target, "xml") else {
            return;
        };
        for namespace in &ds.namespaces {
            if namespace.uri.trim().is_empty() {
                let prefix = if namespace.prefix.is_empty() {
                    "(default)"
                } else {
                    namespace.prefix.as_str()
                };
                sink.push(
                    ValidationEntry::new(
                        Scope::DataSource,
                        status,
                        format!("Namespace '{prefix}' has an empty URI"),
                    )
                    .with_id(ds.id.as_str()),
                );
            }
        }
        let prefixes = ds.namespaces.iter().map(|ns| ns.prefix.as_str());
        for prefix in duplicates(prefixes) {
            sink.push(
                ValidationEntry::new(
                    Scope::DataSource,
                    status,
                    format!("Namespace prefix '{prefix}' is declared more than once"),
                )
                .with_id(ds.id.as_str()),
            );
        }
    }
}

/// Reader options of CSV data sources
pub struct CsvDataSourceValidator;

impl Validator for CsvDataSourceValidator {
    fn name(&self) -> &'static str {
        "csv-data-source"
    }

    fn supports(&self, kind: ConstructKind) -> bool {
        kind == ConstructKind::DataSource
    }

    fn validate(
        &self,
        target: Construct<'_>,
        _context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        _id: Option<&str>,
        status: Status,
    ) {
        let Some(ds) = data_source(target, "csv") else {
            return;
        };
        if let Some(delimiter) = ds.option("delimiter") {
            if delimiter.chars().count() != 1 || !delimiter.is_ascii() {
                sink.push(
                    ValidationEntry::new(
                        Scope::DataSource,
                        status,
                        format!("CSV delimiter '{delimiter}' must be a single ASCII character"),
                    )
                    .with_id(ds.id.as_str()),
                );
            }
        }
        if let Some(skip_rows) = ds.option("skipRows") {
            let in_range = skip_rows
                .trim()
                .parse::<u32>()
                .is_ok_and(|rows| rows < MAX_INDEX);
            if !in_range {
                sink.push(
                    ValidationEntry::new(
                        Scope::DataSource,
                        status,
                        format!("CSV skipRows '{skip_rows}' must be an integer in 0..{MAX_INDEX}"),
                    )
                    .with_id(ds.id.as_str()),
                );
            }
        }
    }
}
