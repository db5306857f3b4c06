//! Validation engine
//!
//! The engine walks every construct of a mapping document and offers it to
//! each registered [`Validator`] that supports the construct's kind.

use docmap_model::{
    DataSource, Field, LookupTable, Mapping, MappingDocument, Scope, Status, ValidationEntry,
};
use docmap_transform::TypeConversionRegistry;
use std::sync::Arc;
use tracing::debug;

use crate::formats::{CsvDataSourceValidator, XmlDataSourceValidator};
use crate::rules::{
    DataSourceValidator, FieldValidator, LookupTableValidator, MappingValidator,
    NamedValueValidator,
};

/// Strictness level for validation
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StrictnessLevel {
    /// Warnings are reported as errors
    Strict,
    /// Entries are reported as produced
    #[default]
    Moderate,
    /// Warnings are dropped
    Lenient,
}

/// Validation configuration
#[derive(Debug, Clone)]
pub struct ValidationConfig {
    /// Strictness level
    pub strictness: StrictnessLevel,
    /// Maximum errors recorded before further errors are discarded (0 = unlimited)
    pub max_errors: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            strictness: StrictnessLevel::Moderate,
            max_errors: 0,
        }
    }
}

/// Kinds of mapping document construct a validator can target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConstructKind {
    Document,
    DataSource,
    LookupTable,
    Mapping,
    Field,
}

/// A construct handed to a validator
#[derive(Debug, Clone, Copy)]
pub enum Construct<'a> {
    Document(&'a MappingDocument),
    DataSource(&'a DataSource),
    LookupTable(&'a LookupTable),
    Mapping(&'a Mapping),
    Field(&'a Field),
}

impl Construct<'_> {
    /// Kind of this construct.
    #[must_use]
    pub fn kind(&self) -> ConstructKind {
        match self {
            Construct::Document(_) => ConstructKind::Document,
            Construct::DataSource(_) => ConstructKind::DataSource,
            Construct::LookupTable(_) => ConstructKind::LookupTable,
            Construct::Mapping(_) => ConstructKind::Mapping,
            Construct::Field(_) => ConstructKind::Field,
        }
    }
}

/// Read-only context shared by validators
#[derive(Debug, Clone, Copy)]
pub struct ValidationContext<'a> {
    /// Document under validation
    pub document: &'a MappingDocument,
    /// Conversions available at execution time
    pub conversions: &'a TypeConversionRegistry,
}

/// A pluggable validation rule
pub trait Validator: Send + Sync {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Whether this validator handles constructs of `kind`.
    fn supports(&self, kind: ConstructKind) -> bool;

    /// Check `target`, pushing entries into `sink`. `id` names the construct
    /// and `status` is the severity to use for violations.
    fn validate(
        &self,
        target: Construct<'_>,
        context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        id: Option<&str>,
        status: Status,
    );
}

/// Validation result
#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    entries: Vec<ValidationEntry>,
    errors: usize,
    warnings: usize,
}

impl ValidationResult {
    /// Create an empty result.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an entry.
    pub fn push(&mut self, entry: ValidationEntry) {
        match entry.status {
            Status::Error => self.errors += 1,
            Status::Warn => self.warnings += 1,
            Status::Info => {}
        }
        self.entries.push(entry);
    }

    /// All entries in the order they were produced.
    #[must_use]
    pub fn entries(&self) -> &[ValidationEntry] {
        &self.entries
    }

    /// Take the entries.
    #[must_use]
    pub fn into_entries(self) -> Vec<ValidationEntry> {
        self.entries
    }

    /// Whether any error was recorded.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Whether any warning was recorded.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }

    /// Number of errors.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Number of warnings.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Entries scoped to `scope`.
    pub fn in_scope(&self, scope: Scope) -> impl Iterator<Item = &ValidationEntry> {
        self.entries.iter().filter(move |e| e.scope == scope)
    }
}

/// Dispatches every construct of a mapping document to the registered
/// validators
pub struct ValidationEngine {
    config: ValidationConfig,
    conversions: Arc<TypeConversionRegistry>,
    validators: Vec<Box<dyn Validator>>,
}

impl ValidationEngine {
    /// Create an engine with the core and format-specific validators and the
    /// default conversions.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(ValidationConfig::default())
    }

    /// Create with specific configuration
    #[must_use]
    pub fn with_config(config: ValidationConfig) -> Self {
        Self {
            config,
            conversions: Arc::new(TypeConversionRegistry::with_defaults()),
            validators: vec![
                Box::new(DataSourceValidator),
                Box::new(XmlDataSourceValidator),
                Box::new(CsvDataSourceValidator),
                Box::new(LookupTableValidator),
                Box::new(NamedValueValidator),
                Box::new(MappingValidator),
                Box::new(FieldValidator),
            ],
        }
    }

    /// Check conversions against `conversions` instead of the defaults.
    #[must_use]
    pub fn with_conversions(mut self, conversions: Arc<TypeConversionRegistry>) -> Self {
        self.conversions = conversions;
        self
    }

    /// Register an additional validator.
    #[must_use]
    pub fn with_validator(mut self, validator: Box<dyn Validator>) -> Self {
        self.validators.push(validator);
        self
    }

    /// Validate a mapping document. Never touches any bound document.
    #[must_use]
    pub fn validate(&self, document: &MappingDocument) -> ValidationResult {
        let context = ValidationContext {
            document,
            conversions: &self.conversions,
        };
        let mut sink = Vec::new();

        self.dispatch(Construct::Document(document), &context, &mut sink, Some(&document.name));
        for data_source in &document.data_sources {
            self.dispatch(
                Construct::DataSource(data_source),
                &context,
                &mut sink,
                Some(&data_source.id),
            );
        }
        for table in &document.lookup_tables {
            self.dispatch(Construct::LookupTable(table), &context, &mut sink, Some(&table.name));
        }
        for mapping in &document.mappings {
            self.dispatch_mapping(mapping, &context, &mut sink);
        }

        let mut result = ValidationResult::new();
        for entry in sink {
            self.record(&mut result, entry);
        }
        debug!(
            document = %document.name,
            errors = result.error_count(),
            warnings = result.warning_count(),
            "Validated mapping document"
        );
        result
    }

    fn dispatch_mapping(
        &self,
        mapping: &Mapping,
        context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
    ) {
        let id = mapping.id.as_deref();
        self.dispatch(Construct::Mapping(mapping), context, sink, id);
        for field in mapping.inputs.iter().chain(&mapping.outputs) {
            self.dispatch(Construct::Field(field), context, sink, id);
        }
        for nested in &mapping.mappings {
            self.dispatch_mapping(nested, context, sink);
        }
    }

    fn dispatch(
        &self,
        target: Construct<'_>,
        context: &ValidationContext<'_>,
        sink: &mut Vec<ValidationEntry>,
        id: Option<&str>,
    ) {
        let kind = target.kind();
        for validator in self.validators.iter().filter(|v| v.supports(kind)) {
            let before = sink.len();
            validator.validate(target, context, sink, id, Status::Error);
            if sink.len() > before {
                debug!(
                    validator = validator.name(),
                    ?kind,
                    entries = sink.len() - before,
                    "Validator reported entries"
                );
            }
        }
    }

    fn record(&self, result: &mut ValidationResult, mut entry: ValidationEntry) {
        match (self.config.strictness, entry.status) {
            (StrictnessLevel::Strict, Status::Warn) => entry.status = Status::Error,
            (StrictnessLevel::Lenient, Status::Warn) => return,
            _ => {}
        }
        if entry.status == Status::Error
            && self.config.max_errors > 0
            && result.error_count() >= self.config.max_errors
        {
            return;
        }
        result.push(entry);
    }
}

impl Default for ValidationEngine {
    fn default() -> Self {
        Self::new()
    }
}
