//! Per-execution mapping state
//!
//! A [`MappingSession`] owns the documents bound for one execution, the
//! context stack used while replaying nested collection mappings, and the
//! audits and validation entries produced along the way.

use chrono::{DateTime, Utc};
use docmap_model::{
    Audit, DEFAULT_SOURCE_DOC_ID, DEFAULT_TARGET_DOC_ID, DataSourceRole, DocumentAdapter,
    FieldNode, Path, Status, ValidationEntry, is_reserved_doc_id,
};
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, trace};

/// Engine state machine, in execution order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ExecutionPhase {
    Created,
    PreValidation,
    PreSourceExec,
    ReadSource,
    ApplyActions,
    PopulateTarget,
    WriteTarget,
    PostSourceExec,
    PostTargetExec,
    PostValidation,
    Done,
}

impl fmt::Display for ExecutionPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Created => "created",
            Self::PreValidation => "pre-validation",
            Self::PreSourceExec => "pre-source-exec",
            Self::ReadSource => "read-source",
            Self::ApplyActions => "apply-actions",
            Self::PopulateTarget => "populate-target",
            Self::WriteTarget => "write-target",
            Self::PostSourceExec => "post-source-exec",
            Self::PostTargetExec => "post-target-exec",
            Self::PostValidation => "post-validation",
            Self::Done => "done",
        };
        f.write_str(name)
    }
}

/// One frame of the context stack
///
/// Pushed when a collection mapping starts replaying its nested mappings for
/// one element, popped when that element is done.
#[derive(Debug, Clone, Default)]
pub struct MappingContext {
    /// Label of the collection mapping that pushed the frame
    pub mapping: String,

    /// Source document and collection being iterated
    pub source_doc: String,
    pub source_collection: Option<Path>,
    pub source_index: Option<u32>,

    /// Target document and collection being populated
    pub target_doc: String,
    pub target_collection: Option<Path>,
    pub target_index: Option<u32>,

    /// Current source element
    pub source_field: Option<FieldNode>,

    /// Lookup table in effect for the frame
    pub lookup_table: Option<String>,
}

impl MappingContext {
    /// Create an empty frame for `mapping`.
    pub fn new(mapping: impl Into<String>) -> Self {
        Self {
            mapping: mapping.into(),
            ..Self::default()
        }
    }

    /// Rewrite a nested source path onto the current source element.
    #[must_use]
    pub fn source_path(&self, doc_id: &str, path: &Path) -> Path {
        rebase(doc_id, path, &self.source_doc, self.source_collection.as_ref(), self.source_index)
    }

    /// Rewrite a nested target path onto the current target element.
    #[must_use]
    pub fn target_path(&self, doc_id: &str, path: &Path) -> Path {
        rebase(doc_id, path, &self.target_doc, self.target_collection.as_ref(), self.target_index)
    }
}

fn rebase(
    doc_id: &str,
    path: &Path,
    frame_doc: &str,
    collection: Option<&Path>,
    index: Option<u32>,
) -> Path {
    match (collection, index) {
        (Some(collection), Some(index)) if doc_id == frame_doc => path
            .with_collection_index(collection, index)
            .unwrap_or_else(|| path.clone()),
        _ => path.clone(),
    }
}

struct BoundDocument {
    role: DataSourceRole,
    adapter: Box<dyn DocumentAdapter>,
}

/// State for a single execution
pub struct MappingSession {
    documents: BTreeMap<String, BoundDocument>,
    context_stack: Vec<MappingContext>,
    audits: Vec<Audit>,
    validations: Vec<ValidationEntry>,
    errors: usize,
    warnings: usize,
    phase: ExecutionPhase,
    started_at: Option<DateTime<Utc>>,
    finished_at: Option<DateTime<Utc>>,
    properties: BTreeMap<String, String>,
    mappings_executed: usize,
    fields_written: usize,
}

impl fmt::Debug for MappingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingSession")
            .field("documents", &self.documents.keys().collect::<Vec<_>>())
            .field("phase", &self.phase)
            .field("audits", &self.audits.len())
            .field("validations", &self.validations.len())
            .field("errors", &self.errors)
            .field("warnings", &self.warnings)
            .finish_non_exhaustive()
    }
}

impl MappingSession {
    /// Create an empty session.
    #[must_use]
    pub fn new() -> Self {
        Self {
            documents: BTreeMap::new(),
            context_stack: Vec::new(),
            audits: Vec::new(),
            validations: Vec::new(),
            errors: 0,
            warnings: 0,
            phase: ExecutionPhase::Created,
            started_at: None,
            finished_at: None,
            properties: BTreeMap::new(),
            mappings_executed: 0,
            fields_written: 0,
        }
    }

    /// Bind `adapter` under its own document id, replacing any previous
    /// binding for that id.
    pub fn bind(&mut self, role: DataSourceRole, adapter: Box<dyn DocumentAdapter>) -> &mut Self {
        let doc_id = adapter.doc_id().to_string();
        debug!(doc_id = %doc_id, ?role, "Binding document");
        self.documents.insert(doc_id, BoundDocument { role, adapter });
        self
    }

    /// Bind a source document.
    pub fn bind_source(&mut self, adapter: impl DocumentAdapter + 'static) -> &mut Self {
        self.bind(DataSourceRole::Source, Box::new(adapter))
    }

    /// Bind a target document.
    pub fn bind_target(&mut self, adapter: impl DocumentAdapter + 'static) -> &mut Self {
        self.bind(DataSourceRole::Target, Box::new(adapter))
    }

    pub(crate) fn bind_if_absent(
        &mut self,
        role: DataSourceRole,
        adapter: Box<dyn DocumentAdapter>,
    ) {
        if !self.is_bound(adapter.doc_id()) {
            self.bind(role, adapter);
        }
    }

    /// Whether a document is bound under `doc_id`.
    #[must_use]
    pub fn is_bound(&self, doc_id: &str) -> bool {
        self.documents.contains_key(doc_id)
    }

    /// Role of the document bound under `doc_id`.
    #[must_use]
    pub fn role_of(&self, doc_id: &str) -> Option<DataSourceRole> {
        self.documents.get(doc_id).map(|d| d.role)
    }

    /// Ids of the documents bound with `role`, in id order.
    #[must_use]
    pub fn doc_ids(&self, role: DataSourceRole) -> Vec<String> {
        self.documents
            .iter()
            .filter(|(_, bound)| bound.role == role)
            .map(|(id, _)| id.clone())
            .collect()
    }

    /// Adapter bound under `doc_id`.
    #[must_use]
    pub fn adapter(&self, doc_id: &str) -> Option<&dyn DocumentAdapter> {
        self.documents.get(doc_id).map(|d| d.adapter.as_ref())
    }

    /// Mutable adapter bound under `doc_id`.
    pub fn adapter_mut(&mut self, doc_id: &str) -> Option<&mut (dyn DocumentAdapter + 'static)> {
        self.documents.get_mut(doc_id).map(|d| d.adapter.as_mut())
    }

    /// Resolve a field's document id. An empty id selects the single bound
    /// document of `role`, or the default id for that role when zero or
    /// several are bound.
    #[must_use]
    pub fn resolve_doc_id(&self, doc_id: &str, role: DataSourceRole) -> String {
        if !doc_id.is_empty() {
            return doc_id.to_string();
        }
        let mut candidates = self
            .documents
            .iter()
            .filter(|(id, bound)| bound.role == role && !is_reserved_doc_id(id));
        match (candidates.next(), candidates.next()) {
            (Some((id, _)), None) => id.clone(),
            _ => match role {
                DataSourceRole::Source => DEFAULT_SOURCE_DOC_ID.to_string(),
                DataSourceRole::Target => DEFAULT_TARGET_DOC_ID.to_string(),
            },
        }
    }

    /// Serialized output of a target document, once execution finished.
    #[must_use]
    pub fn output(&self, doc_id: &str) -> Option<&str> {
        self.adapter(doc_id).and_then(|adapter| adapter.output())
    }

    /// Set a runtime property; it overrides a document property of the
    /// same name.
    pub fn set_property(&mut self, name: impl Into<String>, value: impl Into<String>) -> &mut Self {
        self.properties.insert(name.into(), value.into());
        self
    }

    /// Runtime properties.
    #[must_use]
    pub fn properties(&self) -> &BTreeMap<String, String> {
        &self.properties
    }

    pub(crate) fn push_context(&mut self, context: MappingContext) {
        trace!(mapping = %context.mapping, depth = self.context_stack.len() + 1, "Pushing context");
        self.context_stack.push(context);
    }

    pub(crate) fn pop_context(&mut self) -> Option<MappingContext> {
        self.context_stack.pop()
    }

    /// Innermost context frame, if a collection mapping is in flight.
    #[must_use]
    pub fn current_context(&self) -> Option<&MappingContext> {
        self.context_stack.last()
    }

    /// Rewrite a source path through every frame, outermost first.
    #[must_use]
    pub fn rebase_source(&self, doc_id: &str, path: &Path) -> Path {
        self.context_stack
            .iter()
            .fold(path.clone(), |path, frame| frame.source_path(doc_id, &path))
    }

    /// Rewrite a target path through every frame, outermost first.
    #[must_use]
    pub fn rebase_target(&self, doc_id: &str, path: &Path) -> Path {
        self.context_stack
            .iter()
            .fold(path.clone(), |path, frame| frame.target_path(doc_id, &path))
    }

    /// Depth of the context stack.
    #[must_use]
    pub fn context_depth(&self) -> usize {
        self.context_stack.len()
    }

    /// Append an audit.
    pub fn add_audit(&mut self, audit: Audit) {
        self.count(audit.status);
        trace!(status = %audit.status, message = %audit.message, "Audit");
        self.audits.push(audit);
    }

    /// Append a validation entry.
    pub fn add_validation(&mut self, entry: ValidationEntry) {
        self.count(entry.status);
        self.validations.push(entry);
    }

    /// Append several validation entries.
    pub fn extend_validations(&mut self, entries: impl IntoIterator<Item = ValidationEntry>) {
        for entry in entries {
            self.add_validation(entry);
        }
    }

    fn count(&mut self, status: Status) {
        match status {
            Status::Error => self.errors += 1,
            Status::Warn => self.warnings += 1,
            Status::Info => {}
        }
    }

    /// Audits in the order they were raised.
    #[must_use]
    pub fn audits(&self) -> &[Audit] {
        &self.audits
    }

    /// Validation entries in the order they were raised.
    #[must_use]
    pub fn validations(&self) -> &[ValidationEntry] {
        &self.validations
    }

    /// Whether any audit or validation entry is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.errors > 0
    }

    /// Whether any audit or validation entry is a warning.
    #[must_use]
    pub fn has_warnings(&self) -> bool {
        self.warnings > 0
    }

    /// Number of error audits and validation entries.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors
    }

    /// Number of warning audits and validation entries.
    #[must_use]
    pub fn warning_count(&self) -> usize {
        self.warnings
    }

    /// Current phase.
    #[must_use]
    pub fn phase(&self) -> ExecutionPhase {
        self.phase
    }

    pub(crate) fn set_phase(&mut self, phase: ExecutionPhase) {
        if self.phase != phase {
            debug!(from = %self.phase, to = %phase, "Execution phase");
            self.phase = phase;
        }
    }

    pub(crate) fn mark_started(&mut self) {
        self.started_at = Some(Utc::now());
        self.finished_at = None;
    }

    pub(crate) fn mark_finished(&mut self) {
        self.finished_at = Some(Utc::now());
    }

    /// When execution started.
    #[must_use]
    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// When execution finished.
    #[must_use]
    pub fn finished_at(&self) -> Option<DateTime<Utc>> {
        self.finished_at
    }

    /// Number of mappings dispatched, nested replays included.
    #[must_use]
    pub fn mappings_executed(&self) -> usize {
        self.mappings_executed
    }

    /// Number of successful field writes.
    #[must_use]
    pub fn fields_written(&self) -> usize {
        self.fields_written
    }

    pub(crate) fn record_mapping(&mut self) {
        self.mappings_executed += 1;
    }

    pub(crate) fn record_write(&mut self) {
        self.fields_written += 1;
    }
}

impl Default for MappingSession {
    fn default() -> Self {
        Self::new()
    }
}
