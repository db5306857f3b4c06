//! Mapping execution engine
//!
//! [`MappingEngine`] walks a mapping document against the documents bound in
//! a [`MappingSession`]. Each mapping is dispatched by kind; a failure on a
//! single field is recorded as an `Error` audit and execution moves on. Only
//! document-level failures (lifecycle hooks, unbound documents) end the run
//! with an `Err`.

use crate::error::{EngineError, FieldError, Result};
use crate::properties::PropertiesAdapter;
use crate::session::{ExecutionPhase, MappingContext, MappingSession};
use docmap_model::{
    AdapterError, AdapterResult, Audit, DataSourceRole, DocumentAdapter, Field, FieldNode,
    LookupEntry, LookupTable, Mapping, MappingDocument, MappingKind, Path, Repetition, Scalar,
    Scope,
};
use docmap_transform::{ActionRegistry, TypeConversionRegistry};
use docmap_validation::{ValidationEngine, ValidationResult};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, trace, warn};

/// Engine configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Run the validators before executing
    pub prevalidate: bool,

    /// Skip execution when pre-validation reports errors
    pub abort_on_validation_error: bool,

    /// Delimiter for separate and combine mappings that declare none
    pub default_delimiter: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            prevalidate: true,
            abort_on_validation_error: false,
            default_delimiter: " ".to_string(),
        }
    }
}

impl EngineConfig {
    /// Create the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn prevalidate(mut self, prevalidate: bool) -> Self {
        self.prevalidate = prevalidate;
        self
    }

    #[must_use]
    pub fn abort_on_validation_error(mut self, abort: bool) -> Self {
        self.abort_on_validation_error = abort;
        self
    }

    #[must_use]
    pub fn default_delimiter(mut self, delimiter: impl Into<String>) -> Self {
        self.default_delimiter = delimiter.into();
        self
    }
}

/// A field-level failure and where it happened
struct Failure {
    doc_id: Option<String>,
    path: Option<String>,
    error: FieldError,
}

impl Failure {
    fn at(doc_id: &str, path: &Path, error: impl Into<FieldError>) -> Self {
        Self {
            doc_id: Some(doc_id.to_string()),
            path: Some(path.format()),
            error: error.into(),
        }
    }

    fn shape(message: impl Into<String>) -> Self {
        Self {
            doc_id: None,
            path: None,
            error: FieldError::Shape(message.into()),
        }
    }
}

type Step<T> = std::result::Result<T, Failure>;

/// A resolved field reference: document id plus context-adjusted path
struct Resolved<'m> {
    field: &'m Field,
    doc_id: String,
    path: Path,
}

/// Executes mapping documents
pub struct MappingEngine {
    config: EngineConfig,
    conversions: Arc<TypeConversionRegistry>,
    actions: Arc<ActionRegistry>,
    validation: ValidationEngine,
}

impl fmt::Debug for MappingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MappingEngine")
            .field("config", &self.config)
            .field("actions", &self.actions)
            .finish_non_exhaustive()
    }
}

impl MappingEngine {
    /// Create an engine with the default conversions, the built-in actions,
    /// and the standard validators.
    #[must_use]
    pub fn new() -> Self {
        let conversions = Arc::new(TypeConversionRegistry::with_defaults());
        Self {
            config: EngineConfig::default(),
            validation: ValidationEngine::new().with_conversions(Arc::clone(&conversions)),
            conversions,
            actions: Arc::new(ActionRegistry::with_builtins()),
        }
    }

    #[must_use]
    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    /// Use `conversions` for execution and for validation.
    #[must_use]
    pub fn with_conversions(mut self, conversions: Arc<TypeConversionRegistry>) -> Self {
        self.validation = self.validation.with_conversions(Arc::clone(&conversions));
        self.conversions = conversions;
        self
    }

    #[must_use]
    pub fn with_actions(mut self, actions: Arc<ActionRegistry>) -> Self {
        self.actions = actions;
        self
    }

    /// Replace the validation engine. Its conversions are not touched.
    #[must_use]
    pub fn with_validation(mut self, validation: ValidationEngine) -> Self {
        self.validation = validation;
        self
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Action registry used for field actions.
    #[must_use]
    pub fn actions(&self) -> &Arc<ActionRegistry> {
        &self.actions
    }

    /// Validate `document` without touching any bound document.
    #[must_use]
    pub fn validate(&self, document: &MappingDocument) -> ValidationResult {
        self.validation.validate(document)
    }

    /// Execute `document` against the documents bound in `session`.
    ///
    /// # Errors
    ///
    /// Returns `UnboundDocument` when a mapping references a document id
    /// with no bound adapter, and `Document` when a lifecycle hook fails.
    /// Field-level failures are recorded as audits instead.
    pub fn execute(&self, document: &MappingDocument, session: &mut MappingSession) -> Result<()> {
        session.mark_started();
        debug!(
            document = %document.name,
            mappings = document.mappings.len(),
            "Executing mapping document"
        );

        if self.config.prevalidate {
            session.set_phase(ExecutionPhase::PreValidation);
            let result = self.validate(document);
            let failed = result.has_errors();
            session.extend_validations(result.into_entries());
            if failed && self.config.abort_on_validation_error {
                warn!(
                    document = %document.name,
                    errors = session.error_count(),
                    "Pre-validation failed; skipping execution"
                );
                session.set_phase(ExecutionPhase::Done);
                session.mark_finished();
                return Ok(());
            }
        }

        self.bind_named_values(document, session);
        check_bindings(document, session)?;

        session.set_phase(ExecutionPhase::PreSourceExec);
        run_hooks(session, DataSourceRole::Source, |a| a.pre_source_execution())?;
        run_hooks(session, DataSourceRole::Target, |a| a.pre_target_execution())?;

        for mapping in &document.mappings {
            self.dispatch(document, mapping, session);
        }

        session.set_phase(ExecutionPhase::PostSourceExec);
        run_hooks(session, DataSourceRole::Source, |a| a.post_source_execution())?;
        session.set_phase(ExecutionPhase::PostTargetExec);
        run_hooks(session, DataSourceRole::Target, |a| a.post_target_execution())?;

        session.set_phase(ExecutionPhase::PostValidation);
        debug!(
            document = %document.name,
            mappings = session.mappings_executed(),
            fields = session.fields_written(),
            errors = session.error_count(),
            warnings = session.warning_count(),
            "Execution finished"
        );
        session.set_phase(ExecutionPhase::Done);
        session.mark_finished();
        Ok(())
    }

    fn bind_named_values(&self, document: &MappingDocument, session: &mut MappingSession) {
        let constants = PropertiesAdapter::constants(document, &self.conversions);
        session.bind_if_absent(DataSourceRole::Source, Box::new(constants));
        let properties =
            PropertiesAdapter::properties(document, session.properties(), &self.conversions);
        session.bind_if_absent(DataSourceRole::Source, Box::new(properties));
    }

    fn dispatch(
        &self,
        document: &MappingDocument,
        mapping: &Mapping,
        session: &mut MappingSession,
    ) {
        session.record_mapping();
        debug!(
            mapping = %mapping.label(),
            kind = %mapping.kind,
            depth = session.context_depth(),
            "Dispatching mapping"
        );
        let outcome = match mapping.kind {
            MappingKind::Map => self.map(document, mapping, session, None),
            MappingKind::Lookup => match lookup_table(document, mapping, session) {
                Ok(table) => self.map(document, mapping, session, Some(table)),
                Err(failure) => Err(failure),
            },
            MappingKind::Separate => self.separate(mapping, session),
            MappingKind::Combine => self.combine(mapping, session),
            MappingKind::Collection => self.collection(document, mapping, session),
        };
        if let Err(failure) = outcome {
            record(session, mapping, failure);
        }
    }

    /// Map and lookup: one input to one output, element-wise when the input
    /// is a collection.
    fn map(
        &self,
        document: &MappingDocument,
        mapping: &Mapping,
        session: &mut MappingSession,
        table: Option<&LookupTable>,
    ) -> Step<()> {
        let (input, output) = single_pair(mapping, session)?;
        let table = match table {
            Some(table) => Some(table),
            None => match &mapping.lookup_table_name {
                Some(name) => Some(find_table(document, name)?),
                None => None,
            },
        };

        session.set_phase(ExecutionPhase::ReadSource);
        let Some(node) = read(session, &input.doc_id, &input.path)? else {
            debug!(doc_id = %input.doc_id, path = %input.path, "Source field absent; skipping");
            return Ok(());
        };

        match node {
            FieldNode::Field(field) => {
                let target = output.path.clone();
                self.populate(session, &input, &output, target, field.value, table)
            }
            FieldNode::Group(group) if has_open_repetition(&input.path) => {
                let node = FieldNode::Group(group);
                let leaves: Vec<Field> = node.leaves().into_iter().cloned().collect();
                let source_open = open_positions(&input.path);
                if open_positions(&output.path).is_empty() {
                    let Some(last) = leaves.last() else {
                        return Ok(());
                    };
                    session.add_audit(
                        Audit::warn(
                            Scope::Mapping,
                            format!(
                                "Collection source {} has {} elements but target path {} \
                                 is not a collection; writing the last element",
                                input.path,
                                leaves.len(),
                                output.path
                            ),
                        )
                        .with_id(mapping.label())
                        .with_doc_id(output.doc_id.as_str())
                        .with_path(output.path.format()),
                    );
                    let (target, value) = (output.path.clone(), last.value.clone());
                    return self.populate(session, &input, &output, target, value, table);
                }
                for (ordinal, leaf) in (0u32..).zip(&leaves) {
                    let target = correlate(&source_open, &leaf.path, ordinal, &output.path);
                    if let Err(failure) =
                        self.populate(session, &input, &output, target, leaf.value.clone(), table)
                    {
                        record(session, mapping, failure);
                    }
                }
                Ok(())
            }
            FieldNode::Group(_) => Err(Failure::at(
                &input.doc_id,
                &input.path,
                FieldError::Shape(
                    "source resolved to a complex value; map its fields or use a collection mapping"
                        .to_string(),
                ),
            )),
        }
    }

    /// Run actions, lookup, and conversion on one value and write it.
    fn populate(
        &self,
        session: &mut MappingSession,
        input: &Resolved<'_>,
        output: &Resolved<'_>,
        target: Path,
        value: Option<Scalar>,
        table: Option<&LookupTable>,
    ) -> Step<()> {
        let value = self.coerce(input, value)?;
        session.set_phase(ExecutionPhase::ApplyActions);
        let value = self
            .actions
            .apply(value, &input.field.actions)
            .map_err(|e| Failure::at(&input.doc_id, &input.path, e))?;

        let value = match table {
            Some(table) => match self.substitute(table, value.as_ref()) {
                Ok(Some(found)) => Some(found),
                Ok(None) => {
                    debug!(
                        table = %table.name,
                        path = %input.path,
                        "No lookup entry matched; output left unset"
                    );
                    return Ok(());
                }
                Err(e) => return Err(Failure::at(&output.doc_id, &target, e)),
            },
            None => value,
        };

        self.finish(session, output, target, value)
    }

    /// Convert to the output type, run the output's actions, and write.
    fn finish(
        &self,
        session: &mut MappingSession,
        output: &Resolved<'_>,
        target: Path,
        value: Option<Scalar>,
    ) -> Step<()> {
        let field_type = output.field.field_type;
        let value = match value {
            Some(value) if field_type.is_scalar() => Some(
                self.conversions
                    .convert_to(&value, field_type)
                    .map_err(|e| Failure::at(&output.doc_id, &target, e))?,
            ),
            other => other,
        };
        let value = self
            .actions
            .apply(value, &output.field.actions)
            .map_err(|e| Failure::at(&output.doc_id, &target, e))?;

        session.set_phase(ExecutionPhase::PopulateTarget);
        let field = Field::new(output.doc_id.clone(), target.clone())
            .with_type(field_type)
            .with_optional_value(value);
        write(session, &output.doc_id, &target, &field.into())
    }

    fn substitute(
        &self,
        table: &LookupTable,
        value: Option<&Scalar>,
    ) -> std::result::Result<Option<Scalar>, FieldError> {
        let Some(value) = value else {
            return Ok(None);
        };
        let Some(entry) = table.entries.iter().find(|e| self.lookup_matches(e, value)) else {
            return Ok(None);
        };
        let raw = Scalar::from(entry.target_value.as_str());
        if entry.target_type.is_scalar() {
            Ok(Some(self.conversions.convert_to(&raw, entry.target_type)?))
        } else {
            Ok(Some(raw))
        }
    }

    /// Compare `value` with an entry's source side, both taken as the
    /// entry's source type.
    fn lookup_matches(&self, entry: &LookupEntry, value: &Scalar) -> bool {
        if !entry.source_type.is_scalar() {
            return value.render() == entry.source_value;
        }
        let Ok(actual) = self.conversions.convert_to(value, entry.source_type) else {
            return false;
        };
        let declared = Scalar::from(entry.source_value.as_str());
        match self.conversions.convert_to(&declared, entry.source_type) {
            Ok(expected) => actual == expected,
            Err(_) => actual.render() == entry.source_value,
        }
    }

    /// Convert a value read from a source to the type its field declares.
    fn coerce(&self, input: &Resolved<'_>, value: Option<Scalar>) -> Step<Option<Scalar>> {
        let field_type = input.field.field_type;
        match value {
            Some(value) if field_type.is_scalar() && value.field_type() != field_type => self
                .conversions
                .convert_to(&value, field_type)
                .map(Some)
                .map_err(|e| Failure::at(&input.doc_id, &input.path, e)),
            other => Ok(other),
        }
    }

    fn separate(&self, mapping: &Mapping, session: &mut MappingSession) -> Step<()> {
        let [input] = mapping.inputs.as_slice() else {
            return Err(Failure::shape("SEPARATE mapping needs exactly one input"));
        };
        let input = resolve(session, input, DataSourceRole::Source);

        session.set_phase(ExecutionPhase::ReadSource);
        let value = match read(session, &input.doc_id, &input.path)? {
            Some(FieldNode::Field(field)) => field.value,
            Some(FieldNode::Group(_)) => {
                return Err(Failure::at(
                    &input.doc_id,
                    &input.path,
                    FieldError::Shape("separate input must be a single value".to_string()),
                ));
            }
            None => return Ok(()),
        };

        let value = self.coerce(&input, value)?;
        session.set_phase(ExecutionPhase::ApplyActions);
        let value = self
            .actions
            .apply(value, &input.field.actions)
            .map_err(|e| Failure::at(&input.doc_id, &input.path, e))?;
        let Some(value) = value else {
            debug!(path = %input.path, "Separate input is null; skipping");
            return Ok(());
        };

        let text = value.render();
        let delimiter = self.delimiter(mapping);
        let parts: Vec<&str> = if delimiter.is_empty() {
            vec![text.as_str()]
        } else {
            text.split(delimiter).collect()
        };
        let count = parts.len();

        for (position, declared) in (0u32..).zip(&mapping.outputs) {
            let requested = declared.index.unwrap_or(position);
            let Some(part) = usize::try_from(requested).ok().and_then(|i| parts.get(i)) else {
                session.add_audit(
                    Audit::warn(
                        Scope::Field,
                        format!(
                            "Separate returned fewer segments count={count} \
                             when outputField.path={} requested index={requested}",
                            declared.path
                        ),
                    )
                    .with_id(mapping.label())
                    .with_doc_id(session.resolve_doc_id(&declared.doc_id, DataSourceRole::Target))
                    .with_path(declared.path.format()),
                );
                continue;
            };
            let output = resolve(session, declared, DataSourceRole::Target);
            let target = output.path.clone();
            if let Err(failure) = self.finish(session, &output, target, Some(Scalar::from(*part))) {
                record(session, mapping, failure);
            }
        }
        Ok(())
    }

    fn combine(&self, mapping: &Mapping, session: &mut MappingSession) -> Step<()> {
        let [output] = mapping.outputs.as_slice() else {
            return Err(Failure::shape("COMBINE mapping needs exactly one output"));
        };
        if mapping.inputs.is_empty() {
            return Err(Failure::shape("COMBINE mapping needs at least one input"));
        }

        session.set_phase(ExecutionPhase::ReadSource);
        let mut parts = Vec::with_capacity(mapping.inputs.len());
        for declared in &mapping.inputs {
            let input = resolve(session, declared, DataSourceRole::Source);
            let value = match read(session, &input.doc_id, &input.path)? {
                Some(FieldNode::Field(field)) => field.value,
                Some(FieldNode::Group(_)) => {
                    return Err(Failure::at(
                        &input.doc_id,
                        &input.path,
                        FieldError::Shape("combine input must be a single value".to_string()),
                    ));
                }
                None => None,
            };
            let value = self.coerce(&input, value)?;
            session.set_phase(ExecutionPhase::ApplyActions);
            let value = self
                .actions
                .apply(value, &input.field.actions)
                .map_err(|e| Failure::at(&input.doc_id, &input.path, e))?;
            // Null keeps its slot so delimiters stay positional.
            parts.push(value.map(|v| v.render()).unwrap_or_default());
        }

        let joined = parts.join(self.delimiter(mapping));
        let output = resolve(session, output, DataSourceRole::Target);
        let target = output.path.clone();
        self.finish(session, &output, target, Some(Scalar::String(joined)))
    }

    fn collection(
        &self,
        document: &MappingDocument,
        mapping: &Mapping,
        session: &mut MappingSession,
    ) -> Step<()> {
        let (input, output) = single_pair(mapping, session)?;
        let (source_position, source_collection) = collection_path(&input)?;
        let (target_position, target_collection) = collection_path(&output)?;

        session.set_phase(ExecutionPhase::ReadSource);
        let Some(node) = read(session, &input.doc_id, &source_collection)? else {
            debug!(
                doc_id = %input.doc_id,
                path = %source_collection,
                "Source collection absent; skipping"
            );
            return Ok(());
        };
        let source_repetition = &source_collection.segments()[source_position].repetition;
        let elements: Vec<(u32, FieldNode)> = match (source_repetition, node) {
            (Repetition::Unindexed, FieldNode::Group(group)) => (0u32..)
                .zip(group.children())
                .map(|(position, child)| (child.index().unwrap_or(position), child.clone()))
                .collect(),
            (repetition, node) => vec![(repetition.index().or(node.index()).unwrap_or(0), node)],
        };

        let open_target =
            target_collection.segments()[target_position].repetition == Repetition::Unindexed;
        // Highest index in the target so far; every allocation lands above it.
        let mut highest: Option<u32> = if open_target {
            let size = session
                .adapter(&output.doc_id)
                .map_or(Ok(0), |adapter| adapter.collection_size(&target_collection))
                .unwrap_or_else(|e| {
                    debug!(
                        doc_id = %output.doc_id,
                        path = %target_collection,
                        error = %e,
                        "Target collection size unknown; starting at 0"
                    );
                    0
                });
            size.checked_sub(1)
        } else {
            None
        };

        debug!(
            mapping = %mapping.label(),
            source = %source_collection,
            target = %target_collection,
            elements = elements.len(),
            "Replaying collection mapping"
        );
        for (source_index, element) in elements {
            let target_index = if open_target {
                let index = Path::next_vacant_index(highest.as_slice());
                highest = Some(index);
                index
            } else {
                source_index
            };
            session.push_context(MappingContext {
                mapping: mapping.label(),
                source_doc: input.doc_id.clone(),
                source_collection: Some(source_collection.clone()),
                source_index: Some(source_index),
                target_doc: output.doc_id.clone(),
                target_collection: Some(target_collection.clone()),
                target_index: Some(target_index),
                source_field: Some(element),
                lookup_table: mapping.lookup_table_name.clone(),
            });
            for nested in &mapping.mappings {
                self.dispatch(document, nested, session);
            }
            session.pop_context();
        }
        Ok(())
    }

    fn delimiter<'a>(&'a self, mapping: &'a Mapping) -> &'a str {
        mapping
            .delimiter
            .as_deref()
            .unwrap_or(&self.config.default_delimiter)
    }
}

impl Default for MappingEngine {
    fn default() -> Self {
        Self::new()
    }
}

fn record(session: &mut MappingSession, mapping: &Mapping, failure: Failure) {
    debug!(mapping = %mapping.label(), error = %failure.error, "Field skipped");
    let mut audit = Audit::error(Scope::Field, failure.error.to_string()).with_id(mapping.label());
    if let Some(doc_id) = failure.doc_id {
        audit = audit.with_doc_id(doc_id);
    }
    if let Some(path) = failure.path {
        audit = audit.with_path(path);
    }
    session.add_audit(audit);
}

fn resolve<'m>(session: &MappingSession, field: &'m Field, role: DataSourceRole) -> Resolved<'m> {
    let doc_id = session.resolve_doc_id(&field.doc_id, role);
    let path = match role {
        DataSourceRole::Source => session.rebase_source(&doc_id, &field.path),
        DataSourceRole::Target => session.rebase_target(&doc_id, &field.path),
    };
    Resolved { field, doc_id, path }
}

fn single_pair<'m>(
    mapping: &'m Mapping,
    session: &MappingSession,
) -> Step<(Resolved<'m>, Resolved<'m>)> {
    match (mapping.inputs.as_slice(), mapping.outputs.as_slice()) {
        ([input], [output]) => Ok((
            resolve(session, input, DataSourceRole::Source),
            resolve(session, output, DataSourceRole::Target),
        )),
        _ => Err(Failure::shape(format!(
            "{} mapping needs exactly one input and one output",
            mapping.kind
        ))),
    }
}

fn lookup_table<'d>(
    document: &'d MappingDocument,
    mapping: &Mapping,
    session: &MappingSession,
) -> Step<&'d LookupTable> {
    let name = mapping
        .lookup_table_name
        .clone()
        .or_else(|| session.current_context().and_then(|c| c.lookup_table.clone()))
        .ok_or_else(|| Failure::shape("LOOKUP mapping names no lookup table"))?;
    find_table(document, &name)
}

fn find_table<'d>(document: &'d MappingDocument, name: &str) -> Step<&'d LookupTable> {
    document
        .lookup_table(name)
        .ok_or_else(|| Failure::shape(format!("Lookup table '{name}' not found")))
}

fn read(session: &MappingSession, doc_id: &str, path: &Path) -> Step<Option<FieldNode>> {
    // Inside a collection, the current element already holds its own subtree.
    if let Some(node) = session
        .current_context()
        .filter(|frame| frame.source_doc == doc_id)
        .and_then(|frame| frame.source_field.as_ref())
        .and_then(|element| element.find(path))
    {
        trace!(doc_id, path = %path, "Read from current collection element");
        return Ok(Some(node.clone()));
    }
    let adapter = session.adapter(doc_id).ok_or_else(|| unbound(doc_id, path))?;
    match adapter.read(path) {
        Ok(node) => Ok(node),
        Err(AdapterError::NotFound { .. }) => Ok(None),
        Err(e) => Err(Failure::at(doc_id, path, e)),
    }
}

fn write(session: &mut MappingSession, doc_id: &str, path: &Path, node: &FieldNode) -> Step<()> {
    session.set_phase(ExecutionPhase::WriteTarget);
    let adapter = session.adapter_mut(doc_id).ok_or_else(|| unbound(doc_id, path))?;
    adapter.write(path, node).map_err(|e| Failure::at(doc_id, path, e))?;
    session.record_write();
    Ok(())
}

fn unbound(doc_id: &str, path: &Path) -> Failure {
    let message = format!("No document bound for id '{doc_id}'");
    Failure::at(doc_id, path, FieldError::Shape(message))
}

fn run_hooks<F>(session: &mut MappingSession, role: DataSourceRole, hook: F) -> Result<()>
where
    F: Fn(&mut (dyn DocumentAdapter + 'static)) -> AdapterResult<()>,
{
    for doc_id in session.doc_ids(role) {
        if let Some(adapter) = session.adapter_mut(&doc_id) {
            hook(adapter).map_err(|e| EngineError::document(doc_id.clone(), e))?;
        }
    }
    Ok(())
}

/// Every document id a mapping field refers to must be bound.
fn check_bindings(document: &MappingDocument, session: &MappingSession) -> Result<()> {
    fn visit(mapping: &Mapping, session: &MappingSession) -> Result<()> {
        let fields = mapping
            .inputs
            .iter()
            .map(|f| (f, DataSourceRole::Source))
            .chain(mapping.outputs.iter().map(|f| (f, DataSourceRole::Target)));
        for (field, role) in fields {
            let doc_id = session.resolve_doc_id(&field.doc_id, role);
            if !session.is_bound(&doc_id) {
                return Err(EngineError::UnboundDocument(doc_id));
            }
        }
        mapping.mappings.iter().try_for_each(|nested| visit(nested, session))
    }
    document.mappings.iter().try_for_each(|mapping| visit(mapping, session))
}

fn is_open(repetition: &Repetition) -> bool {
    match repetition {
        Repetition::Unindexed => true,
        Repetition::MapKeyed(key) => key.is_empty(),
        _ => false,
    }
}

fn open_positions(path: &Path) -> Vec<usize> {
    path.segments()
        .iter()
        .enumerate()
        .filter(|(_, segment)| is_open(&segment.repetition))
        .map(|(position, _)| position)
        .collect()
}

fn has_open_repetition(path: &Path) -> bool {
    path.segments().iter().any(|s| is_open(&s.repetition))
}

/// The path up to and including the collection a collection mapping
/// iterates: the last open segment, else the last repeating one.
fn collection_path(field: &Resolved<'_>) -> Step<(usize, Path)> {
    let position = open_positions(&field.path)
        .last()
        .copied()
        .or_else(|| field.path.last_collection_position())
        .ok_or_else(|| {
            Failure::at(
                &field.doc_id,
                &field.path,
                FieldError::Shape("collection mapping path has no repeating segment".to_string()),
            )
        })?;
    if matches!(field.path.segments()[position].repetition, Repetition::MapKeyed(_)) {
        return Err(Failure::at(
            &field.doc_id,
            &field.path,
            AdapterError::unsupported(
                &field.path,
                "collection mappings iterate lists, not keyed maps",
            ),
        ));
    }
    let collection = Path::new(field.path.segments()[..=position].to_vec())
        .map_err(|e| Failure::at(&field.doc_id, &field.path, FieldError::Shape(e.to_string())))?;
    Ok((position, collection))
}

/// Target path for one element of a collection source: open target
/// segments take the element's coordinates, pairing innermost first.
fn correlate(source_open: &[usize], element: &Path, ordinal: u32, target: &Path) -> Path {
    let mut coordinates = source_open
        .iter()
        .rev()
        .map(|&position| element.segments().get(position).map(|s| s.repetition.clone()));
    let mut correlated = target.clone();
    for position in open_positions(target).into_iter().rev() {
        let coordinate = coordinates.next().flatten();
        let repetition = match (&target.segments()[position].repetition, coordinate) {
            (Repetition::MapKeyed(_), Some(Repetition::MapKeyed(key))) if !key.is_empty() => {
                Repetition::MapKeyed(key)
            }
            (Repetition::MapKeyed(_), Some(Repetition::Indexed(index))) => {
                Repetition::MapKeyed(index.to_string())
            }
            (Repetition::MapKeyed(_), _) => Repetition::MapKeyed(ordinal.to_string()),
            (_, Some(Repetition::Indexed(index))) => Repetition::Indexed(index),
            (_, Some(_)) => Repetition::Indexed(ordinal),
            (_, None) => Repetition::Indexed(0),
        };
        correlated = correlated.with_repetition(position, repetition);
    }
    correlated
}
