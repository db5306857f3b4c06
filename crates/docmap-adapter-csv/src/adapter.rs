//! CSV document adapter
//!
//! A CSV document is an anonymous collection of records. Paths take the
//! shape `/<records><>/<column>` or `/<records><n>/<column>`; the first
//! segment names the record collection and the second a column by header
//! name (or zero-based position when the document has no header).

use crate::config::CsvConfig;
use crate::reader::CsvReader;
use crate::table::CsvTable;
use crate::writer::CsvWriter;
use docmap_model::{
    AdapterError, AdapterResult, CollectionType, DocumentAdapter, Field, FieldGroup, FieldNode,
    FieldType, Path, PathSegment, Repetition, Scalar,
};
use tracing::{debug, trace};

/// Adapter over a single CSV document
#[derive(Debug, Clone)]
pub struct CsvAdapter {
    doc_id: String,
    config: CsvConfig,
    input: Option<String>,
    table: Option<CsvTable>,
    output: Option<String>,
}

enum Rows {
    All,
    One(usize),
}

impl CsvAdapter {
    /// Create an adapter for `doc_id` with an empty table.
    pub fn new(doc_id: impl Into<String>) -> Self {
        Self {
            doc_id: doc_id.into(),
            config: CsvConfig::default(),
            input: None,
            table: None,
            output: None,
        }
    }

    /// Set the configuration.
    #[must_use]
    pub fn with_config(mut self, config: CsvConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the adapter with CSV text, parsed before the first read or write.
    #[must_use]
    pub fn with_input(mut self, input: impl Into<String>) -> Self {
        self.input = Some(input.into());
        self.table = None;
        self
    }

    /// The table, once materialized.
    #[must_use]
    pub fn table(&self) -> Option<&CsvTable> {
        self.table.as_ref()
    }

    fn materialize(&mut self) -> AdapterResult<()> {
        if self.table.is_some() {
            return Ok(());
        }
        let table = match &self.input {
            Some(text) => CsvReader::new()
                .with_config(self.config.clone())
                .read(text)
                .map_err(|e| e.into_adapter_error(&self.doc_id))?,
            None => CsvTable::default(),
        };
        debug!(doc_id = %self.doc_id, rows = table.len(), "Materialized CSV document");
        self.table = Some(table);
        Ok(())
    }

    fn rows(path: &Path) -> AdapterResult<Rows> {
        match &path.root().repetition {
            Repetition::Unindexed => Ok(Rows::All),
            Repetition::Indexed(index) => Ok(Rows::One(*index as usize)),
            Repetition::None => Err(AdapterError::unsupported(
                path,
                "CSV records must be addressed as a collection",
            )),
            Repetition::MapKeyed(_) => Err(AdapterError::unsupported(
                path,
                "CSV records cannot be keyed",
            )),
        }
    }

    fn column<'a>(path: &'a Path) -> AdapterResult<&'a PathSegment> {
        match path.segments() {
            [_, column] if !column.repetition.is_collection() => Ok(column),
            [_, _] => Err(AdapterError::unsupported(path, "CSV columns cannot repeat")),
            _ => Err(AdapterError::unsupported(
                path,
                "CSV paths take the form /<records><>/<column>",
            )),
        }
    }

    fn cell_field(&self, path: &Path, row: usize, cell: Option<&str>) -> Field {
        let index = u32::try_from(row).unwrap_or(u32::MAX);
        Field::new(self.doc_id.as_str(), path.with_index(0, index))
            .with_type(FieldType::String)
            .with_optional_value(cell.map(Scalar::from))
            .with_index(index)
    }

    fn row_group(&self, table: &CsvTable, path: &Path, row: usize) -> FieldGroup {
        let index = u32::try_from(row).unwrap_or(u32::MAX);
        let row_path = path.with_index(0, index);
        let mut group = FieldGroup::new(
            Field::new(self.doc_id.as_str(), row_path.clone())
                .with_type(FieldType::Complex)
                .with_index(index),
        );
        for (position, header) in table.headers().iter().enumerate() {
            let segment = PathSegment::element(header.as_str());
            let Ok(cell_path) = row_path.with_appended_segment(segment) else {
                continue;
            };
            let cell = table.cell(row, position).flatten();
            group.push(
                Field::new(self.doc_id.as_str(), cell_path)
                    .with_type(FieldType::String)
                    .with_optional_value(cell.map(Scalar::from)),
            );
        }
        group
    }

    fn write_cell(
        &mut self,
        path: &Path,
        row: Option<usize>,
        node: &FieldNode,
    ) -> AdapterResult<()> {
        let column = Self::column(path)?.name.clone();
        let value = match node {
            FieldNode::Field(field) => field.value.as_ref().map(Scalar::render),
            FieldNode::Group(_) => {
                return Err(AdapterError::unwritable(path, "a CSV cell holds a single value"));
            }
        };
        let Some(table) = self.table.as_mut() else {
            return Err(AdapterError::unwritable(path, "document not materialized"));
        };
        let row = row.unwrap_or(table.len());
        AdapterError::check_index(path, u32::try_from(row).unwrap_or(u32::MAX))?;
        let position = table.ensure_column(&column);
        trace!(row, column = %column, "Writing CSV cell");
        table.set(row, position, value);
        Ok(())
    }
}

impl DocumentAdapter for CsvAdapter {
    fn doc_id(&self) -> &str {
        &self.doc_id
    }

    fn read(&self, path: &Path) -> AdapterResult<Option<FieldNode>> {
        let rows = Self::rows(path)?;
        let Some(table) = &self.table else {
            return Ok(None);
        };

        if path.len() == 1 {
            return Ok(match rows {
                Rows::One(row) if row < table.len() => {
                    Some(self.row_group(table, path, row).into())
                }
                Rows::One(_) => None,
                Rows::All => {
                    let mut group = FieldGroup::new(
                        Field::new(self.doc_id.as_str(), path.clone())
                            .with_type(FieldType::Complex)
                            .with_collection_type(CollectionType::List),
                    );
                    for row in 0..table.len() {
                        group.push(self.row_group(table, path, row));
                    }
                    Some(group.into())
                }
            });
        }

        let column = Self::column(path)?;
        let Some(position) = table.column_index(&column.name) else {
            return Ok(None);
        };
        match rows {
            Rows::One(row) => Ok(table
                .cell(row, position)
                .map(|cell| FieldNode::from(self.cell_field(path, row, cell)))),
            Rows::All => {
                let mut group = FieldGroup::new(
                    Field::new(self.doc_id.as_str(), path.clone())
                        .with_type(FieldType::String)
                        .with_collection_type(CollectionType::List),
                );
                for row in 0..table.len() {
                    let cell = table.cell(row, position).flatten();
                    group.push(self.cell_field(path, row, cell));
                }
                Ok(Some(group.into()))
            }
        }
    }

    fn write(&mut self, path: &Path, value: &FieldNode) -> AdapterResult<()> {
        self.materialize()?;
        let rows = Self::rows(path)?;
        if path.len() == 1 {
            return Err(AdapterError::unwritable(path, "write a column, not a whole record"));
        }
        match (rows, value) {
            (Rows::One(row), node) => self.write_cell(path, Some(row), node),
            (Rows::All, FieldNode::Group(group)) => {
                let start = self.table.as_ref().map_or(0, CsvTable::len);
                for (position, child) in group.children().iter().enumerate() {
                    let row = child.index().map_or(start + position, |i| i as usize);
                    self.write_cell(path, Some(row), child)?;
                }
                Ok(())
            }
            (Rows::All, node) => self.write_cell(path, None, node),
        }
    }

    fn collection_size(&self, path: &Path) -> AdapterResult<u32> {
        Self::rows(path)?;
        let rows = self.table.as_ref().map_or(0, CsvTable::len);
        Ok(u32::try_from(rows).unwrap_or(u32::MAX))
    }

    fn pre_source_execution(&mut self) -> AdapterResult<()> {
        self.materialize()
    }

    fn pre_target_execution(&mut self) -> AdapterResult<()> {
        self.materialize()
    }

    fn post_target_execution(&mut self) -> AdapterResult<()> {
        self.materialize()?;
        let Some(table) = &self.table else {
            return Ok(());
        };
        let text = CsvWriter::new()
            .with_config(self.config.clone())
            .write_to_string(table)
            .map_err(|e| e.into_adapter_error(&self.doc_id))?;
        debug!(doc_id = %self.doc_id, bytes = text.len(), "Serialized CSV document");
        self.output = Some(text);
        Ok(())
    }

    fn output(&self) -> Option<&str> {
        self.output.as_deref()
    }
}
