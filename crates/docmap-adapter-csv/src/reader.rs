//! CSV reader

use crate::config::CsvConfig;
use crate::errors::CsvResult;
use crate::table::CsvTable;
use tracing::debug;

/// Reader for CSV text
#[derive(Debug, Clone, Default)]
pub struct CsvReader {
    config: CsvConfig,
}

impl CsvReader {
    /// Create a new CSV reader
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration
    #[must_use]
    pub fn with_config(mut self, config: CsvConfig) -> Self {
        self.config = config;
        self
    }

    /// Read `input` into a table. Without a header row, columns are named by
    /// their zero-based position.
    ///
    /// # Errors
    ///
    /// Returns `CsvError::Read` for malformed input.
    pub fn read(&self, input: &str) -> CsvResult<CsvTable> {
        let mut reader = csv::ReaderBuilder::new()
            .delimiter(self.config.delimiter_u8())
            .quote(self.config.quote_char_u8())
            .escape(self.config.escape_char.map(|_| self.config.escape_char_u8()))
            .double_quote(self.config.escape_char.is_none())
            .has_headers(false)
            .flexible(true)
            .from_reader(input.as_bytes());

        let mut records = reader.records().skip(self.config.skip_rows);

        let mut table = if self.config.has_header {
            match records.next() {
                Some(header) => CsvTable::new(header?.iter().map(str::to_string).collect()),
                None => CsvTable::default(),
            }
        } else {
            CsvTable::default()
        };

        let null = &self.config.null_representation;
        let mut width = table.headers().len();
        for record in records {
            let record = record?;
            width = width.max(record.len());
            table.push_row(
                record
                    .iter()
                    .map(|cell| (!null.matches(cell)).then(|| cell.to_string()))
                    .collect(),
            );
        }

        if !self.config.has_header {
            for position in 0..width {
                table.ensure_column(&position.to_string());
            }
        }

        debug!(
            columns = table.headers().len(),
            rows = table.len(),
            "Read CSV table"
        );
        Ok(table)
    }
}
