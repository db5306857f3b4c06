//! CSV writer

use crate::config::{CsvConfig, RecordTerminator};
use crate::errors::{CsvError, CsvResult};
use crate::table::CsvTable;
use std::io::Write;
use tracing::{debug, trace};

/// Writer for CSV tables
#[derive(Debug, Clone, Default)]
pub struct CsvWriter {
    config: CsvConfig,
}

impl CsvWriter {
    /// Create a new CSV writer
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

    /// Write `table`, padding every row to the header width.
    ///
    /// # Errors
    ///
    /// Returns `CsvError::Write` when the underlying writer fails.
    pub fn write<W: Write>(&self, writer: W, table: &CsvTable) -> CsvResult<()> {
        let terminator = match self.config.record_terminator {
            RecordTerminator::CRLF => csv::Terminator::CRLF,
            RecordTerminator::LF => csv::Terminator::Any(b'\n'),
        };
        let mut csv_writer = csv::WriterBuilder::new()
            .delimiter(self.config.delimiter_u8())
            .quote(self.config.quote_char_u8())
            .escape(self.config.escape_char_u8())
            .double_quote(self.config.escape_char.is_none())
            .terminator(terminator)
            .flexible(true)
            .from_writer(writer);

        if self.config.has_header && !table.headers().is_empty() {
            csv_writer
                .write_record(table.headers())
                .map_err(|e| CsvError::write(e.to_string()))?;
        }

        let null = self.config.null_representation.as_str();
        let width = table.headers().len();
        for row in table.rows() {
            let record: Vec<&str> = (0..width.max(row.len()))
                .map(|column| row.get(column).and_then(Option::as_deref).unwrap_or(null))
                .collect();
            csv_writer
                .write_record(&record)
                .map_err(|e| CsvError::write(e.to_string()))?;
            trace!(?record, "Wrote CSV row");
        }

        csv_writer
            .flush()
            .map_err(|e| CsvError::write(e.to_string()))?;
        debug!(record_count = table.len(), "Finished writing CSV");
        Ok(())
    }

    /// Write `table` to a string.
    ///
    /// # Errors
    ///
    /// Returns `CsvError::Write` when serialization fails.
    pub fn write_to_string(&self, table: &CsvTable) -> CsvResult<String> {
        let mut output = Vec::new();
        self.write(&mut output, table)?;
        String::from_utf8(output).map_err(|e| CsvError::write(e.to_string()))
    }
}
