//! CSV configuration options

use crate::errors::{CsvError, CsvResult};
use std::collections::BTreeMap;

/// Configuration for CSV reading and writing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvConfig {
    /// Field delimiter character (default: comma)
    pub delimiter: char,
    /// Quote character for fields containing special characters (default: double quote)
    pub quote_char: char,
    /// Escape character for escaping quotes (default: doubling the quote)
    pub escape_char: Option<char>,
    /// Whether the CSV has a header row (default: true)
    pub has_header: bool,
    /// Lines skipped before the header (default: 0)
    pub skip_rows: usize,
    /// How null values are written, and which cells read back as null
    pub null_representation: NullRepresentation,
    /// Record terminator (default: CRLF for writing)
    pub record_terminator: RecordTerminator,
}

/// How to represent null values in CSV output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NullRepresentation {
    /// Empty string (default)
    EmptyString,
    /// The string "NULL"
    NullString,
    /// The string "\\N"
    BackslashN,
    /// Custom string representation
    Custom(String),
}

impl NullRepresentation {
    /// Text written for a null cell.
    #[must_use]
    pub fn as_str(&self) -> &str {
        match self {
            NullRepresentation::EmptyString => "",
            NullRepresentation::NullString => "NULL",
            NullRepresentation::BackslashN => "\\N",
            NullRepresentation::Custom(text) => text,
        }
    }

    /// Whether a cell read back is null. Empty cells stay empty strings
    /// under the default representation.
    #[must_use]
    pub fn matches(&self, cell: &str) -> bool {
        !matches!(self, NullRepresentation::EmptyString) && cell == self.as_str()
    }
}

/// Record terminator for writing CSV
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordTerminator {
    /// CRLF (Windows-style, default for RFC 4180)
    CRLF,
    /// LF (Unix-style)
    LF,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            delimiter: ',',
            quote_char: '"',
            escape_char: None,
            has_header: true,
            skip_rows: 0,
            null_representation: NullRepresentation::EmptyString,
            record_terminator: RecordTerminator::CRLF,
        }
    }
}

impl CsvConfig {
    /// Create a new configuration with defaults
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from data source options: `delimiter`,
    /// `quote`, `escape`, `hasHeader`, `skipRows`, `nullValue`, and
    /// `terminator` (`crlf` or `lf`).
    ///
    /// # Errors
    ///
    /// Returns `CsvError::Config` for an option that cannot be read.
    pub fn from_options(options: &BTreeMap<String, String>) -> CsvResult<Self> {
        let mut config = Self::new();
        for (key, value) in options {
            match key.as_str() {
                "delimiter" => config.delimiter = single_char(key, value)?,
                "quote" => config.quote_char = single_char(key, value)?,
                "escape" => config.escape_char = Some(single_char(key, value)?),
                "hasHeader" => {
                    config.has_header = value.parse().map_err(|_| {
                        CsvError::config(format!("hasHeader '{value}' is not a boolean"))
                    })?;
                }
                "skipRows" => {
                    config.skip_rows = value.trim().parse().map_err(|_| {
                        CsvError::config(format!("skipRows '{value}' is not a count"))
                    })?;
                }
                "nullValue" => {
                    config.null_representation = match value.as_str() {
                        "" => NullRepresentation::EmptyString,
                        "NULL" => NullRepresentation::NullString,
                        "\\N" => NullRepresentation::BackslashN,
                        other => NullRepresentation::Custom(other.to_string()),
                    };
                }
                "terminator" => {
                    config.record_terminator = match value.to_ascii_lowercase().as_str() {
                        "crlf" => RecordTerminator::CRLF,
                        "lf" => RecordTerminator::LF,
                        _ => return Err(CsvError::config(format!("unknown terminator '{value}'"))),
                    };
                }
                _ => {}
            }
        }
        Ok(config)
    }

    /// Set the delimiter character
    #[must_use]
    pub fn delimiter(mut self, delimiter: char) -> Self {
        self.delimiter = delimiter;
        self
    }

    /// Set the quote character
    #[must_use]
    pub fn quote_char(mut self, quote_char: char) -> Self {
        self.quote_char = quote_char;
        self
    }

    /// Set the escape character
    #[must_use]
    pub fn escape_char(mut self, escape_char: char) -> Self {
        self.escape_char = Some(escape_char);
        self
    }

    /// Configure header presence
    #[must_use]
    pub fn has_header(mut self, has_header: bool) -> Self {
        self.has_header = has_header;
        self
    }

    /// Disable header row
    #[must_use]
    pub fn without_header(mut self) -> Self {
        self.has_header = false;
        self
    }

    /// Skip leading lines before the header
    #[must_use]
    pub fn skip_rows(mut self, skip_rows: usize) -> Self {
        self.skip_rows = skip_rows;
        self
    }

    /// Set null representation
    #[must_use]
    pub fn null_representation(mut self, null_rep: NullRepresentation) -> Self {
        self.null_representation = null_rep;
        self
    }

    /// Set record terminator
    #[must_use]
    pub fn record_terminator(mut self, terminator: RecordTerminator) -> Self {
        self.record_terminator = terminator;
        self
    }

    /// Convert delimiter to u8 for csv crate
    #[must_use]
    pub fn delimiter_u8(&self) -> u8 {
        ascii_byte(self.delimiter, b',')
    }

    /// Convert quote char to u8 for csv crate
    #[must_use]
    pub fn quote_char_u8(&self) -> u8 {
        ascii_byte(self.quote_char, b'"')
    }

    /// Get escape character as u8, or use quote char if not set
    #[must_use]
    pub fn escape_char_u8(&self) -> u8 {
        self.escape_char
            .map_or(self.quote_char_u8(), |c| ascii_byte(c, b'"'))
    }
}

fn ascii_byte(c: char, fallback: u8) -> u8 {
    u8::try_from(c).ok().filter(u8::is_ascii).unwrap_or(fallback)
}

fn single_char(key: &str, value: &str) -> CsvResult<char> {
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() => Ok(c),
        _ => Err(CsvError::config(format!(
            "{key} '{value}' must be a single ASCII character"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CsvConfig::default();
        assert_eq!(config.delimiter, ',');
        assert_eq!(config.quote_char, '"');
        assert_eq!(config.escape_char, None);
        assert!(config.has_header);
        assert_eq!(config.skip_rows, 0);
        assert_eq!(config.null_representation, NullRepresentation::EmptyString);
        assert_eq!(config.record_terminator, RecordTerminator::CRLF);
    }

    #[test]
    fn test_config_builder() {
        let config = CsvConfig::new()
            .delimiter(';')
            .quote_char('\'')
            .escape_char('\\')
            .without_header()
            .skip_rows(2)
            .null_representation(NullRepresentation::NullString)
            .record_terminator(RecordTerminator::LF);

        assert_eq!(config.delimiter, ';');
        assert_eq!(config.quote_char, '\'');
        assert_eq!(config.escape_char, Some('\\'));
        assert!(!config.has_header);
        assert_eq!(config.skip_rows, 2);
        assert_eq!(config.null_representation, NullRepresentation::NullString);
        assert_eq!(config.record_terminator, RecordTerminator::LF);
    }

    #[test]
    fn test_config_conversions() {
        let config = CsvConfig::new()
            .delimiter('\t')
            .quote_char('\'')
            .escape_char('\\');

        assert_eq!(config.delimiter_u8(), b'\t');
        assert_eq!(config.quote_char_u8(), b'\'');
        assert_eq!(config.escape_char_u8(), b'\\');
        assert_eq!(CsvConfig::new().escape_char_u8(), b'"');
    }

    #[test]
    fn test_null_representation() {
        assert!(!NullRepresentation::EmptyString.matches(""));
        assert!(NullRepresentation::NullString.matches("NULL"));
        assert!(NullRepresentation::Custom("NA".to_string()).matches("NA"));
        assert_eq!(NullRepresentation::BackslashN.as_str(), "\\N");
    }

    #[test]
    fn test_from_options() {
        let mut options = BTreeMap::new();
        options.insert("delimiter".to_string(), ";".to_string());
        options.insert("skipRows".to_string(), "1".to_string());
        options.insert("nullValue".to_string(), "NA".to_string());
        options.insert("terminator".to_string(), "lf".to_string());
        let config = CsvConfig::from_options(&options).unwrap();
        assert_eq!(config.delimiter, ';');
        assert_eq!(config.skip_rows, 1);
        assert_eq!(
            config.null_representation,
            NullRepresentation::Custom("NA".to_string())
        );
        assert_eq!(config.record_terminator, RecordTerminator::LF);

        options.insert("delimiter".to_string(), ";;".to_string());
        assert!(CsvConfig::from_options(&options).is_err());
    }
}
