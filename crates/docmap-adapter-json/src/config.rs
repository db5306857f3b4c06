//! JSON output options

use crate::errors::{JsonError, JsonResult};
use std::collections::BTreeMap;

/// Configuration for JSON serialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JsonConfig {
    /// Pretty-print output (default: compact)
    pub pretty: bool,
}

impl JsonConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the data source option `pretty`.
    ///
    /// # Errors
    ///
    /// Returns `JsonError::Config` when `pretty` is not a boolean.
    pub fn from_options(options: &BTreeMap<String, String>) -> JsonResult<Self> {
        let mut config = Self::new();
        if let Some(value) = options.get("pretty") {
            config.pretty = value
                .parse()
                .map_err(|_| JsonError::config(format!("pretty '{value}' is not a boolean")))?;
        }
        Ok(config)
    }

    #[must_use]
    pub fn pretty(mut self, pretty: bool) -> Self {
        self.pretty = pretty;
        self
    }
}
