//! XML output options

use crate::errors::{XmlError, XmlResult};
use std::collections::BTreeMap;

/// Configuration for XML serialization
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct XmlConfig {
    /// Emit `<?xml version="1.0" encoding="UTF-8"?>` (default: false)
    pub declaration: bool,
    /// Spaces per nesting level for element-only content; `None` writes
    /// everything on one line
    pub indent: Option<usize>,
}

impl XmlConfig {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from data source options `declaration` and
    /// `indent`.
    ///
    /// # Errors
    ///
    /// Returns `XmlError::Config` for an option that cannot be read.
    pub fn from_options(options: &BTreeMap<String, String>) -> XmlResult<Self> {
        let mut config = Self::new();
        if let Some(value) = options.get("declaration") {
            config.declaration = value
                .parse()
                .map_err(|_| XmlError::config(format!("declaration '{value}' is not a boolean")))?;
        }
        if let Some(value) = options.get("indent") {
            config.indent = Some(
                value
                    .trim()
                    .parse()
                    .map_err(|_| XmlError::config(format!("indent '{value}' is not a width")))?,
            );
        }
        Ok(config)
    }

    #[must_use]
    pub fn declaration(mut self, declaration: bool) -> Self {
        self.declaration = declaration;
        self
    }

    #[must_use]
    pub fn indent(mut self, width: usize) -> Self {
        self.indent = Some(width);
        self
    }
}
