//! CLI configuration file

use anyhow::Context;
use docmap_mapping::EngineConfig;
use docmap_model::MappingDocument;
use serde::Deserialize;
use std::path::Path;

/// Seconds a mapping run may take before it is abandoned
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Settings read from `--config`; flags override them
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// Engine settings
    pub engine: EngineConfig,

    /// Upper bound for a mapping run
    pub timeout_secs: Option<u64>,

    /// Pretty-print JSON targets
    pub pretty_json: Option<bool>,

    /// Emit an XML declaration on XML targets
    pub xml_declaration: Option<bool>,

    /// Field delimiter for CSV documents
    pub csv_delimiter: Option<char>,
}

impl CliConfig {
    /// Read a YAML config file.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("reading config file {}", path.display()))?;
        serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config file {}", path.display()))
    }

    /// Effective timeout.
    pub fn timeout_secs(&self) -> u64 {
        self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS)
    }

    /// Fill adapter options the document leaves unset.
    pub fn apply_to(&self, document: &mut MappingDocument) {
        for source in &mut document.data_sources {
            let (key, value) = match source.format.to_ascii_lowercase().as_str() {
                "json" => ("pretty", self.pretty_json.map(|v| v.to_string())),
                "xml" => ("declaration", self.xml_declaration.map(|v| v.to_string())),
                "csv" => ("delimiter", self.csv_delimiter.map(String::from)),
                _ => continue,
            };
            if let Some(value) = value {
                source.options.entry(key.to_string()).or_insert(value);
            }
        }
    }
}
