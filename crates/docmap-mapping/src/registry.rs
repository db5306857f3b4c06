//! Adapter factory registry
//!
//! Formats are compiled in and registered by name. A registry is cheap to
//! clone and can be shared by concurrently running sessions; registering a
//! format does not need exclusive access.

use crate::error::{EngineError, Result};
use crate::session::MappingSession;
use dashmap::DashMap;
use docmap_adapter_csv::{CsvAdapter, CsvConfig};
use docmap_adapter_json::{JsonAdapter, JsonConfig};
use docmap_adapter_xml::{XmlAdapter, XmlConfig};
use docmap_model::{AdapterResult, DataSource, DocumentAdapter, MappingDocument};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Builds an adapter for a data source, seeded with the document text when
/// there is one
pub type AdapterFactory = Arc<
    dyn Fn(&DataSource, Option<String>) -> AdapterResult<Box<dyn DocumentAdapter>> + Send + Sync,
>;

/// Format name to adapter factory
#[derive(Clone)]
pub struct AdapterRegistry {
    factories: Arc<DashMap<String, AdapterFactory>>,
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry")
            .field("formats", &self.formats())
            .finish()
    }
}

impl AdapterRegistry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            factories: Arc::new(DashMap::new()),
        }
    }

    /// Create a registry with the XML, JSON, and CSV adapters.
    #[must_use]
    pub fn with_defaults() -> Self {
        let registry = Self::new();
        registry.register(docmap_adapter_xml::FORMAT, |source, content| {
            let config = XmlConfig::from_options(&source.options)
                .map_err(|e| e.into_adapter_error(&source.id))?;
            let adapter = XmlAdapter::new(source.id.clone())
                .with_config(config)
                .with_namespaces(&source.namespaces);
            Ok(Box::new(match content {
                Some(text) => adapter.with_input(text),
                None => adapter,
            }))
        });
        registry.register(docmap_adapter_json::FORMAT, |source, content| {
            let config = JsonConfig::from_options(&source.options)
                .map_err(|e| e.into_adapter_error(&source.id))?;
            let adapter = JsonAdapter::new(source.id.clone()).with_config(config);
            Ok(Box::new(match content {
                Some(text) => adapter.with_input(text),
                None => adapter,
            }))
        });
        registry.register(docmap_adapter_csv::FORMAT, |source, content| {
            let config = CsvConfig::from_options(&source.options)
                .map_err(|e| e.into_adapter_error(&source.id))?;
            let adapter = CsvAdapter::new(source.id.clone()).with_config(config);
            Ok(Box::new(match content {
                Some(text) => adapter.with_input(text),
                None => adapter,
            }))
        });
        registry
    }

    /// Register a factory for `format`, replacing any previous one.
    /// Format names are case-insensitive.
    pub fn register<F>(&self, format: impl Into<String>, factory: F) -> &Self
    where
        F: Fn(&DataSource, Option<String>) -> AdapterResult<Box<dyn DocumentAdapter>>
            + Send
            + Sync
            + 'static,
    {
        let format = format.into().to_ascii_lowercase();
        debug!(format = %format, "Registering adapter factory");
        self.factories.insert(format, Arc::new(factory));
        self
    }

    /// Whether a factory is registered for `format`.
    #[must_use]
    pub fn contains(&self, format: &str) -> bool {
        self.factories.contains_key(&format.to_ascii_lowercase())
    }

    /// Registered format names, sorted.
    #[must_use]
    pub fn formats(&self) -> Vec<String> {
        let mut formats: Vec<String> = self.factories.iter().map(|e| e.key().clone()).collect();
        formats.sort();
        formats
    }

    /// Build the adapter for `source`.
    ///
    /// # Errors
    ///
    /// Returns `UnknownFormat` when no factory is registered for the source's
    /// format, or `Document` when the factory rejects the source's options.
    pub fn create(
        &self,
        source: &DataSource,
        content: Option<String>,
    ) -> Result<Box<dyn DocumentAdapter>> {
        // Clone the factory out so the map shard is not held while it runs.
        let factory = self
            .factories
            .get(&source.format.to_ascii_lowercase())
            .map(|entry| Arc::clone(entry.value()))
            .ok_or_else(|| EngineError::UnknownFormat {
                format: source.format.clone(),
                doc_id: source.id.clone(),
            })?;
        factory(source, content).map_err(|e| EngineError::document(source.id.clone(), e))
    }

    /// Build and bind an adapter for every data source of `document`.
    /// `contents` supplies the document text by data source id; sources
    /// without an entry start empty.
    ///
    /// # Errors
    ///
    /// See [`AdapterRegistry::create`].
    pub fn bind_all(
        &self,
        document: &MappingDocument,
        session: &mut MappingSession,
        mut contents: BTreeMap<String, String>,
    ) -> Result<()> {
        for source in &document.data_sources {
            let adapter = self.create(source, contents.remove(&source.id))?;
            session.bind(source.role, adapter);
        }
        Ok(())
    }
}

impl Default for AdapterRegistry {
    fn default() -> Self {
        Self::with_defaults()
    }
}
