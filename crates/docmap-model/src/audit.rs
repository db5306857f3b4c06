//! Diagnostics produced during validation and execution

use serde::{Deserialize, Serialize};
use std::fmt;

/// Severity of a diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    Error,
    Warn,
    Info,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Error => f.write_str("ERROR"),
            Status::Warn => f.write_str("WARN"),
            Status::Info => f.write_str("INFO"),
        }
    }
}

/// Part of the mapping document or execution a diagnostic refers to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Scope {
    All,
    DataSource,
    Mapping,
    Field,
    LookupTables,
    Constants,
    Properties,
    Document,
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Scope::All => "all",
            Scope::DataSource => "data-source",
            Scope::Mapping => "mapping",
            Scope::Field => "field",
            Scope::LookupTables => "lookup-tables",
            Scope::Constants => "constants",
            Scope::Properties => "properties",
            Scope::Document => "document",
        };
        f.write_str(name)
    }
}

/// Runtime diagnostic attached to a field or mapping
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Audit {
    pub scope: Scope,
    pub id: Option<String>,
    pub doc_id: Option<String>,
    pub path: Option<String>,
    pub status: Status,
    pub message: String,
    /// Rendered value involved, when there is one
    pub value: Option<String>,
}

impl Audit {
    /// Create an audit with the given severity.
    pub fn new(scope: Scope, status: Status, message: impl Into<String>) -> Self {
        Self {
            scope,
            id: None,
            doc_id: None,
            path: None,
            status,
            message: message.into(),
            value: None,
        }
    }

    /// Create an error audit.
    pub fn error(scope: Scope, message: impl Into<String>) -> Self {
        Self::new(scope, Status::Error, message)
    }

    /// Create a warning audit.
    pub fn warn(scope: Scope, message: impl Into<String>) -> Self {
        Self::new(scope, Status::Warn, message)
    }

    /// Create an informational audit.
    pub fn info(scope: Scope, message: impl Into<String>) -> Self {
        Self::new(scope, Status::Info, message)
    }

    /// Attach the mapping id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach the document id.
    #[must_use]
    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = Some(doc_id.into());
        self
    }

    /// Attach the field path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Attach the value involved.
    #[must_use]
    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }
}

impl fmt::Display for Audit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.status, self.message)?;
        if let Some(doc_id) = &self.doc_id {
            write!(f, " (docId={doc_id}")?;
            if let Some(path) = &self.path {
                write!(f, ", path={path}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

/// Pre-execution diagnostic attached to a mapping document construct
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationEntry {
    pub scope: Scope,
    pub id: Option<String>,
    pub doc_id: Option<String>,
    pub path: Option<String>,
    pub status: Status,
    pub message: String,
}

impl ValidationEntry {
    /// Create an entry with the given severity.
    pub fn new(scope: Scope, status: Status, message: impl Into<String>) -> Self {
        Self {
            scope,
            id: None,
            doc_id: None,
            path: None,
            status,
            message: message.into(),
        }
    }

    /// Create an error entry.
    pub fn error(scope: Scope, message: impl Into<String>) -> Self {
        Self::new(scope, Status::Error, message)
    }

    /// Create a warning entry.
    pub fn warn(scope: Scope, message: impl Into<String>) -> Self {
        Self::new(scope, Status::Warn, message)
    }

    /// Attach the construct id.
    #[must_use]
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Attach an optional construct id.
    #[must_use]
    pub fn with_optional_id(mut self, id: Option<&str>) -> Self {
        self.id = id.map(str::to_string);
        self
    }

    /// Attach the document id.
    #[must_use]
    pub fn with_doc_id(mut self, doc_id: impl Into<String>) -> Self {
        self.doc_id = Some(doc_id.into());
        self
    }

    /// Attach the field path.
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }
}

impl fmt::Display for ValidationEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.scope, self.message)?;
        if let Some(id) = &self.id {
            write!(f, " (id={id})")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_builder_and_display() {
        let audit = Audit::error(Scope::Field, "Cannot convert")
            .with_id("m1")
            .with_doc_id("src")
            .with_path("/a/b")
            .with_value("x");

        assert_eq!(audit.status, Status::Error);
        assert_eq!(audit.value.as_deref(), Some("x"));
        assert_eq!(audit.to_string(), "[ERROR] Cannot convert (docId=src, path=/a/b)");
    }

    #[test]
    fn test_validation_entry_display() {
        let entry = ValidationEntry::error(Scope::LookupTables, "Duplicated lookup table name")
            .with_id("qwerty");
        assert_eq!(
            entry.to_string(),
            "[ERROR] lookup-tables: Duplicated lookup table name (id=qwerty)"
        );
        assert_eq!(Scope::LookupTables.to_string(), "lookup-tables");
    }
}
