//! Validation reporter

use crate::engine::ValidationResult;
use docmap_model::Status;
use std::fmt::Write as _;

/// Renders validation results for people
pub struct ValidationReporter {
    include_warnings: bool,
}

impl ValidationReporter {
    /// Create a reporter that lists errors and warnings.
    #[must_use]
    pub fn new() -> Self {
        Self {
            include_warnings: true,
        }
    }

    /// Only list errors.
    #[must_use]
    pub fn errors_only(mut self) -> Self {
        self.include_warnings = false;
        self
    }

    /// One line per entry followed by a summary line.
    #[must_use]
    pub fn render(&self, result: &ValidationResult) -> String {
        let mut out = String::new();
        for entry in result.entries() {
            if entry.status == Status::Warn && !self.include_warnings {
                continue;
            }
            let _ = writeln!(out, "{entry}");
        }
        let _ = write!(out, "{}", Self::summary(result));
        out
    }

    /// Counts of errors and warnings.
    #[must_use]
    pub fn summary(result: &ValidationResult) -> String {
        format!(
            "{} error(s), {} warning(s)",
            result.error_count(),
            result.warning_count()
        )
    }
}

impl Default for ValidationReporter {
    fn default() -> Self {
        Self::new()
    }
}
