//! Unified error handling for the TUMA PLUS library
//!
//! Missing cells and unparsable timestamps are not errors anywhere in this
//! crate; they are resolved by the zero-fill and exclusion rules of the
//! aggregation code. What remains here are fetch failures, which the
//! presentation layer shows and survives, and configuration defects, which
//! are fatal at startup.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// The main error type for the TUMA PLUS library
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TumaPlusError {
    /// IO operation failed
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// The remote or local dataset could not be retrieved or decoded
    #[error("Failed to load dataset from {source_name}: {reason}")]
    Fetch {
        /// Human readable description of the data source
        source_name: String,
        /// What went wrong
        reason: String,
    },

    /// HTTP transport error
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Spreadsheet decoding error
    #[error("Workbook error: {0}")]
    Workbook(#[from] calamine::Error),

    /// CSV decoding error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Invalid configuration or section catalog
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// Other errors
    #[error("{0}")]
    Other(String),

    /// Generic error with context
    #[error("{message}")]
    Context {
        /// Context message
        message: String,
        /// Underlying error
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl TumaPlusError {
    /// Build a fetch error for the given source
    pub fn fetch(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Fetch {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Whether this error is a configuration defect rather than a runtime condition
    pub fn is_config(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

/// Configuration and catalog defects
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigError {
    /// Failed to read a configuration file from disk
    #[error("Failed to read configuration file {path}: {source}")]
    FileRead {
        /// Path to the file that could not be read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: io::Error,
    },

    /// Failed to parse YAML content from a configuration file
    #[error("Invalid YAML syntax in {path}:\n{source}\n\nHint: Check for proper indentation and YAML formatting")]
    YamlParse {
        /// Path (or builtin name) of the offending document
        path: PathBuf,
        /// Underlying YAML parsing error
        #[source]
        source: serde_yaml::Error,
    },

    /// Invalid configuration value for a specific field
    #[error("Invalid configuration value for '{field}': {value}\n{hint}")]
    InvalidValue {
        /// Name of the configuration field
        field: String,
        /// The value that was provided
        value: String,
        /// How to fix it
        hint: String,
    },

    /// A section references columns the dataset does not have
    #[error("Section '{section}' references columns absent from the dataset: {}", .columns.join(", "))]
    UnknownColumns {
        /// Section id
        section: String,
        /// Missing column names
        columns: Vec<String>,
    },

    /// A categorized chart requests columns without a human label
    #[error("Columns have no label mapping: {}", .columns.join(", "))]
    MissingLabels {
        /// Unmapped column names
        columns: Vec<String>,
    },

    /// Configuration validation failed
    #[error("Configuration validation failed: {message}")]
    Validation {
        /// What failed
        message: String,
    },
}

/// Result type alias for TUMA PLUS operations
pub type Result<T> = std::result::Result<T, TumaPlusError>;

/// Extension trait for adding context to errors
pub trait ErrorContext<T> {
    /// Add context to an error
    fn context<S: Into<String>>(self, msg: S) -> Result<T>;

    /// Add context with a closure that's only called on error
    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>;
}

impl<T, E> ErrorContext<T> for std::result::Result<T, E>
where
    E: std::error::Error + Send + Sync + 'static,
{
    fn context<S: Into<String>>(self, msg: S) -> Result<T> {
        self.map_err(|e| TumaPlusError::Context {
            message: msg.into(),
            source: Box::new(e),
        })
    }

    fn with_context<F, S>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> S,
        S: Into<String>,
    {
        self.map_err(|e| TumaPlusError::Context {
            message: f().into(),
            source: Box::new(e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_context() {
        let err: Result<()> = Err(io::Error::new(io::ErrorKind::NotFound, "file not found").into());
        let err_with_context = err.context("Failed to open dataset");

        let msg = err_with_context.unwrap_err().to_string();
        assert!(msg.contains("Failed to open dataset"));
    }

    #[test]
    fn test_unknown_columns_lists_every_column() {
        let err = ConfigError::UnknownColumns {
            section: "vbg".to_string(),
            columns: vec!["VBG/casSVS".to_string(), "VBG/NewSVS".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("'vbg'"));
        assert!(msg.contains("VBG/casSVS, VBG/NewSVS"));
    }

    #[test]
    fn test_is_config() {
        let err: TumaPlusError = ConfigError::MissingLabels {
            columns: vec!["x".to_string()],
        }
        .into();
        assert!(err.is_config());
        assert!(!TumaPlusError::fetch("file.csv", "boom").is_config());
    }
}
