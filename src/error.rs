//! Error types for cfgtree

use crate::schema::ValidationErrors;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for cfgtree operations
pub type Result<T> = std::result::Result<T, Error>;

/// Position inside a source document (1-based)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

impl Location {
    pub fn new(line: usize, column: usize) -> Self {
        Self { line, column }
    }

    /// Compute the location of a byte offset in `source`.
    pub fn from_offset(source: &str, offset: usize) -> Self {
        let offset = offset.min(source.len());
        let before = source.get(..offset).unwrap_or(source);
        let line = before.matches('\n').count() + 1;
        let column = before
            .rfind('\n')
            .map_or(before.chars().count(), |nl| before[nl + 1..].chars().count())
            + 1;
        Self { line, column }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, column {}", self.line, self.column)
    }
}

/// Main error type for cfgtree
#[derive(Error, Debug)]
pub enum Error {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("Failed to read file '{path}': {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write file '{path}': {source}")]
    FileWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to create directory '{path}': {source}")]
    DirectoryCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // -------------------------------------------------------------------------
    // Load Errors
    // -------------------------------------------------------------------------
    #[error("Failed to parse {format} input{}: {message}", fmt_location(.location))]
    Parse {
        format: String,
        location: Option<Location>,
        message: String,
    },

    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    #[error("Unsupported configuration format: {0}")]
    UnsupportedFormat(String),

    #[error("Failed to serialize configuration: {0}")]
    Serialize(String),

    // -------------------------------------------------------------------------
    // Query Errors
    // -------------------------------------------------------------------------
    #[error("Path not found: {0}")]
    PathNotFound(String),

    #[error("Type mismatch for {path}: expected {expected}, got {actual}")]
    TypeMismatch {
        path: String,
        expected: String,
        actual: String,
    },

    #[error("Invalid value for {path}: {reason}")]
    InvalidValue { path: String, reason: String },

    // -------------------------------------------------------------------------
    // Validation Errors
    // -------------------------------------------------------------------------
    #[error("Configuration is invalid: {0}")]
    Validation(ValidationErrors),

    #[error("Invalid validation rule for {pattern}: {reason}")]
    InvalidRule { pattern: String, reason: String },

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Check if this is a "not found" type error
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::PathNotFound(_))
    }

    /// Check if the error came from reading or parsing input
    #[must_use]
    pub fn is_load_error(&self) -> bool {
        matches!(
            self,
            Error::FileRead { .. }
                | Error::Parse { .. }
                | Error::DuplicateKey(_)
                | Error::UnsupportedFormat(_)
        )
    }

    pub(crate) fn parse(
        format: &str,
        location: Option<Location>,
        message: impl Into<String>,
    ) -> Self {
        Error::Parse {
            format: format.to_string(),
            location,
            message: message.into(),
        }
    }
}

fn fmt_location(location: &Option<Location>) -> String {
    location.map_or_else(String::new, |loc| format!(" at {loc}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_location_from_offset() {
        let source = "first\nsecond line\nthird";
        assert_eq!(Location::from_offset(source, 0), Location::new(1, 1));
        assert_eq!(Location::from_offset(source, 6), Location::new(2, 1));
        assert_eq!(Location::from_offset(source, 13), Location::new(2, 8));
        assert_eq!(Location::from_offset(source, 1000), Location::new(3, 6));
    }

    #[test]
    fn test_parse_error_display() {
        let err = Error::parse("json", Some(Location::new(3, 14)), "expected value");
        assert_eq!(
            err.to_string(),
            "Failed to parse json input at line 3, column 14: expected value"
        );

        let err = Error::parse("toml", None, "bad");
        assert_eq!(err.to_string(), "Failed to parse toml input: bad");
        assert!(err.is_load_error());
    }
}
