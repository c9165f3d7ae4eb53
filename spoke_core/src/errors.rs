//! # Error Types
//!
//! Structured error types for spoke_core. Every failing operation returns
//! one of these; the caller surfaces it through a [`crate::notify::Notifier`]
//! and the working state stays as it was before the action.
//!
//! ## Example
//!
//! ```rust
//! use spoke_core::errors::{CalcError, CalcResult, ErrorKind};
//!
//! fn validate_erd(erd_mm: f64) -> CalcResult<()> {
//!     if erd_mm <= 0.0 {
//!         return Err(CalcError::invalid_input(
//!             "erd",
//!             erd_mm.to_string(),
//!             "ERD must be positive",
//!         ));
//!     }
//!     Ok(())
//! }
//!
//! let err = validate_erd(-1.0).unwrap_err();
//! assert_eq!(err.kind(), ErrorKind::Validation);
//! ```

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::notify::Severity;

/// Result type alias for spoke_core operations
pub type CalcResult<T> = Result<T, CalcError>;

/// Broad error classes, used to decide how an error is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    /// Missing or incomplete fields before compute, save or export
    Validation,
    /// Import document is not JSON or lacks required top-level keys
    Format,
    /// A bundled preset entry failed its schema checks
    PresetLoad,
    /// Durable storage or file system failure
    Storage,
    /// Should not happen
    Internal,
}

/// Structured error type for calculator, storage and exchange operations.
#[derive(Error, Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", content = "details")]
pub enum CalcError {
    /// An input value is present but unusable (unparseable, out of range)
    #[error("Invalid input for '{field}': {value} - {reason}")]
    InvalidInput {
        field: String,
        value: String,
        reason: String,
    },

    /// A required input field is empty
    #[error("Missing required field: {field}")]
    MissingField { field: String },

    /// Save or export was attempted without a computed result for both sides
    #[error("Cannot {action}: spoke lengths have not been calculated")]
    IncompleteResult { action: String },

    /// Save was attempted with an empty name
    #[error("A saved calculation needs a name")]
    EmptyName,

    /// No saved calculation or preset with this identifier
    #[error("{what} not found: {id}")]
    NotFound { what: String, id: String },

    /// Import document is malformed
    #[error("Invalid calculation file: {reason}")]
    Format { reason: String },

    /// A bundled preset failed validation
    #[error("Preset '{source_name}' skipped: {reason}")]
    PresetLoad { source_name: String, reason: String },

    /// File I/O error
    #[error("File error: {operation} on '{path}' - {reason}")]
    FileError {
        operation: String,
        path: String,
        reason: String,
    },

    /// Store is held by another process
    #[error("File locked: '{path}' is locked by {locked_by} since {locked_at}")]
    FileLocked {
        path: String,
        locked_by: String,
        locked_at: String,
    },

    /// JSON serialization/deserialization error on stored data
    #[error("Serialization error: {reason}")]
    SerializationError { reason: String },

    /// Generic internal error (should be rare)
    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl CalcError {
    /// Create an InvalidInput error
    pub fn invalid_input(field: impl Into<String>, value: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::InvalidInput {
            field: field.into(),
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Create a MissingField error
    pub fn missing_field(field: impl Into<String>) -> Self {
        CalcError::MissingField {
            field: field.into(),
        }
    }

    /// Create an IncompleteResult error for the named action ("save", "export")
    pub fn incomplete_result(action: impl Into<String>) -> Self {
        CalcError::IncompleteResult {
            action: action.into(),
        }
    }

    /// Create a NotFound error
    pub fn not_found(what: impl Into<String>, id: impl Into<String>) -> Self {
        CalcError::NotFound {
            what: what.into(),
            id: id.into(),
        }
    }

    /// Create a Format error
    pub fn format(reason: impl Into<String>) -> Self {
        CalcError::Format {
            reason: reason.into(),
        }
    }

    /// Create a PresetLoad error
    pub fn preset_load(source_name: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::PresetLoad {
            source_name: source_name.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileError
    pub fn file_error(operation: impl Into<String>, path: impl Into<String>, reason: impl Into<String>) -> Self {
        CalcError::FileError {
            operation: operation.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// Create a FileLocked error
    pub fn file_locked(path: impl Into<String>, locked_by: impl Into<String>, locked_at: impl Into<String>) -> Self {
        CalcError::FileLocked {
            path: path.into(),
            locked_by: locked_by.into(),
            locked_at: locked_at.into(),
        }
    }

    /// Create a SerializationError
    pub fn serialization(reason: impl Into<String>) -> Self {
        CalcError::SerializationError {
            reason: reason.into(),
        }
    }

    /// Classify this error
    pub fn kind(&self) -> ErrorKind {
        match self {
            CalcError::InvalidInput { .. }
            | CalcError::MissingField { .. }
            | CalcError::IncompleteResult { .. }
            | CalcError::EmptyName
            | CalcError::NotFound { .. } => ErrorKind::Validation,
            CalcError::Format { .. } => ErrorKind::Format,
            CalcError::PresetLoad { .. } => ErrorKind::PresetLoad,
            CalcError::FileError { .. }
            | CalcError::FileLocked { .. }
            | CalcError::SerializationError { .. } => ErrorKind::Storage,
            CalcError::Internal { .. } => ErrorKind::Internal,
        }
    }

    /// Severity used when this error is shown to the user.
    ///
    /// A skipped preset does not stop anything else from working, so it is
    /// only a warning.
    pub fn severity(&self) -> Severity {
        match self.kind() {
            ErrorKind::PresetLoad => Severity::Warning,
            _ => Severity::Error,
        }
    }

    /// Check if this is a recoverable error (e.g., can retry)
    pub fn is_recoverable(&self) -> bool {
        matches!(self, CalcError::FileLocked { .. })
    }

    /// Get a short error code for programmatic handling
    pub fn error_code(&self) -> &'static str {
        match self {
            CalcError::InvalidInput { .. } => "INVALID_INPUT",
            CalcError::MissingField { .. } => "MISSING_FIELD",
            CalcError::IncompleteResult { .. } => "INCOMPLETE_RESULT",
            CalcError::EmptyName => "EMPTY_NAME",
            CalcError::NotFound { .. } => "NOT_FOUND",
            CalcError::Format { .. } => "FORMAT_ERROR",
            CalcError::PresetLoad { .. } => "PRESET_LOAD_ERROR",
            CalcError::FileError { .. } => "FILE_ERROR",
            CalcError::FileLocked { .. } => "FILE_LOCKED",
            CalcError::SerializationError { .. } => "SERIALIZATION_ERROR",
            CalcError::Internal { .. } => "INTERNAL_ERROR",
        }
    }
}
