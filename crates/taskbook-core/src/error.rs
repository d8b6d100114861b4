//! Error types for taskbook.

use thiserror::Error;

/// Result type alias using taskbook's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Message shown to users for failures that are not their fault.
pub const GENERIC_FAILURE_MESSAGE: &str =
    "An unknown error occurred. Please talk to your system administrator for help.";

/// Core error type for taskbook operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Referenced item or reference is absent
    #[error("Not found: {0}")]
    NotFound(String),

    /// Adding would create a second reference to the same item in one list
    #[error("Duplicate item: {0}")]
    DuplicateItem(String),

    /// Pop on a list with no entries
    #[error("Empty list: {0}")]
    EmptyList(String),

    /// Compare-and-set retry budget exhausted under contention
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Semantically disallowed state transition
    #[error("Invalid operation: {0}")]
    InvalidOperation(String),

    /// Key-value backend failure (opaque passthrough)
    #[error("Store error: {0}")]
    Store(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Whether the failure was caused by the caller's input or request
    /// rather than by the system.
    pub fn is_user_fault(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_)
                | Error::DuplicateItem(_)
                | Error::EmptyList(_)
                | Error::InvalidOperation(_)
                | Error::InvalidInput(_)
        )
    }

    /// Text suitable for showing to the user who triggered the failure.
    ///
    /// User faults carry their own validation-style message; everything
    /// else collapses to [`GENERIC_FAILURE_MESSAGE`] and is expected to be
    /// logged server side by the caller.
    pub fn user_message(&self) -> String {
        if self.is_user_fault() {
            format!("Error: {}.", self)
        } else {
            GENERIC_FAILURE_MESSAGE.to_string()
        }
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}
