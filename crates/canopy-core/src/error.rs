//! Error types and result aliases for Canopy.
//!
//! This module defines the shared error types used across all Canopy
//! components. Errors are structured for programmatic handling and include
//! context for debugging; the API layer maps them onto HTTP statuses.

/// The result type used throughout Canopy.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in Canopy operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// An invalid identifier was provided.
    #[error("invalid identifier: {message}")]
    InvalidId {
        /// Description of what made the ID invalid.
        message: String,
    },

    /// Caller input was missing required fields or otherwise malformed.
    #[error("validation failed: {message}")]
    Validation {
        /// Description naming every missing or malformed field.
        message: String,
    },

    /// The requested tree record was not found.
    #[error("tree not found: {id}")]
    TreeNotFound {
        /// The identifier that was looked up.
        id: String,
    },

    /// An authenticated planter tried to act on a record they do not own.
    #[error("forbidden: {message}")]
    Forbidden {
        /// Description of the ownership violation.
        message: String,
    },

    /// A storage operation failed.
    #[error("storage error: {message}")]
    Storage {
        /// Description of the storage failure.
        message: String,
        /// The underlying cause, if any.
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A serialization or deserialization error occurred.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the serialization failure.
        message: String,
    },

    /// An internal error occurred that should not happen in normal operation.
    #[error("internal error: {message}")]
    Internal {
        /// Description of the internal error.
        message: String,
    },
}

impl Error {
    /// Creates a new validation error with the given message.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// Creates a validation error naming every missing required field.
    #[must_use]
    pub fn missing_fields(fields: &[&str]) -> Self {
        Self::Validation {
            message: format!("required fields: {}", fields.join(", ")),
        }
    }

    /// Creates a new forbidden error with the given message.
    #[must_use]
    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden {
            message: message.into(),
        }
    }

    /// Creates a new storage error with the given message.
    #[must_use]
    pub fn storage(message: impl Into<String>) -> Self {
        Self::Storage {
            message: message.into(),
            source: None,
        }
    }

    /// Creates a new storage error with a source cause.
    #[must_use]
    pub fn storage_with_source(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::Storage {
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Creates a tree-not-found error for the given id.
    #[must_use]
    pub fn tree_not_found(id: impl std::fmt::Display) -> Self {
        Self::TreeNotFound { id: id.to_string() }
    }
}
