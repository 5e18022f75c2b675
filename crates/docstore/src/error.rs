//! Document store errors.

use thiserror::Error;

/// Errors that can occur during document store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error from sqlx.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Requested document was not found.
    #[error("document {collection}/{id} not found")]
    NotFound { collection: String, id: String },

    /// A create targeted an identifier that is already taken.
    #[error("document {collection}/{id} already exists")]
    AlreadyExists { collection: String, id: String },

    /// A conditional increment would have taken a field below its floor.
    #[error("{collection}/{id}: {field} cannot go below {floor}")]
    PreconditionFailed {
        collection: String,
        id: String,
        field: String,
        floor: i64,
    },

    /// An increment targeted a field that does not hold an integer.
    #[error("{collection}/{id}: {field} is not an integer")]
    NotAnInteger {
        collection: String,
        id: String,
        field: String,
    },

    /// Data in the store is corrupted or does not match the expected shape.
    #[error("data corruption: {0}")]
    DataCorruption(String),

    /// JSON (de)serialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The store could not be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl StoreError {
    pub(crate) fn not_found(collection: &str, id: &str) -> Self {
        Self::NotFound {
            collection: collection.to_owned(),
            id: id.to_owned(),
        }
    }

    /// Whether the failure is a rejected conditional write rather than an
    /// outage.
    #[must_use]
    pub const fn is_precondition(&self) -> bool {
        matches!(self, Self::PreconditionFailed { .. })
    }
}
