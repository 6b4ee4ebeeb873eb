//! Error types for historian-store.

use crate::driver::DriverError;

/// Result type for historian-store operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in historian-store.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Backend error surfaced by the relational driver.
    #[error("Database error: {0}")]
    Driver(#[from] DriverError),

    /// Schema creation failed because the configured user lacks privileges.
    #[error(
        "Access denied creating table {table}: create the historian tables manually \
         before restarting the historian; refer to the packaged create-table statements"
    )]
    SchemaAccessDenied {
        /// The table that could not be created.
        table: String,
    },

    /// Schema creation failed for a reason other than privileges.
    #[error(
        "{message}: error creating table {table}; create the historian tables manually \
         before restarting the historian; refer to the packaged create-table statements"
    )]
    SchemaCreation {
        /// The table that could not be created.
        table: String,
        /// The backend's own diagnostic text.
        message: String,
    },

    /// The backend version string did not contain three numeric components.
    #[error("Unable to parse backend version string: {0:?}")]
    VersionUnparseable(String),

    /// A configured or derived table name is not a bare SQL identifier.
    #[error("Invalid table name: {0:?}")]
    InvalidTableName(String),

    /// A stored timestamp could not be parsed.
    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(String),

    /// A result row did not have the expected shape.
    #[error("Unexpected row from backend: {0}")]
    UnexpectedRow(String),

    /// No display name was supplied for a queried topic id.
    #[error("No display name supplied for topic id {0}")]
    MissingTopicName(i64),

    /// A caller-supplied name failed validation before any query was issued.
    #[error(transparent)]
    Validation(#[from] historian_types::ParseError),

    /// JSON (de)serialization error.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
