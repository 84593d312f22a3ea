//! Error handling for the student registry.

use thiserror::Error;

/// Result type alias using [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors raised by the record store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Any failure surfaced by the storage backend.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// A record with an assigned id was handed to an insert. Ids are
    /// assigned on first persistence and never change.
    #[error("student '{name}' is already persisted with id {id}")]
    AlreadyPersisted { name: String, id: i64 },

    /// A query, projection, or assignment referenced a column the table
    /// does not have.
    #[error("unknown column '{0}'")]
    UnknownColumn(String),

    /// The configured schema does not contain the table the store needs.
    #[error("table '{0}' missing from schema")]
    MissingTable(String),

    /// A catalog call that cannot be rendered as a statement.
    #[error("invalid query: {0}")]
    InvalidQuery(String),
}
