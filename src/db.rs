//! Database connection management.
//!
//! Provides utilities for opening and configuring SQLite connections.

use crate::errors::Result;
use rusqlite::Connection;
use std::path::Path;

/// Open a SQLite database at the given path.
///
/// The path `":memory:"` opens a private in-memory database.
pub fn open<P: AsRef<Path>>(path: P) -> Result<Connection> {
    Ok(Connection::open(path)?)
}

/// Open an in-memory SQLite database (for testing).
pub fn open_in_memory() -> Result<Connection> {
    Ok(Connection::open_in_memory()?)
}

/// Configure a connection with the settings the store expects.
pub fn configure(conn: &Connection) -> Result<()> {
    // pragma_update rather than execute: journal_mode returns a row.
    conn.pragma_update(None, "journal_mode", "WAL")?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    Ok(())
}
