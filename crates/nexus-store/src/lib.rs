//! Nexus relational store
//!
//! A thin handle over a SQLite connection that provides what the query
//! pipeline and the sentinel need from a relational store:
//!
//! - **Schema profiling**: table → ordered column names, read live from the
//!   catalog on every call ([`Store::schema_profile`]).
//! - **Row execution**: run SQL and get rows back as column → JSON value maps
//!   ([`Store::query`]).
//! - **Scan history**: write-once persistence of sentinel scan results
//!   (see [`history`]).
//!
//! The store does no validation of its own: callers must only hand it SQL
//! that has already passed `nexus_sql::validate_sql`.

pub mod demo;
pub mod history;
pub mod migrations;
mod rows;
mod schema;

pub use history::{ScanHistoryRecord, ScanHistoryRow};
pub use rows::Row;
pub use schema::SchemaProfile;

use std::path::{Path, PathBuf};

use rusqlite::{Connection, Params};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("migration v{version} failed: {message}")]
    MigrationFailed { version: u32, message: String },
}

/// A request-scoped handle to the relational store.
pub struct Store {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Store {
    /// Open (or create) a database file and bring its schema up to date.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }
        let conn = Connection::open(path)?;
        migrations::run_migrations(&conn)?;
        tracing::debug!(path = %path.display(), "opened store");
        Ok(Self {
            conn,
            path: Some(path.to_path_buf()),
        })
    }

    /// Open a private in-memory database (tests, demos).
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        migrations::run_migrations(&conn)?;
        Ok(Self { conn, path: None })
    }

    /// Database file path (`None` for in-memory stores).
    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Direct access to the underlying connection, for collaborators that
    /// manage their own tables.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Introspect the catalog: every user table with its columns in catalog
    /// order. Not cached.
    pub fn schema_profile(&self) -> Result<SchemaProfile, StoreError> {
        schema::profile(&self.conn)
    }

    /// Run `sql` with positional `params` and collect every row.
    pub fn query<P: Params>(&self, sql: &str, params: P) -> Result<Vec<Row>, StoreError> {
        rows::query_rows(&self.conn, sql, params)
    }

    /// Run one or more statements that return no rows.
    pub fn execute_batch(&self, sql: &str) -> Result<(), StoreError> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }
}
