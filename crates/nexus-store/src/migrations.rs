//! Schema migrations tracked with `PRAGMA user_version`.

use rusqlite::Connection;

use crate::StoreError;

const V001_SCAN_HISTORY: &str = "
CREATE TABLE IF NOT EXISTS scan_history (
    id          INTEGER PRIMARY KEY,
    scan_id     TEXT    NOT NULL UNIQUE,
    domain      TEXT    NOT NULL,
    status      TEXT    NOT NULL DEFAULT 'completed',
    risk_score  INTEGER NOT NULL DEFAULT 0,
    result_json TEXT    NOT NULL DEFAULT '{}',
    created_at  TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE INDEX IF NOT EXISTS idx_scan_history_created_at ON scan_history(created_at);
";

const MIGRATIONS: &[(&str, u32)] = &[(V001_SCAN_HISTORY, 1)];

/// Apply every migration newer than the database's `user_version`.
pub fn run_migrations(conn: &Connection) -> Result<(), StoreError> {
    let current = current_version(conn)?;

    for (sql, version) in MIGRATIONS {
        if current >= *version {
            continue;
        }
        conn.execute_batch(sql)
            .and_then(|_| conn.pragma_update(None, "user_version", version))
            .map_err(|e| StoreError::MigrationFailed {
                version: *version,
                message: e.to_string(),
            })?;
        tracing::info!(version = version, "applied migration");
    }

    Ok(())
}

pub fn current_version(conn: &Connection) -> Result<u32, StoreError> {
    Ok(conn.pragma_query_value(None, "user_version", |row| row.get(0))?)
}
