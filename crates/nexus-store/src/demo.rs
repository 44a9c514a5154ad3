//! Demo analytics tables.
//!
//! Creates the three tables the sentinel missions investigate and seeds
//! them with a handful of rows, once.

use rusqlite::{params, Connection};

use crate::{Store, StoreError};

const DEMO_TABLES: &str = "
CREATE TABLE IF NOT EXISTS users (
    id         INTEGER PRIMARY KEY,
    name       TEXT NOT NULL,
    email      TEXT NOT NULL UNIQUE,
    role       TEXT NOT NULL DEFAULT 'analyst',
    created_at TEXT NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS transactions (
    id         INTEGER PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id),
    amount     REAL    NOT NULL,
    currency   TEXT    NOT NULL DEFAULT 'USD',
    status     TEXT    NOT NULL DEFAULT 'completed',
    created_at TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP
);
CREATE TABLE IF NOT EXISTS login_events (
    id         INTEGER PRIMARY KEY,
    user_id    INTEGER NOT NULL REFERENCES users(id),
    ip_address TEXT    NOT NULL,
    success    INTEGER NOT NULL DEFAULT 1,
    created_at TEXT    NOT NULL DEFAULT CURRENT_TIMESTAMP,
    metadata   TEXT    NOT NULL DEFAULT '{}'
);
";

/// Create the demo tables and, if `users` is empty, insert the demo rows.
/// Returns `true` when rows were inserted.
pub fn seed_demo_data(store: &Store) -> Result<bool, StoreError> {
    let conn = store.connection();
    conn.execute_batch(DEMO_TABLES)?;

    let existing: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    if existing > 0 {
        return Ok(false);
    }

    let tx = conn.unchecked_transaction()?;
    insert_demo_rows(&tx)?;
    tx.commit()?;

    tracing::info!("seeded demo data");
    Ok(true)
}

fn insert_demo_rows(conn: &Connection) -> Result<(), StoreError> {
    let mut user_ids = Vec::new();
    for (name, email, role) in [
        ("Ava Chen", "ava.chen@example.com", "analyst"),
        ("Jordan Miles", "jordan.miles@example.com", "executive"),
    ] {
        conn.execute(
            "INSERT INTO users (name, email, role) VALUES (?1, ?2, ?3)",
            params![name, email, role],
        )?;
        user_ids.push(conn.last_insert_rowid());
    }

    for (user_id, amount, status) in [
        (user_ids[0], 1200.50, "completed"),
        (user_ids[1], 4500.00, "flagged"),
    ] {
        conn.execute(
            "INSERT INTO transactions (user_id, amount, status) VALUES (?1, ?2, ?3)",
            params![user_id, amount, status],
        )?;
    }

    for (user_id, ip, success, metadata) in [
        (user_ids[0], "192.168.1.10", 1, r#"{"device": "laptop"}"#),
        (user_ids[1], "10.0.0.12", 0, r#"{"reason": "mfa_failed"}"#),
    ] {
        conn.execute(
            "INSERT INTO login_events (user_id, ip_address, success, metadata) VALUES (?1, ?2, ?3, ?4)",
            params![user_id, ip, success, metadata],
        )?;
    }

    Ok(())
}
