//! Queries for the `scan_history` table: a write-once log of sentinel scans.

use rusqlite::{params, OptionalExtension};

use crate::{Store, StoreError};

/// A scan result ready to be persisted.
#[derive(Debug, Clone)]
pub struct ScanHistoryRecord<'a> {
    pub scan_id: &'a str,
    pub domain: &'a str,
    pub status: &'a str,
    pub risk_score: u32,
    pub result_json: &'a str,
}

/// A persisted scan.
#[derive(Debug, Clone)]
pub struct ScanHistoryRow {
    pub id: i64,
    pub scan_id: String,
    pub domain: String,
    pub status: String,
    pub risk_score: u32,
    pub result_json: String,
    pub created_at: String,
}

const SELECT_COLUMNS: &str =
    "SELECT id, scan_id, domain, status, risk_score, result_json, created_at FROM scan_history";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<ScanHistoryRow> {
    Ok(ScanHistoryRow {
        id: row.get(0)?,
        scan_id: row.get(1)?,
        domain: row.get(2)?,
        status: row.get(3)?,
        risk_score: row.get(4)?,
        result_json: row.get(5)?,
        created_at: row.get(6)?,
    })
}

impl Store {
    /// Insert one scan and commit. Returns the row id.
    pub fn insert_scan_history(&self, record: &ScanHistoryRecord<'_>) -> Result<i64, StoreError> {
        self.connection().execute(
            "INSERT INTO scan_history (scan_id, domain, status, risk_score, result_json)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                record.scan_id,
                record.domain,
                record.status,
                record.risk_score,
                record.result_json
            ],
        )?;
        Ok(self.connection().last_insert_rowid())
    }

    /// Every persisted scan, newest first.
    pub fn list_scan_history(&self) -> Result<Vec<ScanHistoryRow>, StoreError> {
        let mut stmt = self
            .connection()
            .prepare_cached(&format!("{SELECT_COLUMNS} ORDER BY created_at DESC, id DESC"))?;
        let rows = stmt
            .query_map([], map_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Exact-match lookup by scan id.
    pub fn get_scan_history(&self, scan_id: &str) -> Result<Option<ScanHistoryRow>, StoreError> {
        let row = self
            .connection()
            .query_row(
                &format!("{SELECT_COLUMNS} WHERE scan_id = ?1"),
                [scan_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    pub fn count_scan_history(&self) -> Result<i64, StoreError> {
        Ok(self
            .connection()
            .query_row("SELECT COUNT(*) FROM scan_history", [], |row| row.get(0))?)
    }
}
