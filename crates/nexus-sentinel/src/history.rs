//! Read access to persisted scans.

use nexus_store::Store;

use crate::finding::{ScanResult, ScanSummary};
use crate::ScanError;

/// Every persisted scan, newest first.
pub fn list_history(store: &Store) -> Result<Vec<ScanSummary>, ScanError> {
    let rows = store.list_scan_history()?;
    Ok(rows
        .into_iter()
        .map(|row| ScanSummary {
            scan_id: row.scan_id,
            domain: row.domain,
            status: row.status,
            risk_score: row.risk_score,
            created_at: row.created_at,
        })
        .collect())
}

/// The full result for `scan_id`, if it exists.
pub fn get_history(store: &Store, scan_id: &str) -> Result<Option<ScanResult>, ScanError> {
    store
        .get_scan_history(scan_id)?
        .map(|row| serde_json::from_str(&row.result_json).map_err(ScanError::from))
        .transpose()
}
