//! Nexus sentinel
//!
//! A scan runs a fixed battery of investigative questions ("missions") for a
//! domain through the query pipeline, scores each by how many rows it
//! returns, follows up on risky missions with a deep-dive, applies a
//! cross-mission correlation rule, and writes the whole result to history.
//!
//! Individual mission failures never abort a scan; they become `invalid`,
//! `clarification` or `skipped` findings. Only persistence errors do.

pub mod events;
pub mod finding;
pub mod history;
pub mod missions;
pub mod scan;

pub use events::{MissionProgress, ScanEvent};
pub use finding::{Finding, FindingStatus, ScanResult, ScanStatus, ScanSummary};
pub use history::{get_history, list_history};
pub use missions::{missions_for, Mission};
pub use scan::{run_scan, run_scan_stream, Sentinel};

use nexus_nl2sql::PipelineError;
use nexus_store::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("store error: {0}")]
    Store(#[from] StoreError),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("pipeline setup failed: {0}")]
    Setup(#[from] PipelineError),
}
