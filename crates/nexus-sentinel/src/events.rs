//! Progress events emitted by a streaming scan.

use serde_json::{json, Value};

use crate::finding::{FindingStatus, ScanResult};

/// Where a mission is when its event fires.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissionProgress {
    Running,
    Finished { status: FindingStatus, risk: u32 },
}

#[derive(Debug, Clone, PartialEq)]
pub enum ScanEvent {
    Started { domain: String },
    Mission { mission_id: String, progress: MissionProgress },
    DeepDive { mission_id: String, status: FindingStatus },
    Correlation { risk: u32 },
    Complete(Box<ScanResult>),
}

impl ScanEvent {
    /// Wire event name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Started { .. } => "status",
            Self::Mission { .. } => "mission",
            Self::DeepDive { .. } => "deep_dive",
            Self::Correlation { .. } => "correlation",
            Self::Complete(_) => "complete",
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            Self::Started { domain } => json!({ "status": "started", "domain": domain }),
            Self::Mission {
                mission_id,
                progress: MissionProgress::Running,
            } => json!({ "mission_id": mission_id, "status": "running" }),
            Self::Mission {
                mission_id,
                progress: MissionProgress::Finished { status, risk },
            } => json!({ "mission_id": mission_id, "status": status, "risk": risk }),
            Self::DeepDive { mission_id, status } => {
                json!({ "mission_id": mission_id, "status": status })
            }
            Self::Correlation { risk } => json!({ "status": "completed", "risk": risk }),
            Self::Complete(result) => match serde_json::to_value(result.as_ref()) {
                Ok(value) => value,
                Err(err) => {
                    tracing::warn!(scan_id = %result.scan_id, error = %err, "complete payload failed to serialize");
                    json!({ "scan_id": result.scan_id, "status": "error", "error": err.to_string() })
                }
            },
        }
    }
}
