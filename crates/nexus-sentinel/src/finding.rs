//! Scan output types. These serialise to the persisted `result_json`.

use nexus_nl2sql::{PipelineResult, Visualization};
use nexus_store::Row;
use serde::{Deserialize, Serialize};

use crate::missions::mission_risk;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FindingStatus {
    Completed,
    Invalid,
    Clarification,
    Skipped,
}

impl FindingStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
            Self::Invalid => "invalid",
            Self::Clarification => "clarification",
            Self::Skipped => "skipped",
        }
    }
}

/// Outcome of one mission, deep-dive or correlation rule.
///
/// `risk` is zero for anything that is not `completed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finding {
    pub mission_id: String,
    pub mission: String,
    pub status: FindingStatus,
    #[serde(default)]
    pub risk: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sql: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rows: Option<Vec<Row>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub visualization: Option<Visualization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub insights: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
}

impl Finding {
    fn bare(mission_id: impl Into<String>, mission: impl Into<String>, status: FindingStatus) -> Self {
        Self {
            mission_id: mission_id.into(),
            mission: mission.into(),
            status,
            risk: 0,
            sql: None,
            rows: None,
            visualization: None,
            insights: None,
            questions: None,
            error: None,
            reason: None,
            summary: None,
        }
    }

    /// Map a pipeline outcome for a scored mission.
    pub fn from_pipeline(
        mission_id: &str,
        mission: &str,
        risk_weight: u32,
        mut result: PipelineResult,
    ) -> Self {
        if result.clarification_needed {
            return Self {
                questions: Some(result.clarification_questions),
                ..Self::bare(mission_id, mission, FindingStatus::Clarification)
            };
        }
        if let Some(error) = result.error.take() {
            return Self::invalid(mission_id, mission, error);
        }
        Self {
            risk: mission_risk(result.rows.len(), risk_weight),
            ..Self::completed(mission_id, mission, result)
        }
    }

    /// A mission whose pipeline run failed outright.
    pub fn invalid(mission_id: &str, mission: &str, error: String) -> Self {
        Self {
            error: Some(error),
            ..Self::bare(mission_id, mission, FindingStatus::Invalid)
        }
    }

    /// An unscored follow-up. Anything short of rows becomes `skipped`.
    pub fn deep_dive(mission_id: &str, mission: &str, outcome: Result<PipelineResult, String>) -> Self {
        let id = format!("{mission_id}_deep_dive");
        let reason = match outcome {
            Ok(result) if result.clarification_needed => "clarification_needed".to_string(),
            Ok(PipelineResult { error: Some(error), .. }) => error,
            Ok(result) => return Self::completed(&id, mission, result),
            Err(error) => error,
        };
        Self {
            reason: Some(reason),
            ..Self::bare(id, mission, FindingStatus::Skipped)
        }
    }

    pub fn correlation(mission_id: &str, mission: &str, summary: &str, risk: u32) -> Self {
        Self {
            risk,
            summary: Some(summary.to_string()),
            ..Self::bare(mission_id, mission, FindingStatus::Completed)
        }
    }

    fn completed(mission_id: &str, mission: &str, result: PipelineResult) -> Self {
        Self {
            sql: result.sql,
            rows: Some(result.rows),
            visualization: Some(result.visualization),
            insights: Some(result.insights),
            ..Self::bare(mission_id, mission, FindingStatus::Completed)
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == FindingStatus::Completed
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScanStatus {
    Completed,
}

impl ScanStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Completed => "completed",
        }
    }
}

/// A finished scan. Written once to history, never updated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanResult {
    pub scan_id: String,
    pub domain: String,
    pub status: ScanStatus,
    pub risk_score: u32,
    pub findings: Vec<Finding>,
    pub narrative: String,
}

/// One history entry, without its findings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanSummary {
    pub scan_id: String,
    pub domain: String,
    pub status: String,
    pub risk_score: u32,
    pub created_at: String,
}
