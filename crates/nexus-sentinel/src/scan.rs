//! Scan orchestration.
//!
//! Missions run strictly in order: deep-dives depend on each mission's risk,
//! and correlation depends on every finding before it.

use nexus_nl2sql::{Pipeline, Settings};
use nexus_store::{ScanHistoryRecord, Store};

use crate::events::{MissionProgress, ScanEvent};
use crate::finding::{Finding, ScanResult, ScanStatus};
use crate::missions::{deep_dive_for, missions_for, DEEP_DIVE_THRESHOLD};
use crate::ScanError;

const CORRELATION_ID: &str = "correlation_failed_flagged";
const CORRELATION_MISSION: &str = "Correlate failed logins with flagged transactions";
const CORRELATION_SUMMARY: &str =
    "Failed logins and flagged transactions both present; investigate account compromise risk.";
const CORRELATION_RISK: u32 = 10;

pub struct Sentinel<'a> {
    store: &'a Store,
    pipeline: Pipeline<'a>,
}

impl<'a> Sentinel<'a> {
    /// `pipeline` should run against `store`.
    pub fn new(store: &'a Store, pipeline: Pipeline<'a>) -> Self {
        Self { store, pipeline }
    }

    pub fn from_settings(store: &'a Store, settings: &Settings) -> Result<Self, ScanError> {
        Ok(Self::new(store, Pipeline::from_settings(store, settings)?))
    }

    pub fn scan(&self, domain: &str) -> Result<ScanResult, ScanError> {
        self.scan_stream(domain, |_| {})
    }

    /// Run every mission for `domain`, reporting progress to `sink`, then
    /// persist and return the result. The last event is `complete`.
    pub fn scan_stream<F>(&self, domain: &str, mut sink: F) -> Result<ScanResult, ScanError>
    where
        F: FnMut(ScanEvent),
    {
        tracing::info!(domain, "sentinel scan started");
        sink(ScanEvent::Started {
            domain: domain.to_string(),
        });

        let mut findings = Vec::new();
        let mut risk_score = 0u32;

        for mission in missions_for(domain) {
            sink(ScanEvent::Mission {
                mission_id: mission.id.to_string(),
                progress: MissionProgress::Running,
            });

            let finding = match self.pipeline.run(mission.query, Some(domain)) {
                Ok(result) => Finding::from_pipeline(mission.id, mission.query, mission.risk_weight, result),
                Err(err) => {
                    tracing::warn!(mission = mission.id, error = %err, "mission failed");
                    Finding::invalid(mission.id, mission.query, err.to_string())
                }
            };
            let risk = finding.risk;
            risk_score += risk;
            sink(ScanEvent::Mission {
                mission_id: mission.id.to_string(),
                progress: MissionProgress::Finished {
                    status: finding.status,
                    risk,
                },
            });
            findings.push(finding);

            if risk >= DEEP_DIVE_THRESHOLD {
                if let Some(follow_up) = deep_dive_for(mission.id) {
                    let outcome = self
                        .pipeline
                        .run(follow_up, Some(domain))
                        .map_err(|err| err.to_string());
                    let deep_dive = Finding::deep_dive(mission.id, follow_up, outcome);
                    tracing::debug!(mission = mission.id, status = deep_dive.status.as_str(), "deep-dive");
                    sink(ScanEvent::DeepDive {
                        mission_id: deep_dive.mission_id.clone(),
                        status: deep_dive.status,
                    });
                    findings.push(deep_dive);
                }
            }
        }

        if let Some(correlation) = correlate(&findings) {
            risk_score += correlation.risk;
            sink(ScanEvent::Correlation {
                risk: correlation.risk,
            });
            findings.push(correlation);
        }

        let narrative = narrative(domain, &findings, risk_score);
        let result = ScanResult {
            scan_id: uuid::Uuid::new_v4().simple().to_string(),
            domain: domain.to_string(),
            status: ScanStatus::Completed,
            risk_score,
            findings,
            narrative,
        };

        self.persist(&result)?;
        tracing::info!(scan_id = %result.scan_id, domain, risk_score, "sentinel scan completed");

        sink(ScanEvent::Complete(Box::new(result.clone())));
        Ok(result)
    }

    fn persist(&self, result: &ScanResult) -> Result<(), ScanError> {
        let result_json = serde_json::to_string(result)?;
        self.store.insert_scan_history(&ScanHistoryRecord {
            scan_id: &result.scan_id,
            domain: &result.domain,
            status: result.status.as_str(),
            risk_score: result.risk_score,
            result_json: &result_json,
        })?;
        Ok(())
    }
}

/// Failed logins plus flagged transactions in the same scan.
fn correlate(findings: &[Finding]) -> Option<Finding> {
    let risky = |id: &str| findings.iter().any(|f| f.mission_id == id && f.risk > 0);
    (risky("failed_logins") && risky("flagged_transactions")).then(|| {
        Finding::correlation(
            CORRELATION_ID,
            CORRELATION_MISSION,
            CORRELATION_SUMMARY,
            CORRELATION_RISK,
        )
    })
}

fn narrative(domain: &str, findings: &[Finding], risk_score: u32) -> String {
    let completed = findings.iter().filter(|f| f.is_completed()).count();
    format!(
        "Sentinel scan completed for domain {domain}. Completed {completed} missions with risk score {risk_score}."
    )
}

/// Scan with the generator `settings` selects.
pub fn run_scan(store: &Store, settings: &Settings, domain: &str) -> Result<ScanResult, ScanError> {
    Sentinel::from_settings(store, settings)?.scan(domain)
}

/// [`run_scan`], reporting progress to `sink` as it goes.
pub fn run_scan_stream<F>(
    store: &Store,
    settings: &Settings,
    domain: &str,
    sink: F,
) -> Result<ScanResult, ScanError>
where
    F: FnMut(ScanEvent),
{
    Sentinel::from_settings(store, settings)?.scan_stream(domain, sink)
}
