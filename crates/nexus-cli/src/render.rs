//! Human-readable output.

use colored::Colorize;
use nexus_nl2sql::{PipelineResult, Visualization};
use nexus_sentinel::{FindingStatus, ScanResult, ScanSummary};

/// Rows printed before truncating.
const MAX_ROWS: usize = 20;

pub fn print_pipeline_result(result: &PipelineResult) {
    if result.clarification_needed {
        println!("{}", "Clarification needed:".yellow().bold());
        for question in &result.clarification_questions {
            println!("  - {question}");
        }
        return;
    }

    if let Some(sql) = &result.sql {
        println!("{} {sql}", "sql:".cyan().bold());
    }
    if let Some(error) = &result.error {
        eprintln!("{} {error}", "error:".red().bold());
        return;
    }

    for row in result.rows.iter().take(MAX_ROWS) {
        println!("  {}", serde_json::Value::Object(row.clone()));
    }
    if result.rows.len() > MAX_ROWS {
        println!("  ... {} more", result.rows.len() - MAX_ROWS);
    }

    let chart = match &result.visualization {
        Visualization::Bar { x, y } => format!("bar ({x} × {y})"),
        Visualization::Metric { value } => format!("metric ({})", value.as_str()),
        Visualization::Table => "table".to_string(),
    };
    println!("{} {chart}", "chart:".cyan().bold());
    for insight in &result.insights {
        println!("{} {insight}", "insight:".green().bold());
    }
}

pub fn print_scan(result: &ScanResult) {
    println!(
        "{} {} ({}) risk {}",
        "scan".bold(),
        result.scan_id,
        result.domain,
        result.risk_score.to_string().bold()
    );
    for finding in &result.findings {
        let status = match finding.status {
            FindingStatus::Completed => finding.status.as_str().green(),
            FindingStatus::Skipped | FindingStatus::Clarification => finding.status.as_str().yellow(),
            FindingStatus::Invalid => finding.status.as_str().red(),
        };
        println!(
            "  {:<40} {:<14} risk {:>3}  {}",
            finding.mission_id, status, finding.risk, finding.mission
        );
    }
    println!("{}", result.narrative);
}

pub fn print_history(history: &[ScanSummary]) {
    if history.is_empty() {
        println!("no scans yet");
        return;
    }
    for entry in history {
        println!(
            "{}  {:<12} {:<10} risk {:>3}  {}",
            entry.scan_id, entry.domain, entry.status, entry.risk_score, entry.created_at
        );
    }
}
