//! Query pipeline
//!
//! `LOAD_SCHEMA → GENERATE (rules | llm) → VALIDATE → [repair] → EXECUTE →
//! POST_PROCESS`
//!
//! A run ends in exactly one of: rows, a clarification, an invalid-SQL
//! report, or an `Err` (introspection, execution or LLM transport failure).

use std::sync::OnceLock;

use nexus_sql::{repair_sql, validate_sql, DEFAULT_REPAIR_LIMIT};
use nexus_store::{Row, SchemaProfile, Store, StoreError};
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::config::{ConfigError, Nl2SqlMode, Settings};
use crate::llm::{build_prompt, client_from_settings, parse_llm_output, LlmClient, LlmError};
use crate::rules::{generate_sql, Intent};

pub const REPHRASE_QUESTION: &str =
    "Could you rephrase the question with more detail about what you want to see?";

#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("schema introspection failed: {0}")]
    Introspection(#[source] StoreError),
    #[error("query execution failed: {0}")]
    Execution(#[source] StoreError),
    #[error("LLM request failed: {0}")]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

// ============================================================================
// Result
// ============================================================================

/// Chart hint for the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Visualization {
    Bar { x: String, y: String },
    Metric { value: Intent },
    Table,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineResult {
    pub sql: Option<String>,
    pub rows: Vec<Row>,
    pub visualization: Visualization,
    pub insights: Vec<String>,
    pub clarification_needed: bool,
    pub clarification_questions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PipelineResult {
    pub fn clarification(mut questions: Vec<String>) -> Self {
        if questions.is_empty() {
            questions.push(REPHRASE_QUESTION.to_string());
        }
        Self {
            sql: None,
            rows: Vec::new(),
            visualization: Visualization::Table,
            insights: Vec::new(),
            clarification_needed: true,
            clarification_questions: questions,
            error: None,
        }
    }

    pub fn invalid(sql: String, error: String) -> Self {
        Self {
            sql: Some(sql),
            rows: Vec::new(),
            visualization: Visualization::Table,
            insights: Vec::new(),
            clarification_needed: false,
            clarification_questions: Vec::new(),
            error: Some(error),
        }
    }

    fn completed(sql: String, rows: Vec<Row>) -> Self {
        let shape = SqlShape::of(&sql);
        let visualization = shape.visualization();
        let insights = shape.insights(&rows);
        Self {
            sql: Some(sql),
            rows,
            visualization,
            insights,
            clarification_needed: false,
            clarification_questions: Vec::new(),
            error: None,
        }
    }
}

// ============================================================================
// Generation strategy
// ============================================================================

/// How SQL gets produced, fixed for the lifetime of a [`Pipeline`].
pub enum Generator {
    Rules,
    Llm(Box<dyn LlmClient>),
}

impl std::fmt::Debug for Generator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Rules => f.write_str("Rules"),
            Self::Llm(client) => f.debug_tuple("Llm").field(&client.name()).finish(),
        }
    }
}

impl Generator {
    /// `rules` mode, or `llm` mode without a usable provider, gives `Rules`.
    /// A selected provider missing its credential is an error.
    pub fn from_settings(settings: &Settings) -> Result<Self, ConfigError> {
        match settings.nl2sql_mode {
            Nl2SqlMode::Rules => Ok(Self::Rules),
            Nl2SqlMode::Llm => match client_from_settings(settings)? {
                Some(client) => Ok(Self::Llm(client)),
                None => {
                    tracing::warn!(
                        provider = %settings.llm_provider,
                        "no LLM client available; falling back to rule-based generation"
                    );
                    Ok(Self::Rules)
                }
            },
        }
    }

    pub fn is_llm(&self) -> bool {
        matches!(self, Self::Llm(_))
    }

    fn generate(
        &self,
        question: &str,
        domain: Option<&str>,
        schema: &SchemaProfile,
    ) -> Result<(Option<String>, Vec<String>), LlmError> {
        match self {
            Self::Rules => {
                let generation = generate_sql(question, domain, schema);
                Ok((generation.sql, generation.clarifications))
            }
            Self::Llm(client) => {
                let prompt = build_prompt(question, domain, schema);
                let reply = client.generate(&prompt)?;
                tracing::debug!(provider = client.name(), reply_len = reply.len(), "LLM replied");
                Ok(parse_llm_output(&reply))
            }
        }
    }
}

// ============================================================================
// Pipeline
// ============================================================================

pub struct Pipeline<'a> {
    store: &'a Store,
    generator: Generator,
}

impl<'a> Pipeline<'a> {
    pub fn new(store: &'a Store, generator: Generator) -> Self {
        Self { store, generator }
    }

    pub fn from_settings(store: &'a Store, settings: &Settings) -> Result<Self, PipelineError> {
        Ok(Self::new(store, Generator::from_settings(settings)?))
    }

    pub fn generator(&self) -> &Generator {
        &self.generator
    }

    pub fn run(&self, question: &str, domain: Option<&str>) -> Result<PipelineResult, PipelineError> {
        let schema = self
            .store
            .schema_profile()
            .map_err(PipelineError::Introspection)?;
        tracing::debug!(tables = schema.len(), "schema loaded");

        let (sql, questions) = self.generator.generate(question, domain, &schema)?;
        let Some(mut sql) = sql.filter(|s| !s.trim().is_empty()) else {
            tracing::debug!(questions = questions.len(), "clarification needed");
            return Ok(PipelineResult::clarification(questions));
        };

        let mut error = validate_sql(&sql);
        if let Some(first) = &error {
            tracing::debug!(%sql, error = %first, "validation failed; attempting repair");
            if let Some(repaired) = repair_sql(&sql, DEFAULT_REPAIR_LIMIT) {
                sql = repaired;
                error = validate_sql(&sql);
            }
        }
        if let Some(error) = error {
            tracing::warn!(%sql, %error, "generated SQL rejected");
            return Ok(PipelineResult::invalid(sql, error));
        }

        let rows = self
            .store
            .query(&sql, [])
            .map_err(PipelineError::Execution)?;
        tracing::debug!(%sql, rows = rows.len(), "query executed");

        Ok(PipelineResult::completed(sql, rows))
    }
}

/// One-shot entry point: resolve the generator from `settings` and run.
pub fn run_query_pipeline(
    store: &Store,
    settings: &Settings,
    question: &str,
    domain: Option<&str>,
) -> Result<PipelineResult, PipelineError> {
    Pipeline::from_settings(store, settings)?.run(question, domain)
}

// ============================================================================
// Post-processing
// ============================================================================

/// Intent and grouping read back from the SQL text itself.
#[derive(Debug, Clone, PartialEq)]
struct SqlShape {
    intent: Intent,
    group_by: Option<String>,
}

impl SqlShape {
    fn of(sql: &str) -> Self {
        let lower = sql.to_lowercase();

        let mut intent = Intent::List;
        for (needle, candidate) in [("count(", Intent::Count), ("sum(", Intent::Sum), ("avg(", Intent::Avg)] {
            if lower.contains(needle) {
                intent = candidate;
            }
        }

        static GROUP_BY: OnceLock<Option<Regex>> = OnceLock::new();
        let group_by = GROUP_BY
            .get_or_init(|| Regex::new(r"group by\s+(\w+)").ok())
            .as_ref()
            .and_then(|re| re.captures(&lower))
            .map(|caps| caps[1].to_string());

        Self { intent, group_by }
    }

    fn visualization(&self) -> Visualization {
        if let Some(col) = &self.group_by {
            return Visualization::Bar {
                x: col.clone(),
                y: "count".to_string(),
            };
        }
        if self.intent.is_aggregate() {
            Visualization::Metric { value: self.intent }
        } else {
            Visualization::Table
        }
    }

    fn insights(&self, rows: &[Row]) -> Vec<String> {
        let first = rows.first();
        let insight = match (self.intent, first) {
            (Intent::Count, Some(row)) => format!("Count result: {}", display(row.get("count"))),
            (Intent::Sum, Some(row)) => format!("SUM(amount) = {}", display(row.get("total_amount"))),
            (Intent::Avg, Some(row)) => format!("AVG(amount) = {}", display(row.get("avg_amount"))),
            _ => format!("Returned {} rows.", rows.len()),
        };
        vec![insight]
    }
}

fn display(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "null".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn row(pairs: &[(&str, Value)]) -> Row {
        pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect()
    }

    #[test]
    fn shape_reads_aggregate_and_grouping() {
        let shape = SqlShape::of("SELECT user_id, COUNT(*) AS count FROM t GROUP BY user_id");
        assert_eq!(shape.intent, Intent::Count);
        assert_eq!(shape.group_by.as_deref(), Some("user_id"));
        assert_eq!(
            shape.visualization(),
            Visualization::Bar { x: "user_id".into(), y: "count".into() }
        );
    }

    #[test]
    fn later_aggregates_override_earlier() {
        let shape = SqlShape::of("SELECT COUNT(*), AVG(amount) AS avg_amount FROM t");
        assert_eq!(shape.intent, Intent::Avg);
        assert_eq!(shape.visualization(), Visualization::Metric { value: Intent::Avg });
    }

    #[test]
    fn plain_select_is_a_table() {
        let shape = SqlShape::of("SELECT * FROM users LIMIT 100");
        assert_eq!(shape.visualization(), Visualization::Table);
        assert_eq!(shape.insights(&[Row::new(), Row::new()]), vec!["Returned 2 rows."]);
    }

    #[test]
    fn insights_format_values() {
        let count = SqlShape::of("SELECT COUNT(*) AS count FROM t");
        assert_eq!(count.insights(&[row(&[("count", json!(3))])]), vec!["Count result: 3"]);

        let sum = SqlShape::of("SELECT SUM(amount) AS total_amount FROM t");
        assert_eq!(
            sum.insights(&[row(&[("total_amount", json!(5700.5))])]),
            vec!["SUM(amount) = 5700.5"]
        );

        let avg = SqlShape::of("SELECT AVG(amount) AS avg_amount FROM t");
        assert_eq!(
            avg.insights(&[row(&[("avg_amount", Value::Null)])]),
            vec!["AVG(amount) = null"]
        );
        assert_eq!(avg.insights(&[]), vec!["Returned 0 rows."]);
    }

    #[test]
    fn visualization_wire_format() {
        assert_eq!(serde_json::to_value(Visualization::Table).unwrap(), json!({"type": "table"}));
        assert_eq!(
            serde_json::to_value(Visualization::Metric { value: Intent::Sum }).unwrap(),
            json!({"type": "metric", "value": "sum"})
        );
        assert_eq!(
            serde_json::to_value(Visualization::Bar { x: "role".into(), y: "count".into() }).unwrap(),
            json!({"type": "bar", "x": "role", "y": "count"})
        );
    }

    #[test]
    fn empty_clarification_gets_a_question() {
        let result = PipelineResult::clarification(Vec::new());
        assert!(result.clarification_needed);
        assert_eq!(result.sql, None);
        assert_eq!(result.clarification_questions, vec![REPHRASE_QUESTION]);

        let value = serde_json::to_value(&result).unwrap();
        assert!(value.get("error").is_none());
        assert_eq!(value["visualization"], json!({"type": "table"}));
    }
}
