//! LLM boundary
//!
//! Builds a schema-grounded prompt, hands it to whatever provider is
//! configured, and turns the reply back into either SQL or clarification
//! questions. Providers live in [`providers`]; the pipeline only ever sees
//! the [`LlmClient`] trait.

pub mod providers;

pub use providers::{client_from_settings, MockLlm};

use std::sync::Arc;

use nexus_store::SchemaProfile;

// ============================================================================
// Provider interface
// ============================================================================

/// Something that turns a prompt into text.
pub trait LlmClient: Send + Sync {
    fn generate(&self, prompt: &str) -> Result<String, LlmError>;

    /// Provider name, for logs.
    fn name(&self) -> &str;
}

impl<T: LlmClient + ?Sized> LlmClient for Arc<T> {
    fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        (**self).generate(prompt)
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),
    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },
    #[error("invalid response: {0}")]
    InvalidResponse(String),
}

// ============================================================================
// Prompt
// ============================================================================

pub const DEFAULT_DOMAIN: &str = "general";

const DOMAIN_FOCUS: &[(&str, &str)] = &[
    (
        "security",
        "Focus on security anomalies, failed logins, and suspicious transactions.",
    ),
    ("compliance", "Focus on policy adherence and audit readiness."),
    ("risk", "Focus on high-value or unusual activity indicating risk."),
    (
        "operations",
        "Focus on system usage, operational bottlenecks, and performance.",
    ),
    (
        "general",
        "Provide general analytical insights across the dataset.",
    ),
];

/// Focus sentence for `domain`; unknown domains get the general one.
pub fn domain_focus(domain: Option<&str>) -> &'static str {
    let key = domain.map(str::trim).unwrap_or(DEFAULT_DOMAIN);
    DOMAIN_FOCUS
        .iter()
        .find(|(name, _)| name.eq_ignore_ascii_case(key))
        .or_else(|| DOMAIN_FOCUS.iter().find(|(name, _)| *name == DEFAULT_DOMAIN))
        .map(|(_, focus)| *focus)
        .unwrap_or_default()
}

/// One `table(col1, col2, ...)` line per table.
pub fn format_schema(schema: &SchemaProfile) -> String {
    schema
        .iter()
        .map(|(table, columns)| format!("{table}({})", columns.join(", ")))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn build_prompt(question: &str, domain: Option<&str>, schema: &SchemaProfile) -> String {
    let domain_label = domain
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .unwrap_or(DEFAULT_DOMAIN);

    format!(
        "You are a careful analytics assistant that writes SQLite SQL.\n\
         Use only these tables and columns:\n\
         {schema}\n\
         \n\
         Rules:\n\
         - Return exactly one read-only SELECT statement and nothing else.\n\
         - Never write INSERT, UPDATE, DELETE, DROP, ALTER or TRUNCATE.\n\
         - If the question is ambiguous, reply with a line starting with CLARIFY: \
         followed by one bulleted question per line.\n\
         \n\
         Domain: {domain_label}\n\
         {focus}\n\
         \n\
         Question: {question}\n",
        schema = format_schema(schema),
        focus = domain_focus(domain),
        question = question.trim(),
    )
}

// ============================================================================
// Reply parsing
// ============================================================================

const CLARIFY_PREFIX: &str = "clarify:";
const SQL_PREFIX: &str = "sql:";

/// Split a model reply into SQL or clarification questions.
///
/// An empty reply yields neither.
pub fn parse_llm_output(text: &str) -> (Option<String>, Vec<String>) {
    let trimmed = text.trim();

    if let Some(rest) = strip_prefix_ignore_case(trimmed, CLARIFY_PREFIX) {
        let mut questions: Vec<String> = rest
            .lines()
            .map(|line| {
                let line = line.trim();
                line.strip_prefix("- ").unwrap_or(line).trim().to_string()
            })
            .filter(|line| !line.is_empty())
            .collect();
        if questions.is_empty() && !rest.trim().is_empty() {
            questions.push(rest.trim().to_string());
        }
        return (None, questions);
    }

    let mut sql = strip_prefix_ignore_case(trimmed, SQL_PREFIX)
        .unwrap_or(trimmed)
        .trim();

    if let Some(inner) = sql.strip_prefix("```") {
        let inner = inner.strip_suffix("```").unwrap_or(inner);
        let inner = strip_prefix_ignore_case(inner, "sql").unwrap_or(inner);
        sql = inner.trim();
    }

    if sql.is_empty() {
        (None, Vec::new())
    } else {
        (Some(sql.to_string()), Vec::new())
    }
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &text[prefix.len()..])
}
