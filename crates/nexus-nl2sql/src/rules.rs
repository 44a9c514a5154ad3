//! Rule-based SQL generation.
//!
//! A deterministic keyword matcher over the lower-cased question:
//! table → intent → limit → grouping → filters → date range → SQL. Anything
//! it cannot pin down comes back as a clarification, never a guess.

use std::sync::OnceLock;

use chrono::{DateTime, Datelike, Duration, NaiveDateTime, Timelike, Utc};
use nexus_store::SchemaProfile;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: u64 = 100;
pub const MAX_LIMIT: u64 = 500;
const RECENT_DAYS: i64 = 7;
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Canonical table → words that select it. Earlier entries win.
const TABLE_ALIASES: &[(&str, &[&str])] = &[
    (
        "login_events",
        &["login_events", "login", "logins", "signin", "signins", "sign-in", "sign-ins"],
    ),
    ("transactions", &["transaction", "transactions", "payment", "payments"]),
    ("users", &["user", "users", "account", "accounts", "customer", "customers"]),
];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Intent {
    #[default]
    List,
    Count,
    Sum,
    Avg,
}

impl Intent {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::List => "list",
            Self::Count => "count",
            Self::Sum => "sum",
            Self::Avg => "avg",
        }
    }

    pub fn is_aggregate(self) -> bool {
        !matches!(self, Self::List)
    }
}

/// What the generator understood about the question.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GenerationMeta {
    pub domain: Option<String>,
    pub intent: Intent,
    pub table: Option<String>,
    pub columns: Vec<String>,
    pub group_by: Option<String>,
    pub filters: Vec<String>,
    pub limit: u64,
    pub date_range: Option<(String, String)>,
}

/// Either SQL or clarification questions, never both.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Generation {
    pub sql: Option<String>,
    pub clarifications: Vec<String>,
    pub meta: GenerationMeta,
}

impl Generation {
    fn clarify(question: String, meta: GenerationMeta) -> Self {
        Self {
            sql: None,
            clarifications: vec![question],
            meta,
        }
    }
}

pub fn generate_sql(question: &str, domain: Option<&str>, schema: &SchemaProfile) -> Generation {
    generate_sql_at(question, domain, schema, Utc::now())
}

/// [`generate_sql`] with an explicit clock for relative date ranges.
pub fn generate_sql_at(
    question: &str,
    domain: Option<&str>,
    schema: &SchemaProfile,
    now: DateTime<Utc>,
) -> Generation {
    let text = question.to_lowercase();
    let tokens = tokenize(&text);

    let mut meta = GenerationMeta {
        domain: domain.map(str::to_string),
        intent: detect_intent(&text, &tokens),
        limit: detect_limit(&text),
        ..GenerationMeta::default()
    };

    let Some(table) = detect_table(&tokens, schema) else {
        let known: Vec<&str> = schema.table_names().collect();
        return Generation::clarify(
            format!("Which table should I query? Available tables: {}", known.join(", ")),
            meta,
        );
    };
    let columns = schema.columns(table).unwrap_or_default();
    meta.table = Some(table.to_string());
    meta.columns = columns.to_vec();

    match detect_group_by(&text, columns) {
        GroupBy::Column(col) => meta.group_by = Some(col),
        GroupBy::Unknown(col) => {
            return Generation::clarify(
                format!(
                    "Column '{col}' does not exist in {table}. Group by one of: {}",
                    columns.join(", ")
                ),
                meta,
            );
        }
        GroupBy::None => {}
    }

    meta.filters = detect_filters(table, &text);

    let has_created_at = columns.iter().any(|c| c == "created_at");
    if let Some((start, end)) = detect_date_range(&text, now.naive_utc()) {
        let start = start.format(TIMESTAMP_FORMAT).to_string();
        let end = end.format(TIMESTAMP_FORMAT).to_string();
        if has_created_at {
            meta.filters
                .push(format!("created_at >= '{start}' AND created_at < '{end}'"));
        }
        meta.date_range = Some((start, end));
    }

    let where_clause = if meta.filters.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", meta.filters.join(" AND "))
    };

    let intent = meta.intent;
    let sql = if let Some(col) = &meta.group_by {
        format!(
            "SELECT {col}, COUNT(*) AS count FROM {table}{where_clause} GROUP BY {col} ORDER BY count DESC"
        )
    } else {
        match intent {
            Intent::Count => format!("SELECT COUNT(*) AS count FROM {table}{where_clause}"),
            Intent::Sum | Intent::Avg => {
                if !columns.iter().any(|c| c == "amount") {
                    return Generation::clarify(
                        format!(
                            "{table} has no amount column. Which numeric column should I {}?",
                            if intent == Intent::Sum { "total" } else { "average" }
                        ),
                        meta,
                    );
                }
                let projection = if intent == Intent::Sum {
                    "SUM(amount) AS total_amount"
                } else {
                    "AVG(amount) AS avg_amount"
                };
                format!("SELECT {projection} FROM {table}{where_clause}")
            }
            Intent::List => {
                let order = if text.contains("recent") && has_created_at {
                    " ORDER BY created_at DESC"
                } else {
                    ""
                };
                format!("SELECT * FROM {table}{where_clause}{order} LIMIT {}", meta.limit)
            }
        }
    };

    tracing::debug!(%sql, table, intent = intent.as_str(), "rule generator produced sql");
    Generation {
        sql: Some(sql),
        clarifications: Vec::new(),
        meta,
    }
}

// ============================================================================
// Detection
// ============================================================================

fn cached(cell: &'static OnceLock<Option<Regex>>, pattern: &str) -> Option<&'static Regex> {
    cell.get_or_init(|| Regex::new(pattern).ok()).as_ref()
}

fn tokenize(text: &str) -> Vec<&str> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_' || c == '-'))
        .filter(|t| !t.is_empty())
        .collect()
}

fn detect_table<'s>(tokens: &[&str], schema: &'s SchemaProfile) -> Option<&'s str> {
    let aliased = TABLE_ALIASES.iter().find_map(|(table, aliases)| {
        let hit = aliases.iter().any(|a| tokens.contains(a));
        if hit {
            schema.table_names().find(|name| name == table)
        } else {
            None
        }
    });
    aliased.or_else(|| schema.table_names().find(|name| tokens.contains(name)))
}

/// Intent words match as word prefixes ("totals", "averaged"). Plain
/// substrings would read "accounts" as a count.
fn detect_intent(text: &str, tokens: &[&str]) -> Intent {
    let starts = |stem: &str| tokens.iter().any(|t| t.starts_with(stem));
    let has = |word: &str| tokens.contains(&word);
    if starts("count") || text.contains("number of") {
        Intent::Count
    } else if starts("total") || has("sum") || has("sums") {
        Intent::Sum
    } else if starts("average") || starts("avg") {
        Intent::Avg
    } else {
        Intent::List
    }
}

fn detect_limit(text: &str) -> u64 {
    static TOP: OnceLock<Option<Regex>> = OnceLock::new();
    cached(&TOP, r"\btop\s+(\d+)")
        .and_then(|re| re.captures(text))
        .map(|caps| caps[1].parse::<u64>().map_or(MAX_LIMIT, |n| n.min(MAX_LIMIT)))
        .unwrap_or(DEFAULT_LIMIT)
}

enum GroupBy {
    None,
    Column(String),
    Unknown(String),
}

fn detect_group_by(text: &str, columns: &[String]) -> GroupBy {
    if let Some(col) = columns.iter().find(|c| text.contains(&format!("by {c}"))) {
        return GroupBy::Column(col.clone());
    }

    static GROUP_BY: OnceLock<Option<Regex>> = OnceLock::new();
    match cached(&GROUP_BY, r"\bgroup(?:ed)?\s+by\s+(\w+)").and_then(|re| re.captures(text)) {
        Some(caps) => GroupBy::Unknown(caps[1].to_string()),
        None => GroupBy::None,
    }
}

fn detect_filters(table: &str, text: &str) -> Vec<String> {
    let mut filters = Vec::new();
    match table {
        "login_events" if text.contains("failed") || text.contains("unsuccessful") => {
            filters.push("success = 0".to_string());
        }
        "transactions" if text.contains("flagged") || text.contains("suspicious") => {
            filters.push("status = 'flagged'".to_string());
        }
        _ => {}
    }
    filters
}

/// `[start, end)` for the first relative-time phrase found.
fn detect_date_range(text: &str, now: NaiveDateTime) -> Option<(NaiveDateTime, NaiveDateTime)> {
    // Stored timestamps have second precision, so "now" ends after the current second.
    let now = now.with_nanosecond(0)?;
    let upper = now.checked_add_signed(Duration::try_seconds(1)?)?;
    let midnight = now.date().and_hms_opt(0, 0, 0)?;

    if text.contains("today") {
        return Some((midnight, upper));
    }
    if text.contains("yesterday") {
        return Some((midnight.checked_sub_signed(Duration::try_days(1)?)?, midnight));
    }
    if text.contains("this week") {
        let back = i64::from(now.weekday().num_days_from_monday());
        return Some((midnight.checked_sub_signed(Duration::try_days(back)?)?, upper));
    }
    if text.contains("this month") {
        return Some((now.date().with_day(1)?.and_hms_opt(0, 0, 0)?, upper));
    }

    static LAST_DAYS: OnceLock<Option<Regex>> = OnceLock::new();
    if let Some(caps) = cached(&LAST_DAYS, r"\b(?:last|past)\s+(\d+)\s+days?\b").and_then(|re| re.captures(text)) {
        let days: i64 = caps[1].parse().ok()?;
        return Some((now.checked_sub_signed(Duration::try_days(days)?)?, upper));
    }

    static LAST_HOURS: OnceLock<Option<Regex>> = OnceLock::new();
    if let Some(caps) = cached(&LAST_HOURS, r"\b(?:last|past)\s+(\d+)\s+hours?\b").and_then(|re| re.captures(text)) {
        let hours: i64 = caps[1].parse().ok()?;
        return Some((now.checked_sub_signed(Duration::try_hours(hours)?)?, upper));
    }

    if text.contains("recent") {
        return Some((now.checked_sub_signed(Duration::try_days(RECENT_DAYS)?)?, upper));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use proptest::prelude::*;

    fn schema() -> SchemaProfile {
        SchemaProfile::new()
            .with_table("login_events", &["id", "user_id", "ip_address", "success", "created_at", "metadata"])
            .with_table("transactions", &["id", "user_id", "amount", "currency", "status", "created_at"])
            .with_table("users", &["id", "name", "email", "role", "created_at"])
    }

    // Wednesday.
    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 15, 13, 45, 10).unwrap()
    }

    fn sql(question: &str) -> String {
        generate_sql_at(question, None, &schema(), now())
            .sql
            .unwrap_or_else(|| panic!("no sql for {question:?}"))
    }

    #[test]
    fn list_users() {
        let generation = generate_sql("List users", None, &schema());
        assert_eq!(generation.sql.as_deref(), Some("SELECT * FROM users LIMIT 100"));
        assert!(generation.clarifications.is_empty());
        assert_eq!(generation.meta.intent, Intent::List);
        assert_eq!(generation.meta.table.as_deref(), Some("users"));
    }

    #[test]
    fn unknown_table_asks_which_one() {
        let generation = generate_sql("Show me the widget stock", None, &schema());
        assert!(generation.sql.is_none());
        assert_eq!(generation.clarifications.len(), 1);
        assert!(generation.clarifications[0].contains("login_events, transactions, users"));
    }

    #[test]
    fn alias_only_counts_when_table_exists() {
        let only_users = SchemaProfile::new().with_table("users", &["id", "name"]);
        let generation = generate_sql("List payments", None, &only_users);
        assert!(generation.sql.is_none());
    }

    #[test]
    fn exact_table_name_matches_without_alias() {
        let s = SchemaProfile::new().with_table("invoices", &["id", "amount"]);
        let generation = generate_sql("total of invoices", None, &s);
        assert_eq!(
            generation.sql.as_deref(),
            Some("SELECT SUM(amount) AS total_amount FROM invoices")
        );
    }

    #[test]
    fn count_intent() {
        assert_eq!(sql("Count users"), "SELECT COUNT(*) AS count FROM users");
        assert_eq!(
            sql("number of payments"),
            "SELECT COUNT(*) AS count FROM transactions"
        );
    }

    #[test]
    fn sum_and_average() {
        assert_eq!(
            sql("Total transaction volume"),
            "SELECT SUM(amount) AS total_amount FROM transactions"
        );
        assert_eq!(
            sql("average payment"),
            "SELECT AVG(amount) AS avg_amount FROM transactions"
        );
    }

    #[test]
    fn inflected_intent_words() {
        assert_eq!(
            sql("Show transaction totals"),
            "SELECT SUM(amount) AS total_amount FROM transactions"
        );
        assert_eq!(
            sql("payments averaged"),
            "SELECT AVG(amount) AS avg_amount FROM transactions"
        );
        assert_eq!(sql("login counts"), "SELECT COUNT(*) AS count FROM login_events");
        // "accounts" is a table word, not a count; "summary" is not a sum.
        assert_eq!(sql("List accounts"), "SELECT * FROM users LIMIT 100");
        assert_eq!(sql("user summary"), "SELECT * FROM users LIMIT 100");
    }

    #[test]
    fn sum_without_amount_column_clarifies() {
        let generation = generate_sql_at("total users", None, &schema(), now());
        assert!(generation.sql.is_none());
        assert!(generation.clarifications[0].contains("amount"));
    }

    #[test]
    fn top_n_is_capped() {
        assert_eq!(sql("top 5 users"), "SELECT * FROM users LIMIT 5");
        assert_eq!(sql("top 9000 users"), "SELECT * FROM users LIMIT 500");
        assert_eq!(
            sql("top 99999999999999999999999 users"),
            "SELECT * FROM users LIMIT 500"
        );
    }

    #[test]
    fn group_by_known_column() {
        assert_eq!(
            sql("Show failed logins by user_id"),
            "SELECT user_id, COUNT(*) AS count FROM login_events WHERE success = 0 GROUP BY user_id ORDER BY count DESC"
        );
    }

    #[test]
    fn group_by_unknown_column_clarifies() {
        let generation = generate_sql_at("users grouped by planet", None, &schema(), now());
        assert!(generation.sql.is_none());
        assert!(generation.clarifications[0].contains("planet"));
        assert!(generation.clarifications[0].contains("id, name, email, role, created_at"));
    }

    #[test]
    fn domain_filters() {
        assert_eq!(
            sql("List flagged transactions"),
            "SELECT * FROM transactions WHERE status = 'flagged' LIMIT 100"
        );
        assert_eq!(
            sql("count unsuccessful logins"),
            "SELECT COUNT(*) AS count FROM login_events WHERE success = 0"
        );
        // filters are table-specific
        assert_eq!(sql("List flagged users"), "SELECT * FROM users LIMIT 100");
    }

    #[test]
    fn open_ranges_end_after_the_current_second() {
        let late_in_second = now() + Duration::milliseconds(750);
        let generation = generate_sql_at("count logins today", None, &schema(), late_in_second);
        assert_eq!(
            generation.meta.date_range,
            Some(("2024-05-15 00:00:00".to_string(), "2024-05-15 13:45:11".to_string()))
        );
        // Closed ranges keep their exact end.
        let generation = generate_sql_at("count logins yesterday", None, &schema(), late_in_second);
        assert_eq!(
            generation.meta.date_range.map(|(_, end)| end).as_deref(),
            Some("2024-05-15 00:00:00")
        );
    }

    #[test]
    fn date_ranges() {
        assert_eq!(
            sql("count logins today"),
            "SELECT COUNT(*) AS count FROM login_events WHERE created_at >= '2024-05-15 00:00:00' AND created_at < '2024-05-15 13:45:11'"
        );
        assert_eq!(
            sql("count logins yesterday"),
            "SELECT COUNT(*) AS count FROM login_events WHERE created_at >= '2024-05-14 00:00:00' AND created_at < '2024-05-15 00:00:00'"
        );
        assert_eq!(
            sql("count logins this week"),
            "SELECT COUNT(*) AS count FROM login_events WHERE created_at >= '2024-05-13 00:00:00' AND created_at < '2024-05-15 13:45:11'"
        );
        assert_eq!(
            sql("count logins this month"),
            "SELECT COUNT(*) AS count FROM login_events WHERE created_at >= '2024-05-01 00:00:00' AND created_at < '2024-05-15 13:45:11'"
        );
        assert_eq!(
            sql("count logins in the past 3 days"),
            "SELECT COUNT(*) AS count FROM login_events WHERE created_at >= '2024-05-12 13:45:10' AND created_at < '2024-05-15 13:45:11'"
        );
        assert_eq!(
            sql("count logins over the last 2 hours"),
            "SELECT COUNT(*) AS count FROM login_events WHERE created_at >= '2024-05-15 11:45:10' AND created_at < '2024-05-15 13:45:11'"
        );
    }

    #[test]
    fn recent_orders_and_bounds_list() {
        assert_eq!(
            sql("Show recent failed logins"),
            "SELECT * FROM login_events WHERE success = 0 AND created_at >= '2024-05-08 13:45:10' AND created_at < '2024-05-15 13:45:11' ORDER BY created_at DESC LIMIT 100"
        );
    }

    #[test]
    fn date_range_needs_created_at() {
        let s = SchemaProfile::new().with_table("users", &["id", "name"]);
        let generation = generate_sql_at("List recent users", None, &s, now());
        assert_eq!(generation.sql.as_deref(), Some("SELECT * FROM users LIMIT 100"));
        assert!(generation.meta.date_range.is_some());
    }

    #[test]
    fn absurd_day_counts_are_ignored() {
        assert_eq!(
            sql("count logins in the last 99999999999 days"),
            "SELECT COUNT(*) AS count FROM login_events"
        );
    }

    #[test]
    fn meta_records_domain() {
        let generation = generate_sql_at("List users", Some("risk"), &schema(), now());
        assert_eq!(generation.meta.domain.as_deref(), Some("risk"));
        assert_eq!(generation.meta.limit, DEFAULT_LIMIT);
        assert_eq!(generation.meta.columns.len(), 5);
    }

    proptest! {
        #[test]
        fn questions_without_table_words_clarify(
            words in prop::collection::vec(
                prop::sample::select(vec![
                    "show", "me", "the", "widget", "stock", "top", "5", "by", "count",
                    "total", "recent", "today", "flagged", "failed", "average", "of", "?",
                ]),
                0..10,
            )
        ) {
            let question = words.join(" ");
            let generation = generate_sql_at(&question, None, &schema(), now());
            prop_assert!(generation.sql.is_none());
            prop_assert!(!generation.clarifications.is_empty());
        }
    }
}
