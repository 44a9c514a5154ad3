//! Workspace-level integration tests
//!
//! End-to-end flows across the store, the SQL safety layer, the query
//! pipeline and the sentinel.

use nexus_nl2sql::{
    generate_sql, parse_llm_output, run_query_pipeline, Generator, MockLlm, Pipeline, Settings,
};
use nexus_sentinel::{get_history, list_history, run_scan};
use nexus_sql::{repair_sql, validate_sql, DEFAULT_REPAIR_LIMIT};
use nexus_store::{demo::seed_demo_data, Store};

fn demo_store() -> Store {
    let store = Store::open_in_memory().unwrap();
    seed_demo_data(&store).unwrap();
    store
}

// ============================================================================
// Acceptance scenarios
// ============================================================================

#[test]
fn list_users_generates_plain_select() {
    let store = demo_store();
    let schema = store.schema_profile().unwrap();
    let generation = generate_sql("List users", None, &schema);
    assert_eq!(generation.sql.as_deref(), Some("SELECT * FROM users LIMIT 100"));
    assert!(generation.clarifications.is_empty());
}

#[test]
fn unknown_table_asks_for_clarification() {
    let store = demo_store();
    let schema = store.schema_profile().unwrap();
    let generation = generate_sql("Show me the widget stock", None, &schema);
    assert!(generation.sql.is_none());
    assert!(!generation.clarifications.is_empty());
}

#[test]
fn repair_adds_default_limit() {
    let repaired = repair_sql("SELECT * FROM users", DEFAULT_REPAIR_LIMIT).unwrap();
    assert!(repaired.contains("LIMIT 100"));
}

#[test]
fn drop_is_rejected() {
    assert!(validate_sql("DROP TABLE users").is_some());
}

#[test]
fn security_scan_round_trips_through_history() {
    let store = demo_store();
    let result = run_scan(&store, &Settings::default(), "security").unwrap();

    assert!(result.findings.len() >= 2);
    assert_eq!(result.status.as_str(), "completed");

    let stored = get_history(&store, &result.scan_id).unwrap().unwrap();
    assert_eq!(stored.scan_id, result.scan_id);
    assert_eq!(list_history(&store).unwrap()[0].scan_id, result.scan_id);
}

#[test]
fn llm_clarification_reply_is_parsed() {
    let (sql, questions) = parse_llm_output("CLARIFY:\n- Which table?\n- What time range?");
    assert_eq!(sql, None);
    assert_eq!(questions, vec!["Which table?", "What time range?"]);
}

// ============================================================================
// Cross-crate invariants
// ============================================================================

#[test]
fn executed_sql_always_validates() {
    let store = demo_store();
    let settings = Settings::default();
    for question in [
        "List users",
        "Count failed logins",
        "Total payments this month",
        "average transaction",
        "top 1 users",
        "Show logins by ip_address",
        "List flagged transactions",
    ] {
        let result = run_query_pipeline(&store, &settings, question, None).unwrap();
        let sql = result.sql.expect(question);
        assert_eq!(validate_sql(&sql), None, "{question}: {sql}");
    }
}

#[test]
fn sql_is_absent_exactly_when_clarifying() {
    let store = demo_store();
    for reply in ["CLARIFY: which?", "SELECT * FROM users", "UPDATE users SET name = 'x'", ""] {
        let pipeline = Pipeline::new(&store, Generator::Llm(Box::new(MockLlm::new(reply))));
        let result = pipeline.run("q", None).unwrap();
        assert_eq!(result.sql.is_none(), result.clarification_needed, "{reply:?}");
    }
}

#[test]
fn limitless_llm_select_is_executed_as_is() {
    let store = demo_store();
    let pipeline = Pipeline::new(
        &store,
        Generator::Llm(Box::new(MockLlm::new("SELECT email FROM users"))),
    );
    let result = pipeline.run("emails", None).unwrap();
    assert_eq!(result.sql.as_deref(), Some("SELECT email FROM users"));
    assert_eq!(result.rows.len(), 2);
}

#[test]
fn sqlite_aggregate_filter_from_llm_executes() {
    let store = demo_store();
    let sql = "SELECT COUNT(*) FILTER (WHERE success = 0) AS failed FROM login_events";
    let pipeline = Pipeline::new(&store, Generator::Llm(Box::new(MockLlm::new(sql))));
    let result = pipeline.run("failed logins", None).unwrap();
    assert_eq!(result.error, None);
    assert_eq!(result.rows[0]["failed"], 1);
}

#[test]
fn select_star_rows_keep_column_order() {
    let store = demo_store();
    let rows = store.query("SELECT * FROM users", []).unwrap();
    let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
    assert_eq!(keys, vec!["id", "name", "email", "role", "created_at"]);
}
