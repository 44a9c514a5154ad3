//! Best-effort repair of rejected SQL.

use sqlparser::ast::{Expr, SetExpr, Statement, Value};

use crate::parse_statements;

/// Row limit injected by [`repair_sql`] when the caller has no preference.
pub const DEFAULT_REPAIR_LIMIT: u64 = 100;

/// Re-render `sql`, adding `LIMIT <default_limit>` to a plain `SELECT` that
/// has no row limit.
///
/// Returns `None` when `sql` does not parse into exactly one statement.
/// Statements that are not plain selects are returned re-rendered but
/// otherwise untouched, so re-validation still rejects them.
pub fn repair_sql(sql: &str, default_limit: u64) -> Option<String> {
    let mut statements = match parse_statements(sql) {
        Ok(statements) => statements,
        Err(e) => {
            tracing::debug!(error = %e, "repair skipped: sql does not parse");
            return None;
        }
    };
    if statements.len() != 1 {
        return None;
    }
    let mut statement = statements.remove(0);

    if let Statement::Query(query) = &mut statement {
        let is_plain_select = matches!(query.body.as_ref(), SetExpr::Select(_));
        if is_plain_select && query.limit.is_none() && query.fetch.is_none() {
            query.limit = Some(Expr::Value(Value::Number(default_limit.to_string(), false)));
            tracing::debug!(limit = default_limit, "repair injected row limit");
        }
    }

    Some(statement.to_string())
}
