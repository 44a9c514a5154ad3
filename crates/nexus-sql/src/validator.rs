//! Read-only, single-statement validation.

use std::ops::ControlFlow;

use sqlparser::ast::{visit_statements, SetExpr, Statement};

use crate::parse_statements;

pub const MSG_SINGLE_STATEMENT: &str = "Only a single SQL statement is allowed.";
pub const MSG_READ_ONLY: &str = "SQL must be read-only (SELECT statements only).";

/// Returns `None` when `sql` is safe to execute, otherwise the rejection
/// message shown to the caller.
///
/// Rules, checked in order:
/// 1. `sql` parses into exactly one statement.
/// 2. That statement is a `SELECT` and no statement nested anywhere in its
///    tree (e.g. a data-modifying CTE) is anything but a query.
pub fn validate_sql(sql: &str) -> Option<String> {
    if !has_single_statement(sql) {
        return Some(MSG_SINGLE_STATEMENT.to_string());
    }
    if !is_read_only_sql(sql) {
        return Some(MSG_READ_ONLY.to_string());
    }
    None
}

/// `true` iff `sql` parses and yields exactly one statement.
pub fn has_single_statement(sql: &str) -> bool {
    match parse_statements(sql) {
        Ok(statements) => statements.len() == 1,
        Err(e) => {
            tracing::debug!(error = %e, "sql failed to parse");
            false
        }
    }
}

/// `true` iff `sql` parses into a single `SELECT` whose whole tree is free
/// of writes and DDL.
pub fn is_read_only_sql(sql: &str) -> bool {
    let Ok(statements) = parse_statements(sql) else {
        return false;
    };
    let [statement] = statements.as_slice() else {
        return false;
    };

    let Statement::Query(query) = statement else {
        return false;
    };
    if !is_select_body(&query.body) {
        return false;
    }

    // Anything other than a query anywhere in the tree is a write or DDL:
    // INSERT/UPDATE wrapped in a CTE or set expression, for instance.
    let nested = visit_statements(statement, |stmt| {
        if matches!(stmt, Statement::Query(_)) {
            ControlFlow::Continue(())
        } else {
            ControlFlow::Break(())
        }
    });
    nested.is_continue()
}

fn is_select_body(body: &SetExpr) -> bool {
    match body {
        // `SELECT ... INTO new_table` creates a table.
        SetExpr::Select(select) => select.into.is_none(),
        SetExpr::Query(query) => is_select_body(&query.body),
        SetExpr::SetOperation { left, right, .. } => is_select_body(left) && is_select_body(right),
        _ => false,
    }
}
