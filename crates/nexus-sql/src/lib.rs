//! SQL safety for Nexus
//!
//! Every SQL string that reaches the store passes through here first:
//! - [`validate_sql`] accepts a candidate only if it is exactly one
//!   read-only `SELECT` statement.
//! - [`repair_sql`] is the single best-effort fix applied after a rejection:
//!   it injects a row limit into an otherwise well-formed `SELECT`.
//!
//! Both work on a real `sqlparser` AST (SQLite dialect, matching the store), never on keyword
//! substrings, so SQL text hidden in string literals or comments cannot
//! trip (or slip past) the checks.

mod repair;
mod validator;

pub use repair::{repair_sql, DEFAULT_REPAIR_LIMIT};
pub use validator::{
    has_single_statement, is_read_only_sql, validate_sql, MSG_READ_ONLY, MSG_SINGLE_STATEMENT,
};

use sqlparser::ast::Statement;
use sqlparser::dialect::SQLiteDialect;
use sqlparser::parser::{Parser, ParserError};

/// Parse `sql` with the dialect shared by the validator and the repairer.
pub(crate) fn parse_statements(sql: &str) -> Result<Vec<Statement>, ParserError> {
    let dialect = SQLiteDialect {};
    Parser::parse_sql(&dialect, sql)
}
