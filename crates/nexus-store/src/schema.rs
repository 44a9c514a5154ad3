use std::collections::BTreeMap;

use rusqlite::Connection;
use serde::{Deserialize, Serialize};

use crate::StoreError;

/// Live mapping of table name → column names (catalog order).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SchemaProfile {
    tables: BTreeMap<String, Vec<String>>,
}

impl SchemaProfile {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, table: impl Into<String>, columns: Vec<String>) {
        self.tables.insert(table.into(), columns);
    }

    /// Builder form of [`SchemaProfile::insert`], handy for fixtures.
    pub fn with_table(mut self, table: &str, columns: &[&str]) -> Self {
        self.insert(table, columns.iter().map(|c| c.to_string()).collect());
        self
    }

    pub fn columns(&self, table: &str) -> Option<&[String]> {
        self.tables.get(table).map(Vec::as_slice)
    }

    pub fn has_table(&self, table: &str) -> bool {
        self.tables.contains_key(table)
    }

    pub fn has_column(&self, table: &str, column: &str) -> bool {
        self.columns(table)
            .is_some_and(|cols| cols.iter().any(|c| c == column))
    }

    pub fn table_names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tables
            .iter()
            .map(|(table, cols)| (table.as_str(), cols.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }

    pub fn len(&self) -> usize {
        self.tables.len()
    }
}

pub(crate) fn profile(conn: &Connection) -> Result<SchemaProfile, StoreError> {
    let mut tables_stmt = conn.prepare(
        "SELECT name FROM sqlite_master \
         WHERE type = 'table' AND name NOT LIKE 'sqlite_%' \
         ORDER BY name",
    )?;
    let tables = tables_stmt
        .query_map([], |row| row.get::<_, String>(0))?
        .collect::<Result<Vec<_>, _>>()?;

    let mut columns_stmt = conn.prepare("SELECT name FROM pragma_table_info(?1) ORDER BY cid")?;
    let mut profile = SchemaProfile::new();
    for table in tables {
        let columns = columns_stmt
            .query_map([&table], |row| row.get::<_, String>(0))?
            .collect::<Result<Vec<_>, _>>()?;
        profile.insert(table, columns);
    }

    tracing::debug!(tables = profile.len(), "profiled schema");
    Ok(profile)
}
