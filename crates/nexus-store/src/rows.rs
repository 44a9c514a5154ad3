use rusqlite::types::ValueRef;
use rusqlite::{Connection, Params};
use serde_json::{Map, Number, Value};

use crate::StoreError;

/// One result row: column name → value, in result-column order.
pub type Row = Map<String, Value>;

pub(crate) fn query_rows<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> Result<Vec<Row>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let columns: Vec<String> = stmt.column_names().into_iter().map(String::from).collect();

    let mut out = Vec::new();
    let mut rows = stmt.query(params)?;
    while let Some(row) = rows.next()? {
        let mut record = Row::new();
        for (idx, name) in columns.iter().enumerate() {
            record.insert(name.clone(), to_json(row.get_ref(idx)?));
        }
        out.push(record);
    }
    Ok(out)
}

fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Number::from_f64(f).map_or(Value::Null, Value::Number),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            Value::String(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn maps_sqlite_types_to_json() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = query_rows(
            &conn,
            "SELECT 1 AS i, 2.5 AS r, 'x' AS t, NULL AS n, X'6869' AS b",
            [],
        )
        .unwrap();

        assert_eq!(rows.len(), 1);
        let row = &rows[0];
        assert_eq!(row["i"], json!(1));
        assert_eq!(row["r"], json!(2.5));
        assert_eq!(row["t"], json!("x"));
        assert_eq!(row["n"], Value::Null);
        assert_eq!(row["b"], json!("hi"));
    }

    #[test]
    fn keys_follow_column_order() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch(
            "CREATE TABLE people (zeta TEXT, alpha TEXT, mid INTEGER);
             INSERT INTO people VALUES ('z', 'a', 1);",
        )
        .unwrap();
        let rows = query_rows(&conn, "SELECT * FROM people", []).unwrap();
        let keys: Vec<&str> = rows[0].keys().map(String::as_str).collect();
        assert_eq!(keys, vec!["zeta", "alpha", "mid"]);

        let json = serde_json::to_string(&rows[0]).unwrap();
        assert_eq!(json, r#"{"zeta":"z","alpha":"a","mid":1}"#);
    }

    #[test]
    fn binds_positional_params() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = query_rows(&conn, "SELECT ?1 + ?2 AS total", [40, 2]).unwrap();
        assert_eq!(rows[0]["total"], json!(42));
    }

    #[test]
    fn empty_result_has_no_rows() {
        let conn = Connection::open_in_memory().unwrap();
        let rows = query_rows(&conn, "SELECT 1 AS one WHERE 0", []).unwrap();
        assert!(rows.is_empty());
    }
}
