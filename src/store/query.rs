//! Raw SQL passthrough and tabular rendering of its results.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use serde_json::Value;

use crate::error::{AgentError, Result};

/// Result of running one SQL statement.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryOutput {
    /// The statement produced a result set.
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<Value>>,
    },
    /// The statement modified the database.
    Affected { rows: usize },
}

impl QueryOutput {
    /// Number of result rows, or rows affected.
    pub fn row_count(&self) -> usize {
        match self {
            Self::Rows { rows, .. } => rows.len(),
            Self::Affected { rows } => *rows,
        }
    }
}

/// Run a single SQL statement against the store.
///
/// Statements with result columns are read to completion; anything else is
/// executed and reported as rows affected.
pub fn run_query(conn: &Connection, sql: &str) -> Result<QueryOutput> {
    let mut stmt = conn.prepare(sql)?;

    if stmt.column_count() == 0 {
        let rows = stmt.execute([])?;
        tracing::debug!(rows, "statement executed");
        return Ok(QueryOutput::Affected { rows });
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| c.to_string()).collect();
    let width = columns.len();

    let mut rows = Vec::new();
    let mut cursor = stmt.query([])?;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(to_json(row.get_ref(i)?));
        }
        rows.push(values);
    }

    tracing::debug!(rows = rows.len(), "query returned");
    Ok(QueryOutput::Rows { columns, rows })
}

/// Fetch every row of a store table. The name is checked against the catalog
/// before it is interpolated into SQL.
pub fn fetch_all(conn: &Connection, table: &str) -> Result<QueryOutput> {
    let tables = super::list_tables(conn)?;
    let Some(name) = tables.iter().find(|t| t.eq_ignore_ascii_case(table)) else {
        return Err(AgentError::UnknownTable(table.to_string()));
    };
    run_query(conn, &format!("SELECT * FROM \"{name}\""))
}

pub(crate) fn to_json(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::from(i),
        ValueRef::Real(f) => Value::from(f),
        ValueRef::Text(t) => Value::String(String::from_utf8_lossy(t).into_owned()),
        ValueRef::Blob(b) => Value::String(format!("<{} bytes>", b.len())),
    }
}

pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::Null => "NULL".to_string(),
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

impl std::fmt::Display for QueryOutput {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let (columns, rows) = match self {
            Self::Affected { rows } => return write!(f, "Query executed. Rows affected: {rows}"),
            Self::Rows { columns, rows } => (columns, rows),
        };

        if rows.is_empty() {
            return write!(f, "(no rows)");
        }

        let cells: Vec<Vec<String>> = rows.iter().map(|r| r.iter().map(cell).collect()).collect();
        let mut widths: Vec<usize> = columns.iter().map(|c| c.chars().count()).collect();
        for row in &cells {
            for (w, c) in widths.iter_mut().zip(row) {
                *w = (*w).max(c.chars().count());
            }
        }

        let header: Vec<String> = columns
            .iter()
            .zip(&widths)
            .map(|(c, w)| format!("{c:<w$}"))
            .collect();
        writeln!(f, "{}", header.join(" | ").trim_end())?;
        let rule: Vec<String> = widths.iter().map(|w| "-".repeat(*w)).collect();
        writeln!(f, "{}", rule.join("-+-"))?;

        for row in &cells {
            let line: Vec<String> = row
                .iter()
                .zip(&widths)
                .map(|(c, w)| format!("{c:<w$}"))
                .collect();
            writeln!(f, "{}", line.join(" | ").trim_end())?;
        }
        write!(f, "({} row{})", rows.len(), if rows.len() == 1 { "" } else { "s" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_conn() -> Connection {
        crate::db::open_memory_database().unwrap()
    }

    #[test]
    fn select_returns_rows_and_columns() {
        let conn = test_conn();
        conn.execute(
            "INSERT INTO inventory (sku, name, quantity, unit_price, updated_at) \
             VALUES ('A1', 'Widget', 4, 1.5, 'now')",
            [],
        )
        .unwrap();

        let out = run_query(&conn, "SELECT sku, quantity FROM inventory").unwrap();
        match out {
            QueryOutput::Rows { columns, rows } => {
                assert_eq!(columns, vec!["sku", "quantity"]);
                assert_eq!(rows, vec![vec![Value::from("A1"), Value::from(4)]]);
            }
            other => panic!("expected rows, got {other:?}"),
        }
    }

    #[test]
    fn update_reports_rows_affected() {
        let conn = test_conn();
        let out = run_query(&conn, "UPDATE inventory SET quantity = 1").unwrap();
        assert_eq!(out, QueryOutput::Affected { rows: 0 });
    }

    #[test]
    fn bad_sql_is_a_database_error() {
        let conn = test_conn();
        let err = run_query(&conn, "SELEC nonsense").unwrap_err();
        assert!(matches!(err, AgentError::Database(_)));
    }

    #[test]
    fn fetch_all_rejects_unknown_table() {
        let conn = test_conn();
        let err = fetch_all(&conn, "users; DROP TABLE customers").unwrap_err();
        assert!(matches!(err, AgentError::UnknownTable(_)));
    }

    #[test]
    fn render_aligns_columns() {
        let out = QueryOutput::Rows {
            columns: vec!["sku".into(), "name".into()],
            rows: vec![
                vec![Value::from("A1"), Value::from("Widget")],
                vec![Value::from("LONGSKU"), Value::Null],
            ],
        };
        let text = out.to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "sku     | name");
        assert_eq!(lines[2], "A1      | Widget");
        assert_eq!(lines[3], "LONGSKU | NULL");
        assert_eq!(lines[4], "(2 rows)");
    }
}
