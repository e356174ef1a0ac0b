//! On-demand views of the store: per-table schema with a sample row, and a
//! substring search across every column.

use rusqlite::{params, Connection};
use serde_json::Value;

use super::query::{cell, to_json};
use crate::error::{AgentError, Result};

/// Matches returned per column by [`search`].
pub const SEARCH_HITS_PER_COLUMN: usize = 5;

/// Column names and declared types of one table, its row count, and its first row.
#[derive(Debug, Clone, PartialEq)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<(String, String)>,
    pub rows: u64,
    pub sample: Option<Vec<Value>>,
}

impl std::fmt::Display for TableSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "{} ({} rows)", self.name, self.rows)?;
        for (name, ty) in &self.columns {
            writeln!(f, "  {name} {ty}")?;
        }
        match &self.sample {
            Some(values) => {
                let cells: Vec<String> = values.iter().map(cell).collect();
                write!(f, "  sample: {}", cells.join(" | "))
            }
            None => write!(f, "  sample: (empty)"),
        }
    }
}

/// Describe every user-visible table.
pub fn describe_schema(conn: &Connection) -> Result<Vec<TableSchema>> {
    let mut tables = Vec::new();
    for name in super::list_tables(conn)? {
        let columns = table_columns(conn, &name)?;
        let rows: i64 =
            conn.query_row(&format!("SELECT COUNT(*) FROM {}", ident(&name)), [], |row| {
                row.get(0)
            })?;

        let mut stmt = conn.prepare(&format!("SELECT * FROM {} LIMIT 1", ident(&name)))?;
        let width = stmt.column_count();
        let mut cursor = stmt.query([])?;
        let sample = match cursor.next()? {
            Some(row) => Some(
                (0..width)
                    .map(|i| row.get_ref(i).map(to_json))
                    .collect::<rusqlite::Result<Vec<_>>>()?,
            ),
            None => None,
        };

        tables.push(TableSchema {
            name,
            columns,
            rows: rows as u64,
            sample,
        });
    }
    Ok(tables)
}

/// One cell whose text contains the search string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchHit {
    pub table: String,
    pub column: String,
    pub rowid: i64,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchResults {
    pub needle: String,
    pub hits: Vec<SearchHit>,
}

impl std::fmt::Display for SearchResults {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.hits.is_empty() {
            return write!(f, "No matches for '{}'.", self.needle);
        }
        for hit in &self.hits {
            writeln!(f, "{}.{} (row {}): {}", hit.table, hit.column, hit.rowid, hit.value)?;
        }
        match self.hits.len() {
            1 => write!(f, "(1 match)"),
            n => write!(f, "({n} matches)"),
        }
    }
}

/// Case-insensitive substring search over every column of every table.
/// Each column contributes at most [`SEARCH_HITS_PER_COLUMN`] hits, in rowid order.
pub fn search(conn: &Connection, needle: &str) -> Result<SearchResults> {
    let needle = needle.trim();
    if needle.is_empty() {
        return Err(AgentError::InvalidCommand("search text is empty".into()));
    }
    let pattern = format!("%{}%", escape_like(needle));

    let mut hits = Vec::new();
    for table in super::list_tables(conn)? {
        for (column, _) in table_columns(conn, &table)? {
            let sql = format!(
                "SELECT rowid, CAST({col} AS TEXT) FROM {tbl} \
                 WHERE CAST({col} AS TEXT) LIKE ?1 ESCAPE '\\' ORDER BY rowid LIMIT ?2",
                col = ident(&column),
                tbl = ident(&table),
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(
                params![pattern, SEARCH_HITS_PER_COLUMN as i64],
                |row| Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?)),
            )?;
            for row in rows {
                let (rowid, value) = row?;
                hits.push(SearchHit {
                    table: table.clone(),
                    column: column.clone(),
                    rowid,
                    value,
                });
            }
        }
    }

    tracing::debug!(needle, hits = hits.len(), "search complete");
    Ok(SearchResults {
        needle: needle.to_string(),
        hits,
    })
}

fn table_columns(conn: &Connection, table: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!("PRAGMA table_info({})", ident(table)))?;
    let columns = stmt
        .query_map([], |row| Ok((row.get(1)?, row.get(2)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(columns)
}

/// Double-quoted SQL identifier.
pub(crate) fn ident(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if matches!(c, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
