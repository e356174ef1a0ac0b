//! Plain-SQL dump of the whole database, replayable with `sqlite3 new.db < dump.sql`.

use rusqlite::types::ValueRef;
use rusqlite::Connection;
use std::io::Write;
use std::path::Path;

use super::inspect::ident;
use crate::error::Result;

/// What a dump contained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DumpStats {
    pub tables: usize,
    pub rows: usize,
}

impl std::fmt::Display for DumpStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} tables, {} rows", self.tables, self.rows)
    }
}

/// Write `CREATE`/`INSERT` statements for every table, then the autoincrement
/// counters, then indexes, triggers and views, all inside one transaction.
pub fn dump_sql(conn: &Connection, out: &mut impl Write) -> Result<DumpStats> {
    let mut stats = DumpStats { tables: 0, rows: 0 };
    writeln!(out, "BEGIN TRANSACTION;")?;

    let tables = schema_entries(
        conn,
        "type = 'table' AND name NOT LIKE 'sqlite_%' ORDER BY name",
    )?;
    for (name, create) in &tables {
        writeln!(out, "{create};")?;
        stats.rows += dump_rows(conn, name, out)?;
        stats.tables += 1;
    }

    let has_sequence: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE name = 'sqlite_sequence')",
        [],
        |row| row.get(0),
    )?;
    if has_sequence {
        writeln!(out, "DELETE FROM \"sqlite_sequence\";")?;
        dump_rows(conn, "sqlite_sequence", out)?;
    }

    for (_, create) in schema_entries(
        conn,
        "type IN ('index', 'trigger', 'view') AND sql IS NOT NULL ORDER BY type, name",
    )? {
        writeln!(out, "{create};")?;
    }

    writeln!(out, "COMMIT;")?;
    Ok(stats)
}

/// Dump to `path` through a sibling temp file, replacing any existing file.
pub fn export_to_file(conn: &Connection, path: impl AsRef<Path>) -> Result<DumpStats> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let tmp_path = path.with_extension("sql.tmp");
    let mut file = std::io::BufWriter::new(std::fs::File::create(&tmp_path)?);
    let stats = dump_sql(conn, &mut file)?;
    file.flush()?;
    drop(file);
    std::fs::rename(&tmp_path, path)?;

    tracing::info!(path = %path.display(), tables = stats.tables, rows = stats.rows, "database exported");
    Ok(stats)
}

fn schema_entries(conn: &Connection, filter: &str) -> Result<Vec<(String, String)>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT name, sql FROM sqlite_master WHERE {filter}"
    ))?;
    let entries = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?)))?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

fn dump_rows(conn: &Connection, table: &str, out: &mut impl Write) -> Result<usize> {
    let quoted = ident(table);
    let mut stmt = conn.prepare(&format!("SELECT * FROM {quoted}"))?;
    let width = stmt.column_count();
    let mut cursor = stmt.query([])?;

    let mut count = 0;
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(width);
        for i in 0..width {
            values.push(sql_literal(row.get_ref(i)?));
        }
        writeln!(out, "INSERT INTO {quoted} VALUES({});", values.join(","))?;
        count += 1;
    }
    Ok(count)
}

fn sql_literal(value: ValueRef<'_>) -> String {
    match value {
        ValueRef::Null => "NULL".to_string(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => format!("{f:?}"),
        ValueRef::Text(t) => format!("'{}'", String::from_utf8_lossy(t).replace('\'', "''")),
        ValueRef::Blob(b) => {
            let hex: String = b.iter().map(|byte| format!("{byte:02X}")).collect();
            format!("X'{hex}'")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{load_customers, load_inventory, seed, table_counts};

    fn dump(conn: &Connection) -> (String, DumpStats) {
        let mut buf = Vec::new();
        let stats = dump_sql(conn, &mut buf).unwrap();
        (String::from_utf8(buf).unwrap(), stats)
    }

    #[test]
    fn dump_replays_into_an_empty_database() {
        let mut conn = crate::db::open_memory_database().unwrap();
        seed::add_sample_data(&mut conn).unwrap();
        conn.execute(
            "INSERT INTO customers (name, email, city, created_at) \
             VALUES ('Dev O''Brien', 'dev@example.com', NULL, 'now')",
            [],
        )
        .unwrap();

        let (sql, stats) = dump(&conn);
        // customers, inventory, schema_meta
        assert_eq!(stats.tables, 3);
        assert_eq!(stats.rows, 6 + 6 + 1);
        assert!(sql.starts_with("BEGIN TRANSACTION;\n"));
        assert!(sql.ends_with("COMMIT;\n"));
        assert!(sql.contains("'Dev O''Brien'"));
        assert!(sql.contains("idx_inventory_quantity"));

        let restored = Connection::open_in_memory().unwrap();
        restored.execute_batch(&sql).unwrap();
        assert_eq!(table_counts(&restored).unwrap(), table_counts(&conn).unwrap());
        assert_eq!(
            load_customers(&restored, None).unwrap(),
            load_customers(&conn, None).unwrap()
        );
        assert_eq!(
            load_inventory(&restored, None).unwrap(),
            load_inventory(&conn, None).unwrap()
        );
    }

    #[test]
    fn autoincrement_counter_survives() {
        let mut conn = crate::db::open_memory_database().unwrap();
        seed::add_sample_data(&mut conn).unwrap();
        conn.execute("DELETE FROM inventory WHERE sku = 'SKU006'", []).unwrap();

        let (sql, _) = dump(&conn);
        let restored = Connection::open_in_memory().unwrap();
        restored.execute_batch(&sql).unwrap();
        restored
            .execute(
                "INSERT INTO inventory (sku, name, quantity, unit_price, updated_at) \
                 VALUES ('SKU007', 'Tee', 1, 1.0, 'now')",
                [],
            )
            .unwrap();
        let id: i64 = restored
            .query_row("SELECT id FROM inventory WHERE sku = 'SKU007'", [], |r| r.get(0))
            .unwrap();
        assert_eq!(id, 7);
    }

    #[test]
    fn literals_are_valid_sql() {
        assert_eq!(sql_literal(ValueRef::Null), "NULL");
        assert_eq!(sql_literal(ValueRef::Real(85.0)), "85.0");
        assert_eq!(sql_literal(ValueRef::Text(b"it's")), "'it''s'");
        assert_eq!(sql_literal(ValueRef::Blob(&[0x0a, 0xff])), "X'0AFF'");
    }
}
