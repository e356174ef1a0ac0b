pub mod export;
pub mod inspect;
pub mod query;
pub mod seed;
pub mod types;

use rusqlite::{params, Connection};

use crate::error::Result;
use types::{Customer, InventoryItem};

/// User-visible table names, bookkeeping tables excluded.
pub fn list_tables(conn: &Connection) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(
        "SELECT name FROM sqlite_master WHERE type = 'table' \
         AND name NOT IN ('sqlite_sequence', 'schema_meta') ORDER BY name",
    )?;
    let tables = stmt
        .query_map([], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(tables)
}

/// Row count for every user-visible table.
pub fn table_counts(conn: &Connection) -> Result<Vec<(String, u64)>> {
    let mut counts = Vec::new();
    for table in list_tables(conn)? {
        let n: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM \"{table}\""), [], |row| {
            row.get(0)
        })?;
        counts.push((table, n as u64));
    }
    Ok(counts)
}

/// Customers ordered by id, optionally capped at `limit` rows.
pub fn load_customers(conn: &Connection, limit: Option<usize>) -> Result<Vec<Customer>> {
    let sql = format!(
        "SELECT {} FROM customers ORDER BY id LIMIT ?1",
        Customer::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![sql_limit(limit)], Customer::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Inventory items ordered by id, optionally capped at `limit` rows.
pub fn load_inventory(conn: &Connection, limit: Option<usize>) -> Result<Vec<InventoryItem>> {
    let sql = format!(
        "SELECT {} FROM inventory ORDER BY id LIMIT ?1",
        InventoryItem::COLUMNS
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt
        .query_map(params![sql_limit(limit)], InventoryItem::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// One line per table listing its columns and declared types, for prompt context.
pub fn schema_digest(conn: &Connection) -> Result<String> {
    let mut digest = String::from("Available database tables:\n");
    for table in list_tables(conn)? {
        let mut stmt = conn.prepare(&format!("PRAGMA table_info(\"{table}\")"))?;
        let cols = stmt
            .query_map([], |row| {
                let name: String = row.get(1)?;
                let ty: String = row.get(2)?;
                Ok(format!("{name} ({ty})"))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        digest.push_str(&format!("- {table}: {}\n", cols.join(", ")));
    }
    Ok(digest)
}

// SQLite treats a negative LIMIT as "no limit".
fn sql_limit(limit: Option<usize>) -> i64 {
    limit.map(|n| n as i64).unwrap_or(-1)
}
