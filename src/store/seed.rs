//! Fixed sample rows and the two ways of loading them.
//!
//! [`add_sample_data`] only seeds empty tables. [`upsert_sample_data`] matches
//! on the natural key (`email`, `sku`) so running it repeatedly never grows the
//! tables.

use rusqlite::{params, Connection, OptionalExtension, Transaction};

use crate::error::Result;
use crate::store::types::{NewCustomer, NewItem};

pub const SAMPLE_CUSTOMERS: &[NewCustomer<'static>] = &[
    NewCustomer { name: "Asha Verma", email: "asha@example.com", city: Some("Jaipur") },
    NewCustomer { name: "Rahul Mehta", email: "rahul@example.com", city: Some("Delhi") },
    NewCustomer { name: "Priya Nair", email: "priya@example.com", city: Some("Chennai") },
    NewCustomer { name: "Vikram Singh", email: "vikram@example.com", city: Some("Patna") },
    NewCustomer { name: "Meera Polymers", email: "orders@meerapolymers.example", city: None },
];

pub const SAMPLE_INVENTORY: &[NewItem<'static>] = &[
    NewItem { sku: "SKU001", name: "PVC pipe 20mm", quantity: 240, unit_price: 85.0 },
    NewItem { sku: "SKU002", name: "PVC pipe 32mm", quantity: 120, unit_price: 140.0 },
    NewItem { sku: "SKU003", name: "PVC resin (25kg)", quantity: 8, unit_price: 2350.0 },
    NewItem { sku: "SKU004", name: "HDPE sheet", quantity: 45, unit_price: 610.0 },
    NewItem { sku: "SKU005", name: "Elbow joint 20mm", quantity: 3, unit_price: 12.5 },
    NewItem { sku: "SKU006", name: "Solvent cement", quantity: 0, unit_price: 95.0 },
];

/// What a seeding pass did to one table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeedOutcome {
    /// The table was empty and `rows` sample rows were inserted.
    Inserted { rows: usize },
    /// The table already had `rows` rows; nothing was written.
    AlreadyPopulated { rows: usize },
    /// Upsert pass: new rows inserted and existing rows refreshed.
    Upserted { inserted: usize, updated: usize },
}

impl std::fmt::Display for SeedOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Inserted { rows } => write!(f, "inserted {rows} sample rows"),
            Self::AlreadyPopulated { rows } => {
                write!(f, "already populated ({rows} rows), skipped")
            }
            Self::Upserted { inserted, updated } => {
                write!(f, "{inserted} inserted, {updated} updated")
            }
        }
    }
}

/// Per-table result of a seeding pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SeedReport {
    pub customers: SeedOutcome,
    pub inventory: SeedOutcome,
}

impl std::fmt::Display for SeedReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "customers: {}", self.customers)?;
        write!(f, "inventory: {}", self.inventory)
    }
}

/// Insert the sample rows into each table that is currently empty.
pub fn add_sample_data(conn: &mut Connection) -> Result<SeedReport> {
    let tx = conn.transaction()?;

    let customers = match count_rows(&tx, "customers")? {
        0 => {
            for c in SAMPLE_CUSTOMERS {
                insert_customer(&tx, c)?;
            }
            SeedOutcome::Inserted { rows: SAMPLE_CUSTOMERS.len() }
        }
        rows => SeedOutcome::AlreadyPopulated { rows },
    };

    let inventory = match count_rows(&tx, "inventory")? {
        0 => {
            for item in SAMPLE_INVENTORY {
                insert_item(&tx, item)?;
            }
            SeedOutcome::Inserted { rows: SAMPLE_INVENTORY.len() }
        }
        rows => SeedOutcome::AlreadyPopulated { rows },
    };

    tx.commit()?;
    tracing::info!(?customers, ?inventory, "sample data pass complete");
    Ok(SeedReport { customers, inventory })
}

/// Upsert the sample rows by natural key.
pub fn upsert_sample_data(conn: &mut Connection) -> Result<SeedReport> {
    let tx = conn.transaction()?;

    let (mut inserted, mut updated) = (0, 0);
    for c in SAMPLE_CUSTOMERS {
        if upsert_customer(&tx, c)? {
            inserted += 1;
        } else {
            updated += 1;
        }
    }
    let customers = SeedOutcome::Upserted { inserted, updated };

    let (mut inserted, mut updated) = (0, 0);
    for item in SAMPLE_INVENTORY {
        if upsert_item(&tx, item)? {
            inserted += 1;
        } else {
            updated += 1;
        }
    }
    let inventory = SeedOutcome::Upserted { inserted, updated };

    tx.commit()?;
    tracing::info!(?customers, ?inventory, "sample upsert pass complete");
    Ok(SeedReport { customers, inventory })
}

/// Insert or update a customer keyed by email. Returns `true` if a new row was inserted.
pub fn upsert_customer(tx: &Transaction<'_>, customer: &NewCustomer<'_>) -> Result<bool> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM customers WHERE email = ?1",
            params![customer.email],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            tx.execute(
                "UPDATE customers SET name = ?1, city = ?2 WHERE id = ?3",
                params![customer.name, customer.city, id],
            )?;
            Ok(false)
        }
        None => {
            insert_customer(tx, customer)?;
            Ok(true)
        }
    }
}

/// Insert or update an inventory item keyed by SKU. Returns `true` if a new row was inserted.
pub fn upsert_item(tx: &Transaction<'_>, item: &NewItem<'_>) -> Result<bool> {
    let existing: Option<i64> = tx
        .query_row(
            "SELECT id FROM inventory WHERE sku = ?1",
            params![item.sku],
            |row| row.get(0),
        )
        .optional()?;

    match existing {
        Some(id) => {
            tx.execute(
                "UPDATE inventory SET name = ?1, quantity = ?2, unit_price = ?3, updated_at = ?4 \
                 WHERE id = ?5",
                params![item.name, item.quantity, item.unit_price, now(), id],
            )?;
            Ok(false)
        }
        None => {
            insert_item(tx, item)?;
            Ok(true)
        }
    }
}

fn insert_customer(tx: &Transaction<'_>, customer: &NewCustomer<'_>) -> Result<()> {
    tx.execute(
        "INSERT INTO customers (name, email, city, created_at) VALUES (?1, ?2, ?3, ?4)",
        params![customer.name, customer.email, customer.city, now()],
    )?;
    Ok(())
}

fn insert_item(tx: &Transaction<'_>, item: &NewItem<'_>) -> Result<()> {
    tx.execute(
        "INSERT INTO inventory (sku, name, quantity, unit_price, updated_at) \
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![item.sku, item.name, item.quantity, item.unit_price, now()],
    )?;
    Ok(())
}

fn count_rows(conn: &Connection, table: &str) -> Result<usize> {
    let count: i64 = conn.query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
        row.get(0)
    })?;
    Ok(count as usize)
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}
