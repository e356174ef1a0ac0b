//! Row types for the store tables.
//!
//! [`Customer`] and [`InventoryItem`] mirror the `customers` and `inventory`
//! tables column for column. They reject unknown fields on decode so a snapshot
//! written by a different schema fails loudly instead of loading partially.

use rusqlite::Row;
use serde::{Deserialize, Serialize};

/// A row of the `customers` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    /// Natural key used by the upsert path.
    pub email: String,
    pub city: Option<String>,
    /// RFC 3339 creation timestamp.
    pub created_at: String,
}

impl Customer {
    pub(crate) const COLUMNS: &'static str = "id, name, email, city, created_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            email: row.get(2)?,
            city: row.get(3)?,
            created_at: row.get(4)?,
        })
    }
}

/// A row of the `inventory` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InventoryItem {
    pub id: i64,
    /// Natural key used by the upsert path.
    pub sku: String,
    pub name: String,
    pub quantity: i64,
    pub unit_price: f64,
    /// RFC 3339 timestamp of the last insert or upsert.
    pub updated_at: String,
}

impl InventoryItem {
    pub(crate) const COLUMNS: &'static str = "id, sku, name, quantity, unit_price, updated_at";

    pub(crate) fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            sku: row.get(1)?,
            name: row.get(2)?,
            quantity: row.get(3)?,
            unit_price: row.get(4)?,
            updated_at: row.get(5)?,
        })
    }
}

/// Fields supplied by the caller when inserting or upserting a customer.
#[derive(Debug, Clone)]
pub struct NewCustomer<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub city: Option<&'a str>,
}

/// Fields supplied by the caller when inserting or upserting an inventory item.
#[derive(Debug, Clone)]
pub struct NewItem<'a> {
    pub sku: &'a str,
    pub name: &'a str,
    pub quantity: i64,
    pub unit_price: f64,
}
