//! Persisted JSON capture of a store sample plus the conversation transcript.
//!
//! [`save`] writes the whole document at once (temp file + rename) and [`load`]
//! decodes it strictly: unknown fields, missing fields, and unknown versions
//! are all rejected as [`AgentError::MalformedSnapshot`].

use chrono::{DateTime, Utc};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AgentError, Result};
use crate::session::{Message, Session};
use crate::store::types::{Customer, InventoryItem};

/// Format version written by this binary.
pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    /// At most `sample_limit` rows, ordered by id.
    pub customers: Vec<Customer>,
    /// At most `sample_limit` rows, ordered by id.
    pub inventory: Vec<InventoryItem>,
    pub transcript: Vec<Message>,
}

impl Snapshot {
    /// Sample the store and capture the session transcript.
    pub fn capture(conn: &Connection, session: &Session, limit: usize) -> Result<Self> {
        Ok(Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            customers: crate::store::load_customers(conn, Some(limit))?,
            inventory: crate::store::load_inventory(conn, Some(limit))?,
            transcript: session.transcript().to_vec(),
        })
    }

    /// Human-readable summary of the sampled rows, for use as prompt context.
    pub fn digest(&self) -> String {
        let mut out = format!(
            "Database snapshot taken {}: {} customers, {} inventory items sampled.\n",
            self.saved_at.format("%Y-%m-%d %H:%M UTC"),
            self.customers.len(),
            self.inventory.len()
        );

        if !self.customers.is_empty() {
            out.push_str("Customers:\n");
            for c in &self.customers {
                match &c.city {
                    Some(city) => out.push_str(&format!("- {} <{}> ({city})\n", c.name, c.email)),
                    None => out.push_str(&format!("- {} <{}>\n", c.name, c.email)),
                }
            }
        }

        if !self.inventory.is_empty() {
            out.push_str("Inventory:\n");
            for item in &self.inventory {
                out.push_str(&format!(
                    "- {} {}: {} units @ {:.2}\n",
                    item.sku, item.name, item.quantity, item.unit_price
                ));
            }
        }

        out
    }
}

/// Capture and write a snapshot to `path`, replacing any previous file.
pub fn save(
    path: impl AsRef<Path>,
    conn: &Connection,
    session: &Session,
    limit: usize,
) -> Result<Snapshot> {
    let path = path.as_ref();
    let snapshot = Snapshot::capture(conn, session, limit)?;
    write(path, &snapshot)?;
    tracing::info!(
        path = %path.display(),
        customers = snapshot.customers.len(),
        inventory = snapshot.inventory.len(),
        messages = snapshot.transcript.len(),
        "snapshot saved"
    );
    Ok(snapshot)
}

/// Write a snapshot document via a sibling temp file and rename.
pub fn write(path: &Path, snapshot: &Snapshot) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let json = serde_json::to_string_pretty(snapshot)?;
    let tmp_path = path.with_extension("json.tmp");
    std::fs::write(&tmp_path, json)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

/// Read and strictly decode a snapshot.
pub fn load(path: impl AsRef<Path>) -> Result<Snapshot> {
    let path = path.as_ref();
    let malformed = |reason: String| AgentError::MalformedSnapshot {
        path: path.to_path_buf(),
        reason,
    };

    let json = std::fs::read_to_string(path).map_err(|e| malformed(e.to_string()))?;
    let snapshot: Snapshot = serde_json::from_str(&json).map_err(|e| malformed(e.to_string()))?;

    if snapshot.version != SNAPSHOT_VERSION {
        return Err(malformed(format!(
            "unsupported version {} (expected {SNAPSHOT_VERSION})",
            snapshot.version
        )));
    }

    tracing::debug!(path = %path.display(), messages = snapshot.transcript.len(), "snapshot loaded");
    Ok(snapshot)
}
