#![allow(dead_code)]

use std::cell::RefCell;

use rusqlite::Connection;
use stockroom::config::AgentConfig;
use stockroom::db;
use stockroom::error::{AgentError, Result};
use stockroom::gateway::CompletionBackend;
use stockroom::session::Message;
use stockroom::store::seed;
use tempfile::TempDir;

/// Open a fresh in-memory database with the schema applied.
pub fn test_db() -> Connection {
    let conn = Connection::open_in_memory().unwrap();
    db::schema::init_schema(&conn).unwrap();
    conn
}

/// In-memory database loaded with the sample rows.
pub fn seeded_db() -> Connection {
    let mut conn = test_db();
    seed::add_sample_data(&mut conn).unwrap();
    conn
}

/// Config whose database and snapshot paths live inside `dir`.
pub fn test_config(dir: &TempDir) -> AgentConfig {
    let mut config = AgentConfig::default();
    config.storage.db_path = dir.path().join("app_data.db").to_string_lossy().into_owned();
    config.storage.snapshot_path = dir.path().join("memory.json").to_string_lossy().into_owned();
    config
}

/// A completion backend that records every call and replays a canned answer.
pub struct MockBackend {
    pub available: bool,
    pub reply: std::result::Result<String, String>,
    pub calls: RefCell<Vec<(String, Vec<Message>)>>,
}

impl MockBackend {
    pub fn replying(reply: &str) -> Self {
        Self {
            available: true,
            reply: Ok(reply.to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            available: true,
            reply: Err(error.to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn without_credential() -> Self {
        Self {
            available: false,
            reply: Err("should not be called".to_string()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.borrow().len()
    }

    /// Model name used by the most recent call.
    pub fn last_model(&self) -> Option<String> {
        self.calls.borrow().last().map(|(model, _)| model.clone())
    }
}

impl CompletionBackend for MockBackend {
    fn available(&self) -> bool {
        self.available
    }

    async fn complete(&self, messages: &[Message], model: &str) -> Result<String> {
        self.calls
            .borrow_mut()
            .push((model.to_string(), messages.to_vec()));
        self.reply.clone().map_err(AgentError::Api)
    }
}
