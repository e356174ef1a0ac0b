//! Conversational agent over a local customer and inventory store.
//!
//! `stockroom` forwards chat to an OpenAI-compatible completion API, can have
//! the model write read-only SQL against a local SQLite database, and persists
//! a JSON snapshot of a table sample plus the conversation between runs. When
//! the API is unreachable it answers common questions from a fixed rule table.
//!
//! # Modules
//!
//! - [`config`]: Configuration loading from TOML files and environment variables
//! - [`db`]: SQLite connection setup and schema
//! - [`store`]: Typed rows, sample data, and raw query passthrough
//! - [`session`]: The in-memory transcript, system prompt, and model setting
//! - [`snapshot`]: Versioned JSON snapshot save/load
//! - [`gateway`]: Completion backend, offline fallback, and NL-to-SQL
//! - [`agent`]: Command parsing and dispatch

pub mod agent;
pub mod config;
pub mod db;
pub mod error;
pub mod gateway;
pub mod session;
pub mod snapshot;
pub mod store;

pub use error::{AgentError, Result};
