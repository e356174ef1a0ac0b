//! Command dispatch for one conversation.
//!
//! [`Agent`] owns the store connection, the [`Session`], the completion
//! backend, and the most recent [`Snapshot`]. Front ends feed it lines via
//! [`Agent::handle_line`] and render the [`Outcome`] it returns; nothing here
//! prints.

pub mod command;

use rusqlite::Connection;
use tracing::{debug, info, warn};

use crate::config::AgentConfig;
use crate::error::{AgentError, Result};
use crate::gateway::{fallback, sql, CompletionBackend};
use crate::session::{Message, Role, Session};
use crate::snapshot::{self, Snapshot};
use crate::store;
use command::{Command, DbCommand, HELP};

const DB_ONLY_INSTRUCTION: &str = "Only answer questions using the database schema and the data \
     it contains. If the user asks about anything else, politely refuse. Do not invent facts.";

/// What the front end should show for one input line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// An assistant reply from the completion API.
    Reply(String),
    /// An assistant reply produced locally; `reason` says why the API was not used.
    Fallback { reply: String, reason: String },
    /// Output of a command (not part of the conversation).
    Notice(String),
    /// Nothing to show (blank input).
    Idle,
    Exit,
}

pub struct Agent<'a, B> {
    config: &'a AgentConfig,
    conn: Connection,
    session: Session,
    backend: B,
    last_snapshot: Option<Snapshot>,
}

impl<'a, B: CompletionBackend> Agent<'a, B> {
    pub fn new(config: &'a AgentConfig, conn: Connection, backend: B) -> Self {
        let session = Session::new(&config.agent.system_prompt, &config.agent.model);
        Self {
            config,
            conn,
            session,
            backend,
            last_snapshot: None,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn backend(&self) -> &B {
        &self.backend
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn last_snapshot(&self) -> Option<&Snapshot> {
        self.last_snapshot.as_ref()
    }

    /// Load the snapshot file (if any), restore its transcript, and build the
    /// session context. Returns notices for the user; a malformed snapshot is
    /// reported here and the session continues without it.
    pub fn prime(&mut self) -> Result<Vec<String>> {
        let mut notices = Vec::new();
        let path = self.config.resolved_snapshot_path();

        if path.exists() {
            match snapshot::load(&path) {
                Ok(snap) => {
                    notices.push(format!(
                        "Loaded {} saved messages from {}",
                        snap.transcript.len(),
                        path.display()
                    ));
                    self.session.restore(snap.transcript.clone());
                    self.last_snapshot = Some(snap);
                }
                Err(e) => {
                    warn!(error = %e, "ignoring snapshot");
                    notices.push(format!("{e}; starting without saved context"));
                }
            }
        } else {
            info!("no snapshot at {}, starting fresh", path.display());
        }

        self.rebuild_context()?;
        Ok(notices)
    }

    /// Parse and dispatch one line of input.
    pub async fn handle_line(&mut self, line: &str) -> Result<Outcome> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(Outcome::Idle);
        }
        let command = Command::parse(line)?;
        self.dispatch(command).await
    }

    pub async fn dispatch(&mut self, command: Command) -> Result<Outcome> {
        debug!(?command, "dispatching");
        match command {
            Command::Exit => Ok(Outcome::Exit),
            Command::Help => Ok(Outcome::Notice(HELP.to_string())),
            Command::History => {
                if self.session.is_empty() {
                    return Ok(Outcome::Notice("No messages yet.".to_string()));
                }
                let lines: Vec<String> = self.session.render_history().collect();
                Ok(Outcome::Notice(lines.join("\n")))
            }
            Command::Save => {
                let path = self.config.resolved_snapshot_path();
                let snap = self.save_snapshot()?;
                Ok(Outcome::Notice(format!(
                    "Saved {} messages to {}",
                    snap.transcript.len(),
                    path.display()
                )))
            }
            Command::System(text) => {
                self.session.set_system_prompt(text);
                Ok(Outcome::Notice("System prompt updated.".to_string()))
            }
            Command::Model(Some(name)) => {
                let msg = format!("Model set to {name}");
                self.session.set_model(name);
                Ok(Outcome::Notice(msg))
            }
            Command::Model(None) => Ok(Outcome::Notice(format!(
                "Current model: {}",
                self.session.model()
            ))),
            Command::Db(db) => self.dispatch_db(db).await.map(Outcome::Notice),
            Command::Chat(text) => self.chat(&text).await,
        }
    }

    async fn dispatch_db(&mut self, command: DbCommand) -> Result<String> {
        match command {
            DbCommand::Init => {
                crate::db::schema::init_schema(&self.conn)?;
                let version = crate::db::schema::get_schema_version(&self.conn)?;
                let tables = store::list_tables(&self.conn)?;
                Ok(format!(
                    "Database ready at {} (schema v{version}; tables: {})",
                    self.config.resolved_db_path().display(),
                    tables.join(", ")
                ))
            }
            DbCommand::AddSample { upsert } => {
                let report = if upsert {
                    store::seed::upsert_sample_data(&mut self.conn)?
                } else {
                    store::seed::add_sample_data(&mut self.conn)?
                };
                Ok(report.to_string())
            }
            DbCommand::List(None) => {
                let counts = store::table_counts(&self.conn)?;
                if counts.is_empty() {
                    return Ok("No tables found.".to_string());
                }
                let lines: Vec<String> = counts
                    .iter()
                    .map(|(table, n)| format!("{table}: {n} rows"))
                    .collect();
                Ok(lines.join("\n"))
            }
            DbCommand::List(Some(table)) => {
                Ok(store::query::fetch_all(&self.conn, &table)?.to_string())
            }
            DbCommand::Query(sql) => Ok(store::query::run_query(&self.conn, &sql)?.to_string()),
            DbCommand::Ask(question) => {
                let answer =
                    sql::ask(&self.backend, &self.conn, self.session.model(), &question).await?;
                Ok(answer.to_string())
            }
            DbCommand::Refresh => {
                let path = self.config.resolved_snapshot_path();
                let snap = self.save_snapshot()?;
                let msg = format!(
                    "Snapshot refreshed: {} customers and {} inventory items saved to {}",
                    snap.customers.len(),
                    snap.inventory.len(),
                    path.display()
                );
                self.rebuild_context()?;
                Ok(msg)
            }
            DbCommand::Schema => {
                let tables = store::inspect::describe_schema(&self.conn)?;
                if tables.is_empty() {
                    return Ok("No tables found.".to_string());
                }
                let blocks: Vec<String> = tables.iter().map(|t| t.to_string()).collect();
                Ok(blocks.join("\n\n"))
            }
            DbCommand::Search(text) => Ok(store::inspect::search(&self.conn, &text)?.to_string()),
            DbCommand::Export(path) => {
                let path = crate::config::expand_tilde(&path);
                let stats = store::export::export_to_file(&self.conn, &path)?;
                Ok(format!("Exported {stats} to {}", path.display()))
            }
        }
    }

    /// One conversational turn. The user message and the reply are appended
    /// together once a reply exists; a turn that fails leaves the transcript
    /// untouched.
    async fn chat(&mut self, text: &str) -> Result<Outcome> {
        if self.config.agent.db_only {
            let tables = store::list_tables(&self.conn)?;
            if !fallback::is_db_related(text, &tables) {
                self.record_turn(text, fallback::REFUSAL);
                return Ok(Outcome::Fallback {
                    reply: fallback::REFUSAL.to_string(),
                    reason: "db_only is set and the question is not about the database"
                        .to_string(),
                });
            }
        }

        if !self.backend.available() {
            debug!("no credential, answering offline");
            let reply = self.offline_answer(text)?;
            self.record_turn(text, &reply);
            return Ok(Outcome::Fallback {
                reply,
                reason: AgentError::CredentialMissing.to_string(),
            });
        }

        let mut messages = self.session.to_request_messages();
        messages.push(Message::new(Role::User, text));
        match self.backend.complete(&messages, self.session.model()).await {
            Ok(reply) => {
                self.record_turn(text, &reply);
                Ok(Outcome::Reply(reply))
            }
            Err(e) => {
                warn!(error = %e, model = self.session.model(), "completion failed, using fallback");
                let reply = self.offline_answer(text).map_err(|fb| AgentError::Unanswered {
                    api: e.to_string(),
                    fallback: fb.to_string(),
                })?;
                self.record_turn(text, &reply);
                Ok(Outcome::Fallback {
                    reply,
                    reason: e.to_string(),
                })
            }
        }
    }

    fn record_turn(&mut self, user: &str, reply: &str) {
        self.session.push(Role::User, user);
        self.session.push(Role::Assistant, reply);
    }

    /// Answer from the live store, or from the last snapshot if the store can't be read.
    fn offline_answer(&self, text: &str) -> Result<String> {
        match fallback::answer(text, &self.conn) {
            Ok(answer) => Ok(answer),
            Err(e) => match &self.last_snapshot {
                Some(snap) => {
                    warn!(error = %e, "store unreadable, answering from snapshot");
                    fallback::answer(text, snap)
                }
                None => Err(e),
            },
        }
    }

    fn save_snapshot(&mut self) -> Result<&Snapshot> {
        let snap = snapshot::save(
            self.config.resolved_snapshot_path(),
            &self.conn,
            &self.session,
            self.config.storage.sample_limit,
        )?;
        Ok(self.last_snapshot.insert(snap))
    }

    fn rebuild_context(&mut self) -> Result<()> {
        let mut parts = vec![format!(
            "You have access to a SQLite database with the following schema:\n{}",
            store::schema_digest(&self.conn)?
        )];
        if let Some(snap) = &self.last_snapshot {
            parts.push(snap.digest());
        }
        if self.config.agent.db_only {
            parts.push(DB_ONLY_INSTRUCTION.to_string());
        }
        self.session.set_context(Some(parts.join("\n")));
        Ok(())
    }
}
