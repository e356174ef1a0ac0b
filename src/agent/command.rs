//! Input line → [`Command`], parsed once before dispatch.

use crate::error::{AgentError, Result};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Exit,
    Help,
    History,
    Save,
    System(String),
    /// `None` reports the current model.
    Model(Option<String>),
    Db(DbCommand),
    Chat(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbCommand {
    Init,
    AddSample { upsert: bool },
    /// `None` lists tables with row counts.
    List(Option<String>),
    Query(String),
    Ask(String),
    Refresh,
    Schema,
    Search(String),
    Export(String),
}

pub const HELP: &str = "\
Commands:
  /exit                  - exit the agent
  /history               - show the conversation so far
  /save                  - save the conversation and a table sample to the snapshot file
  /system TEXT           - set the system instruction
  /model [NAME]          - change (or show) the model for this session
  /db init               - create the tables if missing
  /db addsample [upsert] - load sample rows (upsert refreshes existing rows)
  /db list [TABLE]       - list tables, or every row of TABLE
  /db query SQL          - run SQL against the database
  /db ask QUESTION       - have the model write a read-only query and run it
  /db refresh            - resnapshot the database into the agent's context
  /db schema             - show every table's columns and a sample row
  /db search TEXT        - find TEXT in any column of any table
  /db export PATH        - write a SQL dump of the database to PATH
  /help                  - show this help";

impl Command {
    /// Parse one trimmed, non-empty input line.
    pub fn parse(line: &str) -> Result<Self> {
        let line = line.trim();
        if !line.starts_with('/') {
            return Ok(Self::Chat(line.to_string()));
        }

        let (cmd, arg) = split_word(line);
        match cmd.to_ascii_lowercase().as_str() {
            "/exit" | "/quit" => Ok(Self::Exit),
            "/help" => Ok(Self::Help),
            "/history" => Ok(Self::History),
            "/save" => Ok(Self::Save),
            "/system" => Ok(Self::System(arg.to_string())),
            "/model" => Ok(Self::Model((!arg.is_empty()).then(|| arg.to_string()))),
            "/db" => DbCommand::parse(arg).map(Self::Db),
            _ => Err(AgentError::InvalidCommand(format!(
                "unknown command {cmd}; use /help for a list of commands"
            ))),
        }
    }
}

impl DbCommand {
    fn parse(args: &str) -> Result<Self> {
        let (sub, arg) = split_word(args);
        let required = |what: &str| {
            if arg.is_empty() {
                Err(AgentError::InvalidCommand(format!("/db {sub} requires {what}")))
            } else {
                Ok(arg.to_string())
            }
        };

        match sub.to_ascii_lowercase().as_str() {
            "init" => Ok(Self::Init),
            "addsample" => match arg.to_ascii_lowercase().as_str() {
                "" => Ok(Self::AddSample { upsert: false }),
                "upsert" | "--upsert" => Ok(Self::AddSample { upsert: true }),
                other => Err(AgentError::InvalidCommand(format!(
                    "unexpected argument to /db addsample: {other}"
                ))),
            },
            "list" => Ok(Self::List((!arg.is_empty()).then(|| arg.to_string()))),
            "query" => required("a SQL statement").map(Self::Query),
            "ask" => required("a question").map(Self::Ask),
            "refresh" => Ok(Self::Refresh),
            "schema" => Ok(Self::Schema),
            "search" => required("search text").map(Self::Search),
            "export" => required("a file path").map(Self::Export),
            "" => Err(AgentError::InvalidCommand(
                "/db requires a subcommand: init, addsample, list, query, ask, refresh, \
                 schema, search, export"
                    .into(),
            )),
            other => Err(AgentError::InvalidCommand(format!(
                "unknown /db subcommand: {other}"
            ))),
        }
    }
}

/// Split off the first whitespace-delimited word; the remainder is trimmed.
fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plain_text_is_chat() {
        assert_eq!(
            Command::parse("  how many customers?  ").unwrap(),
            Command::Chat("how many customers?".into())
        );
    }

    #[test]
    fn simple_commands() {
        assert_eq!(Command::parse("/exit").unwrap(), Command::Exit);
        assert_eq!(Command::parse("/EXIT").unwrap(), Command::Exit);
        assert_eq!(Command::parse("/history").unwrap(), Command::History);
        assert_eq!(Command::parse("/save").unwrap(), Command::Save);
        assert_eq!(Command::parse("/help").unwrap(), Command::Help);
    }

    #[test]
    fn commands_with_arguments() {
        assert_eq!(
            Command::parse("/system Answer in French.").unwrap(),
            Command::System("Answer in French.".into())
        );
        assert_eq!(
            Command::parse("/model gpt-x").unwrap(),
            Command::Model(Some("gpt-x".into()))
        );
        assert_eq!(Command::parse("/model").unwrap(), Command::Model(None));
    }

    #[test]
    fn db_subcommands() {
        assert_eq!(Command::parse("/db init").unwrap(), Command::Db(DbCommand::Init));
        assert_eq!(
            Command::parse("/db addsample").unwrap(),
            Command::Db(DbCommand::AddSample { upsert: false })
        );
        assert_eq!(
            Command::parse("/db addsample upsert").unwrap(),
            Command::Db(DbCommand::AddSample { upsert: true })
        );
        assert_eq!(Command::parse("/db list").unwrap(), Command::Db(DbCommand::List(None)));
        assert_eq!(
            Command::parse("/db list inventory").unwrap(),
            Command::Db(DbCommand::List(Some("inventory".into())))
        );
        assert_eq!(
            Command::parse("/db query SELECT * FROM customers").unwrap(),
            Command::Db(DbCommand::Query("SELECT * FROM customers".into()))
        );
        assert_eq!(
            Command::parse("/db ask which items are low?").unwrap(),
            Command::Db(DbCommand::Ask("which items are low?".into()))
        );
        assert_eq!(Command::parse("/DB Refresh").unwrap(), Command::Db(DbCommand::Refresh));
        assert_eq!(Command::parse("/db schema").unwrap(), Command::Db(DbCommand::Schema));
        assert_eq!(
            Command::parse("/db search Jaipur").unwrap(),
            Command::Db(DbCommand::Search("Jaipur".into()))
        );
        assert_eq!(
            Command::parse("/db export backups/shop.sql").unwrap(),
            Command::Db(DbCommand::Export("backups/shop.sql".into()))
        );
    }

    #[test]
    fn invalid_commands() {
        for line in [
            "/frobnicate",
            "/db",
            "/db drop",
            "/db query",
            "/db ask",
            "/db addsample twice",
            "/db search",
            "/db export",
        ] {
            let err = Command::parse(line).unwrap_err();
            assert!(matches!(err, AgentError::InvalidCommand(_)), "{line} should be invalid");
        }
    }
}
