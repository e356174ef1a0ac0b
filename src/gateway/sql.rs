//! Natural-language questions answered by model-written SQL.
//!
//! The model is asked for a single SQLite `SELECT` in a fenced block. Whatever
//! comes back passes through [`ensure_read_only`] before it touches the store:
//! one statement, `SELECT`/`WITH` only, and SQLite must agree the prepared
//! statement is read-only.

use rusqlite::Connection;

use super::CompletionBackend;
use crate::error::{AgentError, Result};
use crate::session::{Message, Role};
use crate::store::query::{run_query, QueryOutput};

const SQL_PROMPT: &str = "You translate questions about a SQLite database into SQL. \
    Reply with exactly one read-only SQLite SELECT statement inside a ```sql fenced block \
    and nothing else. Use only the tables and columns listed below. \
    If the question cannot be answered from these tables, reply with ```sql\nSELECT 'unanswerable';\n```.";

/// The SQL that was run and what it returned.
#[derive(Debug, Clone)]
pub struct SqlAnswer {
    pub sql: String,
    pub output: QueryOutput,
}

impl std::fmt::Display for SqlAnswer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "SQL: {}", self.sql)?;
        write!(f, "{}", self.output)
    }
}

/// Build the two-message request for translating `question`.
pub fn build_prompt(schema: &str, question: &str) -> Vec<Message> {
    vec![
        Message::new(Role::System, format!("{SQL_PROMPT}\n\n{schema}")),
        Message::new(Role::User, question),
    ]
}

/// Ask the backend for SQL answering `question`, gate it, and run it.
pub async fn ask<B: CompletionBackend>(
    backend: &B,
    conn: &Connection,
    model: &str,
    question: &str,
) -> Result<SqlAnswer> {
    if !backend.available() {
        return Err(AgentError::CredentialMissing);
    }

    let schema = crate::store::schema_digest(conn)?;
    let reply = backend.complete(&build_prompt(&schema, question), model).await?;

    let sql = extract_sql(&reply)
        .ok_or_else(|| AgentError::SqlRejected("no SQL statement in model reply".into()))?;
    let sql = ensure_read_only(conn, &sql)?;
    tracing::info!(sql = %sql, "running generated SQL");

    let output = run_query(conn, &sql)?;
    tracing::debug!(rows = output.row_count(), "generated SQL returned");
    Ok(SqlAnswer { sql, output })
}

/// Pull a SQL statement out of a model reply.
///
/// Prefers a ```sql fenced block, then any fenced block, then the reply itself
/// when it starts with `SELECT` or `WITH`.
pub fn extract_sql(reply: &str) -> Option<String> {
    if let Some(body) = fenced_block(reply, "```sql").or_else(|| fenced_block(reply, "```")) {
        let body = body.trim();
        return (!body.is_empty()).then(|| body.to_string());
    }

    let trimmed = reply.trim();
    starts_with_query_keyword(trimmed).then(|| trimmed.to_string())
}

fn fenced_block<'a>(reply: &'a str, opener: &str) -> Option<&'a str> {
    let start = reply.find(opener)? + opener.len();
    let rest = &reply[start..];
    // Skip the remainder of the opening line (a language tag, if any).
    let rest = match rest.find('\n') {
        Some(nl) if opener == "```" => &rest[nl + 1..],
        _ => rest,
    };
    let end = rest.find("```")?;
    Some(&rest[..end])
}

fn starts_with_query_keyword(sql: &str) -> bool {
    let first = sql
        .split(|c: char| c.is_whitespace() || c == '(')
        .next()
        .unwrap_or("");
    first.eq_ignore_ascii_case("select") || first.eq_ignore_ascii_case("with")
}

/// Reject anything but a single read-only SELECT/WITH statement.
/// Returns the statement without its trailing semicolon.
pub fn ensure_read_only(conn: &Connection, sql: &str) -> Result<String> {
    let cleaned = sql.trim().trim_end_matches(';').trim();

    if cleaned.is_empty() {
        return Err(AgentError::SqlRejected("empty statement".into()));
    }
    if !starts_with_query_keyword(cleaned) {
        return Err(AgentError::SqlRejected(
            "only SELECT or WITH queries are allowed".into(),
        ));
    }

    // rusqlite refuses to prepare text with anything but whitespace or
    // comments after the first statement.
    let stmt = match conn.prepare(cleaned) {
        Ok(stmt) => stmt,
        Err(rusqlite::Error::MultipleStatement) => {
            return Err(AgentError::SqlRejected("multiple statements".into()))
        }
        Err(e) => return Err(e.into()),
    };
    if !stmt.readonly() {
        return Err(AgentError::SqlRejected("statement would modify the database".into()));
    }

    Ok(cleaned.to_string())
}
