use std::path::PathBuf;

/// Every failure a turn can produce. None of these end the session.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("no API key configured (set OPENAI_API_KEY)")]
    CredentialMissing,

    #[error("completion unavailable: {0}")]
    Api(String),

    #[error("completion unavailable ({api}) and the offline answer failed: {fallback}")]
    Unanswered { api: String, fallback: String },

    #[error("snapshot {} is unreadable: {reason}", path.display())]
    MalformedSnapshot { path: PathBuf, reason: String },

    #[error("database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("invalid command: {0}")]
    InvalidCommand(String),

    #[error("unknown role: {0} (expected system, user, or assistant)")]
    InvalidRole(String),

    #[error("unknown table: {0}")]
    UnknownTable(String),

    #[error("refusing to run generated SQL: {0}")]
    SqlRejected(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T, E = AgentError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn malformed_snapshot_names_the_file() {
        let err = AgentError::MalformedSnapshot {
            path: PathBuf::from("memory.json"),
            reason: "missing field `version`".into(),
        };
        let msg = err.to_string();
        assert!(msg.contains("memory.json"));
        assert!(msg.contains("missing field"));
    }

    #[test]
    fn rusqlite_errors_convert() {
        let err: AgentError = rusqlite::Error::QueryReturnedNoRows.into();
        assert!(matches!(err, AgentError::Database(_)));
    }
}
