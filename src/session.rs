//! In-memory conversation state for one run of the agent.
//!
//! A [`Session`] owns the transcript, the system prompt, an optional injected
//! context block (schema and snapshot digests), and the model name used for the
//! next request. The transcript is append-only and its order is the order
//! replayed to the completion API.

use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};

/// Who authored a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Role {
    type Err = AgentError;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "system" => Ok(Self::System),
            "user" => Ok(Self::User),
            "assistant" => Ok(Self::Assistant),
            _ => Err(AgentError::InvalidRole(s.to_string())),
        }
    }
}

/// One role-tagged message, in the shape the chat-completion API expects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    system_prompt: String,
    context: Option<String>,
    model: String,
    transcript: Vec<Message>,
}

impl Session {
    pub fn new(system_prompt: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            system_prompt: system_prompt.into(),
            context: None,
            model: model.into(),
            transcript: Vec::new(),
        }
    }

    /// Append a message, parsing the role from its wire name.
    pub fn append(&mut self, role: &str, content: impl Into<String>) -> Result<()> {
        let role: Role = role.parse()?;
        self.push(role, content);
        Ok(())
    }

    pub fn push(&mut self, role: Role, content: impl Into<String>) {
        self.transcript.push(Message::new(role, content));
    }

    pub fn set_system_prompt(&mut self, text: impl Into<String>) {
        self.system_prompt = text.into();
    }

    /// Replace the context block appended to the system message.
    pub fn set_context(&mut self, context: Option<String>) {
        self.context = context.filter(|c| !c.trim().is_empty());
    }

    /// Change the model for subsequent requests. The name is not validated here;
    /// a bad name surfaces as an API error on the next call.
    pub fn set_model(&mut self, name: impl Into<String>) {
        self.model = name.into();
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn context(&self) -> Option<&str> {
        self.context.as_deref()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn transcript(&self) -> &[Message] {
        &self.transcript
    }

    pub fn len(&self) -> usize {
        self.transcript.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transcript.is_empty()
    }

    /// Replace the transcript wholesale, e.g. with one loaded from a snapshot.
    pub fn restore(&mut self, transcript: Vec<Message>) {
        self.transcript = transcript;
    }

    /// Display lines for the transcript, numbered from 1. The iterator is lazy
    /// and can be cloned to walk the history again.
    pub fn render_history(&self) -> impl Iterator<Item = String> + Clone + '_ {
        self.transcript
            .iter()
            .enumerate()
            .map(|(i, m)| format!("{}. {}: {}", i + 1, m.role, m.content))
    }

    /// The system message followed by the full transcript.
    pub fn to_request_messages(&self) -> Vec<Message> {
        let system = match &self.context {
            Some(ctx) => format!("{}\n\n{}", self.system_prompt, ctx),
            None => self.system_prompt.clone(),
        };

        let mut messages = Vec::with_capacity(self.transcript.len() + 1);
        messages.push(Message::new(Role::System, system));
        messages.extend(self.transcript.iter().cloned());
        messages
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> Session {
        Session::new("You are a helpful assistant.", "gpt-4o-mini")
    }

    #[test]
    fn history_preserves_insertion_order() {
        let mut s = session();
        s.append("user", "first").unwrap();
        s.append("assistant", "second").unwrap();
        s.append("user", "third").unwrap();

        let lines: Vec<String> = s.render_history().collect();
        assert_eq!(
            lines,
            vec!["1. user: first", "2. assistant: second", "3. user: third"]
        );
    }

    #[test]
    fn render_history_is_restartable() {
        let mut s = session();
        s.push(Role::User, "hello");
        s.push(Role::Assistant, "hi");

        let history = s.render_history();
        let first: Vec<String> = history.clone().collect();
        let second: Vec<String> = history.collect();
        assert_eq!(first, second);
    }

    #[test]
    fn append_rejects_unknown_role() {
        let mut s = session();
        let err = s.append("tool", "output").unwrap_err();
        assert!(matches!(err, AgentError::InvalidRole(r) if r == "tool"));
        assert!(s.is_empty());
    }

    #[test]
    fn request_messages_prepend_exactly_one_system_message() {
        let mut s = session();
        s.push(Role::User, "a");
        s.push(Role::System, "mid-conversation note");
        s.push(Role::Assistant, "b");

        let msgs = s.to_request_messages();
        assert_eq!(msgs.len(), 4);
        assert_eq!(msgs[0].role, Role::System);
        assert_eq!(msgs[0].content, "You are a helpful assistant.");
        assert_eq!(&msgs[1..], s.transcript());
    }

    #[test]
    fn request_messages_on_empty_session() {
        let msgs = session().to_request_messages();
        assert_eq!(msgs.len(), 1);
        assert_eq!(msgs[0].role, Role::System);
    }

    #[test]
    fn context_is_appended_to_system_prompt() {
        let mut s = session();
        s.set_context(Some("Available database tables:\n- customers".into()));
        let system = &s.to_request_messages()[0].content;
        assert!(system.starts_with("You are a helpful assistant.\n\n"));
        assert!(system.ends_with("- customers"));

        s.set_context(Some("   ".into()));
        assert!(s.context().is_none());
    }

    #[test]
    fn system_prompt_and_model_are_replaced() {
        let mut s = session();
        s.set_system_prompt("Only talk about stock.");
        s.set_model("gpt-x");
        assert_eq!(s.to_request_messages()[0].content, "Only talk about stock.");
        assert_eq!(s.model(), "gpt-x");
    }

    #[test]
    fn role_serializes_lowercase() {
        let msg = Message::new(Role::Assistant, "ok");
        let json = serde_json::to_string(&msg).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"ok"}"#);
    }
}
