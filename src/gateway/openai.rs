//! Talks to an OpenAI-compatible `/chat/completions` endpoint.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use super::CompletionBackend;
use crate::config::ApiConfig;
use crate::error::{AgentError, Result};
use crate::session::Message;

fn api_err(msg: impl Into<String>) -> AgentError {
    AgentError::Api(msg.into())
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

pub struct OpenAiBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    project_id: Option<String>,
}

impl OpenAiBackend {
    pub fn new(config: &ApiConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| api_err(format!("failed to build HTTP client: {e}")))?;

        let api_key = config
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .map(String::from);
        if let Some(key) = &api_key {
            if !key.starts_with("sk-") {
                tracing::warn!("OPENAI_API_KEY does not start with `sk-`; requests may be rejected");
            }
        }

        Ok(Self {
            client,
            endpoint: chat_endpoint(&config.base_url),
            api_key,
            project_id: config.project_id.clone(),
        })
    }
}

impl CompletionBackend for OpenAiBackend {
    fn available(&self) -> bool {
        self.api_key.is_some()
    }

    async fn complete(&self, messages: &[Message], model: &str) -> Result<String> {
        let Some(key) = &self.api_key else {
            return Err(AgentError::CredentialMissing);
        };

        let req = ChatRequest { model, messages };
        let mut builder = self.client.post(&self.endpoint).bearer_auth(key).json(&req);
        if let Some(project) = &self.project_id {
            builder = builder.header("OpenAI-Project", project);
        }

        let start = std::time::Instant::now();
        let resp = builder
            .send()
            .await
            .map_err(|e| api_err(format!("request failed: {e}")))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            return Err(api_err(format!("API returned {status}: {body}")));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| api_err(format!("failed to read response: {e}")))?;
        let content = parse_reply(&body)?;
        debug!(
            model,
            messages = messages.len(),
            duration_ms = start.elapsed().as_millis() as u64,
            "completion received"
        );
        Ok(content)
    }
}

/// `{base_url}/chat/completions`, unless the base already names the endpoint.
pub fn chat_endpoint(base_url: &str) -> String {
    let base = base_url.trim_end_matches('/');
    if base.ends_with("/chat/completions") {
        base.to_string()
    } else {
        format!("{base}/chat/completions")
    }
}

/// Extract the first choice's text from a chat-completion response body.
pub fn parse_reply(body: &str) -> Result<String> {
    let chat: ChatResponse = serde_json::from_str(body)
        .map_err(|e| api_err(format!("response parse failed: {e}")))?;
    chat.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| api_err("response contained no message content"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::Role;

    #[test]
    fn endpoint_is_appended_once() {
        assert_eq!(
            chat_endpoint("https://api.openai.com/v1/"),
            "https://api.openai.com/v1/chat/completions"
        );
        assert_eq!(
            chat_endpoint("http://localhost:8080/v1/chat/completions"),
            "http://localhost:8080/v1/chat/completions"
        );
    }

    #[test]
    fn parse_reply_takes_first_choice() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"We have 416 units."}},{"index":1,"message":{"role":"assistant","content":"other"}}]}"#;
        assert_eq!(parse_reply(body).unwrap(), "We have 416 units.");
    }

    #[test]
    fn parse_reply_without_content_is_api_error() {
        let err = parse_reply(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, AgentError::Api(_)));
        let err = parse_reply("<html>bad gateway</html>").unwrap_err();
        assert!(matches!(err, AgentError::Api(_)));
    }

    #[test]
    fn request_serializes_openai_shape() {
        let messages = vec![
            Message::new(Role::System, "be brief"),
            Message::new(Role::User, "hi"),
        ];
        let req = ChatRequest { model: "gpt-x", messages: &messages };
        let json = serde_json::to_value(&req).unwrap();
        assert_eq!(json["model"], "gpt-x");
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["content"], "hi");
    }

    #[tokio::test]
    async fn missing_key_fails_without_network() {
        let backend = OpenAiBackend::new(&ApiConfig {
            api_key: Some("  ".into()),
            ..ApiConfig::default()
        })
        .unwrap();
        assert!(!backend.available());
        let err = backend
            .complete(&[Message::new(Role::User, "hi")], "gpt-4o-mini")
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::CredentialMissing));
    }
}
