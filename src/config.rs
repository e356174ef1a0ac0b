use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tracing::info;

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AgentConfig {
    pub agent: ChatConfig,
    pub storage: StorageConfig,
    pub api: ApiConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ChatConfig {
    pub system_prompt: String,
    pub model: String,
    /// Refuse chat messages that are not about the database without calling the API.
    pub db_only: bool,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct StorageConfig {
    pub db_path: String,
    pub snapshot_path: String,
    /// Rows sampled per table when writing a snapshot.
    pub sample_limit: usize,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub project_id: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            agent: ChatConfig::default(),
            storage: StorageConfig::default(),
            api: ApiConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            system_prompt: "You are a helpful assistant.".into(),
            model: "gpt-4o-mini".into(),
            db_only: false,
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            db_path: "app_data.db".into(),
            snapshot_path: "memory.json".into(),
            sample_limit: 50,
        }
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".into(),
            api_key: None,
            project_id: None,
            timeout_secs: 60,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "warn".into(),
        }
    }
}

/// Returns the default config file path: `./stockroom.toml`
pub fn default_config_path() -> PathBuf {
    PathBuf::from("stockroom.toml")
}

impl AgentConfig {
    /// Load config from the default TOML file (if it exists) then apply env var overrides.
    pub fn load() -> Result<Self> {
        Self::load_from(default_config_path())
    }

    /// Load from a specific path, then apply env var overrides.
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let mut config = if path.exists() {
            let contents =
                std::fs::read_to_string(path).context("failed to read config file")?;
            toml::from_str(&contents).context("failed to parse config TOML")?
        } else {
            info!("no config file at {}, using defaults", path.display());
            AgentConfig::default()
        };

        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides. Empty values are ignored.
    fn apply_env_overrides(&mut self) {
        if let Some(val) = env_value("OPENAI_API_KEY") {
            self.api.api_key = Some(val);
        }
        if let Some(val) = env_value("OPENAI_PROJECT_ID") {
            self.api.project_id = Some(val);
        }
        if let Some(val) = env_value("OPENAI_BASE_URL") {
            self.api.base_url = val;
        }
        if let Some(val) = env_value("OPENAI_MODEL") {
            self.agent.model = val;
        }
        if let Some(val) = env_value("AGENT_SYSTEM_PROMPT") {
            self.agent.system_prompt = val;
        }
        if let Some(val) = env_value("STOCKROOM_DB") {
            self.storage.db_path = val;
        }
        if let Some(val) = env_value("STOCKROOM_SNAPSHOT") {
            self.storage.snapshot_path = val;
        }
        if let Some(val) = env_value("STOCKROOM_LOG_LEVEL") {
            self.logging.level = val;
        }
    }

    /// Resolve the database path, expanding `~` if needed.
    pub fn resolved_db_path(&self) -> PathBuf {
        expand_tilde(&self.storage.db_path)
    }

    /// Resolve the snapshot path, expanding `~` if needed.
    pub fn resolved_snapshot_path(&self) -> PathBuf {
        expand_tilde(&self.storage.snapshot_path)
    }
}

fn env_value(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

pub fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => PathBuf::from(path),
        }
    } else {
        PathBuf::from(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let config = AgentConfig::default();
        assert_eq!(config.agent.model, "gpt-4o-mini");
        assert!(!config.agent.db_only);
        assert_eq!(config.storage.db_path, "app_data.db");
        assert_eq!(config.storage.snapshot_path, "memory.json");
        assert_eq!(config.storage.sample_limit, 50);
        assert!(config.api.api_key.is_none());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    fn parse_toml_config() {
        let toml_str = r#"
[agent]
model = "gpt-4o"
db_only = true

[storage]
db_path = "/tmp/shop.db"
sample_limit = 10

[api]
base_url = "http://localhost:8080/v1"
"#;
        let config: AgentConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.agent.model, "gpt-4o");
        assert!(config.agent.db_only);
        assert_eq!(config.storage.db_path, "/tmp/shop.db");
        assert_eq!(config.storage.sample_limit, 10);
        assert_eq!(config.api.base_url, "http://localhost:8080/v1");
        // defaults still apply for unset fields
        assert_eq!(config.storage.snapshot_path, "memory.json");
        assert_eq!(config.api.timeout_secs, 60);
        assert_eq!(config.agent.system_prompt, "You are a helpful assistant.");
    }

    #[test]
    fn env_overrides_apply() {
        let mut config = AgentConfig::default();
        std::env::set_var("OPENAI_API_KEY", "sk-test-key");
        std::env::set_var("OPENAI_MODEL", "gpt-env");
        std::env::set_var("STOCKROOM_DB", "/tmp/override.db");
        std::env::set_var("STOCKROOM_LOG_LEVEL", "trace");

        config.apply_env_overrides();

        assert_eq!(config.api.api_key.as_deref(), Some("sk-test-key"));
        assert_eq!(config.agent.model, "gpt-env");
        assert_eq!(config.storage.db_path, "/tmp/override.db");
        assert_eq!(config.logging.level, "trace");

        // Clean up
        std::env::remove_var("OPENAI_API_KEY");
        std::env::remove_var("OPENAI_MODEL");
        std::env::remove_var("STOCKROOM_DB");
        std::env::remove_var("STOCKROOM_LOG_LEVEL");
    }

    #[test]
    fn load_from_layers_env_over_file_over_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("stockroom.toml");
        std::fs::write(
            &path,
            r#"
[storage]
snapshot_path = "/from/file/memory.json"
sample_limit = 7

[api]
timeout_secs = 5
"#,
        )
        .unwrap();

        std::env::set_var("STOCKROOM_SNAPSHOT", "/from/env/memory.json");
        let config = AgentConfig::load_from(&path).unwrap();
        std::env::remove_var("STOCKROOM_SNAPSHOT");

        // env beats the file
        assert_eq!(config.storage.snapshot_path, "/from/env/memory.json");
        // the file beats the defaults
        assert_eq!(config.storage.sample_limit, 7);
        assert_eq!(config.api.timeout_secs, 5);
        // untouched keys keep their defaults
        assert_eq!(config.agent.system_prompt, "You are a helpful assistant.");
    }

    #[test]
    fn load_from_missing_file_uses_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = AgentConfig::load_from(dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.storage.sample_limit, 50);
    }

    #[test]
    fn expand_tilde_leaves_relative_paths() {
        assert_eq!(expand_tilde("app_data.db"), PathBuf::from("app_data.db"));
    }
}
