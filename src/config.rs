use serde::Deserialize;
use std::fs;
use std::path::Path;
use thiserror::Error;

const DEFAULT_CONFIG_PATH: &str = ".pr-review-bot.toml";
const DEFAULT_PORT: u16 = 3000;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    FileRead(#[from] std::io::Error),

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Top-level configuration loaded from .pr-review-bot.toml.
///
/// All fields are optional; credentials and the port can also come from the
/// environment (GITHUB_TOKEN, OPENAI_API_KEY, WEBHOOK_SECRET, PORT). Values
/// in the config file take precedence over the environment.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    /// HTTP listener settings
    #[serde(default)]
    pub server: ServerConfig,

    /// GitHub API settings
    #[serde(default)]
    pub github: GitHubConfig,

    /// Review model settings
    #[serde(default)]
    pub openai: OpenAiConfig,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ServerConfig {
    /// Listening port. Defaults to 3000.
    pub port: Option<u16>,

    /// Shared secret for webhook signature verification. When unset,
    /// deliveries are accepted without a signature check.
    pub webhook_secret: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GitHubConfig {
    /// GitHub API token. If None, falls back to GITHUB_TOKEN env var.
    pub token: Option<String>,

    /// Base URL of the GitHub REST API.
    pub api_url: String,

    /// Timeout applied to every GitHub API call, in seconds.
    pub timeout_secs: u64,

    /// Retry budget for the changed-files fetch. The comment post is never
    /// retried regardless of this value.
    pub retries: u32,
}

impl Default for GitHubConfig {
    fn default() -> Self {
        Self {
            token: None,
            api_url: "https://api.github.com".to_string(),
            timeout_secs: 30,
            retries: 0,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OpenAiConfig {
    /// OpenAI API key. If None, falls back to OPENAI_API_KEY env var.
    pub api_key: Option<String>,

    /// Chat-completions endpoint URL.
    pub api_url: String,

    /// Model identifier sent with every completion request.
    pub model: String,

    /// Timeout applied to every completion call, in seconds.
    pub timeout_secs: u64,

    /// Retry budget for completion requests.
    pub retries: u32,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            api_url: "https://api.openai.com/v1/chat/completions".to_string(),
            model: "gpt-4o".to_string(),
            timeout_secs: 60,
            retries: 0,
        }
    }
}

impl Config {
    /// Load configuration, layering environment fallbacks over the file.
    ///
    /// When `path` is None, .pr-review-bot.toml in the current directory is
    /// used if it exists; otherwise the built-in defaults apply.
    pub fn load(path: Option<&Path>) -> Result<Config, ConfigError> {
        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        let mut config = match path {
            Some(explicit) => Self::load_from(explicit)?,
            None if default_path.exists() => Self::load_from(default_path)?,
            None => Config::default(),
        };
        config.apply_env_fallbacks();
        Ok(config)
    }

    /// Load from a specific path (useful for testing).
    pub fn load_from(path: &Path) -> Result<Config, ConfigError> {
        let contents = fs::read_to_string(path)?;
        let config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Fill in values the config file left unset from the environment.
    fn apply_env_fallbacks(&mut self) {
        if self.github.token.is_none() {
            self.github.token = std::env::var("GITHUB_TOKEN").ok();
        }
        if self.openai.api_key.is_none() {
            self.openai.api_key = std::env::var("OPENAI_API_KEY").ok();
        }
        if self.server.webhook_secret.is_none() {
            self.server.webhook_secret = std::env::var("WEBHOOK_SECRET").ok();
        }
        if self.server.port.is_none() {
            self.server.port = std::env::var("PORT")
                .ok()
                .and_then(|port| port.parse().ok());
        }
    }

    /// Resolved listening port.
    pub fn port(&self) -> u16 {
        self.server.port.unwrap_or(DEFAULT_PORT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.github.token.is_none());
        assert!(config.openai.api_key.is_none());
        assert!(config.server.webhook_secret.is_none());
        assert_eq!(config.port(), 3000);
        assert_eq!(config.github.api_url, "https://api.github.com");
        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.github.retries, 0);
        assert_eq!(config.openai.retries, 0);
    }

    #[test]
    fn test_parse_config_toml() {
        let toml_str = r#"
[server]
port = 8080
webhook_secret = "hush"

[github]
token = "ghp_test"
timeout_secs = 10
retries = 2

[openai]
model = "gpt-4o-mini"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert_eq!(config.port(), 8080);
        assert_eq!(config.server.webhook_secret.as_deref(), Some("hush"));
        assert_eq!(config.github.token.as_deref(), Some("ghp_test"));
        assert_eq!(config.github.timeout_secs, 10);
        assert_eq!(config.github.retries, 2);
        assert_eq!(config.openai.model, "gpt-4o-mini");
        // Untouched sections keep their defaults.
        assert_eq!(config.openai.timeout_secs, 60);
        assert_eq!(
            config.openai.api_url,
            "https://api.openai.com/v1/chat/completions"
        );
    }

    #[test]
    fn test_partial_section_keeps_defaults() {
        let config: Config = toml::from_str("[github]\nretries = 1\n").unwrap();
        assert_eq!(config.github.retries, 1);
        assert_eq!(config.github.timeout_secs, 30);
        assert_eq!(config.github.api_url, "https://api.github.com");
    }
}
