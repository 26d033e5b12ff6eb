use config::{Config, ConfigError, Environment};
use serde::Deserialize;
use std::time::Duration;

pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai/";
pub const GEMINI_MODEL: &str = "gemini-2.5-flash";
pub const DEEPSEEK_BASE_URL: &str = "https://api.deepseek.com";
pub const DEEPSEEK_MODEL: &str = "deepseek-chat";

const DEFAULT_API_BASE_URL: &str = "http://localhost:8080";
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
const DEFAULT_MAX_TOOL_ROUNDS: usize = 8;
const DEFAULT_HISTORY_TURNS: usize = 10;

/// Settings for the `milk-assistant` binary.
///
/// Read from plain environment variables (`API_BASE_URL`, `API_EMAIL`,
/// `GEMINI_API_KEY`, ...) so the assistant can share an `.env` file with
/// other tooling. Unrelated variables are ignored.
#[derive(Clone, Deserialize)]
pub struct AssistantConfig {
    pub api_base_url: String,
    #[serde(default)]
    pub api_email: String,
    #[serde(default)]
    pub api_password: String,
    #[serde(default)]
    pub gemini_api_key: Option<String>,
    #[serde(default)]
    pub deepseek_api_key: Option<String>,
    pub gemini_model: String,
    pub gemini_base_url: String,
    pub deepseek_model: String,
    pub deepseek_base_url: String,
    pub request_timeout_secs: u64,
    pub max_tool_rounds: usize,
    /// Earlier exchanges replayed to the model in interactive sessions
    pub history_turns: usize,
}

impl std::fmt::Debug for AssistantConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AssistantConfig")
            .field("api_base_url", &self.api_base_url)
            .field("api_email", &self.api_email)
            .field("gemini_api_key", &self.gemini_api_key.as_ref().map(|_| "***"))
            .field("deepseek_api_key", &self.deepseek_api_key.as_ref().map(|_| "***"))
            .field("gemini_model", &self.gemini_model)
            .field("deepseek_model", &self.deepseek_model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("max_tool_rounds", &self.max_tool_rounds)
            .field("history_turns", &self.history_turns)
            .finish()
    }
}

impl AssistantConfig {
    /// Loads defaults overridden by the process environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_builder(
            Config::builder().add_source(Environment::default().try_parsing(true)),
        )
    }

    /// Applies the defaults underneath whatever sources `builder` already has
    pub fn from_builder(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> Result<Self, ConfigError> {
        builder
            .set_default("api_base_url", DEFAULT_API_BASE_URL)?
            .set_default("gemini_model", GEMINI_MODEL)?
            .set_default("gemini_base_url", GEMINI_BASE_URL)?
            .set_default("deepseek_model", DEEPSEEK_MODEL)?
            .set_default("deepseek_base_url", DEEPSEEK_BASE_URL)?
            .set_default("request_timeout_secs", DEFAULT_REQUEST_TIMEOUT_SECS as i64)?
            .set_default("max_tool_rounds", DEFAULT_MAX_TOOL_ROUNDS as i64)?
            .set_default("history_turns", DEFAULT_HISTORY_TURNS as i64)?
            .build()?
            .try_deserialize()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    /// Gemini key, if set to something non-blank
    pub fn gemini_key(&self) -> Option<&str> {
        non_blank(self.gemini_api_key.as_deref())
    }

    /// DeepSeek key, if set to something non-blank
    pub fn deepseek_key(&self) -> Option<&str> {
        non_blank(self.deepseek_api_key.as_deref())
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn build(pairs: &[(&str, &str)]) -> AssistantConfig {
        let mut builder = Config::builder();
        for (key, value) in pairs {
            builder = builder.set_override(*key, *value).unwrap();
        }
        AssistantConfig::from_builder(builder).unwrap()
    }

    #[test]
    fn defaults_point_at_local_api_and_public_providers() {
        let cfg = build(&[]);
        assert_eq!(cfg.api_base_url, "http://localhost:8080");
        assert_eq!(cfg.gemini_model, GEMINI_MODEL);
        assert_eq!(cfg.deepseek_base_url, DEEPSEEK_BASE_URL);
        assert_eq!(cfg.request_timeout(), Duration::from_secs(30));
        assert_eq!(cfg.max_tool_rounds, 8);
        assert_eq!(cfg.history_turns, 10);
        assert!(cfg.gemini_key().is_none());
        assert!(cfg.deepseek_key().is_none());
    }

    #[test]
    fn blank_keys_count_as_missing() {
        let cfg = build(&[("gemini_api_key", "  "), ("deepseek_api_key", "sk-live")]);
        assert!(cfg.gemini_key().is_none());
        assert_eq!(cfg.deepseek_key(), Some("sk-live"));
    }

    #[test]
    fn debug_output_hides_keys() {
        let cfg = build(&[("gemini_api_key", "very-secret")]);
        let rendered = format!("{:?}", cfg);
        assert!(!rendered.contains("very-secret"));
    }
}
