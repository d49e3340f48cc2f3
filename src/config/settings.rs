//! Configuration settings for vidbrief.

use crate::acquisition::{RetryPolicy, DEFAULT_INITIAL_BACKOFF, DEFAULT_MAX_ATTEMPTS};
use crate::error::{Result, VidbriefError};
use crate::ratelimit::RateLimit;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub server: ServerSettings,
    pub transcript: TranscriptSettings,
    pub youtube: YoutubeSettings,
    pub cache: CacheSettings,
    pub limits: LimitSettings,
    pub synthesis: SynthesisSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    pub host: String,
    pub port: u16,
    /// CORS origin allowed to call the API. `*` allows any origin.
    pub allowed_origin: String,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 5000,
            allowed_origin: "*".to_string(),
        }
    }
}

/// Transcript acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptSettings {
    /// Preferred caption languages, most preferred first.
    pub languages: Vec<String>,
    /// Total fetch attempts per acquisition, including the first.
    pub max_attempts: u32,
    /// Delay before the first retry, doubled after each one.
    pub initial_backoff_ms: u64,
    /// Timeout for each request to the caption backend.
    pub request_timeout_secs: u64,
}

impl Default for TranscriptSettings {
    fn default() -> Self {
        Self {
            languages: vec!["en".to_string()],
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF.as_millis() as u64,
            request_timeout_secs: 30,
        }
    }
}

impl TranscriptSettings {
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.max_attempts,
            Duration::from_millis(self.initial_backoff_ms),
        )
    }
}

/// YouTube-specific settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct YoutubeSettings {
    /// YouTube Data API key. Without it, existence checks are skipped.
    pub api_key: Option<String>,
}

/// Result cache settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub ttl_secs: u64,
    pub max_entries: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            ttl_secs: crate::cache::DEFAULT_TTL.as_secs(),
            max_entries: crate::cache::DEFAULT_MAX_ENTRIES,
        }
    }
}

impl CacheSettings {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }
}

/// Per-class request limits. A limit of 0 disables that class's limiter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitSettings {
    pub summary_per_window: u32,
    pub question_per_window: u32,
    pub window_secs: u64,
}

impl Default for LimitSettings {
    fn default() -> Self {
        Self {
            summary_per_window: 10,
            question_per_window: 20,
            window_secs: 60,
        }
    }
}

impl LimitSettings {
    pub fn summary(&self) -> RateLimit {
        RateLimit::new(self.summary_per_window, Duration::from_secs(self.window_secs))
    }

    pub fn question(&self) -> RateLimit {
        RateLimit::new(self.question_per_window, Duration::from_secs(self.window_secs))
    }
}

/// Text generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesisSettings {
    /// OpenAI API key. Falls back to `OPENAI_API_KEY`.
    pub api_key: Option<String>,
    /// Chat model used for summaries and answers.
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout_secs: u64,
}

impl Default for SynthesisSettings {
    fn default() -> Self {
        Self {
            api_key: None,
            model: "gpt-4-turbo".to_string(),
            temperature: 0.7,
            max_tokens: 500,
            timeout_secs: 120,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory for custom prompts (overrides defaults).
    pub custom_dir: Option<String>,
    /// Custom variables available in all prompts as {{variable_name}}.
    pub variables: std::collections::HashMap<String, String>,
}

impl Settings {
    /// Load settings from the default configuration file.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides are applied on top of the file.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str(&content)?
        } else {
            Settings::default()
        };

        settings.apply_env_from(|name| std::env::var(name).ok())?;
        Ok(settings)
    }

    /// Override settings from environment variables looked up through `lookup`.
    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("OPENAI_API_KEY") {
            self.synthesis.api_key = Some(key);
        }
        if let Some(key) = get("YOUTUBE_API_KEY") {
            self.youtube.api_key = Some(key);
        }
        if let Some(origin) = get("ALLOWED_ORIGIN") {
            self.server.allowed_origin = origin;
        }
        if let Some(host) = get("HOST") {
            self.server.host = host;
        }
        if let Some(port) = get("PORT") {
            self.server.port = parse_env("PORT", &port)?;
        }
        if let Some(limit) = get("SUMMARY_RATE_LIMIT") {
            self.limits.summary_per_window = parse_env("SUMMARY_RATE_LIMIT", &limit)?;
        }
        if let Some(limit) = get("QUESTION_RATE_LIMIT") {
            self.limits.question_per_window = parse_env("QUESTION_RATE_LIMIT", &limit)?;
        }
        if let Some(window) = get("RATE_LIMIT_WINDOW_SECS") {
            self.limits.window_secs = parse_env("RATE_LIMIT_WINDOW_SECS", &window)?;
        }
        Ok(())
    }

    /// The OpenAI API key, or a configuration error if none is set.
    pub fn openai_api_key(&self) -> Result<&str> {
        self.synthesis
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| {
                VidbriefError::Config(
                    "OPENAI_API_KEY is not set (environment or [synthesis].api_key)".to_string(),
                )
            })
    }

    /// The YouTube Data API key, if configured.
    pub fn youtube_api_key(&self) -> Option<&str> {
        self.youtube
            .api_key
            .as_deref()
            .filter(|k| !k.trim().is_empty())
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidbrief")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| VidbriefError::Config(format!("Invalid value for {}: {}", name, value)))
}
