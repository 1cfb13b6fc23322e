//! Configuration management for Showroom
//!
//! Supports environment variables, config files, and runtime overrides.
//! Nothing about the remote endpoint is hard-coded in the engine; every
//! component receives its settings from here at construction.
//!
//! Config file location: ~/.config/showroom/config.toml

use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use url::Url;

use crate::core::error::{Result, ShowroomError};

/// Main configuration for Showroom
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote model endpoint configuration
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Agent behavior configuration
    #[serde(default)]
    pub agent: AgentConfig,
    /// Retry policy for gateway calls
    #[serde(default)]
    pub retry: RetryConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Remote inference endpoint configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Base URL of an OpenAI-compatible API (e.g. https://api.openai.com/v1)
    pub base_url: String,
    /// Bearer credential; empty means no Authorization header
    pub api_key: String,
    /// Model identifier
    pub model: String,
    /// Default sampling temperature
    pub temperature: Option<f32>,
    /// Maximum output tokens
    pub max_tokens: Option<u32>,
    /// Request timeout in seconds
    pub timeout_secs: u64,
}

/// Agent behavior configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    /// Maximum model calls per user message
    /// Default: 5
    pub max_iterations: usize,
    /// Number of carried-over turns kept between user messages
    /// Default: 40
    pub max_history: usize,
    /// System prompt sent ahead of every conversation
    pub system_prompt: Option<String>,
    /// Message shown to the customer when a run fails
    pub fallback_message: String,
    /// Per-tool execution timeout in seconds
    pub tool_timeout_secs: u64,
    /// Tenant the handlers act for
    pub tenant_id: String,
}

/// Gateway retry configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per gateway call, including the first
    pub max_attempts: u32,
    /// Delay before the first retry in ms
    pub base_delay_ms: u64,
    /// Upper bound for any single delay in ms
    pub max_delay_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Emit JSON log lines instead of human-readable ones
    pub json: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: env::var("SHOWROOM_API_BASE")
                .unwrap_or_else(|_| "http://localhost:11434/v1".to_string()),
            api_key: env::var("SHOWROOM_API_KEY").unwrap_or_default(),
            model: env::var("SHOWROOM_MODEL").unwrap_or_else(|_| "qwen3:8b".to_string()),
            temperature: Some(0.2),
            max_tokens: Some(1024),
            timeout_secs: env::var("SHOWROOM_TIMEOUT_SECS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(60),
        }
    }
}

// Keeps the credential out of logs.
impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_key",
                &if self.api_key.is_empty() { "" } else { "***" },
            )
            .field("model", &self.model)
            .field("temperature", &self.temperature)
            .field("max_tokens", &self.max_tokens)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            max_iterations: env::var("SHOWROOM_MAX_ITERATIONS")
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(5),
            max_history: 40,
            system_prompt: None,
            fallback_message:
                "Sorry, I can't answer that right now. Please try again in a moment.".to_string(),
            tool_timeout_secs: 30,
            tenant_id: env::var("SHOWROOM_TENANT").unwrap_or_else(|_| "default".to_string()),
        }
    }
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 8_000,
        }
    }
}

impl Config {
    /// Get the config directory path
    pub fn config_dir() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("showroom")
    }

    /// Get the config file path
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.toml")
    }

    /// Load configuration from file, environment, and defaults
    /// Priority: CLI args > env vars > config file > defaults
    pub fn load() -> Self {
        // Try to load .env file if it exists
        let _ = dotenvy::dotenv();

        match Self::load_from_path(&Self::config_file()) {
            Ok(config) => config.with_env_overrides(),
            Err(_) => Self::default(),
        }
    }

    /// Load configuration from a specific file
    pub fn load_from_path(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ShowroomError::config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let content = fs::read_to_string(path)
            .map_err(|e| ShowroomError::config(format!("Failed to read config: {}", e)))?;

        Self::from_toml(&content)
    }

    /// Parse configuration from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ShowroomError::config(format!("Failed to parse config: {}", e)))
    }

    /// Apply `SHOWROOM_*` environment variables on top of file values
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(base_url) = env::var("SHOWROOM_API_BASE") {
            self.gateway.base_url = base_url;
        }
        if let Ok(api_key) = env::var("SHOWROOM_API_KEY") {
            self.gateway.api_key = api_key;
        }
        if let Ok(model) = env::var("SHOWROOM_MODEL") {
            self.gateway.model = model;
        }
        if let Some(max) = env::var("SHOWROOM_MAX_ITERATIONS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.agent.max_iterations = max;
        }
        if let Some(secs) = env::var("SHOWROOM_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
        {
            self.gateway.timeout_secs = secs;
        }
        if let Ok(tenant) = env::var("SHOWROOM_TENANT") {
            self.agent.tenant_id = tenant;
        }
        self
    }

    /// Check the values the engine cannot run without
    pub fn validate(&self) -> Result<()> {
        self.chat_completions_url()?;

        if self.gateway.model.trim().is_empty() {
            return Err(ShowroomError::config("gateway.model must not be empty"));
        }
        if self.agent.max_iterations == 0 {
            return Err(ShowroomError::config(
                "agent.max_iterations must be at least 1",
            ));
        }
        if self.retry.max_attempts == 0 {
            return Err(ShowroomError::config("retry.max_attempts must be at least 1"));
        }

        Ok(())
    }

    /// Full URL of the chat completions endpoint
    pub fn chat_completions_url(&self) -> Result<Url> {
        let mut base = Url::parse(&self.gateway.base_url).map_err(|e| {
            ShowroomError::config(format!(
                "Invalid gateway.base_url '{}': {}",
                self.gateway.base_url, e
            ))
        })?;

        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }

        base.join("chat/completions")
            .map_err(|e| ShowroomError::config(format!("Invalid endpoint path: {}", e)))
    }

    /// Save configuration to file
    pub fn save(&self) -> Result<PathBuf> {
        let config_dir = Self::config_dir();
        let config_path = Self::config_file();

        if !config_dir.exists() {
            fs::create_dir_all(&config_dir)
                .map_err(|e| ShowroomError::config(format!("Failed to create config dir: {}", e)))?;
        }

        let content = toml::to_string_pretty(self)
            .map_err(|e| ShowroomError::config(format!("Failed to serialize config: {}", e)))?;

        fs::write(&config_path, content)
            .map_err(|e| ShowroomError::config(format!("Failed to write config: {}", e)))?;

        Ok(config_path)
    }
}
