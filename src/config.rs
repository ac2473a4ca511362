//! Relay configuration from environment variables
//!
//! All values are read from `DEEPSEEK_*` variables. Empty variables count as
//! unset. Every malformed value is reported as a `ConfigError` naming the
//! variable, so a bad deployment fails at startup rather than on first use.

use crate::cache::CacheConfig;
use crate::duration::parse_positive_duration;
use crate::error::{RelayError, Result};
use crate::files::FilePolicy;
use crate::models::ModelRegistry;
use crate::retry::RetryPolicy;
use std::str::FromStr;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_MODEL: &str = "deepseek-chat";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful AI assistant that specializes in code review and software engineering. \
Provide thorough and insightful analysis with specific, actionable feedback. \
Focus on issues like bugs, security vulnerabilities, performance problems, and code quality. \
Include examples and explanations in your reviews.";

/// 10 MiB
pub const DEFAULT_MAX_FILE_SIZE: u64 = 10 * 1024 * 1024;

pub const DEFAULT_ALLOWED_FILE_TYPES: &[&str] = &[
    "text/plain",
    "text/x-go",
    "text/x-python",
    "text/javascript",
    "text/markdown",
    "text/x-java",
    "text/x-c",
    "text/x-c++",
    "text/csv",
    "application/json",
    "text/x-yaml",
    "text/x-toml",
    "text/html",
    "text/css",
    "application/xml",
];

/// Complete relay configuration
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub api_key: String,
    pub model: String,
    pub system_prompt: String,
    pub max_file_size: u64,
    pub allowed_file_types: Vec<String>,
    pub temperature: f32,
    pub cache: CacheConfig,
    /// Deadline for a single outbound attempt
    pub http_timeout: Duration,
    pub retry: RetryPolicy,
}

impl RelayConfig {
    /// Configuration with defaults for everything but the API key
    pub fn with_api_key(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: DEFAULT_MODEL.to_string(),
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            allowed_file_types: DEFAULT_ALLOWED_FILE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
            temperature: 0.4,
            cache: CacheConfig::default(),
            http_timeout: Duration::from_secs(90),
            retry: RetryPolicy::default(),
        }
    }

    /// Load from the process environment
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load through an arbitrary variable lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|value| !value.is_empty());

        let api_key = var("DEEPSEEK_API_KEY").ok_or_else(|| {
            RelayError::ConfigError("DEEPSEEK_API_KEY environment variable is required".to_string())
        })?;
        let mut config = Self::with_api_key(api_key);

        if let Some(model) = var("DEEPSEEK_MODEL") {
            config.model = model;
        }

        if let Some(prompt) = var("DEEPSEEK_SYSTEM_PROMPT") {
            config.system_prompt = prompt;
        } else if let Some(path) = var("DEEPSEEK_SYSTEM_PROMPT_FILE") {
            config.system_prompt = std::fs::read_to_string(&path).map_err(|e| {
                RelayError::ConfigError(format!(
                    "failed to read system prompt file {}: {}",
                    path, e
                ))
            })?;
        }

        if let Some(value) = var("DEEPSEEK_MAX_FILE_SIZE") {
            config.max_file_size = parse_number("DEEPSEEK_MAX_FILE_SIZE", &value)?;
        }

        if let Some(value) = var("DEEPSEEK_ALLOWED_FILE_TYPES") {
            config.allowed_file_types = value
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        if let Some(value) = var("DEEPSEEK_TEMPERATURE") {
            config.temperature = parse_number("DEEPSEEK_TEMPERATURE", &value)?;
        }

        if let Some(value) = var("DEEPSEEK_ENABLE_CACHING") {
            config.cache.enabled = parse_bool("DEEPSEEK_ENABLE_CACHING", &value)?;
        }

        if let Some(value) = var("DEEPSEEK_DEFAULT_CACHE_TTL") {
            config.cache.default_ttl = parse_env_duration("DEEPSEEK_DEFAULT_CACHE_TTL", &value)?;
        }

        if let Some(value) = var("DEEPSEEK_TIMEOUT") {
            let secs: u64 = parse_number("DEEPSEEK_TIMEOUT", &value)?;
            config.http_timeout = Duration::from_secs(secs);
        }

        if let Some(value) = var("DEEPSEEK_MAX_RETRIES") {
            let retries: u32 = parse_number("DEEPSEEK_MAX_RETRIES", &value)?;
            config.retry.max_attempts = retries.saturating_add(1);
        }

        if let Some(value) = var("DEEPSEEK_INITIAL_BACKOFF") {
            config.retry.initial_backoff = parse_env_duration("DEEPSEEK_INITIAL_BACKOFF", &value)?;
        }

        if let Some(value) = var("DEEPSEEK_MAX_BACKOFF") {
            config.retry.max_backoff = parse_env_duration("DEEPSEEK_MAX_BACKOFF", &value)?;
        }

        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.api_key.is_empty() {
            return Err(RelayError::ConfigError("API key is required".to_string()));
        }

        if !(0.0..=1.0).contains(&self.temperature) {
            return Err(RelayError::ConfigError(format!(
                "temperature must be between 0.0 and 1.0, got {}",
                self.temperature
            )));
        }

        if self.http_timeout.is_zero() {
            return Err(RelayError::ConfigError(
                "DEEPSEEK_TIMEOUT must be greater than zero".to_string(),
            ));
        }

        self.cache.validate()?;
        self.retry.validate()
    }

    /// Apply command-line overrides on top of the environment
    pub fn apply_overrides(
        &mut self,
        overrides: &ConfigOverrides,
        models: &ModelRegistry,
    ) -> Result<()> {
        if let Some(model) = overrides.model.as_deref().filter(|m| !m.is_empty()) {
            models.validate(model)?;
            info!("Overriding DeepSeek model with flag value: {}", model);
            self.model = model.to_string();
        }

        if let Some(prompt) = overrides.system_prompt.as_deref().filter(|p| !p.is_empty()) {
            info!("Overriding DeepSeek system prompt with flag value");
            self.system_prompt = prompt.to_string();
        }

        if let Some(temperature) = overrides.temperature {
            if !(0.0..=1.0).contains(&temperature) {
                return Err(RelayError::ConfigError(format!(
                    "invalid temperature: {}. Must be between 0.0 and 1.0",
                    temperature
                )));
            }
            info!("Overriding DeepSeek temperature with flag value: {}", temperature);
            self.temperature = temperature;
        }

        Ok(())
    }

    /// Limits applied to files referenced by a question
    pub fn file_policy(&self) -> FilePolicy {
        FilePolicy::new(self.max_file_size, self.allowed_file_types.clone())
    }

    /// API key with everything but the last four characters hidden
    pub fn masked_api_key(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 4 {
            return "*".repeat(chars.len());
        }
        let visible: String = chars[chars.len() - 4..].iter().collect();
        format!("{}{}", "*".repeat(chars.len() - 4), visible)
    }

    /// System prompt cut to `max_chars` characters, with an ellipsis if cut
    pub fn prompt_preview(&self, max_chars: usize) -> String {
        match self.system_prompt.char_indices().nth(max_chars) {
            Some((cut, _)) => format!("{}...", &self.system_prompt[..cut]),
            None => self.system_prompt.clone(),
        }
    }
}

/// Values supplied on the command line
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub model: Option<String>,
    pub system_prompt: Option<String>,
    pub temperature: Option<f32>,
}

fn parse_number<T>(name: &str, value: &str) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    value
        .trim()
        .parse()
        .map_err(|e| RelayError::ConfigError(format!("invalid {}: {}", name, e)))
}

fn parse_bool(name: &str, value: &str) -> Result<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "t" | "true" | "yes" | "on" => Ok(true),
        "0" | "f" | "false" | "no" | "off" => Ok(false),
        other => Err(RelayError::ConfigError(format!(
            "invalid {}: expected a boolean, got {:?}",
            name, other
        ))),
    }
}

fn parse_env_duration(name: &str, value: &str) -> Result<Duration> {
    parse_positive_duration(name, value.trim())
}
