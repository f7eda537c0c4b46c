//! Runtime configuration.
//!
//! `Config` is built once at process start (`Config::from_env`) and injected
//! into the clients that need it. Nothing else in the crate touches the
//! environment, so a value observed at startup holds for the whole run.

use crate::ollama::{validate_base_url, validate_model_name};

/// Application-level constants
pub const APP_NAME: &str = "Anamnesis";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Default Ollama endpoint (local server, default port).
pub const DEFAULT_BASE_URL: &str = "http://localhost:11434";
/// Default model for tool-call extraction. Must support function calling.
pub const DEFAULT_EXTRACT_MODEL: &str = "llama3.1:8b";
/// Default model for narrative generation.
pub const DEFAULT_GENERATE_MODEL: &str = "llama3.1:8b";
/// Default per-request timeout. Local models on CPU can be slow.
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// Default `RUST_LOG` filter when the variable is unset.
pub fn default_log_filter() -> String {
    format!("{}=info", env!("CARGO_PKG_NAME"))
}

/// Immutable runtime configuration.
#[derive(Debug, Clone)]
pub struct Config {
    /// Base URL of the Ollama server. Localhost only.
    pub base_url: String,
    /// Model invoked for structured extraction.
    pub extract_model: String,
    /// Model invoked for synthetic-narrative generation.
    pub generate_model: String,
    /// HTTP request timeout in seconds.
    pub request_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            extract_model: DEFAULT_EXTRACT_MODEL.to_string(),
            generate_model: DEFAULT_GENERATE_MODEL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

/// Errors raised while loading configuration at startup.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid Ollama base URL: {0}")]
    InvalidBaseUrl(String),
    #[error("Invalid model name: {0}")]
    InvalidModelName(String),
    #[error("Invalid timeout value: {0}")]
    InvalidTimeout(String),
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Recognized variables, each optional:
    /// - `ANAMNESIS_OLLAMA_URL` — Ollama base URL (localhost only)
    /// - `ANAMNESIS_EXTRACT_MODEL` — extraction model name
    /// - `ANAMNESIS_GENERATE_MODEL` — generation model name
    /// - `ANAMNESIS_TIMEOUT_SECS` — request timeout in seconds
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a config from an arbitrary key lookup. `from_env` is the thin
    /// wrapper over this; tests inject closures instead of mutating the
    /// process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let base_url = lookup("ANAMNESIS_OLLAMA_URL").unwrap_or(defaults.base_url);
        if !validate_base_url(&base_url) {
            return Err(ConfigError::InvalidBaseUrl(base_url));
        }

        let extract_model =
            lookup("ANAMNESIS_EXTRACT_MODEL").unwrap_or(defaults.extract_model);
        if !validate_model_name(&extract_model) {
            return Err(ConfigError::InvalidModelName(extract_model));
        }

        let generate_model =
            lookup("ANAMNESIS_GENERATE_MODEL").unwrap_or(defaults.generate_model);
        if !validate_model_name(&generate_model) {
            return Err(ConfigError::InvalidModelName(generate_model));
        }

        let request_timeout_secs = match lookup("ANAMNESIS_TIMEOUT_SECS") {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidTimeout(raw))?,
            None => defaults.request_timeout_secs,
        };

        Ok(Self {
            base_url,
            extract_model,
            generate_model,
            request_timeout_secs,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn empty_lookup(_key: &str) -> Option<String> {
        None
    }

    #[test]
    fn defaults_when_nothing_set() {
        let config = Config::from_lookup(empty_lookup).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.extract_model, DEFAULT_EXTRACT_MODEL);
        assert_eq!(config.generate_model, DEFAULT_GENERATE_MODEL);
        assert_eq!(config.request_timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn overrides_are_picked_up() {
        let config = Config::from_lookup(|key| match key {
            "ANAMNESIS_OLLAMA_URL" => Some("http://127.0.0.1:11434/".to_string()),
            "ANAMNESIS_EXTRACT_MODEL" => Some("qwen2.5:7b".to_string()),
            "ANAMNESIS_TIMEOUT_SECS" => Some("60".to_string()),
            _ => None,
        })
        .unwrap();
        assert_eq!(config.base_url, "http://127.0.0.1:11434/");
        assert_eq!(config.extract_model, "qwen2.5:7b");
        assert_eq!(config.generate_model, DEFAULT_GENERATE_MODEL);
        assert_eq!(config.request_timeout_secs, 60);
    }

    #[test]
    fn remote_url_rejected() {
        let result = Config::from_lookup(|key| match key {
            "ANAMNESIS_OLLAMA_URL" => Some("http://example.com:11434".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(ConfigError::InvalidBaseUrl(_))));
    }

    #[test]
    fn bad_model_name_rejected() {
        let result = Config::from_lookup(|key| match key {
            "ANAMNESIS_EXTRACT_MODEL" => Some("model; rm -rf /".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(ConfigError::InvalidModelName(_))));
    }

    #[test]
    fn non_numeric_timeout_rejected() {
        let result = Config::from_lookup(|key| match key {
            "ANAMNESIS_TIMEOUT_SECS" => Some("soon".to_string()),
            _ => None,
        });
        assert!(matches!(result, Err(ConfigError::InvalidTimeout(_))));
    }

    #[test]
    fn default_log_filter_names_crate() {
        assert!(default_log_filter().starts_with("anamnesis="));
    }

    #[test]
    fn app_version_matches_cargo() {
        assert_eq!(APP_VERSION, env!("CARGO_PKG_VERSION"));
    }
}
