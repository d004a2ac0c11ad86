//! Configuration management for the Atende gateway

use std::time::Duration;

use crate::db::DEFAULT_HISTORY_LIMIT;
use crate::{Error, Result};

/// Runtime settings, read from the environment with sensible defaults
#[derive(Debug, Clone)]
pub struct Config {
    /// Messaging provider base URL (`ATENDE_PROVIDER_URL`)
    pub provider_url: String,

    /// Global provider API key sent as the `apikey` header (`ATENDE_PROVIDER_API_KEY`)
    pub provider_api_key: String,

    /// LLM API base URL for completions and speech-to-text (`ATENDE_LLM_URL`)
    pub llm_url: String,

    /// Chat-completion model identifier (`ATENDE_CHAT_MODEL`)
    pub chat_model: String,

    /// Speech-to-text model identifier (`ATENDE_STT_MODEL`)
    pub stt_model: String,

    /// Language hint passed to speech-to-text (`ATENDE_STT_LANGUAGE`)
    pub stt_language: String,

    /// Completion sampling temperature (`ATENDE_TEMPERATURE`)
    pub temperature: f64,

    /// Completion response-length cap (`ATENDE_MAX_TOKENS`)
    pub max_tokens: u32,

    /// Provider-side typing delay on sends, milliseconds (`ATENDE_SEND_DELAY_MS`)
    pub send_delay_ms: u32,

    /// Timeout for provider calls (`ATENDE_PROVIDER_TIMEOUT_SECS`)
    pub provider_timeout: Duration,

    /// Timeout for LLM calls (`ATENDE_LLM_TIMEOUT_SECS`)
    pub llm_timeout: Duration,

    /// Prior turns handed to the assistant (`ATENDE_HISTORY_LIMIT`)
    pub history_limit: usize,
}

impl Config {
    /// Load configuration from the environment
    ///
    /// # Errors
    ///
    /// Returns error if a numeric variable cannot be parsed
    pub fn load() -> Result<Self> {
        Ok(Self {
            provider_url: env_or("ATENDE_PROVIDER_URL", "http://localhost:8080"),
            provider_api_key: env_or("ATENDE_PROVIDER_API_KEY", ""),
            llm_url: env_or("ATENDE_LLM_URL", "https://api.openai.com/v1"),
            chat_model: env_or("ATENDE_CHAT_MODEL", "gpt-4o-mini"),
            stt_model: env_or("ATENDE_STT_MODEL", "whisper-1"),
            stt_language: env_or("ATENDE_STT_LANGUAGE", "pt"),
            temperature: env_parsed("ATENDE_TEMPERATURE", 0.7)?,
            max_tokens: env_parsed("ATENDE_MAX_TOKENS", 300)?,
            send_delay_ms: env_parsed("ATENDE_SEND_DELAY_MS", 1200)?,
            provider_timeout: Duration::from_secs(env_parsed(
                "ATENDE_PROVIDER_TIMEOUT_SECS",
                15,
            )?),
            llm_timeout: Duration::from_secs(env_parsed("ATENDE_LLM_TIMEOUT_SECS", 30)?),
            history_limit: env_parsed("ATENDE_HISTORY_LIMIT", DEFAULT_HISTORY_LIMIT)?,
        })
    }
}

fn env_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_parsed<T: std::str::FromStr>(key: &str, default: T) -> Result<T> {
    match std::env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| Error::Config(format!("invalid value for {key}: {value}"))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Config::load().unwrap();

        assert_eq!(config.stt_language, "pt");
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
        assert_eq!(config.provider_timeout, Duration::from_secs(15));
        assert!(config.temperature > 0.0);
    }

    #[test]
    fn test_invalid_numeric_rejected() {
        assert!(env_parsed::<u32>("PATH", 1).is_err());
    }
}
