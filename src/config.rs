//! Process configuration read from the environment.

use crate::core::warmup::{ProbePolicy, WarmupPolicy};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("{0} environment variable not set")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub ollama_url: String,
    /// `false` only when `OLLAMA_ENABLED` is literally `false`.
    pub ollama_enabled: bool,
    pub port: u16,
    pub chat_title: String,
    pub region: String,
    pub role: String,
    pub warmup: WarmupPolicy,
}

impl AppConfig {
    /// Reads the configuration from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let ollama_url = lookup("OLLAMA_URL")
            .filter(|url| !url.is_empty())
            .ok_or(ConfigError::Missing("OLLAMA_URL"))?;

        let defaults = WarmupPolicy::default();
        let warmup = WarmupPolicy {
            max_retries: parse_or(&lookup, "WARMUP_MAX_RETRIES", defaults.max_retries)?,
            retry_delay: secs_or(&lookup, "WARMUP_RETRY_DELAY_SECS", defaults.retry_delay)?,
            probe: ProbePolicy {
                attempts: parse_or(&lookup, "PROBE_MAX_ATTEMPTS", defaults.probe.attempts)?,
                timeout: secs_or(&lookup, "PROBE_TIMEOUT_SECS", defaults.probe.timeout)?,
                delay: secs_or(&lookup, "PROBE_RETRY_DELAY_SECS", defaults.probe.delay)?,
                prompt: defaults.probe.prompt,
            },
        };

        Ok(AppConfig {
            ollama_url,
            ollama_enabled: lookup("OLLAMA_ENABLED").as_deref() != Some("false"),
            port: parse_or(&lookup, "PORT", 8080)?,
            chat_title: lookup("CHAT_TITLE").unwrap_or_default(),
            region: non_empty_or_unknown(lookup("REGION")),
            role: non_empty_or_unknown(lookup("ROLE")),
            warmup,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        None => Ok(default),
        Some(value) if value.is_empty() => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
    }
}

fn secs_or<F>(lookup: &F, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    parse_or(lookup, key, default.as_secs()).map(Duration::from_secs)
}

fn non_empty_or_unknown(value: Option<String>) -> String {
    value
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| "unknown".to_owned())
}
