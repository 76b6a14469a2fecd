//! Configuration management

use crate::error::{AssistantError, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

const DEFAULT_TEMPERATURE: f32 = 0.7;
const DEFAULT_MAX_TOKENS: u32 = 1000;

/// LLM service configuration for external inference
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LlmServiceConfig {
    /// Base URL of the LLM service for chat completions
    pub url: String,

    /// Model name; empty string means the provider default
    #[serde(default)]
    pub model: String,

    /// Sampling temperature, clamped to [0, 2]
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Per-response token budget, clamped to [1, 4096]
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// API key; required, there is no anonymous mode
    pub api_key: String,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
}

fn default_temperature() -> f32 {
    DEFAULT_TEMPERATURE
}

fn default_max_tokens() -> u32 {
    DEFAULT_MAX_TOKENS
}

fn default_timeout() -> u64 {
    30
}

impl LlmServiceConfig {
    /// Build from environment-style key/value input.
    ///
    /// Recognized keys: `ASSISTANT_LLM_URL`, `ASSISTANT_LLM_MODEL`,
    /// `ASSISTANT_LLM_API_KEY`, `ASSISTANT_LLM_TEMPERATURE`,
    /// `ASSISTANT_LLM_MAX_TOKENS`, `ASSISTANT_LLM_TIMEOUT_SECS`.
    ///
    /// Invalid numeric values fall back to defaults with a logged warning.
    /// A missing API key is a hard failure: the surrounding application must
    /// not start the assistant without credentials.
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self> {
        let api_key = vars
            .get("ASSISTANT_LLM_API_KEY")
            .filter(|k| !k.trim().is_empty())
            .cloned()
            .ok_or_else(|| {
                AssistantError::Config("ASSISTANT_LLM_API_KEY is required".to_string())
            })?;

        let url = vars
            .get("ASSISTANT_LLM_URL")
            .cloned()
            .unwrap_or_else(|| "https://api.openai.com".to_string());

        let model = vars.get("ASSISTANT_LLM_MODEL").cloned().unwrap_or_default();

        let temperature = parse_clamped(
            vars.get("ASSISTANT_LLM_TEMPERATURE"),
            "ASSISTANT_LLM_TEMPERATURE",
            DEFAULT_TEMPERATURE,
            0.0..=2.0,
        );

        let max_tokens = parse_clamped(
            vars.get("ASSISTANT_LLM_MAX_TOKENS"),
            "ASSISTANT_LLM_MAX_TOKENS",
            DEFAULT_MAX_TOKENS,
            1..=4096,
        );

        let timeout_secs = parse_clamped(
            vars.get("ASSISTANT_LLM_TIMEOUT_SECS"),
            "ASSISTANT_LLM_TIMEOUT_SECS",
            default_timeout(),
            1..=600,
        );

        Ok(Self {
            url,
            model,
            temperature,
            max_tokens,
            api_key,
            timeout_secs,
        })
    }

    /// Build from the process environment
    pub fn from_env() -> Result<Self> {
        let vars: HashMap<String, String> = std::env::vars().collect();
        Self::from_vars(&vars)
    }
}

fn parse_clamped<T>(
    raw: Option<&String>,
    key: &str,
    default: T,
    range: std::ops::RangeInclusive<T>,
) -> T
where
    T: std::str::FromStr + PartialOrd + Copy + std::fmt::Display,
{
    let Some(raw) = raw else {
        return default;
    };
    match raw.parse::<T>() {
        Ok(v) if range.contains(&v) => v,
        Ok(v) => {
            tracing::warn!("{} = {} out of range, using default {}", key, v, default);
            default
        }
        Err(_) => {
            tracing::warn!("{} = {:?} is not a number, using default {}", key, raw, default);
            default
        }
    }
}
