// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Settings management
//!
//! Handles loading and saving settings from ~/.wenxin/settings.toml

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::chat::options::{
    RequestConfig, DEFAULT_PENALTY_SCORE, DEFAULT_TEMPERATURE, DEFAULT_TOKEN_LIMIT, DEFAULT_TOP_P,
};
use crate::llm::engine::{Engine, CHAT_BASE_URL, OAUTH_URL};

mod io;
mod validation;

/// Main settings structure, stored in ~/.wenxin/settings.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Engine name, e.g. "ERNIE-Bot-turbo"
    #[serde(default = "default_engine")]
    pub engine: String,

    /// API key / secret key pair
    #[serde(default)]
    pub credentials: CredentialsConfig,

    /// Sampling defaults and token limits
    #[serde(default)]
    pub request: RequestDefaults,

    /// Remote endpoints
    #[serde(default)]
    pub endpoints: EndpointsConfig,

    /// Outbound request admission
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Expired-credential retry policy
    #[serde(default)]
    pub retry: RetryConfig,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            engine: default_engine(),
            credentials: CredentialsConfig::default(),
            request: RequestDefaults::default(),
            endpoints: EndpointsConfig::default(),
            rate_limit: RateLimitConfig::default(),
            retry: RetryConfig::default(),
        }
    }
}

/// Credentials; environment variables take priority over the file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CredentialsConfig {
    /// API key (prefer the env var)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Secret key (prefer the env var)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secret_key: Option<String>,

    /// Environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Environment variable holding the secret key
    #[serde(default = "default_secret_key_env")]
    pub secret_key_env: String,
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            secret_key: None,
            api_key_env: default_api_key_env(),
            secret_key_env: default_secret_key_env(),
        }
    }
}

/// Per-client request defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestDefaults {
    #[serde(default = "default_temperature")]
    pub temperature: f64,

    #[serde(default = "default_top_p")]
    pub top_p: f64,

    #[serde(default = "default_penalty_score")]
    pub penalty_score: f64,

    /// Request timeout in seconds; absent means no timeout
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<f64>,

    /// Ceiling on a single message's estimated tokens
    #[serde(default = "default_token_limit")]
    pub max_tokens: usize,

    /// Ceiling on a session's estimated tokens
    #[serde(default = "default_token_limit")]
    pub truncate_limit: usize,
}

impl Default for RequestDefaults {
    fn default() -> Self {
        Self {
            temperature: default_temperature(),
            top_p: default_top_p(),
            penalty_score: default_penalty_score(),
            timeout_secs: None,
            max_tokens: default_token_limit(),
            truncate_limit: default_token_limit(),
        }
    }
}

impl RequestDefaults {
    /// Convert to the runtime request configuration
    pub fn to_request_config(&self) -> RequestConfig {
        RequestConfig {
            temperature: self.temperature,
            top_p: self.top_p,
            penalty_score: self.penalty_score,
            timeout: self
                .timeout_secs
                .filter(|secs| secs.is_finite() && *secs > 0.0)
                .map(Duration::from_secs_f64),
            max_tokens: self.max_tokens,
            truncate_limit: self.truncate_limit,
        }
    }
}

/// Remote endpoints, overridable for proxies and tests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EndpointsConfig {
    #[serde(default = "default_oauth_url")]
    pub oauth_url: String,

    /// Chat URL prefix; the engine's path segment is appended
    #[serde(default = "default_chat_base_url")]
    pub chat_base_url: String,
}

impl Default for EndpointsConfig {
    fn default() -> Self {
        Self {
            oauth_url: default_oauth_url(),
            chat_base_url: default_chat_base_url(),
        }
    }
}

/// Admission control settings
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RateLimitConfig {
    /// Dedicated interval for this client in milliseconds (0 disables limiting).
    /// When absent the process-wide one-request-per-second gate is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_ms: Option<u64>,
}

/// Expired-credential retry settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Forced credential refreshes allowed per request
    #[serde(default = "default_max_token_refreshes")]
    pub max_token_refreshes: u32,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_token_refreshes: default_max_token_refreshes(),
        }
    }
}

fn default_engine() -> String {
    Engine::default().name().to_string()
}

fn default_api_key_env() -> String {
    "WENXIN_API_KEY".to_string()
}

fn default_secret_key_env() -> String {
    "WENXIN_SECRET_KEY".to_string()
}

fn default_temperature() -> f64 {
    DEFAULT_TEMPERATURE
}

fn default_top_p() -> f64 {
    DEFAULT_TOP_P
}

fn default_penalty_score() -> f64 {
    DEFAULT_PENALTY_SCORE
}

fn default_token_limit() -> usize {
    DEFAULT_TOKEN_LIMIT
}

fn default_oauth_url() -> String {
    OAUTH_URL.to_string()
}

fn default_chat_base_url() -> String {
    CHAT_BASE_URL.to_string()
}

pub(crate) fn default_max_token_refreshes() -> u32 {
    1
}
