// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Error types for the WenXin client
//!
//! This module defines all error types used throughout the crate.

use thiserror::Error;

/// Main error type for client operations
#[derive(Error, Debug)]
pub enum WenxinError {
    /// Invalid configuration or a rejected action (raised before any network call)
    #[error("Action error: {0}")]
    Actions(#[from] ActionsError),

    /// Credential exchange rejected the client id or secret
    #[error("Authentication error: {0}")]
    Authentication(#[from] AuthError),

    /// The chat endpoint answered with a non-success HTTP status
    #[error("API connection error: {status} {reason} {body}")]
    ApiConnection {
        status: u16,
        reason: String,
        body: String,
    },

    /// In-band error record from the chat endpoint
    #[error("Response error: {code} {message}")]
    Response { code: i64, message: String },

    /// The credential kept expiring after forced refreshes
    #[error("Credential still expired after {attempts} refresh attempt(s)")]
    RetryExhausted { attempts: u32 },

    /// Malformed payload from the remote service
    #[error("Invalid API response: {0}")]
    InvalidResponse(String),

    /// Transport failure (connect, read, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing errors
    #[error("TOML error: {0}")]
    Toml(String),
}

/// Rejected actions: bad configuration or an over-budget message
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ActionsError {
    /// Engine name not present in the endpoint table
    #[error("engine {engine} is not supported, choose one of {supported:?}")]
    UnsupportedEngine {
        engine: String,
        supported: Vec<String>,
    },

    /// A single message costs more than the per-message ceiling
    #[error("message costs {cost} tokens, exceeding the limit of {limit}")]
    BudgetExceeded { cost: usize, limit: usize },

    /// Sampling parameter outside the range the service accepts
    #[error("{name} = {value} is invalid: {reason}")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        reason: &'static str,
    },
}

/// Credential exchange failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// The authority does not recognise the API key
    #[error("invalid API key (unknown client id)")]
    InvalidClientId,

    /// Any other authority error is attributed to the secret key
    #[error("invalid secret key: {description}")]
    InvalidSecret { description: String },
}

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, WenxinError>;

impl WenxinError {
    /// Whether this error is a per-message budget rejection
    pub fn is_budget_exceeded(&self) -> bool {
        matches!(
            self,
            WenxinError::Actions(ActionsError::BudgetExceeded { .. })
        )
    }

    /// Whether this error came from the credential exchange
    pub fn is_authentication(&self) -> bool {
        matches!(self, WenxinError::Authentication(_))
    }
}

impl From<toml::de::Error> for WenxinError {
    fn from(err: toml::de::Error) -> Self {
        WenxinError::Toml(err.to_string())
    }
}

impl From<toml::ser::Error> for WenxinError {
    fn from(err: toml::ser::Error) -> Self {
        WenxinError::Toml(err.to_string())
    }
}

impl From<reqwest::Error> for WenxinError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            WenxinError::Network(format!("request timed out: {err}"))
        } else {
            WenxinError::Network(err.to_string())
        }
    }
}
