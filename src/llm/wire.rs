// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Wire types for the credential exchange and chat endpoints

use serde::{Deserialize, Serialize};

use crate::chat::options::SamplingParams;
use crate::conversation::Turn;

/// In-band error code meaning the access token has expired
pub const EXPIRED_TOKEN_CODE: i64 = 111;

/// Error description the authority returns for an unknown API key
pub const UNKNOWN_CLIENT_ID: &str = "unknown client id";

/// Reply from the credential exchange endpoint
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: Option<String>,
    /// Lifetime of the token in seconds
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Body of a streamed chat request
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    pub messages: Vec<Turn>,
    pub stream: bool,
    pub temperature: f64,
    pub top_p: f64,
    pub penalty_score: f64,
    pub user_id: String,
}

impl ChatRequest {
    pub fn new(messages: Vec<Turn>, params: &SamplingParams, user_id: impl Into<String>) -> Self {
        Self {
            messages,
            stream: true,
            temperature: params.temperature,
            top_p: params.top_p,
            penalty_score: params.penalty_score,
            user_id: user_id.into(),
        }
    }
}

/// One decoded line of the chat stream
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StreamRecord {
    #[serde(default)]
    pub error_code: Option<i64>,
    #[serde(default)]
    pub error_msg: Option<String>,
    #[serde(default)]
    pub is_end: bool,
    /// 0 for the first fragment of a turn
    #[serde(default)]
    pub sentence_id: Option<i64>,
    #[serde(default)]
    pub result: Option<String>,
}

impl StreamRecord {
    pub fn is_first_sentence(&self) -> bool {
        self.sentence_id == Some(0)
    }
}
