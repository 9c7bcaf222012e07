// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Engine table
//!
//! Maps the public engine names onto the chat endpoint path segment.
//! Unknown names fail at construction time.

use std::fmt;
use std::str::FromStr;

use crate::error::{ActionsError, WenxinError};

/// Credential exchange endpoint
pub const OAUTH_URL: &str = "https://aip.baidubce.com/oauth/2.0/token";

/// Prefix of every chat endpoint; the engine's path segment is appended
pub const CHAT_BASE_URL: &str = "https://aip.baidubce.com/rpc/2.0/ai_custom/v1/wenxinworkshop/chat";

/// Supported chat engines
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Engine {
    ErnieBot,
    #[default]
    ErnieBotTurbo,
    Bloomz7b,
}

impl Engine {
    pub const ALL: [Engine; 3] = [Engine::ErnieBot, Engine::ErnieBotTurbo, Engine::Bloomz7b];

    /// Public engine name, e.g. "ERNIE-Bot-turbo"
    pub fn name(self) -> &'static str {
        match self {
            Engine::ErnieBot => "ERNIE-Bot",
            Engine::ErnieBotTurbo => "ERNIE-Bot-turbo",
            Engine::Bloomz7b => "BLOOMZ-7B",
        }
    }

    /// Path segment of the chat endpoint
    pub fn endpoint(self) -> &'static str {
        match self {
            Engine::ErnieBot => "completions",
            Engine::ErnieBotTurbo => "eb-instant",
            Engine::Bloomz7b => "bloomz_7b1",
        }
    }

    /// Every accepted engine name
    pub fn supported() -> Vec<String> {
        Engine::ALL.iter().map(|e| e.name().to_string()).collect()
    }
}

impl FromStr for Engine {
    type Err = WenxinError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Engine::ALL
            .into_iter()
            .find(|engine| engine.name() == s)
            .ok_or_else(|| {
                ActionsError::UnsupportedEngine {
                    engine: s.to_string(),
                    supported: Engine::supported(),
                }
                .into()
            })
    }
}

impl fmt::Display for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
