// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! wenxin - multi-session streaming client for the WenXin (ERNIE) chat API.
//!
//! Architecture:
//! - `conversation`: token estimation and per-session histories with truncation
//! - `llm`: engine table, credential lifecycle, admission control, streamed requests
//! - `chat`: the `ChatBot` session engine tying the above together
//! - `config`: settings file and environment handling
//! - `cli`: argument parsing for the `wenxin` binary

pub mod chat;
pub mod cli;
pub mod config;
pub mod conversation;
pub mod error;
pub mod llm;

pub use chat::{ChatBot, ChatBotBuilder, RequestConfig, RequestOverrides};
pub use error::{ActionsError, AuthError, Result, WenxinError};
