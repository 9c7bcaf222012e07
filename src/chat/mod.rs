// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Chat client
//!
//! The public session engine and its request options.

pub mod client;
pub mod options;

pub use client::{ChatBot, ChatBotBuilder, DEFAULT_SESSION};
pub use options::{RequestConfig, RequestOverrides, SamplingParams};
