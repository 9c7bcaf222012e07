// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Remote service plumbing
//!
//! Engine lookup, credential lifecycle, admission control and the streaming
//! request engine.

pub mod auth;
pub mod engine;
pub mod rate_limit;
pub mod streaming;
pub mod wire;

pub use auth::{Credential, CredentialManager};
pub use engine::Engine;
pub use rate_limit::{IntervalRateLimiter, RateLimiter, Unlimited};
pub use streaming::{FragmentStream, StreamingRequestEngine};
