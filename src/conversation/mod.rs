// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Conversation state: token estimation and per-session histories

pub mod estimator;
pub mod store;

pub use estimator::estimate;
pub use store::{ConversationStore, Role, Turn};
