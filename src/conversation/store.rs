// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! In-memory session histories
//!
//! Maps session ids to chronological turn lists. Every append is checked
//! against the per-message ceiling before the history is touched, and
//! truncation drops the oldest turns until the session fits its budget.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use crate::conversation::estimator::estimate;
use crate::error::{ActionsError, Result};

/// Role of the turn's author
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// Prompt from the caller
    User,
    /// Answer from the model
    Assistant,
}

/// One message in a session history
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    /// Estimated token cost of this turn's content
    pub fn cost(&self) -> usize {
        estimate(&self.content)
    }
}

/// Session id to history mapping shared by all callers of one client
#[derive(Debug)]
pub struct ConversationStore {
    sessions: Mutex<HashMap<String, Vec<Turn>>>,
    /// Ceiling for a single message
    max_tokens: usize,
    /// Ceiling for a whole session after truncation
    truncate_limit: usize,
}

impl ConversationStore {
    pub fn new(max_tokens: usize, truncate_limit: usize) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            max_tokens,
            truncate_limit,
        }
    }

    pub fn max_tokens(&self) -> usize {
        self.max_tokens
    }

    pub fn truncate_limit(&self) -> usize {
        self.truncate_limit
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Vec<Turn>>> {
        match self.sessions.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                tracing::warn!("Conversation store lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Append a turn, creating the session on first use.
    ///
    /// Fails with `BudgetExceeded` when the message alone costs more than
    /// `max_tokens`; the history is left untouched in that case.
    pub fn append(&self, session_id: &str, role: Role, content: impl Into<String>) -> Result<()> {
        let content = content.into();
        let cost = estimate(&content);
        if cost > self.max_tokens {
            return Err(ActionsError::BudgetExceeded {
                cost,
                limit: self.max_tokens,
            }
            .into());
        }

        self.lock()
            .entry(session_id.to_string())
            .or_default()
            .push(Turn { role, content });
        Ok(())
    }

    /// Drop the oldest turns until the session fits `truncate_limit`.
    ///
    /// The newest turn is always kept, even when it alone is over the limit.
    /// Returns the number of turns removed.
    pub fn truncate(&self, session_id: &str) -> usize {
        let mut sessions = self.lock();
        let Some(turns) = sessions.get_mut(session_id) else {
            return 0;
        };

        let mut total: usize = turns.iter().map(Turn::cost).sum();
        let mut drop_count = 0;
        while total > self.truncate_limit && turns.len() - drop_count > 1 {
            total -= turns[drop_count].cost();
            drop_count += 1;
        }

        if drop_count > 0 {
            turns.drain(..drop_count);
            tracing::warn!(
                session_id,
                removed = drop_count,
                remaining_tokens = total,
                "Truncated conversation history"
            );
        }
        drop_count
    }

    /// Replace the session's history with an empty one
    pub fn reset(&self, session_id: &str) {
        self.lock().insert(session_id.to_string(), Vec::new());
    }

    /// Sum of estimated costs over the session; unseen sessions cost 0
    pub fn total_cost(&self, session_id: &str) -> usize {
        self.lock()
            .get(session_id)
            .map(|turns| turns.iter().map(Turn::cost).sum())
            .unwrap_or(0)
    }

    /// Snapshot of the session's turns in chronological order
    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        self.lock().get(session_id).cloned().unwrap_or_default()
    }

    /// Ids of every session created so far
    pub fn session_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.lock().keys().cloned().collect();
        ids.sort();
        ids
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_creates_session() {
        let store = ConversationStore::new(2000, 2000);
        store.append("alice", Role::User, "你好").unwrap();

        let history = store.history("alice");
        assert_eq!(history, vec![Turn::user("你好")]);
        assert_eq!(store.session_ids(), vec!["alice".to_string()]);
    }

    #[test]
    fn test_append_preserves_order() {
        let store = ConversationStore::new(2000, 2000);
        store.append("s", Role::User, "one").unwrap();
        store.append("s", Role::Assistant, "two").unwrap();
        store.append("s", Role::User, "three").unwrap();

        let contents: Vec<String> = store.history("s").into_iter().map(|t| t.content).collect();
        assert_eq!(contents, vec!["one", "two", "three"]);
    }

    #[test]
    fn test_append_over_budget_leaves_history_unchanged() {
        let store = ConversationStore::new(2, 2000);
        store.append("s", Role::User, "你好").unwrap();

        let err = store.append("s", Role::User, "你好呀").unwrap_err();
        assert!(err.is_budget_exceeded());
        assert_eq!(store.history("s"), vec![Turn::user("你好")]);
    }

    #[test]
    fn test_append_over_budget_does_not_create_session() {
        let store = ConversationStore::new(1, 2000);
        assert!(store.append("new", Role::User, "你好").is_err());
        assert!(store.session_ids().is_empty());
    }

    #[test]
    fn test_truncate_drops_oldest() {
        let store = ConversationStore::new(2000, 5);
        store.append("s", Role::User, "一二三").unwrap();
        store.append("s", Role::Assistant, "四五").unwrap();
        store.append("s", Role::User, "六七").unwrap();
        assert_eq!(store.total_cost("s"), 7);

        let removed = store.truncate("s");
        assert_eq!(removed, 1);
        assert_eq!(store.total_cost("s"), 4);
        assert_eq!(store.history("s")[0], Turn::assistant("四五"));
    }

    #[test]
    fn test_truncate_keeps_last_turn_even_over_limit() {
        let store = ConversationStore::new(2000, 2);
        store.append("s", Role::User, "一").unwrap();
        store.append("s", Role::User, "一二三四五").unwrap();

        store.truncate("s");
        assert_eq!(store.history("s"), vec![Turn::user("一二三四五")]);
        assert_eq!(store.total_cost("s"), 5);
    }

    #[test]
    fn test_truncate_within_limit_is_noop() {
        let store = ConversationStore::new(2000, 2000);
        store.append("s", Role::User, "hello").unwrap();
        assert_eq!(store.truncate("s"), 0);
        assert_eq!(store.truncate("missing"), 0);
    }

    #[test]
    fn test_reset_then_count_is_zero() {
        let store = ConversationStore::new(2000, 2000);
        store.append("s", Role::User, "你好").unwrap();
        store.reset("s");
        assert_eq!(store.total_cost("s"), 0);
        assert!(store.history("s").is_empty());

        store.reset("never-seen");
        assert_eq!(store.total_cost("never-seen"), 0);
    }

    #[test]
    fn test_total_cost_of_unseen_session() {
        let store = ConversationStore::new(2000, 2000);
        assert_eq!(store.total_cost("ghost"), 0);
    }

    #[test]
    fn test_turn_serializes_for_wire() {
        let json = serde_json::to_value(Turn::assistant("hi")).unwrap();
        assert_eq!(json, serde_json::json!({"role": "assistant", "content": "hi"}));
    }

    #[test]
    fn test_truncation_invariant_holds_after_each_append() {
        let store = ConversationStore::new(2000, 10);
        for text in ["一二三", "四五六七", "八九", "十", "一二三四五六七八九十一", "好"] {
            store.append("s", Role::User, text).unwrap();
            store.truncate("s");
            let history = store.history("s");
            assert!(store.total_cost("s") <= 10 || history.len() == 1);
        }
    }
}
