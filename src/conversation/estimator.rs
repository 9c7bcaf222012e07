// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Offline token estimation
//!
//! Approximates the service's own token accounting without a round trip:
//! every Han ideograph costs 1 token and every other word costs 1.3 tokens.
//! The estimate is intentionally simple and errs on the heavy side for
//! Latin text.

use regex::Regex;
use std::sync::LazyLock;

/// Runs of punctuation, whitespace and combining marks; these separate words
static NON_WORD: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\W\p{M}]+").unwrap());

/// Weights are kept in tenths of a token so the sum is exact
const HANZI_WEIGHT_TENTHS: usize = 10;
const WORD_WEIGHT_TENTHS: usize = 13;

/// Whether `c` is a CJK unified ideograph in the basic block
pub fn is_hanzi(c: char) -> bool {
    ('\u{4e00}'..='\u{9fa5}').contains(&c)
}

/// Estimate the token cost of `text`.
///
/// Text is split on non-word runs; each word is then split into single
/// ideographs and the non-ideograph runs between them. Each non-empty piece
/// contributes its weight and the total is floored.
pub fn estimate(text: &str) -> usize {
    let tenths: usize = NON_WORD.split(text).map(word_weight_tenths).sum();
    tenths / 10
}

fn word_weight_tenths(word: &str) -> usize {
    let mut total = 0;
    let mut run_start: Option<usize> = None;

    for (idx, c) in word.char_indices() {
        if is_hanzi(c) {
            if let Some(start) = run_start.take() {
                total += run_weight_tenths(&word[start..idx]);
            }
            total += HANZI_WEIGHT_TENTHS;
        } else if run_start.is_none() {
            run_start = Some(idx);
        }
    }
    if let Some(start) = run_start {
        total += run_weight_tenths(&word[start..]);
    }

    total
}

fn run_weight_tenths(run: &str) -> usize {
    if run.trim().is_empty() {
        0
    } else {
        WORD_WEIGHT_TENTHS
    }
}
