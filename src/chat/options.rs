// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Request configuration and per-call overrides

use std::time::Duration;

use crate::error::{ActionsError, Result};

/// Fallback for both the per-message ceiling and the session budget
pub const DEFAULT_TOKEN_LIMIT: usize = 2000;
pub const DEFAULT_TEMPERATURE: f64 = 0.95;
pub const DEFAULT_TOP_P: f64 = 0.8;
pub const DEFAULT_PENALTY_SCORE: f64 = 1.0;

/// Per-client request defaults
#[derive(Debug, Clone, PartialEq)]
pub struct RequestConfig {
    /// Randomness of the answer, in (0, 1]
    pub temperature: f64,
    /// Nucleus sampling mass, in [0, 1]
    pub top_p: f64,
    /// Repetition penalty, in [1, 2]
    pub penalty_score: f64,
    /// Whole-request timeout; `None` means no timeout
    pub timeout: Option<Duration>,
    /// Ceiling on a single message's estimated cost
    pub max_tokens: usize,
    /// Ceiling on a session's estimated cost after truncation
    pub truncate_limit: usize,
}

impl Default for RequestConfig {
    fn default() -> Self {
        Self {
            temperature: DEFAULT_TEMPERATURE,
            top_p: DEFAULT_TOP_P,
            penalty_score: DEFAULT_PENALTY_SCORE,
            timeout: None,
            max_tokens: DEFAULT_TOKEN_LIMIT,
            truncate_limit: DEFAULT_TOKEN_LIMIT,
        }
    }
}

impl RequestConfig {
    /// Replace zero limits with the defaults and check sampling ranges
    pub fn normalized(mut self) -> Result<Self> {
        if self.max_tokens == 0 {
            self.max_tokens = DEFAULT_TOKEN_LIMIT;
        }
        if self.truncate_limit == 0 {
            self.truncate_limit = DEFAULT_TOKEN_LIMIT;
        }
        validate_sampling(self.temperature, self.top_p, self.penalty_score)?;
        Ok(self)
    }

    /// Resolve the parameters for one call
    pub fn resolve(&self, overrides: &RequestOverrides) -> Result<SamplingParams> {
        let params = SamplingParams {
            temperature: overrides.temperature.unwrap_or(self.temperature),
            top_p: overrides.top_p.unwrap_or(self.top_p),
            penalty_score: overrides.penalty_score.unwrap_or(self.penalty_score),
            timeout: overrides.timeout.or(self.timeout),
        };
        validate_sampling(params.temperature, params.top_p, params.penalty_score)?;
        Ok(params)
    }
}

/// Tunables a single call may override
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestOverrides {
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub penalty_score: Option<f64>,
    pub timeout: Option<Duration>,
}

impl RequestOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.top_p = Some(top_p);
        self
    }

    pub fn with_penalty_score(mut self, penalty_score: f64) -> Self {
        self.penalty_score = Some(penalty_score);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Parameters actually sent with one request
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SamplingParams {
    pub temperature: f64,
    pub top_p: f64,
    pub penalty_score: f64,
    pub timeout: Option<Duration>,
}

fn validate_sampling(temperature: f64, top_p: f64, penalty_score: f64) -> Result<()> {
    if !(temperature > 0.0 && temperature <= 1.0) {
        return Err(ActionsError::InvalidParameter {
            name: "temperature",
            value: temperature,
            reason: "must be in (0, 1]",
        }
        .into());
    }
    if !(0.0..=1.0).contains(&top_p) {
        return Err(ActionsError::InvalidParameter {
            name: "top_p",
            value: top_p,
            reason: "must be in [0, 1]",
        }
        .into());
    }
    if !(1.0..=2.0).contains(&penalty_score) {
        return Err(ActionsError::InvalidParameter {
            name: "penalty_score",
            value: penalty_score,
            reason: "must be in [1, 2]",
        }
        .into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::WenxinError;

    #[test]
    fn test_defaults() {
        let config = RequestConfig::default();
        assert_eq!(config.max_tokens, 2000);
        assert_eq!(config.truncate_limit, 2000);
        assert!((config.temperature - 0.95).abs() < f64::EPSILON);
        assert!((config.top_p - 0.8).abs() < f64::EPSILON);
        assert!(config.timeout.is_none());
    }

    #[test]
    fn test_normalized_fills_zero_limits() {
        let config = RequestConfig {
            max_tokens: 0,
            truncate_limit: 0,
            ..Default::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(config.max_tokens, DEFAULT_TOKEN_LIMIT);
        assert_eq!(config.truncate_limit, DEFAULT_TOKEN_LIMIT);
    }

    #[test]
    fn test_normalized_rejects_bad_temperature() {
        let err = RequestConfig {
            temperature: 0.0,
            ..Default::default()
        }
        .normalized()
        .unwrap_err();
        assert!(matches!(
            err,
            WenxinError::Actions(ActionsError::InvalidParameter {
                name: "temperature",
                ..
            })
        ));
    }

    #[test]
    fn test_resolve_applies_overrides() {
        let config = RequestConfig::default();
        let overrides = RequestOverrides::new()
            .with_temperature(0.5)
            .with_timeout(Duration::from_secs(3));

        let params = config.resolve(&overrides).unwrap();
        assert!((params.temperature - 0.5).abs() < f64::EPSILON);
        assert!((params.top_p - 0.8).abs() < f64::EPSILON);
        assert!((params.penalty_score - 1.0).abs() < f64::EPSILON);
        assert_eq!(params.timeout, Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_resolve_validates_overrides() {
        let config = RequestConfig::default();
        assert!(config
            .resolve(&RequestOverrides::new().with_top_p(1.5))
            .is_err());
        assert!(config
            .resolve(&RequestOverrides::new().with_penalty_score(0.5))
            .is_err());
        assert!(config
            .resolve(&RequestOverrides::new().with_temperature(f64::NAN))
            .is_err());
    }
}
