// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

use crate::error::{Result, WenxinError};
use crate::llm::engine::Engine;

use super::Settings;

impl Settings {
    /// Get the API key, checking the env var first.
    pub fn get_api_key(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.credentials.api_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.credentials.api_key.clone())
    }

    /// Get the secret key, checking the env var first.
    pub fn get_secret_key(&self) -> Option<String> {
        // Priority: env var > config file.
        std::env::var(&self.credentials.secret_key_env)
            .ok()
            .filter(|key| !key.is_empty())
            .or_else(|| self.credentials.secret_key.clone())
    }

    /// Both keys, or a configuration error naming the missing one.
    pub fn require_credentials(&self) -> Result<(String, String)> {
        let api_key = self.get_api_key().ok_or_else(|| {
            WenxinError::Config(format!(
                "No API key found. Set {} or credentials.api_key in the settings file.",
                self.credentials.api_key_env
            ))
        })?;
        let secret_key = self.get_secret_key().ok_or_else(|| {
            WenxinError::Config(format!(
                "No secret key found. Set {} or credentials.secret_key in the settings file.",
                self.credentials.secret_key_env
            ))
        })?;
        Ok((api_key, secret_key))
    }

    /// Check the engine name and request defaults without touching the network.
    pub fn validate(&self) -> Result<()> {
        self.engine.parse::<Engine>()?;
        self.request.to_request_config().normalized()?;
        Ok(())
    }
}
