// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Access token lifecycle
//!
//! Exchanges the API key / secret key pair for a bearer token, caches it,
//! and replaces it wholesale when a refresh is forced.

use reqwest::header::{ACCEPT, CONTENT_TYPE};
use reqwest::Client;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, RwLock};

use crate::error::{AuthError, Result, WenxinError};
use crate::llm::wire::{TokenResponse, UNKNOWN_CLIENT_ID};

/// A cached bearer token
#[derive(Debug, Clone)]
pub struct Credential {
    pub token: String,
    pub obtained_at: Instant,
    /// Set when the authority reported a lifetime
    pub expires_at: Option<Instant>,
}

impl Credential {
    pub fn is_expired(&self) -> bool {
        self.expires_at.is_some_and(|at| Instant::now() >= at)
    }
}

/// Owns the single shared credential of a client
pub struct CredentialManager {
    client: Client,
    oauth_url: String,
    api_key: String,
    secret_key: String,
    cached: RwLock<Option<Credential>>,
    /// Serializes exchanges so lazy callers share one fetch
    exchange_lock: Mutex<()>,
    forced_refreshes: AtomicU64,
    exchanges: AtomicU64,
}

impl CredentialManager {
    pub fn new(
        client: Client,
        oauth_url: impl Into<String>,
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
    ) -> Self {
        Self {
            client,
            oauth_url: oauth_url.into(),
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            cached: RwLock::new(None),
            exchange_lock: Mutex::new(()),
            forced_refreshes: AtomicU64::new(0),
            exchanges: AtomicU64::new(0),
        }
    }

    /// Return the cached token, exchanging credentials first when the cache
    /// is empty, expired, or `force_refresh` is set.
    pub async fn get_token(&self, force_refresh: bool) -> Result<String> {
        if force_refresh {
            self.forced_refreshes.fetch_add(1, Ordering::Relaxed);
        } else if let Some(token) = self.cached_token().await {
            return Ok(token);
        }

        let _guard = self.exchange_lock.lock().await;
        if !force_refresh {
            // Another caller may have finished an exchange while we waited
            if let Some(token) = self.cached_token().await {
                return Ok(token);
            }
        }

        let credential = self.exchange().await?;
        let token = credential.token.clone();
        *self.cached.write().await = Some(credential);
        Ok(token)
    }

    /// The current token, if one is cached and still valid
    pub async fn cached_token(&self) -> Option<String> {
        self.cached
            .read()
            .await
            .as_ref()
            .filter(|credential| !credential.is_expired())
            .map(|credential| credential.token.clone())
    }

    /// Number of refreshes requested with `force_refresh`
    pub fn forced_refresh_count(&self) -> u64 {
        self.forced_refreshes.load(Ordering::Relaxed)
    }

    /// Number of completed calls to the authority (successful or not)
    pub fn exchange_count(&self) -> u64 {
        self.exchanges.load(Ordering::Relaxed)
    }

    async fn exchange(&self) -> Result<Credential> {
        tracing::debug!(url = %self.oauth_url, "Exchanging client credentials for an access token");

        let response = self
            .client
            .post(&self.oauth_url)
            .query(&[
                ("grant_type", "client_credentials"),
                ("client_id", self.api_key.as_str()),
                ("client_secret", self.secret_key.as_str()),
            ])
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .send()
            .await?;
        self.exchanges.fetch_add(1, Ordering::Relaxed);

        let status = response.status();
        let body = response.text().await?;
        let reply: TokenResponse = match serde_json::from_str(&body) {
            Ok(reply) => reply,
            Err(_) if !status.is_success() => {
                return Err(WenxinError::ApiConnection {
                    status: status.as_u16(),
                    reason: status.canonical_reason().unwrap_or_default().to_string(),
                    body,
                });
            }
            Err(e) => {
                return Err(WenxinError::InvalidResponse(format!(
                    "token reply is not valid JSON: {e}"
                )));
            }
        };

        let obtained_at = Instant::now();
        parse_token_reply(reply).map(|(token, expires_in)| {
            tracing::info!("Obtained new access token");
            Credential {
                token,
                obtained_at,
                expires_at: expires_in.map(|secs| obtained_at + Duration::from_secs(secs)),
            }
        })
    }
}

/// Map the authority's reply onto a token or an authentication error
fn parse_token_reply(reply: TokenResponse) -> Result<(String, Option<u64>)> {
    if let Some(error) = reply.error.filter(|e| !e.is_empty()) {
        let description = reply.error_description.unwrap_or_default();
        tracing::warn!(%error, %description, "Credential exchange rejected");
        if description == UNKNOWN_CLIENT_ID {
            return Err(AuthError::InvalidClientId.into());
        }
        let description = if description.is_empty() {
            error
        } else {
            description
        };
        return Err(AuthError::InvalidSecret { description }.into());
    }

    let token = reply
        .access_token
        .filter(|t| !t.is_empty())
        .ok_or_else(|| {
            WenxinError::InvalidResponse("token reply carries neither a token nor an error".into())
        })?;
    Ok((token, reply.expires_in))
}
