// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Multi-session chat client
//!
//! `ChatBot` ties the pieces together: it records the prompt in the
//! session history, waits for an admission slot, streams the answer and
//! records the finished answer as the assistant turn.
//!
//! Policy on failure: the user turn is recorded before the request is sent
//! and stays in history when the request fails, so a caller retrying the
//! same prompt should not append it a second time.

use futures::StreamExt;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

use crate::chat::options::{RequestConfig, RequestOverrides};
use crate::config::Settings;
use crate::config::settings::default_max_token_refreshes;
use crate::conversation::{ConversationStore, Role, Turn};
use crate::error::{Result, WenxinError};
use crate::llm::auth::CredentialManager;
use crate::llm::engine::{Engine, CHAT_BASE_URL, OAUTH_URL};
use crate::llm::rate_limit::{IntervalRateLimiter, RateLimiter, Unlimited};
use crate::llm::streaming::{FragmentStream, StreamingRequestEngine};
use crate::llm::wire::ChatRequest;

/// Session used when the caller does not name one
pub const DEFAULT_SESSION: &str = "default";

/// Cloneable handle to one client; clones share histories and credentials
#[derive(Clone)]
pub struct ChatBot {
    inner: Arc<ChatBotInner>,
}

struct ChatBotInner {
    engine: Engine,
    config: RequestConfig,
    store: ConversationStore,
    credentials: Arc<CredentialManager>,
    streaming: Arc<StreamingRequestEngine>,
    rate_limiter: Arc<dyn RateLimiter>,
}

impl ChatBot {
    /// Create a client with the default endpoints and the process-wide limiter
    pub fn new(
        api_key: impl Into<String>,
        secret_key: impl Into<String>,
        engine: &str,
        config: RequestConfig,
    ) -> Result<Self> {
        Self::builder(api_key, secret_key)
            .with_engine(engine)
            .with_config(config)
            .build()
    }

    pub fn builder(api_key: impl Into<String>, secret_key: impl Into<String>) -> ChatBotBuilder {
        ChatBotBuilder::new(api_key, secret_key)
    }

    /// Create a client from loaded settings
    pub fn from_settings(settings: &Settings) -> Result<Self> {
        let (api_key, secret_key) = settings.require_credentials()?;
        let mut builder = Self::builder(api_key, secret_key)
            .with_engine(&settings.engine)
            .with_config(settings.request.to_request_config())
            .with_oauth_url(&settings.endpoints.oauth_url)
            .with_chat_base_url(&settings.endpoints.chat_base_url)
            .with_max_token_refreshes(settings.retry.max_token_refreshes);

        match settings.rate_limit.interval_ms {
            Some(0) => builder = builder.with_rate_limiter(Arc::new(Unlimited)),
            Some(ms) => {
                builder = builder.with_rate_limiter(Arc::new(IntervalRateLimiter::new(
                    Duration::from_millis(ms),
                )))
            }
            None => {}
        }

        builder.build()
    }

    pub fn engine(&self) -> Engine {
        self.inner.engine
    }

    pub fn config(&self) -> &RequestConfig {
        &self.inner.config
    }

    /// Credential manager, exposed for warm-up and observation
    pub fn credentials(&self) -> &CredentialManager {
        &self.inner.credentials
    }

    /// Fetch the access token ahead of the first request
    pub async fn warm_up(&self) -> Result<()> {
        self.inner.credentials.get_token(false).await.map(|_| ())
    }

    /// Ask a question and stream the answer.
    ///
    /// The prompt is checked against the per-message budget and appended
    /// (then the session truncated) before this returns; nothing is sent
    /// until the stream is polled. When the stream completes the full answer
    /// is appended as the assistant turn.
    pub fn ask_stream(
        &self,
        prompt: &str,
        session_id: &str,
        overrides: &RequestOverrides,
    ) -> Result<FragmentStream> {
        let params = self.inner.config.resolve(overrides)?;

        let store = &self.inner.store;
        store.append(session_id, Role::User, prompt)?;
        store.truncate(session_id);

        let inner = Arc::clone(&self.inner);
        let session_id = session_id.to_string();

        let answer_stream = async_stream::try_stream! {
            inner.rate_limiter.acquire_slot().await;

            let request = ChatRequest::new(inner.store.history(&session_id), &params, session_id.as_str());
            let mut fragments = inner.streaming.stream(request, params.timeout);
            let mut answer = String::new();

            while let Some(fragment) = fragments.next().await {
                let fragment = fragment?;
                answer.push_str(&fragment);
                yield fragment;
            }

            inner.store.append(&session_id, Role::Assistant, answer)?;
            inner.store.truncate(&session_id);
        };

        Ok(Box::pin(answer_stream))
    }

    /// Ask a question and wait for the whole answer
    pub async fn ask(
        &self,
        prompt: &str,
        session_id: &str,
        overrides: &RequestOverrides,
    ) -> Result<String> {
        let mut fragments = self.ask_stream(prompt, session_id, overrides)?;
        let mut answer = String::new();
        while let Some(fragment) = fragments.next().await {
            answer.push_str(&fragment?);
        }
        Ok(answer)
    }

    /// Clear a session's history
    pub fn reset(&self, session_id: &str) {
        self.inner.store.reset(session_id);
    }

    /// Estimated tokens currently held by a session
    pub fn get_token_count(&self, session_id: &str) -> usize {
        self.inner.store.total_cost(session_id)
    }

    /// Chronological copy of a session's turns
    pub fn history(&self, session_id: &str) -> Vec<Turn> {
        self.inner.store.history(session_id)
    }

    pub fn session_ids(&self) -> Vec<String> {
        self.inner.store.session_ids()
    }
}

/// Builder for `ChatBot`
pub struct ChatBotBuilder {
    api_key: String,
    secret_key: String,
    engine: String,
    config: RequestConfig,
    oauth_url: String,
    chat_base_url: String,
    rate_limiter: Option<Arc<dyn RateLimiter>>,
    http_client: Option<Client>,
    max_token_refreshes: u32,
}

impl ChatBotBuilder {
    pub fn new(api_key: impl Into<String>, secret_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            secret_key: secret_key.into(),
            engine: Engine::default().name().to_string(),
            config: RequestConfig::default(),
            oauth_url: OAUTH_URL.to_string(),
            chat_base_url: CHAT_BASE_URL.to_string(),
            rate_limiter: None,
            http_client: None,
            max_token_refreshes: default_max_token_refreshes(),
        }
    }

    /// Engine by public name; validated in `build`
    pub fn with_engine(mut self, engine: impl Into<String>) -> Self {
        self.engine = engine.into();
        self
    }

    pub fn with_config(mut self, config: RequestConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.config.temperature = temperature;
        self
    }

    pub fn with_top_p(mut self, top_p: f64) -> Self {
        self.config.top_p = top_p;
        self
    }

    pub fn with_penalty_score(mut self, penalty_score: f64) -> Self {
        self.config.penalty_score = penalty_score;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: usize) -> Self {
        self.config.max_tokens = max_tokens;
        self
    }

    pub fn with_truncate_limit(mut self, truncate_limit: usize) -> Self {
        self.config.truncate_limit = truncate_limit;
        self
    }

    pub fn with_oauth_url(mut self, url: impl Into<String>) -> Self {
        self.oauth_url = url.into();
        self
    }

    /// Chat URL prefix; the engine's path segment is appended
    pub fn with_chat_base_url(mut self, url: impl Into<String>) -> Self {
        self.chat_base_url = url.into();
        self
    }

    /// Replace the process-wide limiter with a dedicated one
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimiter>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    pub fn with_http_client(mut self, client: Client) -> Self {
        self.http_client = Some(client);
        self
    }

    /// Forced credential refreshes allowed per request
    pub fn with_max_token_refreshes(mut self, refreshes: u32) -> Self {
        self.max_token_refreshes = refreshes;
        self
    }

    /// Validate the configuration and build the client. Makes no network calls.
    pub fn build(self) -> Result<ChatBot> {
        let engine: Engine = self.engine.parse()?;
        let config = self.config.normalized()?;

        let client = match self.http_client {
            Some(client) => client,
            None => Client::builder()
                .build()
                .map_err(|e| WenxinError::Config(format!("failed to build HTTP client: {e}")))?,
        };

        let credentials = Arc::new(CredentialManager::new(
            client.clone(),
            self.oauth_url,
            self.api_key,
            self.secret_key,
        ));
        let chat_url = format!(
            "{}/{}",
            self.chat_base_url.trim_end_matches('/'),
            engine.endpoint()
        );
        let streaming = Arc::new(StreamingRequestEngine::new(
            client,
            chat_url,
            Arc::clone(&credentials),
            self.max_token_refreshes,
        ));
        let rate_limiter = self
            .rate_limiter
            .unwrap_or_else(|| IntervalRateLimiter::shared() as Arc<dyn RateLimiter>);

        tracing::debug!(
            engine = %engine,
            max_tokens = config.max_tokens,
            truncate_limit = config.truncate_limit,
            "Chat client ready"
        );

        Ok(ChatBot {
            inner: Arc::new(ChatBotInner {
                engine,
                store: ConversationStore::new(config.max_tokens, config.truncate_limit),
                config,
                credentials,
                streaming,
                rate_limiter,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ActionsError;

    fn offline_bot(max_tokens: usize) -> ChatBot {
        ChatBot::builder("ak", "sk")
            .with_max_tokens(max_tokens)
            .with_oauth_url("http://127.0.0.1:9/oauth")
            .with_chat_base_url("http://127.0.0.1:9/chat")
            .with_rate_limiter(Arc::new(Unlimited))
            .build()
            .unwrap()
    }

    #[test]
    fn test_unknown_engine_fails_at_construction() {
        let result = ChatBot::new("ak", "sk", "GPT-4", RequestConfig::default());
        assert!(matches!(
            result,
            Err(WenxinError::Actions(ActionsError::UnsupportedEngine { .. }))
        ));
    }

    #[test]
    fn test_invalid_sampling_fails_at_construction() {
        let result = ChatBot::builder("ak", "sk").with_top_p(2.0).build();
        assert!(result.is_err());
    }

    #[test]
    fn test_chat_url_uses_engine_endpoint() {
        let bot = ChatBot::builder("ak", "sk")
            .with_engine("ERNIE-Bot")
            .with_chat_base_url("http://localhost/chat/")
            .with_rate_limiter(Arc::new(Unlimited))
            .build()
            .unwrap();
        assert_eq!(bot.engine(), Engine::ErnieBot);
        assert_eq!(bot.inner.streaming.chat_url(), "http://localhost/chat/completions");
    }

    #[test]
    fn test_zero_limits_fall_back_to_defaults() {
        let bot = ChatBot::builder("ak", "sk")
            .with_max_tokens(0)
            .with_truncate_limit(0)
            .with_rate_limiter(Arc::new(Unlimited))
            .build()
            .unwrap();
        assert_eq!(bot.config().max_tokens, 2000);
        assert_eq!(bot.config().truncate_limit, 2000);
    }

    #[test]
    fn test_over_budget_prompt_is_rejected_before_mutation() {
        let bot = offline_bot(2);
        bot.reset("s");

        let result = bot.ask_stream("你好呀", "s", &RequestOverrides::default());
        match result {
            Err(err) => assert!(err.is_budget_exceeded()),
            Ok(_) => panic!("over-budget prompt was accepted"),
        }
        assert!(bot.history("s").is_empty());
        assert_eq!(bot.get_token_count("s"), 0);
    }

    #[test]
    fn test_invalid_override_is_rejected_before_mutation() {
        let bot = offline_bot(2000);
        let overrides = RequestOverrides::new().with_temperature(5.0);
        assert!(bot.ask_stream("你好", "s", &overrides).is_err());
        assert!(bot.history("s").is_empty());
    }

    #[test]
    fn test_prompt_recorded_eagerly() {
        let bot = offline_bot(2000);
        let stream = bot.ask_stream("你好", "s", &RequestOverrides::default());
        assert!(stream.is_ok());
        assert_eq!(bot.history("s"), vec![Turn::user("你好")]);
        assert_eq!(bot.get_token_count("s"), 2);
    }

    #[test]
    fn test_clones_share_sessions() {
        let bot = offline_bot(2000);
        let clone = bot.clone();
        let _ = bot.ask_stream("hello", "shared", &RequestOverrides::default());
        assert_eq!(clone.session_ids(), vec!["shared".to_string()]);
        clone.reset("shared");
        assert_eq!(bot.get_token_count("shared"), 0);
    }
}
