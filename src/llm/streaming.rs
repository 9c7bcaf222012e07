// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2025 Blackman Artificial Intelligence Technologies Inc.

//! Streamed chat requests
//!
//! Each request runs through `Authenticating -> Streaming -> {Done, Retrying, Failed}`.
//! An expired-token record abandons the current attempt, forces a credential
//! refresh and reissues the request. The abandoned attempt yields nothing
//! further; the reissued attempt's fragments are forwarded in its place.
//! Refreshes per request are bounded.
//!
//! The request timeout bounds each network wait (sending the request and
//! receiving its headers, then every body read) rather than the whole answer,
//! so a long answer that keeps streaming is never cut off.

use futures::{Stream, StreamExt};
use reqwest::{Client, Response};
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, WenxinError};
use crate::llm::auth::CredentialManager;
use crate::llm::wire::{ChatRequest, StreamRecord, EXPIRED_TOKEN_CODE};

/// Lazy, single-use sequence of answer fragments
pub type FragmentStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Marker that may precede each streamed record
const EVENT_PREFIX: &str = "data:";

/// How a single stream line moves the request state machine
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamLine {
    /// Blank line
    Skip,
    /// Result text to forward
    Fragment(String),
    /// End of the turn
    End,
    /// Token expired; refresh and reissue
    Expired,
    /// Any other in-band error
    Failed { code: i64, message: String },
}

/// Decode one line of the chat stream
pub fn parse_stream_line(line: &str) -> Result<StreamLine> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(StreamLine::Skip);
    }
    let payload = line
        .strip_prefix(EVENT_PREFIX)
        .map(str::trim_start)
        .unwrap_or(line);

    let record: StreamRecord = serde_json::from_str(payload).map_err(|e| {
        WenxinError::InvalidResponse(format!("undecodable stream record ({e}): {payload}"))
    })?;
    Ok(classify(record))
}

fn classify(record: StreamRecord) -> StreamLine {
    match record.error_code {
        Some(EXPIRED_TOKEN_CODE) => StreamLine::Expired,
        Some(code) if code != 0 => StreamLine::Failed {
            code,
            message: record.error_msg.unwrap_or_default(),
        },
        _ if record.is_end && !record.is_first_sentence() => StreamLine::End,
        _ => StreamLine::Fragment(record.result.unwrap_or_default()),
    }
}

/// Await `fut`, failing with a timeout error when it takes longer than `limit`
async fn within<F: Future>(limit: Option<Duration>, fut: F) -> Result<F::Output> {
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut).await.map_err(|_| {
            WenxinError::Network(format!("timed out after {limit:?} waiting for the chat endpoint"))
        }),
        None => Ok(fut.await),
    }
}

/// Splits a byte stream into lines without breaking multi-byte characters
/// that straddle chunk boundaries
#[derive(Debug, Default)]
pub(crate) struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append a chunk and return every line it completed
    pub(crate) fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);
        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.pending.drain(..=pos).collect();
            lines.push(String::from_utf8_lossy(&line[..pos]).into_owned());
        }
        lines
    }

    /// The unterminated tail, if any
    pub(crate) fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Issues chat requests and turns the response body into fragments
pub struct StreamingRequestEngine {
    client: Client,
    chat_url: String,
    credentials: Arc<CredentialManager>,
    max_token_refreshes: u32,
}

impl StreamingRequestEngine {
    pub fn new(
        client: Client,
        chat_url: impl Into<String>,
        credentials: Arc<CredentialManager>,
        max_token_refreshes: u32,
    ) -> Self {
        Self {
            client,
            chat_url: chat_url.into(),
            credentials,
            max_token_refreshes,
        }
    }

    pub fn chat_url(&self) -> &str {
        &self.chat_url
    }

    pub fn credentials(&self) -> &Arc<CredentialManager> {
        &self.credentials
    }

    /// Stream the answer to `request`.
    ///
    /// Nothing is sent until the returned stream is polled. Dropping the
    /// stream closes the connection.
    pub fn stream(self: &Arc<Self>, request: ChatRequest, timeout: Option<Duration>) -> FragmentStream {
        let engine = Arc::clone(self);

        let fragments = async_stream::try_stream! {
            let mut refreshes: u32 = 0;

            'attempt: loop {
                let token = engine.credentials.get_token(refreshes > 0).await?;
                let response = engine.open(&token, &request, timeout).await?;
                tracing::debug!(user_id = %request.user_id, attempt = refreshes + 1, "Streaming answer");

                let mut body = response.bytes_stream();
                let mut lines = LineBuffer::default();

                loop {
                    let batch = match within(timeout, body.next()).await? {
                        Some(chunk) => lines.push(&chunk?),
                        None => match lines.finish() {
                            Some(tail) => vec![tail],
                            None => break 'attempt,
                        },
                    };

                    for line in batch {
                        match parse_stream_line(&line)? {
                            StreamLine::Skip => {}
                            StreamLine::Fragment(text) => {
                                yield text;
                            }
                            StreamLine::End => break 'attempt,
                            StreamLine::Expired => {
                                if refreshes >= engine.max_token_refreshes {
                                    Err::<(), WenxinError>(WenxinError::RetryExhausted {
                                        attempts: refreshes,
                                    })?;
                                }
                                refreshes += 1;
                                tracing::warn!(
                                    user_id = %request.user_id,
                                    refreshes,
                                    "Access token expired, refreshing and reissuing request"
                                );
                                continue 'attempt;
                            }
                            StreamLine::Failed { code, message } => {
                                Err::<(), WenxinError>(WenxinError::Response { code, message })?;
                            }
                        }
                    }
                }
            }
        };

        Box::pin(fragments)
    }

    /// Open the streaming connection; non-success statuses become errors
    async fn open(
        &self,
        token: &str,
        request: &ChatRequest,
        timeout: Option<Duration>,
    ) -> Result<Response> {
        let send = self
            .client
            .post(&self.chat_url)
            .query(&[("access_token", token)])
            .json(request)
            .send();

        let response = within(timeout, send).await??;
        let status = response.status();
        if !status.is_success() {
            let reason = status.canonical_reason().unwrap_or_default().to_string();
            let body = within(timeout, response.text())
                .await
                .and_then(|read| read.map_err(WenxinError::from))
                .unwrap_or_else(|e| format!("<failed to read error body: {e}>"));
            return Err(WenxinError::ApiConnection {
                status: status.as_u16(),
                reason,
                body,
            });
        }
        Ok(response)
    }
}
