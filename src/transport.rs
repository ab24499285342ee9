//! Completion transport contract
//!
//! The chat core never talks to the network. A [`CompletionTransport`] is
//! handed a [`CompletionRequest`] built from the session and returns the raw
//! completion; retries and backoff are the transport's business.

use crate::conversation::Message;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Sampling temperature, always within `[0.0, 1.0]`
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize)]
#[serde(transparent)]
pub struct Temperature(f64);

impl Temperature {
    pub const MIN: f64 = 0.0;
    pub const MAX: f64 = 1.0;

    /// Clamp `value` into range. NaN becomes 0.0.
    pub fn new(value: f64) -> Self {
        if value.is_nan() {
            Self(Self::MIN)
        } else {
            Self(value.clamp(Self::MIN, Self::MAX))
        }
    }

    /// From a 0..=100 slider position
    pub fn from_percent(percent: u8) -> Self {
        Self::new(f64::from(percent) / 100.0)
    }

    pub fn value(self) -> f64 {
        self.0
    }
}

impl<'de> Deserialize<'de> for Temperature {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        f64::deserialize(deserializer).map(Self::new)
    }
}

/// What the backend is asked to complete
#[derive(Debug, Clone, PartialEq)]
pub enum Prompt {
    /// Chat protocol: the whole conversation, in order
    Chat(Vec<Message>),
    /// Instruct protocol: a single prompt string
    Instruct(String),
}

/// A completion request for one turn
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub model: &'static str,
    pub temperature: Temperature,
    pub prompt: Prompt,
}

/// Why generation stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum FinishReason {
    /// Natural completion
    Stop,
    /// Hit a token limit
    Length,
    Other(String),
}

impl From<&str> for FinishReason {
    fn from(s: &str) -> Self {
        match s {
            "stop" => FinishReason::Stop,
            "length" => FinishReason::Length,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

impl From<String> for FinishReason {
    fn from(s: String) -> Self {
        FinishReason::from(s.as_str())
    }
}

impl From<FinishReason> for String {
    fn from(reason: FinishReason) -> Self {
        reason.to_string()
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Stop => f.write_str("stop"),
            FinishReason::Length => f.write_str("length"),
            FinishReason::Other(s) => f.write_str(s),
        }
    }
}

/// Raw completion returned by the transport
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompletionResult {
    pub content: String,
    pub finish_reason: FinishReason,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl CompletionResult {
    pub fn new(
        content: impl Into<String>,
        finish_reason: impl Into<FinishReason>,
        prompt_tokens: u64,
        completion_tokens: u64,
    ) -> Self {
        Self {
            content: content.into(),
            finish_reason: finish_reason.into(),
            prompt_tokens,
            completion_tokens,
        }
    }
}

/// Transport-level failure (network, auth, backend error)
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct TransportError {
    pub message: String,
}

impl TransportError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// External completion backend
#[async_trait]
pub trait CompletionTransport: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, TransportError>;
}

/// Logging wrapper for completion transports
pub struct LoggingTransport {
    inner: Arc<dyn CompletionTransport>,
}

impl LoggingTransport {
    pub fn new(inner: Arc<dyn CompletionTransport>) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl CompletionTransport for LoggingTransport {
    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResult, TransportError> {
        let start = std::time::Instant::now();
        let result = self.inner.complete(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => {
                tracing::info!(
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    finish_reason = %response.finish_reason,
                    prompt_tokens = response.prompt_tokens,
                    completion_tokens = response.completion_tokens,
                    "Completion request finished"
                );
            }
            Err(e) => {
                tracing::error!(
                    model = %request.model,
                    duration_ms = %duration.as_millis(),
                    error = %e.message,
                    "Completion request failed"
                );
            }
        }

        result
    }
}
