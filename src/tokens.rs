//! Token accounting
//!
//! Reproduces the backend's chat-message token arithmetic: a fixed overhead
//! per message (family dependent), the encoded length of each content and
//! name field, and a fixed priming overhead for the assistant reply.
//!
//! The sub-word encoder is a dependency boundary ([`Encoder`]). Production
//! code uses the cl100k BPE from `tiktoken-rs`; tests can use any
//! deterministic encoder.

mod usage;

#[cfg(test)]
mod proptests;

pub use usage::{estimate_cost, TokenEstimate, UsageCounters};

use crate::conversation::Message;
use crate::error::{ChatError, Result};
use crate::models::TokenizerFamily;
use serde_json::Value;
use std::sync::{Arc, OnceLock};
use tiktoken_rs::CoreBPE;

/// Every reply is primed with `<|start|>assistant<|message|>`
pub const REPLY_PRIMING_TOKENS: usize = 3;

/// Sub-word encoder capability required by the accountant
pub trait Encoder: Send + Sync {
    /// Number of tokens `text` encodes to
    fn encoded_len(&self, text: &str) -> usize;
}

/// Anything that can be counted as a chat message.
///
/// Only `content` and an optional `name` contribute; other fields are ignored.
pub trait TokenSource {
    fn content(&self) -> &str;

    fn name(&self) -> Option<&str> {
        None
    }
}

impl TokenSource for Message {
    fn content(&self) -> &str {
        &self.content
    }
}

/// Raw message objects as they appear on the wire. Non-string or missing
/// fields count as empty, unknown keys are skipped.
impl TokenSource for Value {
    fn content(&self) -> &str {
        self.get("content").and_then(Value::as_str).unwrap_or("")
    }

    fn name(&self) -> Option<&str> {
        self.get("name").and_then(Value::as_str)
    }
}

/// Byte-pair encoder backed by `tiktoken-rs`
pub struct BpeEncoder {
    bpe: CoreBPE,
}

impl Encoder for BpeEncoder {
    fn encoded_len(&self, text: &str) -> usize {
        self.bpe.encode_ordinary(text).len()
    }
}

static CL100K: OnceLock<Result<Arc<BpeEncoder>, String>> = OnceLock::new();

fn cl100k() -> Result<Arc<BpeEncoder>, String> {
    CL100K
        .get_or_init(|| {
            tiktoken_rs::cl100k_base()
                .map(|bpe| Arc::new(BpeEncoder { bpe }))
                .map_err(|e| e.to_string())
        })
        .clone()
}

/// Get the encoder for a family. Loaded once per process.
pub fn encoder_for(family: TokenizerFamily) -> Result<Arc<dyn Encoder>> {
    match family.encoding_name() {
        "cl100k_base" => cl100k()
            .map(|e| e as Arc<dyn Encoder>)
            .map_err(|e| ChatError::UnsupportedFamily(format!("{family} ({e})"))),
        other => Err(ChatError::UnsupportedFamily(format!(
            "{family} (encoding {other})"
        ))),
    }
}

/// Get the encoder for a family, substituting cl100k if it cannot be loaded.
pub fn encoder_or_fallback(family: TokenizerFamily) -> Result<Arc<dyn Encoder>> {
    encoder_for(family).or_else(|e| {
        tracing::warn!(family = %family, error = %e, "Encoding not found, using cl100k_base");
        cl100k()
            .map(|e| e as Arc<dyn Encoder>)
            .map_err(ChatError::UnsupportedFamily)
    })
}

/// Count tokens for `messages` with the family's own encoder.
pub fn count_tokens<M: TokenSource>(messages: &[M], family: TokenizerFamily) -> Result<usize> {
    let encoder = encoder_for(family)?;
    Ok(count_tokens_with(encoder.as_ref(), messages, family))
}

/// Pure token arithmetic over an explicit encoder.
pub fn count_tokens_with<M: TokenSource>(
    encoder: &dyn Encoder,
    messages: &[M],
    family: TokenizerFamily,
) -> usize {
    let overhead = family.overhead();
    let mut total: i64 = 0;
    for message in messages {
        total = total
            .saturating_add(overhead.tokens_per_message)
            .saturating_add(to_i64(encoder.encoded_len(message.content())));
        if let Some(name) = message.name() {
            total = total
                .saturating_add(to_i64(encoder.encoded_len(name)))
                .saturating_add(overhead.tokens_per_name);
        }
    }
    usize::try_from(total.max(0))
        .unwrap_or(usize::MAX)
        .saturating_add(REPLY_PRIMING_TOKENS)
}

fn to_i64(n: usize) -> i64 {
    i64::try_from(n).unwrap_or(i64::MAX)
}

/// A family paired with its encoder, owned by a session
#[derive(Clone)]
pub struct TokenCounter {
    family: TokenizerFamily,
    encoder: Arc<dyn Encoder>,
}

impl TokenCounter {
    pub fn new(family: TokenizerFamily) -> Result<Self> {
        Ok(Self {
            family,
            encoder: encoder_for(family)?,
        })
    }

    pub fn with_encoder(family: TokenizerFamily, encoder: Arc<dyn Encoder>) -> Self {
        Self { family, encoder }
    }

    pub fn family(&self) -> TokenizerFamily {
        self.family
    }

    pub fn count<M: TokenSource>(&self, messages: &[M]) -> usize {
        count_tokens_with(self.encoder.as_ref(), messages, self.family)
    }
}

impl std::fmt::Debug for TokenCounter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenCounter")
            .field("family", &self.family)
            .finish_non_exhaustive()
    }
}

/// Whitespace word counter, for tests that don't need BPE parity
#[cfg(test)]
pub(crate) struct WordEncoder;

#[cfg(test)]
impl Encoder for WordEncoder {
    fn encoded_len(&self, text: &str) -> usize {
        text.split_whitespace().count()
    }
}
