//! Centralized model definitions
//!
//! The table is read-only process-wide state. Each entry carries everything
//! the rest of the crate needs to know about a model: context window,
//! tokenizer family, interaction mode and pricing. Nothing else re-derives
//! these from the model id.

use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Tokenizer family, selecting the per-message counting constants
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerFamily {
    /// gpt-3.5 models: `<|start|>{role/name}\n{content}<|end|>\n`
    Gpt35,
    /// gpt-4 models
    Gpt4,
}

/// Fixed per-message token overhead for a family
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MessageOverhead {
    pub tokens_per_message: i64,
    /// Applied once per message carrying a `name` field
    pub tokens_per_name: i64,
}

impl TokenizerFamily {
    pub fn overhead(self) -> MessageOverhead {
        match self {
            TokenizerFamily::Gpt35 => MessageOverhead {
                tokens_per_message: 4,
                // If there's a name, the role is omitted
                tokens_per_name: -1,
            },
            TokenizerFamily::Gpt4 => MessageOverhead {
                tokens_per_message: 3,
                tokens_per_name: 1,
            },
        }
    }

    /// Name of the BPE encoding used by this family
    pub fn encoding_name(self) -> &'static str {
        match self {
            TokenizerFamily::Gpt35 | TokenizerFamily::Gpt4 => "cl100k_base",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            TokenizerFamily::Gpt35 => "gpt-3.5",
            TokenizerFamily::Gpt4 => "gpt-4",
        }
    }

    /// Derive the family from a raw model id by prefix.
    ///
    /// Only needed for ids that are not in the registry; registry entries
    /// carry their family explicitly.
    pub fn from_model_id(model_id: &str) -> Result<Self> {
        if model_id.starts_with("gpt-3.5") {
            Ok(TokenizerFamily::Gpt35)
        } else if model_id.starts_with("gpt-4") {
            Ok(TokenizerFamily::Gpt4)
        } else {
            Err(ChatError::UnsupportedFamily(model_id.to_string()))
        }
    }

    /// Like [`Self::from_model_id`], substituting `fallback` for unknown ids.
    pub fn from_model_id_or(model_id: &str, fallback: TokenizerFamily) -> Self {
        Self::from_model_id(model_id).unwrap_or_else(|_| {
            tracing::warn!(
                model = %model_id,
                fallback = fallback.label(),
                "No tokenizer family for model, using fallback"
            );
            fallback
        })
    }
}

impl fmt::Display for TokenizerFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Completion protocol and UI affordances for a model
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InteractionMode {
    /// Multi-turn chat completions over the whole conversation
    Chat,
    /// Single-shot completion from one prompt string
    Instruct,
}

impl fmt::Display for InteractionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InteractionMode::Chat => f.write_str("chat"),
            InteractionMode::Instruct => f.write_str("instruct"),
        }
    }
}

/// Per-token prices in USD
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Pricing {
    pub prompt_per_token: f64,
    pub completion_per_token: f64,
}

/// Model definition with metadata
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    /// Model id as sent to the backend (e.g., "gpt-4")
    pub id: &'static str,
    /// Context window size in tokens (prompt + completion)
    pub context_window: u32,
    pub family: TokenizerFamily,
    pub mode: InteractionMode,
    pub pricing: Pricing,
    /// Human-readable description
    pub description: &'static str,
}

const MODELS: &[ModelSpec] = &[
    ModelSpec {
        id: "gpt-3.5-turbo",
        context_window: 4097,
        family: TokenizerFamily::Gpt35,
        mode: InteractionMode::Chat,
        pricing: Pricing {
            prompt_per_token: 0.000_001_5,
            completion_per_token: 0.000_002,
        },
        description: "GPT-3.5 Turbo (fast, inexpensive)",
    },
    ModelSpec {
        id: "gpt-3.5-turbo-16k",
        context_window: 16385,
        family: TokenizerFamily::Gpt35,
        mode: InteractionMode::Chat,
        pricing: Pricing {
            prompt_per_token: 0.000_003,
            completion_per_token: 0.000_004,
        },
        description: "GPT-3.5 Turbo 16K (long context)",
    },
    ModelSpec {
        id: "gpt-3.5-turbo-instruct",
        context_window: 4097,
        family: TokenizerFamily::Gpt35,
        mode: InteractionMode::Instruct,
        pricing: Pricing {
            prompt_per_token: 0.000_001_5,
            completion_per_token: 0.000_002,
        },
        description: "GPT-3.5 Turbo Instruct (single-shot completion)",
    },
    ModelSpec {
        id: "gpt-4",
        context_window: 8192,
        family: TokenizerFamily::Gpt4,
        mode: InteractionMode::Chat,
        pricing: Pricing {
            prompt_per_token: 0.000_03,
            completion_per_token: 0.000_06,
        },
        description: "GPT-4 (most capable)",
    },
    ModelSpec {
        id: "gpt-4-32k",
        context_window: 32768,
        family: TokenizerFamily::Gpt4,
        mode: InteractionMode::Chat,
        pricing: Pricing {
            prompt_per_token: 0.000_06,
            completion_per_token: 0.000_12,
        },
        description: "GPT-4 32K (long context)",
    },
];

/// Get all available model definitions, in cycling order
pub fn all_models() -> &'static [ModelSpec] {
    MODELS
}

/// Get the default model definition
pub fn default_model() -> &'static ModelSpec {
    &MODELS[0]
}

/// Look up a model by id
pub fn resolve(model_id: &str) -> Result<&'static ModelSpec> {
    MODELS
        .iter()
        .find(|m| m.id == model_id)
        .ok_or_else(|| ChatError::UnknownModel(model_id.to_string()))
}

/// The entry after `current_id` in table order, wrapping around
pub fn next(current_id: &str) -> Result<&'static ModelSpec> {
    let index = MODELS
        .iter()
        .position(|m| m.id == current_id)
        .ok_or_else(|| ChatError::UnknownModel(current_id.to_string()))?;
    Ok(&MODELS[(index + 1) % MODELS.len()])
}
