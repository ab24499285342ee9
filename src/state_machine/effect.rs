//! Effects produced by state transitions

use crate::conversation::{Conversation, Role};
use crate::models::ModelSpec;

/// Effects to be applied by the session after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum Effect {
    /// Append a message to the conversation
    AppendMessage { role: Role, content: String },

    /// Replace (or remove, when empty) the system prompt
    SetSystemPrompt { content: String },

    /// Hand the conversation to the transport
    RequestCompletion {
        /// The submitted text, sent alone in instruct mode
        utterance: String,
    },

    /// Add a finished turn to the usage counters
    RecordUsage {
        prompt_tokens: u64,
        completion_tokens: u64,
    },

    /// Report a turn's counts without adding them to the totals
    RecordLastTurn {
        prompt_tokens: u64,
        completion_tokens: u64,
    },

    /// Refuse further submissions until reset
    LockSubmission,

    /// Clear the conversation, zero the counters, release the lock
    ResetSession,

    /// Switch the active model
    SwitchModel { model: &'static ModelSpec },

    /// Replace the conversation wholesale
    ReplaceConversation { conversation: Conversation },
}

impl Effect {
    pub fn append(role: Role, content: impl Into<String>) -> Self {
        Effect::AppendMessage {
            role,
            content: content.into(),
        }
    }

    pub fn record_usage(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Effect::RecordUsage {
            prompt_tokens,
            completion_tokens,
        }
    }

    pub fn record_last_turn(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Effect::RecordLastTurn {
            prompt_tokens,
            completion_tokens,
        }
    }
}
