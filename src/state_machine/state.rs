//! Chat session state types

use crate::models::{InteractionMode, ModelSpec};
use std::fmt;
use std::str::FromStr;

/// Raised when the backend stops at a token limit.
///
/// Recoverable: the conversation is left consistent, without the partial
/// reply, and can continue. Starting a new dialogue is advisable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncationWarning {
    pub model: &'static str,
    pub context_window: u32,
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
}

impl fmt::Display for TruncationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Maximum number of tokens was reached ({} + {} of {} for {}), consider starting a new dialogue",
            self.prompt_tokens, self.completion_tokens, self.context_window, self.model
        )
    }
}

/// Chat session state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ChatState {
    /// Ready for input
    #[default]
    Idle,

    /// Utterance appended, completion in flight. The only suspension point.
    AwaitingCompletion,

    /// Idle after a truncated completion
    Warned { warning: TruncationWarning },

    /// Idle after a failed completion
    Failed { message: String },
}

impl ChatState {
    /// Idle, Warned and Failed all accept new input
    pub fn is_idle(&self) -> bool {
        !matches!(self, ChatState::AwaitingCompletion)
    }

    pub fn name(&self) -> &'static str {
        match self {
            ChatState::Idle => "idle",
            ChatState::AwaitingCompletion => "awaiting_completion",
            ChatState::Warned { .. } => "warned",
            ChatState::Failed { .. } => "failed",
        }
    }
}

/// When an instruct-mode session stops accepting submissions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InstructPolicy {
    /// Lock only after a truncated completion
    LockOnTruncation,
    /// Lock after any completed or truncated turn (single-shot)
    #[default]
    LockAfterTurn,
}

impl FromStr for InstructPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "lock_on_truncation" => Ok(InstructPolicy::LockOnTruncation),
            "lock_after_turn" => Ok(InstructPolicy::LockAfterTurn),
            other => Err(format!("unknown instruct policy: {other}")),
        }
    }
}

/// Inputs to a transition that are not part of the state itself
#[derive(Debug, Clone)]
pub struct ChatContext {
    pub model: &'static ModelSpec,
    pub instruct_policy: InstructPolicy,
    /// Latched by an instruct-mode turn, cleared only by reset
    pub submission_locked: bool,
}

impl ChatContext {
    pub fn new(model: &'static ModelSpec, instruct_policy: InstructPolicy) -> Self {
        Self {
            model,
            instruct_policy,
            submission_locked: false,
        }
    }

    pub fn is_instruct(&self) -> bool {
        self.model.mode == InteractionMode::Instruct
    }
}
