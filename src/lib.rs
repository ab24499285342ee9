//! llmchat - conversational session core for chat-completion backends
//!
//! Tracks an ordered exchange of role-tagged messages, counts tokens the way
//! the backend does for each model family, keeps usage and cost accounting,
//! and classifies completion results. Network transport and presentation are
//! left to the caller.

#![allow(clippy::must_use_candidate)]
#![allow(clippy::missing_errors_doc)]

pub mod config;
pub mod controller;
pub mod conversation;
pub mod error;
pub mod models;
pub mod prompts;
pub mod session;
pub mod state_machine;
pub mod tokens;
pub mod transport;

pub use config::ChatConfig;
pub use controller::{ChatSession, TurnOutcome, UsageReport};
pub use conversation::{Conversation, Message, Role, Transcript};
pub use error::{ChatError, Result};
pub use models::{InteractionMode, ModelSpec, TokenizerFamily};
pub use session::SessionRecord;
pub use state_machine::{ChatState, InstructPolicy, TruncationWarning};
pub use tokens::{count_tokens, estimate_cost, UsageCounters};
pub use transport::{
    CompletionRequest, CompletionResult, CompletionTransport, FinishReason, Temperature,
    TransportError,
};
