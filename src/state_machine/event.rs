//! Events that can occur in a chat session

use crate::conversation::{Conversation, Role};
use crate::models::ModelSpec;
use crate::transport::CompletionResult;

/// Events that trigger state transitions
#[derive(Debug, Clone)]
pub enum Event {
    // Caller events
    Submit {
        role: Role,
        content: String,
    },
    SetSystemPrompt {
        content: String,
    },
    Reset,
    ChangeModel {
        model: &'static ModelSpec,
    },
    Restore {
        conversation: Conversation,
    },

    // Transport events
    Completion(CompletionResult),
    TransportFailed {
        message: String,
    },
}
