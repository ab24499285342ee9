//! Pure state transition function
//!
//! Given the same state, context and event this always produces the same
//! new state and effects. All mutation happens when the session applies the
//! effects.

use super::{ChatContext, ChatState, Effect, Event, InstructPolicy, TruncationWarning};
use crate::conversation::Role;
use crate::error::ChatError;
use crate::transport::{CompletionResult, FinishReason};
use thiserror::Error;

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_state: ChatState,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(state: ChatState) -> Self {
        Self {
            new_state: state,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    pub fn with_effects(mut self, effects: impl IntoIterator<Item = Effect>) -> Self {
        self.effects.extend(effects);
        self
    }
}

/// Errors that can occur during transition
#[derive(Debug, Error, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Completion in flight, cannot accept input")]
    Busy,
    #[error("Submission disabled until reset")]
    SubmissionLocked,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

impl From<TransitionError> for ChatError {
    fn from(e: TransitionError) -> Self {
        match e {
            TransitionError::Busy => ChatError::Busy,
            TransitionError::SubmissionLocked => ChatError::SubmissionLocked,
            TransitionError::InvalidTransition(msg) => ChatError::InvalidTransition(msg),
        }
    }
}

/// Pure transition function
pub fn transition(
    state: &ChatState,
    context: &ChatContext,
    event: Event,
) -> Result<TransitionResult, TransitionError> {
    match (state, event) {
        // Reset is accepted from anywhere, including mid-completion
        (_, Event::Reset) => {
            Ok(TransitionResult::new(ChatState::Idle).with_effect(Effect::ResetSession))
        }

        // ============================================================
        // Busy: everything but reset and transport events is refused
        // ============================================================
        (
            ChatState::AwaitingCompletion,
            Event::Submit { .. }
            | Event::SetSystemPrompt { .. }
            | Event::ChangeModel { .. }
            | Event::Restore { .. },
        ) => Err(TransitionError::Busy),

        // ============================================================
        // Submission
        // ============================================================
        (_, Event::Submit { .. }) if context.submission_locked => {
            Err(TransitionError::SubmissionLocked)
        }

        (_, Event::Submit { role: Role::Assistant, .. }) => Err(TransitionError::InvalidTransition(
            "assistant messages only come from completions".to_string(),
        )),

        (_, Event::Submit { role: Role::System, content }) => {
            Ok(TransitionResult::new(ChatState::AwaitingCompletion).with_effects([
                Effect::SetSystemPrompt {
                    content: content.clone(),
                },
                Effect::RequestCompletion { utterance: content },
            ]))
        }

        (_, Event::Submit { role: Role::User, content }) => {
            Ok(TransitionResult::new(ChatState::AwaitingCompletion).with_effects([
                Effect::append(Role::User, content.clone()),
                Effect::RequestCompletion { utterance: content },
            ]))
        }

        // ============================================================
        // Completion results
        // ============================================================
        (ChatState::AwaitingCompletion, Event::Completion(result)) => {
            Ok(completion_transition(context, result))
        }

        (ChatState::AwaitingCompletion, Event::TransportFailed { message }) => {
            Ok(TransitionResult::new(ChatState::Failed { message }))
        }

        (_, Event::Completion(_) | Event::TransportFailed { .. }) => {
            Err(TransitionError::InvalidTransition(format!(
                "no completion in flight (state: {})",
                state.name()
            )))
        }

        // ============================================================
        // Idle-only session edits
        // ============================================================
        (_, Event::SetSystemPrompt { content }) => Ok(TransitionResult::new(state.clone())
            .with_effect(Effect::SetSystemPrompt { content })),

        // Context window and tokenizer change with the model, so start over
        (_, Event::ChangeModel { model }) => Ok(TransitionResult::new(ChatState::Idle)
            .with_effects([Effect::SwitchModel { model }, Effect::ResetSession])),

        (_, Event::Restore { conversation }) => Ok(TransitionResult::new(ChatState::Idle)
            .with_effects([
                Effect::ResetSession,
                Effect::ReplaceConversation { conversation },
            ])),
    }
}

fn completion_transition(context: &ChatContext, result: CompletionResult) -> TransitionResult {
    match result.finish_reason {
        FinishReason::Stop => {
            let lock = context.is_instruct() && context.instruct_policy == InstructPolicy::LockAfterTurn;
            TransitionResult::new(ChatState::Idle)
                .with_effect(Effect::append(Role::Assistant, result.content))
                .with_effect(Effect::record_usage(
                    result.prompt_tokens,
                    result.completion_tokens,
                ))
                .with_effects(lock.then_some(Effect::LockSubmission))
        }
        // The partial reply is dropped and the totals stay untouched
        FinishReason::Length => {
            let warning = TruncationWarning {
                model: context.model.id,
                context_window: context.model.context_window,
                prompt_tokens: result.prompt_tokens,
                completion_tokens: result.completion_tokens,
            };
            TransitionResult::new(ChatState::Warned { warning })
                .with_effect(Effect::record_last_turn(
                    result.prompt_tokens,
                    result.completion_tokens,
                ))
                .with_effects(context.is_instruct().then_some(Effect::LockSubmission))
        }
        FinishReason::Other(reason) => TransitionResult::new(ChatState::Failed {
            message: format!("unexpected finish reason: {reason}"),
        }),
    }
}
