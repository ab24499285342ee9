//! Property-based tests for the state machine
//!
//! These tests verify key invariants hold across all possible inputs.

use super::transition::*;
use super::*;
use crate::conversation::{Conversation, Message, Role};
use crate::models::{all_models, ModelSpec};
use crate::transport::{CompletionResult, FinishReason};
use proptest::prelude::*;

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_model() -> impl Strategy<Value = &'static ModelSpec> {
    (0..all_models().len()).prop_map(|i| &all_models()[i])
}

fn arb_policy() -> impl Strategy<Value = InstructPolicy> {
    prop_oneof![
        Just(InstructPolicy::LockOnTruncation),
        Just(InstructPolicy::LockAfterTurn),
    ]
}

fn arb_context() -> impl Strategy<Value = ChatContext> {
    (arb_model(), arb_policy(), any::<bool>()).prop_map(|(model, policy, locked)| {
        let mut ctx = ChatContext::new(model, policy);
        ctx.submission_locked = locked;
        ctx
    })
}

fn arb_finish_reason() -> impl Strategy<Value = FinishReason> {
    prop_oneof![
        3 => Just(FinishReason::Stop),
        1 => Just(FinishReason::Length),
        1 => "[a-z_]{3,15}".prop_map(|s| FinishReason::from(s.as_str())),
    ]
}

fn arb_completion() -> impl Strategy<Value = CompletionResult> {
    ("[a-zA-Z ]{0,30}", arb_finish_reason(), 0u64..10_000, 0u64..4_000).prop_map(
        |(content, finish_reason, prompt_tokens, completion_tokens)| CompletionResult {
            content,
            finish_reason,
            prompt_tokens,
            completion_tokens,
        },
    )
}

fn arb_idle_state() -> impl Strategy<Value = ChatState> {
    prop_oneof![
        Just(ChatState::Idle),
        "[a-zA-Z ]{1,30}".prop_map(|message| ChatState::Failed { message }),
        (arb_model(), 0u64..5000, 0u64..5000).prop_map(|(model, p, c)| ChatState::Warned {
            warning: TruncationWarning {
                model: model.id,
                context_window: model.context_window,
                prompt_tokens: p,
                completion_tokens: c,
            },
        }),
    ]
}

fn arb_state() -> impl Strategy<Value = ChatState> {
    prop_oneof![arb_idle_state(), Just(ChatState::AwaitingCompletion)]
}

fn arb_submit_event() -> impl Strategy<Value = Event> {
    (
        prop_oneof![Just(Role::System), Just(Role::User), Just(Role::Assistant)],
        "[a-zA-Z ]{0,30}",
    )
        .prop_map(|(role, content)| Event::Submit { role, content })
}

fn arb_event() -> impl Strategy<Value = Event> {
    prop_oneof![
        4 => arb_submit_event(),
        4 => arb_completion().prop_map(Event::Completion),
        1 => "[a-zA-Z ]{1,30}".prop_map(|message| Event::TransportFailed { message }),
        1 => "[a-zA-Z ]{0,20}".prop_map(|content| Event::SetSystemPrompt { content }),
        1 => Just(Event::Reset),
        1 => arb_model().prop_map(|model| Event::ChangeModel { model }),
        1 => "[a-z ]{0,10}".prop_map(|text| Event::Restore {
            conversation: Conversation::from_messages(vec![Message::user(text)]).unwrap(),
        }),
    ]
}

// ============================================================================
// Validity Checkers
// ============================================================================

fn effects_are_valid(effects: &[Effect], new_state: &ChatState) -> bool {
    let requests = effects
        .iter()
        .filter(|e| matches!(e, Effect::RequestCompletion { .. }))
        .count();

    // A completion is requested exactly when entering AwaitingCompletion
    match new_state {
        ChatState::AwaitingCompletion => requests == 1,
        _ => requests == 0,
    }
}

// ============================================================================
// Property Tests
// ============================================================================

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    // Invariant 1: RequestCompletion always pairs with AwaitingCompletion
    #[test]
    fn prop_transitions_preserve_validity(
        ctx in arb_context(),
        events in proptest::collection::vec(arb_event(), 0..20),
    ) {
        let mut state = ChatState::Idle;
        for event in events {
            if let Ok(result) = transition(&state, &ctx, event) {
                prop_assert!(
                    effects_are_valid(&result.effects, &result.new_state),
                    "Invalid effects for state {:?}: {:?}",
                    result.new_state,
                    result.effects
                );
                state = result.new_state;
            }
        }
    }

    // Invariant 2: Busy rejects every caller edit except reset
    #[test]
    fn prop_busy_rejects_input(ctx in arb_context(), event in arb_submit_event()) {
        let result = transition(&ChatState::AwaitingCompletion, &ctx, event);
        prop_assert!(matches!(result, Err(TransitionError::Busy)), "got {:?}", result);
    }

    // Invariant 3: Reset always lands in Idle
    #[test]
    fn prop_reset_from_any_state(state in arb_state(), ctx in arb_context()) {
        let result = transition(&state, &ctx, Event::Reset).unwrap();
        prop_assert_eq!(result.new_state, ChatState::Idle);
        prop_assert_eq!(result.effects, vec![Effect::ResetSession]);
    }

    // Invariant 4: Only a successful completion appends to the conversation
    #[test]
    fn prop_only_stop_appends(ctx in arb_context(), completion in arb_completion()) {
        let is_stop = completion.finish_reason == FinishReason::Stop;
        let result = transition(&ChatState::AwaitingCompletion, &ctx, Event::Completion(completion)).unwrap();
        let appends = result
            .effects
            .iter()
            .any(|e| matches!(e, Effect::AppendMessage { role: Role::Assistant, .. }));
        prop_assert_eq!(appends, is_stop);
    }

    // Invariant 5: Unknown finish reasons touch nothing
    #[test]
    fn prop_unknown_reason_has_no_effects(ctx in arb_context(), reason in "[a-z_]{3,15}") {
        prop_assume!(reason != "stop" && reason != "length");
        let completion = CompletionResult::new("x", reason.as_str(), 1, 1);
        let result = transition(&ChatState::AwaitingCompletion, &ctx, Event::Completion(completion)).unwrap();
        prop_assert!(
            matches!(result.new_state, ChatState::Failed { .. }),
            "expected Failed, got {:?}",
            result.new_state
        );
        prop_assert!(result.effects.is_empty());
    }

    // Invariant 6: Chat-mode sessions never lock
    #[test]
    fn prop_chat_mode_never_locks(
        ctx in arb_context(),
        completion in arb_completion(),
    ) {
        prop_assume!(!ctx.is_instruct());
        let result = transition(&ChatState::AwaitingCompletion, &ctx, Event::Completion(completion)).unwrap();
        prop_assert!(!result.effects.contains(&Effect::LockSubmission));
    }

    // Invariant 7: Idle-like states accept user input unless locked
    #[test]
    fn prop_idle_accepts_user_input(state in arb_idle_state(), ctx in arb_context(), text in "[a-zA-Z ]{1,30}") {
        let result = transition(&state, &ctx, Event::Submit { role: Role::User, content: text });
        if ctx.submission_locked {
            prop_assert!(matches!(result, Err(TransitionError::SubmissionLocked)), "got {:?}", result);
        } else {
            prop_assert_eq!(result.unwrap().new_state, ChatState::AwaitingCompletion);
        }
    }
}
