//! Property-based tests for conversation invariants

use super::*;
use crate::session;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum Op {
    Append(Role, String),
    SetSystem(String),
    Reset,
}

fn arb_op() -> impl Strategy<Value = Op> {
    prop_oneof![
        4 => (
            prop_oneof![Just(Role::System), Just(Role::User), Just(Role::Assistant)],
            "[a-zA-Z0-9 \n\"]{0,30}",
        )
            .prop_map(|(role, content)| Op::Append(role, content)),
        3 => prop_oneof![Just(String::new()), "[a-zA-Z ]{1,20}"].prop_map(Op::SetSystem),
        1 => Just(Op::Reset),
    ]
}

fn apply(conv: &mut Conversation, op: Op) {
    match op {
        // A rejected system append leaves the conversation untouched
        Op::Append(role, content) => {
            let before = conv.len();
            if conv.append(role, content).is_err() {
                assert_eq!(conv.len(), before);
            }
        }
        Op::SetSystem(content) => conv.set_system_prompt(&content),
        Op::Reset => conv.reset(),
    }
}

fn system_only_at_front(conv: &Conversation) -> bool {
    conv.messages()
        .iter()
        .enumerate()
        .all(|(i, m)| m.role != Role::System || i == 0)
}

proptest! {
    #[test]
    fn prop_single_system_message_at_front(ops in proptest::collection::vec(arb_op(), 0..40)) {
        let mut conv = Conversation::new();
        for op in ops {
            apply(&mut conv, op);
            prop_assert!(system_only_at_front(&conv), "bad placement: {:?}", conv);
        }
    }

    #[test]
    fn prop_set_system_prompt_keeps_other_messages(
        ops in proptest::collection::vec(arb_op(), 0..20),
        content in "[a-zA-Z ]{0,20}",
    ) {
        let mut conv = Conversation::new();
        for op in ops {
            apply(&mut conv, op);
        }
        let others: Vec<_> = conv.messages().iter().filter(|m| m.role != Role::System).cloned().collect();
        conv.set_system_prompt(&content);
        let after: Vec<_> = conv.messages().iter().filter(|m| m.role != Role::System).cloned().collect();
        prop_assert_eq!(others, after);
        prop_assert_eq!(conv.system_prompt().is_some(), !content.is_empty());
    }

    #[test]
    fn prop_session_round_trip(ops in proptest::collection::vec(arb_op(), 0..30)) {
        let mut conv = Conversation::new();
        for op in ops {
            apply(&mut conv, op);
        }
        let restored = session::from_json(&session::serialize(&conv).to_json()).unwrap();
        prop_assert_eq!(restored, conv);
    }

    #[test]
    fn prop_render_has_one_entry_per_message(ops in proptest::collection::vec(arb_op(), 0..20)) {
        let mut conv = Conversation::new();
        for op in ops {
            apply(&mut conv, op);
        }
        let text = conv.render().to_string();
        for i in 0..conv.len() {
            let marker = format!("({i}) ");
            prop_assert!(text.contains(&marker));
        }
    }
}
