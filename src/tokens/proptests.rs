//! Property-based tests for token accounting

use super::*;
use crate::conversation::Role;
use proptest::prelude::*;

fn arb_family() -> impl Strategy<Value = TokenizerFamily> {
    prop_oneof![Just(TokenizerFamily::Gpt35), Just(TokenizerFamily::Gpt4)]
}

fn arb_message() -> impl Strategy<Value = Message> {
    (
        prop_oneof![Just(Role::System), Just(Role::User), Just(Role::Assistant)],
        "[a-zA-Z .,!?]{0,60}",
    )
        .prop_map(|(role, content)| Message::new(role, content))
}

proptest! {
    // Longer content never reduces the count
    #[test]
    fn prop_count_monotonic_in_content(
        family in arb_family(),
        base in "[a-z ]{0,40}",
        suffix in "[a-z ]{0,40}",
    ) {
        let short = [Message::user(base.clone())];
        let long = [Message::user(format!("{base}{suffix}"))];
        prop_assert!(
            count_tokens_with(&WordEncoder, &long, family)
                >= count_tokens_with(&WordEncoder, &short, family)
        );
    }

    // Each message adds exactly the family overhead plus its encoded length
    #[test]
    fn prop_count_is_additive(
        family in arb_family(),
        messages in proptest::collection::vec(arb_message(), 0..8),
    ) {
        let per_message = usize::try_from(family.overhead().tokens_per_message).unwrap();
        let expected = messages
            .iter()
            .map(|m| per_message + WordEncoder.encoded_len(&m.content))
            .sum::<usize>()
            + REPLY_PRIMING_TOKENS;
        prop_assert_eq!(count_tokens_with(&WordEncoder, &messages, family), expected);
    }

    // Switching families only changes the per-message constant
    #[test]
    fn prop_family_difference_is_one_per_message(
        messages in proptest::collection::vec(arb_message(), 0..8),
    ) {
        let gpt35 = count_tokens_with(&WordEncoder, &messages, TokenizerFamily::Gpt35);
        let gpt4 = count_tokens_with(&WordEncoder, &messages, TokenizerFamily::Gpt4);
        prop_assert_eq!(gpt35 - gpt4, messages.len());
    }

    #[test]
    fn prop_totals_are_sums_of_turns(
        turns in proptest::collection::vec((0u64..100_000, 0u64..100_000), 1..10),
    ) {
        let mut usage = UsageCounters::new();
        for (p, c) in &turns {
            usage.record_turn(*p, *c);
        }
        let last = turns[turns.len() - 1];
        prop_assert_eq!((usage.prompt_tokens_last, usage.completion_tokens_last), last);
        prop_assert_eq!(usage.prompt_tokens_total, turns.iter().map(|t| t.0).sum::<u64>());
        prop_assert_eq!(usage.completion_tokens_total, turns.iter().map(|t| t.1).sum::<u64>());
    }
}
