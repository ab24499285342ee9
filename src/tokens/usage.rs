//! Usage counters and cost derivation

use serde::{Deserialize, Serialize};

/// Prompt/completion token counts for the last turn and the whole session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageCounters {
    pub prompt_tokens_last: u64,
    pub completion_tokens_last: u64,
    pub prompt_tokens_total: u64,
    pub completion_tokens_total: u64,
}

impl UsageCounters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the last-turn counts and add them to the totals
    pub fn record_turn(&mut self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens_last = prompt_tokens;
        self.completion_tokens_last = completion_tokens;
        self.prompt_tokens_total = self.prompt_tokens_total.saturating_add(prompt_tokens);
        self.completion_tokens_total = self
            .completion_tokens_total
            .saturating_add(completion_tokens);
    }

    /// Replace the last-turn counts, leaving the totals as they are
    pub fn set_last(&mut self, prompt_tokens: u64, completion_tokens: u64) {
        self.prompt_tokens_last = prompt_tokens;
        self.completion_tokens_last = completion_tokens;
    }

    pub fn reset_counters(&mut self) {
        *self = Self::default();
    }

    /// Tokens used by the last turn (prompt + completion)
    pub fn last_turn_tokens(&self) -> u64 {
        self.prompt_tokens_last
            .saturating_add(self.completion_tokens_last)
    }

    pub fn total_tokens(&self) -> u64 {
        self.prompt_tokens_total
            .saturating_add(self.completion_tokens_total)
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::default()
    }
}

/// Cost of the session totals at the given per-token prices. No rounding.
#[allow(clippy::cast_precision_loss)] // token totals are far below 2^52
pub fn estimate_cost(
    counters: &UsageCounters,
    price_per_prompt_token: f64,
    price_per_completion_token: f64,
) -> f64 {
    counters.prompt_tokens_total as f64 * price_per_prompt_token
        + counters.completion_tokens_total as f64 * price_per_completion_token
}

/// Token estimate for a pending input, before it is submitted
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenEstimate {
    /// Tokens used by the last turn
    pub past_dialogue: u64,
    /// Tokens the pending input costs as a single user message
    pub this_prompt: u64,
}

impl TokenEstimate {
    pub fn total(&self) -> u64 {
        self.past_dialogue.saturating_add(self.this_prompt)
    }
}
