//! Chat session controller
//!
//! A [`ChatSession`] exclusively owns one conversation, its usage counters
//! and the state machine driving them. Every mutation goes through
//! [`transition`] and is applied here as effects. Sessions share nothing but
//! the read-only model registry.

#[cfg(test)]
pub(crate) mod testing;

use crate::config::ChatConfig;
use crate::conversation::{Conversation, Message, Role};
use crate::error::{ChatError, Result};
use crate::models::{self, ModelSpec, TokenizerFamily};
use crate::prompts::PromptCatalog;
use crate::session;
use crate::state_machine::{
    transition, ChatContext, ChatState, Effect, Event, InstructPolicy, TransitionResult,
    TruncationWarning,
};
use crate::tokens::{estimate_cost, Encoder, TokenCounter, TokenEstimate, UsageCounters};
use crate::transport::{
    CompletionRequest, CompletionResult, CompletionTransport, Prompt, Temperature, TransportError,
};
use std::fmt;
use std::path::Path;
use std::sync::Arc;

/// Outcome of a turn that did not fail
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The reply was appended to the conversation
    Completed { reply: String },
    /// The backend hit a token limit; nothing was appended
    Truncated(TruncationWarning),
}

/// Token usage against the model's limits, for display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UsageReport {
    pub usage: UsageCounters,
    pub context_window: u32,
    pub cost: f64,
}

impl fmt::Display for UsageReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let u = &self.usage;
        writeln!(
            f,
            "Tokens last iteration : Prompt {}T + Completion {}T = {}T / {}T (maximum)",
            u.prompt_tokens_last,
            u.completion_tokens_last,
            u.last_turn_tokens(),
            self.context_window
        )?;
        write!(
            f,
            "Total tokens used : Prompt {}T + Completion {}T (${:.4})",
            u.prompt_tokens_total, u.completion_tokens_total, self.cost
        )
    }
}

/// One independent chat session
pub struct ChatSession {
    context: ChatContext,
    state: ChatState,
    conversation: Conversation,
    usage: UsageCounters,
    counter: TokenCounter,
    /// Test or custom encoder used for every family instead of the BPE
    encoder_override: Option<Arc<dyn Encoder>>,
    temperature: Temperature,
    catalog: PromptCatalog,
}

impl ChatSession {
    /// New empty session for a registered model
    pub fn new(model_id: &str) -> Result<Self> {
        let model = models::resolve(model_id)?;
        Ok(Self::with_counter(model, TokenCounter::new(model.family)?))
    }

    /// New session using `encoder` for token counting in every family
    pub fn with_encoder(model_id: &str, encoder: Arc<dyn Encoder>) -> Result<Self> {
        let model = models::resolve(model_id)?;
        let counter = TokenCounter::with_encoder(model.family, Arc::clone(&encoder));
        let mut session = Self::with_counter(model, counter);
        session.encoder_override = Some(encoder);
        Ok(session)
    }

    fn with_counter(model: &'static ModelSpec, counter: TokenCounter) -> Self {
        Self {
            context: ChatContext::new(model, InstructPolicy::default()),
            state: ChatState::Idle,
            conversation: Conversation::new(),
            usage: UsageCounters::new(),
            counter,
            encoder_override: None,
            temperature: Temperature::default(),
            catalog: PromptCatalog::new(),
        }
    }

    /// Build a session from configuration: model, catalog, temperature, policy.
    pub fn from_config(config: &ChatConfig) -> Result<Self> {
        let model_id = config
            .model
            .as_deref()
            .unwrap_or(models::default_model().id);
        let catalog = PromptCatalog::load(&config.prompts_path)?;
        let session = Self::new(model_id)?
            .with_instruct_policy(config.instruct_policy)
            .with_temperature(config.temperature.value())
            .with_catalog(catalog);
        tracing::info!(
            model = %session.model().id,
            prompts = session.catalog.len(),
            seeded = session.conversation.system_prompt().is_some(),
            "Chat session created"
        );
        Ok(session)
    }

    /// Attach a prompt catalog, seeding its default prompt into an empty session
    #[must_use]
    pub fn with_catalog(mut self, catalog: PromptCatalog) -> Self {
        if self.conversation.is_empty() {
            if let Some(prompt) = catalog.default_prompt() {
                self.conversation.set_system_prompt(&prompt.content);
            }
        }
        self.catalog = catalog;
        self
    }

    #[must_use]
    pub fn with_instruct_policy(mut self, policy: InstructPolicy) -> Self {
        self.context.instruct_policy = policy;
        self
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f64) -> Self {
        self.set_temperature(temperature);
        self
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    pub fn model(&self) -> &'static ModelSpec {
        self.context.model
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn conversation(&self) -> &Conversation {
        &self.conversation
    }

    pub fn usage(&self) -> &UsageCounters {
        &self.usage
    }

    pub fn catalog(&self) -> &PromptCatalog {
        &self.catalog
    }

    pub fn temperature(&self) -> Temperature {
        self.temperature
    }

    /// Out-of-range values are clamped, never rejected
    pub fn set_temperature(&mut self, temperature: f64) {
        self.temperature = Temperature::new(temperature);
    }

    pub fn is_submission_locked(&self) -> bool {
        self.context.submission_locked
    }

    // ------------------------------------------------------------------
    // Turn handling
    // ------------------------------------------------------------------

    /// Append an utterance and produce the request for the transport.
    ///
    /// The session then waits in `AwaitingCompletion` until [`Self::complete`],
    /// [`Self::fail`] or [`Self::reset`].
    pub fn submit(&mut self, role: Role, content: impl Into<String>) -> Result<CompletionRequest> {
        let result = self.step(Event::Submit {
            role,
            content: content.into(),
        })?;
        self.apply(result)?.ok_or_else(|| {
            ChatError::InvalidTransition("submission produced no completion request".to_string())
        })
    }

    /// Consume the transport's result for the in-flight request.
    ///
    /// `stop` appends the reply and records usage. `length` yields a
    /// truncation warning and only updates the last-turn counts. Any other
    /// reason is a [`ChatError::Completion`].
    pub fn complete(&mut self, result: CompletionResult) -> Result<TurnOutcome> {
        let step = self.step(Event::Completion(result))?;
        self.apply(step)?;

        match &self.state {
            ChatState::Warned { warning } => {
                tracing::warn!(model = %self.model().id, "{warning}");
                Ok(TurnOutcome::Truncated(warning.clone()))
            }
            ChatState::Failed { message } => {
                tracing::error!(model = %self.model().id, error = %message, "Completion failed");
                Err(ChatError::Completion(message.clone()))
            }
            ChatState::Idle | ChatState::AwaitingCompletion => {
                let reply = self
                    .conversation
                    .messages()
                    .last()
                    .map(|m| m.content.clone())
                    .unwrap_or_default();
                tracing::info!(
                    model = %self.model().id,
                    prompt_tokens = self.usage.prompt_tokens_last,
                    completion_tokens = self.usage.completion_tokens_last,
                    messages = self.conversation.len(),
                    "Turn completed"
                );
                Ok(TurnOutcome::Completed { reply })
            }
        }
    }

    /// Record a transport failure for the in-flight request.
    ///
    /// Returns the error to surface: [`ChatError::Completion`] normally, or
    /// the rejection if no request was in flight.
    pub fn fail(&mut self, error: TransportError) -> ChatError {
        let message = error.message;
        match self.step(Event::TransportFailed {
            message: message.clone(),
        }) {
            Ok(result) => {
                if let Err(e) = self.apply(result) {
                    return e;
                }
                tracing::error!(model = %self.model().id, error = %message, "Transport failed");
                ChatError::Completion(message)
            }
            Err(e) => e,
        }
    }

    /// Run one full turn through `transport`
    pub async fn run_turn(
        &mut self,
        transport: &dyn CompletionTransport,
        role: Role,
        content: impl Into<String>,
    ) -> Result<TurnOutcome> {
        let request = self.submit(role, content)?;
        match transport.complete(&request).await {
            Ok(result) => self.complete(result),
            Err(e) => Err(self.fail(e)),
        }
    }

    // ------------------------------------------------------------------
    // Session edits
    // ------------------------------------------------------------------

    /// Clear conversation, counters and any submission lock, from any state
    pub fn reset(&mut self) {
        // Reset is accepted from every state
        if let Ok(result) = self.step(Event::Reset) {
            let applied = self.apply(result);
            debug_assert!(applied.is_ok(), "reset effects failed: {applied:?}");
        }
    }

    /// Switch to another registered model and start over
    pub fn change_model(&mut self, model_id: &str) -> Result<&'static ModelSpec> {
        let model = models::resolve(model_id)?;
        let counter = self.counter_for(model.family)?;
        let result = self.step(Event::ChangeModel { model })?;
        self.apply(result)?;
        self.counter = counter;
        tracing::info!(model = %model.id, mode = %model.mode, "Model changed");
        Ok(model)
    }

    /// Cycle to the next model in registry order
    pub fn next_model(&mut self) -> Result<&'static ModelSpec> {
        let next = models::next(self.model().id)?;
        self.change_model(next.id)
    }

    pub fn set_system_prompt(&mut self, content: &str) -> Result<()> {
        let result = self.step(Event::SetSystemPrompt {
            content: content.to_string(),
        })?;
        self.apply(result)?;
        Ok(())
    }

    /// Apply a named prompt from the catalog
    pub fn select_prompt(&mut self, name: &str) -> Result<()> {
        let content = self
            .catalog
            .get(name)
            .map(|p| p.content.clone())
            .ok_or_else(|| ChatError::UnknownPrompt(name.to_string()))?;
        self.set_system_prompt(&content)
    }

    /// Replace the conversation wholesale, zeroing counters
    pub fn restore(&mut self, conversation: Conversation) -> Result<()> {
        let result = self.step(Event::Restore { conversation })?;
        self.apply(result)?;
        Ok(())
    }

    /// Load a session file. A malformed file leaves the session untouched.
    pub fn load(&mut self, path: &Path) -> Result<()> {
        if !self.state.is_idle() {
            return Err(ChatError::Busy);
        }
        let conversation = session::load_session(path)?;
        self.restore(conversation)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        session::save_session(path, &self.conversation)
    }

    // ------------------------------------------------------------------
    // Accounting
    // ------------------------------------------------------------------

    /// Tokens the current conversation costs as a prompt
    pub fn count_tokens(&self) -> usize {
        self.counter.count(self.conversation.messages())
    }

    /// What submitting `input` would add, next to the last turn's usage
    pub fn estimate_input(&self, input: &str) -> TokenEstimate {
        let this_prompt = self.counter.count(&[Message::user(input)]);
        TokenEstimate {
            past_dialogue: self.usage.last_turn_tokens(),
            this_prompt: u64::try_from(this_prompt).unwrap_or(u64::MAX),
        }
    }

    /// Session cost at the model's prices
    pub fn cost(&self) -> f64 {
        let pricing = self.model().pricing;
        estimate_cost(
            &self.usage,
            pricing.prompt_per_token,
            pricing.completion_per_token,
        )
    }

    pub fn usage_report(&self) -> UsageReport {
        UsageReport {
            usage: self.usage,
            context_window: self.model().context_window,
            cost: self.cost(),
        }
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn step(&self, event: Event) -> Result<TransitionResult> {
        transition(&self.state, &self.context, event).map_err(|e| {
            tracing::debug!(state = self.state.name(), error = %e, "Transition rejected");
            ChatError::from(e)
        })
    }

    fn counter_for(&self, family: TokenizerFamily) -> Result<TokenCounter> {
        match &self.encoder_override {
            Some(encoder) => Ok(TokenCounter::with_encoder(family, Arc::clone(encoder))),
            None => TokenCounter::new(family),
        }
    }

    /// Apply effects, then enter the new state. Returns the completion request
    /// if one was produced.
    fn apply(&mut self, result: TransitionResult) -> Result<Option<CompletionRequest>> {
        let mut request = None;
        for effect in result.effects {
            match effect {
                Effect::AppendMessage { role, content } => {
                    self.conversation.append(role, content)?;
                }
                Effect::SetSystemPrompt { content } => {
                    self.conversation.set_system_prompt(&content);
                }
                Effect::RequestCompletion { utterance } => {
                    request = Some(self.build_request(utterance));
                }
                Effect::RecordUsage {
                    prompt_tokens,
                    completion_tokens,
                } => {
                    self.usage.record_turn(prompt_tokens, completion_tokens);
                }
                Effect::RecordLastTurn {
                    prompt_tokens,
                    completion_tokens,
                } => {
                    self.usage.set_last(prompt_tokens, completion_tokens);
                }
                Effect::LockSubmission => {
                    tracing::info!(model = %self.model().id, "Submission locked until reset");
                    self.context.submission_locked = true;
                }
                Effect::ResetSession => {
                    self.conversation.reset();
                    self.usage.reset_counters();
                    self.context.submission_locked = false;
                }
                Effect::SwitchModel { model } => {
                    self.context.model = model;
                }
                Effect::ReplaceConversation { conversation } => {
                    self.conversation = conversation;
                }
            }
        }
        self.state = result.new_state;
        Ok(request)
    }

    fn build_request(&self, utterance: String) -> CompletionRequest {
        let prompt = match self.model().mode {
            models::InteractionMode::Chat => Prompt::Chat(self.conversation.messages().to_vec()),
            models::InteractionMode::Instruct => Prompt::Instruct(utterance),
        };
        CompletionRequest {
            model: self.model().id,
            temperature: self.temperature,
            prompt,
        }
    }
}

impl fmt::Debug for ChatSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatSession")
            .field("model", &self.context.model.id)
            .field("state", &self.state)
            .field("messages", &self.conversation.len())
            .field("usage", &self.usage)
            .finish_non_exhaustive()
    }
}
