//! Conversation state: the ordered, role-tagged message list
//!
//! Insertion order is the conversation order and is replayed verbatim to the
//! backend. At most one `system` message exists and, when present, it sits
//! at index 0.

use crate::error::{ChatError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

#[cfg(test)]
mod proptests;

/// Message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }

    /// Parse a wire role name; only the three lower-case names are accepted
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "system" => Some(Role::System),
            "user" => Some(Role::User),
            "assistant" => Some(Role::Assistant),
            _ => None,
        }
    }

    fn heading(self) -> &'static str {
        match self {
            Role::System => "SYSTEM",
            Role::User => "USER",
            Role::Assistant => "ASSISTANT",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single role-tagged message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// Ordered message list owned by a single session
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a conversation from existing messages, checking system placement.
    pub fn from_messages(messages: Vec<Message>) -> Result<Self> {
        if let Some(index) = messages
            .iter()
            .enumerate()
            .skip(1)
            .find_map(|(i, m)| (m.role == Role::System).then_some(i))
        {
            return Err(ChatError::malformed(format!(
                "message {index}: system message must be the first message"
            )));
        }
        Ok(Self { messages })
    }

    /// Add a message at the end. Content is not validated.
    ///
    /// A `system` message can only be appended to an empty conversation;
    /// use [`Self::set_system_prompt`] otherwise.
    pub fn append(&mut self, role: Role, content: impl Into<String>) -> Result<()> {
        if role == Role::System && !self.messages.is_empty() {
            return Err(ChatError::MisplacedSystemMessage);
        }
        self.messages.push(Message::new(role, content));
        Ok(())
    }

    /// Replace the system prompt. Empty content only removes.
    pub fn set_system_prompt(&mut self, content: &str) {
        if self.system_prompt().is_some() {
            self.messages.remove(0);
        }
        if !content.is_empty() {
            self.messages.insert(0, Message::system(content));
        }
    }

    pub fn system_prompt(&self) -> Option<&str> {
        self.messages
            .first()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
    }

    pub fn reset(&mut self) {
        self.messages.clear();
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Human-readable transcript, formatted when displayed
    pub fn render(&self) -> Transcript<'_> {
        Transcript {
            messages: &self.messages,
        }
    }
}

/// Lazy transcript view over a conversation.
///
/// Each message renders as `(index) ROLE : content` followed by a blank line.
#[derive(Debug, Clone, Copy)]
pub struct Transcript<'a> {
    messages: &'a [Message],
}

impl fmt::Display for Transcript<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, message) in self.messages.iter().enumerate() {
            write!(f, "({i}) {} : {}\n\n", message.role.heading(), message.content)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Conversation {
        let mut conv = Conversation::new();
        conv.append(Role::User, "Hello").unwrap();
        conv.append(Role::Assistant, "Hi there").unwrap();
        conv
    }

    #[test]
    fn test_append_preserves_order() {
        let conv = sample();
        assert_eq!(
            conv.messages(),
            &[Message::user("Hello"), Message::assistant("Hi there")]
        );
    }

    #[test]
    fn test_append_accepts_empty_content() {
        let mut conv = Conversation::new();
        conv.append(Role::User, "").unwrap();
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_append_system_only_when_empty() {
        let mut conv = Conversation::new();
        conv.append(Role::System, "be brief").unwrap();
        assert!(matches!(
            conv.append(Role::System, "again"),
            Err(ChatError::MisplacedSystemMessage)
        ));
        assert_eq!(conv.len(), 1);
    }

    #[test]
    fn test_set_system_prompt_inserts_at_front() {
        let mut conv = sample();
        conv.set_system_prompt("You are terse");
        assert_eq!(conv.messages()[0], Message::system("You are terse"));
        assert_eq!(conv.len(), 3);
    }

    #[test]
    fn test_set_system_prompt_replaces_existing() {
        let mut conv = sample();
        conv.set_system_prompt("first");
        conv.set_system_prompt("second");
        assert_eq!(conv.system_prompt(), Some("second"));
        assert_eq!(conv.len(), 3);
    }

    #[test]
    fn test_set_system_prompt_empty_only_removes() {
        let mut conv = sample();
        conv.set_system_prompt("");
        assert_eq!(conv.len(), 2);

        conv.set_system_prompt("persona");
        conv.set_system_prompt("");
        assert_eq!(conv.system_prompt(), None);
        assert_eq!(conv, sample());
    }

    #[test]
    fn test_render_format() {
        let mut conv = sample();
        conv.set_system_prompt("Be nice");
        assert_eq!(
            conv.render().to_string(),
            "(0) SYSTEM : Be nice\n\n(1) USER : Hello\n\n(2) ASSISTANT : Hi there\n\n"
        );
    }

    #[test]
    fn test_render_reflects_current_state() {
        let mut conv = sample();
        let before = conv.render().to_string();
        assert_eq!(before, conv.render().to_string());
        conv.append(Role::User, "More").unwrap();
        assert!(conv.render().to_string().ends_with("(2) USER : More\n\n"));
        conv.reset();
        assert_eq!(conv.render().to_string(), "");
    }

    #[test]
    fn test_from_messages_rejects_late_system() {
        let err = Conversation::from_messages(vec![
            Message::user("hi"),
            Message::system("late"),
        ])
        .unwrap_err();
        assert!(matches!(err, ChatError::MalformedSession(reason) if reason.starts_with("message 1")));
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(Role::parse("assistant"), Some(Role::Assistant));
        assert_eq!(Role::parse("USER"), None);
        assert_eq!(Role::parse("tool"), None);
    }
}
