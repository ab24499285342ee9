//! Session codec
//!
//! The persisted form of a conversation is a bare JSON array of
//! `{"content": ..., "role": ...}` objects: no wrapper, no metadata, no
//! schema version. Array order is conversation order; only the key order
//! inside each object is sorted.
//!
//! Loading validates the whole document before a [`Conversation`] is built,
//! so a malformed file never replaces existing state.

use crate::conversation::{Conversation, Message, Role};
use crate::error::{ChatError, Result};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};

const SESSION_EXTENSION: &str = "json";

/// Serializable snapshot of a conversation.
///
/// Built only by [`serialize`]; reading goes through [`deserialize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionRecord {
    pub messages: Vec<Message>,
}

impl Serialize for SessionRecord {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.to_value().serialize(serializer)
    }
}

impl SessionRecord {
    /// Canonical JSON value: an array of objects with sorted keys
    pub fn to_value(&self) -> Value {
        Value::Array(
            self.messages
                .iter()
                .map(|m| {
                    let mut obj = Map::new();
                    obj.insert("content".to_string(), Value::String(m.content.clone()));
                    obj.insert("role".to_string(), Value::String(m.role.as_str().to_string()));
                    Value::Object(obj)
                })
                .collect(),
        )
    }

    /// Pretty-printed JSON text, as written to session files
    pub fn to_json(&self) -> String {
        format!("{:#}", self.to_value())
    }
}

/// Snapshot a conversation in conversation order
pub fn serialize(conversation: &Conversation) -> SessionRecord {
    SessionRecord {
        messages: conversation.messages().to_vec(),
    }
}

/// Build a conversation from a session document.
///
/// Every element must be an object with string `role` and `content`, and
/// `role` must be one of the three known roles. Other keys are ignored.
pub fn deserialize(record: &Value) -> Result<Conversation> {
    let items = record
        .as_array()
        .ok_or_else(|| ChatError::malformed("expected a JSON array of messages"))?;

    let mut messages = Vec::with_capacity(items.len());
    for (index, item) in items.iter().enumerate() {
        let obj = item
            .as_object()
            .ok_or_else(|| ChatError::malformed(format!("message {index}: not an object")))?;
        let role = string_field(obj, "role", index)?;
        let role = Role::parse(role).ok_or_else(|| {
            ChatError::malformed(format!("message {index}: unknown role {role:?}"))
        })?;
        let content = string_field(obj, "content", index)?;
        messages.push(Message::new(role, content));
    }

    Conversation::from_messages(messages)
}

fn string_field<'a>(obj: &'a Map<String, Value>, key: &str, index: usize) -> Result<&'a str> {
    match obj.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ChatError::malformed(format!(
            "message {index}: `{key}` is not a string"
        ))),
        None => Err(ChatError::malformed(format!(
            "message {index}: missing `{key}`"
        ))),
    }
}

/// Parse session JSON text
pub fn from_json(text: &str) -> Result<Conversation> {
    let value: Value = serde_json::from_str(text)
        .map_err(|e| ChatError::malformed(format!("invalid JSON: {e}")))?;
    deserialize(&value)
}

/// Write a conversation to `path`, creating parent directories.
pub fn save_session(path: &Path, conversation: &Conversation) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| ChatError::io(parent, e))?;
    }
    std::fs::write(path, serialize(conversation).to_json()).map_err(|e| ChatError::io(path, e))?;
    tracing::info!(path = %path.display(), messages = conversation.len(), "Saved session");
    Ok(())
}

/// Read and validate a session file
pub fn load_session(path: &Path) -> Result<Conversation> {
    let text = std::fs::read_to_string(path).map_err(|e| ChatError::io(path, e))?;
    let conversation = from_json(&text)?;
    tracing::info!(path = %path.display(), messages = conversation.len(), "Loaded session");
    Ok(conversation)
}

/// Path for a named session inside `dir`, adding the `.json` extension when absent
pub fn session_path(dir: &Path, name: &str) -> PathBuf {
    let path = dir.join(name);
    if path.extension().is_some() {
        path
    } else {
        path.with_extension(SESSION_EXTENSION)
    }
}
