//! Environment configuration

use crate::state_machine::InstructPolicy;
use crate::transport::Temperature;
use std::path::PathBuf;

const DEFAULT_PROMPTS_PATH: &str = "system.json";
const DEFAULT_CHATS_DIR: &str = "chats";

/// Session configuration
#[derive(Debug, Clone, PartialEq)]
pub struct ChatConfig {
    /// Initial model id; `None` selects the first registry entry
    pub model: Option<String>,
    /// Prompt catalog file (optional on disk)
    pub prompts_path: PathBuf,
    /// Default directory for saved sessions
    pub chats_dir: PathBuf,
    pub temperature: Temperature,
    pub instruct_policy: InstructPolicy,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            model: None,
            prompts_path: PathBuf::from(DEFAULT_PROMPTS_PATH),
            chats_dir: PathBuf::from(DEFAULT_CHATS_DIR),
            temperature: Temperature::default(),
            instruct_policy: InstructPolicy::default(),
        }
    }
}

impl ChatConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable source. Unparseable values fall back
    /// to the defaults with a warning.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let temperature = lookup("LLMCHAT_TEMPERATURE")
            .and_then(|t| match t.parse::<f64>() {
                Ok(v) => Some(Temperature::new(v)),
                Err(_) => {
                    tracing::warn!(value = %t, "Ignoring invalid LLMCHAT_TEMPERATURE");
                    None
                }
            })
            .unwrap_or(defaults.temperature);

        let instruct_policy = lookup("LLMCHAT_INSTRUCT_POLICY")
            .and_then(|p| {
                p.parse::<InstructPolicy>()
                    .map_err(|e| tracing::warn!(error = %e, "Ignoring LLMCHAT_INSTRUCT_POLICY"))
                    .ok()
            })
            .unwrap_or(defaults.instruct_policy);

        Self {
            model: lookup("LLMCHAT_MODEL").filter(|m| !m.is_empty()),
            prompts_path: lookup("LLMCHAT_PROMPTS").map_or(defaults.prompts_path, PathBuf::from),
            chats_dir: lookup("LLMCHAT_CHATS_DIR").map_or(defaults.chats_dir, PathBuf::from),
            temperature,
            instruct_policy,
        }
    }
}
