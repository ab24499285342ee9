//! Named system prompt catalog
//!
//! The catalog file is a JSON array of `{"name", "content", "default"}`
//! entries. `default` may be a boolean or the strings `"True"`/`"False"`.
//! A missing file is not an error: the catalog is simply empty.

use crate::error::{ChatError, Result};
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// A catalog entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemPrompt {
    pub name: String,
    pub content: String,
    pub is_default: bool,
}

#[derive(Debug, Deserialize)]
struct CatalogEntry {
    name: String,
    content: String,
    #[serde(default, deserialize_with = "deserialize_flag")]
    default: bool,
}

fn deserialize_flag<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Text(String),
    }

    Ok(match Flag::deserialize(deserializer)? {
        Flag::Bool(b) => b,
        Flag::Text(s) => s == "True",
    })
}

/// Named system prompts, in file order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptCatalog {
    prompts: Vec<SystemPrompt>,
}

impl PromptCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the catalog at `path`, or an empty catalog if the file does not exist.
    pub fn load(path: &Path) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => {
                let catalog = Self::from_json(&text).map_err(|reason| ChatError::MalformedCatalog {
                    path: path.to_path_buf(),
                    reason,
                })?;
                tracing::debug!(path = %path.display(), prompts = catalog.len(), "Loaded prompt catalog");
                Ok(catalog)
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No prompt catalog, starting empty");
                Ok(Self::new())
            }
            Err(e) => Err(ChatError::io(path, e)),
        }
    }

    fn from_json(text: &str) -> Result<Self, String> {
        let entries: Vec<CatalogEntry> = serde_json::from_str(text).map_err(|e| e.to_string())?;
        let mut catalog = Self::new();
        for entry in entries {
            catalog.insert(SystemPrompt {
                name: entry.name,
                content: entry.content,
                is_default: entry.default,
            });
        }
        Ok(catalog)
    }

    /// Add a prompt, replacing any prompt with the same name
    pub fn insert(&mut self, prompt: SystemPrompt) {
        if let Some(existing) = self.prompts.iter_mut().find(|p| p.name == prompt.name) {
            *existing = prompt;
        } else {
            self.prompts.push(prompt);
        }
    }

    pub fn get(&self, name: &str) -> Option<&SystemPrompt> {
        self.prompts.iter().find(|p| p.name == name)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.prompts.iter().map(|p| p.name.as_str())
    }

    /// The prompt to seed new sessions with: the last default entry with content
    pub fn default_prompt(&self) -> Option<&SystemPrompt> {
        self.prompts
            .iter()
            .rev()
            .find(|p| p.is_default && !p.content.is_empty())
    }

    pub fn len(&self) -> usize {
        self.prompts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prompts.is_empty()
    }
}
