//! Registry of DeepSeek models the relay accepts
//!
//! Cache creation and `ask` requests name a model by id; the registry is the
//! single authority on which ids are valid. It starts with the built-in list
//! and can be refreshed from the upstream model listing at runtime.

use crate::error::{RelayError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::sync::RwLock;

/// Information about a DeepSeek model
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub id: String,
    pub name: String,
    pub description: String,
    /// Whether the model supports context caching (versioned ids do)
    pub supports_caching: bool,
}

impl ModelInfo {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        description: impl Into<String>,
        supports_caching: bool,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            description: description.into(),
            supports_caching,
        }
    }

    /// Build an entry for an id discovered from the upstream listing
    pub fn discovered(id: &str, owned_by: &str) -> Self {
        Self::new(
            id,
            display_name(id),
            format!("Model provided by {}", owned_by),
            has_version_suffix(id),
        )
    }
}

/// Models shipped with the relay
pub fn builtin_models() -> Vec<ModelInfo> {
    vec![
        ModelInfo::new(
            "deepseek-chat",
            "DeepSeek Chat",
            "General-purpose chat model from DeepSeek, balancing performance and efficiency",
            false,
        ),
        ModelInfo::new(
            "deepseek-coder",
            "DeepSeek Coder",
            "Specialized model for coding and technical tasks",
            false,
        ),
        ModelInfo::new(
            "deepseek-reasoner",
            "DeepSeek Reasoner",
            "Model optimized for reasoning and problem-solving tasks",
            false,
        ),
        ModelInfo::new(
            "deepseek-chat-001",
            "DeepSeek Chat (Stable)",
            "Stable version of DeepSeek Chat with version suffix",
            true,
        ),
        ModelInfo::new(
            "deepseek-coder-001",
            "DeepSeek Coder (Stable)",
            "Stable version of DeepSeek Coder with version suffix",
            true,
        ),
    ]
}

/// Turn `deepseek-chat` into `Deepseek Chat`
pub fn display_name(model_id: &str) -> String {
    model_id
        .split('-')
        .map(|part| {
            let mut chars = part.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn has_version_suffix(model_id: &str) -> bool {
    model_id
        .rsplit('-')
        .next()
        .map(|tail| !tail.is_empty() && tail.bytes().all(|b| b.is_ascii_digit()))
        .unwrap_or(false)
}

/// Thread-safe model registry
#[derive(Debug)]
pub struct ModelRegistry {
    models: RwLock<Vec<ModelInfo>>,
}

impl Default for ModelRegistry {
    fn default() -> Self {
        Self::new(builtin_models())
    }
}

impl ModelRegistry {
    pub fn new(models: Vec<ModelInfo>) -> Self {
        Self {
            models: RwLock::new(models),
        }
    }

    /// Look up a model by id
    pub fn get(&self, model_id: &str) -> Option<ModelInfo> {
        self.read().iter().find(|m| m.id == model_id).cloned()
    }

    pub fn contains(&self, model_id: &str) -> bool {
        self.read().iter().any(|m| m.id == model_id)
    }

    /// Snapshot of every registered model
    pub fn list(&self) -> Vec<ModelInfo> {
        self.read().clone()
    }

    /// Check that a model id is non-empty and registered
    ///
    /// The error message lists the available models so it can be shown to
    /// the user as-is.
    pub fn validate(&self, model_id: &str) -> Result<()> {
        if model_id.is_empty() {
            return Err(RelayError::InvalidModel("model is required".to_string()));
        }

        let models = self.read();
        if models.iter().any(|m| m.id == model_id) {
            return Ok(());
        }

        let mut message = format!("Invalid model ID: {}. Available models are:", model_id);
        for model in models.iter() {
            let _ = write!(message, "\n- {}: {}", model.id, model.name);
        }
        Err(RelayError::InvalidModel(message))
    }

    /// Replace the registered models, e.g. after querying the upstream listing
    ///
    /// An empty list is ignored so a failed discovery keeps the current set.
    /// Returns the number of models now registered.
    pub fn replace(&self, models: Vec<ModelInfo>) -> usize {
        let mut current = self.models.write().unwrap_or_else(|e| e.into_inner());
        if !models.is_empty() {
            *current = models;
        }
        current.len()
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, Vec<ModelInfo>> {
        self.models.read().unwrap_or_else(|e| e.into_inner())
    }
}
