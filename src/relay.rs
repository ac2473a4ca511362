//! Request handler tying the context cache to resilient completion calls

use crate::cache::{CacheEntry, CacheRequest, ContextStore};
use crate::config::RelayConfig;
use crate::error::{RelayError, Result};
use crate::files::FilePolicy;
use crate::models::{ModelInfo, ModelRegistry};
use crate::retry::{is_retryable, CallError, RetryExecutor};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Text returned in place of an empty completion
pub const EMPTY_RESPONSE_MESSAGE: &str = "The DeepSeek model returned an empty response. \
This might indicate that the model couldn't generate an appropriate response for your query. \
Please try rephrasing your question or providing more context.";

/// A fully resolved outbound completion request
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompletionRequest {
    pub model: String,
    pub system_prompt: String,
    pub query: String,
    pub file_paths: Vec<String>,
    pub temperature: f32,
    pub json_mode: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CompletionResponse {
    pub content: String,
    #[serde(default)]
    pub model: String,
}

impl CompletionResponse {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            model: String::new(),
        }
    }

    /// Completion text, or the fixed explanation when the model said nothing
    pub fn into_text(self) -> String {
        if self.content.trim().is_empty() {
            EMPTY_RESPONSE_MESSAGE.to_string()
        } else {
            self.content
        }
    }
}

/// Outbound completion API
///
/// Implementations report failures as [`CallError`] so the relay can decide
/// what to retry.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        request: &CompletionRequest,
    ) -> std::result::Result<CompletionResponse, CallError>;
}

/// An inbound question
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default)]
pub struct AskRequest {
    pub query: String,
    pub model: Option<String>,
    #[serde(alias = "systemPrompt")]
    pub system_prompt: Option<String>,
    #[serde(alias = "filePaths")]
    pub file_paths: Vec<String>,
    #[serde(alias = "cacheId")]
    pub cache_id: Option<String>,
    #[serde(alias = "jsonMode")]
    pub json_mode: bool,
}

impl AskRequest {
    pub fn new(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            ..Default::default()
        }
    }

    pub fn with_cache_id(mut self, id: impl Into<String>) -> Self {
        self.cache_id = Some(id.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Handles cache management and question answering
pub struct Relay {
    config: RelayConfig,
    models: Arc<ModelRegistry>,
    store: ContextStore,
    files: FilePolicy,
    executor: RetryExecutor,
    backend: Arc<dyn CompletionBackend>,
}

impl Relay {
    /// Create a relay with the built-in model list and a system clock
    pub fn new(config: RelayConfig, backend: Arc<dyn CompletionBackend>) -> Result<Self> {
        config.validate()?;
        let models = Arc::new(ModelRegistry::default());
        let store = ContextStore::new(config.cache.clone(), Arc::clone(&models));
        let executor = RetryExecutor::new(config.retry)?;
        Ok(Self::from_parts(config, models, store, executor, backend))
    }

    /// Assemble a relay from prebuilt parts
    pub fn from_parts(
        config: RelayConfig,
        models: Arc<ModelRegistry>,
        store: ContextStore,
        executor: RetryExecutor,
        backend: Arc<dyn CompletionBackend>,
    ) -> Self {
        info!(
            "Relay ready: model={}, caching={}, max_attempts={}",
            config.model,
            config.cache.enabled,
            executor.policy().max_attempts
        );
        Self {
            files: config.file_policy(),
            config,
            models,
            store,
            executor,
            backend,
        }
    }

    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    pub fn models(&self) -> Vec<ModelInfo> {
        self.models.list()
    }

    pub fn registry(&self) -> &Arc<ModelRegistry> {
        &self.models
    }

    pub async fn create_cache(&self, request: CacheRequest) -> Result<CacheEntry> {
        match self.store.create(request).await {
            Ok(entry) => {
                info!(
                    "Created cache {} for model {} (expires {})",
                    entry.id, entry.model, entry.expires_at
                );
                Ok(entry)
            }
            Err(e) => {
                warn!("Failed to create cache: {}", e);
                Err(e)
            }
        }
    }

    pub async fn get_cache(&self, id: &str) -> Result<CacheEntry> {
        let result = self.store.get(id).await;
        if let Err(e) = &result {
            debug!("Cache lookup for {} failed: {}", id, e);
        }
        result
    }

    /// Answer a question, retrying transient backend failures
    ///
    /// Request fields take precedence over a referenced cache entry, which in
    /// turn takes precedence over the configured defaults. A cache id that is
    /// unknown or expired, or a referenced file outside the configured size
    /// and type limits, fails the call before anything is sent.
    pub async fn ask(&self, request: AskRequest, cancel: &CancellationToken) -> Result<String> {
        if request.query.trim().is_empty() {
            return Err(RelayError::InvalidRequest(
                "query must not be empty".to_string(),
            ));
        }

        let outbound = self.resolve(request).await?;
        self.models.validate(&outbound.model)?;
        if let Err(e) = self.files.check_all(&outbound.file_paths).await {
            warn!("Rejecting query: {}", e);
            return Err(e);
        }

        info!(
            "Sending query to {} ({} file(s), json_mode={})",
            outbound.model,
            outbound.file_paths.len(),
            outbound.json_mode
        );

        let backend = self.backend.as_ref();
        let timeout = self.config.http_timeout;
        let outbound = &outbound;

        let response = self
            .executor
            .execute_observed(
                cancel,
                is_retryable,
                || async move {
                    match tokio::time::timeout(timeout, backend.complete(outbound)).await {
                        Ok(result) => result,
                        Err(_) => Err(CallError::timeout(format!(
                            "request timed out after {:?}",
                            timeout
                        ))),
                    }
                },
                |retry| {
                    info!(
                        "Retrying request after error (attempt {}/{}, backoff {:?}): {}",
                        retry.attempt, retry.max_attempts, retry.delay, retry.error
                    );
                },
            )
            .await
            .map_err(|e| {
                error!("DeepSeek request failed: {}", e);
                RelayError::from(e)
            })?;

        Ok(response.into_text())
    }

    async fn resolve(&self, request: AskRequest) -> Result<CompletionRequest> {
        let cached = match request.cache_id.as_deref().filter(|id| !id.is_empty()) {
            Some(id) => Some(self.get_cache(id).await?),
            None => None,
        };

        let non_empty = |value: Option<String>| value.filter(|v| !v.is_empty());

        let model = non_empty(request.model)
            .or_else(|| cached.as_ref().map(|c| c.model.clone()))
            .unwrap_or_else(|| self.config.model.clone());

        let system_prompt = non_empty(request.system_prompt)
            .or_else(|| {
                cached
                    .as_ref()
                    .map(|c| c.system_prompt.clone())
                    .filter(|p| !p.is_empty())
            })
            .unwrap_or_else(|| self.config.system_prompt.clone());

        let mut file_paths = cached.map(|c| c.file_paths).unwrap_or_default();
        file_paths.extend(request.file_paths);

        Ok(CompletionRequest {
            model,
            system_prompt,
            query: request.query,
            file_paths,
            temperature: self.config.temperature,
            json_mode: request.json_mode,
        })
    }
}
