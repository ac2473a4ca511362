//! # DeepSeek Relay (deepseek-relay)
//!
//! A request relay that sits between callers and the DeepSeek completion API.
//!
//! ## Features
//!
//! - Ephemeral context cache with per-entry TTL and lazy expiration
//! - Bounded retries with exponential backoff and jitter
//! - Cancellation of pending retries through a `CancellationToken`
//! - Distinct `NotFound` and `Expired` outcomes for cache lookups
//! - Size and type limits on referenced files
//! - Configuration from `DEEPSEEK_*` environment variables
//!
//! ## Context Cache
//!
//! ```no_run
//! use deepseek_relay::{ModelRegistry, RelayConfig};
//! use deepseek_relay::cache::{CacheRequest, ContextStore};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = RelayConfig::from_env()?;
//!     let store = ContextStore::new(config.cache.clone(), Arc::new(ModelRegistry::default()));
//!
//!     let entry = store
//!         .create(
//!             CacheRequest::new("deepseek-chat")
//!                 .with_system_prompt("Review this crate.")
//!                 .with_file_paths(["src/lib.rs"])
//!                 .with_ttl("30m"),
//!         )
//!         .await?;
//!
//!     println!("Cache {} expires at {}", entry.id, entry.expires_at);
//!     Ok(())
//! }
//! ```
//!
//! ## Asking Questions
//!
//! The relay resolves model, prompt and files from the request, an optional
//! cache entry and the configuration, then calls the backend under the retry
//! policy.
//!
//! ```no_run
//! use async_trait::async_trait;
//! use deepseek_relay::{
//!     AskRequest, CallError, CompletionBackend, CompletionRequest, CompletionResponse, Relay,
//!     RelayConfig,
//! };
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! struct Echo;
//!
//! #[async_trait]
//! impl CompletionBackend for Echo {
//!     async fn complete(
//!         &self,
//!         request: &CompletionRequest,
//!     ) -> Result<CompletionResponse, CallError> {
//!         Ok(CompletionResponse::new(request.query.clone()))
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let relay = Relay::new(RelayConfig::from_env()?, Arc::new(Echo))?;
//!     let answer = relay
//!         .ask(AskRequest::new("What does this do?"), &CancellationToken::new())
//!         .await?;
//!     println!("{}", answer);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod clock;
pub mod config;
pub mod duration;
pub mod error;
pub mod files;
pub mod models;
pub mod relay;
pub mod retry;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheConfigBuilder, CacheEntry, CacheRequest, ContextStore};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigOverrides, RelayConfig};
pub use duration::{parse_duration, parse_positive_duration};
pub use error::{RelayError, Result};
pub use files::FilePolicy;
pub use models::{ModelInfo, ModelRegistry};
pub use relay::{
    AskRequest, CompletionBackend, CompletionRequest, CompletionResponse, Relay,
    EMPTY_RESPONSE_MESSAGE,
};
pub use retry::{
    CallError, CallErrorKind, Jitter, RetryAttempt, RetryError, RetryExecutor, RetryPolicy,
};
