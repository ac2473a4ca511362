//! # Ephemeral Context Cache
//!
//! Short-lived "contexts" (a model choice, a system prompt and a list of
//! referenced files) stored under an opaque id so follow-up queries can refer
//! to them without resending everything.
//!
//! ## Lifecycle
//!
//! - Created once through [`ContextStore::create`], never updated
//! - Read any number of times through [`ContextStore::get`] while live
//! - Reaped lazily: the first `get` after expiration removes the entry and
//!   reports `Expired`; later lookups report `NotFound`
//!
//! ## Example
//!
//! ```rust
//! use deepseek_relay::cache::{CacheConfig, CacheRequest, ContextStore};
//! use deepseek_relay::ModelRegistry;
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = CacheConfig::builder()
//!     .default_ttl(Duration::from_secs(3600)) // 1 hour
//!     .build();
//!
//! let store = ContextStore::new(config, Arc::new(ModelRegistry::default()));
//!
//! let entry = store
//!     .create(CacheRequest::new("deepseek-chat").with_ttl("10m"))
//!     .await?;
//!
//! let cached = store.get(&entry.id).await?;
//! println!("Using model {}", cached.model);
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod store;

pub use config::{CacheConfig, CacheConfigBuilder};
pub use entry::{CacheEntry, CacheRequest};
pub use store::ContextStore;
