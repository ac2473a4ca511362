//! Context cache store with lazy TTL expiration

use crate::cache::{
    config::CacheConfig,
    entry::{CacheEntry, CacheRequest},
};
use crate::clock::{Clock, SystemClock};
use crate::duration::parse_positive_duration;
use crate::error::{RelayError, Result};
use crate::models::ModelRegistry;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tracing::debug;

/// Store of short-lived cached contexts
///
/// Entries are write-once and read-many. Nothing runs in the background:
/// an entry is reaped by the first `get` that finds it past its expiration.
/// Lookups share a read lock; creation and reaping take the write lock for
/// a single map operation.
pub struct ContextStore {
    config: CacheConfig,
    models: Arc<ModelRegistry>,
    clock: Arc<dyn Clock>,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ContextStore {
    /// Create a store reading time from the system clock
    pub fn new(config: CacheConfig, models: Arc<ModelRegistry>) -> Self {
        Self::with_clock(config, models, Arc::new(SystemClock::new()))
    }

    /// Create a store with an injected clock
    pub fn with_clock(
        config: CacheConfig,
        models: Arc<ModelRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        debug!("Initializing context store with config: {:?}", config);

        Self {
            config,
            models,
            clock,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Create a cached context
    ///
    /// The entry is visible to `get` on any task once this returns.
    pub async fn create(&self, request: CacheRequest) -> Result<CacheEntry> {
        if !self.config.enabled {
            return Err(RelayError::CachingDisabled);
        }

        self.models.validate(&request.model)?;
        let ttl = self.resolve_ttl(&request.ttl)?;

        let mut entries = self.entries.write().await;

        let mut id = new_cache_id();
        while entries.contains_key(&id) {
            id = new_cache_id();
        }

        let entry = CacheEntry::new(id.clone(), request, self.clock.now(), ttl)?;
        entries.insert(id, entry.clone());

        Ok(entry)
    }

    /// Look up a cached context by id
    ///
    /// Fails with `NotFound` for ids that never existed or were already
    /// reaped, and with `Expired` (removing the entry) when the lifetime has
    /// elapsed.
    pub async fn get(&self, id: &str) -> Result<CacheEntry> {
        let now = self.clock.now();

        let expired_at = {
            let entries = self.entries.read().await;
            match entries.get(id) {
                None => {
                    return Err(RelayError::NotFound { id: id.to_string() });
                }
                Some(entry) if !entry.is_expired_at(now) => return Ok(entry.clone()),
                Some(entry) => entry.expires_at,
            }
        };

        let mut entries = self.entries.write().await;

        // A concurrent get may have reaped the entry between the two locks;
        // it was observed expired either way.
        match entries.get(id) {
            Some(entry) if !entry.is_expired_at(now) => Ok(entry.clone()),
            Some(_) => {
                let entry = entries.remove(id);
                Err(RelayError::Expired {
                    id: id.to_string(),
                    expired_at: entry.map(|e| e.expires_at).unwrap_or(expired_at),
                })
            }
            None => Err(RelayError::Expired {
                id: id.to_string(),
                expired_at,
            }),
        }
    }

    /// Number of stored entries, including expired ones not yet reaped
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    fn resolve_ttl(&self, ttl: &str) -> Result<Duration> {
        if ttl.is_empty() {
            return Ok(self.config.default_ttl);
        }
        parse_positive_duration("TTL", ttl)
    }
}

fn new_cache_id() -> String {
    format!("cache-{}", uuid::Uuid::new_v4().simple())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    fn store_with_clock() -> (ContextStore, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::starting_now());
        let config = CacheConfig::builder()
            .default_ttl(Duration::from_secs(60))
            .build();
        let store = ContextStore::with_clock(
            config,
            Arc::new(ModelRegistry::default()),
            clock.clone(),
        );
        (store, clock)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (store, _clock) = store_with_clock();

        let created = store
            .create(
                CacheRequest::new("deepseek-chat")
                    .with_system_prompt("review this")
                    .with_file_paths(["a.rs", "b.rs"]),
            )
            .await
            .unwrap();

        assert!(created.id.starts_with("cache-"));
        assert_eq!(created.ttl(), chrono::Duration::seconds(60));

        let fetched = store.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
    }

    #[tokio::test]
    async fn test_explicit_ttl() {
        let (store, _clock) = store_with_clock();

        let entry = store
            .create(CacheRequest::new("deepseek-chat").with_ttl("1h30m"))
            .await
            .unwrap();

        assert_eq!(entry.expires_at - entry.created_at, chrono::Duration::minutes(90));
    }

    #[tokio::test]
    async fn test_invalid_ttl() {
        let (store, _clock) = store_with_clock();

        for ttl in ["soon", "0s", "-10m"] {
            let err = store
                .create(CacheRequest::new("deepseek-chat").with_ttl(ttl))
                .await
                .unwrap_err();
            assert!(matches!(err, RelayError::ConfigError(_)), "{}", ttl);
        }
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_invalid_model() {
        let (store, _clock) = store_with_clock();

        let err = store.create(CacheRequest::new("")).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidModel(_)));

        let err = store.create(CacheRequest::new("gpt-4")).await.unwrap_err();
        assert!(matches!(err, RelayError::InvalidModel(_)));
    }

    #[tokio::test]
    async fn test_caching_disabled() {
        let config = CacheConfig::builder().enabled(false).build();
        let store = ContextStore::new(config, Arc::new(ModelRegistry::default()));

        let err = store
            .create(CacheRequest::new("deepseek-chat"))
            .await
            .unwrap_err();
        assert!(matches!(err, RelayError::CachingDisabled));
    }

    #[tokio::test]
    async fn test_expired_then_not_found() {
        let (store, clock) = store_with_clock();

        let entry = store
            .create(CacheRequest::new("deepseek-chat"))
            .await
            .unwrap();

        // Still valid at exactly the expiration instant
        clock.advance(Duration::from_secs(60));
        assert!(store.get(&entry.id).await.is_ok());

        clock.advance(Duration::from_millis(1));
        let err = store.get(&entry.id).await.unwrap_err();
        match err {
            RelayError::Expired { id, expired_at } => {
                assert_eq!(id, entry.id);
                assert_eq!(expired_at, entry.expires_at);
            }
            other => panic!("expected Expired, got {:?}", other),
        }

        let err = store.get(&entry.id).await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound { .. }));
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_unknown_id() {
        let (store, _clock) = store_with_clock();

        let err = store.get("unknown").await.unwrap_err();
        assert!(matches!(err, RelayError::NotFound { .. }));
    }

    #[tokio::test]
    async fn test_get_does_not_mutate_live_entry() {
        let (store, _clock) = store_with_clock();
        let entry = store
            .create(CacheRequest::new("deepseek-chat"))
            .await
            .unwrap();

        for _ in 0..3 {
            assert_eq!(store.get(&entry.id).await.unwrap(), entry);
        }
        assert_eq!(store.len().await, 1);
    }
}
