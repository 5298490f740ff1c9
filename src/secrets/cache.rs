//! Resolver cache.
//!
//! Entries live until [`SecretCache::forget_all`] is called; there is no TTL.
//! A bulk load of a category also records that category as complete so a
//! later `get_all` can be answered without touching the backends.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::debug;

use super::types::{SecretMap, SecretString};

/// Cache key combining the source identifier, secret name and rewritten category.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    pub backend: String,
    pub name: String,
    pub category: String,
}

impl CacheKey {
    pub fn new(backend: &str, name: &str, category: &str) -> Self {
        Self { backend: backend.to_string(), name: name.to_string(), category: category.to_string() }
    }

    pub fn key_string(&self) -> String {
        format!("{}:{}:{}", self.backend, self.category, self.name)
    }
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<CacheKey, SecretString>,
    // (backend, category) pairs filled by put_all
    complete: HashSet<(String, String)>,
}

/// Shared, clonable handle to the cached secrets.
#[derive(Debug, Clone, Default)]
pub struct SecretCache {
    inner: Arc<RwLock<CacheState>>,
}

impl SecretCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn get(&self, key: &CacheKey) -> Option<SecretString> {
        let state = self.inner.read().await;
        let hit = state.entries.get(key).cloned();
        if hit.is_some() {
            debug!(key = %key.key_string(), "Cache hit for secret");
        }
        hit
    }

    pub async fn put(&self, key: &CacheKey, value: SecretString) {
        let mut state = self.inner.write().await;
        debug!(key = %key.key_string(), "Caching secret");
        state.entries.insert(key.clone(), value);
    }

    /// Store a whole category and mark it complete for `backend`.
    pub async fn put_all(&self, backend: &str, category: &str, secrets: &SecretMap) {
        let mut state = self.inner.write().await;
        debug!(backend = %backend, category = %category, count = secrets.len(), "Caching category");

        for (name, value) in secrets {
            state.entries.insert(CacheKey::new(backend, name, category), value.clone());
        }
        state.complete.insert((backend.to_string(), category.to_string()));
    }

    /// Return a category previously filled by [`SecretCache::put_all`].
    ///
    /// Individual `put`s made afterwards for the same category are included.
    pub async fn get_all(&self, backend: &str, category: &str) -> Option<SecretMap> {
        let state = self.inner.read().await;
        if !state.complete.contains(&(backend.to_string(), category.to_string())) {
            return None;
        }

        debug!(backend = %backend, category = %category, "Cache hit for category");
        Some(
            state
                .entries
                .iter()
                .filter(|(key, _)| key.backend == backend && key.category == category)
                .map(|(key, value)| (key.name.clone(), value.clone()))
                .collect(),
        )
    }

    pub async fn invalidate(&self, key: &CacheKey) {
        let mut state = self.inner.write().await;
        debug!(key = %key.key_string(), "Invalidating cached secret");
        state.entries.remove(key);
    }

    pub async fn forget_all(&self) {
        let mut state = self.inner.write().await;
        debug!(entries = state.entries.len(), "Forgetting all cached secrets");
        state.entries.clear();
        state.complete.clear();
    }

    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}
