use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;

use crate::config::PLATFORM_OAUTH2_STATE_TTL;
use crate::storage::errors::StorageError;

use super::types::{CsrfStateStore, StateEntry};

const STATE_PREFIX: &str = "csrf";

/// Process-local state store. Entries live in one mutex-guarded map.
pub struct InMemoryStateStore {
    entry: Mutex<HashMap<String, StateEntry>>,
    ttl: Duration,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::with_ttl(*PLATFORM_OAUTH2_STATE_TTL)
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        tracing::info!("Creating in-memory state store with ttl {:?}", ttl);
        Self {
            entry: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub async fn len(&self) -> usize {
        self.entry.lock().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entry.lock().await.is_empty()
    }

    /// Spawns the periodic sweep. The task only holds a weak reference and
    /// exits on the first tick after the store is dropped.
    pub fn spawn_sweeper(self: &Arc<Self>, interval: Duration) -> JoinHandle<()> {
        let store: Weak<Self> = Arc::downgrade(self);
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(store) = store.upgrade() else {
                    tracing::debug!("State store dropped, stopping sweeper");
                    break;
                };
                match store.purge_expired().await {
                    Ok(0) => {}
                    Ok(n) => tracing::debug!("Swept {} expired state entries", n),
                    Err(e) => tracing::warn!("State sweep failed: {}", e),
                }
            }
        })
    }

    fn make_key(provider_id: &str, state: &str) -> String {
        format!("{STATE_PREFIX}:{provider_id}:{state}")
    }
}

impl Default for InMemoryStateStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CsrfStateStore for InMemoryStateStore {
    async fn put(
        &self,
        provider_id: &str,
        state: &str,
        entry: StateEntry,
    ) -> Result<(), StorageError> {
        if state.is_empty() {
            return Err(StorageError::InvalidInput("Empty state token".to_string()));
        }
        let key = Self::make_key(provider_id, state);
        self.entry.lock().await.insert(key, entry);
        Ok(())
    }

    async fn take(
        &self,
        provider_id: &str,
        state: &str,
    ) -> Result<Option<StateEntry>, StorageError> {
        let key = Self::make_key(provider_id, state);
        let Some(entry) = self.entry.lock().await.remove(&key) else {
            return Ok(None);
        };

        if entry.is_expired(Utc::now(), self.ttl) {
            tracing::debug!("State for {} taken after expiry", provider_id);
            return Ok(None);
        }
        Ok(Some(entry))
    }

    async fn purge_expired(&self) -> Result<usize, StorageError> {
        let now = Utc::now();
        let mut entries = self.entry.lock().await;
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(now, self.ttl));
        Ok(before - entries.len())
    }
}
