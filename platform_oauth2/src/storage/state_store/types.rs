use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::errors::StorageError;

/// Flow context stored under a CSRF state token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateEntry {
    pub provider_id: String,
    pub code_verifier: Option<String>,
    /// Scopes requested in the authorize URL, used when the token response omits `scope`.
    pub scopes: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl StateEntry {
    pub fn new(provider_id: &str, code_verifier: Option<String>, scopes: Vec<String>) -> Self {
        Self {
            provider_id: provider_id.to_string(),
            code_verifier,
            scopes,
            created_at: Utc::now(),
        }
    }

    pub fn is_expired(&self, now: DateTime<Utc>, ttl: std::time::Duration) -> bool {
        let Ok(ttl) = chrono::Duration::from_std(ttl) else {
            return false;
        };
        now - self.created_at >= ttl
    }
}

/// Single-use, TTL-bound map from state token to [`StateEntry`].
///
/// `take` removes the entry in the same critical section that reads it, so two
/// concurrent callers with the same state can never both receive it. Entries
/// older than the TTL are never returned, whether or not a sweep has run.
#[async_trait]
pub trait CsrfStateStore: Send + Sync + 'static {
    async fn put(
        &self,
        provider_id: &str,
        state: &str,
        entry: StateEntry,
    ) -> Result<(), StorageError>;

    async fn take(&self, provider_id: &str, state: &str)
    -> Result<Option<StateEntry>, StorageError>;

    /// Drops every expired entry, returning how many were removed.
    async fn purge_expired(&self) -> Result<usize, StorageError>;
}
