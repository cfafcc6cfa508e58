use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::storage::errors::StorageError;

/// Tokens issued for one provider.
///
/// `expires_at` is always absolute so the value means the same thing on both
/// sides of the store boundary.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub provider_id: String,
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
    #[serde(default)]
    pub scopes: Vec<String>,
}

impl Token {
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }

    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    pub fn is_refreshable(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// A token with a refresh token stays usable past its nominal expiry.
    pub fn is_usable_at(&self, now: DateTime<Utc>) -> bool {
        self.is_refreshable() || !self.is_expired_at(now)
    }
}

// Secrets stay out of logs.
impl std::fmt::Debug for Token {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Token")
            .field("provider_id", &self.provider_id)
            .field("access_token", &"<redacted>")
            .field(
                "refresh_token",
                &self.refresh_token.as_ref().map(|_| "<redacted>"),
            )
            .field("expires_at", &self.expires_at)
            .field("scopes", &self.scopes)
            .finish()
    }
}

/// Durable token persistence, keyed by provider id.
///
/// Every read goes through the store so a refreshed token is visible to all
/// callers immediately.
#[async_trait]
pub trait TokenStore: Send + Sync + 'static {
    async fn get_active_token(&self, provider_id: &str) -> Result<Option<Token>, StorageError>;

    async fn save_token(&self, provider_id: &str, token: Token) -> Result<(), StorageError>;
}
