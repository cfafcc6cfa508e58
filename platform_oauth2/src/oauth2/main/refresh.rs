use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::oauth2::errors::OAuth2Error;
use crate::platform::{PlatformConfig, PlatformRegistry};
use crate::storage::{Token, TokenStore};

use super::token_endpoint::{Grant, request_token};

/// Per-provider single-flight refresh.
///
/// Callers serialize on one lock per provider and re-read the store once they
/// hold it, so a burst of callers that all saw the same expired token causes a
/// single network refresh.
pub(crate) struct RefreshCoordinator {
    registry: Arc<PlatformRegistry>,
    tokens: Arc<dyn TokenStore>,
    client: reqwest::Client,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl RefreshCoordinator {
    pub(crate) fn new(
        registry: Arc<PlatformRegistry>,
        tokens: Arc<dyn TokenStore>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            registry,
            tokens,
            client,
            locks: Mutex::new(HashMap::new()),
        }
    }

    async fn lock_for(&self, provider_id: &str) -> Arc<Mutex<()>> {
        self.locks
            .lock()
            .await
            .entry(provider_id.to_string())
            .or_default()
            .clone()
    }

    /// Refreshes only if the stored token is still expired once the lock is held.
    ///
    /// Returns the stored token as it stands afterwards, or `None` when no token
    /// is stored.
    pub(crate) async fn refresh_if_expired(
        &self,
        provider_id: &str,
    ) -> Result<Option<Token>, OAuth2Error> {
        let platform = self.registry.get(provider_id)?;
        let lock = self.lock_for(provider_id).await;
        let _guard = lock.lock().await;

        let Some(current) = self.tokens.get_active_token(provider_id).await? else {
            return Ok(None);
        };
        if !current.is_expired() || !current.is_refreshable() {
            tracing::debug!("No refresh needed for {}", provider_id);
            return Ok(Some(current));
        }

        self.refresh_locked(&platform, &current).await.map(Some)
    }

    /// Refreshes after the provider rejected `stale_access_token`, unless another
    /// caller already replaced it.
    pub(crate) async fn refresh_if_current(
        &self,
        provider_id: &str,
        stale_access_token: &str,
    ) -> Result<Token, OAuth2Error> {
        let platform = self.registry.get(provider_id)?;
        let lock = self.lock_for(provider_id).await;
        let _guard = lock.lock().await;

        let current = self.stored_refreshable(provider_id).await?;
        if current.access_token != stale_access_token {
            tracing::debug!("Token for {} already refreshed by another caller", provider_id);
            return Ok(current);
        }

        self.refresh_locked(&platform, &current).await
    }

    /// Refreshes unconditionally.
    pub(crate) async fn force_refresh(&self, provider_id: &str) -> Result<Token, OAuth2Error> {
        let platform = self.registry.get(provider_id)?;
        let lock = self.lock_for(provider_id).await;
        let _guard = lock.lock().await;

        let current = self.stored_refreshable(provider_id).await?;
        self.refresh_locked(&platform, &current).await
    }

    async fn stored_refreshable(&self, provider_id: &str) -> Result<Token, OAuth2Error> {
        let current = self
            .tokens
            .get_active_token(provider_id)
            .await?
            .ok_or_else(|| OAuth2Error::RefreshFailed(format!("No token stored for {provider_id}")))?;
        if !current.is_refreshable() {
            return Err(OAuth2Error::RefreshFailed(format!(
                "No refresh token stored for {provider_id}"
            )));
        }
        Ok(current)
    }

    /// Must be called with the provider's lock held.
    async fn refresh_locked(
        &self,
        platform: &PlatformConfig,
        current: &Token,
    ) -> Result<Token, OAuth2Error> {
        let refresh_token = current.refresh_token.as_deref().unwrap_or_default();
        let token = request_token(
            &self.client,
            platform,
            Grant::RefreshToken {
                refresh_token,
                current_scopes: &current.scopes,
            },
        )
        .await?;

        self.tokens.save_token(&platform.id, token.clone()).await?;
        tracing::info!(
            "Refreshed token for {}, expires at {}",
            platform.id,
            token.expires_at
        );
        Ok(token)
    }
}
