use std::sync::Arc;

use crate::oauth2::errors::OAuth2Error;
use crate::oauth2::types::{CallbackParams, ExchangeOutcome};
use crate::platform::PlatformRegistry;
use crate::storage::{CsrfStateStore, Token, TokenStore};

use super::fetch::FetchHandleCache;
use super::token_endpoint::{Grant, request_token};

/// Turns a provider callback into a stored token.
pub struct TokenExchanger {
    registry: Arc<PlatformRegistry>,
    states: Arc<dyn CsrfStateStore>,
    tokens: Arc<dyn TokenStore>,
    handles: Arc<FetchHandleCache>,
    client: reqwest::Client,
}

impl TokenExchanger {
    pub(crate) fn new(
        registry: Arc<PlatformRegistry>,
        states: Arc<dyn CsrfStateStore>,
        tokens: Arc<dyn TokenStore>,
        handles: Arc<FetchHandleCache>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            registry,
            states,
            tokens,
            handles,
            client,
        }
    }

    /// Exchanges the code found in `callback_url`. `state` takes precedence over
    /// any state parameter in the URL.
    pub async fn exchange(
        &self,
        provider_id: &str,
        callback_url: &str,
        state: &str,
    ) -> ExchangeOutcome {
        let mut params = CallbackParams::from_callback_url(callback_url);
        if !state.is_empty() {
            params.state = Some(state.to_string());
        }
        self.exchange_callback(provider_id, params).await
    }

    pub async fn exchange_callback(
        &self,
        provider_id: &str,
        params: CallbackParams,
    ) -> ExchangeOutcome {
        ExchangeOutcome::from(&self.exchange_for_token(provider_id, params).await)
    }

    /// Same flow as [`Self::exchange_callback`], keeping the stored token.
    ///
    /// Order: provider lookup, state consumption, then the `error`/`code`/`state`
    /// checks, and only then the network call.
    pub(crate) async fn exchange_for_token(
        &self,
        provider_id: &str,
        params: CallbackParams,
    ) -> Result<Token, OAuth2Error> {
        let platform = self.registry.get(provider_id)?;

        let state = params.state.filter(|s| !s.is_empty());
        let entry = match &state {
            Some(state) => self.states.take(provider_id, state).await?,
            None => None,
        };

        if let Some(error) = params.error.filter(|e| !e.is_empty()) {
            tracing::warn!("{} denied authorization: {}", provider_id, error);
            return Err(OAuth2Error::AuthorizationDenied {
                error,
                description: params.error_description,
            });
        }
        let code = params
            .code
            .filter(|c| !c.is_empty())
            .ok_or_else(|| OAuth2Error::MissingParameter("code".to_string()))?;
        if state.is_none() {
            return Err(OAuth2Error::MissingParameter("state".to_string()));
        }
        let Some(entry) = entry else {
            tracing::warn!("Rejected callback for {} with unknown or expired state", provider_id);
            return Err(OAuth2Error::InvalidOrExpiredState);
        };

        if platform.requires_pkce && entry.code_verifier.is_none() {
            return Err(OAuth2Error::ExchangeFailed(
                "No code verifier recorded for this state".to_string(),
            ));
        }

        let token = request_token(
            &self.client,
            &platform,
            Grant::AuthorizationCode {
                code: &code,
                code_verifier: entry.code_verifier.as_deref(),
                requested_scopes: &entry.scopes,
            },
        )
        .await?;

        self.tokens.save_token(provider_id, token.clone()).await?;
        self.handles.invalidate(provider_id).await;
        tracing::info!(
            "Stored token for {}, expires at {}",
            provider_id,
            token.expires_at
        );

        Ok(token)
    }
}
