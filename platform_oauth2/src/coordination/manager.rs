use chrono::Utc;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use crate::config::PLATFORM_OAUTH2_STATE_SWEEP_INTERVAL;

use crate::oauth2::{
    AuthenticatedFetchHandle, AuthorizationRequest, AuthorizationUrlBuilder, CallbackParams,
    ExchangeOutcome, FetchHandleCache, FetchRequest, RefreshCoordinator, TokenExchanger,
    TokenTriple, get_client,
};
use crate::platform::PlatformRegistry;
use crate::storage::{CsrfStateStore, InMemoryStateStore, InMemoryTokenStore, Token, TokenStore};

use super::classify::{ServiceOutcome, TokenRecipient, classify_grant, failed_grant};
use super::errors::CoordinationError;
use super::health::{PlatformHealth, PlatformStatus, is_authenticated_at};

/// Result of a callback: the exchange itself plus one entry per capability.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackOutcome {
    pub provider: String,
    #[serde(flatten)]
    pub exchange: ExchangeOutcome,
    pub services: Vec<ServiceOutcome>,
}

/// Public entry point composing the registry, the stores, the authorization
/// URL builder, the exchanger and the fetch handles.
pub struct OAuthManager {
    registry: Arc<PlatformRegistry>,
    tokens: Arc<dyn TokenStore>,
    authorizer: AuthorizationUrlBuilder,
    exchanger: TokenExchanger,
    refresher: Arc<RefreshCoordinator>,
    handles: Arc<FetchHandleCache>,
    recipients: Vec<Arc<dyn TokenRecipient>>,
}

pub struct OAuthManagerBuilder {
    registry: Arc<PlatformRegistry>,
    states: Option<Arc<dyn CsrfStateStore>>,
    tokens: Option<Arc<dyn TokenStore>>,
    client: Option<reqwest::Client>,
    recipients: Vec<Arc<dyn TokenRecipient>>,
}

impl OAuthManagerBuilder {
    pub fn state_store(mut self, states: Arc<dyn CsrfStateStore>) -> Self {
        self.states = Some(states);
        self
    }

    pub fn token_store(mut self, tokens: Arc<dyn TokenStore>) -> Self {
        self.tokens = Some(tokens);
        self
    }

    pub fn http_client(mut self, client: reqwest::Client) -> Self {
        self.client = Some(client);
        self
    }

    pub fn with_recipient(mut self, recipient: Arc<dyn TokenRecipient>) -> Self {
        self.recipients.push(recipient);
        self
    }

    /// Missing stores default to the in-memory implementations.
    pub fn build(self) -> Result<OAuthManager, CoordinationError> {
        let registry = self.registry;
        let states: Arc<dyn CsrfStateStore> = match self.states {
            Some(states) => states,
            None => default_state_store(*PLATFORM_OAUTH2_STATE_SWEEP_INTERVAL),
        };
        let tokens: Arc<dyn TokenStore> = match self.tokens {
            Some(tokens) => tokens,
            None => Arc::new(InMemoryTokenStore::new()),
        };
        let client = match self.client {
            Some(client) => client,
            None => get_client()?,
        };

        let refresher = Arc::new(RefreshCoordinator::new(
            registry.clone(),
            tokens.clone(),
            client.clone(),
        ));
        let handles = Arc::new(FetchHandleCache::new(
            registry.clone(),
            tokens.clone(),
            refresher.clone(),
            client.clone(),
        ));
        let authorizer = AuthorizationUrlBuilder::new(registry.clone(), states.clone());
        let exchanger = TokenExchanger::new(
            registry.clone(),
            states,
            tokens.clone(),
            handles.clone(),
            client,
        );

        let configured: Vec<&str> = registry.configured().map(|p| p.id.as_str()).collect();
        tracing::info!("OAuth manager ready, configured providers: {:?}", configured);

        Ok(OAuthManager {
            registry,
            tokens,
            authorizer,
            exchanger,
            refresher,
            handles,
            recipients: self.recipients,
        })
    }
}

/// In-memory state store with its sweep running on the current tokio runtime.
///
/// Outside a runtime no sweep is spawned; expired entries are then only
/// dropped when taken.
fn default_state_store(sweep_interval: Duration) -> Arc<InMemoryStateStore> {
    let states = Arc::new(InMemoryStateStore::new());
    match tokio::runtime::Handle::try_current() {
        Ok(_) => {
            states.spawn_sweeper(sweep_interval);
        }
        Err(_) => tracing::warn!("No tokio runtime, expired CSRF states are not swept"),
    }
    states
}

impl OAuthManager {
    pub fn builder(registry: Arc<PlatformRegistry>) -> OAuthManagerBuilder {
        OAuthManagerBuilder {
            registry,
            states: None,
            tokens: None,
            client: None,
            recipients: Vec::new(),
        }
    }

    pub fn registry(&self) -> &PlatformRegistry {
        &self.registry
    }

    pub async fn authorization_url(
        &self,
        provider_id: &str,
        scopes: Option<Vec<String>>,
    ) -> Result<AuthorizationRequest, CoordinationError> {
        Ok(self.authorizer.build(provider_id, scopes).await?)
    }

    /// Handles a provider callback. Never fails: every problem is reported in
    /// the outcome so the caller can always render a response.
    pub async fn handle_callback(
        &self,
        provider_id: &str,
        params: CallbackParams,
    ) -> CallbackOutcome {
        let result = self.exchanger.exchange_for_token(provider_id, params).await;
        let exchange = ExchangeOutcome::from(&result);

        let services = match (&result, self.registry.get(provider_id)) {
            (Ok(token), Ok(platform)) => classify_grant(&platform, token, &self.recipients).await,
            (Err(e), Ok(platform)) => {
                tracing::warn!("Callback for {} failed: {}", provider_id, e);
                failed_grant(&platform, &e.to_string())
            }
            (_, Err(e)) => {
                tracing::warn!("Callback for {} failed: {}", provider_id, e);
                Vec::new()
            }
        };

        CallbackOutcome {
            provider: provider_id.to_string(),
            exchange,
            services,
        }
    }

    /// Exchanges the code carried by `callback_url` for a token.
    pub async fn exchange(
        &self,
        provider_id: &str,
        callback_url: &str,
        state: &str,
    ) -> ExchangeOutcome {
        self.exchanger.exchange(provider_id, callback_url, state).await
    }

    pub async fn fetch_handle(
        &self,
        provider_id: &str,
    ) -> Result<Arc<AuthenticatedFetchHandle>, CoordinationError> {
        Ok(self.handles.get(provider_id).await?)
    }

    /// Sends `request` through the provider's fetch handle.
    pub async fn authenticated_fetch(
        &self,
        provider_id: &str,
        request: FetchRequest,
    ) -> Result<reqwest::Response, CoordinationError> {
        let handle = self.fetch_handle(provider_id).await?;
        Ok(handle.fetch(request).await?)
    }

    pub async fn get_token(&self, provider_id: &str) -> Result<Option<Token>, CoordinationError> {
        self.registry.get(provider_id)?;
        Ok(self.tokens.get_active_token(provider_id).await?)
    }

    pub async fn is_authenticated(&self, provider_id: &str) -> Result<bool, CoordinationError> {
        let token = self.get_token(provider_id).await?;
        Ok(is_authenticated_at(token.as_ref(), Utc::now()))
    }

    /// `{configured, authenticated}` for every configured provider. Read only.
    pub async fn health_check(
        &self,
    ) -> Result<BTreeMap<String, PlatformHealth>, CoordinationError> {
        let now = Utc::now();
        let mut health = BTreeMap::new();
        for platform in self.registry.configured() {
            let token = self.tokens.get_active_token(&platform.id).await?;
            health.insert(
                platform.id.clone(),
                PlatformHealth {
                    configured: true,
                    authenticated: is_authenticated_at(token.as_ref(), now),
                },
            );
        }
        Ok(health)
    }

    pub async fn status(&self, provider_id: &str) -> Result<PlatformStatus, CoordinationError> {
        let token = self.get_token(provider_id).await?;
        Ok(PlatformStatus::from_token(token.as_ref(), Utc::now()))
    }

    /// Refreshes now regardless of expiry and rebuilds the provider's handle.
    pub async fn refresh(&self, provider_id: &str) -> Result<TokenTriple, CoordinationError> {
        let token = self.refresher.force_refresh(provider_id).await?;
        self.handles.invalidate(provider_id).await;
        Ok(TokenTriple::from(&token))
    }
}
