use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::oauth2::errors::OAuth2Error;
use crate::platform::{PlatformConfig, PlatformRegistry};
use crate::storage::{Token, TokenStore};

use super::refresh::RefreshCoordinator;

/// An outbound API call to be sent with the provider's bearer token.
///
/// The request is kept by value so it can be replayed once after a refresh.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub method: Method,
    pub url: String,
    pub headers: HeaderMap,
    pub body: Option<Vec<u8>>,
}

impl FetchRequest {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: HeaderMap::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = Some(body.into());
        self
    }

    pub fn json<T: serde::Serialize>(self, value: &T) -> Result<Self, OAuth2Error> {
        let body = serde_json::to_vec(value).map_err(|e| OAuth2Error::Serde(e.to_string()))?;
        Ok(self
            .header(
                http::header::CONTENT_TYPE,
                HeaderValue::from_static("application/json"),
            )
            .body(body))
    }
}

/// Bearer-injecting wrapper for one provider.
///
/// Holds no token: every call reads the store, so a handle that outlives an
/// invalidation still sends the current token. For the same reason a refresh
/// performed inside [`Self::fetch`] keeps the handle cached; only callbacks and
/// explicit refreshes through the manager drop it.
pub struct AuthenticatedFetchHandle {
    platform: Arc<PlatformConfig>,
    tokens: Arc<dyn TokenStore>,
    refresher: Arc<RefreshCoordinator>,
    client: reqwest::Client,
}

impl AuthenticatedFetchHandle {
    pub fn provider_id(&self) -> &str {
        &self.platform.id
    }

    /// Sends `request`, refreshing before the call when the stored token is
    /// expired, or once after a 401 otherwise. The second response is
    /// returned as is.
    pub async fn fetch(&self, request: FetchRequest) -> Result<reqwest::Response, OAuth2Error> {
        let provider_id = self.provider_id();
        let mut token = self.tokens.get_active_token(provider_id).await?;

        let mut refreshed = false;
        if token
            .as_ref()
            .is_some_and(|t| t.is_expired() && t.is_refreshable())
        {
            tracing::debug!("Token for {} expired, refreshing before request", provider_id);
            token = self.refresher.refresh_if_expired(provider_id).await?;
            refreshed = true;
        }
        if token.is_none() {
            tracing::debug!("No token stored for {}, sending unauthenticated", provider_id);
        }

        let response = self.send(&request, token.as_ref()).await?;
        if response.status() != StatusCode::UNAUTHORIZED || refreshed {
            return Ok(response);
        }

        let Some(stale) = token.filter(Token::is_refreshable) else {
            return Ok(response);
        };

        tracing::info!("{} rejected the access token, refreshing and retrying once", provider_id);
        let fresh = self
            .refresher
            .refresh_if_current(provider_id, &stale.access_token)
            .await?;
        self.send(&request, Some(&fresh)).await
    }

    async fn send(
        &self,
        request: &FetchRequest,
        token: Option<&Token>,
    ) -> Result<reqwest::Response, OAuth2Error> {
        let mut builder = self
            .client
            .request(request.method.clone(), &request.url)
            .headers(request.headers.clone());
        if let Some(token) = token {
            builder = builder.bearer_auth(&token.access_token);
        }
        if let Some(body) = &request.body {
            builder = builder.body(body.clone());
        }

        builder.send().await.map_err(|e| {
            tracing::error!("Request to {} failed: {}", request.url, e);
            OAuth2Error::Request(e.to_string())
        })
    }
}

/// Lazily built fetch handles, one per provider.
pub(crate) struct FetchHandleCache {
    registry: Arc<PlatformRegistry>,
    tokens: Arc<dyn TokenStore>,
    refresher: Arc<RefreshCoordinator>,
    client: reqwest::Client,
    handles: RwLock<HashMap<String, Arc<AuthenticatedFetchHandle>>>,
}

impl FetchHandleCache {
    pub(crate) fn new(
        registry: Arc<PlatformRegistry>,
        tokens: Arc<dyn TokenStore>,
        refresher: Arc<RefreshCoordinator>,
        client: reqwest::Client,
    ) -> Self {
        Self {
            registry,
            tokens,
            refresher,
            client,
            handles: RwLock::new(HashMap::new()),
        }
    }

    pub(crate) async fn get(
        &self,
        provider_id: &str,
    ) -> Result<Arc<AuthenticatedFetchHandle>, OAuth2Error> {
        if let Some(handle) = self.handles.read().await.get(provider_id) {
            return Ok(handle.clone());
        }

        let platform = self.registry.get(provider_id)?;
        let mut handles = self.handles.write().await;
        let handle = handles
            .entry(provider_id.to_string())
            .or_insert_with(|| {
                tracing::debug!("Building fetch handle for {}", provider_id);
                Arc::new(AuthenticatedFetchHandle {
                    platform,
                    tokens: self.tokens.clone(),
                    refresher: self.refresher.clone(),
                    client: self.client.clone(),
                })
            })
            .clone();
        Ok(handle)
    }

    /// Drops the cached handle; the next `get` builds a new one.
    pub(crate) async fn invalidate(&self, provider_id: &str) -> bool {
        let removed = self.handles.write().await.remove(provider_id).is_some();
        if removed {
            tracing::debug!("Invalidated fetch handle for {}", provider_id);
        }
        removed
    }
}
