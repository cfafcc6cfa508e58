//! Router for the OAuth endpoints

use axum::Router;
use std::sync::Arc;
use tower_http::LatencyUnit;
use tower_http::trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer};
use tracing::Level;

use platform_oauth2::OAuthManager;

use super::config::PLATFORM_OAUTH2_CALLBACK_REDIRECT;

#[derive(Clone)]
pub(crate) struct RouterState {
    pub(crate) manager: Arc<OAuthManager>,
    pub(crate) callback_redirect: Option<Arc<str>>,
}

/// Create a router for the authorize, callback, refresh and status endpoints
///
/// The endpoints are relative to the mount point, which should be
/// `PLATFORM_OAUTH2_ROUTE_PREFIX` so the default redirect URIs resolve:
/// - {PLATFORM_OAUTH2_ROUTE_PREFIX}/{provider}/authorize
/// - {PLATFORM_OAUTH2_ROUTE_PREFIX}/{provider}/callback
/// - {PLATFORM_OAUTH2_ROUTE_PREFIX}/{provider}/refresh
/// - {PLATFORM_OAUTH2_ROUTE_PREFIX}/status
pub fn platform_oauth2_router(manager: Arc<OAuthManager>) -> Router {
    platform_oauth2_router_no_trace(manager).layer(
        TraceLayer::new_for_http()
            .make_span_with(
                DefaultMakeSpan::new()
                    .level(Level::INFO)
                    .include_headers(false),
            )
            .on_request(DefaultOnRequest::new().level(Level::INFO))
            .on_response(
                DefaultOnResponse::new()
                    .level(Level::INFO)
                    .latency_unit(LatencyUnit::Millis),
            ),
    )
}

/// Same as `platform_oauth2_router()` without the HTTP tracing middleware.
pub fn platform_oauth2_router_no_trace(manager: Arc<OAuthManager>) -> Router {
    router_with(
        manager,
        PLATFORM_OAUTH2_CALLBACK_REDIRECT.as_deref().map(Arc::from),
    )
}

pub(crate) fn router_with(
    manager: Arc<OAuthManager>,
    callback_redirect: Option<Arc<str>>,
) -> Router {
    super::oauth::router().with_state(RouterState {
        manager,
        callback_redirect,
    })
}
