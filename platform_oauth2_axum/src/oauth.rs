use axum::{
    Json, Router,
    extract::{Form, Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
    routing::{get, post},
};
use serde::Deserialize;
use std::collections::BTreeMap;

use platform_oauth2::{
    AuthorizationRequest, CallbackOutcome, CallbackParams, PlatformHealth, PlatformStatus,
    TokenTriple, split_scopes,
};

use super::error::{IntoResponseError, oauth2_status};
use super::router::RouterState;

pub(super) fn router() -> Router<RouterState> {
    Router::new()
        .route("/status", get(health))
        .route("/status/{provider}", get(status))
        .route("/{provider}/authorize", get(authorize))
        .route("/{provider}/callback", get(callback_get).post(callback_post))
        .route("/{provider}/refresh", post(refresh))
}

#[derive(Debug, Default, Deserialize)]
struct AuthorizeQuery {
    /// Comma or space separated override of the provider's default scopes.
    scopes: Option<String>,
}

async fn authorize(
    State(state): State<RouterState>,
    Path(provider): Path<String>,
    Query(query): Query<AuthorizeQuery>,
) -> Result<Json<AuthorizationRequest>, (StatusCode, String)> {
    let scopes = query
        .scopes
        .as_deref()
        .map(split_scopes)
        .filter(|scopes| !scopes.is_empty());
    state
        .manager
        .authorization_url(&provider, scopes)
        .await
        .map(Json)
        .into_response_error()
}

async fn callback_get(
    State(state): State<RouterState>,
    Path(provider): Path<String>,
    Query(params): Query<CallbackParams>,
) -> Response {
    complete_callback(&state, &provider, params).await
}

async fn callback_post(
    State(state): State<RouterState>,
    Path(provider): Path<String>,
    Form(params): Form<CallbackParams>,
) -> Response {
    complete_callback(&state, &provider, params).await
}

async fn complete_callback(state: &RouterState, provider: &str, params: CallbackParams) -> Response {
    let outcome = state.manager.handle_callback(provider, params).await;

    if let Some(base) = &state.callback_redirect {
        return Redirect::to(&outcome_redirect(base, &outcome)).into_response();
    }

    let status = match &outcome.exchange.error {
        None => StatusCode::OK,
        Some(err) => oauth2_status(err),
    };
    (status, Json(outcome)).into_response()
}

fn outcome_redirect(base: &str, outcome: &CallbackOutcome) -> String {
    let separator = if base.contains('?') { '&' } else { '?' };
    let mut target = format!(
        "{base}{separator}provider={}&success={}",
        urlencoding::encode(&outcome.provider),
        outcome.exchange.success
    );
    if let Some(err) = &outcome.exchange.error {
        target.push_str("&error=");
        target.push_str(&urlencoding::encode(&err.to_string()));
    }
    // One `{capability}=ok` or `{capability}=error:{message}` pair per service
    for service in &outcome.services {
        target.push('&');
        target.push_str(&urlencoding::encode(&service.capability));
        target.push('=');
        match (&service.error, service.authenticated) {
            (None, true) => target.push_str("ok"),
            (error, _) => {
                target.push_str("error:");
                target.push_str(&urlencoding::encode(
                    error.as_deref().unwrap_or("not authenticated"),
                ));
            }
        }
    }
    target
}

async fn health(
    State(state): State<RouterState>,
) -> Result<Json<BTreeMap<String, PlatformHealth>>, (StatusCode, String)> {
    state.manager.health_check().await.map(Json).into_response_error()
}

async fn status(
    State(state): State<RouterState>,
    Path(provider): Path<String>,
) -> Result<Json<PlatformStatus>, (StatusCode, String)> {
    state
        .manager
        .status(&provider)
        .await
        .map(Json)
        .into_response_error()
}

async fn refresh(
    State(state): State<RouterState>,
    Path(provider): Path<String>,
) -> Result<Json<TokenTriple>, (StatusCode, String)> {
    state
        .manager
        .refresh(&provider)
        .await
        .map(Json)
        .into_response_error()
}
