//! Axum-based mock provider with a token endpoint and one protected API route
//!
//! Each test starts its own instance on 127.0.0.1:0. Hit counters make the
//! number of exchanges, refreshes and API calls observable.

use axum::{
    Json, Router,
    extract::{Form, State},
    http::{HeaderMap, StatusCode, header::AUTHORIZATION},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde_json::json;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Authorization code the mock accepts.
pub const GOOD_CODE: &str = "good-code";
/// Refresh token issued by the code grant.
pub const ISSUED_REFRESH_TOKEN: &str = "refresh-1";

#[derive(Default)]
pub struct MockProviderState {
    pub token_hits: AtomicUsize,
    pub refresh_hits: AtomicUsize,
    pub api_hits: AtomicUsize,
    /// Every form body received by a token endpoint, in arrival order.
    pub token_forms: Mutex<Vec<HashMap<String, String>>>,
    /// Authorization header of every token request.
    pub token_auth_headers: Mutex<Vec<Option<String>>>,
    /// Bearer tokens seen by the API route, in arrival order.
    pub api_bearers: Mutex<Vec<Option<String>>>,
    /// The one access token the API route accepts.
    pub valid_access_token: Mutex<String>,
    /// When set, the refresh grant fails with 400.
    pub reject_refresh: Mutex<bool>,
    /// Refresh responses are delayed so concurrent callers overlap.
    pub refresh_delay: Mutex<Duration>,
    /// Delay before answering the authorization code grant.
    pub code_delay: Mutex<Duration>,
}

impl MockProviderState {
    fn issue(&self, prefix: &str) -> String {
        let n = self.token_hits.fetch_add(1, Ordering::SeqCst) + 1;
        let access = format!("{prefix}-{n}");
        *self.valid_access_token.lock().unwrap() = access.clone();
        access
    }

    fn record(&self, form: &HashMap<String, String>, headers: &HeaderMap) {
        self.token_forms.lock().unwrap().push(form.clone());
        self.token_auth_headers.lock().unwrap().push(
            headers
                .get(AUTHORIZATION)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
        );
    }
}

pub struct MockProvider {
    pub base_url: String,
    pub state: Arc<MockProviderState>,
}

impl MockProvider {
    pub async fn start() -> Self {
        let state = Arc::new(MockProviderState::default());
        let app = Router::new()
            .route("/token", post(standard_token))
            .route("/v2/oauth/token/", post(enveloped_token))
            .route("/ig/token", post(lifetime_less_token))
            .route("/api/me", get(protected_api))
            .route("/api/slow", get(slow_api))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock provider");
        let addr = listener.local_addr().expect("mock provider address");
        tokio::spawn(async move {
            axum::serve(listener, app).await.expect("mock provider crashed");
        });

        Self {
            base_url: format!("http://{addr}"),
            state,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub fn token_hits(&self) -> usize {
        self.state.token_hits.load(Ordering::SeqCst)
    }

    pub fn refresh_hits(&self) -> usize {
        self.state.refresh_hits.load(Ordering::SeqCst)
    }

    pub fn api_hits(&self) -> usize {
        self.state.api_hits.load(Ordering::SeqCst)
    }

    pub fn last_token_form(&self) -> HashMap<String, String> {
        self.state
            .token_forms
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }

    pub fn api_bearers(&self) -> Vec<Option<String>> {
        self.state.api_bearers.lock().unwrap().clone()
    }

    pub fn set_refresh_delay(&self, delay: Duration) {
        *self.state.refresh_delay.lock().unwrap() = delay;
    }

    pub fn set_code_delay(&self, delay: Duration) {
        *self.state.code_delay.lock().unwrap() = delay;
    }

    pub fn reject_refresh(&self) {
        *self.state.reject_refresh.lock().unwrap() = true;
    }

    /// Makes every previously issued access token stale.
    pub fn revoke_access_tokens(&self) {
        *self.state.valid_access_token.lock().unwrap() = "revoked".to_string();
    }
}

/// Shared grant handling; returns the access token or an error response.
async fn grant(
    state: &MockProviderState,
    form: &HashMap<String, String>,
    headers: &HeaderMap,
) -> Result<(String, Option<&'static str>), Response> {
    state.record(form, headers);

    let invalid_grant = |description: &str| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "invalid_grant", "error_description": description})),
        )
            .into_response()
    };

    match form.get("grant_type").map(String::as_str) {
        Some("authorization_code") => {
            let delay = *state.code_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if form.get("code").map(String::as_str) != Some(GOOD_CODE) {
                return Err(invalid_grant("Bad authorization code"));
            }
            Ok((state.issue("access"), Some(ISSUED_REFRESH_TOKEN)))
        }
        Some("refresh_token") => {
            state.refresh_hits.fetch_add(1, Ordering::SeqCst);
            let delay = *state.refresh_delay.lock().unwrap();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            if *state.reject_refresh.lock().unwrap() {
                return Err(invalid_grant("Refresh token revoked"));
            }
            Ok((state.issue("refreshed"), None))
        }
        _ => Err((
            StatusCode::BAD_REQUEST,
            Json(json!({"error": "unsupported_grant_type"})),
        )
            .into_response()),
    }
}

async fn standard_token(
    State(state): State<Arc<MockProviderState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match grant(&state, &form, &headers).await {
        Ok((access, refresh)) => Json(json!({
            "access_token": access,
            "refresh_token": refresh,
            "expires_in": 3600,
            "token_type": "Bearer",
        }))
        .into_response(),
        Err(response) => response,
    }
}

async fn enveloped_token(
    State(state): State<Arc<MockProviderState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match grant(&state, &form, &headers).await {
        Ok((access, refresh)) => Json(json!({
            "data": {
                "access_token": access,
                "refresh_token": refresh,
                "expires_in": "86400",
                "scope": "user.info.basic,video.upload",
                "open_id": "open-1",
            },
            "message": "success",
        }))
        .into_response(),
        Err(response) => response,
    }
}

async fn lifetime_less_token(
    State(state): State<Arc<MockProviderState>>,
    headers: HeaderMap,
    Form(form): Form<HashMap<String, String>>,
) -> Response {
    match grant(&state, &form, &headers).await {
        Ok((access, _)) => Json(json!({"access_token": access, "user_id": 17})).into_response(),
        Err(response) => response,
    }
}

async fn protected_api(State(state): State<Arc<MockProviderState>>, headers: HeaderMap) -> Response {
    state.api_hits.fetch_add(1, Ordering::SeqCst);
    let bearer = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::to_string);
    state.api_bearers.lock().unwrap().push(bearer.clone());

    let valid = state.valid_access_token.lock().unwrap().clone();
    match bearer {
        Some(token) if token == valid => Json(json!({"ok": true, "token": token})).into_response(),
        _ => (StatusCode::UNAUTHORIZED, Json(json!({"error": "invalid_token"}))).into_response(),
    }
}

/// Answers long after any client timeout used in the tests.
async fn slow_api(State(state): State<Arc<MockProviderState>>) -> Response {
    state.api_hits.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(Duration::from_secs(5)).await;
    Json(json!({"ok": true})).into_response()
}
