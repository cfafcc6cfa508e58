use async_trait::async_trait;
use axum::{extract::State, http::StatusCode, response::Html};
use std::fmt::Write;
use std::sync::Arc;

use platform_oauth2::{OAuthManager, Token, TokenRecipient};
use platform_oauth2_axum::PLATFORM_OAUTH2_ROUTE_PREFIX;

/// Lists every configured provider with its connection state.
pub(crate) async fn index(
    State(manager): State<Arc<OAuthManager>>,
) -> Result<Html<String>, (StatusCode, String)> {
    let health = manager
        .health_check()
        .await
        .map_err(|e| (StatusCode::INTERNAL_SERVER_ERROR, e.to_string()))?;

    let prefix = PLATFORM_OAUTH2_ROUTE_PREFIX.as_str();
    let mut rows = String::new();
    for (provider, status) in &health {
        let state = if status.authenticated {
            "connected"
        } else {
            "not connected"
        };
        let _ = write!(
            rows,
            "<li>{provider}: {state} (<a href=\"{prefix}/{provider}/authorize\">authorize url</a>, \
             <a href=\"{prefix}/status/{provider}\">status</a>)</li>"
        );
    }
    if rows.is_empty() {
        rows.push_str("<li>No provider configured. Set {PROVIDER}_CLIENT_ID in .env.</li>");
    }

    Ok(Html(format!(
        "<!DOCTYPE html><html><body><h1>Connected platforms</h1><ul>{rows}</ul></body></html>"
    )))
}

/// Stand-in for a feature service (uploads, analytics) that wants the token.
pub(crate) struct LoggingRecipient {
    capability: String,
}

impl LoggingRecipient {
    pub(crate) fn new(capability: &str) -> Self {
        Self {
            capability: capability.to_string(),
        }
    }
}

#[async_trait]
impl TokenRecipient for LoggingRecipient {
    fn capability(&self) -> &str {
        &self.capability
    }

    async fn receive(&self, provider_id: &str, token: &Token) -> Result<(), String> {
        tracing::info!(
            "{} received a {} token expiring at {}",
            self.capability,
            provider_id,
            token.expires_at
        );
        Ok(())
    }
}
