use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::storage::Token;

/// Per-provider entry of the health check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformHealth {
    pub configured: bool,
    pub authenticated: bool,
}

/// Detailed view of one provider's token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    pub configured: bool,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    pub has_refresh_token: bool,
    pub scopes: Vec<String>,
}

impl PlatformStatus {
    pub(super) fn from_token(token: Option<&Token>, now: DateTime<Utc>) -> Self {
        Self {
            configured: true,
            authenticated: is_authenticated_at(token, now),
            expires_at: token.map(|t| t.expires_at),
            has_refresh_token: token.is_some_and(Token::is_refreshable),
            scopes: token.map(|t| t.scopes.clone()).unwrap_or_default(),
        }
    }
}

/// A stored token counts while it is unexpired or carries a refresh token.
pub(super) fn is_authenticated_at(token: Option<&Token>, now: DateTime<Utc>) -> bool {
    token.is_some_and(|t| t.is_usable_at(now))
}
