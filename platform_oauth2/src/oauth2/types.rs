use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use crate::platform::split_scopes;
use crate::storage::Token;

use super::errors::OAuth2Error;

/// Redirect target for one authorization attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationRequest {
    #[serde(rename = "authorizationUrl")]
    pub url: String,
    pub state: String,
}

/// Parameters a provider sends back to the redirect URI.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CallbackParams {
    pub code: Option<String>,
    pub state: Option<String>,
    pub error: Option<String>,
    pub error_description: Option<String>,
}

impl CallbackParams {
    /// Reads the callback parameters from a full callback URL, a path with a
    /// query string, or a bare query string. Unknown parameters are ignored.
    pub fn from_callback_url(callback_url: &str) -> Self {
        let without_fragment = callback_url.split('#').next().unwrap_or_default();
        let query = match without_fragment.split_once('?') {
            Some((_, query)) => query,
            None => without_fragment,
        };

        let mut params = Self::default();
        for (key, value) in url::form_urlencoded::parse(query.as_bytes()) {
            let slot = match key.as_ref() {
                "code" => &mut params.code,
                "state" => &mut params.state,
                "error" => &mut params.error,
                "error_description" => &mut params.error_description,
                _ => continue,
            };
            *slot = Some(value.into_owned());
        }
        params
    }
}

/// The access token, optional refresh token and absolute expiry of a grant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenTriple {
    pub access_token: String,
    pub refresh_token: Option<String>,
    pub expires_at: DateTime<Utc>,
}

impl From<&Token> for TokenTriple {
    fn from(token: &Token) -> Self {
        Self {
            access_token: token.access_token.clone(),
            refresh_token: token.refresh_token.clone(),
            expires_at: token.expires_at,
        }
    }
}

/// Result of a code exchange. Failures are values, never propagated errors.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ExchangeOutcome {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_error"
    )]
    pub error: Option<OAuth2Error>,
}

impl ExchangeOutcome {
    pub fn succeeded(token: &Token) -> Self {
        Self {
            success: true,
            access_token: Some(token.access_token.clone()),
            refresh_token: token.refresh_token.clone(),
            expires_at: Some(token.expires_at),
            error: None,
        }
    }

    pub fn failed(error: OAuth2Error) -> Self {
        Self {
            success: false,
            access_token: None,
            refresh_token: None,
            expires_at: None,
            error: Some(error),
        }
    }
}

impl From<&Result<Token, OAuth2Error>> for ExchangeOutcome {
    fn from(result: &Result<Token, OAuth2Error>) -> Self {
        match result {
            Ok(token) => Self::succeeded(token),
            Err(e) => Self::failed(e.clone()),
        }
    }
}

fn serialize_error<S: Serializer>(
    error: &Option<OAuth2Error>,
    serializer: S,
) -> Result<S::Ok, S::Error> {
    match error {
        Some(e) => serializer.serialize_str(&e.to_string()),
        None => serializer.serialize_none(),
    }
}

/// Normalized token endpoint payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct TokenResponse {
    pub(crate) access_token: String,
    pub(crate) refresh_token: Option<String>,
    pub(crate) expires_in: Option<i64>,
    pub(crate) scopes: Option<Vec<String>>,
}

/// Parses a token endpoint body that may be flat or nested under `envelope`.
///
/// `expires_in` is accepted as a number or a numeric string and `scope` as a
/// delimited string or an array. On failure the returned message carries the
/// provider's own error description when one can be found.
pub(crate) fn parse_token_response(
    body: &str,
    envelope: Option<&str>,
) -> Result<TokenResponse, String> {
    let value: Value =
        serde_json::from_str(body).map_err(|e| format!("Malformed token response: {e}"))?;

    let nested = envelope.and_then(|key| value.get(key)).filter(|v| v.is_object());
    let payload = [nested, Some(&value)]
        .into_iter()
        .flatten()
        .find(|v| non_empty_str(v.get("access_token")).is_some());

    let Some(payload) = payload else {
        return Err(provider_error_detail(&value, envelope)
            .unwrap_or_else(|| "Token response has no access_token".to_string()));
    };

    Ok(TokenResponse {
        access_token: non_empty_str(payload.get("access_token"))
            .unwrap_or_default()
            .to_string(),
        refresh_token: non_empty_str(payload.get("refresh_token")).map(str::to_string),
        expires_in: payload.get("expires_in").and_then(as_seconds),
        scopes: payload.get("scope").and_then(as_scopes),
    })
}

/// Best-effort extraction of an error message from an error body.
pub(crate) fn provider_error_detail(value: &Value, envelope: Option<&str>) -> Option<String> {
    let nested = envelope.and_then(|key| value.get(key));
    [nested, Some(value)].into_iter().flatten().find_map(|v| {
        let code = non_empty_str(v.get("error"))
            .or_else(|| non_empty_str(v.get("error").and_then(|e| e.get("code"))));
        let description = ["error_description", "description", "message"]
            .iter()
            .find_map(|key| non_empty_str(v.get(*key)))
            .or_else(|| non_empty_str(v.get("error").and_then(|e| e.get("message"))));
        match (code, description) {
            (Some(c), Some(d)) => Some(format!("{c}: {d}")),
            (Some(c), None) => Some(c.to_string()),
            (None, Some(d)) => Some(d.to_string()),
            (None, None) => None,
        }
    })
}

fn non_empty_str(value: Option<&Value>) -> Option<&str> {
    value.and_then(Value::as_str).filter(|s| !s.is_empty())
}

fn as_seconds(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f as i64)),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn as_scopes(value: &Value) -> Option<Vec<String>> {
    let scopes = match value {
        Value::String(s) => Some(split_scopes(s)),
        Value::Array(items) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
        ),
        _ => None,
    };
    scopes.filter(|scopes| !scopes.is_empty())
}
