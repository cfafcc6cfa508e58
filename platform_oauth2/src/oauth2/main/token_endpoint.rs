use chrono::{Duration, Utc};
use http::header::{ACCEPT, CACHE_CONTROL, CONTENT_TYPE};

use crate::oauth2::errors::OAuth2Error;
use crate::oauth2::types::{TokenResponse, parse_token_response, provider_error_detail};
use crate::platform::{ClientAuthMethod, ExchangeProtocol, PlatformConfig};
use crate::storage::Token;

/// The two grants this crate sends to a token endpoint.
#[derive(Debug, Clone, Copy)]
pub(super) enum Grant<'a> {
    AuthorizationCode {
        code: &'a str,
        code_verifier: Option<&'a str>,
        requested_scopes: &'a [String],
    },
    RefreshToken {
        refresh_token: &'a str,
        current_scopes: &'a [String],
    },
}

impl Grant<'_> {
    fn grant_type(&self) -> &'static str {
        match self {
            Self::AuthorizationCode { .. } => "authorization_code",
            Self::RefreshToken { .. } => "refresh_token",
        }
    }

    fn error(&self, detail: String) -> OAuth2Error {
        match self {
            Self::AuthorizationCode { .. } => OAuth2Error::ExchangeFailed(detail),
            Self::RefreshToken { .. } => OAuth2Error::RefreshFailed(detail),
        }
    }
}

/// Form fields for a token request, named the way the provider expects them.
pub(super) fn token_request_params(
    platform: &PlatformConfig,
    grant: &Grant<'_>,
) -> Vec<(String, String)> {
    let mut params = vec![
        (
            platform.client_id_param().to_string(),
            platform.client_id.clone(),
        ),
        ("grant_type".to_string(), grant.grant_type().to_string()),
    ];

    if platform.quirks.client_auth == ClientAuthMethod::RequestBody
        && !platform.client_secret.is_empty()
    {
        params.push(("client_secret".to_string(), platform.client_secret.clone()));
    }

    match grant {
        Grant::AuthorizationCode {
            code,
            code_verifier,
            ..
        } => {
            params.push(("code".to_string(), code.to_string()));
            params.push(("redirect_uri".to_string(), platform.redirect_uri.clone()));
            if let Some(verifier) = code_verifier {
                params.push(("code_verifier".to_string(), verifier.to_string()));
            }
        }
        Grant::RefreshToken { refresh_token, .. } => {
            params.push(("refresh_token".to_string(), refresh_token.to_string()));
        }
    }

    params
}

/// Performs one token endpoint call and normalizes the result into a [`Token`].
///
/// Errors are `ExchangeFailed` for the code grant and `RefreshFailed` for the
/// refresh grant, carrying the provider's error detail when it sent one.
pub(super) async fn request_token(
    client: &reqwest::Client,
    platform: &PlatformConfig,
    grant: Grant<'_>,
) -> Result<Token, OAuth2Error> {
    let token_url = platform.effective_token_url()?;
    let params = token_request_params(platform, &grant);

    let request = match platform.quirks.exchange {
        ExchangeProtocol::Standard => client.post(&token_url).form(&params),
        ExchangeProtocol::Manual => {
            let body = url::form_urlencoded::Serializer::new(String::new())
                .extend_pairs(params.iter())
                .finish();
            client
                .post(&token_url)
                .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
                .header(CACHE_CONTROL, "no-cache")
                .body(body)
        }
    };
    let request = match platform.quirks.client_auth {
        ClientAuthMethod::BasicHeader => {
            request.basic_auth(&platform.client_id, Some(&platform.client_secret))
        }
        ClientAuthMethod::RequestBody => request,
    };

    tracing::debug!(
        "Token request to {} for {} ({})",
        token_url,
        platform.id,
        grant.grant_type()
    );

    let response = request
        .header(ACCEPT, "application/json")
        .send()
        .await
        .map_err(|e| grant.error(format!("Request to token endpoint failed: {e}")))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| grant.error(format!("Failed to read token response: {e}")))?;

    if !status.is_success() {
        let detail = serde_json::from_str(&body)
            .ok()
            .and_then(|v| provider_error_detail(&v, platform.quirks.response_envelope.as_deref()))
            .unwrap_or_else(|| body.chars().take(200).collect());
        tracing::error!(
            "Token endpoint for {} returned {}: {}",
            platform.id,
            status,
            detail
        );
        return Err(grant.error(format!("{status}: {detail}")));
    }

    let parsed = parse_token_response(&body, platform.quirks.response_envelope.as_deref())
        .map_err(|detail| {
            tracing::error!("Token response from {} rejected: {}", platform.id, detail);
            grant.error(detail)
        })?;

    into_token(platform, &grant, parsed)
}

/// Absolute expiry, falling back to the provider's default lifetime when
/// `expires_in` is missing, non-positive or out of range; scopes and the
/// refresh token fall back to what the grant already had.
fn into_token(
    platform: &PlatformConfig,
    grant: &Grant<'_>,
    parsed: TokenResponse,
) -> Result<Token, OAuth2Error> {
    let now = Utc::now();
    let expires_at = parsed
        .expires_in
        .filter(|secs| *secs > 0)
        .and_then(Duration::try_seconds)
        .and_then(|lifetime| now.checked_add_signed(lifetime))
        .or_else(|| {
            tracing::debug!(
                "No usable expires_in from {}, assuming {}s",
                platform.id,
                platform.default_token_lifetime.num_seconds()
            );
            now.checked_add_signed(platform.default_token_lifetime)
        })
        .ok_or_else(|| grant.error("Token lifetime out of range".to_string()))?;

    let (previous_refresh, previous_scopes) = match grant {
        Grant::AuthorizationCode {
            requested_scopes, ..
        } => (None, *requested_scopes),
        Grant::RefreshToken {
            refresh_token,
            current_scopes,
        } => (Some(*refresh_token), *current_scopes),
    };

    Ok(Token {
        provider_id: platform.id.clone(),
        access_token: parsed.access_token,
        refresh_token: parsed
            .refresh_token
            .or_else(|| previous_refresh.map(str::to_string)),
        expires_at,
        scopes: parsed.scopes.unwrap_or_else(|| previous_scopes.to_vec()),
    })
}
