//! Built-in provider table and environment loading.
//!
//! Every provider deviation lives in the [`PlatformQuirks`] of its entry; the
//! authorization and exchange code never branches on provider ids.

use chrono::{Duration, Utc};

use crate::oauth2::OAuth2Error;

use super::types::{
    Capability, ChallengeEncoding, ClientAuthMethod, ExchangeProtocol, PlatformConfig,
    PlatformQuirks,
};

const DEFAULT_TOKEN_LIFETIME_HOURS: i64 = 24;

pub(super) const BUILTIN_PLATFORM_IDS: [&str; 4] = ["youtube", "tiktok", "instagram", "twitter"];

/// Static part of a provider entry; credentials come from the environment.
pub(super) fn builtin_platform(id: &str) -> Option<PlatformConfig> {
    let base = |authorization_url: &str, token_url: &str, scopes: &[&str]| PlatformConfig {
        id: id.to_string(),
        authorization_url: authorization_url.to_string(),
        token_url: token_url.to_string(),
        client_id: String::new(),
        client_secret: String::new(),
        redirect_uri: String::new(),
        default_scopes: scopes.iter().map(|s| s.to_string()).collect(),
        requires_pkce: false,
        default_token_lifetime: Duration::hours(DEFAULT_TOKEN_LIFETIME_HOURS),
        quirks: PlatformQuirks::default(),
        capabilities: vec![],
    };

    let platform = match id {
        "youtube" => PlatformConfig {
            quirks: PlatformQuirks {
                extra_auth_params: vec![
                    ("access_type".to_string(), "offline".to_string()),
                    ("prompt".to_string(), "consent".to_string()),
                    ("include_granted_scopes".to_string(), "true".to_string()),
                ],
                ..Default::default()
            },
            capabilities: vec![
                Capability::new(
                    "youtube",
                    &["https://www.googleapis.com/auth/youtube.upload"],
                ),
                Capability::new(
                    "youtube_analytics",
                    &["https://www.googleapis.com/auth/yt-analytics.readonly"],
                ),
            ],
            ..base(
                "https://accounts.google.com/o/oauth2/v2/auth",
                "https://oauth2.googleapis.com/token",
                &[
                    "https://www.googleapis.com/auth/youtube.upload",
                    "https://www.googleapis.com/auth/youtube.readonly",
                    "https://www.googleapis.com/auth/yt-analytics.readonly",
                ],
            )
        },
        "tiktok" => PlatformConfig {
            requires_pkce: true,
            quirks: PlatformQuirks {
                client_id_param: Some("client_key".to_string()),
                scope_delimiter: Some(",".to_string()),
                challenge_encoding: ChallengeEncoding::Hex,
                token_path: Some("/v2/oauth/token/".to_string()),
                exchange: ExchangeProtocol::Manual,
                response_envelope: Some("data".to_string()),
                ..Default::default()
            },
            capabilities: vec![Capability::new(
                "tiktok",
                &["video.upload", "video.publish"],
            )],
            ..base(
                "https://www.tiktok.com/v2/auth/authorize/",
                "https://open.tiktokapis.com/v2/oauth/token/",
                &["user.info.basic", "video.upload", "video.publish"],
            )
        },
        "instagram" => PlatformConfig {
            quirks: PlatformQuirks {
                scope_delimiter: Some(",".to_string()),
                exchange: ExchangeProtocol::Manual,
                ..Default::default()
            },
            capabilities: vec![Capability::new(
                "instagram",
                &["instagram_business_content_publish"],
            )],
            ..base(
                "https://api.instagram.com/oauth/authorize",
                "https://api.instagram.com/oauth/access_token",
                &[
                    "instagram_business_basic",
                    "instagram_business_content_publish",
                ],
            )
        },
        "twitter" => PlatformConfig {
            requires_pkce: true,
            quirks: PlatformQuirks {
                client_auth: ClientAuthMethod::BasicHeader,
                ..Default::default()
            },
            capabilities: vec![Capability::new("twitter", &["tweet.write"])],
            ..base(
                "https://twitter.com/i/oauth2/authorize",
                "https://api.twitter.com/2/oauth2/token",
                &["tweet.read", "tweet.write", "users.read", "offline.access"],
            )
        },
        _ => return None,
    };

    Some(platform)
}

/// Fills credentials and overrides for one provider from `lookup`.
///
/// Keys are `{ID}_CLIENT_ID`, `{ID}_CLIENT_SECRET`, `{ID}_REDIRECT_URI`,
/// `{ID}_SCOPES`, `{ID}_TOKEN_LIFETIME_SECS`, `{ID}_AUTH_URL` and `{ID}_TOKEN_URL`.
/// The redirect URI defaults to `{ORIGIN}{route_prefix}/{id}/callback`.
pub(super) fn apply_env<F>(
    mut platform: PlatformConfig,
    route_prefix: &str,
    lookup: &F,
) -> Result<PlatformConfig, OAuth2Error>
where
    F: Fn(&str) -> Option<String>,
{
    let env_key = |suffix: &str| format!("{}_{}", platform.id.to_uppercase(), suffix);
    let get = |suffix: &str| {
        lookup(&env_key(suffix))
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    };

    platform.client_id = get("CLIENT_ID").unwrap_or_default();
    if !platform.is_configured() {
        tracing::debug!("Provider {} has no client id, leaving unconfigured", platform.id);
        return Ok(platform);
    }
    platform.client_secret = get("CLIENT_SECRET").unwrap_or_default();

    if let Some(url) = get("AUTH_URL") {
        platform.authorization_url = url;
    }
    if let Some(url) = get("TOKEN_URL") {
        platform.token_url = url;
    }
    if let Some(scopes) = get("SCOPES") {
        platform.default_scopes = split_scopes(&scopes);
    }
    if let Some(secs) = get("TOKEN_LIFETIME_SECS") {
        platform.default_token_lifetime = secs
            .parse::<i64>()
            .ok()
            .filter(|secs| *secs > 0)
            .and_then(Duration::try_seconds)
            .filter(|lifetime| Utc::now().checked_add_signed(*lifetime).is_some())
            .ok_or_else(|| {
                OAuth2Error::Config(format!(
                    "{} must be a positive number of seconds within calendar range",
                    env_key("TOKEN_LIFETIME_SECS")
                ))
            })?;
    }

    platform.redirect_uri = match get("REDIRECT_URI") {
        Some(uri) => uri,
        None => {
            let origin = lookup("ORIGIN").filter(|o| !o.trim().is_empty()).ok_or_else(|| {
                OAuth2Error::Config(format!(
                    "{} is not set and ORIGIN is missing",
                    env_key("REDIRECT_URI")
                ))
            })?;
            format!(
                "{}{}/{}/callback",
                origin.trim().trim_end_matches('/'),
                route_prefix,
                platform.id
            )
        }
    };

    Ok(platform)
}

/// Splits a scope list written with commas and/or whitespace.
pub fn split_scopes(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
