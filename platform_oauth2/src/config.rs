//! Central configuration for the platform_oauth2 crate

use std::sync::LazyLock;
use std::time::Duration;

/// Route prefix under which the HTTP surface is mounted.
///
/// Also used to derive default redirect URIs (`{ORIGIN}{prefix}/{provider}/callback`).
/// Default: "/oauth"
pub static PLATFORM_OAUTH2_ROUTE_PREFIX: LazyLock<String> = LazyLock::new(|| {
    std::env::var("PLATFORM_OAUTH2_ROUTE_PREFIX").unwrap_or_else(|_| "/oauth".to_string())
});

/// Lifetime of a CSRF state entry. Default 30 minutes.
pub static PLATFORM_OAUTH2_STATE_TTL: LazyLock<Duration> =
    LazyLock::new(|| Duration::from_secs(env_secs("PLATFORM_OAUTH2_STATE_TTL_SECS", 1800)));

/// Interval of the background sweep over expired CSRF state entries.
pub static PLATFORM_OAUTH2_STATE_SWEEP_INTERVAL: LazyLock<Duration> =
    LazyLock::new(|| Duration::from_secs(env_secs("PLATFORM_OAUTH2_STATE_SWEEP_SECS", 300)));

/// Upper bound for every outbound HTTP call (code exchange, refresh, proxied API calls).
pub static PLATFORM_OAUTH2_HTTP_TIMEOUT: LazyLock<Duration> =
    LazyLock::new(|| Duration::from_secs(env_secs("PLATFORM_OAUTH2_HTTP_TIMEOUT_SECS", 30)));

fn env_secs(key: &str, default: u64) -> u64 {
    parse_secs(std::env::var(key).ok().as_deref(), default)
}

fn parse_secs(value: Option<&str>, default: u64) -> u64 {
    match value.map(str::trim) {
        Some(v) if !v.is_empty() => v.parse().unwrap_or_else(|_| {
            tracing::warn!("Ignoring non-numeric duration {:?}, using {}s", v, default);
            default
        }),
        _ => default,
    }
}
