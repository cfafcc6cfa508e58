use std::time::Duration;

use crate::config::PLATFORM_OAUTH2_HTTP_TIMEOUT;
use crate::oauth2::errors::OAuth2Error;

/// HTTP client shared by code exchange, refresh and proxied API calls.
///
/// Every request made through it is bounded by `PLATFORM_OAUTH2_HTTP_TIMEOUT`.
pub fn get_client() -> Result<reqwest::Client, OAuth2Error> {
    build_client(*PLATFORM_OAUTH2_HTTP_TIMEOUT)
}

pub(crate) fn build_client(timeout: Duration) -> Result<reqwest::Client, OAuth2Error> {
    reqwest::Client::builder()
        .timeout(timeout)
        .pool_idle_timeout(Duration::from_secs(90))
        .pool_max_idle_per_host(32)
        .build()
        .map_err(|e| OAuth2Error::Config(format!("Failed to create HTTP client: {e}")))
}
