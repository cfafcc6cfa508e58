//! Central configuration for the platform_oauth2_axum crate

use std::sync::LazyLock;

/// Page the callback route redirects to instead of answering with JSON.
///
/// The outcome is appended as `provider`, `success` and (on failure) `error`
/// query parameters. Unset or empty: the callback answers with JSON.
pub static PLATFORM_OAUTH2_CALLBACK_REDIRECT: LazyLock<Option<String>> = LazyLock::new(|| {
    callback_redirect(std::env::var("PLATFORM_OAUTH2_CALLBACK_REDIRECT").ok().as_deref())
});

fn callback_redirect(env_value: Option<&str>) -> Option<String> {
    env_value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
