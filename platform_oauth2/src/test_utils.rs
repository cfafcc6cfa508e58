//! Shared fixtures for unit tests across the crate

use std::sync::Arc;

use crate::platform::PlatformRegistry;

pub(crate) const TEST_ORIGIN: &str = "https://app.example.com";

/// Environment lookup with every built-in provider configured.
pub(crate) fn test_lookup(key: &str) -> Option<String> {
    let value = match key {
        "ORIGIN" => TEST_ORIGIN,
        "YOUTUBE_CLIENT_ID" => "yt-client",
        "YOUTUBE_CLIENT_SECRET" => "yt-secret",
        "TIKTOK_CLIENT_ID" => "tt-key",
        "TIKTOK_CLIENT_SECRET" => "tt-secret",
        "INSTAGRAM_CLIENT_ID" => "ig-client",
        "INSTAGRAM_CLIENT_SECRET" => "ig-secret",
        "TWITTER_CLIENT_ID" => "tw-client",
        "TWITTER_CLIENT_SECRET" => "tw-secret",
        _ => return None,
    };
    Some(value.to_string())
}

pub(crate) fn test_registry() -> Arc<PlatformRegistry> {
    match PlatformRegistry::from_lookup("/oauth", test_lookup) {
        Ok(registry) => Arc::new(registry),
        Err(e) => panic!("test registry must load: {e}"),
    }
}
