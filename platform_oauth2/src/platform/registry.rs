use std::collections::BTreeMap;
use std::sync::Arc;

use crate::config::PLATFORM_OAUTH2_ROUTE_PREFIX;
use crate::oauth2::OAuth2Error;

use super::config::{BUILTIN_PLATFORM_IDS, apply_env, builtin_platform};
use super::types::PlatformConfig;

/// Read-only table of provider settings, keyed by provider id.
#[derive(Debug, Clone, Default)]
pub struct PlatformRegistry {
    platforms: BTreeMap<String, Arc<PlatformConfig>>,
}

impl PlatformRegistry {
    pub fn new(platforms: impl IntoIterator<Item = PlatformConfig>) -> Self {
        Self {
            platforms: platforms
                .into_iter()
                .map(|p| (p.id.clone(), Arc::new(p)))
                .collect(),
        }
    }

    /// Loads the built-in providers with credentials from the process environment.
    pub fn from_env() -> Result<Self, OAuth2Error> {
        Self::from_lookup(PLATFORM_OAUTH2_ROUTE_PREFIX.as_str(), |key| {
            std::env::var(key).ok()
        })
    }

    pub fn from_lookup<F>(route_prefix: &str, lookup: F) -> Result<Self, OAuth2Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut platforms = Vec::with_capacity(BUILTIN_PLATFORM_IDS.len());
        for id in BUILTIN_PLATFORM_IDS {
            let Some(platform) = builtin_platform(id) else {
                continue;
            };
            let platform = apply_env(platform, route_prefix, &lookup)?;
            if platform.is_configured() {
                tracing::info!("Configured provider {}", platform.id);
            }
            platforms.push(platform);
        }
        Ok(Self::new(platforms))
    }

    /// Resolves a configured provider.
    pub fn get(&self, provider_id: &str) -> Result<Arc<PlatformConfig>, OAuth2Error> {
        self.platforms
            .get(provider_id)
            .filter(|p| p.is_configured())
            .cloned()
            .ok_or_else(|| OAuth2Error::UnknownProvider(provider_id.to_string()))
    }

    pub fn is_configured(&self, provider_id: &str) -> bool {
        self.get(provider_id).is_ok()
    }

    /// Configured providers in id order.
    pub fn configured(&self) -> impl Iterator<Item = &Arc<PlatformConfig>> {
        self.platforms.values().filter(|p| p.is_configured())
    }
}
