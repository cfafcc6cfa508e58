use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::platform::PlatformConfig;
use crate::storage::Token;

/// Downstream consumer of a freshly issued token for one capability.
#[async_trait]
pub trait TokenRecipient: Send + Sync + 'static {
    /// Name of the capability this recipient serves.
    fn capability(&self) -> &str;

    async fn receive(&self, provider_id: &str, token: &Token) -> Result<(), String>;
}

/// Result of one logical integration after a callback.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceOutcome {
    pub capability: String,
    pub authenticated: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ServiceOutcome {
    fn ok(capability: &str) -> Self {
        Self {
            capability: capability.to_string(),
            authenticated: true,
            error: None,
        }
    }

    fn failed(capability: &str, error: String) -> Self {
        Self {
            capability: capability.to_string(),
            authenticated: false,
            error: Some(error),
        }
    }
}

/// One outcome per declared capability, judged on the granted scopes and on
/// every recipient registered for it. A provider without declared capabilities
/// is reported as a single capability named after it.
pub(super) async fn classify_grant(
    platform: &PlatformConfig,
    token: &Token,
    recipients: &[Arc<dyn TokenRecipient>],
) -> Vec<ServiceOutcome> {
    if platform.capabilities.is_empty() {
        return vec![ServiceOutcome::ok(&platform.id)];
    }

    let mut outcomes = Vec::with_capacity(platform.capabilities.len());
    for capability in &platform.capabilities {
        if !capability.is_granted_by(&token.scopes) {
            let missing: Vec<&str> = capability
                .required_scopes
                .iter()
                .filter(|s| !token.scopes.contains(s))
                .map(String::as_str)
                .collect();
            tracing::info!(
                "{} not granted for {}, missing {:?}",
                capability.name,
                platform.id,
                missing
            );
            outcomes.push(ServiceOutcome::failed(
                &capability.name,
                format!("Scopes not granted: {}", missing.join(", ")),
            ));
            continue;
        }

        let mut error = None;
        for recipient in recipients
            .iter()
            .filter(|r| r.capability() == capability.name)
        {
            if let Err(e) = recipient.receive(&platform.id, token).await {
                tracing::error!("Recipient for {} failed: {}", capability.name, e);
                error.get_or_insert(e);
            }
        }
        outcomes.push(match error {
            Some(e) => ServiceOutcome::failed(&capability.name, e),
            None => ServiceOutcome::ok(&capability.name),
        });
    }
    outcomes
}

/// Outcomes after a failed exchange: every capability fails with the same error.
pub(super) fn failed_grant(platform: &PlatformConfig, error: &str) -> Vec<ServiceOutcome> {
    if platform.capabilities.is_empty() {
        return vec![ServiceOutcome::failed(&platform.id, error.to_string())];
    }
    platform
        .capabilities
        .iter()
        .map(|c| ServiceOutcome::failed(&c.name, error.to_string()))
        .collect()
}
