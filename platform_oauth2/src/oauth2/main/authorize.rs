use std::sync::Arc;

use crate::oauth2::errors::OAuth2Error;
use crate::oauth2::types::AuthorizationRequest;
use crate::platform::{ChallengeEncoding, PlatformConfig, PlatformQuirks, PlatformRegistry};
use crate::storage::{CsrfStateStore, StateEntry};
use crate::utils::gen_random_string;

use super::pkce::{code_challenge, generate_code_verifier};

/// 32 random bytes for the CSRF state (256 bits).
const STATE_BYTES: usize = 32;

const STANDARD_CLIENT_ID_PARAM: &str = "client_id";
const STANDARD_SCOPE_DELIMITER: &str = " ";

/// Issues authorization URLs and records their CSRF state.
pub struct AuthorizationUrlBuilder {
    registry: Arc<PlatformRegistry>,
    states: Arc<dyn CsrfStateStore>,
}

impl AuthorizationUrlBuilder {
    pub fn new(registry: Arc<PlatformRegistry>, states: Arc<dyn CsrfStateStore>) -> Self {
        Self { registry, states }
    }

    /// Builds the redirect URL for `provider_id`.
    ///
    /// `scopes_override`, when given and non-empty, replaces the provider's
    /// default scope set. The state entry is stored before the URL is returned.
    pub async fn build(
        &self,
        provider_id: &str,
        scopes_override: Option<Vec<String>>,
    ) -> Result<AuthorizationRequest, OAuth2Error> {
        let platform = self.registry.get(provider_id)?;
        let mut url = url::Url::parse(&platform.authorization_url).map_err(|e| {
            OAuth2Error::InvalidUrl(format!("{}: {e}", platform.authorization_url))
        })?;

        let state = gen_random_string(STATE_BYTES)?;
        let code_verifier = if platform.requires_pkce {
            Some(generate_code_verifier()?)
        } else {
            None
        };
        let scopes = match scopes_override {
            Some(scopes) if !scopes.is_empty() => scopes,
            _ => platform.default_scopes.clone(),
        };

        self.states
            .put(
                provider_id,
                &state,
                StateEntry::new(provider_id, code_verifier.clone(), scopes.clone()),
            )
            .await?;

        let mut params = standard_params(&platform, &scopes, &state, code_verifier.as_deref());
        apply_quirks(&mut params, &platform.quirks, code_verifier.as_deref());

        url.query_pairs_mut().extend_pairs(params.iter());
        tracing::debug!("Authorization URL for {}: {}", provider_id, url);

        Ok(AuthorizationRequest {
            url: url.into(),
            state,
        })
    }
}

/// Standard authorization-code parameters plus the provider's extra parameters.
fn standard_params(
    platform: &PlatformConfig,
    scopes: &[String],
    state: &str,
    code_verifier: Option<&str>,
) -> Vec<(String, String)> {
    let mut params = vec![
        (
            STANDARD_CLIENT_ID_PARAM.to_string(),
            platform.client_id.clone(),
        ),
        ("redirect_uri".to_string(), platform.redirect_uri.clone()),
        ("response_type".to_string(), "code".to_string()),
        ("scope".to_string(), scopes.join(STANDARD_SCOPE_DELIMITER)),
        ("state".to_string(), state.to_string()),
    ];

    if let Some(verifier) = code_verifier {
        params.push((
            "code_challenge".to_string(),
            code_challenge(verifier, ChallengeEncoding::Base64Url),
        ));
        params.push(("code_challenge_method".to_string(), "S256".to_string()));
    }

    params.extend(platform.quirks.extra_auth_params.iter().cloned());
    params
}

/// Applies the provider's URL transforms in fixed order: client id rename,
/// scope re-delimiting, then challenge re-encoding from the stored verifier.
fn apply_quirks(
    params: &mut [(String, String)],
    quirks: &PlatformQuirks,
    code_verifier: Option<&str>,
) {
    if let Some(name) = &quirks.client_id_param {
        for (key, _) in params.iter_mut().filter(|(k, _)| k == STANDARD_CLIENT_ID_PARAM) {
            *key = name.clone();
        }
    }

    if let Some(delimiter) = &quirks.scope_delimiter {
        for (_, value) in params.iter_mut().filter(|(k, _)| k == "scope") {
            *value = value
                .split(STANDARD_SCOPE_DELIMITER)
                .filter(|s| !s.is_empty())
                .collect::<Vec<_>>()
                .join(delimiter);
        }
    }

    if quirks.challenge_encoding != ChallengeEncoding::Base64Url {
        if let Some(verifier) = code_verifier {
            for (_, value) in params.iter_mut().filter(|(k, _)| k == "code_challenge") {
                *value = code_challenge(verifier, quirks.challenge_encoding);
            }
        }
    }
}
