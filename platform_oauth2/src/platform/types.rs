use chrono::Duration;
use serde::{Deserialize, Serialize};

use crate::oauth2::OAuth2Error;

/// Immutable settings for one provider, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlatformConfig {
    pub id: String,
    pub authorization_url: String,
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
    /// Ordered default scope set.
    pub default_scopes: Vec<String>,
    pub requires_pkce: bool,
    /// Lifetime assumed when the token endpoint omits `expires_in`.
    pub default_token_lifetime: Duration,
    pub quirks: PlatformQuirks,
    /// Logical integrations a single authorization round trip can satisfy.
    pub capabilities: Vec<Capability>,
}

impl PlatformConfig {
    /// A provider counts as configured once it has a non-empty client id.
    pub fn is_configured(&self) -> bool {
        !self.client_id.trim().is_empty()
    }

    /// Name of the client identifier parameter, in both the authorize URL and the token body.
    pub fn client_id_param(&self) -> &str {
        self.quirks.client_id_param.as_deref().unwrap_or("client_id")
    }

    /// Token endpoint, with the alternate path applied when the provider declares one.
    pub fn effective_token_url(&self) -> Result<String, OAuth2Error> {
        let Some(path) = &self.quirks.token_path else {
            return Ok(self.token_url.clone());
        };
        let mut url = url::Url::parse(&self.token_url)
            .map_err(|e| OAuth2Error::InvalidUrl(format!("{}: {e}", self.token_url)))?;
        url.set_path(path);
        Ok(url.to_string())
    }
}

/// Provider deviations from the standard authorization code flow, as data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlatformQuirks {
    /// Non-standard name for the client identifier parameter (e.g. `client_key`).
    pub client_id_param: Option<String>,
    /// Scope delimiter when the provider rejects a single space.
    pub scope_delimiter: Option<String>,
    pub challenge_encoding: ChallengeEncoding,
    /// Extra authorize parameters, e.g. the ones that force refresh-token issuance.
    pub extra_auth_params: Vec<(String, String)>,
    /// Alternate token endpoint path, replacing the path of `token_url`.
    pub token_path: Option<String>,
    pub exchange: ExchangeProtocol,
    /// Key under which some providers nest the token payload.
    pub response_envelope: Option<String>,
    pub client_auth: ClientAuthMethod,
}

/// Encoding of the PKCE S256 digest in the authorize URL.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChallengeEncoding {
    #[default]
    Base64Url,
    /// Lowercase hex of the SHA-256 digest.
    Hex,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExchangeProtocol {
    /// Standard authorization-code grant body with a flat JSON response.
    #[default]
    Standard,
    /// Hand-assembled form POST using the provider's field names; the response
    /// may be flat or nested under `response_envelope`.
    Manual,
}

/// Where client credentials go on token endpoint calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClientAuthMethod {
    #[default]
    RequestBody,
    BasicHeader,
}

/// A named downstream integration satisfied when all of its scopes are granted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capability {
    pub name: String,
    pub required_scopes: Vec<String>,
}

impl Capability {
    pub fn new(name: &str, required_scopes: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            required_scopes: required_scopes.iter().map(|s| s.to_string()).collect(),
        }
    }

    pub fn is_granted_by(&self, granted: &[String]) -> bool {
        self.required_scopes
            .iter()
            .all(|required| granted.iter().any(|g| g == required))
    }
}
