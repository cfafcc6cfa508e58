//! platform-oauth2 - one authorization-code and token lifecycle for many providers
//!
//! Providers that bend the OAuth2 standard (renamed client id parameter, comma
//! delimited scopes, hex PKCE challenges, form-only token endpoints, nested
//! token payloads) are described as data in a [`PlatformRegistry`]. A single
//! [`OAuthManager`] then drives every provider through the same state machine:
//!
//! 1. [`OAuthManager::authorization_url`] mints a CSRF state (and PKCE verifier
//!    when needed) and returns the redirect URL.
//! 2. [`OAuthManager::handle_callback`] consumes the state, exchanges the code
//!    and stores the token, reporting failures as values.
//! 3. [`OAuthManager::authenticated_fetch`] injects the stored token into API
//!    calls, refreshing it before the call or once after a 401.
//!
//! ```no_run
//! use std::sync::Arc;
//! use platform_oauth2::{OAuthManager, PlatformRegistry};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let registry = Arc::new(PlatformRegistry::from_env()?);
//! let manager = OAuthManager::builder(registry).build()?;
//! let request = manager.authorization_url("youtube", None).await?;
//! println!("redirect to {}", request.url);
//! # Ok(())
//! # }
//! ```

mod config;
mod coordination;
mod oauth2;
mod platform;
mod storage;
mod utils;

#[cfg(test)]
mod test_utils;

pub use config::{
    PLATFORM_OAUTH2_HTTP_TIMEOUT, PLATFORM_OAUTH2_ROUTE_PREFIX,
    PLATFORM_OAUTH2_STATE_SWEEP_INTERVAL, PLATFORM_OAUTH2_STATE_TTL,
};

pub use coordination::{
    CallbackOutcome, CoordinationError, OAuthManager, OAuthManagerBuilder, PlatformHealth,
    PlatformStatus, ServiceOutcome, TokenRecipient,
};

pub use oauth2::{
    AuthenticatedFetchHandle, AuthorizationRequest, AuthorizationUrlBuilder, CallbackParams,
    ExchangeOutcome, FetchRequest, OAuth2Error, TokenExchanger, TokenTriple, code_challenge,
    get_client,
};

pub use platform::{
    Capability, ChallengeEncoding, ClientAuthMethod, ExchangeProtocol, PlatformConfig,
    PlatformQuirks, PlatformRegistry, split_scopes,
};

pub use storage::{
    CsrfStateStore, InMemoryStateStore, InMemoryTokenStore, SqlTokenStore, StateEntry,
    StorageError, Token, TokenStore,
};

pub use utils::{UtilError, base64url_decode, base64url_encode, gen_random_string};
