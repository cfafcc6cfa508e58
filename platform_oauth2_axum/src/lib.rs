//! Axum routes for `platform-oauth2`
//!
//! Mount [`platform_oauth2_router`] under [`PLATFORM_OAUTH2_ROUTE_PREFIX`] so the
//! callback paths match the redirect URIs registered with each provider:
//!
//! - `GET  {prefix}/{provider}/authorize?scopes=a,b` returns `{authorizationUrl, state}`
//! - `GET|POST {prefix}/{provider}/callback` exchanges the code
//! - `POST {prefix}/{provider}/refresh` forces a refresh
//! - `GET  {prefix}/status` and `{prefix}/status/{provider}`

mod config;
mod error;
mod oauth;
mod router;

pub use config::PLATFORM_OAUTH2_CALLBACK_REDIRECT;
pub use error::IntoResponseError;
pub use router::{platform_oauth2_router, platform_oauth2_router_no_trace};

pub use platform_oauth2::PLATFORM_OAUTH2_ROUTE_PREFIX;
