mod authorize;
mod client;
mod exchange;
mod fetch;
mod pkce;
mod refresh;
mod token_endpoint;

pub use authorize::AuthorizationUrlBuilder;
pub use client::get_client;
pub use exchange::TokenExchanger;
pub use fetch::{AuthenticatedFetchHandle, FetchRequest};
pub use pkce::code_challenge;

pub(crate) use fetch::FetchHandleCache;
pub(crate) use refresh::RefreshCoordinator;
