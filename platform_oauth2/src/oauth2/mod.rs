mod errors;
mod main;
mod types;

pub use errors::OAuth2Error;
pub use main::{
    AuthenticatedFetchHandle, AuthorizationUrlBuilder, FetchRequest, TokenExchanger,
    code_challenge, get_client,
};
pub use types::{AuthorizationRequest, CallbackParams, ExchangeOutcome, TokenTriple};

pub(crate) use main::{FetchHandleCache, RefreshCoordinator};
