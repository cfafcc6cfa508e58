mod errors;
mod state_store;
mod token_store;

pub use errors::StorageError;
pub use state_store::{CsrfStateStore, InMemoryStateStore, StateEntry};
pub use token_store::{InMemoryTokenStore, SqlTokenStore, Token, TokenStore};
