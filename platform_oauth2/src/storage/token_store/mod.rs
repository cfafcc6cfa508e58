mod memory;
mod postgres;
mod sql;
mod sqlite;
mod types;

pub use memory::InMemoryTokenStore;
pub use sql::SqlTokenStore;
pub use types::{Token, TokenStore};
