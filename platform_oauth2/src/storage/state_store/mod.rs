mod memory;
mod types;

pub use memory::InMemoryStateStore;
pub use types::{CsrfStateStore, StateEntry};
