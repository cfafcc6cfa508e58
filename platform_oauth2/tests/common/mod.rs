pub mod mock_provider;

pub use fixtures::*;
pub use mock_provider::MockProvider;
