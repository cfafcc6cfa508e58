mod classify;
mod errors;
mod health;
mod manager;

pub use classify::{ServiceOutcome, TokenRecipient};
pub use errors::CoordinationError;
pub use health::{PlatformHealth, PlatformStatus};
pub use manager::{CallbackOutcome, OAuthManager, OAuthManagerBuilder};
