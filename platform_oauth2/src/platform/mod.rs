mod config;
mod registry;
mod types;

pub use config::split_scopes;
pub use registry::PlatformRegistry;
pub use types::{
    Capability, ChallengeEncoding, ClientAuthMethod, ExchangeProtocol, PlatformConfig,
    PlatformQuirks,
};
