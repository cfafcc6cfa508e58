//! Error type for the façade

use thiserror::Error;

use crate::oauth2::OAuth2Error;
use crate::storage::StorageError;

#[derive(Debug, Error, Clone)]
pub enum CoordinationError {
    /// Invalid façade setup
    #[error("Coordination error: {0}")]
    Coordination(String),

    /// Error from OAuth2 operations
    #[error("OAuth2 error: {0}")]
    OAuth2Error(OAuth2Error),

    /// Error from the state or token stores
    #[error("Storage error: {0}")]
    StorageError(StorageError),
}

impl CoordinationError {
    /// Log the error and return self
    pub fn log(self) -> Self {
        match &self {
            Self::Coordination(msg) => tracing::error!("Coordination error: {}", msg),
            Self::OAuth2Error(err) => tracing::error!("OAuth2 error: {}", err),
            Self::StorageError(err) => tracing::error!("Storage error: {}", err),
        }
        self
    }

    /// The OAuth2 taxonomy entry behind this error, if any.
    pub fn oauth2(&self) -> Option<&OAuth2Error> {
        match self {
            Self::OAuth2Error(err) => Some(err),
            _ => None,
        }
    }
}

impl From<OAuth2Error> for CoordinationError {
    fn from(err: OAuth2Error) -> Self {
        let error = Self::OAuth2Error(err);
        tracing::error!("{}", error);
        error
    }
}

impl From<StorageError> for CoordinationError {
    fn from(err: StorageError) -> Self {
        let error = Self::StorageError(err);
        tracing::error!("{}", error);
        error
    }
}
