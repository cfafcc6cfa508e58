use async_trait::async_trait;
use std::collections::HashMap;
use tokio::sync::RwLock;

use crate::storage::errors::StorageError;

use super::types::{Token, TokenStore};

#[derive(Default)]
pub struct InMemoryTokenStore {
    entry: RwLock<HashMap<String, Token>>,
}

impl InMemoryTokenStore {
    pub fn new() -> Self {
        tracing::info!("Creating new in-memory token store");
        Self::default()
    }
}

#[async_trait]
impl TokenStore for InMemoryTokenStore {
    async fn get_active_token(&self, provider_id: &str) -> Result<Option<Token>, StorageError> {
        Ok(self.entry.read().await.get(provider_id).cloned())
    }

    async fn save_token(&self, provider_id: &str, token: Token) -> Result<(), StorageError> {
        if token.provider_id != provider_id {
            return Err(StorageError::InvalidInput(format!(
                "Token for {} saved under {}",
                token.provider_id, provider_id
            )));
        }
        self.entry
            .write()
            .await
            .insert(provider_id.to_string(), token);
        Ok(())
    }
}
