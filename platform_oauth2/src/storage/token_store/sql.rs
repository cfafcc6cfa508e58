//! sqlx-backed token store (SQLite or PostgreSQL)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, Pool, Postgres, Sqlite};
use std::{env, str::FromStr, sync::LazyLock};

use crate::storage::errors::StorageError;

use super::postgres::{create_tables_postgres, get_token_postgres, upsert_token_postgres};
use super::sqlite::{create_tables_sqlite, get_token_sqlite, upsert_token_sqlite};
use super::types::{Token, TokenStore};

/// Table prefix from environment variable
pub(super) static DB_TABLE_PREFIX: LazyLock<String> =
    LazyLock::new(|| env::var("DB_TABLE_PREFIX").unwrap_or_else(|_| "po2_".to_string()));

pub(super) static DB_TABLE_PLATFORM_TOKENS: LazyLock<String> =
    LazyLock::new(|| format!("{}platform_tokens", *DB_TABLE_PREFIX));

#[derive(Clone, Debug)]
pub enum SqlTokenStore {
    Sqlite(Pool<Sqlite>),
    Postgres(Pool<Postgres>),
}

impl SqlTokenStore {
    /// Opens a lazy pool for `sqlite:...` or `postgres://...` and creates the table.
    pub async fn connect(url: &str) -> Result<Self, StorageError> {
        let store = if url.starts_with("sqlite:") {
            let opts = sqlx::sqlite::SqliteConnectOptions::from_str(url)?.create_if_missing(true);
            Self::Sqlite(sqlx::sqlite::SqlitePool::connect_lazy_with(opts))
        } else if url.starts_with("postgres://") || url.starts_with("postgresql://") {
            Self::Postgres(sqlx::PgPool::connect_lazy(url)?)
        } else {
            return Err(StorageError::InvalidInput(format!(
                "Unsupported token store url: {url}. Supported schemes are 'sqlite:' and 'postgres://'"
            )));
        };

        store.init().await?;
        tracing::info!("Token store ready: table={}", *DB_TABLE_PLATFORM_TOKENS);
        Ok(store)
    }

    pub async fn init(&self) -> Result<(), StorageError> {
        match self {
            Self::Sqlite(pool) => create_tables_sqlite(pool).await,
            Self::Postgres(pool) => create_tables_postgres(pool).await,
        }
    }
}

#[async_trait]
impl TokenStore for SqlTokenStore {
    async fn get_active_token(&self, provider_id: &str) -> Result<Option<Token>, StorageError> {
        let row = match self {
            Self::Sqlite(pool) => get_token_sqlite(pool, provider_id).await?,
            Self::Postgres(pool) => get_token_postgres(pool, provider_id).await?,
        };
        row.map(Token::try_from).transpose()
    }

    async fn save_token(&self, provider_id: &str, token: Token) -> Result<(), StorageError> {
        if token.provider_id != provider_id {
            return Err(StorageError::InvalidInput(format!(
                "Token for {} saved under {}",
                token.provider_id, provider_id
            )));
        }
        let row = TokenRow::try_from(token)?;
        match self {
            Self::Sqlite(pool) => upsert_token_sqlite(pool, &row).await,
            Self::Postgres(pool) => upsert_token_postgres(pool, &row).await,
        }
    }
}

/// Row shape shared by both backends; scopes are stored as a JSON array.
#[derive(Debug, Clone, FromRow)]
pub(super) struct TokenRow {
    pub(super) provider_id: String,
    pub(super) access_token: String,
    pub(super) refresh_token: Option<String>,
    pub(super) expires_at: DateTime<Utc>,
    pub(super) scopes: String,
}

impl TryFrom<Token> for TokenRow {
    type Error = StorageError;

    fn try_from(token: Token) -> Result<Self, Self::Error> {
        Ok(Self {
            scopes: serde_json::to_string(&token.scopes)?,
            provider_id: token.provider_id,
            access_token: token.access_token,
            refresh_token: token.refresh_token,
            expires_at: token.expires_at,
        })
    }
}

impl TryFrom<TokenRow> for Token {
    type Error = StorageError;

    fn try_from(row: TokenRow) -> Result<Self, Self::Error> {
        Ok(Self {
            scopes: serde_json::from_str(&row.scopes)?,
            provider_id: row.provider_id,
            access_token: row.access_token,
            refresh_token: row.refresh_token,
            expires_at: row.expires_at,
        })
    }
}
