use chrono::Utc;
use sqlx::{Pool, Postgres};

use crate::storage::errors::StorageError;

use super::sql::{DB_TABLE_PLATFORM_TOKENS, TokenRow};

pub(super) async fn create_tables_postgres(pool: &Pool<Postgres>) -> Result<(), StorageError> {
    let table = DB_TABLE_PLATFORM_TOKENS.as_str();

    sqlx::query(&format!(
        r#"
        CREATE TABLE IF NOT EXISTS {table} (
            provider_id TEXT PRIMARY KEY NOT NULL,
            access_token TEXT NOT NULL,
            refresh_token TEXT,
            expires_at TIMESTAMPTZ NOT NULL,
            scopes TEXT NOT NULL,
            updated_at TIMESTAMPTZ NOT NULL
        )
        "#
    ))
    .execute(pool)
    .await?;

    Ok(())
}

pub(super) async fn get_token_postgres(
    pool: &Pool<Postgres>,
    provider_id: &str,
) -> Result<Option<TokenRow>, StorageError> {
    let table = DB_TABLE_PLATFORM_TOKENS.as_str();

    let row = sqlx::query_as::<_, TokenRow>(&format!(
        r#"
        SELECT provider_id, access_token, refresh_token, expires_at, scopes
        FROM {table}
        WHERE provider_id = $1
        "#
    ))
    .bind(provider_id)
    .fetch_optional(pool)
    .await?;

    Ok(row)
}

pub(super) async fn upsert_token_postgres(
    pool: &Pool<Postgres>,
    row: &TokenRow,
) -> Result<(), StorageError> {
    let table = DB_TABLE_PLATFORM_TOKENS.as_str();

    sqlx::query(&format!(
        r#"
        INSERT INTO {table} (provider_id, access_token, refresh_token, expires_at, scopes, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6)
        ON CONFLICT (provider_id) DO UPDATE SET
            access_token = EXCLUDED.access_token,
            refresh_token = EXCLUDED.refresh_token,
            expires_at = EXCLUDED.expires_at,
            scopes = EXCLUDED.scopes,
            updated_at = EXCLUDED.updated_at
        "#
    ))
    .bind(&row.provider_id)
    .bind(&row.access_token)
    .bind(&row.refresh_token)
    .bind(row.expires_at)
    .bind(&row.scopes)
    .bind(Utc::now())
    .execute(pool)
    .await?;

    Ok(())
}
