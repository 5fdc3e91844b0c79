use sqlx::PgPool;

use crate::error::Result;
use super::TokenRecord;

// --- Access token queries ---

pub async fn store_token(pool: &PgPool, record: &TokenRecord) -> Result<()> {
    sqlx::query(
        "INSERT INTO access_tokens (id, client_id, user_id, token_hash, refresh_token_hash, scopes, expires_at, refresh_expires_at, created_at)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)"
    )
    .bind(record.id)
    .bind(record.client_id)
    .bind(record.user_id)
    .bind(&record.token_hash)
    .bind(&record.refresh_token_hash)
    .bind(&record.scopes)
    .bind(record.expires_at)
    .bind(record.refresh_expires_at)
    .bind(record.created_at)
    .execute(pool)
    .await?;
    Ok(())
}
