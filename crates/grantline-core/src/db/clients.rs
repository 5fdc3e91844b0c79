use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use super::{Client, NewClient};

pub async fn find_client_by_client_id(
    pool: &PgPool,
    client_id: &str,
) -> Result<Option<Client>> {
    let client = sqlx::query_as::<_, Client>(
        "SELECT * FROM oauth_clients WHERE client_id = $1"
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await?;
    Ok(client)
}

pub async fn list_clients(pool: &PgPool) -> Result<Vec<Client>> {
    let clients = sqlx::query_as::<_, Client>(
        "SELECT * FROM oauth_clients ORDER BY created_at DESC"
    )
    .fetch_all(pool)
    .await?;
    Ok(clients)
}

pub async fn create_client(pool: &PgPool, new: NewClient) -> Result<Client> {
    new.validate()?;
    let c = new.into_client();
    let client = sqlx::query_as::<_, Client>(
        "INSERT INTO oauth_clients (id, name, client_id, client_secret_hash, is_confidential, allowed_scopes, grant_types, default_redirect_uri)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
         RETURNING *"
    )
    .bind(c.id)
    .bind(&c.name)
    .bind(&c.client_id)
    .bind(&c.client_secret_hash)
    .bind(c.is_confidential)
    .bind(&c.allowed_scopes)
    .bind(&c.grant_types)
    .bind(&c.default_redirect_uri)
    .fetch_one(pool)
    .await?;
    Ok(client)
}

pub async fn delete_client(pool: &PgPool, id: Uuid) -> Result<bool> {
    let result = sqlx::query("DELETE FROM oauth_clients WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
