use sqlx::PgPool;
use uuid::Uuid;

use crate::error::Result;
use super::User;

// --- User queries ---

pub async fn find_user_by_username(pool: &PgPool, username: &str) -> Result<Option<User>> {
    let user = sqlx::query_as::<_, User>(
        "SELECT * FROM users WHERE lower(username) = lower($1)"
    )
    .bind(username)
    .fetch_optional(pool)
    .await?;
    Ok(user)
}

/// Insert a user. `password_hash` must already be an Argon2 PHC string.
pub async fn create_user(pool: &PgPool, username: &str, password_hash: &str) -> Result<User> {
    let id = Uuid::now_v7();
    let user = sqlx::query_as::<_, User>(
        "INSERT INTO users (id, username, password_hash)
         VALUES ($1, $2, $3)
         RETURNING *"
    )
    .bind(id)
    .bind(username)
    .bind(password_hash)
    .fetch_one(pool)
    .await?;
    Ok(user)
}

pub async fn list_users(pool: &PgPool, limit: i64, offset: i64) -> Result<Vec<User>> {
    let users = sqlx::query_as::<_, User>(
        "SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"
    )
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    Ok(users)
}
