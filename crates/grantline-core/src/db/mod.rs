use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::Serialize;
use sqlx::postgres::PgPoolOptions;
use sqlx::{Executor, FromRow, PgPool};
use uuid::Uuid;

use crate::config::DatabaseConfig;
use crate::error::{Error, Result};

mod clients;
mod tokens;
mod users;

pub use clients::*;
pub use tokens::*;
pub use users::*;

// --- Connection ---

pub async fn connect(config: &DatabaseConfig) -> Result<PgPool> {
    let url = config.url.resolve()?;
    let mut opts = PgPoolOptions::new().max_connections(config.max_connections);

    if let Some(schema) = &config.schema {
        // Only plain identifiers are interpolated into SET search_path.
        if schema.is_empty()
            || schema.starts_with(|c: char| c.is_ascii_digit())
            || !schema.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
        {
            return Err(Error::Config(format!(
                "invalid schema name '{}': must match [a-zA-Z_][a-zA-Z0-9_]*",
                schema
            )));
        }
        let schema = schema.clone();
        opts = opts.after_connect(move |conn, _meta| {
            let schema = schema.clone();
            Box::pin(async move {
                conn.execute(format!("SET search_path TO \"{}\"", schema).as_str())
                    .await?;
                Ok(())
            })
        });
    }

    let pool = opts.connect(&url).await?;
    Ok(pool)
}

pub async fn migrate(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("../../migrations").run(pool).await?;
    Ok(())
}

// --- Models ---

/// A registered OAuth client. Confidential clients carry a secret digest;
/// public clients authenticate by `client_id` alone.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Client {
    pub id: Uuid,
    pub name: String,
    pub client_id: String,
    #[serde(skip_serializing)]
    pub client_secret_hash: Option<String>,
    pub is_confidential: bool,
    pub allowed_scopes: Vec<String>,
    pub grant_types: Vec<String>,
    pub default_redirect_uri: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Client {
    pub fn allows_grant_type(&self, grant_type: &str) -> bool {
        self.grant_types.iter().any(|g| g == grant_type)
    }

    pub fn allowed_scope_set(&self) -> BTreeSet<&str> {
        self.allowed_scopes.iter().map(String::as_str).collect()
    }
}

#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}

/// Persisted form of an issued token. Only digests of the raw values are kept.
#[derive(Debug, Clone, FromRow)]
pub struct TokenRecord {
    pub id: Uuid,
    /// Internal id of the client (`Client::id`), not the public `client_id`.
    pub client_id: Uuid,
    pub user_id: Option<Uuid>,
    pub token_hash: String,
    pub refresh_token_hash: Option<String>,
    pub scopes: Vec<String>,
    pub expires_at: DateTime<Utc>,
    pub refresh_expires_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Input for registering a client. `client_secret_hash` of `None` makes the
/// client public.
#[derive(Debug, Clone)]
pub struct NewClient {
    pub name: String,
    pub client_id: String,
    pub client_secret_hash: Option<String>,
    pub allowed_scopes: Vec<String>,
    pub grant_types: Vec<String>,
    pub default_redirect_uri: Option<String>,
}

impl NewClient {
    pub fn validate(&self) -> Result<()> {
        if self.client_id.is_empty() {
            return Err(Error::Config("client_id cannot be empty".to_string()));
        }
        if self.client_id.contains(':') {
            // Basic auth splits on the first ':'
            return Err(Error::Config(format!(
                "client_id may not contain ':': {}",
                self.client_id
            )));
        }
        for scope in &self.allowed_scopes {
            crate::config::validate_scope_name(scope)?;
        }
        Ok(())
    }

    pub(crate) fn into_client(self) -> Client {
        Client {
            id: Uuid::now_v7(),
            name: self.name,
            client_id: self.client_id,
            is_confidential: self.client_secret_hash.is_some(),
            client_secret_hash: self.client_secret_hash,
            allowed_scopes: dedup(self.allowed_scopes),
            grant_types: dedup(self.grant_types),
            default_redirect_uri: self.default_redirect_uri,
            created_at: Utc::now(),
        }
    }
}

fn dedup(values: Vec<String>) -> Vec<String> {
    values.into_iter().collect::<BTreeSet<_>>().into_iter().collect()
}

// --- Cleanup ---

/// Delete expired access tokens in batches of 1000 to avoid long locks.
/// Rows whose refresh token is still live are kept.
pub async fn cleanup_expired_tokens(pool: &PgPool) -> Result<u64> {
    let mut total = 0u64;
    loop {
        let result = sqlx::query(
            "DELETE FROM access_tokens WHERE id IN (
                SELECT id FROM access_tokens
                WHERE expires_at <= now()
                  AND (refresh_expires_at IS NULL OR refresh_expires_at <= now())
                LIMIT 1000
            )"
        )
        .execute(pool)
        .await?;
        let affected = result.rows_affected();
        total += affected;
        if affected < 1000 { break; }
    }
    Ok(total)
}
