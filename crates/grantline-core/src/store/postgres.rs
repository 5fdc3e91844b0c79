use async_trait::async_trait;
use sqlx::PgPool;

use crate::db::{self, Client, TokenRecord, User};
use crate::error::Result;

use super::{CredentialStore, TokenStore};

/// Postgres-backed store over the `oauth_clients`, `users` and
/// `access_tokens` tables.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl CredentialStore for PgStore {
    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        db::find_client_by_client_id(&self.pool, client_id).await
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        db::find_user_by_username(&self.pool, username).await
    }
}

#[async_trait]
impl TokenStore for PgStore {
    async fn store_token(&self, record: &TokenRecord) -> Result<()> {
        db::store_token(&self.pool, record).await
    }
}
