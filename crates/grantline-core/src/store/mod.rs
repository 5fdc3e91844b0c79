//! Persistence contracts consumed by the token endpoint.
//!
//! The endpoint only ever issues point-in-time reads of clients and users and
//! a single insert of a new token record; implementations own consistency.

use async_trait::async_trait;

use crate::crypto;
use crate::db::{Client, TokenRecord, User};
use crate::error::Result;

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

/// Client and resource owner lookup.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    async fn find_client(&self, client_id: &str) -> Result<Option<Client>>;

    async fn find_user(&self, username: &str) -> Result<Option<User>>;

    /// Public clients have no secret and never verify.
    async fn verify_client_secret(&self, client: &Client, secret: &str) -> bool {
        match &client.client_secret_hash {
            Some(hash) => crypto::secret_matches(secret, hash),
            None => false,
        }
    }

    /// Argon2 is CPU-bound, so verification runs on the blocking pool.
    async fn verify_user_password(&self, user: &User, password: &str) -> bool {
        let password = password.to_owned();
        let phc = user.password_hash.clone();
        tokio::task::spawn_blocking(move || crypto::verify_password(&password, &phc))
            .await
            .unwrap_or_else(|e| {
                tracing::error!(error = %e, "password verification task failed");
                false
            })
    }
}

/// Sink for issued tokens.
#[async_trait]
pub trait TokenStore: Send + Sync {
    async fn store_token(&self, record: &TokenRecord) -> Result<()>;
}
