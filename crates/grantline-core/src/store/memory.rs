use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::crypto;
use crate::db::{Client, NewClient, TokenRecord, User};
use crate::error::{Error, Result};

use super::{CredentialStore, TokenStore};

/// In-process store. Reads clone the record so callers never observe a
/// half-written client or user.
#[derive(Default)]
pub struct MemoryStore {
    clients: RwLock<HashMap<String, Client>>,
    // keyed by lowercased username
    users: RwLock<HashMap<String, User>>,
    tokens: RwLock<HashMap<String, TokenRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_client(&self, new: NewClient) -> Result<Client> {
        new.validate()?;
        let mut clients = self.clients.write().unwrap_or_else(PoisonError::into_inner);
        if clients.contains_key(&new.client_id) {
            return Err(Error::Config(format!("client_id already registered: {}", new.client_id)));
        }
        let client = new.into_client();
        clients.insert(client.client_id.clone(), client.clone());
        Ok(client)
    }

    /// Register a resource owner; the password is hashed with Argon2id.
    pub fn insert_user(&self, username: &str, password: &str) -> Result<User> {
        let key = username.to_lowercase();
        let password_hash = crypto::hash_password(password)?;
        let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
        if users.contains_key(&key) {
            return Err(Error::Config(format!("username already registered: {username}")));
        }
        let user = User {
            id: Uuid::now_v7(),
            username: username.to_string(),
            password_hash,
            created_at: Utc::now(),
        };
        users.insert(key, user.clone());
        Ok(user)
    }

    pub fn token_count(&self) -> usize {
        self.tokens.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Unexpired token record for the digest of a raw access token.
    pub fn find_token(&self, token_hash: &str) -> Option<TokenRecord> {
        let tokens = self.tokens.read().unwrap_or_else(PoisonError::into_inner);
        tokens
            .get(token_hash)
            .filter(|t| t.expires_at > Utc::now())
            .cloned()
    }
}

#[async_trait]
impl CredentialStore for MemoryStore {
    async fn find_client(&self, client_id: &str) -> Result<Option<Client>> {
        let clients = self.clients.read().unwrap_or_else(PoisonError::into_inner);
        Ok(clients.get(client_id).cloned())
    }

    async fn find_user(&self, username: &str) -> Result<Option<User>> {
        let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
        Ok(users.get(&username.to_lowercase()).cloned())
    }
}

#[async_trait]
impl TokenStore for MemoryStore {
    async fn store_token(&self, record: &TokenRecord) -> Result<()> {
        let mut tokens = self.tokens.write().unwrap_or_else(PoisonError::into_inner);
        if tokens.contains_key(&record.token_hash) {
            return Err(Error::Internal(anyhow::anyhow!("duplicate token hash")));
        }
        tokens.insert(record.token_hash.clone(), record.clone());
        Ok(())
    }

}
