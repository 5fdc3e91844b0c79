use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::config::TokensConfig;
use crate::crypto;
use crate::db::{Client, TokenRecord, User};
use crate::error::{Error, Result};
use crate::scope::Scope;
use crate::store::TokenStore;

/// Successful token response body (RFC 6749 §5.1).
#[derive(Debug, Clone, Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

/// Mints and persists a token for a validated (client, user, scope).
/// `user` is `None` for grants where the client acts on its own behalf.
#[async_trait]
pub trait TokenIssuer: Send + Sync {
    async fn issue_token(&self, client: &Client, user: Option<&User>, scope: &Scope) -> Result<Token>;
}

/// Issues opaque random bearer tokens and stores their SHA-256 digests.
pub struct BearerTokenIssuer {
    store: Arc<dyn TokenStore>,
    access_token_ttl_secs: u64,
    refresh_token_ttl_secs: Option<u64>,
}

impl BearerTokenIssuer {
    pub fn new(store: Arc<dyn TokenStore>, config: &TokensConfig) -> Self {
        Self {
            store,
            access_token_ttl_secs: config.access_token_ttl_secs,
            refresh_token_ttl_secs: config
                .issue_refresh_tokens
                .then_some(config.refresh_token_ttl_secs),
        }
    }
}

#[async_trait]
impl TokenIssuer for BearerTokenIssuer {
    async fn issue_token(&self, client: &Client, user: Option<&User>, scope: &Scope) -> Result<Token> {
        let now = Utc::now();
        let (access_raw, access_hash) = crypto::generate_token();

        // Refresh tokens only make sense when a resource owner is involved
        let refresh = match (self.refresh_token_ttl_secs, user) {
            (Some(ttl), Some(_)) => {
                let (raw, hash) = crypto::generate_token();
                Some((raw, hash, expiry(now, ttl)?))
            }
            _ => None,
        };

        let record = TokenRecord {
            id: Uuid::now_v7(),
            client_id: client.id,
            user_id: user.map(|u| u.id),
            token_hash: access_hash,
            refresh_token_hash: refresh.as_ref().map(|(_, hash, _)| hash.clone()),
            scopes: scope.to_vec(),
            expires_at: expiry(now, self.access_token_ttl_secs)?,
            refresh_expires_at: refresh.as_ref().map(|(_, _, exp)| *exp),
            created_at: now,
        };
        self.store.store_token(&record).await?;

        tracing::info!(
            client_id = %client.client_id,
            user_id = ?record.user_id,
            scope = %scope,
            "access token issued"
        );

        Ok(Token {
            access_token: access_raw,
            token_type: "Bearer",
            expires_in: self.access_token_ttl_secs,
            refresh_token: refresh.map(|(raw, _, _)| raw),
            scope: (!scope.is_empty()).then(|| scope.to_string()),
        })
    }
}

/// `now + ttl_secs`, failing instead of overflowing.
fn expiry(now: DateTime<Utc>, ttl_secs: u64) -> Result<DateTime<Utc>> {
    i64::try_from(ttl_secs)
        .ok()
        .and_then(TimeDelta::try_seconds)
        .and_then(|ttl| now.checked_add_signed(ttl))
        .ok_or_else(|| {
            Error::Internal(anyhow::anyhow!("token lifetime of {ttl_secs}s is out of range"))
        })
}
