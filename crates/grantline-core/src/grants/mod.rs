//! Grant-type dispatch for the token endpoint.
//!
//! Each grant type is a [`GrantHandler`] registered under its `grant_type`
//! name. The registry is assembled once at startup and shared read-only.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;

use crate::client_auth::AuthMethod;
use crate::config::GrantsConfig;
use crate::db::Client;
use crate::error::{Error, Result};
use crate::request::TokenRequest;
use crate::scope::ScopeValidator;
use crate::store::CredentialStore;
use crate::token::{Token, TokenIssuer};

mod client_credentials;
mod password;

pub use client_credentials::ClientCredentialsGrant;
pub use password::PasswordGrant;

/// Collaborators a handler may consult while validating a request.
pub struct GrantContext<'a> {
    pub store: &'a dyn CredentialStore,
    pub issuer: &'a dyn TokenIssuer,
    pub scopes: &'a ScopeValidator,
}

#[async_trait]
pub trait GrantHandler: Send + Sync {
    /// Client authentication methods accepted for this grant.
    fn auth_methods(&self) -> &[AuthMethod];

    /// Validate the grant for an already-authenticated client and issue a token.
    async fn handle(
        &self,
        ctx: &GrantContext<'_>,
        request: &TokenRequest,
        client: &Client,
    ) -> Result<Token>;
}

#[derive(Clone, Default)]
pub struct GrantRegistry {
    handlers: HashMap<String, Arc<dyn GrantHandler>>,
}

impl GrantRegistry {
    pub fn builder() -> GrantRegistryBuilder {
        GrantRegistryBuilder::default()
    }

    /// Registry with the built-in grants enabled in `config`.
    pub fn from_config(config: &GrantsConfig) -> Result<Self> {
        let mut builder = Self::builder();
        if config.password.enabled {
            builder = builder.register(
                PasswordGrant::GRANT_TYPE,
                PasswordGrant::new(config.password.auth_methods.clone()),
            )?;
        }
        if config.client_credentials.enabled {
            builder = builder.register(
                ClientCredentialsGrant::GRANT_TYPE,
                ClientCredentialsGrant::new(config.client_credentials.auth_methods.clone()),
            )?;
        }
        Ok(builder.build())
    }

    pub fn dispatch(&self, grant_type: &str) -> Result<&Arc<dyn GrantHandler>> {
        self.handlers
            .get(grant_type)
            .ok_or_else(|| Error::UnsupportedGrantType(grant_type.to_string()))
    }

    /// Registered grant type names, sorted.
    pub fn grant_types(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

#[derive(Default)]
pub struct GrantRegistryBuilder {
    handlers: HashMap<String, Arc<dyn GrantHandler>>,
}

impl GrantRegistryBuilder {
    pub fn register(
        mut self,
        grant_type: &str,
        handler: impl GrantHandler + 'static,
    ) -> Result<Self> {
        if grant_type.is_empty() {
            return Err(Error::Config("grant type name cannot be empty".to_string()));
        }
        if self.handlers.contains_key(grant_type) {
            return Err(Error::Config(format!(
                "grant type '{grant_type}' registered twice"
            )));
        }
        self.handlers.insert(grant_type.to_string(), Arc::new(handler));
        Ok(self)
    }

    pub fn build(self) -> GrantRegistry {
        GrantRegistry { handlers: self.handlers }
    }
}
