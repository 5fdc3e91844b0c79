//! Token endpoint orchestration (RFC 6749 §3.2), independent of HTTP.
//!
//! Checks run in a fixed order and the first failure is reported:
//! client authentication, then request well-formedness, then grant
//! validation, then scope, then issuance.

use std::sync::Arc;

use crate::client_auth::{self, AuthMethod};
use crate::config::Config;
use crate::error::{Error, Result};
use crate::grants::{GrantContext, GrantRegistry};
use crate::request::TokenRequest;
use crate::scope::ScopeValidator;
use crate::store::{CredentialStore, TokenStore};
use crate::token::{BearerTokenIssuer, Token, TokenIssuer};

/// Methods tried when the grant type is missing or unknown, so that the
/// client is still authenticated before the grant type is rejected.
const FALLBACK_AUTH_METHODS: &[AuthMethod] = &[
    AuthMethod::ClientSecretBasic,
    AuthMethod::ClientSecretPost,
    AuthMethod::None,
];

pub struct TokenEndpoint {
    store: Arc<dyn CredentialStore>,
    issuer: Arc<dyn TokenIssuer>,
    registry: GrantRegistry,
    scopes: ScopeValidator,
}

impl TokenEndpoint {
    pub fn new(
        store: Arc<dyn CredentialStore>,
        issuer: Arc<dyn TokenIssuer>,
        registry: GrantRegistry,
        scopes: ScopeValidator,
    ) -> Self {
        Self { store, issuer, registry, scopes }
    }

    /// Endpoint with the built-in grants and bearer token issuer configured
    /// from `config`.
    pub fn from_config(
        config: &Config,
        store: Arc<dyn CredentialStore>,
        tokens: Arc<dyn TokenStore>,
    ) -> Result<Self> {
        let registry = GrantRegistry::from_config(&config.grants)?;
        let issuer = Arc::new(BearerTokenIssuer::new(tokens, &config.tokens));
        Ok(Self::new(
            store,
            issuer,
            registry,
            ScopeValidator::new(config.scopes.empty_scope),
        ))
    }

    pub fn registry(&self) -> &GrantRegistry {
        &self.registry
    }

    pub async fn handle(&self, request: &TokenRequest) -> Result<Token> {
        let grant_type = request.grant_type();
        let result = self.process(request).await;
        match &result {
            Ok(token) => tracing::debug!(
                grant_type = grant_type.unwrap_or_default(),
                scope = token.scope.as_deref().unwrap_or_default(),
                "token request granted"
            ),
            Err(e) if e.is_oauth() => tracing::info!(
                grant_type = grant_type.unwrap_or_default(),
                error = e.error_code(),
                detail = %e,
                "token request rejected"
            ),
            Err(_) => {}
        }
        result
    }

    async fn process(&self, request: &TokenRequest) -> Result<Token> {
        let handler = request.grant_type().map(|g| self.registry.dispatch(g));
        let auth_methods = match &handler {
            Some(Ok(h)) => h.auth_methods(),
            _ => FALLBACK_AUTH_METHODS,
        };

        let client = client_auth::authenticate_client(self.store.as_ref(), request, auth_methods).await?;
        request.ensure_well_formed()?;

        let handler = handler.ok_or_else(|| Error::missing("grant_type"))??;

        let ctx = GrantContext {
            store: self.store.as_ref(),
            issuer: self.issuer.as_ref(),
            scopes: &self.scopes,
        };
        handler.handle(&ctx, request, &client).await
    }
}
