//! Resource Owner Password Credentials grant (RFC 6749 §4.3).

use async_trait::async_trait;

use crate::client_auth::AuthMethod;
use crate::db::Client;
use crate::error::{Error, Result};
use crate::request::TokenRequest;
use crate::token::Token;

use super::{GrantContext, GrantHandler};

pub struct PasswordGrant {
    auth_methods: Vec<AuthMethod>,
}

impl PasswordGrant {
    pub const GRANT_TYPE: &'static str = "password";

    pub fn new(auth_methods: Vec<AuthMethod>) -> Self {
        Self { auth_methods }
    }
}

impl Default for PasswordGrant {
    fn default() -> Self {
        Self::new(vec![AuthMethod::ClientSecretBasic, AuthMethod::None])
    }
}

#[async_trait]
impl GrantHandler for PasswordGrant {
    fn auth_methods(&self) -> &[AuthMethod] {
        &self.auth_methods
    }

    async fn handle(
        &self,
        ctx: &GrantContext<'_>,
        request: &TokenRequest,
        client: &Client,
    ) -> Result<Token> {
        if !client.allows_grant_type(Self::GRANT_TYPE) {
            return Err(Error::UnauthorizedClient(Self::GRANT_TYPE.to_string()));
        }

        let username = request.require("username")?;
        let password = request.require("password")?;

        // Unknown user and wrong password are indistinguishable to the caller
        let verified = match ctx.store.find_user(username).await? {
            Some(user) => ctx
                .store
                .verify_user_password(&user, password)
                .await
                .then_some(user),
            None => None,
        };
        let Some(user) = verified else {
            tracing::info!(client_id = %client.client_id, "resource owner authentication failed");
            return Err(Error::InvalidGrant);
        };

        let scope = ctx.scopes.validate(client, request.scope())?;

        ctx.issuer.issue_token(client, Some(&user), &scope).await
    }
}
