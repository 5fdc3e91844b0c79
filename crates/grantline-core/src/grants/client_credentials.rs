//! Client Credentials grant (RFC 6749 §4.4): the client acts on its own behalf.

use async_trait::async_trait;

use crate::client_auth::AuthMethod;
use crate::db::Client;
use crate::error::{Error, Result};
use crate::request::TokenRequest;
use crate::token::Token;

use super::{GrantContext, GrantHandler};

pub struct ClientCredentialsGrant {
    auth_methods: Vec<AuthMethod>,
}

impl ClientCredentialsGrant {
    pub const GRANT_TYPE: &'static str = "client_credentials";

    pub fn new(auth_methods: Vec<AuthMethod>) -> Self {
        Self { auth_methods }
    }
}

impl Default for ClientCredentialsGrant {
    fn default() -> Self {
        Self::new(vec![AuthMethod::ClientSecretBasic, AuthMethod::ClientSecretPost])
    }
}

#[async_trait]
impl GrantHandler for ClientCredentialsGrant {
    fn auth_methods(&self) -> &[AuthMethod] {
        &self.auth_methods
    }

    async fn handle(
        &self,
        ctx: &GrantContext<'_>,
        request: &TokenRequest,
        client: &Client,
    ) -> Result<Token> {
        // Only confidential clients may use this grant
        if !client.is_confidential || !client.allows_grant_type(Self::GRANT_TYPE) {
            return Err(Error::UnauthorizedClient(Self::GRANT_TYPE.to_string()));
        }

        let scope = ctx.scopes.validate(client, request.scope())?;

        ctx.issuer.issue_token(client, None, &scope).await
    }
}
