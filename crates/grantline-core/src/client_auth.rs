//! Client authentication at the token endpoint (RFC 6749 §2.3).
//!
//! Credentials come from exactly one place: an HTTP Basic `Authorization`
//! header if present, otherwise the `client_id`/`client_secret` body fields.
//! Every failure to establish the client's identity is `invalid_client`;
//! credentials supplied through both channels at once are `invalid_request`.

use base64::{Engine, engine::general_purpose::STANDARD};
use serde::{Deserialize, Serialize};

use crate::db::Client;
use crate::error::{Error, Result};
use crate::request::TokenRequest;
use crate::store::CredentialStore;

/// Token endpoint authentication methods (RFC 7591 §2).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthMethod {
    ClientSecretBasic,
    ClientSecretPost,
    /// Public client identified by `client_id` alone.
    None,
}

impl AuthMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::ClientSecretBasic => "client_secret_basic",
            Self::ClientSecretPost => "client_secret_post",
            Self::None => "none",
        }
    }
}

/// Credentials as presented, before any lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PresentedCredentials {
    pub client_id: String,
    pub client_secret: Option<String>,
    pub method: AuthMethod,
}

/// Pull client credentials out of the request. `Ok(None)` means the request
/// carried no client credentials at all.
pub fn extract_credentials(request: &TokenRequest) -> Result<Option<PresentedCredentials>> {
    if let Some(payload) = request.authorization().and_then(basic_payload) {
        let (client_id, secret) = decode_basic(payload)?;

        if request.client_secret().is_some() {
            return Err(Error::InvalidRequest(
                "client credentials supplied in both the Authorization header and the request body"
                    .to_string(),
            ));
        }
        if request.client_id().is_some_and(|body_id| body_id != client_id) {
            return Err(Error::InvalidRequest(
                "client_id in the request body does not match the Authorization header".to_string(),
            ));
        }

        return Ok(Some(PresentedCredentials {
            client_id,
            client_secret: secret,
            method: AuthMethod::ClientSecretBasic,
        }));
    }

    match (request.client_id(), request.client_secret()) {
        (Some(client_id), secret) => Ok(Some(PresentedCredentials {
            client_id: client_id.to_string(),
            client_secret: secret.map(str::to_string),
            method: if secret.is_some() {
                AuthMethod::ClientSecretPost
            } else {
                AuthMethod::None
            },
        })),
        // A secret with no identity to check it against
        (None, Some(_)) => Err(Error::InvalidClient),
        (None, None) => Ok(None),
    }
}

/// Authenticate the requesting client against the store, accepting only the
/// listed methods.
pub async fn authenticate_client(
    store: &dyn CredentialStore,
    request: &TokenRequest,
    allowed: &[AuthMethod],
) -> Result<Client> {
    let Some(creds) = extract_credentials(request)? else {
        tracing::info!("token request without client credentials");
        return Err(Error::InvalidClient);
    };

    let Some(client) = store.find_client(&creds.client_id).await? else {
        tracing::info!(client_id = %creds.client_id, "unknown client");
        return Err(Error::InvalidClient);
    };

    let method = if client.is_confidential {
        let Some(secret) = creds.client_secret.as_deref() else {
            tracing::info!(client_id = %client.client_id, "confidential client sent no secret");
            return Err(Error::InvalidClient);
        };
        if !allowed.contains(&creds.method) {
            tracing::info!(
                client_id = %client.client_id,
                method = creds.method.as_str(),
                "client authentication method not allowed for this grant"
            );
            return Err(Error::InvalidClient);
        }
        if !store.verify_client_secret(&client, secret).await {
            tracing::info!(client_id = %client.client_id, "client secret mismatch");
            return Err(Error::InvalidClient);
        }
        creds.method
    } else {
        if creds.client_secret.is_some() {
            tracing::info!(client_id = %client.client_id, "public client presented a secret");
            return Err(Error::InvalidClient);
        }
        if !allowed.contains(&AuthMethod::None) {
            tracing::info!(client_id = %client.client_id, "public clients not accepted for this grant");
            return Err(Error::InvalidClient);
        }
        AuthMethod::None
    };

    tracing::debug!(client_id = %client.client_id, method = method.as_str(), "client authenticated");
    Ok(client)
}

/// The base64 payload of a `Basic` authorization header, if the header uses
/// that scheme.
fn basic_payload(header: &str) -> Option<&str> {
    let (scheme, payload) = header.trim().split_once(' ')?;
    scheme.eq_ignore_ascii_case("basic").then_some(payload.trim())
}

fn decode_basic(payload: &str) -> Result<(String, Option<String>)> {
    let decoded = STANDARD.decode(payload).map_err(|_| Error::InvalidClient)?;
    let decoded = String::from_utf8(decoded).map_err(|_| Error::InvalidClient)?;
    let (id, secret) = decoded.split_once(':').ok_or(Error::InvalidClient)?;

    // RFC 6749 §2.3.1: both halves are form-urlencoded before base64
    let id = urlencoding::decode(id).map_err(|_| Error::InvalidClient)?;
    let secret = urlencoding::decode(secret).map_err(|_| Error::InvalidClient)?;

    if id.is_empty() {
        return Err(Error::InvalidClient);
    }
    let secret = (!secret.is_empty()).then(|| secret.into_owned());
    Ok((id.into_owned(), secret))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use crate::db::NewClient;
    use crate::store::MemoryStore;

    fn basic(id: &str, secret: &str) -> String {
        format!("Basic {}", STANDARD.encode(format!("{id}:{secret}")))
    }

    fn request(pairs: &[(&str, &str)], authorization: Option<String>) -> TokenRequest {
        TokenRequest::from_form(pairs.iter().copied(), authorization).unwrap()
    }

    fn store() -> MemoryStore {
        let store = MemoryStore::new();
        store
            .insert_client(NewClient {
                name: "Password Client".to_string(),
                client_id: "password-client".to_string(),
                client_secret_hash: Some(crypto::hash_token("password-secret")),
                allowed_scopes: vec!["profile".to_string()],
                grant_types: vec!["password".to_string()],
                default_redirect_uri: None,
            })
            .unwrap();
        store
            .insert_client(NewClient {
                name: "Mobile App".to_string(),
                client_id: "mobile-app".to_string(),
                client_secret_hash: None,
                allowed_scopes: vec!["profile".to_string()],
                grant_types: vec!["password".to_string()],
                default_redirect_uri: None,
            })
            .unwrap();
        store
    }

    const BASIC_ONLY: &[AuthMethod] = &[AuthMethod::ClientSecretBasic];
    const ALL: &[AuthMethod] = &[
        AuthMethod::ClientSecretBasic,
        AuthMethod::ClientSecretPost,
        AuthMethod::None,
    ];

    #[test]
    fn basic_header_is_decoded() {
        let req = request(&[], Some(basic("password-client", "password-secret")));
        let creds = extract_credentials(&req).unwrap().unwrap();
        assert_eq!(creds.client_id, "password-client");
        assert_eq!(creds.client_secret.as_deref(), Some("password-secret"));
        assert_eq!(creds.method, AuthMethod::ClientSecretBasic);
    }

    #[test]
    fn basic_credentials_are_url_decoded() {
        let req = request(&[], Some(basic("my%20client", "p%3Ass")));
        let creds = extract_credentials(&req).unwrap().unwrap();
        assert_eq!(creds.client_id, "my client");
        assert_eq!(creds.client_secret.as_deref(), Some("p:ss"));
    }

    #[test]
    fn scheme_is_case_insensitive() {
        let header = basic("password-client", "password-secret").replacen("Basic", "bAsIc", 1);
        let creds = extract_credentials(&request(&[], Some(header))).unwrap().unwrap();
        assert_eq!(creds.client_id, "password-client");
    }

    #[test]
    fn malformed_basic_header_is_invalid_client() {
        for header in [
            "Basic !!!not-base64".to_string(),
            format!("Basic {}", STANDARD.encode("no-colon")),
            format!("Basic {}", STANDARD.encode(":secret-without-id")),
        ] {
            let err = extract_credentials(&request(&[], Some(header))).unwrap_err();
            assert_eq!(err.error_code(), "invalid_client");
        }
    }

    #[test]
    fn other_schemes_fall_back_to_body() {
        let req = request(
            &[("client_id", "password-client"), ("client_secret", "password-secret")],
            Some("Bearer sometoken".to_string()),
        );
        let creds = extract_credentials(&req).unwrap().unwrap();
        assert_eq!(creds.method, AuthMethod::ClientSecretPost);
    }

    #[test]
    fn body_credentials() {
        let req = request(&[("client_id", "mobile-app")], None);
        let creds = extract_credentials(&req).unwrap().unwrap();
        assert_eq!(creds.method, AuthMethod::None);
        assert!(creds.client_secret.is_none());

        assert!(extract_credentials(&request(&[], None)).unwrap().is_none());

        let err = extract_credentials(&request(&[("client_secret", "orphan")], None)).unwrap_err();
        assert_eq!(err.error_code(), "invalid_client");
    }

    #[test]
    fn conflicting_credentials_rejected() {
        let header = Some(basic("password-client", "password-secret"));

        let req = request(&[("client_secret", "password-secret")], header.clone());
        assert_eq!(extract_credentials(&req).unwrap_err().error_code(), "invalid_request");

        let req = request(&[("client_id", "someone-else")], header.clone());
        assert_eq!(extract_credentials(&req).unwrap_err().error_code(), "invalid_request");

        // Repeating the same client_id in the body is not a conflict
        let req = request(&[("client_id", "password-client")], header);
        assert!(extract_credentials(&req).unwrap().is_some());
    }

    #[tokio::test]
    async fn confidential_client_via_basic() {
        let store = store();
        let req = request(&[], Some(basic("password-client", "password-secret")));
        let client = authenticate_client(&store, &req, BASIC_ONLY).await.unwrap();
        assert_eq!(client.client_id, "password-client");
    }

    #[tokio::test]
    async fn wrong_secret_is_invalid_client() {
        let store = store();
        let req = request(&[], Some(basic("password-client", "invalid-secret")));
        let err = authenticate_client(&store, &req, BASIC_ONLY).await.unwrap_err();
        assert!(matches!(err, Error::InvalidClient));
    }

    #[tokio::test]
    async fn missing_credentials_is_invalid_client() {
        let store = store();
        let req = request(&[("username", "foo"), ("password", "ok")], None);
        let err = authenticate_client(&store, &req, ALL).await.unwrap_err();
        assert!(matches!(err, Error::InvalidClient));
    }

    #[tokio::test]
    async fn unknown_client_is_invalid_client() {
        let store = store();
        let req = request(&[], Some(basic("ghost", "boo")));
        let err = authenticate_client(&store, &req, ALL).await.unwrap_err();
        assert!(matches!(err, Error::InvalidClient));
    }

    #[tokio::test]
    async fn confidential_client_without_secret() {
        let store = store();
        let req = request(&[("client_id", "password-client")], None);
        let err = authenticate_client(&store, &req, ALL).await.unwrap_err();
        assert!(matches!(err, Error::InvalidClient));
    }

    #[tokio::test]
    async fn post_method_honours_policy() {
        let store = store();
        let req = request(
            &[("client_id", "password-client"), ("client_secret", "password-secret")],
            None,
        );
        let err = authenticate_client(&store, &req, BASIC_ONLY).await.unwrap_err();
        assert!(matches!(err, Error::InvalidClient));

        let client = authenticate_client(&store, &req, ALL).await.unwrap();
        assert_eq!(client.client_id, "password-client");

        let bad = request(
            &[("client_id", "password-client"), ("client_secret", "nope")],
            None,
        );
        let err = authenticate_client(&store, &bad, ALL).await.unwrap_err();
        assert!(matches!(err, Error::InvalidClient));
    }

    #[tokio::test]
    async fn public_client_by_id() {
        let store = store();
        let req = request(&[("client_id", "mobile-app")], None);
        let client = authenticate_client(&store, &req, ALL).await.unwrap();
        assert!(!client.is_confidential);

        let err = authenticate_client(&store, &req, BASIC_ONLY).await.unwrap_err();
        assert!(matches!(err, Error::InvalidClient));

        let with_secret = request(&[("client_id", "mobile-app"), ("client_secret", "x")], None);
        let err = authenticate_client(&store, &with_secret, ALL).await.unwrap_err();
        assert!(matches!(err, Error::InvalidClient));
    }

    #[tokio::test]
    async fn public_client_via_basic_with_empty_secret() {
        let store = store();
        let req = request(&[], Some(basic("mobile-app", "")));
        let client = authenticate_client(&store, &req, ALL).await.unwrap();
        assert_eq!(client.client_id, "mobile-app");
    }
}
