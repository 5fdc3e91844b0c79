use std::collections::HashMap;
use std::collections::hash_map::Entry;

use crate::error::{Error, Result};

/// Parameters that identify the client. A repeat of one of these leaves the
/// client's identity ambiguous, so it is rejected before authentication.
const CREDENTIAL_PARAMS: [&str; 2] = ["client_id", "client_secret"];

/// A decoded token endpoint request: form parameters plus the raw
/// `Authorization` header. Lives for a single request.
///
/// Malformations that don't affect client identity (a repeated grant
/// parameter, an unreadable body) are recorded rather than raised, and
/// surface from [`TokenRequest::ensure_well_formed`] once the client has
/// been authenticated.
#[derive(Debug, Clone, Default)]
pub struct TokenRequest {
    params: HashMap<String, String>,
    authorization: Option<String>,
    malformed: Option<String>,
}

impl TokenRequest {
    /// Build from decoded `application/x-www-form-urlencoded` pairs.
    /// A parameter may appear at most once (RFC 6749 §3.2).
    pub fn from_form<I, K, V>(pairs: I, authorization: Option<String>) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let mut params = HashMap::new();
        let mut malformed = None;
        for (k, v) in pairs {
            match params.entry(k.into()) {
                Entry::Occupied(e) => {
                    let reason = format!("parameter '{}' is repeated", e.key());
                    if CREDENTIAL_PARAMS.contains(&e.key().as_str()) {
                        return Err(Error::InvalidRequest(reason));
                    }
                    malformed.get_or_insert(reason);
                }
                Entry::Vacant(e) => {
                    e.insert(v.into());
                }
            }
        }
        Ok(Self { params, authorization, malformed })
    }

    /// A request whose body could not be read as a form. Only the
    /// `Authorization` header is available for client authentication.
    pub fn unreadable(authorization: Option<String>, reason: impl Into<String>) -> Self {
        Self {
            params: HashMap::new(),
            authorization,
            malformed: Some(reason.into()),
        }
    }

    /// Fails with `invalid_request` if parsing recorded a malformation.
    pub fn ensure_well_formed(&self) -> Result<()> {
        match &self.malformed {
            Some(reason) => Err(Error::InvalidRequest(reason.clone())),
            None => Ok(()),
        }
    }

    /// Parameter value. Parameters sent without a value are treated as
    /// omitted (RFC 6749 §3.1).
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params
            .get(name)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    pub fn require(&self, name: &str) -> Result<&str> {
        self.param(name).ok_or_else(|| Error::missing(name))
    }

    pub fn authorization(&self) -> Option<&str> {
        self.authorization.as_deref()
    }

    pub fn grant_type(&self) -> Option<&str> {
        self.param("grant_type")
    }

    pub fn scope(&self) -> Option<&str> {
        self.param("scope")
    }

    pub fn client_id(&self) -> Option<&str> {
        self.param("client_id")
    }

    pub fn client_secret(&self) -> Option<&str> {
        self.param("client_secret")
    }
}
