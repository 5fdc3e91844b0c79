use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    // Config
    #[error("config not found (searched: {searched:?})")]
    ConfigNotFound { searched: Vec<PathBuf> },

    #[error("config parse error in {path}: {source}")]
    ConfigParse {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("config error: {0}")]
    Config(String),

    // Database
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("database migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),

    // OAuth token endpoint (RFC 6749 §5.2)
    #[error("{0}")]
    InvalidRequest(String),

    #[error("client authentication failed")]
    InvalidClient,

    #[error("invalid username or password")]
    InvalidGrant,

    #[error("client is not allowed to use grant type '{0}'")]
    UnauthorizedClient(String),

    #[error("unsupported grant_type '{0}'")]
    UnsupportedGrantType(String),

    #[error("scope not allowed for this client: {scope}")]
    InvalidScope { scope: String },

    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl Error {
    /// Stable OAuth error code (RFC 6749 §5.2), or a server-side code for
    /// everything outside the OAuth taxonomy.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidRequest(_) => "invalid_request",
            Self::InvalidClient => "invalid_client",
            Self::InvalidGrant => "invalid_grant",
            Self::UnauthorizedClient(_) => "unauthorized_client",
            Self::UnsupportedGrantType(_) => "unsupported_grant_type",
            Self::InvalidScope { .. } => "invalid_scope",
            Self::ConfigNotFound { .. }
            | Self::ConfigParse { .. }
            | Self::Config(_)
            | Self::Database(_)
            | Self::Migration(_)
            | Self::Internal(_) => "server_error",
        }
    }

    /// True for errors caused by the request rather than by the server.
    pub fn is_oauth(&self) -> bool {
        matches!(
            self,
            Self::InvalidRequest(_)
                | Self::InvalidClient
                | Self::InvalidGrant
                | Self::UnauthorizedClient(_)
                | Self::UnsupportedGrantType(_)
                | Self::InvalidScope { .. }
        )
    }

    pub(crate) fn missing(param: &str) -> Self {
        Self::InvalidRequest(format!("missing required parameter '{param}'"))
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn oauth_codes() {
        assert_eq!(Error::InvalidClient.error_code(), "invalid_client");
        assert_eq!(Error::InvalidGrant.error_code(), "invalid_grant");
        assert_eq!(
            Error::InvalidScope { scope: "x".into() }.error_code(),
            "invalid_scope"
        );
        assert_eq!(
            Error::UnsupportedGrantType("implicit".into()).error_code(),
            "unsupported_grant_type"
        );
        assert_eq!(Error::missing("username").error_code(), "invalid_request");
        assert_eq!(
            Error::UnauthorizedClient("password".into()).error_code(),
            "unauthorized_client"
        );
    }

    #[test]
    fn server_errors_are_not_oauth() {
        let err = Error::Internal(anyhow::anyhow!("boom"));
        assert_eq!(err.error_code(), "server_error");
        assert!(!err.is_oauth());
        assert!(Error::InvalidClient.is_oauth());
    }

    #[test]
    fn missing_param_description() {
        assert_eq!(
            Error::missing("password").to_string(),
            "missing required parameter 'password'"
        );
    }
}
