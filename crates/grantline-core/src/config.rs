use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::client_auth::AuthMethod;
use crate::error::{Error, Result};

/// Top-level configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    #[serde(default)]
    pub tokens: TokensConfig,
    #[serde(default)]
    pub scopes: ScopesConfig,
    #[serde(default)]
    pub grants: GrantsConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default)]
    pub cors_origins: Vec<String>,
    /// Realm advertised in `WWW-Authenticate` on client authentication failures.
    #[serde(default = "default_realm")]
    pub realm: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origins: Vec::new(),
            realm: default_realm(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct DatabaseConfig {
    pub url: ConfigValue,
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Optional PostgreSQL schema. When set, each connection runs
    /// `SET search_path TO <schema>` on connect.
    pub schema: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TokensConfig {
    #[serde(default = "default_access_ttl")]
    pub access_token_ttl_secs: u64,
    #[serde(default = "default_refresh_ttl")]
    pub refresh_token_ttl_secs: u64,
    #[serde(default)]
    pub issue_refresh_tokens: bool,
}

impl Default for TokensConfig {
    fn default() -> Self {
        Self {
            access_token_ttl_secs: default_access_ttl(),
            refresh_token_ttl_secs: default_refresh_ttl(),
            issue_refresh_tokens: false,
        }
    }
}

/// What an empty or absent `scope` parameter is granted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub enum EmptyScope {
    /// Everything the client is allowed.
    #[default]
    #[serde(rename = "allowed")]
    Allowed,
    /// No scope at all.
    #[serde(rename = "none")]
    Nothing,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ScopesConfig {
    #[serde(default)]
    pub empty_scope: EmptyScope,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrantsConfig {
    #[serde(default = "default_password_grant")]
    pub password: GrantConfig,
    #[serde(default = "default_client_credentials_grant")]
    pub client_credentials: GrantConfig,
}

impl Default for GrantsConfig {
    fn default() -> Self {
        Self {
            password: default_password_grant(),
            client_credentials: default_client_credentials_grant(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GrantConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Client authentication methods accepted at the token endpoint for this grant.
    pub auth_methods: Vec<AuthMethod>,
}

fn default_password_grant() -> GrantConfig {
    GrantConfig {
        enabled: true,
        auth_methods: vec![AuthMethod::ClientSecretBasic, AuthMethod::None],
    }
}

fn default_client_credentials_grant() -> GrantConfig {
    GrantConfig {
        enabled: true,
        auth_methods: vec![AuthMethod::ClientSecretBasic, AuthMethod::ClientSecretPost],
    }
}

/// Validate that a scope token uses only characters RFC 6749 §3.3 allows:
/// printable ASCII except space, double quote and backslash.
pub fn validate_scope_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(Error::Config("scope name cannot be empty".to_string()));
    }
    for ch in name.bytes() {
        if !matches!(ch, 0x21 | 0x23..=0x5B | 0x5D..=0x7E) {
            return Err(Error::Config(format!(
                "scope name contains invalid character {:?}: {name}",
                ch as char
            )));
        }
    }
    Ok(())
}

// --- ConfigValue: supports "env:VAR_NAME" syntax ---

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum ConfigValue {
    Literal(String),
}

impl ConfigValue {
    pub fn resolve(&self) -> Result<String> {
        let ConfigValue::Literal(s) = self;
        if let Some(var_name) = s.strip_prefix("env:") {
            std::env::var(var_name).map_err(|_| {
                Error::Config(format!("environment variable {var_name} not set"))
            })
        } else {
            Ok(s.clone())
        }
    }
}

// --- Config resolution ---

/// Upper bound for any token lifetime.
pub const MAX_TOKEN_TTL_SECS: u64 = 10 * 365 * 24 * 60 * 60;

const CONFIG_FILENAME: &str = "grantline.toml";
const CONFIG_ENV_VAR: &str = "GRANTLINE_CONFIG";

impl Config {
    pub fn from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        let config: Config = toml::from_str(&content).map_err(|e| Error::ConfigParse {
            path: path.to_path_buf(),
            source: e,
        })?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let ttls = [
            ("access_token_ttl_secs", self.tokens.access_token_ttl_secs, true),
            (
                "refresh_token_ttl_secs",
                self.tokens.refresh_token_ttl_secs,
                self.tokens.issue_refresh_tokens,
            ),
        ];
        for (name, ttl, required) in ttls {
            if required && ttl == 0 {
                return Err(Error::Config(format!("tokens.{name} must be at least 1")));
            }
            if ttl > MAX_TOKEN_TTL_SECS {
                return Err(Error::Config(format!(
                    "tokens.{name} must not exceed {MAX_TOKEN_TTL_SECS} (10 years)"
                )));
            }
        }
        let grants = [
            ("password", &self.grants.password),
            ("client_credentials", &self.grants.client_credentials),
        ];
        if grants.iter().all(|(_, g)| !g.enabled) {
            return Err(Error::Config("at least one grant type must be enabled".to_string()));
        }
        for (name, grant) in grants {
            if grant.enabled && grant.auth_methods.is_empty() {
                return Err(Error::Config(format!(
                    "grants.{name}.auth_methods must list at least one method"
                )));
            }
        }
        if self.grants.client_credentials.auth_methods.contains(&AuthMethod::None) {
            return Err(Error::Config(
                "grants.client_credentials cannot accept public clients (\"none\")".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve config file location using the standard search order:
/// 1. Explicit path (CLI flag)
/// 2. GRANTLINE_CONFIG env var
/// 3. Current directory
/// 4. Walk up parent directories
/// 5. ~/.config/grantline/config.toml
/// 6. /etc/grantline/config.toml
pub fn resolve_config(explicit_path: Option<&Path>) -> Result<Config> {
    let mut searched = Vec::new();

    // Explicit path fails immediately if specified but missing
    if let Some(path) = explicit_path {
        if path.exists() {
            return Config::from_path(path);
        }
        return Err(Error::Config(format!(
            "config file not found: {}",
            path.display()
        )));
    }

    if let Ok(env_path) = std::env::var(CONFIG_ENV_VAR) {
        let path = PathBuf::from(&env_path);
        if path.exists() {
            return Config::from_path(&path);
        }
        searched.push(path);
    }

    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = Some(cwd.as_path());
        while let Some(d) = dir {
            let config_path = d.join(CONFIG_FILENAME);
            if config_path.exists() {
                return Config::from_path(&config_path);
            }
            searched.push(config_path);
            dir = d.parent();
        }
    }

    if let Some(config_dir) = dirs::config_dir() {
        let user_config = config_dir.join("grantline").join("config.toml");
        if user_config.exists() {
            return Config::from_path(&user_config);
        }
        searched.push(user_config);
    }

    let system_config = PathBuf::from("/etc/grantline/config.toml");
    if system_config.exists() {
        return Config::from_path(&system_config);
    }
    searched.push(system_config);

    Err(Error::ConfigNotFound { searched })
}

// --- Defaults ---

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8081 }
fn default_realm() -> String { "grantline".to_string() }
fn default_max_connections() -> u32 { 10 }
fn default_access_ttl() -> u64 { 3600 }       // 1 hour
fn default_refresh_ttl() -> u64 { 1_209_600 } // 14 days
fn default_true() -> bool { true }
