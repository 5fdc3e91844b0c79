//! Shared test infrastructure for grantline integration tests.
//!
//! The server runs against an in-memory store, so no database is needed.
//! A single shared tokio runtime drives every test; the default server is
//! spawned once and reused, while tests that need a different policy start
//! their own with [`TestServer::start`].

#![allow(dead_code)]

use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};

pub use reqwest::{Client, StatusCode};
pub use serde_json::{self, Value};

use grantline_api::server::{AppState, app};
use grantline_core::TokenEndpoint;
use grantline_core::config::Config;
use grantline_core::crypto;
use grantline_core::db::NewClient;
use grantline_core::store::MemoryStore;
use tokio::net::TcpListener;

pub const PASSWORD_CLIENT: &str = "password-client";
pub const PASSWORD_SECRET: &str = "password-secret";
pub const PUBLIC_CLIENT: &str = "public-client";
pub const SERVICE_CLIENT: &str = "service-client";
pub const SERVICE_SECRET: &str = "service-secret";
pub const USERNAME: &str = "foo";
pub const PASSWORD: &str = "ok";

static RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
static SERVER: OnceLock<TestServer> = OnceLock::new();

pub fn runtime() -> &'static tokio::runtime::Runtime {
    RT.get_or_init(|| {
        tokio::runtime::Builder::new_multi_thread()
            .enable_all()
            .build()
            .expect("failed to create tokio runtime")
    })
}

pub fn server() -> &'static TestServer {
    SERVER.get_or_init(|| runtime().block_on(TestServer::start(test_config(""))))
}

/// Minimal config plus any extra TOML sections.
pub fn test_config(extra: &str) -> Config {
    let toml = format!(
        "[server]\nhost = \"127.0.0.1\"\nport = 0\nrealm = \"grantline-test\"\n\n[database]\nurl = \"unused\"\n\n{extra}"
    );
    let config: Config = toml::from_str(&toml).expect("invalid test config");
    config.validate().expect("test config failed validation");
    config
}

pub struct TestServer {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
    pub config: Arc<Config>,
}

impl TestServer {
    /// Spawn a server with the standard fixtures on an ephemeral port.
    /// Must be called from within [`runtime`].
    pub async fn start(config: Config) -> Self {
        let store = Arc::new(MemoryStore::new());
        seed(&store);

        let endpoint = TokenEndpoint::from_config(&config, store.clone(), store.clone())
            .expect("failed to build token endpoint");
        let state = AppState::new(config.clone(), endpoint);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app(state)).await.unwrap();
        });

        TestServer {
            addr,
            store,
            config: Arc::new(config),
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn client(&self) -> Client {
        Client::new()
    }

    /// POST a form to the token endpoint, optionally with Basic credentials.
    pub async fn token(
        &self,
        basic: Option<(&str, &str)>,
        form: &[(&str, &str)],
    ) -> (StatusCode, reqwest::header::HeaderMap, Value) {
        let mut req = self.client().post(self.url("/oauth/token")).form(form);
        if let Some((id, secret)) = basic {
            req = req.basic_auth(id, Some(secret));
        }
        let resp = req.send().await.unwrap();
        let status = resp.status();
        let headers = resp.headers().clone();
        let body = resp.json().await.unwrap();
        (status, headers, body)
    }
}

fn seed(store: &MemoryStore) {
    store
        .insert_client(NewClient {
            name: "Password Client".to_string(),
            client_id: PASSWORD_CLIENT.to_string(),
            client_secret_hash: Some(crypto::hash_token(PASSWORD_SECRET)),
            allowed_scopes: vec!["profile".to_string()],
            grant_types: vec!["password".to_string()],
            default_redirect_uri: Some("http://localhost/authorized".to_string()),
        })
        .unwrap();
    store
        .insert_client(NewClient {
            name: "Public Client".to_string(),
            client_id: PUBLIC_CLIENT.to_string(),
            client_secret_hash: None,
            allowed_scopes: vec!["profile".to_string()],
            grant_types: vec!["password".to_string()],
            default_redirect_uri: None,
        })
        .unwrap();
    store
        .insert_client(NewClient {
            name: "Service Client".to_string(),
            client_id: SERVICE_CLIENT.to_string(),
            client_secret_hash: Some(crypto::hash_token(SERVICE_SECRET)),
            allowed_scopes: vec!["reports:read".to_string(), "reports:write".to_string()],
            grant_types: vec!["client_credentials".to_string()],
            default_redirect_uri: None,
        })
        .unwrap();
    store.insert_user(USERNAME, PASSWORD).unwrap();
}
