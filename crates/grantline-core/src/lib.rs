pub mod client_auth;
pub mod config;
pub mod crypto;
pub mod db;
pub mod endpoint;
pub mod error;
pub mod grants;
pub mod request;
pub mod scope;
pub mod store;
pub mod token;

pub use endpoint::TokenEndpoint;
pub use error::{Error, Result};
