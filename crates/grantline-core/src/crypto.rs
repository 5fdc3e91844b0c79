use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

use crate::error::{Error, Result};

/// Generate a random opaque token and return (raw_token, sha256_hash).
pub fn generate_token() -> (String, String) {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    let raw = URL_SAFE_NO_PAD.encode(bytes);
    let hash = hash_token(&raw);
    (raw, hash)
}

/// Generate a random client secret (hex, 64 chars) for `register-client`.
pub fn generate_client_secret() -> String {
    let mut bytes = [0u8; 32];
    rand::rng().fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// SHA-256 hash a token or client secret (for storage).
pub fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}

/// Compare a presented secret against a stored SHA-256 digest in constant time.
pub fn secret_matches(presented: &str, stored_hash: &str) -> bool {
    let presented_hash = hash_token(presented);
    presented_hash.as_bytes().ct_eq(stored_hash.as_bytes()).unwrap_u8() == 1
}

/// Argon2id hash of a resource owner password, in PHC string format.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| Error::Internal(anyhow::anyhow!("argon2 hashing failed: {e}")))?;
    Ok(hash.to_string())
}

/// Verify a password against a stored PHC string. An unparseable hash never verifies.
pub fn verify_password(password: &str, phc: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(phc) else {
        tracing::error!("stored password hash is not a valid PHC string");
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_distinct() {
        let (raw_a, hash_a) = generate_token();
        let (raw_b, hash_b) = generate_token();
        assert_ne!(raw_a, raw_b);
        assert_ne!(hash_a, hash_b);
        assert_eq!(raw_a.len(), 43);
        assert_eq!(hash_token(&raw_a), hash_a);
    }

    #[test]
    fn secret_comparison() {
        let stored = hash_token("password-secret");
        assert!(secret_matches("password-secret", &stored));
        assert!(!secret_matches("invalid-secret", &stored));
        assert!(!secret_matches("", &stored));
    }

    #[test]
    fn password_roundtrip() {
        let phc = hash_password("ok").unwrap();
        assert!(phc.starts_with("$argon2id$"));
        assert!(verify_password("ok", &phc));
        assert!(!verify_password("wrong", &phc));
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("ok", "not-a-phc-string"));
    }

    #[test]
    fn client_secret_shape() {
        let secret = generate_client_secret();
        assert_eq!(secret.len(), 64);
        assert!(secret.chars().all(|c| c.is_ascii_hexdigit()));
    }
}
