//! API token generation and hashing.

use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Generate a fresh raw API token. Shown once at provisioning time;
/// only the hash is stored.
#[must_use]
pub fn generate_api_token() -> String {
    format!("kb_{}{}", Uuid::now_v7().simple(), Uuid::now_v7().simple())
}

/// Hash a raw token for storage and lookup.
#[must_use]
pub fn hash_api_token(token: &str) -> String {
    format!("{:x}", Sha256::digest(token.as_bytes()))
}
