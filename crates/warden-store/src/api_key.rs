//! API key minting and hashing.
//!
//! Plaintext keys are shown to the caller once at mint time. Stores only
//! ever persist [`hash_api_key`] of the key.

use std::fmt;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use rand::RngCore;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use warden_types::{ApiKeyId, PrincipalId};

const KEY_PREFIX: &str = "wk_";
const KEY_BYTES: usize = 32;

/// A plaintext API key.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey(String);

impl ApiKey {
    /// Mints a new random key.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_BYTES];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(format!("{KEY_PREFIX}{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn hash(&self) -> String {
        hash_api_key(&self.0)
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

/// SHA-256 of the key, URL-safe base64 without padding.
pub fn hash_api_key(key: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(key.as_bytes()))
}

/// Stored binding between a hashed key and a principal (1:1).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApiKeyRecord {
    pub id: ApiKeyId,
    pub principal: PrincipalId,
    pub name: String,
    pub key_hash: String,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_keys_are_prefixed_and_unique() {
        let a = ApiKey::generate();
        let b = ApiKey::generate();
        assert!(a.as_str().starts_with(KEY_PREFIX));
        // 32 bytes → 43 base64 chars without padding
        assert_eq!(a.as_str().len(), KEY_PREFIX.len() + 43);
        assert_ne!(a, b);
    }

    #[test]
    fn test_hash_is_stable_and_hides_key() {
        let key = ApiKey::generate();
        assert_eq!(key.hash(), hash_api_key(key.as_str()));
        assert_ne!(key.hash(), key.as_str());
        assert_ne!(hash_api_key("a"), hash_api_key("b"));
    }

    #[test]
    fn test_debug_redacts_key() {
        let key = ApiKey::generate();
        let rendered = format!("{key:?}");
        assert!(!rendered.contains(key.as_str()));
    }
}
