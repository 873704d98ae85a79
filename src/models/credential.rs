//! Credential registry for bearer-token authentication.
//!
//! Tokens are never kept in memory in clear text. At startup each configured
//! `identity:token` pair is reduced to the SHA-256 hash of the token, and
//! incoming tokens are hashed the same way before lookup.

use std::collections::HashMap;

use sha2::{Digest, Sha256};

use crate::error::AppError;

/// Maps hashed tokens to caller identities (e.g. `"business-1"`).
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    /// Hex-encoded SHA-256 of the token -> caller identity
    by_hash: HashMap<String, String>,
}

impl Credentials {
    /// Build a registry from `identity:token` entries.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRequest` if an entry has no `:` separator or an empty
    /// identity or token.
    pub fn from_entries<S: AsRef<str>>(entries: &[S]) -> Result<Self, AppError> {
        let mut credentials = Self::default();

        for entry in entries {
            let entry = entry.as_ref().trim();
            if entry.is_empty() {
                continue;
            }

            let (identity, token) = entry.split_once(':').ok_or_else(|| {
                AppError::InvalidRequest(format!("Credential entry without ':': {entry}"))
            })?;

            if identity.is_empty() || token.is_empty() {
                return Err(AppError::InvalidRequest(
                    "Credential identity and token must be non-empty".to_string(),
                ));
            }

            credentials.register(identity, token);
        }

        Ok(credentials)
    }

    pub fn register(&mut self, identity: &str, token: &str) {
        self.by_hash.insert(hash_token(token), identity.to_string());
    }

    /// Resolve a presented token to its caller identity.
    pub fn identify(&self, token: &str) -> Option<&str> {
        self.by_hash.get(&hash_token(token)).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.by_hash.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_hash.is_empty()
    }
}

fn hash_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    hex::encode(hasher.finalize())
}
