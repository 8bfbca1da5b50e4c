//! Bearer-credential authentication against hashed API key records.
//!
//! Verification is bcrypt, which is deliberately expensive, so validated
//! credentials are cached for a short TTL keyed by their SHA-256 digest.
//! The cache only short-circuits the bcrypt pass: the key row is re-fetched
//! on every hit, so deactivating a key takes effect immediately.

use axum::http::HeaderMap;
use dashmap::DashMap;
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::{Duration, Instant};
use subtle::ConstantTimeEq;
use uuid::Uuid;

use crate::core::database::{ApiKeyRecord, ApiKeyStore};
use crate::core::error::GatewayError;

/// How long a validated credential skips bcrypt verification.
const CACHE_TTL: Duration = Duration::from_secs(60);

struct CacheEntry {
    api_key_id: Uuid,
    credential_hash: String,
    cached_at: Instant,
}

/// Authenticates bearer credentials against the API key store.
pub struct Authenticator {
    store: Arc<dyn ApiKeyStore>,
    cache: DashMap<String, CacheEntry>,
}

impl Authenticator {
    pub fn new(store: Arc<dyn ApiKeyStore>) -> Self {
        Self {
            store,
            cache: DashMap::new(),
        }
    }

    /// Authenticate the request headers, returning the matching key record.
    pub async fn authenticate(&self, headers: &HeaderMap) -> Result<ApiKeyRecord, GatewayError> {
        let Some(credential) = extract_bearer(headers) else {
            tracing::warn!("Authentication failed: missing bearer credential");
            return Err(GatewayError::Auth);
        };
        self.authenticate_credential(credential).await
    }

    /// Authenticate a plaintext bearer credential.
    pub async fn authenticate_credential(
        &self,
        credential: &str,
    ) -> Result<ApiKeyRecord, GatewayError> {
        let credential_hash = hash_credential(credential);

        if let Some(record) = self.check_cache(&credential_hash).await? {
            return Ok(record);
        }

        // Cache miss: run the bcrypt pass over the active rows. bcrypt is
        // CPU-bound, so the loop runs off the async executor.
        let keys = self
            .store
            .list_active_keys()
            .await
            .map_err(|e| GatewayError::Internal(e.into()))?;
        let candidate = credential.to_string();
        let matched = tokio::task::spawn_blocking(move || {
            keys.into_iter()
                .find(|key| bcrypt::verify(&candidate, &key.key_hash).unwrap_or(false))
        })
        .await
        .map_err(|e| GatewayError::Internal(e.into()))?;

        match matched {
            Some(record) => {
                self.cache.insert(
                    credential_hash.clone(),
                    CacheEntry {
                        api_key_id: record.id,
                        credential_hash,
                        cached_at: Instant::now(),
                    },
                );
                Ok(record)
            }
            None => {
                tracing::warn!("Authentication failed: no matching active API key");
                Err(GatewayError::Auth)
            }
        }
    }

    /// Return the key record for a live cache hit, evicting stale or
    /// deactivated entries.
    async fn check_cache(
        &self,
        credential_hash: &str,
    ) -> Result<Option<ApiKeyRecord>, GatewayError> {
        let cached_id = match self.cache.get(credential_hash) {
            Some(entry) => {
                let expired = entry.cached_at.elapsed() > CACHE_TTL;
                let hash_matches: bool = entry
                    .credential_hash
                    .as_bytes()
                    .ct_eq(credential_hash.as_bytes())
                    .into();
                if expired || !hash_matches {
                    None
                } else {
                    Some(entry.api_key_id)
                }
            }
            None => None,
        };

        let Some(api_key_id) = cached_id else {
            self.cache.remove(credential_hash);
            return Ok(None);
        };

        let record = self
            .store
            .find_key(api_key_id)
            .await
            .map_err(|e| GatewayError::Internal(e.into()))?;

        match record {
            Some(record) if record.is_active => Ok(Some(record)),
            _ => {
                // The key was deactivated or deleted after being cached.
                self.cache.remove(credential_hash);
                tracing::warn!(
                    api_key_id = %api_key_id,
                    "Authentication failed: cached API key no longer active"
                );
                Err(GatewayError::Auth)
            }
        }
    }
}

/// SHA-256 hex digest of a credential, used only as the cache key.
pub fn hash_credential(credential: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(credential.as_bytes());
    format!("{:x}", hasher.finalize())
}

/// Extract the token from an `Authorization: Bearer` header.
fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
}
