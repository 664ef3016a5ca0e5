// ============================================================================
// Token Key Provider
// ============================================================================
//
// Fetches and caches the public signing-key descriptor used to validate
// bearer tokens. The auth server rotates this key periodically; callers
// trigger a forced refresh from their maintenance path while the hot
// validation path always reads the cached value.
//
// ============================================================================

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::error::CoreError;

/// Signing-key descriptor: the algorithm the auth server signs with and the
/// key material (shared secret or PEM-encoded public key) to verify against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenKey {
    pub algorithm: String,
    pub key: String,
}

/// Source of the current token key.
///
/// `get(false)` returns the cached descriptor if one exists and fetches
/// otherwise; `get(true)` always re-fetches. A failed forced refresh leaves
/// the previously cached descriptor intact.
#[async_trait]
pub trait KeyProvider: Send + Sync {
    async fn get(&self, force_refresh: bool) -> Result<TokenKey, CoreError>;
}

/// Key provider backed by the auth server's HTTP key endpoint, with an
/// optional on-disk cache file for offline starts.
pub struct HttpKeyProvider {
    url: String,
    cache_path: Option<PathBuf>,
    client: reqwest::Client,
    current: RwLock<Option<TokenKey>>,
}

impl HttpKeyProvider {
    /// Creates a provider fetching from `{auth_server}/key`.
    pub fn new(auth_server: &str, cache_path: Option<PathBuf>) -> Self {
        Self {
            url: format!("{}/key", auth_server.trim_end_matches('/')),
            cache_path,
            client: reqwest::Client::new(),
            current: RwLock::new(None),
        }
    }

    async fn fetch(&self) -> Result<TokenKey, CoreError> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| CoreError::provider_unavailable(e.to_string()))?
            .error_for_status()
            .map_err(|e| CoreError::provider_unavailable(e.to_string()))?;

        response
            .json::<TokenKey>()
            .await
            .map_err(|e| CoreError::provider_unavailable(e.to_string()))
    }

    /// Stores the fetched key in memory and, best effort, on disk.
    async fn store(&self, key: &TokenKey) {
        *self.current.write().await = Some(key.clone());

        if let Some(path) = &self.cache_path {
            match serde_json::to_vec(key) {
                Ok(bytes) => {
                    if let Err(e) = tokio::fs::write(path, bytes).await {
                        warn!(error = %e, path = %path.display(), "failed to write token key cache file");
                    }
                }
                Err(e) => warn!(error = %e, "failed to serialize token key for cache file"),
            }
        }
    }

    async fn load_cache_file(&self) -> Option<TokenKey> {
        let path = self.cache_path.as_ref()?;
        let bytes = tokio::fs::read(path).await.ok()?;
        serde_json::from_slice(&bytes).ok()
    }
}

#[async_trait]
impl KeyProvider for HttpKeyProvider {
    async fn get(&self, force_refresh: bool) -> Result<TokenKey, CoreError> {
        if !force_refresh {
            if let Some(key) = self.current.read().await.clone() {
                return Ok(key);
            }
        }

        match self.fetch().await {
            Ok(key) => {
                debug!(algorithm = %key.algorithm, "fetched token key");
                self.store(&key).await;
                Ok(key)
            }
            Err(e) => {
                // The forced-refresh path reports the failure; the stale
                // in-memory key (if any) stays usable for validation.
                if !force_refresh {
                    if let Some(key) = self.load_cache_file().await {
                        warn!(
                            error = %e,
                            algorithm = %key.algorithm,
                            "token key endpoint unreachable, using on-disk cache"
                        );
                        *self.current.write().await = Some(key.clone());
                        return Ok(key);
                    }
                }
                Err(e)
            }
        }
    }
}
