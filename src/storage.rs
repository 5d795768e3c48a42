//! File storage seam for communication attachments.
//!
//! Files are uploaded straight to an external blob service; the debt tracker only
//! keeps the opaque storage id and hands out URLs.

use crate::config::StorageConfig;
use async_trait::async_trait;
use chrono::{Duration, Utc};

/// External blob storage.
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// URL a client can POST file bytes to; the service answers with a storage id.
    async fn upload_url(&self) -> String;

    /// Time-limited download URL for a stored file, or `None` if it cannot be resolved.
    async fn resolve_url(&self, storage_id: &str) -> Option<String>;
}

/// Builds URLs against a file service reachable at a fixed base URL.
///
/// Every URL carries an `expires` query parameter (unix seconds) that the file service
/// enforces.
#[derive(Debug, Clone)]
pub struct PublicUrlBlobStore {
    base_url: String,
    ttl: Duration,
}

impl PublicUrlBlobStore {
    /// Creates a store for `base_url` whose URLs stay valid for `ttl_secs`.
    #[must_use]
    pub fn new(base_url: &str, ttl_secs: u64) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            ttl: i64::try_from(ttl_secs)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX),
        }
    }

    /// Creates a store from the `[storage]` configuration section.
    #[must_use]
    pub fn from_config(config: &StorageConfig) -> Self {
        Self::new(&config.public_base_url, config.url_ttl_secs)
    }

    fn expires_at(&self) -> i64 {
        Utc::now()
            .checked_add_signed(self.ttl)
            .map_or(i64::MAX, |at| at.timestamp())
    }
}

#[async_trait]
impl BlobStore for PublicUrlBlobStore {
    async fn upload_url(&self) -> String {
        format!("{}/upload?expires={}", self.base_url, self.expires_at())
    }

    async fn resolve_url(&self, storage_id: &str) -> Option<String> {
        let storage_id = storage_id.trim();
        if storage_id.is_empty() || storage_id.contains('/') {
            return None;
        }
        Some(format!(
            "{}/{storage_id}?expires={}",
            self.base_url,
            self.expires_at()
        ))
    }
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]
    use super::*;

    #[tokio::test]
    async fn test_resolve_url_appends_id_and_expiry() {
        let store = PublicUrlBlobStore::new("https://files.example.com/", 60);
        let url = store.resolve_url("abc123").await.unwrap();
        assert!(url.starts_with("https://files.example.com/abc123?expires="));

        let expires: i64 = url.rsplit('=').next().unwrap().parse().unwrap();
        let now = Utc::now().timestamp();
        assert!(expires > now && expires <= now + 61);
    }

    #[tokio::test]
    async fn test_resolve_url_rejects_bad_ids() {
        let store = PublicUrlBlobStore::new("https://files.example.com", 60);
        assert!(store.resolve_url("").await.is_none());
        assert!(store.resolve_url("../secret").await.is_none());
    }

    #[tokio::test]
    async fn test_from_config_uses_storage_section() {
        let config = StorageConfig {
            public_base_url: "https://cdn.example.com/files/".to_string(),
            url_ttl_secs: 120,
        };
        let store = PublicUrlBlobStore::from_config(&config);
        let url = store.resolve_url("receipt-7").await.unwrap();
        assert!(url.starts_with("https://cdn.example.com/files/receipt-7?expires="));

        let expires: i64 = url.rsplit('=').next().unwrap().parse().unwrap();
        let now = Utc::now().timestamp();
        assert!(expires > now + 60 && expires <= now + 121);

        let defaults = PublicUrlBlobStore::from_config(&StorageConfig::default());
        assert!(defaults.upload_url().await.starts_with("http://localhost:8080/files/upload?"));
    }

    #[tokio::test]
    async fn test_upload_url() {
        let store = PublicUrlBlobStore::new("https://files.example.com", 60);
        assert!(store.upload_url().await.starts_with("https://files.example.com/upload?expires="));
    }
}
