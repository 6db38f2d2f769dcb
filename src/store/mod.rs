//! Short-lived token staging.
//!
//! A producer stages a token under a caller-chosen correlation key, a consumer
//! later fetches it with the same key. Records expire ten minutes after their
//! last write and are evicted lazily, on the read that finds them expired.

pub mod backend;
pub mod expiry;
pub mod memory;
pub mod postgrest;
pub mod record;
pub mod sweeper;

use std::sync::Arc;

use chrono::{DateTime, Utc};

pub use backend::{BackendKind, DynTokenBackend, StoreError, TokenBackend};
pub use memory::InMemoryBackend;
pub use postgrest::PostgrestBackend;
pub use record::{key_prefix, TokenRecord};

use crate::config::DurableConfig;

/// Façade over exactly one backend, chosen when the store is built.
pub struct TokenStore {
    backend: DynTokenBackend,
}

impl TokenStore {
    pub fn new(backend: DynTokenBackend) -> Self {
        Self { backend }
    }

    pub fn in_memory() -> Self {
        Self::new(Arc::new(InMemoryBackend::new()))
    }

    /// Pick the durable backend when its endpoint and credential are present
    /// and well-formed, the in-memory fallback otherwise.
    pub fn from_config(config: &DurableConfig) -> Result<Self, StoreError> {
        match config.settings() {
            Ok(settings) => {
                let backend = PostgrestBackend::new(&settings)?;
                tracing::info!(
                    "Token store: durable backend at {} (table {})",
                    settings.url,
                    settings.table
                );
                Ok(Self::new(Arc::new(backend)))
            }
            Err(e) => {
                tracing::warn!(
                    "{}. Token store: in-memory fallback; staged tokens are lost on restart \
                     and invisible to other instances",
                    e
                );
                Ok(Self::in_memory())
            }
        }
    }

    pub fn backend_kind(&self) -> BackendKind {
        self.backend.kind()
    }

    pub async fn put(&self, key: &str, token: &str) -> Result<TokenRecord, StoreError> {
        self.put_at(key, token, Utc::now()).await
    }

    /// Stage `token` under `key`, replacing any previous record for that key.
    pub async fn put_at(
        &self,
        key: &str,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<TokenRecord, StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidInput("key must not be empty"));
        }
        if token.is_empty() {
            return Err(StoreError::InvalidInput("token must not be empty"));
        }

        let record = TokenRecord::issue(key, token, now);
        self.backend.upsert(&record).await?;

        tracing::info!(
            "Stored token for key {} expires at {}",
            key_prefix(key),
            record.expires_at.to_rfc3339()
        );
        Ok(record)
    }

    pub async fn get(&self, key: &str) -> Result<Option<TokenRecord>, StoreError> {
        self.get_at(key, Utc::now()).await
    }

    /// Fetch the live record for `key`. Expired records are evicted and
    /// reported the same way as keys that never existed.
    pub async fn get_at(
        &self,
        key: &str,
        now: DateTime<Utc>,
    ) -> Result<Option<TokenRecord>, StoreError> {
        let Some(record) = self.backend.lookup(key).await? else {
            tracing::info!("Token not found for key {}", key_prefix(key));
            return Ok(None);
        };

        if record.is_live(now) {
            tracing::info!("Found token for key {}", key_prefix(key));
            return Ok(Some(record));
        }

        tracing::info!("Token expired for key {}", key_prefix(key));
        self.backend.evict_expired(key, now).await?;
        Ok(None)
    }

    /// Drop the record for `key`, live or not.
    pub async fn discard(&self, key: &str) -> Result<(), StoreError> {
        if key.is_empty() {
            return Err(StoreError::InvalidInput("key must not be empty"));
        }
        self.backend.delete(key).await?;
        tracing::info!("Discarded token for key {}", key_prefix(key));
        Ok(())
    }

    pub async fn purge_expired(&self) -> Result<u64, StoreError> {
        self.purge_expired_at(Utc::now()).await
    }

    pub async fn purge_expired_at(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        self.backend.purge_expired(now).await
    }
}
