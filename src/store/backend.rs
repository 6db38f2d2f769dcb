use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::record::TokenRecord;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Invalid input: {0}")]
    InvalidInput(&'static str),

    #[error("Durable storage not configured: {0}")]
    ConfigurationMissing(String),

    #[error("Storage backend unavailable: {0}")]
    BackendUnavailable(String),
}

impl From<reqwest::Error> for StoreError {
    fn from(err: reqwest::Error) -> Self {
        StoreError::BackendUnavailable(err.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Durable,
    InMemory,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BackendKind::Durable => write!(f, "durable"),
            BackendKind::InMemory => write!(f, "in-memory"),
        }
    }
}

/// Storage capability behind the token store.
///
/// Backends store and return records verbatim. Liveness is decided by the
/// caller, except for the two eviction methods which take `now` explicitly.
#[async_trait]
pub trait TokenBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    /// Insert or wholly replace the record stored under `record.key`.
    async fn upsert(&self, record: &TokenRecord) -> Result<(), StoreError>;

    /// Fetch the record for `key`, expired or not.
    async fn lookup(&self, key: &str) -> Result<Option<TokenRecord>, StoreError>;

    /// Remove `key`. Removing an absent key is not an error.
    async fn delete(&self, key: &str) -> Result<(), StoreError>;

    /// Remove `key` only if its stored record is expired at `now`.
    /// Returns whether anything was removed.
    async fn evict_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool, StoreError>;

    /// Remove every record expired at `now`, returning the count.
    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError>;
}

pub type DynTokenBackend = Arc<dyn TokenBackend>;
