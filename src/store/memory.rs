//! Process-local fallback backend.
//!
//! Records live in one `HashMap` owned by the backend instance. Nothing is
//! shared with other processes and everything is lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use super::backend::{BackendKind, StoreError, TokenBackend};
use super::record::TokenRecord;

pub struct InMemoryBackend {
    records: Mutex<HashMap<String, TokenRecord>>,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TokenBackend for InMemoryBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::InMemory
    }

    async fn upsert(&self, record: &TokenRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .await
            .insert(record.key.clone(), record.clone());
        Ok(())
    }

    async fn lookup(&self, key: &str) -> Result<Option<TokenRecord>, StoreError> {
        Ok(self.records.lock().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        self.records.lock().await.remove(key);
        Ok(())
    }

    async fn evict_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let mut records = self.records.lock().await;
        match records.get(key) {
            Some(record) if !record.is_live(now) => {
                records.remove(key);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut records = self.records.lock().await;
        let before = records.len();
        records.retain(|_, record| record.is_live(now));
        Ok((before - records.len()) as u64)
    }
}
