//! Durable backend speaking PostgREST, the REST layer Supabase puts in front
//! of a Postgres table.
//!
//! Expected table:
//!
//! ```sql
//! CREATE TABLE oauth_tokens (
//!     key        TEXT PRIMARY KEY,
//!     token      TEXT NOT NULL,
//!     created_at TIMESTAMPTZ NOT NULL,
//!     expires_at TIMESTAMPTZ NOT NULL
//! );
//! ```

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use url::Url;

use super::backend::{BackendKind, StoreError, TokenBackend};
use super::record::TokenRecord;
use crate::config::DurableSettings;

const COLUMNS: &str = "key,token,created_at,expires_at";
const PREFER_UPSERT: &str = "resolution=merge-duplicates,return=minimal";
const PREFER_RETURN_ROWS: &str = "return=representation";

pub struct PostgrestBackend {
    client: reqwest::Client,
    table_url: Url,
}

impl PostgrestBackend {
    pub fn new(settings: &DurableSettings) -> Result<Self, StoreError> {
        let mut headers = HeaderMap::new();
        let mut apikey = HeaderValue::from_str(&settings.key).map_err(|_| {
            StoreError::ConfigurationMissing("credential is not a valid header value".into())
        })?;
        apikey.set_sensitive(true);
        let mut bearer = HeaderValue::from_str(&format!("Bearer {}", settings.key)).map_err(|_| {
            StoreError::ConfigurationMissing("credential is not a valid header value".into())
        })?;
        bearer.set_sensitive(true);
        headers.insert("apikey", apikey);
        headers.insert(AUTHORIZATION, bearer);

        let client = reqwest::Client::builder().default_headers(headers).build()?;

        Ok(Self {
            client,
            table_url: table_url(&settings.url, &settings.table)?,
        })
    }

    async fn delete_returning(
        &self,
        filters: &[(&str, String)],
    ) -> Result<Vec<serde_json::Value>, StoreError> {
        let response = self
            .client
            .delete(self.table_url.clone())
            .header("Prefer", PREFER_RETURN_ROWS)
            .query(&[("select", "key")])
            .query(filters)
            .send()
            .await?;
        Ok(check(response).await?.json().await?)
    }
}

/// `{base}/rest/v1/{table}`, keeping any path prefix already on `base`.
fn table_url(base: &Url, table: &str) -> Result<Url, StoreError> {
    let mut url = base.clone();
    url.path_segments_mut()
        .map_err(|_| StoreError::ConfigurationMissing(format!("{base} cannot be a base URL")))?
        .pop_if_empty()
        .extend(["rest", "v1", table]);
    Ok(url)
}

fn eq(value: &str) -> String {
    format!("eq.{value}")
}

fn lte(at: DateTime<Utc>) -> String {
    format!("lte.{}", at.to_rfc3339_opts(SecondsFormat::Micros, true))
}

async fn check(response: reqwest::Response) -> Result<reqwest::Response, StoreError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(StoreError::BackendUnavailable(format!(
        "PostgREST responded {status}: {body}"
    )))
}

#[async_trait]
impl TokenBackend for PostgrestBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Durable
    }

    async fn upsert(&self, record: &TokenRecord) -> Result<(), StoreError> {
        let response = self
            .client
            .post(self.table_url.clone())
            .header("Prefer", PREFER_UPSERT)
            .query(&[("on_conflict", "key")])
            .json(&[record])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn lookup(&self, key: &str) -> Result<Option<TokenRecord>, StoreError> {
        let response = self
            .client
            .get(self.table_url.clone())
            .query(&[("select", COLUMNS), ("limit", "1")])
            .query(&[("key", eq(key))])
            .send()
            .await?;
        let rows: Vec<TokenRecord> = check(response).await?.json().await?;
        Ok(rows.into_iter().next())
    }

    async fn delete(&self, key: &str) -> Result<(), StoreError> {
        let response = self
            .client
            .delete(self.table_url.clone())
            .query(&[("key", eq(key))])
            .send()
            .await?;
        check(response).await?;
        Ok(())
    }

    async fn evict_expired(&self, key: &str, now: DateTime<Utc>) -> Result<bool, StoreError> {
        let removed = self
            .delete_returning(&[("key", eq(key)), ("expires_at", lte(now))])
            .await?;
        Ok(!removed.is_empty())
    }

    async fn purge_expired(&self, now: DateTime<Utc>) -> Result<u64, StoreError> {
        let removed = self.delete_returning(&[("expires_at", lte(now))]).await?;
        Ok(removed.len() as u64)
    }
}
