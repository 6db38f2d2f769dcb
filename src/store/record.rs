use std::borrow::Cow;

use chrono::{DateTime, SubsecRound, Utc};
use serde::{Deserialize, Serialize};

use super::expiry;

/// One staged token. Also the row layout of the durable table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenRecord {
    pub key: String,
    pub token: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Stamp a new record at `now`. Expiry is always `now + TTL`.
    ///
    /// Timestamps are cut to microseconds, the precision Postgres keeps, so
    /// the durable row and the in-process record compare the same way.
    pub fn issue(key: impl Into<String>, token: impl Into<String>, now: DateTime<Utc>) -> Self {
        let now = now.trunc_subsecs(6);
        Self {
            key: key.into(),
            token: token.into(),
            created_at: now,
            expires_at: now + expiry::token_ttl(),
        }
    }

    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        expiry::is_live(self.created_at, expiry::token_ttl(), now)
    }
}

/// Correlation keys are only ever logged by their first few characters.
/// A trailing `...` marks a key that was cut.
pub fn key_prefix(key: &str) -> Cow<'_, str> {
    const SHOWN: usize = 10;
    match key.char_indices().nth(SHOWN) {
        Some((idx, _)) => Cow::Owned(format!("{}...", &key[..idx])),
        None => Cow::Borrowed(key),
    }
}
