use chrono::{DateTime, Duration, Utc};

/// Lifetime of every staged token. Not configurable per record.
pub const TOKEN_TTL_SECS: i64 = 600; // 10 minutes

pub fn token_ttl() -> Duration {
    Duration::seconds(TOKEN_TTL_SECS)
}

/// A record is live strictly before `created_at + ttl`.
pub fn is_live(created_at: DateTime<Utc>, ttl: Duration, now: DateTime<Utc>) -> bool {
    now < created_at + ttl
}
