//! Optional periodic eviction. Reads already evict lazily; this only bounds
//! how long never-read records stay stored.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use super::TokenStore;

pub fn spawn(store: Arc<TokenStore>, every: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // first tick completes immediately
        ticker.tick().await;

        loop {
            ticker.tick().await;
            match store.purge_expired().await {
                Ok(0) => tracing::debug!("Sweep found no expired tokens"),
                Ok(n) => tracing::info!("Swept {} expired tokens", n),
                Err(e) => tracing::warn!("Token sweep failed: {}", e),
            }
        }
    })
}
