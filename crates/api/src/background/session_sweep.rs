//! Periodic removal of expired refresh sessions.
//!
//! Expired records are already invisible to lookups; this only reclaims
//! storage.

use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use turnstile_db::store::SessionStore;

/// Run the sweep loop every `interval` until `cancel` is triggered.
///
/// The first sweep runs immediately.
pub async fn run(store: Arc<dyn SessionStore>, interval: Duration, cancel: CancellationToken) {
    tracing::info!(interval_secs = interval.as_secs(), "Session sweep job started");

    let mut ticker = tokio::time::interval(interval);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Session sweep job stopping");
                break;
            }
            _ = ticker.tick() => {
                match store.delete_expired().await {
                    Ok(deleted) if deleted > 0 => {
                        tracing::info!(deleted, "Session sweep: purged expired sessions");
                    }
                    Ok(_) => tracing::debug!("Session sweep: nothing to purge"),
                    Err(e) => tracing::error!(error = %e, "Session sweep failed"),
                }
            }
        }
    }
}
