//! Background expiry sweep.
//!
//! Expired sessions are dropped silently, matching the product behavior of
//! a retry dialogue simply going quiet after 30 idle minutes. The sweeper
//! only ever observes sessions at rest in the store: anything mid-transition
//! is checked out and invisible to it.

use std::sync::Arc;

use chrono::Utc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::session::InMemorySessionStore;

/// Spawn the periodic sweep task. Cancel `shutdown` to stop it.
pub fn spawn_sweeper(
    store: Arc<InMemorySessionStore>,
    ttl: chrono::Duration,
    every: std::time::Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(every);
        tick.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    debug!("Session sweeper shutting down");
                    break;
                }
                _ = tick.tick() => {
                    let swept = store.sweep_expired(Utc::now(), ttl);
                    if !swept.is_empty() {
                        info!("Dropped {} expired session(s)", swept.len());
                    }
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::RetrySession;
    use chrono::Duration as ChronoDuration;
    use std::time::Duration;

    #[tokio::test]
    async fn test_sweeper_drops_stale_sessions_and_stops_on_cancel() {
        let store = Arc::new(InMemorySessionStore::new());
        let now = Utc::now();

        let mut stale = RetrySession::new("stale", "u1", "read a book", now);
        stale.last_activity = now - ChronoDuration::minutes(45);
        store.create(stale).unwrap();
        store.create(RetrySession::new("fresh", "u2", "write", now)).unwrap();

        let shutdown = CancellationToken::new();
        let handle = spawn_sweeper(
            Arc::clone(&store),
            ChronoDuration::minutes(30),
            Duration::from_millis(10),
            shutdown.clone(),
        );

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(store.len(), 1);
        assert!(store.checkout("stale").is_none());

        shutdown.cancel();
        handle.await.unwrap();
    }
}
