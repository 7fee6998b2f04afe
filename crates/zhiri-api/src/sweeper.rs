//! Periodic removal of expired revocation entries

use crate::auth::RevocationLedger;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, error, info};

/// Run one sweep, logging the outcome
///
/// Returns the number of entries removed, or `None` when the store failed.
/// Failures are never propagated; the next tick retries.
pub async fn sweep_once(ledger: &RevocationLedger, now: DateTime<Utc>) -> Option<u64> {
    match ledger.sweep_expired(now).await {
        Ok(0) => {
            debug!("No expired revoked tokens to clean up");
            Some(0)
        }
        Ok(removed) => {
            info!(removed, "Cleaned up expired revoked tokens");
            Some(removed)
        }
        Err(e) => {
            error!(error = %e, "Revoked token cleanup failed");
            None
        }
    }
}

/// Spawn the sweep on its own task
///
/// The first sweep runs one `period` after the call, then every `period`.
pub fn spawn_token_sweeper(ledger: Arc<RevocationLedger>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        info!(period_secs = period.as_secs(), "Revoked token sweeper started");

        loop {
            ticker.tick().await;
            sweep_once(&ledger, Utc::now()).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::memory::InMemoryRevokedTokenRepository;
    use crate::auth::{RevokedToken, RevokedTokenRepository, TokenCodec};
    use zhiri_core::AuthConfig;

    fn ledger_with(store: Arc<InMemoryRevokedTokenRepository>) -> Arc<RevocationLedger> {
        let codec = Arc::new(TokenCodec::new(&AuthConfig::default()));
        Arc::new(RevocationLedger::new(store, codec))
    }

    async fn insert(store: &InMemoryRevokedTokenRepository, token: &str, expires_at: DateTime<Utc>) {
        store
            .insert(RevokedToken {
                token: token.to_string(),
                owner_email: "a@x.com".to_string(),
                expires_at,
                revoked_at: Utc::now(),
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_sweep_once_reports_count() {
        let store = Arc::new(InMemoryRevokedTokenRepository::new());
        let ledger = ledger_with(store.clone());
        let now = Utc::now();

        insert(&store, "old", now - chrono::Duration::minutes(5)).await;
        insert(&store, "live", now + chrono::Duration::minutes(5)).await;

        assert_eq!(sweep_once(&ledger, now).await, Some(1));
        assert_eq!(sweep_once(&ledger, now).await, Some(0));
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_sweeper_waits_one_period() {
        let store = Arc::new(InMemoryRevokedTokenRepository::new());
        let ledger = ledger_with(store.clone());
        insert(&store, "old", Utc::now() - chrono::Duration::minutes(5)).await;

        let handle = spawn_token_sweeper(ledger, Duration::from_secs(60));

        tokio::time::sleep(Duration::from_secs(59)).await;
        assert_eq!(store.len().await, 1);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert!(store.is_empty().await);

        handle.abort();
    }
}
