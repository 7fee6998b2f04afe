//! Revocation ledger
//!
//! Records tokens invalidated by logout so they stop authenticating before
//! their natural expiry. Each entry expires with the token itself and is
//! removed by the periodic sweep once `expires_at < now`.

use super::error::AuthError;
use super::jwt::TokenCodec;
use super::models::RevokedToken;
use super::repository::{RepositoryError, RevokedTokenRepository};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use tracing::{debug, info};

pub struct RevocationLedger {
    store: Arc<dyn RevokedTokenRepository>,
    codec: Arc<TokenCodec>,
}

impl RevocationLedger {
    pub fn new(store: Arc<dyn RevokedTokenRepository>, codec: Arc<TokenCodec>) -> Self {
        Self { store, codec }
    }

    /// Revoke a signed token
    ///
    /// Owner and expiry come from the token's own claims; the signature
    /// must check out but expiry is not enforced. Revoking the same token
    /// twice leaves a single entry.
    pub async fn revoke(&self, token: &str) -> Result<(), AuthError> {
        let claims = self.codec.claims(token)?;

        let inserted = self
            .store
            .insert(RevokedToken {
                token: token.to_string(),
                owner_email: claims.email.clone(),
                expires_at: claims.expires_at,
                revoked_at: Utc::now(),
            })
            .await?;

        if inserted {
            info!(email = %claims.email, "Token revoked");
        } else {
            debug!(email = %claims.email, "Token already revoked");
        }
        Ok(())
    }

    pub async fn is_revoked(&self, token: &str) -> Result<bool, RepositoryError> {
        self.store.contains(token).await
    }

    /// Delete every entry whose `expires_at` is strictly before `now`
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        self.store.delete_expired(now).await
    }
}
