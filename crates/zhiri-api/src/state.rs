//! Application state management

use crate::auth::memory::{
    InMemoryLoginHistoryRepository, InMemoryRevokedTokenRepository, InMemoryUserRepository,
};
use crate::auth::{
    Authenticator, LoginHistoryRepository, LoginHistoryService, PasswordConfig,
    PgLoginHistoryRepository, PgRevokedTokenRepository, PgUserRepository, RevocationLedger,
    RevokedTokenRepository, SessionService, TokenCodec, UserRepository,
};
use sqlx::postgres::PgPool;
use std::sync::Arc;
use std::time::Instant;
use zhiri_core::AppConfig;

/// The three persistence seams, bundled for state construction
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserRepository>,
    pub revoked_tokens: Arc<dyn RevokedTokenRepository>,
    pub login_history: Arc<dyn LoginHistoryRepository>,
}

impl Stores {
    pub fn postgres(pool: PgPool) -> Self {
        Self {
            users: Arc::new(PgUserRepository::new(pool.clone())),
            revoked_tokens: Arc::new(PgRevokedTokenRepository::new(pool.clone())),
            login_history: Arc::new(PgLoginHistoryRepository::new(pool)),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            users: Arc::new(InMemoryUserRepository::new()),
            revoked_tokens: Arc::new(InMemoryRevokedTokenRepository::new()),
            login_history: Arc::new(InMemoryLoginHistoryRepository::new()),
        }
    }
}

/// Application state shared across handlers
///
/// Every service is built once here and shared through `Arc`s.
pub struct AppState {
    pub config: AppConfig,
    pub start_time: Instant,
    pub users: Arc<dyn UserRepository>,
    pub codec: Arc<TokenCodec>,
    pub ledger: Arc<RevocationLedger>,
    pub history: Arc<LoginHistoryService>,
    pub authenticator: Arc<Authenticator>,
    pub sessions: Arc<SessionService>,
}

impl AppState {
    pub fn new(config: AppConfig, stores: Stores) -> Self {
        Self::with_password_config(config, stores, PasswordConfig::default())
    }

    /// Build state with explicit Argon2 cost parameters
    pub fn with_password_config(
        config: AppConfig,
        stores: Stores,
        password: PasswordConfig,
    ) -> Self {
        let codec = Arc::new(TokenCodec::new(&config.auth));
        let ledger = Arc::new(RevocationLedger::new(stores.revoked_tokens, codec.clone()));
        let history = Arc::new(LoginHistoryService::new(stores.login_history));
        let authenticator = Arc::new(Authenticator::new(
            codec.clone(),
            ledger.clone(),
            stores.users.clone(),
        ));
        let sessions = Arc::new(SessionService::new(
            stores.users.clone(),
            codec.clone(),
            ledger.clone(),
            history.clone(),
            password,
        ));

        Self {
            config,
            start_time: Instant::now(),
            users: stores.users,
            codec,
            ledger,
            history,
            authenticator,
            sessions,
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
