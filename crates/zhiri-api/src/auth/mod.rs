//! Authentication and authorization module
//!
//! - Token codec: HS512 bearer tokens
//! - Revocation ledger with periodic sweep (see [`crate::sweeper`])
//! - Login history
//! - Per-request authentication middleware and role guard
//! - Session service: registration, login, logout
//! - Storage traits with PostgreSQL and in-memory implementations

pub mod error;
pub mod history;
pub mod jwt;
pub mod memory;
pub mod middleware;
pub mod models;
pub mod password;
pub mod repository;
pub mod revocation;
pub mod service;

pub use error::AuthError;
pub use history::{failure_reason, LoginHistoryService, LoginSubject};
pub use jwt::{Claims, JwtError, TokenClaims, TokenCodec};
pub use middleware::{auth_middleware, bearer_token, require_role, AuthenticatedUser, Authenticator};
pub use models::{LoginEvent, LoginEventType, NewUser, RevokedToken, User, UserPublic, UserRole};
pub use password::{validate_password_strength, verify_password, PasswordConfig};
pub use repository::{
    LoginHistoryRepository, PgLoginHistoryRepository, PgRevokedTokenRepository,
    PgUserRepository, RepositoryError, RevokedTokenRepository, UserRepository,
};
pub use revocation::RevocationLedger;
pub use service::{
    LoginRequest, LogoutResponse, RegisterRequest, RegisterResponse, SessionService,
    TokenResponse,
};
