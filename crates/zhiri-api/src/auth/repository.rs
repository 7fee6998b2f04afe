//! Storage seams for authentication entities
//!
//! Each store is a trait with a PostgreSQL implementation here and an
//! in-memory implementation in [`super::memory`]:
//! - [`UserRepository`]: account lookup and creation
//! - [`RevokedTokenRepository`]: the revocation ledger's persistence
//! - [`LoginHistoryRepository`]: append-only login/logout history

use super::models::{LoginEvent, LoginEventType, NewUser, RevokedToken, User, UserRole};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgPool;
use sqlx::FromRow;
use thiserror::Error;
use uuid::Uuid;
use zhiri_core::{Page, PageRequest};

/// Repository errors
#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    DatabaseError(String),

    #[error("Email already exists")]
    EmailAlreadyExists,

    #[error("Phone already exists")]
    PhoneAlreadyExists,

    #[error("Invalid stored record: {0}")]
    InvalidRecord(String),
}

impl From<sqlx::Error> for RepositoryError {
    fn from(e: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &e {
            if db_err.is_unique_violation() {
                match db_err.constraint() {
                    Some(c) if c.contains("email") => return RepositoryError::EmailAlreadyExists,
                    Some(c) if c.contains("phone") => return RepositoryError::PhoneAlreadyExists,
                    _ => {}
                }
            }
        }
        RepositoryError::DatabaseError(e.to_string())
    }
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError>;

    /// Exact (case-sensitive) email match
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError>;

    /// Insert a new active user; fails on duplicate email or phone
    async fn create(&self, user: NewUser) -> Result<User, RepositoryError>;

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError>;

    /// Backend reachability for readiness checks
    async fn health_check(&self) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait RevokedTokenRepository: Send + Sync {
    /// Insert unless the token is already present; returns whether a row was added
    async fn insert(&self, entry: RevokedToken) -> Result<bool, RepositoryError>;

    async fn contains(&self, token: &str) -> Result<bool, RepositoryError>;

    /// Remove entries with `expires_at < now`; returns the number removed
    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError>;
}

#[async_trait]
pub trait LoginHistoryRepository: Send + Sync {
    async fn append(&self, event: LoginEvent) -> Result<(), RepositoryError>;

    /// Events for one user, newest first
    async fn find_by_user(
        &self,
        user_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<LoginEvent>, RepositoryError>;

    /// Number of successful LOGIN events for one user
    async fn count_successful_logins(&self, user_id: Uuid) -> Result<u64, RepositoryError>;
}

// ==================== PostgreSQL ====================

#[derive(Debug, FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    first_name: String,
    last_name: String,
    phone: String,
    city: String,
    role: String,
    is_active: bool,
    email_verified: bool,
    last_login: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<UserRole>()
            .map_err(|e| RepositoryError::InvalidRecord(e.to_string()))?;

        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            first_name: row.first_name,
            last_name: row.last_name,
            phone: row.phone,
            city: row.city,
            role,
            is_active: row.is_active,
            email_verified: row.email_verified,
            last_login: row.last_login,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, phone, city, role, \
     is_active, email_verified, last_login, created_at, updated_at";

/// PostgreSQL-backed user store
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, RepositoryError> {
        let query = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let row = sqlx::query_as::<_, UserRow>(&query)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::try_from).transpose()
    }

    async fn create(&self, new_user: NewUser) -> Result<User, RepositoryError> {
        let user = new_user.into_user();

        sqlx::query(
            r#"
            INSERT INTO users (id, email, password_hash, first_name, last_name, phone, city,
                               role, is_active, email_verified, last_login, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(user.id)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(&user.first_name)
        .bind(&user.last_name)
        .bind(&user.phone)
        .bind(&user.city)
        .bind(user.role.as_str())
        .bind(user.is_active)
        .bind(user.email_verified)
        .bind(user.last_login)
        .bind(user.created_at)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(user)
    }

    async fn update_last_login(&self, id: Uuid, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        sqlx::query("UPDATE users SET last_login = $1, updated_at = $1 WHERE id = $2")
            .bind(at)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn health_check(&self) -> Result<(), RepositoryError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// PostgreSQL-backed revocation ledger store
#[derive(Clone)]
pub struct PgRevokedTokenRepository {
    pool: PgPool,
}

impl PgRevokedTokenRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RevokedTokenRepository for PgRevokedTokenRepository {
    async fn insert(&self, entry: RevokedToken) -> Result<bool, RepositoryError> {
        let result = sqlx::query(
            r#"
            INSERT INTO revoked_tokens (token, owner_email, expires_at, revoked_at)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (token) DO NOTHING
            "#,
        )
        .bind(&entry.token)
        .bind(&entry.owner_email)
        .bind(entry.expires_at)
        .bind(entry.revoked_at)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn contains(&self, token: &str) -> Result<bool, RepositoryError> {
        let exists: bool =
            sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM revoked_tokens WHERE token = $1)")
                .bind(token)
                .fetch_one(&self.pool)
                .await?;
        Ok(exists)
    }

    async fn delete_expired(&self, now: DateTime<Utc>) -> Result<u64, RepositoryError> {
        let result = sqlx::query("DELETE FROM revoked_tokens WHERE expires_at < $1")
            .bind(now)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}

#[derive(Debug, FromRow)]
struct LoginEventRow {
    id: Uuid,
    user_id: Option<Uuid>,
    email: String,
    ip_address: Option<String>,
    user_agent: Option<String>,
    event_type: String,
    success: bool,
    failure_reason: Option<String>,
    created_at: DateTime<Utc>,
}

impl TryFrom<LoginEventRow> for LoginEvent {
    type Error = RepositoryError;

    fn try_from(row: LoginEventRow) -> Result<Self, Self::Error> {
        let event_type = row
            .event_type
            .parse::<LoginEventType>()
            .map_err(RepositoryError::InvalidRecord)?;

        Ok(LoginEvent {
            id: row.id,
            user_id: row.user_id,
            email: row.email,
            ip_address: row.ip_address,
            user_agent: row.user_agent,
            event_type,
            success: row.success,
            failure_reason: row.failure_reason,
            created_at: row.created_at,
        })
    }
}

/// PostgreSQL-backed login history
#[derive(Clone)]
pub struct PgLoginHistoryRepository {
    pool: PgPool,
}

impl PgLoginHistoryRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl LoginHistoryRepository for PgLoginHistoryRepository {
    async fn append(&self, event: LoginEvent) -> Result<(), RepositoryError> {
        sqlx::query(
            r#"
            INSERT INTO login_history (id, user_id, email, ip_address, user_agent,
                                       event_type, success, failure_reason, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            "#,
        )
        .bind(event.id)
        .bind(event.user_id)
        .bind(&event.email)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(event.event_type.as_str())
        .bind(event.success)
        .bind(&event.failure_reason)
        .bind(event.created_at)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn find_by_user(
        &self,
        user_id: Uuid,
        request: PageRequest,
    ) -> Result<Page<LoginEvent>, RepositoryError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM login_history WHERE user_id = $1")
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;

        let rows = sqlx::query_as::<_, LoginEventRow>(
            r#"
            SELECT id, user_id, email, ip_address, user_agent, event_type, success,
                   failure_reason, created_at
            FROM login_history
            WHERE user_id = $1
            ORDER BY created_at DESC, seq DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(request.limit() as i64)
        .bind(request.offset() as i64)
        .fetch_all(&self.pool)
        .await?;

        let events = rows
            .into_iter()
            .map(LoginEvent::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Page::new(events, request, total.max(0) as u64))
    }

    async fn count_successful_logins(&self, user_id: Uuid) -> Result<u64, RepositoryError> {
        let count: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM login_history WHERE user_id = $1 AND success AND event_type = 'LOGIN'",
        )
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(count.max(0) as u64)
    }
}
