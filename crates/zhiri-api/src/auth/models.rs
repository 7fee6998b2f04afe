//! Data models for authentication and authorization
//!
//! This module defines the records owned or read by the auth subsystem:
//! - User: account credentials, role and activity flags
//! - RevokedToken: bearer tokens invalidated before their natural expiry
//! - LoginEvent: append-only login/logout history
//!
//! These models map to the PostgreSQL tables created by the migrations in
//! `migrations/`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

/// User role
///
/// A user holds exactly one role:
/// - User: regular customer
/// - Partner: service provider listing offers
/// - Admin: moderation and reporting access
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum UserRole {
    User,
    Partner,
    Admin,
}

/// Returned when a role string is not one of USER, PARTNER, ADMIN
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown role: {0}")]
pub struct UnknownRole(pub String);

impl UserRole {
    /// Convert role to its stored representation
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "USER",
            UserRole::Partner => "PARTNER",
            UserRole::Admin => "ADMIN",
        }
    }
}

impl FromStr for UserRole {
    type Err = UnknownRole;

    /// Case-insensitive parse; never panics
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "USER" => Ok(UserRole::User),
            "PARTNER" => Ok(UserRole::Partner),
            "ADMIN" => Ok(UserRole::Admin),
            _ => Err(UnknownRole(s.to_string())),
        }
    }
}

impl std::fmt::Display for UserRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// User account model
///
/// Maps to the `users` table. Email is unique and compared exactly as stored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,

    /// Login email (unique, case-sensitive)
    pub email: String,

    /// Argon2id PHC string; never serialized
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub city: String,

    pub role: UserRole,

    /// Inactive accounts cannot log in and lose their session on the next request
    pub is_active: bool,

    pub email_verified: bool,

    /// Last successful login timestamp
    pub last_login: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Convert user to public representation (without sensitive fields)
    pub fn to_public(&self) -> UserPublic {
        UserPublic {
            id: self.id,
            email: self.email.clone(),
            first_name: self.first_name.clone(),
            last_name: self.last_name.clone(),
            phone: self.phone.clone(),
            city: self.city.clone(),
            role: self.role,
            is_active: self.is_active,
            email_verified: self.email_verified,
            last_login: self.last_login,
            created_at: self.created_at,
        }
    }
}

/// Public user representation (safe for API responses)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserPublic {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub city: String,
    pub role: UserRole,
    pub is_active: bool,
    pub email_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

/// Fields required to insert a user
#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub city: String,
    pub role: UserRole,
}

impl NewUser {
    /// Materialize a full record with a fresh id and timestamps
    pub fn into_user(self) -> User {
        let now = Utc::now();
        User {
            id: Uuid::new_v4(),
            email: self.email,
            password_hash: self.password_hash,
            first_name: self.first_name,
            last_name: self.last_name,
            phone: self.phone,
            city: self.city,
            role: self.role,
            is_active: true,
            email_verified: false,
            last_login: None,
            created_at: now,
            updated_at: now,
        }
    }
}

/// Revoked token entry
///
/// Keyed by the raw token string. `expires_at` is the token's own `exp`
/// claim, so the entry becomes sweepable exactly when the token would have
/// stopped validating anyway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RevokedToken {
    pub token: String,
    pub owner_email: String,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: DateTime<Utc>,
}

/// Kind of login history entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum LoginEventType {
    Login,
    Logout,
}

impl LoginEventType {
    pub fn as_str(&self) -> &'static str {
        match self {
            LoginEventType::Login => "LOGIN",
            LoginEventType::Logout => "LOGOUT",
        }
    }
}

impl FromStr for LoginEventType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "LOGIN" => Ok(LoginEventType::Login),
            "LOGOUT" => Ok(LoginEventType::Logout),
            other => Err(format!("Unknown login event type: {other}")),
        }
    }
}

/// Login history entry (append-only)
///
/// `user_id` is absent when the attempted email did not resolve to a user;
/// `email` is always recorded.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginEvent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub email: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub event_type: LoginEventType,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_reason: Option<String>,
    pub created_at: DateTime<Utc>,
}
