//! Session service: registration, login and logout
//!
//! Every login attempt, successful or not, appends exactly one LOGIN event
//! to the history before the outcome is returned.

use super::error::AuthError;
use super::history::{failure_reason, LoginHistoryService, LoginSubject};
use super::jwt::{TokenCodec, TOKEN_TYPE_BEARER};
use super::middleware::AuthenticatedUser;
use super::models::{NewUser, UserPublic, UserRole};
use super::password::{validate_password_strength, verify_password, PasswordConfig};
use super::repository::UserRepository;
use super::revocation::RevocationLedger;
use crate::audit::{audit_log, AuditEvent, ClientContext};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

pub const REGISTRATION_MESSAGE: &str = "Registration successful";
pub const LOGOUT_MESSAGE: &str = "Logged out successfully";

/// User registration request
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct RegisterRequest {
    #[validate(
        email(message = "Invalid email format"),
        length(max = 50, message = "Email must be at most 50 characters")
    )]
    #[schema(example = "aigerim@example.kz")]
    pub email: String,

    #[validate(custom(function = "password_policy"))]
    #[schema(example = "Secret1!", min_length = 8)]
    pub password: String,

    #[validate(length(min = 2, max = 100), custom(function = "person_name"))]
    #[schema(example = "Aigerim")]
    pub first_name: String,

    #[validate(length(min = 2, max = 100), custom(function = "person_name"))]
    #[schema(example = "Sadykova")]
    pub last_name: String,

    #[validate(custom(function = "kz_mobile_phone"))]
    #[schema(example = "77011234567")]
    pub phone: String,

    #[validate(length(min = 2, max = 30, message = "City must be 2-30 characters"))]
    #[schema(example = "Almaty")]
    pub city: String,
}

/// User login request
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LoginRequest {
    #[schema(example = "aigerim@example.kz")]
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RegisterResponse {
    pub message: String,
    pub user: UserPublic,
}

/// Issued bearer token
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub token: String,
    #[schema(example = "Bearer")]
    pub token_type: String,
    /// Lifetime in seconds
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LogoutResponse {
    #[schema(example = "Logged out successfully")]
    pub message: String,
}

fn password_policy(password: &str) -> Result<(), ValidationError> {
    validate_password_strength(password).map_err(|msg| {
        let mut err = ValidationError::new("password_policy");
        err.message = Some(msg.into());
        err
    })
}

fn person_name(name: &str) -> Result<(), ValidationError> {
    if name
        .chars()
        .all(|c| c.is_alphabetic() || c == ' ' || c == '-')
    {
        Ok(())
    } else {
        let mut err = ValidationError::new("person_name");
        err.message = Some("Names may contain only letters, spaces and hyphens".into());
        Err(err)
    }
}

/// Kazakhstan mobile number: `77` followed by nine digits
fn kz_mobile_phone(phone: &str) -> Result<(), ValidationError> {
    if phone.len() == 11 && phone.starts_with("77") && phone.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("phone");
        err.message = Some("Phone must match 77XXXXXXXXX".into());
        Err(err)
    }
}

pub struct SessionService {
    users: Arc<dyn UserRepository>,
    codec: Arc<TokenCodec>,
    ledger: Arc<RevocationLedger>,
    history: Arc<LoginHistoryService>,
    password: PasswordConfig,
}

impl SessionService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        codec: Arc<TokenCodec>,
        ledger: Arc<RevocationLedger>,
        history: Arc<LoginHistoryService>,
        password: PasswordConfig,
    ) -> Self {
        Self {
            users,
            codec,
            ledger,
            history,
            password,
        }
    }

    /// Create a USER account
    pub async fn register(
        &self,
        request: RegisterRequest,
        client: &ClientContext,
    ) -> Result<RegisterResponse, AuthError> {
        let result = self.create_account(request.clone()).await;

        match &result {
            Ok(response) => audit_log(&AuditEvent::RegistrationSuccess {
                user_id: response.user.id,
                email: response.user.email.clone(),
                role: response.user.role.to_string(),
                ip_address: client.ip_address.clone(),
            }),
            Err(e) => audit_log(&AuditEvent::RegistrationFailure {
                email: request.email,
                reason: e.to_string(),
                ip_address: client.ip_address.clone(),
            }),
        }

        result
    }

    async fn create_account(&self, request: RegisterRequest) -> Result<RegisterResponse, AuthError> {
        request
            .validate()
            .map_err(|e| AuthError::Validation(e.to_string()))?;

        if self.users.find_by_email(&request.email).await?.is_some() {
            return Err(AuthError::EmailAlreadyExists);
        }

        let password_hash = self.password.hash(&request.password)?;
        let user = self
            .users
            .create(NewUser {
                email: request.email,
                password_hash,
                first_name: request.first_name.trim().to_string(),
                last_name: request.last_name.trim().to_string(),
                phone: request.phone,
                city: request.city.trim().to_string(),
                role: UserRole::User,
            })
            .await?;

        Ok(RegisterResponse {
            message: REGISTRATION_MESSAGE.to_string(),
            user: user.to_public(),
        })
    }

    /// Exchange credentials for a bearer token
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        client: &ClientContext,
    ) -> Result<TokenResponse, AuthError> {
        let Some(user) = self.users.find_by_email(email).await? else {
            self.reject(LoginSubject::Unknown { email }, failure_reason::USER_NOT_FOUND, client)
                .await?;
            return Err(AuthError::InvalidCredentials);
        };

        if !user.is_active {
            self.reject((&user).into(), failure_reason::ACCOUNT_DEACTIVATED, client)
                .await?;
            return Err(AuthError::AccountDeactivated);
        }

        let password_matches = verify_password(password, &user.password_hash).unwrap_or_else(|e| {
            warn!(user_id = %user.id, error = %e, "Stored password hash is unusable");
            false
        });
        if !password_matches {
            self.reject((&user).into(), failure_reason::WRONG_PASSWORD, client)
                .await?;
            return Err(AuthError::InvalidCredentials);
        }

        // History first, so a failed timestamp update still leaves one event
        self.history
            .record_login((&user).into(), true, None, client)
            .await?;
        let now = Utc::now();
        self.users.update_last_login(user.id, now).await?;
        audit_log(&AuditEvent::LoginSuccess {
            user_id: user.id,
            email: user.email.clone(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });

        let token = self
            .codec
            .mint_at(user.id, &user.email, user.role, now)
            .map_err(|e| AuthError::Internal(format!("Failed to mint token: {e}")))?;
        Ok(TokenResponse {
            token,
            token_type: TOKEN_TYPE_BEARER.to_string(),
            expires_in: self.codec.ttl().num_seconds(),
        })
    }

    async fn reject(
        &self,
        subject: LoginSubject<'_>,
        reason: &str,
        client: &ClientContext,
    ) -> Result<(), AuthError> {
        self.history
            .record_login(subject, false, Some(reason), client)
            .await?;

        let email = match subject {
            LoginSubject::Known { email, .. } | LoginSubject::Unknown { email } => email,
        };
        audit_log(&AuditEvent::LoginFailure {
            email: email.to_string(),
            reason: reason.to_string(),
            ip_address: client.ip_address.clone(),
            user_agent: client.user_agent.clone(),
        });
        Ok(())
    }

    /// Revoke the presented token and record a LOGOUT event
    pub async fn logout(
        &self,
        identity: &AuthenticatedUser,
        raw_token: Option<&str>,
        client: &ClientContext,
    ) -> Result<LogoutResponse, AuthError> {
        let token = raw_token.ok_or(AuthError::LogoutWithoutToken)?;

        self.ledger.revoke(token).await?;
        self.history
            .record_logout(identity.user_id, &identity.email, client)
            .await?;
        audit_log(&AuditEvent::Logout {
            user_id: identity.user_id,
            email: identity.email.clone(),
            ip_address: client.ip_address.clone(),
        });

        Ok(LogoutResponse {
            message: LOGOUT_MESSAGE.to_string(),
        })
    }
}
