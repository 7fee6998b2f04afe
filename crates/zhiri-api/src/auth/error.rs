//! Authentication error taxonomy and its HTTP mapping

use super::jwt::JwtError;
use super::password::PasswordError;
use super::repository::RepositoryError;
use crate::error::ApiError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Unknown email or wrong password; the two are indistinguishable to callers
    #[error("Invalid email or password")]
    InvalidCredentials,

    #[error("Account is deactivated")]
    AccountDeactivated,

    #[error("Invalid token: {0}")]
    TokenInvalid(#[from] JwtError),

    #[error("Token has been revoked")]
    RevokedTokenUsed,

    #[error("Missing bearer token on logout")]
    LogoutWithoutToken,

    #[error("Authentication required")]
    Unauthenticated,

    #[error("Insufficient permissions")]
    InsufficientPermissions,

    #[error("Email already registered")]
    EmailAlreadyExists,

    #[error("Phone already registered")]
    PhoneAlreadyExists,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Password hashing failed: {0}")]
    Password(#[from] PasswordError),

    #[error("Repository error: {0}")]
    Repository(RepositoryError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<RepositoryError> for AuthError {
    fn from(err: RepositoryError) -> Self {
        match err {
            RepositoryError::EmailAlreadyExists => AuthError::EmailAlreadyExists,
            RepositoryError::PhoneAlreadyExists => AuthError::PhoneAlreadyExists,
            other => AuthError::Repository(other),
        }
    }
}

impl AuthError {
    pub fn status(&self) -> StatusCode {
        match self {
            AuthError::InvalidCredentials
            | AuthError::TokenInvalid(_)
            | AuthError::RevokedTokenUsed
            | AuthError::Unauthenticated => StatusCode::UNAUTHORIZED,
            AuthError::AccountDeactivated | AuthError::InsufficientPermissions => {
                StatusCode::FORBIDDEN
            }
            AuthError::LogoutWithoutToken | AuthError::Validation(_) => StatusCode::BAD_REQUEST,
            AuthError::EmailAlreadyExists | AuthError::PhoneAlreadyExists => StatusCode::CONFLICT,
            AuthError::Password(_) | AuthError::Repository(_) | AuthError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let status = self.status();
        let error = match &self {
            AuthError::InvalidCredentials => {
                ApiError::new("INVALID_CREDENTIALS", "Invalid email or password")
            }
            AuthError::AccountDeactivated => ApiError::new(
                "ACCOUNT_DEACTIVATED",
                "Account is deactivated. Contact an administrator.",
            ),
            // Token problems never reveal which check failed
            AuthError::TokenInvalid(_)
            | AuthError::RevokedTokenUsed
            | AuthError::Unauthenticated => ApiError::unauthorized(),
            AuthError::LogoutWithoutToken => ApiError::new(
                "LOGOUT_WITHOUT_TOKEN",
                "Authorization bearer token is required to log out",
            ),
            AuthError::InsufficientPermissions => {
                ApiError::new("FORBIDDEN", "Insufficient permissions")
            }
            AuthError::EmailAlreadyExists => {
                ApiError::new("EMAIL_EXISTS", "Email is already registered")
            }
            AuthError::PhoneAlreadyExists => {
                ApiError::new("PHONE_EXISTS", "Phone number is already registered")
            }
            AuthError::Validation(msg) => ApiError::new("VALIDATION_ERROR", msg.clone()),
            AuthError::Password(e) => {
                tracing::error!(error = %e, "Password hashing failed");
                ApiError::internal_error()
            }
            AuthError::Repository(e) => {
                tracing::error!(error = %e, "Auth storage failure");
                ApiError::internal_error()
            }
            AuthError::Internal(msg) => {
                tracing::error!(error = %msg, "Auth internal failure");
                ApiError::internal_error()
            }
        };

        (status, Json(error)).into_response()
    }
}
