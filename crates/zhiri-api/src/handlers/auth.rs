//! Authentication API handlers
//!
//! Registration, login and logout. Login and registration are public;
//! logout needs both the bearer header and the identity it resolves to.

use crate::audit::ClientContext;
use crate::auth::{
    bearer_token, AuthError, AuthenticatedUser, LoginRequest, LogoutResponse, RegisterRequest,
    RegisterResponse, TokenResponse,
};
use crate::extract::ApiJson;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;

/// Register a new user account
///
/// New accounts get the USER role, are active and have an unverified email.
///
/// # Responses
///
/// * `201 Created` - Account created
/// * `400 Bad Request` - Field validation failed
/// * `409 Conflict` - Email or phone already registered
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "User registered successfully", body = RegisterResponse),
        (status = 400, description = "Invalid input or malformed body", body = crate::error::ApiError),
        (status = 409, description = "Email or phone already registered", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    client: ClientContext,
    ApiJson(request): ApiJson<RegisterRequest>,
) -> Result<impl IntoResponse, AuthError> {
    let response = state.sessions.register(request, &client).await?;
    Ok((StatusCode::CREATED, Json(response)))
}

/// Login with email and password
///
/// Unknown email and wrong password produce the same response. Every
/// attempt is recorded in the login history.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = TokenResponse),
        (status = 400, description = "Malformed body", body = crate::error::ApiError),
        (status = 401, description = "Invalid email or password", body = crate::error::ApiError),
        (status = 403, description = "Account deactivated", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    client: ClientContext,
    ApiJson(request): ApiJson<LoginRequest>,
) -> Result<Json<TokenResponse>, AuthError> {
    let response = state
        .sessions
        .login(&request.email, &request.password, &client)
        .await?;
    Ok(Json(response))
}

/// Logout current session
///
/// Revokes the presented token. A request without a bearer header is a
/// 400; a bearer header that does not resolve to an identity is a 401.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logout successful", body = LogoutResponse),
        (status = 400, description = "Missing bearer token", body = crate::error::ApiError),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 500, description = "Internal server error", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    user: Option<AuthenticatedUser>,
    client: ClientContext,
    headers: HeaderMap,
) -> Result<Json<LogoutResponse>, AuthError> {
    let token = bearer_token(&headers).ok_or(AuthError::LogoutWithoutToken)?;
    let user = user.ok_or(AuthError::Unauthenticated)?;

    let response = state.sessions.logout(&user, Some(token), &client).await?;
    Ok(Json(response))
}
