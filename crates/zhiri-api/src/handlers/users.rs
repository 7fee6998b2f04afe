//! Current-user handlers

use crate::auth::{AuthError, AuthenticatedUser, UserPublic};
use crate::state::AppState;
use axum::{extract::State, Json};
use std::sync::Arc;

/// Get the authenticated user's profile
#[utoipa::path(
    get,
    path = "/api/v1/users/me",
    tag = "users",
    responses(
        (status = 200, description = "Current user profile", body = UserPublic),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    user: AuthenticatedUser,
) -> Result<Json<UserPublic>, AuthError> {
    // The record can disappear between the middleware lookup and here
    let record = state
        .users
        .find_by_id(user.user_id)
        .await?
        .ok_or(AuthError::Unauthenticated)?;

    Ok(Json(record.to_public()))
}
