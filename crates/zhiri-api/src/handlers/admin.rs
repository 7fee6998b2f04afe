//! Admin login-history handlers
//!
//! Mounted behind `require_role(UserRole::Admin)`, so handlers here can
//! assume an ADMIN identity.

use crate::auth::LoginEvent;
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use zhiri_core::{Page, PageRequest};

/// Successful-login total for one user
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginStatsResponse {
    pub user_id: Uuid,
    pub total_successful_logins: u64,
}

/// A user's login history, newest first
#[utoipa::path(
    get,
    path = "/api/v1/admin/login-history/user/{user_id}",
    tag = "admin",
    params(
        ("user_id" = Uuid, Path, description = "User to inspect"),
        ("page" = Option<u32>, Query, description = "Zero-based page index"),
        ("size" = Option<u32>, Query, description = "Page size (1-100, default 20)"),
    ),
    responses(
        (status = 200, description = "Page of login events", body = [LoginEvent]),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 403, description = "ADMIN role required", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn login_history_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
    Query(page): Query<PageRequest>,
) -> Result<Json<Page<LoginEvent>>, AppError> {
    let events = state.history.history(user_id, page).await?;
    Ok(Json(events))
}

/// Count of a user's successful logins
#[utoipa::path(
    get,
    path = "/api/v1/admin/login-history/user/{user_id}/stats",
    tag = "admin",
    params(
        ("user_id" = Uuid, Path, description = "User to inspect"),
    ),
    responses(
        (status = 200, description = "Login statistics", body = LoginStatsResponse),
        (status = 401, description = "Unauthorized", body = crate::error::ApiError),
        (status = 403, description = "ADMIN role required", body = crate::error::ApiError),
    ),
    security(
        ("bearer_auth" = [])
    )
)]
pub async fn login_stats_handler(
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<LoginStatsResponse>, AppError> {
    let total_successful_logins = state.history.total_successful_logins(user_id).await?;

    Ok(Json(LoginStatsResponse {
        user_id,
        total_successful_logins,
    }))
}
