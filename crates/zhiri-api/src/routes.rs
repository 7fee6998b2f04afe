//! API route definitions

use crate::auth::{require_role, UserRole};
use crate::handlers::{admin, auth, users};
use crate::state::AppState;
use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;

/// Create API v1 routes
///
/// Identity is attached by the global authentication layer in
/// [`crate::create_router`]; routes here only decide whether they need it.
pub fn api_routes() -> Router<Arc<AppState>> {
    let auth_routes = Router::new()
        .route("/auth/register", post(auth::register_handler))
        .route("/auth/login", post(auth::login_handler))
        .route("/auth/logout", post(auth::logout_handler));

    let user_routes = Router::new().route("/users/me", get(users::me_handler));

    // ADMIN only
    let admin_routes = Router::new()
        .route(
            "/admin/login-history/user/:user_id",
            get(admin::login_history_handler),
        )
        .route(
            "/admin/login-history/user/:user_id/stats",
            get(admin::login_stats_handler),
        )
        .route_layer(middleware::from_fn(require_role(UserRole::Admin)));

    Router::new()
        .merge(auth_routes)
        .merge(user_routes)
        .merge(admin_routes)
}
