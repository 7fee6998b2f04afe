//! Zhiri API - marketplace authentication server
//!
//! Bearer-token authentication for the marketplace: registration, login,
//! logout with token revocation, and an auditable login history.

pub mod audit;
pub mod auth;
pub mod db;
pub mod error;
pub mod extract;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;
pub mod sweeper;

use crate::auth::auth_middleware;
use crate::openapi::ApiDoc;
use crate::state::AppState;
use axum::{
    http::{header, HeaderValue, Method},
    middleware::from_fn_with_state,
    routing::get,
    Router,
};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

/// Create the application router
///
/// Every route, public or not, passes through [`auth_middleware`].
pub fn create_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);

    let app = Router::new()
        .route("/health", get(handlers::health::health_check))
        .route("/ready", get(handlers::health::readiness_check))
        .nest("/api/v1", routes::api_routes())
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .with_state(state.clone())
        .layer(from_fn_with_state(
            state.authenticator.clone(),
            auth_middleware,
        ))
        .layer(TraceLayer::new_for_http());

    match cors {
        Some(cors) => app.layer(cors),
        None => app,
    }
}

/// CORS for the configured origins; `None` when no origin is configured
fn cors_layer(origins: &[String]) -> Option<CorsLayer> {
    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match origin.parse::<HeaderValue>() {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::error!(origin = %origin, error = %e, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    if allowed.is_empty() {
        return None;
    }

    Some(
        CorsLayer::new()
            .allow_origin(allowed)
            .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]),
    )
}

/// Router backed by in-memory stores, for integration tests
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> Router {
    testing::TestApp::new().router
}

/// Fixtures for driving the router without a database
#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    use crate::auth::memory::{
        InMemoryLoginHistoryRepository, InMemoryRevokedTokenRepository, InMemoryUserRepository,
    };
    use crate::auth::{NewUser, PasswordConfig, User, UserRole};
    use crate::state::{AppState, Stores};
    use axum::Router;
    use std::sync::Arc;
    use uuid::Uuid;
    use zhiri_core::AppConfig;

    /// Password every seeded user gets
    pub const TEST_PASSWORD: &str = "Secret1!";

    pub struct TestApp {
        pub router: Router,
        pub state: Arc<AppState>,
        pub users: Arc<InMemoryUserRepository>,
        pub revoked_tokens: Arc<InMemoryRevokedTokenRepository>,
        pub login_history: Arc<InMemoryLoginHistoryRepository>,
    }

    impl TestApp {
        pub fn new() -> Self {
            let users = Arc::new(InMemoryUserRepository::new());
            let revoked_tokens = Arc::new(InMemoryRevokedTokenRepository::new());
            let login_history = Arc::new(InMemoryLoginHistoryRepository::new());

            let stores = Stores {
                users: users.clone(),
                revoked_tokens: revoked_tokens.clone(),
                login_history: login_history.clone(),
            };
            let state = Arc::new(AppState::with_password_config(
                AppConfig::default(),
                stores,
                PasswordConfig::light(),
            ));

            Self {
                router: crate::create_router(state.clone()),
                state,
                users,
                revoked_tokens,
                login_history,
            }
        }

        /// Insert an active user whose password is [`TEST_PASSWORD`]
        pub async fn seed_user(&self, email: &str, role: UserRole) -> User {
            let password_hash = PasswordConfig::light()
                .hash(TEST_PASSWORD)
                .unwrap_or_default();
            let phone = format!("77{:09}", Uuid::new_v4().as_u128() % 1_000_000_000);

            let user = NewUser {
                email: email.to_string(),
                password_hash,
                first_name: "Test".to_string(),
                last_name: "User".to_string(),
                phone,
                city: "Almaty".to_string(),
                role,
            }
            .into_user();

            self.users.put(user.clone()).await;
            user
        }
    }

    impl Default for TestApp {
        fn default() -> Self {
            Self::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cors_layer_requires_origins() {
        assert!(cors_layer(&[]).is_none());
        assert!(cors_layer(&["https://zhiri.kz".to_string()]).is_some());
    }
}
