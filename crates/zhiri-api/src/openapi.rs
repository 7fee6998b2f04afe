//! OpenAPI documentation served through Swagger UI

use crate::auth::{
    LoginEvent, LoginEventType, LoginRequest, LogoutResponse, RegisterRequest, RegisterResponse,
    TokenResponse, UserPublic, UserRole,
};
use crate::error::ApiError;
use crate::handlers::{admin, auth, health, users};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Zhiri API",
        description = "Marketplace authentication: registration, bearer tokens, revocation and login history"
    ),
    paths(
        health::health_check,
        health::readiness_check,
        auth::register_handler,
        auth::login_handler,
        auth::logout_handler,
        users::me_handler,
        admin::login_history_handler,
        admin::login_stats_handler,
    ),
    components(
        schemas(
            ApiError,
            UserRole,
            UserPublic,
            LoginEvent,
            LoginEventType,
            RegisterRequest,
            RegisterResponse,
            LoginRequest,
            TokenResponse,
            LogoutResponse,
            admin::LoginStatsResponse,
            health::HealthResponse,
            health::ReadinessResponse,
            health::ReadinessChecks,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "health", description = "Liveness and readiness checks"),
        (name = "auth", description = "Registration, login and logout"),
        (name = "users", description = "Current user profile"),
        (name = "admin", description = "Login history for administrators")
    )
)]
pub struct ApiDoc;

/// Registers the bearer token scheme referenced by `security(("bearer_auth" = []))`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some("Token obtained from /api/v1/auth/login"))
                        .build(),
                ),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_openapi_lists_auth_paths() {
        let doc = ApiDoc::openapi();

        assert!(doc.paths.paths.contains_key("/api/v1/auth/login"));
        assert!(doc.paths.paths.contains_key("/api/v1/auth/logout"));
        assert!(doc
            .paths
            .paths
            .contains_key("/api/v1/admin/login-history/user/{user_id}/stats"));

        let components = doc.components.unwrap();
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
