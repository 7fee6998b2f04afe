//! Per-request authentication
//!
//! [`auth_middleware`] runs on every route. When the request carries a
//! valid, unrevoked bearer token whose subject still exists and is active,
//! it attaches an [`AuthenticatedUser`] to the request extensions. It never
//! rejects: routes that need an identity extract `AuthenticatedUser` and get
//! a 401 when none was attached.

use super::error::AuthError;
use super::jwt::TokenCodec;
use super::models::UserRole;
use super::repository::UserRepository;
use super::revocation::RevocationLedger;
use crate::audit::{audit_log, AuditEvent, ClientContext};
use axum::{
    async_trait,
    body::Body,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, error};
use uuid::Uuid;

const BEARER_PREFIX: &str = "Bearer ";

/// Identity attached to a request after authentication
///
/// Built from the freshly loaded user record, so role and email reflect the
/// store rather than the token claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: String,
    pub role: UserRole,
}

impl AuthenticatedUser {
    pub fn has_role(&self, role: UserRole) -> bool {
        self.role == role
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for AuthenticatedUser
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or(AuthError::Unauthenticated)
    }
}

/// Raw token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix(BEARER_PREFIX)
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

/// Resolves bearer tokens to identities
pub struct Authenticator {
    codec: Arc<TokenCodec>,
    ledger: Arc<RevocationLedger>,
    users: Arc<dyn UserRepository>,
}

impl Authenticator {
    pub fn new(
        codec: Arc<TokenCodec>,
        ledger: Arc<RevocationLedger>,
        users: Arc<dyn UserRepository>,
    ) -> Self {
        Self {
            codec,
            ledger,
            users,
        }
    }

    /// Resolve a raw token to an identity
    ///
    /// Checks run in order: signature and expiry, revocation, then the
    /// user record, which must exist and be active.
    pub async fn authenticate(&self, token: &str) -> Result<AuthenticatedUser, AuthError> {
        let claims = self.codec.verify(token, Utc::now())?;

        if self.ledger.is_revoked(token).await? {
            return Err(AuthError::RevokedTokenUsed);
        }

        let user = self
            .users
            .find_by_id(claims.subject_id)
            .await?
            .ok_or(AuthError::Unauthenticated)?;

        if !user.is_active {
            return Err(AuthError::AccountDeactivated);
        }

        Ok(AuthenticatedUser {
            user_id: user.id,
            email: user.email,
            role: user.role,
        })
    }
}

/// Attach an identity when the bearer token resolves to one
pub async fn auth_middleware(
    State(authenticator): State<Arc<Authenticator>>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let Some(token) = bearer_token(request.headers()).map(str::to_string) else {
        return next.run(request).await;
    };

    match authenticator.authenticate(&token).await {
        Ok(user) => {
            request.extensions_mut().insert(user);
        }
        Err(AuthError::Repository(e)) => {
            error!(error = %e, "Identity lookup failed; continuing unauthenticated");
        }
        Err(e) => {
            debug!(reason = %e, "Bearer token rejected");
            let client = ClientContext::from_request(&request);
            audit_log(&AuditEvent::InvalidToken {
                ip_address: client.ip_address,
                user_agent: client.user_agent,
                reason: e.to_string(),
            });
        }
    }

    next.run(request).await
}

/// Type alias for role middleware future
type RoleMiddlewareFuture =
    std::pin::Pin<Box<dyn std::future::Future<Output = Result<Response, AuthError>> + Send>>;

/// Middleware factory for role-based access control
///
/// Requests without an identity get 401; identities holding a different
/// role get 403.
///
/// ```ignore
/// let admin = Router::new()
///     .route("/stats", get(stats_handler))
///     .route_layer(middleware::from_fn(require_role(UserRole::Admin)));
/// ```
pub fn require_role(
    required_role: UserRole,
) -> impl Fn(Request<Body>, Next) -> RoleMiddlewareFuture + Clone {
    move |request: Request<Body>, next: Next| {
        Box::pin(async move {
            let user = request
                .extensions()
                .get::<AuthenticatedUser>()
                .ok_or(AuthError::Unauthenticated)?
                .clone();

            if !user.has_role(required_role) {
                let client = ClientContext::from_request(&request);
                audit_log(&AuditEvent::AccessDenied {
                    user_id: Some(user.user_id),
                    email: Some(user.email.clone()),
                    resource: request.uri().path().to_string(),
                    required_role: Some(required_role.to_string()),
                    ip_address: client.ip_address,
                });

                return Err(AuthError::InsufficientPermissions);
            }

            Ok(next.run(request).await)
        })
    }
}
