//! Security audit logging and client context
//!
//! Security events are emitted at INFO level on the "audit" tracing target
//! so they can be filtered and routed apart from application logs. They
//! complement, and do not replace, the persisted login history.
//!
//! [`ClientContext`] captures the caller's IP address and User-Agent once
//! per request for both the audit trail and the login history.

use axum::{
    async_trait,
    extract::{ConnectInfo, FromRequestParts},
    http::{request::Parts, HeaderMap},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::convert::Infallible;
use std::net::SocketAddr;
use tracing::info;
use uuid::Uuid;

/// Longest User-Agent kept, in characters
pub const MAX_USER_AGENT_LEN: usize = 500;

/// Forwarding headers consulted for the client address, in order
const CLIENT_IP_HEADERS: [&str; 3] = ["x-forwarded-for", "proxy-client-ip", "wl-proxy-client-ip"];

/// Security audit events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    LoginSuccess {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    LoginFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
        user_agent: Option<String>,
    },

    Logout {
        user_id: Uuid,
        email: String,
        ip_address: Option<String>,
    },

    RegistrationSuccess {
        user_id: Uuid,
        email: String,
        role: String,
        ip_address: Option<String>,
    },

    RegistrationFailure {
        email: String,
        reason: String,
        ip_address: Option<String>,
    },

    /// A presented bearer token did not yield an identity
    InvalidToken {
        ip_address: Option<String>,
        user_agent: Option<String>,
        reason: String,
    },

    AccessDenied {
        user_id: Option<Uuid>,
        email: Option<String>,
        resource: String,
        required_role: Option<String>,
        ip_address: Option<String>,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::RegistrationSuccess { .. } => "Registration successful",
            AuditEvent::RegistrationFailure { .. } => "Registration failed",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::AccessDenied { .. } => "Access denied",
        }
    }
}

/// Log a security audit event with structured fields
///
/// The whole event is attached as JSON in the `event` field; the most
/// useful keys are repeated as first-class fields for filtering.
pub fn audit_log(event: &AuditEvent) {
    let timestamp = Utc::now();
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    match event {
        AuditEvent::LoginSuccess {
            user_id,
            email,
            ip_address,
            ..
        }
        | AuditEvent::RegistrationSuccess {
            user_id,
            email,
            ip_address,
            ..
        }
        | AuditEvent::Logout {
            user_id,
            email,
            ip_address,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = %user_id,
                email = %email,
                ip_address = ?ip_address,
                "{}",
                event.summary()
            );
        }
        AuditEvent::LoginFailure {
            email,
            reason,
            ip_address,
            ..
        }
        | AuditEvent::RegistrationFailure {
            email,
            reason,
            ip_address,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                email = %email,
                reason = %reason,
                ip_address = ?ip_address,
                "{}",
                event.summary()
            );
        }
        AuditEvent::InvalidToken {
            ip_address, reason, ..
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                ip_address = ?ip_address,
                reason = %reason,
                "Invalid token"
            );
        }
        AuditEvent::AccessDenied {
            user_id,
            email,
            resource,
            required_role,
            ip_address,
        } => {
            info!(
                target: "audit",
                timestamp = %timestamp,
                event = %event_json,
                user_id = ?user_id,
                email = ?email,
                resource = %resource,
                required_role = ?required_role,
                ip_address = ?ip_address,
                "Access denied"
            );
        }
    }
}

/// Caller network context
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientContext {
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
}

impl ClientContext {
    /// Build from request headers plus the socket peer, when known
    pub fn from_parts(headers: &HeaderMap, remote_addr: Option<SocketAddr>) -> Self {
        Self {
            ip_address: extract_ip_address(headers)
                .or_else(|| remote_addr.map(|addr| addr.ip().to_string())),
            user_agent: extract_user_agent(headers),
        }
    }

    /// Build from a full request, reading the peer from `ConnectInfo` when present
    pub fn from_request<B>(request: &axum::http::Request<B>) -> Self {
        let remote_addr = request
            .extensions()
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Self::from_parts(request.headers(), remote_addr)
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for ClientContext
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let remote_addr = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);

        Ok(Self::from_parts(&parts.headers, remote_addr))
    }
}

/// Extract the client IP from forwarding headers
///
/// Checks X-Forwarded-For, Proxy-Client-IP and WL-Proxy-Client-IP in that
/// order, skipping values that are empty or "unknown". A comma-separated
/// chain yields its first element.
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    CLIENT_IP_HEADERS.iter().find_map(|name| {
        let value = headers.get(*name)?.to_str().ok()?.trim();
        if value.is_empty() || value.eq_ignore_ascii_case("unknown") {
            return None;
        }
        let first = value.split(',').next().unwrap_or(value).trim();
        (!first.is_empty()).then(|| first.to_string())
    })
}

/// Extract the User-Agent, truncated to [`MAX_USER_AGENT_LEN`] characters
pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(axum::http::header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.chars().take(MAX_USER_AGENT_LEN).collect())
}
