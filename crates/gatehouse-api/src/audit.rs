//! Security audit logging
//!
//! Session and account events are emitted at INFO level on the `audit`
//! target so they can be routed apart from application logs, e.g.
//! `RUST_LOG=info,audit=info`. Each record carries the event serialized as
//! JSON plus the client IP and user agent when the request exposed them.

use axum::http::{header, HeaderMap};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

/// Where a request came from, as far as the headers tell
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClientInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ClientInfo {
    pub fn from_headers(headers: &HeaderMap) -> Self {
        Self {
            ip_address: extract_ip_address(headers),
            user_agent: extract_user_agent(headers),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum AuditEvent {
    LoginSuccess {
        user_id: Uuid,
        email: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    LoginFailure {
        email: String,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    TokenRefresh {
        user_id: Uuid,
        username: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Logout always succeeds; `token_present` records whether a cookie came with it
    Logout {
        token_present: bool,
        #[serde(flatten)]
        client: ClientInfo,
    },

    /// Token rejected by the refresh, introspection or guard paths
    InvalidToken {
        path: String,
        reason: String,
        #[serde(flatten)]
        client: ClientInfo,
    },

    UserCreated {
        user_id: Uuid,
        actor: Option<Uuid>,
    },

    UserDeleted {
        user_id: Uuid,
        actor: Option<Uuid>,
    },
}

impl AuditEvent {
    fn summary(&self) -> &'static str {
        match self {
            AuditEvent::LoginSuccess { .. } => "Login successful",
            AuditEvent::LoginFailure { .. } => "Login failed",
            AuditEvent::TokenRefresh { .. } => "Token refresh",
            AuditEvent::Logout { .. } => "User logout",
            AuditEvent::InvalidToken { .. } => "Invalid token",
            AuditEvent::UserCreated { .. } => "User created",
            AuditEvent::UserDeleted { .. } => "User deleted",
        }
    }
}

/// Emit an audit event on the `audit` target
pub fn audit_log(event: &AuditEvent) {
    let event_json = serde_json::to_string(event)
        .unwrap_or_else(|e| format!("{{\"error\":\"Failed to serialize audit event: {e}\"}}"));

    info!(
        target: "audit",
        event = %event_json,
        "{}",
        event.summary()
    );
}

/// Client IP from `X-Forwarded-For` (first hop) or `X-Real-IP`
pub fn extract_ip_address(headers: &HeaderMap) -> Option<String> {
    if let Some(first_ip) = headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|ip| !ip.is_empty())
    {
        return Some(first_ip.to_string());
    }

    headers
        .get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}

pub fn extract_user_agent(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::USER_AGENT)
        .and_then(|ua| ua.to_str().ok())
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_audit_event_serialization() {
        let event = AuditEvent::LoginSuccess {
            user_id: Uuid::new_v4(),
            email: "test@example.com".to_string(),
            client: ClientInfo {
                ip_address: Some("192.168.1.1".to_string()),
                user_agent: None,
            },
        };

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"event_type\":\"login_success\""));
        assert!(json.contains("\"ip_address\":\"192.168.1.1\""));
        assert!(!json.contains("user_agent"));
    }

    #[test]
    fn test_audit_log_does_not_panic() {
        audit_log(&AuditEvent::LoginFailure {
            email: "test@example.com".to_string(),
            reason: "credentials does not matches our record".to_string(),
            client: ClientInfo::default(),
        });
        audit_log(&AuditEvent::Logout {
            token_present: false,
            client: ClientInfo::default(),
        });
    }

    #[test]
    fn test_extract_ip_from_x_forwarded_for() {
        let mut headers = HeaderMap::new();
        headers.insert(
            "x-forwarded-for",
            "203.0.113.1, 198.51.100.1".parse().unwrap(),
        );
        headers.insert("x-real-ip", "10.0.0.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_extract_ip_from_x_real_ip() {
        let mut headers = HeaderMap::new();
        headers.insert("x-real-ip", "203.0.113.1".parse().unwrap());

        assert_eq!(extract_ip_address(&headers), Some("203.0.113.1".to_string()));
    }

    #[test]
    fn test_client_info_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(header::USER_AGENT, "Mozilla/5.0 (Test)".parse().unwrap());

        let client = ClientInfo::from_headers(&headers);
        assert_eq!(client.ip_address, None);
        assert_eq!(client.user_agent.as_deref(), Some("Mozilla/5.0 (Test)"));

        assert_eq!(ClientInfo::from_headers(&HeaderMap::new()), ClientInfo::default());
    }
}
