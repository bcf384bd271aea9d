//! Authentication API handlers
//!
//! Tokens travel in `HttpOnly` cookies; login additionally echoes the access
//! token in the body for clients that prefer a Bearer header.

use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::auth::cookies::{
    clear_auth_cookies, cookie_value, set_auth_cookies, ACCESS_COOKIE, REFRESH_COOKIE,
};
use crate::auth::middleware::introspection_token;
use crate::auth::{AuthError, Identity, LoginRequest};
use crate::error::AppError;
use crate::state::AppState;
use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use axum_extra::extract::{cookie::CookieJar, WithRejection};
use gatehouse_core::Principal;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

/// Account summary returned by login and `/me`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UserInfo {
    pub id: Uuid,
    #[schema(example = "johndoe")]
    pub username: String,
    #[schema(example = "John Doe")]
    pub name: String,
    pub email: String,
    pub status: i32,
    /// RFC 3339 timestamp, empty when unverified or unknown
    pub email_verified_at: String,
    pub roles: Vec<String>,
    pub permissions: Vec<String>,
}

impl From<&Principal> for UserInfo {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id,
            username: p.username.clone(),
            name: p.name.clone(),
            email: p.email.clone(),
            status: p.status,
            email_verified_at: p
                .email_verified_at
                .map(|t| t.to_rfc3339())
                .unwrap_or_default(),
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }
}

/// Built from token claims only; fields the token does not carry are zeroed
impl From<Identity> for UserInfo {
    fn from(identity: Identity) -> Self {
        Self {
            id: identity.id,
            username: identity.username,
            name: identity.name,
            email: String::new(),
            status: 0,
            email_verified_at: String::new(),
            roles: Vec::new(),
            permissions: Vec::new(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LoginResponse {
    pub status: u16,
    #[schema(example = "you are authenticated")]
    pub message: String,
    pub user: UserInfo,
    pub access_token: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MeResponse {
    pub status: u16,
    #[schema(example = "user info retrieved")]
    pub message: String,
    pub user: UserInfo,
}

/// Body-less acknowledgement
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub status: u16,
    pub message: String,
}

impl MessageResponse {
    fn ok(message: &str) -> Json<Self> {
        Json(Self {
            status: StatusCode::OK.as_u16(),
            message: message.to_string(),
        })
    }
}

/// Login with email and password
///
/// Sets `access_token` and `refresh_token` cookies. Wrong password and
/// unknown email produce the same 401.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login successful", body = LoginResponse),
        (status = 400, description = "Missing email or password", body = crate::error::ApiError),
        (status = 401, description = "Invalid credentials", body = crate::error::ApiError),
    )
)]
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
    WithRejection(Json(request), _): WithRejection<Json<LoginRequest>, AppError>,
) -> Result<impl IntoResponse, AppError> {
    request.validate()?;

    let client = ClientInfo::from_headers(&headers);
    let email = request.email.clone();

    let outcome = match state.sessions.login(request).await {
        Ok(outcome) => outcome,
        Err(e) => {
            audit_log(&AuditEvent::LoginFailure {
                email,
                reason: e.to_string(),
                client,
            });
            return Err(e.into());
        }
    };

    audit_log(&AuditEvent::LoginSuccess {
        user_id: outcome.principal.id,
        email,
        client,
    });

    let jar = set_auth_cookies(
        jar,
        outcome.access_token.clone(),
        outcome.refresh_token,
        &state.config.auth,
    );

    Ok((
        jar,
        Json(LoginResponse {
            status: StatusCode::OK.as_u16(),
            message: "you are authenticated".to_string(),
            user: UserInfo::from(&outcome.principal),
            access_token: outcome.access_token,
        }),
    ))
}

/// Refresh the access token
///
/// Reads the `refresh_token` cookie, mints a new access token and re-sets
/// both cookies. The refresh token itself is not rotated.
#[utoipa::path(
    post,
    path = "/api/v1/auth/refresh",
    tag = "auth",
    responses(
        (status = 200, description = "Access token refreshed", body = MessageResponse),
        (status = 401, description = "Missing, invalid, expired or revoked refresh token", body = crate::error::ApiError),
    )
)]
pub async fn refresh_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let presented = cookie_value(&jar, REFRESH_COOKIE);
    let client = ClientInfo::from_headers(&headers);

    let outcome = match state.sessions.refresh(presented.as_deref()) {
        Ok(outcome) => outcome,
        Err(e) => {
            if !matches!(e, AuthError::MissingRefreshToken) {
                audit_log(&AuditEvent::InvalidToken {
                    path: "/api/v1/auth/refresh".to_string(),
                    reason: e.to_string(),
                    client,
                });
            }
            return Err(e.into());
        }
    };

    audit_log(&AuditEvent::TokenRefresh {
        user_id: outcome.identity.id,
        username: outcome.identity.username.clone(),
        client,
    });

    let jar = set_auth_cookies(
        jar,
        outcome.access_token,
        outcome.refresh_token,
        &state.config.auth,
    );

    Ok((jar, MessageResponse::ok("Access token refreshed")))
}

/// Identity of the current access token
///
/// Reads the `access_token` cookie, falling back to `Authorization: Bearer`.
/// Only fields carried by the token are filled in.
#[utoipa::path(
    get,
    path = "/api/v1/auth/me",
    tag = "auth",
    responses(
        (status = 200, description = "User info retrieved", body = MeResponse),
        (status = 401, description = "Missing or invalid access token", body = crate::error::ApiError),
    ),
    security(
        ("cookie_auth" = []),
        ("bearer_auth" = [])
    )
)]
pub async fn me_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> Result<impl IntoResponse, AppError> {
    let token = introspection_token(&jar, &headers);
    let identity = state.sessions.introspect(token.as_deref())?;

    Ok(Json(MeResponse {
        status: StatusCode::OK.as_u16(),
        message: "user info retrieved".to_string(),
        user: UserInfo::from(identity),
    }))
}

/// Logout
///
/// Revokes the presented refresh token (an absent one is recorded as empty)
/// and the access cookie when present, then expires both cookies. Always
/// succeeds.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
    )
)]
pub async fn logout_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    jar: CookieJar,
) -> impl IntoResponse {
    let refresh = cookie_value(&jar, REFRESH_COOKIE);
    let access = cookie_value(&jar, ACCESS_COOKIE).filter(|t| !t.is_empty());

    state.sessions.logout(refresh.as_deref());
    if let Some(access) = access.as_deref() {
        state.sessions.logout(Some(access));
    }

    audit_log(&AuditEvent::Logout {
        token_present: refresh.as_deref().is_some_and(|t| !t.is_empty()),
        client: ClientInfo::from_headers(&headers),
    });

    let jar = clear_auth_cookies(jar, &state.config.auth);
    (jar, MessageResponse::ok("successfully logged out"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_user_info_from_identity_zeroes_the_rest() {
        let id = Uuid::new_v4();
        let info = UserInfo::from(Identity {
            id,
            username: "jdoe".to_string(),
            name: "John".to_string(),
        });

        assert_eq!(info.id, id);
        assert_eq!(info.email, "");
        assert_eq!(info.status, 0);
        assert_eq!(info.email_verified_at, "");
        assert!(info.roles.is_empty() && info.permissions.is_empty());
    }

    #[test]
    fn test_user_info_from_principal() {
        let mut principal = Principal::new("jdoe", "John", "jdoe@example.com", "hash");
        let info = UserInfo::from(&principal);
        assert_eq!(info.email, "jdoe@example.com");
        assert_eq!(info.status, 1);
        assert_eq!(info.email_verified_at, "");

        principal.email_verified_at = Some(chrono::Utc::now());
        assert!(!UserInfo::from(&principal).email_verified_at.is_empty());

        let json = serde_json::to_string(&UserInfo::from(&principal)).unwrap();
        assert!(!json.contains("hash"));
    }
}
