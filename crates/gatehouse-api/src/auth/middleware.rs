/// JWT guard for protected routes
///
/// Reads the access token from the `access_token` cookie only; a Bearer
/// header is not a credential here. On success the caller's identity is
/// added to request extensions as [`AuthenticatedUser`].
use super::cookies::{cookie_value, ACCESS_COOKIE};
use super::jwt::Identity;
use super::service::AuthError;
use crate::audit::{audit_log, AuditEvent, ClientInfo};
use crate::state::AppState;
use axum::{
    extract::{Request, State},
    http::{header, HeaderMap},
    middleware::Next,
    response::Response,
};
use axum_extra::extract::cookie::CookieJar;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;

/// Caller identity placed in request extensions by [`auth_middleware`]
///
/// ```ignore
/// async fn handler(Extension(user): Extension<AuthenticatedUser>) -> String {
///     format!("Hello, {}!", user.name)
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub username: String,
    pub name: String,
}

impl From<Identity> for AuthenticatedUser {
    fn from(identity: Identity) -> Self {
        Self {
            user_id: identity.id,
            username: identity.username,
            name: identity.name,
        }
    }
}

/// Token from an `Authorization: Bearer <token>` header
pub fn bearer_token(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
}

/// Access token for introspection: the cookie, else the Bearer header
pub fn introspection_token(jar: &CookieJar, headers: &HeaderMap) -> Option<String> {
    cookie_value(jar, ACCESS_COOKIE)
        .filter(|t| !t.is_empty())
        .or_else(|| bearer_token(headers))
}

/// Reject requests without a valid, unrevoked access token
///
/// ```ignore
/// let users = Router::new()
///     .route("/users", get(list_users))
///     .route_layer(middleware::from_fn_with_state(state.clone(), auth_middleware));
/// ```
pub async fn auth_middleware(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let token = cookie_value(&jar, ACCESS_COOKIE);

    let identity = match state.sessions.authorize(token.as_deref()) {
        Ok(identity) => identity,
        Err(e) => {
            audit_log(&AuditEvent::InvalidToken {
                path: request.uri().path().to_string(),
                reason: e.to_string(),
                client: ClientInfo::from_headers(request.headers()),
            });
            return Err(e);
        }
    };

    request
        .extensions_mut()
        .insert(AuthenticatedUser::from(identity));

    Ok(next.run(request).await)
}
