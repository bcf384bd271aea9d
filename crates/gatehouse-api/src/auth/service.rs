//! Session management
//!
//! Login, refresh, introspection and logout built from the token codec, the
//! revocation registry and a principal store. Nothing here touches HTTP;
//! handlers move tokens in and out of cookies.

use super::jwt::{Identity, JwtError, TokenCodec, TokenKind};
use super::password::verify_password;
use super::repository::PrincipalStore;
use super::revocation::RevocationRegistry;
use gatehouse_core::{GatehouseError, Principal};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use thiserror::Error;
use utoipa::ToSchema;
use validator::Validate;

/// Authentication errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("credentials does not matches our record")]
    InvalidCredentials,

    #[error("refresh token required")]
    MissingRefreshToken,

    #[error("access token required")]
    MissingAccessToken,

    #[error("no token provided")]
    NoTokenProvided,

    #[error("invalid {0} token")]
    InvalidToken(TokenKind),

    #[error("{0} token has expired")]
    ExpiredToken(TokenKind),

    #[error("token has been revoked")]
    RevokedToken,

    #[error("invalid token claims")]
    InvalidClaims,

    #[error("{0}")]
    Internal(String),
}

impl AuthError {
    fn from_jwt(err: JwtError, kind: TokenKind) -> Self {
        match err {
            JwtError::ExpiredToken => AuthError::ExpiredToken(kind),
            JwtError::EncodingError(e) => AuthError::Internal(format!("Failed to sign token: {e}")),
            _ => AuthError::InvalidToken(kind),
        }
    }
}

/// Login credentials
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct LoginRequest {
    #[validate(length(min = 1, message = "email is required"))]
    #[schema(example = "johndoe@example.com")]
    pub email: String,
    #[validate(length(min = 1, message = "password is required"))]
    #[schema(example = "secret123")]
    pub password: String,
}

/// Result of a successful login
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub principal: Principal,
    pub access_token: String,
    pub refresh_token: String,
}

/// Result of a successful refresh. `refresh_token` is the presented token.
#[derive(Debug, Clone)]
pub struct RefreshOutcome {
    pub identity: Identity,
    pub access_token: String,
    pub refresh_token: String,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionOptions {
    /// Reject refresh tokens present in the revocation registry
    pub check_revocation_on_refresh: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        Self {
            check_revocation_on_refresh: true,
        }
    }
}

/// Issues, renews, inspects and revokes sessions
#[derive(Clone)]
pub struct SessionManager {
    codec: TokenCodec,
    registry: Arc<RevocationRegistry>,
    principals: Arc<dyn PrincipalStore>,
    options: SessionOptions,
}

impl SessionManager {
    pub fn new(
        codec: TokenCodec,
        registry: Arc<RevocationRegistry>,
        principals: Arc<dyn PrincipalStore>,
        options: SessionOptions,
    ) -> Self {
        Self {
            codec,
            registry,
            principals,
            options,
        }
    }

    pub fn codec(&self) -> &TokenCodec {
        &self.codec
    }

    pub fn registry(&self) -> &Arc<RevocationRegistry> {
        &self.registry
    }

    /// Verify credentials and mint an access/refresh pair.
    ///
    /// Unknown email and wrong password are indistinguishable to the caller.
    /// The email is matched the way accounts store it: trimmed, lower-case.
    pub async fn login(&self, request: LoginRequest) -> Result<LoginOutcome, AuthError> {
        let email = request.email.trim().to_lowercase();
        let principal = match self.principals.find_by_email(&email).await {
            Ok(p) => p,
            Err(GatehouseError::NotFound(_)) => return Err(AuthError::InvalidCredentials),
            Err(e) => return Err(AuthError::Internal(e.to_string())),
        };

        let password = request.password;
        let hash = principal.password_hash.clone();
        let verified = tokio::task::spawn_blocking(move || verify_password(&password, &hash))
            .await
            .map_err(|e| AuthError::Internal(format!("Password check aborted: {e}")))?;

        match verified {
            Ok(true) => {}
            Ok(false) => return Err(AuthError::InvalidCredentials),
            Err(e) => {
                tracing::warn!(user_id = %principal.id, error = %e, "stored password hash unusable");
                return Err(AuthError::InvalidCredentials);
            }
        }

        let access_token = self
            .codec
            .issue_access_token(&principal)
            .map_err(|e| AuthError::from_jwt(e, TokenKind::Access))?;
        let refresh_token = self
            .codec
            .issue_refresh_token(&principal)
            .map_err(|e| AuthError::from_jwt(e, TokenKind::Refresh))?;

        Ok(LoginOutcome {
            principal,
            access_token,
            refresh_token,
        })
    }

    /// Mint a new access token from a valid refresh token
    pub fn refresh(&self, refresh_token: Option<&str>) -> Result<RefreshOutcome, AuthError> {
        let token = refresh_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingRefreshToken)?;

        let claims = self
            .codec
            .parse_and_validate(token, TokenKind::Refresh)
            .map_err(|e| AuthError::from_jwt(e, TokenKind::Refresh))?;

        if self.options.check_revocation_on_refresh && self.registry.is_revoked(token) {
            return Err(AuthError::RevokedToken);
        }

        let identity = claims.identity();
        let access_token = self
            .codec
            .issue(&identity, TokenKind::Access)
            .map_err(|e| AuthError::from_jwt(e, TokenKind::Access))?;

        Ok(RefreshOutcome {
            identity,
            access_token,
            refresh_token: token.to_string(),
        })
    }

    /// Identity carried by an access token. Only token contents are used;
    /// a token revoked at logout is refused.
    pub fn introspect(&self, access_token: Option<&str>) -> Result<Identity, AuthError> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::MissingAccessToken)?;

        let claims = self
            .codec
            .parse_and_validate(token, TokenKind::Access)
            .map_err(|e| AuthError::from_jwt(e, TokenKind::Access))?;

        if self.registry.is_revoked(token) {
            return Err(AuthError::RevokedToken);
        }

        Ok(claims.identity())
    }

    /// Revoke a token. Always succeeds; an absent token is recorded as "".
    pub fn logout(&self, token: Option<&str>) {
        self.registry.revoke(token.unwrap_or_default());
    }

    /// Validate an access token for a protected route
    pub fn authorize(&self, access_token: Option<&str>) -> Result<Identity, AuthError> {
        let token = access_token
            .filter(|t| !t.is_empty())
            .ok_or(AuthError::NoTokenProvided)?;

        let claims = self
            .codec
            .parse_and_validate(token, TokenKind::Access)
            .map_err(|e| AuthError::from_jwt(e, TokenKind::Access))?;

        if self.registry.is_revoked(token) {
            return Err(AuthError::RevokedToken);
        }

        if claims.id.is_nil() || claims.username.is_empty() {
            return Err(AuthError::InvalidClaims);
        }

        Ok(claims.identity())
    }
}
