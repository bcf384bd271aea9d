//! JWT token generation and validation
//!
//! Access and refresh tokens share one claim shape but are signed with two
//! independent HMAC secrets, so a token of one kind never validates as the
//! other. Secrets are handed to [`TokenCodec::new`] once at startup.

use chrono::Utc;
use gatehouse_core::{AuthConfig, Principal};
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// HMAC algorithms accepted when parsing. Anything else is rejected.
const HMAC_ALGORITHMS: [Algorithm; 3] = [Algorithm::HS256, Algorithm::HS384, Algorithm::HS512];

/// Which of the two token families a token belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenKind {
    Access,
    Refresh,
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Access => write!(f, "access"),
            Self::Refresh => write!(f, "refresh"),
        }
    }
}

/// Identity carried inside a token
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub username: String,
    pub name: String,
}

impl From<&Principal> for Identity {
    fn from(p: &Principal) -> Self {
        Self {
            id: p.id,
            username: p.username.clone(),
            name: p.name.clone(),
        }
    }
}

/// JWT claims
///
/// `username` and `name` default to empty strings when absent, `id` and
/// `exp` are mandatory. `kind` is checked when present; tokens minted
/// before it existed carry none. `jti` keeps two tokens minted in the same
/// second distinct, so revoking one never revokes the other.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenClaims {
    pub id: Uuid,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub name: String,
    /// Expiration timestamp (Unix epoch seconds)
    pub exp: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<TokenKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub jti: Option<String>,
}

impl TokenClaims {
    pub fn identity(&self) -> Identity {
        Identity {
            id: self.id,
            username: self.username.clone(),
            name: self.name.clone(),
        }
    }
}

/// JWT token generation and validation errors
#[derive(Debug, Error)]
pub enum JwtError {
    #[error("Failed to encode JWT: {0}")]
    EncodingError(#[from] jsonwebtoken::errors::Error),

    #[error("Invalid token format")]
    InvalidToken,

    #[error("Token has expired")]
    ExpiredToken,

    #[error("Invalid token signature")]
    InvalidSignature,

    #[error("Unexpected signing algorithm")]
    InvalidAlgorithm,

    #[error("Expected a {expected} token")]
    WrongKind { expected: TokenKind },
}

/// JWT Configuration
#[derive(Clone)]
pub struct JwtConfig {
    /// Secret for access tokens
    pub access_secret: String,
    /// Secret for refresh tokens
    pub refresh_secret: String,
    /// Access token lifetime in seconds (default: 900)
    pub access_ttl_secs: u64,
    /// Refresh token lifetime in seconds (default: 604800)
    pub refresh_ttl_secs: u64,
}

impl std::fmt::Debug for JwtConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .finish()
    }
}

impl From<&AuthConfig> for JwtConfig {
    fn from(config: &AuthConfig) -> Self {
        Self {
            access_secret: config.jwt_secret.clone(),
            refresh_secret: config.jwt_refresh_secret.clone(),
            access_ttl_secs: config.access_ttl_secs,
            refresh_ttl_secs: config.refresh_ttl_secs,
        }
    }
}

/// Issues and parses access and refresh tokens
#[derive(Clone)]
pub struct TokenCodec {
    access_encoding: EncodingKey,
    access_decoding: DecodingKey,
    refresh_encoding: EncodingKey,
    refresh_decoding: DecodingKey,
    access_ttl_secs: i64,
    refresh_ttl_secs: i64,
}

impl TokenCodec {
    pub fn new(config: JwtConfig) -> Self {
        Self {
            access_encoding: EncodingKey::from_secret(config.access_secret.as_bytes()),
            access_decoding: DecodingKey::from_secret(config.access_secret.as_bytes()),
            refresh_encoding: EncodingKey::from_secret(config.refresh_secret.as_bytes()),
            refresh_decoding: DecodingKey::from_secret(config.refresh_secret.as_bytes()),
            access_ttl_secs: config.access_ttl_secs as i64,
            refresh_ttl_secs: config.refresh_ttl_secs as i64,
        }
    }

    /// Lifetime of tokens of the given kind, in seconds
    pub fn ttl_secs(&self, kind: TokenKind) -> i64 {
        match kind {
            TokenKind::Access => self.access_ttl_secs,
            TokenKind::Refresh => self.refresh_ttl_secs,
        }
    }

    /// Mint a short-lived access token for a principal
    pub fn issue_access_token(&self, principal: &Principal) -> Result<String, JwtError> {
        self.issue(&Identity::from(principal), TokenKind::Access)
    }

    /// Mint a long-lived refresh token for a principal
    pub fn issue_refresh_token(&self, principal: &Principal) -> Result<String, JwtError> {
        self.issue(&Identity::from(principal), TokenKind::Refresh)
    }

    /// Mint a token of `kind` for an identity, starting now
    pub fn issue(&self, identity: &Identity, kind: TokenKind) -> Result<String, JwtError> {
        self.issue_at(identity, kind, Utc::now().timestamp())
    }

    /// Mint a token of `kind` as if issued at `issued_at` (Unix seconds)
    pub fn issue_at(
        &self,
        identity: &Identity,
        kind: TokenKind,
        issued_at: i64,
    ) -> Result<String, JwtError> {
        let claims = TokenClaims {
            id: identity.id,
            username: identity.username.clone(),
            name: identity.name.clone(),
            exp: issued_at + self.ttl_secs(kind),
            kind: Some(kind),
            jti: Some(Uuid::new_v4().to_string()),
        };

        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            self.encoding_key(kind),
        )?;

        Ok(token)
    }

    /// Validate a token of the expected kind against the current time
    ///
    /// # Returns
    ///
    /// * `Ok(TokenClaims)` - Decoded and validated claims
    /// * `Err(JwtError::ExpiredToken)` - The expiry instant has passed
    /// * `Err(_)` - Any other signature, algorithm or shape problem
    pub fn parse_and_validate(&self, token: &str, kind: TokenKind) -> Result<TokenClaims, JwtError> {
        self.decode_checked(token, kind, Utc::now().timestamp(), true)
    }

    /// Validate a token as of `now` (Unix seconds).
    ///
    /// The library's own clock check is disabled; only the explicit
    /// comparison against `now` decides expiry.
    pub fn parse_and_validate_at(
        &self,
        token: &str,
        kind: TokenKind,
        now: i64,
    ) -> Result<TokenClaims, JwtError> {
        self.decode_checked(token, kind, now, false)
    }

    fn decode_checked(
        &self,
        token: &str,
        kind: TokenKind,
        now: i64,
        library_exp_check: bool,
    ) -> Result<TokenClaims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.algorithms = HMAC_ALGORITHMS.to_vec();
        validation.leeway = 0;
        validation.validate_exp = library_exp_check;

        let token_data = decode::<TokenClaims>(token, self.decoding_key(kind), &validation)
            .map_err(|e| match e.kind() {
                jsonwebtoken::errors::ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                jsonwebtoken::errors::ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                jsonwebtoken::errors::ErrorKind::InvalidAlgorithm => JwtError::InvalidAlgorithm,
                _ => JwtError::InvalidToken,
            })?;

        let claims = token_data.claims;

        if now > claims.exp {
            return Err(JwtError::ExpiredToken);
        }

        if let Some(found) = claims.kind {
            if found != kind {
                return Err(JwtError::WrongKind { expected: kind });
            }
        }

        Ok(claims)
    }

    fn encoding_key(&self, kind: TokenKind) -> &EncodingKey {
        match kind {
            TokenKind::Access => &self.access_encoding,
            TokenKind::Refresh => &self.refresh_encoding,
        }
    }

    fn decoding_key(&self, kind: TokenKind) -> &DecodingKey {
        match kind {
            TokenKind::Access => &self.access_decoding,
            TokenKind::Refresh => &self.refresh_decoding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn test_config() -> JwtConfig {
        JwtConfig {
            access_secret: "access-secret-for-tests".to_string(),
            refresh_secret: "refresh-secret-for-tests".to_string(),
            access_ttl_secs: 900,
            refresh_ttl_secs: 604_800,
        }
    }

    fn principal() -> Principal {
        Principal::new("jdoe", "John Doe", "jdoe@example.com", "hash")
    }

    fn sign_raw(payload: serde_json::Value, secret: &str, alg: Algorithm) -> String {
        encode(
            &Header::new(alg),
            &payload,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_access_token_round_trip() {
        let codec = TokenCodec::new(test_config());
        let p = principal();

        let token = codec.issue_access_token(&p).expect("Failed to generate token");
        let claims = codec
            .parse_and_validate(&token, TokenKind::Access)
            .expect("Failed to validate token");

        assert_eq!(claims.id, p.id);
        assert_eq!(claims.username, "jdoe");
        assert_eq!(claims.name, "John Doe");
        assert_eq!(claims.kind, Some(TokenKind::Access));
        assert!(claims.jti.is_some());

        let now = Utc::now().timestamp();
        assert!(claims.exp > now && claims.exp <= now + 900);
    }

    #[test]
    fn test_tokens_minted_together_differ() {
        let codec = TokenCodec::new(test_config());
        let identity = Identity::from(&principal());

        let a = codec.issue_at(&identity, TokenKind::Access, 1_000).unwrap();
        let b = codec.issue_at(&identity, TokenKind::Access, 1_000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_refresh_token_lifetime() {
        let codec = TokenCodec::new(test_config());
        let p = principal();

        let token = codec
            .issue_at(&Identity::from(&p), TokenKind::Refresh, 1_000)
            .unwrap();
        let claims = codec
            .parse_and_validate_at(&token, TokenKind::Refresh, 1_000)
            .unwrap();

        assert_eq!(claims.exp, 1_000 + 7 * 24 * 60 * 60);
    }

    #[test]
    fn test_expiry_boundary() {
        let codec = TokenCodec::new(test_config());
        let identity = Identity::from(&principal());
        let issued = 1_700_000_000;

        let token = codec.issue_at(&identity, TokenKind::Access, issued).unwrap();
        let exp = issued + 900;

        assert!(codec
            .parse_and_validate_at(&token, TokenKind::Access, exp)
            .is_ok());
        assert!(matches!(
            codec.parse_and_validate_at(&token, TokenKind::Access, exp + 1),
            Err(JwtError::ExpiredToken)
        ));
    }

    #[test]
    fn test_expired_token_against_clock() {
        let codec = TokenCodec::new(test_config());
        let identity = Identity::from(&principal());
        let issued = Utc::now().timestamp() - 901;

        let token = codec.issue_at(&identity, TokenKind::Access, issued).unwrap();
        let result = codec.parse_and_validate(&token, TokenKind::Access);
        assert!(matches!(result, Err(JwtError::ExpiredToken)));
    }

    #[test]
    fn test_secret_domains_are_disjoint() {
        let codec = TokenCodec::new(test_config());
        let p = principal();

        let access = codec.issue_access_token(&p).unwrap();
        let refresh = codec.issue_refresh_token(&p).unwrap();

        assert!(matches!(
            codec.parse_and_validate(&access, TokenKind::Refresh),
            Err(JwtError::InvalidSignature)
        ));
        assert!(matches!(
            codec.parse_and_validate(&refresh, TokenKind::Access),
            Err(JwtError::InvalidSignature)
        ));
    }

    #[test]
    fn test_wrong_kind_with_shared_secret() {
        let mut config = test_config();
        config.refresh_secret = config.access_secret.clone();
        let codec = TokenCodec::new(config);

        let refresh = codec.issue_refresh_token(&principal()).unwrap();
        assert!(matches!(
            codec.parse_and_validate(&refresh, TokenKind::Access),
            Err(JwtError::WrongKind {
                expected: TokenKind::Access
            })
        ));
    }

    #[test]
    fn test_invalid_token() {
        let codec = TokenCodec::new(test_config());
        let result = codec.parse_and_validate("invalid.token.here", TokenKind::Access);
        assert!(matches!(result, Err(JwtError::InvalidToken)));

        let result = codec.parse_and_validate("", TokenKind::Refresh);
        assert!(result.is_err());
    }

    #[test]
    fn test_other_hmac_algorithms_accepted() {
        let codec = TokenCodec::new(test_config());
        let id = Uuid::new_v4();
        let exp = Utc::now().timestamp() + 60;

        let token = sign_raw(
            json!({ "id": id, "username": "u", "name": "n", "exp": exp }),
            "access-secret-for-tests",
            Algorithm::HS512,
        );

        let claims = codec.parse_and_validate(&token, TokenKind::Access).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.kind, None);
    }

    #[test]
    fn test_non_hmac_algorithm_rejected() {
        let codec = TokenCodec::new(test_config());
        let exp = Utc::now().timestamp() + 60;

        // Hand-built unsigned token claiming "none"
        let header = r#"{"alg":"none","typ":"JWT"}"#;
        let payload = json!({ "id": Uuid::new_v4(), "exp": exp }).to_string();
        let b64 = |s: &str| {
            use base64::Engine;
            base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(s)
        };
        let token = format!("{}.{}.", b64(header), b64(&payload));

        let result = codec.parse_and_validate(&token, TokenKind::Access);
        assert!(matches!(result, Err(JwtError::InvalidToken)));
    }

    #[test]
    fn test_missing_optional_claims_default_to_empty() {
        let codec = TokenCodec::new(test_config());
        let id = Uuid::new_v4();
        let exp = Utc::now().timestamp() + 60;

        let token = sign_raw(
            json!({ "id": id, "exp": exp }),
            "refresh-secret-for-tests",
            Algorithm::HS256,
        );

        let claims = codec.parse_and_validate(&token, TokenKind::Refresh).unwrap();
        assert_eq!(claims.id, id);
        assert_eq!(claims.username, "");
        assert_eq!(claims.name, "");
    }

    #[test]
    fn test_malformed_claims_rejected() {
        let codec = TokenCodec::new(test_config());
        let exp = Utc::now().timestamp() + 60;

        let no_id = sign_raw(json!({ "exp": exp }), "access-secret-for-tests", Algorithm::HS256);
        assert!(matches!(
            codec.parse_and_validate(&no_id, TokenKind::Access),
            Err(JwtError::InvalidToken)
        ));

        let bad_id = sign_raw(
            json!({ "id": "not-a-uuid", "exp": exp }),
            "access-secret-for-tests",
            Algorithm::HS256,
        );
        assert!(matches!(
            codec.parse_and_validate(&bad_id, TokenKind::Access),
            Err(JwtError::InvalidToken)
        ));

        let no_exp = sign_raw(
            json!({ "id": Uuid::new_v4() }),
            "access-secret-for-tests",
            Algorithm::HS256,
        );
        assert!(codec.parse_and_validate(&no_exp, TokenKind::Access).is_err());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let rendered = format!("{:?}", test_config());
        assert!(!rendered.contains("access-secret-for-tests"));
        assert!(rendered.contains("<redacted>"));
    }
}
