//! Authentication
//!
//! - Password verification (bcrypt, with Argon2 accepted for older hashes)
//! - Access/refresh token issuing and validation
//! - The in-memory revocation registry
//! - Session management and the cookie lifecycle
//! - The JWT guard middleware
//! - User persistence

pub mod cookies;
pub mod jwt;
pub mod middleware;
pub mod password;
pub mod repository;
pub mod revocation;
pub mod service;

pub use jwt::{Identity, JwtConfig, JwtError, TokenClaims, TokenCodec, TokenKind};
pub use middleware::{auth_middleware, AuthenticatedUser};
pub use password::{hash_password, verify_password, PasswordError};
pub use repository::{PgUserRepository, PrincipalStore, UserRepository};
pub use revocation::RevocationRegistry;
pub use service::{
    AuthError, LoginOutcome, LoginRequest, RefreshOutcome, SessionManager, SessionOptions,
};

#[cfg(any(test, feature = "test-utils"))]
pub use repository::InMemoryUserRepository;
