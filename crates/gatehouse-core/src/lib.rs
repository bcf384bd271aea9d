//! Gatehouse Core - Domain models, errors, configuration and pagination
//!
//! This crate holds everything the HTTP layer builds on that is not tied to
//! a web framework:
//! - The `Principal` account record and its public view
//! - Common error types
//! - Configuration management
//! - The pagination, search and filter engine used by list endpoints

pub mod config;
pub mod pagination;

pub use config::{
    AppConfig, AuthConfig, ConfigError, DatabaseConfig, LoggingConfig, PaginationConfig,
    ServerConfig,
};
pub use pagination::{
    build_page_meta, page_in_range, search_terms, ListQuery, PageLinks, PageMeta, PageRequest,
    Searchable,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use uuid::Uuid;

// ============================================================================
// Error Types
// ============================================================================

/// Core error types for Gatehouse operations
#[derive(Error, Debug)]
pub enum GatehouseError {
    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, GatehouseError>;

// ============================================================================
// Principal
// ============================================================================

/// Default status assigned to newly created accounts
pub const DEFAULT_STATUS: i32 = 1;

/// A user account as stored by the persistence layer.
///
/// `id` is assigned once on creation and never changes. The password hash
/// is skipped during serialization; handlers return [`PrincipalView`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Principal {
    pub id: Uuid,
    pub username: String,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing, default)]
    pub password_hash: String,
    pub status: i32,
    pub email_verified_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Principal {
    /// Build a fresh principal with a new identifier and current timestamps
    pub fn new(
        username: impl Into<String>,
        name: impl Into<String>,
        email: impl Into<String>,
        password_hash: impl Into<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            username: username.into(),
            name: name.into(),
            email: email.into(),
            password_hash: password_hash.into(),
            status: DEFAULT_STATUS,
            email_verified_at: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Searchable for Principal {
    fn searchable_fields() -> &'static [&'static str] {
        &["username", "email"]
    }
}

/// Public representation of a principal, safe to return to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PrincipalView {
    pub id: Uuid,
    #[schema(example = "johndoe")]
    pub username: String,
    #[schema(example = "John Doe")]
    pub name: String,
    #[schema(example = "johndoe@example.com")]
    pub email: String,
    #[schema(example = 1)]
    pub status: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Principal> for PrincipalView {
    fn from(p: Principal) -> Self {
        Self {
            id: p.id,
            username: p.username,
            name: p.name,
            email: p.email,
            status: p.status,
            created_at: p.created_at,
            updated_at: p.updated_at,
        }
    }
}

/// Equality filters accepted by the user listing
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserFilters {
    pub status: Option<i32>,
}

impl UserFilters {
    /// Filters rendered as query parameters for navigation links
    pub fn to_query_pairs(&self) -> std::collections::BTreeMap<String, String> {
        let mut pairs = std::collections::BTreeMap::new();
        if let Some(status) = self.status {
            pairs.insert("status".to_string(), status.to_string());
        }
        pairs
    }
}
