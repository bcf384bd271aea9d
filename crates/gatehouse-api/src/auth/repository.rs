//! User persistence
//!
//! [`PrincipalStore`] is the narrow lookup the session manager needs;
//! [`UserRepository`] adds the CRUD operations behind `/api/v1/users`.
//! `PgUserRepository` is the PostgreSQL implementation. Tests run against
//! `InMemoryUserRepository` (enabled by the `test-utils` feature).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gatehouse_core::{GatehouseError, ListQuery, Principal, Result, UserFilters};
use sqlx::{PgPool, Postgres, QueryBuilder};
use uuid::Uuid;

/// Lookup of principals by login email
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Returns `GatehouseError::NotFound` when no account has this email
    async fn find_by_email(&self, email: &str) -> Result<Principal>;
}

/// Full user CRUD
#[async_trait]
pub trait UserRepository: PrincipalStore {
    /// Insert a new principal. Duplicate username or email is a `Conflict`.
    async fn create(&self, principal: Principal) -> Result<Principal>;

    /// One page of matching principals plus the total match count
    async fn find_all(&self, query: &ListQuery<UserFilters>) -> Result<(Vec<Principal>, u64)>;

    async fn find_by_id(&self, id: Uuid) -> Result<Principal>;

    /// Overwrite mutable fields of an existing principal
    async fn update(&self, principal: Principal) -> Result<Principal>;

    async fn delete(&self, id: Uuid) -> Result<()>;
}

const USER_COLUMNS: &str =
    "id, username, name, email, password_hash, status, email_verified_at, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct UserRecord {
    id: Uuid,
    username: String,
    name: String,
    email: String,
    password_hash: String,
    status: i32,
    email_verified_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<UserRecord> for Principal {
    fn from(r: UserRecord) -> Self {
        Self {
            id: r.id,
            username: r.username,
            name: r.name,
            email: r.email,
            password_hash: r.password_hash,
            status: r.status,
            email_verified_at: r.email_verified_at,
            created_at: r.created_at,
            updated_at: r.updated_at,
        }
    }
}

fn map_db_error(err: sqlx::Error) -> GatehouseError {
    match &err {
        sqlx::Error::RowNotFound => GatehouseError::NotFound("User".to_string()),
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            GatehouseError::Conflict("username or email already taken".to_string())
        }
        _ => GatehouseError::Database(err.to_string()),
    }
}

/// Append the search and filter predicates shared by the page and count queries
fn push_conditions(builder: &mut QueryBuilder<'_, Postgres>, query: &ListQuery<UserFilters>) {
    builder.push(" WHERE 1 = 1");

    if !query.terms.is_empty() && !query.fields.is_empty() {
        builder.push(" AND (");
        let mut first = true;
        for term in &query.terms {
            for field in query.fields {
                if !first {
                    builder.push(" OR ");
                }
                first = false;
                // field names come from Searchable, never from the request
                builder.push(format!("LOWER({field}) LIKE LOWER("));
                builder.push_bind(format!("%{term}%"));
                builder.push(")");
            }
        }
        builder.push(")");
    }

    if let Some(status) = query.filters.status {
        builder.push(" AND status = ");
        builder.push_bind(status);
    }
}

/// PostgreSQL-backed user repository
#[derive(Clone)]
pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PrincipalStore for PgUserRepository {
    async fn find_by_email(&self, email: &str) -> Result<Principal> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map(Principal::from)
            .map_err(map_db_error)
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn create(&self, principal: Principal) -> Result<Principal> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(principal.id)
            .bind(&principal.username)
            .bind(&principal.name)
            .bind(&principal.email)
            .bind(&principal.password_hash)
            .bind(principal.status)
            .bind(principal.email_verified_at)
            .bind(principal.created_at)
            .bind(principal.updated_at)
            .fetch_one(&self.pool)
            .await
            .map(Principal::from)
            .map_err(map_db_error)
    }

    async fn find_all(&self, query: &ListQuery<UserFilters>) -> Result<(Vec<Principal>, u64)> {
        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users");
        push_conditions(&mut count, query);
        let total: i64 = count
            .build_query_scalar()
            .fetch_one(&self.pool)
            .await
            .map_err(map_db_error)?;

        let mut select = QueryBuilder::<Postgres>::new(format!("SELECT {USER_COLUMNS} FROM users"));
        push_conditions(&mut select, query);
        select.push(" ORDER BY created_at ASC, seq ASC LIMIT ");
        select.push_bind(i64::from(query.page.page_size()));
        select.push(" OFFSET ");
        select.push_bind(query.page.offset() as i64);

        let rows: Vec<UserRecord> = select
            .build_query_as()
            .fetch_all(&self.pool)
            .await
            .map_err(map_db_error)?;

        Ok((
            rows.into_iter().map(Principal::from).collect(),
            total.max(0) as u64,
        ))
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Principal> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(id)
            .fetch_one(&self.pool)
            .await
            .map(Principal::from)
            .map_err(map_db_error)
    }

    async fn update(&self, principal: Principal) -> Result<Principal> {
        let sql = format!(
            "UPDATE users SET username = $2, name = $3, email = $4, password_hash = $5, \
             updated_at = $6 WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, UserRecord>(&sql)
            .bind(principal.id)
            .bind(&principal.username)
            .bind(&principal.name)
            .bind(&principal.email)
            .bind(&principal.password_hash)
            .bind(principal.updated_at)
            .fetch_one(&self.pool)
            .await
            .map(Principal::from)
            .map_err(map_db_error)
    }

    async fn delete(&self, id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(map_db_error)?;

        if result.rows_affected() == 0 {
            return Err(GatehouseError::NotFound("User".to_string()));
        }
        Ok(())
    }
}

#[cfg(any(test, feature = "test-utils"))]
pub use memory::InMemoryUserRepository;

#[cfg(any(test, feature = "test-utils"))]
mod memory {
    use super::*;
    use std::sync::{PoisonError, RwLock};

    /// Vec-backed repository that mirrors the PostgreSQL semantics
    #[derive(Debug, Default)]
    pub struct InMemoryUserRepository {
        users: RwLock<Vec<Principal>>,
    }

    impl InMemoryUserRepository {
        pub fn new() -> Self {
            Self::default()
        }

        fn field<'a>(p: &'a Principal, name: &str) -> &'a str {
            match name {
                "username" => &p.username,
                "email" => &p.email,
                "name" => &p.name,
                _ => "",
            }
        }

        fn matches(p: &Principal, query: &ListQuery<UserFilters>) -> bool {
            let searched = query.terms.is_empty()
                || query.terms.iter().any(|term| {
                    let term = term.to_lowercase();
                    query
                        .fields
                        .iter()
                        .any(|f| Self::field(p, f).to_lowercase().contains(&term))
                });
            let filtered = query.filters.status.map_or(true, |s| p.status == s);
            searched && filtered
        }

        fn check_unique(users: &[Principal], candidate: &Principal) -> Result<()> {
            let taken = users.iter().any(|u| {
                u.id != candidate.id
                    && (u.username == candidate.username || u.email == candidate.email)
            });
            if taken {
                return Err(GatehouseError::Conflict(
                    "username or email already taken".to_string(),
                ));
            }
            Ok(())
        }
    }

    #[async_trait]
    impl PrincipalStore for InMemoryUserRepository {
        async fn find_by_email(&self, email: &str) -> Result<Principal> {
            self.users
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|u| u.email == email)
                .cloned()
                .ok_or_else(|| GatehouseError::NotFound("User".to_string()))
        }
    }

    #[async_trait]
    impl UserRepository for InMemoryUserRepository {
        async fn create(&self, principal: Principal) -> Result<Principal> {
            let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
            Self::check_unique(&users, &principal)?;
            users.push(principal.clone());
            Ok(principal)
        }

        async fn find_all(
            &self,
            query: &ListQuery<UserFilters>,
        ) -> Result<(Vec<Principal>, u64)> {
            let users = self.users.read().unwrap_or_else(PoisonError::into_inner);
            let mut matched: Vec<&Principal> =
                users.iter().filter(|u| Self::matches(u, query)).collect();
            // stable: equal timestamps keep insertion order
            matched.sort_by_key(|u| u.created_at);

            let total = matched.len() as u64;
            let page = matched
                .into_iter()
                .skip(query.page.offset() as usize)
                .take(query.page.page_size() as usize)
                .cloned()
                .collect();
            Ok((page, total))
        }

        async fn find_by_id(&self, id: Uuid) -> Result<Principal> {
            self.users
                .read()
                .unwrap_or_else(PoisonError::into_inner)
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or_else(|| GatehouseError::NotFound("User".to_string()))
        }

        async fn update(&self, principal: Principal) -> Result<Principal> {
            let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
            Self::check_unique(&users, &principal)?;
            let slot = users
                .iter_mut()
                .find(|u| u.id == principal.id)
                .ok_or_else(|| GatehouseError::NotFound("User".to_string()))?;
            *slot = principal.clone();
            Ok(principal)
        }

        async fn delete(&self, id: Uuid) -> Result<()> {
            let mut users = self.users.write().unwrap_or_else(PoisonError::into_inner);
            let before = users.len();
            users.retain(|u| u.id != id);
            if users.len() == before {
                return Err(GatehouseError::NotFound("User".to_string()));
            }
            Ok(())
        }
    }
}
