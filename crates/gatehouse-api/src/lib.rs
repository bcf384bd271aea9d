//! Gatehouse API - REST server
//!
//! User accounts behind cookie-based JWT sessions: login, refresh,
//! introspection and logout under `/api/v1/auth`, user CRUD with paginated
//! search under `/api/v1/users`.

pub mod audit;
pub mod auth;
pub mod error;
pub mod handlers;
pub mod openapi;
pub mod routes;
pub mod state;

pub use routes::create_router;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing {
    //! Router and state wired to the in-memory repository

    use crate::auth::{hash_password, InMemoryUserRepository, UserRepository};
    use crate::routes::create_router;
    use crate::state::AppState;
    use axum::Router;
    use gatehouse_core::{AppConfig, Principal};
    use std::sync::Arc;

    /// Lowest bcrypt cost, keeps hashing out of test timings
    pub const TEST_BCRYPT_COST: u32 = 4;

    /// Valid configuration with fixed secrets and a cheap hash cost
    pub fn test_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.auth.jwt_secret = "test-access-secret".to_string();
        config.auth.jwt_refresh_secret = "test-refresh-secret".to_string();
        config.auth.bcrypt_cost = TEST_BCRYPT_COST;
        config
    }

    /// Router plus handles on its state and repository
    pub fn test_app(config: AppConfig) -> (Router, Arc<AppState>, Arc<InMemoryUserRepository>) {
        let repo = Arc::new(InMemoryUserRepository::new());
        let state = Arc::new(AppState::new(config, repo.clone()));
        (create_router(state.clone()), state, repo)
    }

    /// Insert a user whose password is `password`
    pub async fn seed_user(
        repo: &InMemoryUserRepository,
        username: &str,
        email: &str,
        password: &str,
    ) -> Principal {
        let hash = hash_password(password, TEST_BCRYPT_COST).expect("hash test password");
        let principal = Principal::new(username, username, email, hash);
        repo.create(principal).await.expect("seed user")
    }
}

/// Router over an empty in-memory repository with test configuration
#[cfg(any(test, feature = "test-utils"))]
pub fn create_router_for_testing() -> axum::Router {
    testing::test_app(testing::test_config()).0
}
