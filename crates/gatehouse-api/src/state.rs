//! Application state shared across handlers

use crate::auth::{
    JwtConfig, RevocationRegistry, SessionManager, SessionOptions, TokenCodec, UserRepository,
};
use gatehouse_core::config::AppConfig;
use std::sync::Arc;
use std::time::Instant;

pub struct AppState {
    /// Application configuration
    pub config: AppConfig,
    /// User persistence
    pub users: Arc<dyn UserRepository>,
    /// Login, refresh, introspection and logout
    pub sessions: SessionManager,
    /// Server start time
    pub start_time: Instant,
}

impl AppState {
    /// Wire the session manager to `users` and a fresh revocation registry.
    ///
    /// Expects a validated config; empty secrets would sign tokens with an
    /// empty key.
    pub fn new<R>(config: AppConfig, users: Arc<R>) -> Self
    where
        R: UserRepository + 'static,
    {
        let codec = TokenCodec::new(JwtConfig::from(&config.auth));
        let sessions = SessionManager::new(
            codec,
            Arc::new(RevocationRegistry::new()),
            users.clone(),
            SessionOptions {
                check_revocation_on_refresh: config.auth.check_revocation_on_refresh,
            },
        );

        Self {
            config,
            users,
            sessions,
            start_time: Instant::now(),
        }
    }

    /// Get uptime in seconds
    pub fn uptime_secs(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    pub fn registry(&self) -> &Arc<RevocationRegistry> {
        self.sessions.registry()
    }
}
