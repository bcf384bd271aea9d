/// In-memory token revocation registry
///
/// Holds raw token strings revoked by logout. Entries are never evicted and
/// do not survive a restart; a revoked token stays rejected for the life of
/// the process even after it would have expired on its own.
///
/// Shared by handle (`Arc<RevocationRegistry>`) between the session manager
/// and the guard middleware. Reads run concurrently, writes are exclusive.
use std::collections::HashSet;
use std::sync::{PoisonError, RwLock};

#[derive(Debug, Default)]
pub struct RevocationRegistry {
    tokens: RwLock<HashSet<String>>,
}

impl RevocationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark a token as revoked. Idempotent; the empty string is accepted.
    pub fn revoke(&self, token: &str) {
        let mut tokens = self
            .tokens
            .write()
            .unwrap_or_else(PoisonError::into_inner);
        tokens.insert(token.to_string());
    }

    /// Whether `token` was previously revoked
    pub fn is_revoked(&self, token: &str) -> bool {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(token)
    }

    /// Number of revoked tokens
    pub fn len(&self) -> usize {
        self.tokens
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_revoke_and_check() {
        let registry = RevocationRegistry::new();
        assert!(!registry.is_revoked("token-a"));

        registry.revoke("token-a");
        assert!(registry.is_revoked("token-a"));
        assert!(!registry.is_revoked("token-b"));
    }

    #[test]
    fn test_revoke_same_token_twice() {
        let registry = RevocationRegistry::new();
        registry.revoke("token-a");
        registry.revoke("token-a");

        assert!(registry.is_revoked("token-a"));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_empty_token() {
        let registry = RevocationRegistry::new();
        assert!(registry.is_empty());

        registry.revoke("");
        assert!(registry.is_revoked(""));
        assert!(!registry.is_empty());
    }

    #[test]
    fn test_concurrent_revocations_are_all_visible() {
        let registry = Arc::new(RevocationRegistry::new());

        let handles: Vec<_> = (0..8)
            .map(|worker| {
                let registry = Arc::clone(&registry);
                std::thread::spawn(move || {
                    for i in 0..100 {
                        let token = format!("token-{worker}-{i}");
                        registry.revoke(&token);
                        assert!(registry.is_revoked(&token));
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(registry.len(), 800);
        assert!(registry.is_revoked("token-7-99"));
    }
}
