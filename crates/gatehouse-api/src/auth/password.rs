/// Password hashing and verification
///
/// New hashes use bcrypt with a configurable cost (14 in production).
/// Verification also accepts Argon2 PHC strings so accounts hashed by the
/// earlier Argon2 setup can still sign in.
use argon2::{
    password_hash::{PasswordHash, PasswordVerifier},
    Argon2,
};
use thiserror::Error;

/// Password hashing and verification errors
#[derive(Debug, Error)]
pub enum PasswordError {
    #[error("Failed to hash password: {0}")]
    HashingFailed(String),

    #[error("Failed to verify password: {0}")]
    VerificationFailed(String),

    #[error("Invalid password hash format")]
    InvalidHashFormat,
}

/// Hash a plaintext password with bcrypt
///
/// # Arguments
///
/// * `password` - The plaintext password to hash
/// * `cost` - bcrypt cost factor (4..=31)
///
/// # Returns
///
/// * `Ok(String)` - Modular crypt string (`$2b$<cost>$<salt+hash>`)
/// * `Err(PasswordError)` - If the cost is out of range
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    bcrypt::hash(password, cost).map_err(|e| PasswordError::HashingFailed(e.to_string()))
}

/// Verify a plaintext password against a stored hash
///
/// # Returns
///
/// * `Ok(true)` - Password matches
/// * `Ok(false)` - Password does not match
/// * `Err(PasswordError)` - The stored hash is malformed
///
/// # Example
///
/// ```no_run
/// use gatehouse_api::auth::password::{hash_password, verify_password};
///
/// let hash = hash_password("SecureP@ssw0rd!", 12).unwrap();
/// assert!(verify_password("SecureP@ssw0rd!", &hash).unwrap());
/// assert!(!verify_password("WrongPassword", &hash).unwrap());
/// ```
pub fn verify_password(password: &str, hash: &str) -> Result<bool, PasswordError> {
    if hash.starts_with("$argon2") {
        return verify_argon2(password, hash);
    }

    match bcrypt::verify(password, hash) {
        Ok(matches) => Ok(matches),
        Err(bcrypt::BcryptError::InvalidHash(_))
        | Err(bcrypt::BcryptError::InvalidPrefix(_))
        | Err(bcrypt::BcryptError::InvalidCost(_))
        | Err(bcrypt::BcryptError::InvalidBase64(_)) => Err(PasswordError::InvalidHashFormat),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

fn verify_argon2(password: &str, hash: &str) -> Result<bool, PasswordError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| PasswordError::InvalidHashFormat)?;
    // a PHC string without salt or output cannot hold a password
    if parsed_hash.salt.is_none() || parsed_hash.hash.is_none() {
        return Err(PasswordError::InvalidHashFormat);
    }

    match Argon2::default().verify_password(password.as_bytes(), &parsed_hash) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(PasswordError::VerificationFailed(e.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use argon2::password_hash::{rand_core::OsRng, PasswordHasher, SaltString};

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "SecureP@ssw0rd!";
        let hash = hash_password(password, TEST_COST).expect("Failed to hash password");

        assert!(hash.starts_with("$2"));
        assert!(verify_password(password, &hash).expect("Verification failed"));
        assert!(!verify_password("WrongPassword", &hash).expect("Verification failed"));
    }

    #[test]
    fn test_same_password_produces_different_hashes() {
        let password = "SamePassword123!";

        let hash1 = hash_password(password, TEST_COST).unwrap();
        let hash2 = hash_password(password, TEST_COST).unwrap();

        assert_ne!(hash1, hash2);
        assert!(verify_password(password, &hash1).unwrap());
        assert!(verify_password(password, &hash2).unwrap());
    }

    #[test]
    fn test_cost_is_encoded() {
        let hash = hash_password("password1", 5).unwrap();
        assert!(hash.contains("$05$"));
    }

    #[test]
    fn test_invalid_cost() {
        assert!(matches!(
            hash_password("password1", 2),
            Err(PasswordError::HashingFailed(_))
        ));
    }

    #[test]
    fn test_invalid_hash_format() {
        let result = verify_password("password", "invalid-hash-format");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));

        // parses as PHC, but carries no salt or output
        let result = verify_password("password", "$argon2id$garbage");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));

        let result = verify_password("password", "$argon2id$v=19$m=65536,t=3,p=4$c2FsdHNhbHQ");
        assert!(matches!(result, Err(PasswordError::InvalidHashFormat)));
    }

    #[test]
    fn test_legacy_argon2_hash() {
        let salt = SaltString::generate(&mut OsRng);
        let hash = Argon2::default()
            .hash_password(b"LegacyPass1!", &salt)
            .unwrap()
            .to_string();

        assert!(verify_password("LegacyPass1!", &hash).unwrap());
        assert!(!verify_password("legacypass1!", &hash).unwrap());
    }
}
