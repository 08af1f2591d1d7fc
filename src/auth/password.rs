//! Password hashing with Argon2id.

use argon2::{
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use rand::rngs::OsRng;

#[derive(Debug, Clone)]
pub enum PasswordError {
    HashingFailed,
    InvalidPassword,
}

/// Hash a password using Argon2id with a fresh random salt.
pub fn hash_password(password: &str) -> Result<String, PasswordError> {
    let salt = SaltString::generate(&mut OsRng);

    let password_hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|_| PasswordError::HashingFailed)?
        .to_string();

    Ok(password_hash)
}

/// Verify a password against a stored hash. Constant-time inside argon2.
pub fn verify_password(password: &str, password_hash: &str) -> Result<(), PasswordError> {
    let parsed_hash =
        PasswordHash::new(password_hash).map_err(|_| PasswordError::InvalidPassword)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| PasswordError::InvalidPassword)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing() {
        let password = "my_secure_password_123";
        let hash = hash_password(password).unwrap();

        // Verify correct password
        assert!(verify_password(password, &hash).is_ok());

        // Verify wrong password
        assert!(verify_password("wrong_password", &hash).is_err());
    }

    #[test]
    fn test_salts_differ_between_hashes() {
        let first = hash_password("same_password").unwrap();
        let second = hash_password("same_password").unwrap();
        assert_ne!(first, second);
    }
}
