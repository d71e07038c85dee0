use constant_time_eq::constant_time_eq;
use sha2::{Digest, Sha256};

use crate::errors::AuthError;

const MIN_NEW_PASSWORD_LEN: usize = 6;

/// bcrypt wrapper. Hashing is CPU-bound, so both directions run on the
/// blocking pool instead of the request worker.
#[derive(Debug, Clone, Copy)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn cost(&self) -> u32 {
        self.cost
    }

    pub async fn hash(&self, plaintext: &str) -> Result<String, AuthError> {
        let cost = self.cost;
        let plaintext = plaintext.to_owned();

        tokio::task::spawn_blocking(move || bcrypt::hash(plaintext, cost))
            .await
            .map_err(|e| AuthError::Infrastructure(format!("hashing task failed: {}", e)))?
            .map_err(|e| AuthError::Infrastructure(format!("bcrypt hash failed: {}", e)))
    }

    /// A digest that cannot be parsed verifies as `false`.
    pub async fn verify(&self, plaintext: &str, digest: &str) -> Result<bool, AuthError> {
        let plaintext = plaintext.to_owned();
        let digest = digest.to_owned();

        tokio::task::spawn_blocking(move || bcrypt::verify(plaintext, &digest).unwrap_or(false))
            .await
            .map_err(|e| AuthError::Infrastructure(format!("verify task failed: {}", e)))
    }
}

/// Strength rule applied when a password is changed.
pub fn validate_new_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_NEW_PASSWORD_LEN {
        return Err(AuthError::Validation(
            "Password must be at least 6 characters long".to_string(),
        ));
    }

    let has_lower = password.chars().any(|c| c.is_lowercase());
    let has_upper = password.chars().any(|c| c.is_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());

    if !(has_lower && has_upper && has_digit) {
        return Err(AuthError::Validation(
            "Password must contain at least one lowercase letter, one uppercase letter and one digit"
                .to_string(),
        ));
    }

    Ok(())
}

/// Digest stored in place of a refresh token.
pub fn hash_refresh_token(token: &str) -> String {
    hex::encode(Sha256::digest(token.as_bytes()))
}

pub fn refresh_token_matches(token: &str, stored_hash: &str) -> bool {
    constant_time_eq(hash_refresh_token(token).as_bytes(), stored_hash.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn hash_then_verify() {
        let hasher = PasswordHasher::new(4);
        let digest = hasher.hash("password123").await.unwrap();

        assert_ne!(digest, "password123");
        assert!(hasher.verify("password123", &digest).await.unwrap());
        assert!(!hasher.verify("password124", &digest).await.unwrap());
    }

    #[tokio::test]
    async fn same_password_hashes_differently() {
        let hasher = PasswordHasher::new(4);
        let a = hasher.hash("password123").await.unwrap();
        let b = hasher.hash("password123").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn garbage_digest_does_not_verify() {
        let hasher = PasswordHasher::new(4);
        assert!(!hasher.verify("password123", "not-a-bcrypt-digest").await.unwrap());
    }

    #[test]
    fn new_password_strength() {
        assert!(validate_new_password("Abc123").is_ok());
        assert!(validate_new_password("Ab1").is_err());
        assert!(validate_new_password("abcdef1").is_err());
        assert!(validate_new_password("ABCDEF1").is_err());
        assert!(validate_new_password("Abcdefg").is_err());
    }

    #[test]
    fn refresh_digest_distinguishes_tokens_with_long_common_prefix() {
        let prefix = "x".repeat(100);
        let a = format!("{}a", prefix);
        let b = format!("{}b", prefix);

        let stored = hash_refresh_token(&a);
        assert_eq!(stored.len(), 64);
        assert!(refresh_token_matches(&a, &stored));
        assert!(!refresh_token_matches(&b, &stored));
    }
}
