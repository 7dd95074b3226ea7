/// Password Hashing and Verification
///
/// bcrypt with an explicit cost. Each hash embeds a fresh random salt, so
/// hashing the same password twice yields two different strings. bcrypt's
/// verifier compares digests in constant time.
///
/// Hashing is deliberately slow; the async wrappers move the work onto the
/// blocking pool so request tasks are never stalled behind it.

use bcrypt::{hash, verify};

use crate::error::{PasswordError, ValidationError};

/// bcrypt only looks at the first 72 bytes of its input
const MAX_PASSWORD_BYTES: usize = 72;

/// Hash a password with the given bcrypt cost
pub fn hash_password(password: &str, cost: u32) -> Result<String, PasswordError> {
    hash(password, cost).map_err(|e| PasswordError::Hashing(e.to_string()))
}

/// Verify a password against a stored bcrypt hash
///
/// # Errors
/// `Mismatch` when the password is wrong, `Hashing` when the stored hash
/// cannot be parsed.
pub fn verify_password(password: &str, hash: &str) -> Result<(), PasswordError> {
    match verify(password, hash) {
        Ok(true) => Ok(()),
        Ok(false) => Err(PasswordError::Mismatch),
        Err(e) => Err(PasswordError::Hashing(e.to_string())),
    }
}

/// `hash_password` on the blocking thread pool
pub async fn hash_password_blocking(password: String, cost: u32) -> Result<String, PasswordError> {
    tokio::task::spawn_blocking(move || hash_password(&password, cost))
        .await
        .map_err(|e| PasswordError::Hashing(format!("hashing task failed: {}", e)))?
}

/// `verify_password` on the blocking thread pool
pub async fn verify_password_blocking(password: String, hash: String) -> Result<(), PasswordError> {
    tokio::task::spawn_blocking(move || verify_password(&password, &hash))
        .await
        .map_err(|e| PasswordError::Hashing(format!("verification task failed: {}", e)))?
}

/// Reject passwords bcrypt cannot represent faithfully
pub fn validate_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::EmptyField("password"));
    }

    // Anything past 72 bytes would be silently ignored by bcrypt
    if password.len() > MAX_PASSWORD_BYTES {
        return Err(ValidationError::TooLong("password", MAX_PASSWORD_BYTES));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const TEST_COST: u32 = 4;

    #[test]
    fn test_hash_password() {
        let password = "abcdefg";
        let hash = hash_password(password, TEST_COST).expect("Failed to hash password");

        assert_ne!(password, hash);
        assert!(hash.starts_with("$2"));
    }

    #[test]
    fn test_hash_embeds_cost() {
        let hash = hash_password("abcdefg", TEST_COST).expect("Failed to hash password");
        assert!(hash.contains("$04$"));
    }

    #[test]
    fn test_every_password_matches_only_itself() {
        let passwords = ["abcdefg", "hijklmnop", "123456789"];

        for original in passwords {
            let hashed = hash_password(original, TEST_COST).expect("Failed to hash password");
            for candidate in passwords {
                let result = verify_password(candidate, &hashed);
                if candidate == original {
                    assert!(result.is_ok(), "{} should match", original);
                } else {
                    assert!(
                        matches!(result, Err(PasswordError::Mismatch)),
                        "{} and {} should not match",
                        original,
                        candidate
                    );
                }
            }
        }
    }

    #[test]
    fn test_same_password_hashes_differently() {
        let first = hash_password("correct-pw", TEST_COST).unwrap();
        let second = hash_password("correct-pw", TEST_COST).unwrap();

        assert_ne!(first, second);
        assert!(verify_password("correct-pw", &first).is_ok());
        assert!(verify_password("correct-pw", &second).is_ok());
    }

    #[test]
    fn test_garbage_hash_is_a_hashing_failure() {
        let result = verify_password("correct-pw", "not-a-bcrypt-hash");
        assert!(matches!(result, Err(PasswordError::Hashing(_))));
    }

    #[tokio::test]
    async fn test_blocking_wrappers() {
        let hash = hash_password_blocking("correct-pw".to_string(), TEST_COST)
            .await
            .expect("Failed to hash password");

        assert!(verify_password_blocking("correct-pw".to_string(), hash.clone())
            .await
            .is_ok());
        assert!(matches!(
            verify_password_blocking("wrong-pw".to_string(), hash).await,
            Err(PasswordError::Mismatch)
        ));
    }

    #[test]
    fn test_password_validation() {
        assert!(validate_password("correct-pw").is_ok());
        assert_eq!(
            validate_password(""),
            Err(ValidationError::EmptyField("password"))
        );
        assert_eq!(
            validate_password(&"a".repeat(73)),
            Err(ValidationError::TooLong("password", 72))
        );
        assert!(validate_password(&"a".repeat(72)).is_ok());
    }
}
