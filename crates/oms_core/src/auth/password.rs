//! Password hashing with bcrypt.
//!
//! Stored values are standard bcrypt strings (`$2b$<cost>$<salt+digest>`);
//! the cost travels inside the hash, so raising it never breaks old rows.

use crate::auth::AuthResult;
use log::warn;

pub use bcrypt::DEFAULT_COST;

/// Hashes `password` with a fresh random salt at the given bcrypt `cost`.
///
/// # Errors
/// - `AuthError::Hash` when `cost` is outside bcrypt's `4..=31`.
pub fn hash_password(password: &str, cost: u32) -> AuthResult<String> {
    Ok(bcrypt::hash(password, cost)?)
}

/// Checks `password` against a value produced by [`hash_password`].
///
/// Malformed stored values never verify.
pub fn verify_password(password: &str, stored: &str) -> bool {
    match bcrypt::verify(password, stored) {
        Ok(matches) => matches,
        Err(err) => {
            warn!(
                "event=password_verify module=auth status=error error_code=malformed_hash error={err}"
            );
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{hash_password, verify_password};
    use crate::auth::AuthError;

    const TEST_COST: u32 = 4;

    #[test]
    fn hash_verifies_only_the_original_password() {
        let stored = hash_password("s3cret", TEST_COST).unwrap();
        assert!(stored.starts_with("$2b$04$"));
        assert!(verify_password("s3cret", &stored));
        assert!(!verify_password("S3cret", &stored));
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(
            hash_password("same", TEST_COST).unwrap(),
            hash_password("same", TEST_COST).unwrap()
        );
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify_password("pw", "plain-text"));
        assert!(!verify_password("pw", "sha256$salt$digest"));
    }

    #[test]
    fn out_of_range_cost_is_rejected() {
        let err = hash_password("pw", 3).unwrap_err();
        assert!(matches!(err, AuthError::Hash(_)));
    }
}
