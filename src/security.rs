//! Password hashing
//!
//! Salted PBKDF2-HMAC-SHA256. Stored hashes are self-describing
//! (`pbkdf2$<iterations>$<salt hex>$<hash hex>`) so the iteration count
//! can be raised without invalidating existing accounts.

use pbkdf2::pbkdf2_hmac;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::Sha256;

use crate::error::{Result, TallyError};

const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str, iterations: u32) -> Result<String> {
    let mut salt = [0u8; SALT_LEN];
    OsRng
        .try_fill_bytes(&mut salt)
        .map_err(|e| TallyError::Internal(format!("system entropy unavailable: {}", e)))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

    Ok(format!(
        "pbkdf2${}${}${}",
        iterations,
        hex::encode(salt),
        hex::encode(hash)
    ))
}

/// Verify a password against a stored hash
///
/// Unparseable stored hashes verify as false rather than erroring; a
/// corrupted credential row must not become a 500 on the login path.
pub fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');

    let (Some("pbkdf2"), Some(iterations), Some(salt), Some(expected)) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return false;
    };

    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(salt) = hex::decode(salt) else {
        return false;
    };
    let Ok(expected) = hex::decode(expected) else {
        return false;
    };

    let mut hash = vec![0u8; expected.len()];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

    // Not constant-time, but the salt is random per account and the
    // comparison is against a full-length digest.
    hash == expected
}

#[cfg(test)]
mod tests {
    use super::*;

    // Low iteration count to keep tests fast.
    const TEST_ITERATIONS: u32 = 1000;

    #[test]
    fn test_hash_and_verify_roundtrip() {
        let stored = hash_password("hunter2", TEST_ITERATIONS).unwrap();
        assert!(verify_password("hunter2", &stored));
        assert!(!verify_password("hunter3", &stored));
    }

    #[test]
    fn test_salts_are_unique_per_hash() {
        let a = hash_password("hunter2", TEST_ITERATIONS).unwrap();
        let b = hash_password("hunter2", TEST_ITERATIONS).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_malformed_stored_hash_verifies_false() {
        assert!(!verify_password("hunter2", ""));
        assert!(!verify_password("hunter2", "bcrypt$something"));
        assert!(!verify_password("hunter2", "pbkdf2$notanumber$aa$bb"));
        assert!(!verify_password("hunter2", "pbkdf2$1000$zz$zz"));
    }
}
