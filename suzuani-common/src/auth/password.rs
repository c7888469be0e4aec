//! Password hashing
//!
//! Digest = SHA-256 applied `PASSWORD_HASH_ROUNDS` times over
//! `salt || password || previous digest`, starting from an empty digest.
//! Salt is 16 random bytes, hex encoded. Both are stored on the user row
//! (`password_hash`, `password_salt`).

use rand::RngCore;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Number of SHA-256 iterations per password
pub const PASSWORD_HASH_ROUNDS: u32 = 10_000;

/// Stored password material
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PasswordHash {
    /// 64 hex characters
    pub hash: String,
    /// 32 hex characters
    pub salt: String,
}

/// Hash a password with a fresh random salt
pub fn hash_password(password: &str) -> PasswordHash {
    let mut salt_bytes = [0u8; 16];
    rand::thread_rng().fill_bytes(&mut salt_bytes);
    let salt = to_hex(&salt_bytes);

    PasswordHash {
        hash: digest_with_salt(password, &salt),
        salt,
    }
}

/// Check a password against stored material
pub fn verify_password(password: &str, hash: &str, salt: &str) -> bool {
    if hash.is_empty() || salt.is_empty() {
        return false;
    }
    let calculated = digest_with_salt(password, salt);
    bool::from(calculated.as_bytes().ct_eq(hash.as_bytes()))
}

fn digest_with_salt(password: &str, salt: &str) -> String {
    let mut digest = [0u8; 32];
    for _ in 0..PASSWORD_HASH_ROUNDS {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(password.as_bytes());
        hasher.update(digest);
        digest.copy_from_slice(&hasher.finalize());
    }
    to_hex(&digest)
}

pub(crate) fn to_hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let stored = hash_password("correct horse");
        assert_eq!(stored.hash.len(), 64);
        assert_eq!(stored.salt.len(), 32);

        assert!(verify_password("correct horse", &stored.hash, &stored.salt));
        assert!(!verify_password("wrong horse", &stored.hash, &stored.salt));
    }

    #[test]
    fn test_same_password_different_salt() {
        let a = hash_password("secret");
        let b = hash_password("secret");
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn test_empty_stored_material_never_matches() {
        assert!(!verify_password("", "", ""));
        assert!(!verify_password("anything", "", "abcd"));
    }
}
