//! crates/startpage_core/src/credentials.rs
//!
//! Salted password hashing for the single admin credential.
//!
//! Hashes are raw Argon2id outputs stored as hex next to a hex salt, which keeps
//! the persisted `admin` record readable by both deployment backends.

use argon2::password_hash::rand_core::{OsRng, RngCore};
use argon2::{Algorithm, Argon2, Params, Version, MIN_SALT_LEN};
use tracing::warn;

use crate::config::HashParams;
use crate::domain::AdminCredentials;

pub const SALT_LEN: usize = 16;
pub const HASH_LEN: usize = 32;

#[derive(Debug, thiserror::Error)]
pub enum HashError {
    #[error("Invalid key derivation parameters: {0}")]
    Params(String),
    #[error("Key derivation failed: {0}")]
    Derive(String),
}

/// Derives and verifies salted password hashes.
#[derive(Debug, Clone)]
pub struct CredentialHasher {
    params: Params,
}

impl CredentialHasher {
    pub fn new(params: HashParams) -> Result<Self, HashError> {
        let params = Params::new(
            params.memory_kib,
            params.iterations,
            params.parallelism,
            Some(HASH_LEN),
        )
        .map_err(|e| HashError::Params(e.to_string()))?;
        Ok(Self { params })
    }

    /// A fresh random salt from the operating system RNG.
    pub fn generate_salt() -> [u8; SALT_LEN] {
        let mut salt = [0u8; SALT_LEN];
        OsRng.fill_bytes(&mut salt);
        salt
    }

    /// Derives the hex-encoded hash of `password` under `salt`.
    pub fn hash(&self, password: &str, salt: &[u8]) -> Result<String, HashError> {
        let raw = self.derive(password, salt)?;
        Ok(hex::encode(raw))
    }

    /// Recomputes the hash and compares it in constant time.
    ///
    /// Malformed stored values (bad hex, wrong length) simply fail verification.
    pub fn verify(&self, password: &str, salt_hex: &str, expected_hex: &str) -> bool {
        let (Ok(salt), Ok(expected)) = (hex::decode(salt_hex), hex::decode(expected_hex)) else {
            return false;
        };
        match self.derive(password, &salt) {
            Ok(actual) => constant_time_eq(&actual, &expected),
            Err(e) => {
                warn!("Password verification could not derive a hash: {}", e);
                false
            }
        }
    }

    /// Creates a new credential record for `password` with a fresh salt.
    pub fn derive_credentials(&self, password: &str) -> Result<AdminCredentials, HashError> {
        let salt = Self::generate_salt();
        Ok(AdminCredentials {
            password_hash: self.hash(password, &salt)?,
            password_salt: hex::encode(salt),
        })
    }

    pub fn verify_credentials(&self, password: &str, credentials: &AdminCredentials) -> bool {
        self.verify(
            password,
            &credentials.password_salt,
            &credentials.password_hash,
        )
    }

    fn derive(&self, password: &str, salt: &[u8]) -> Result<[u8; HASH_LEN], HashError> {
        let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, self.params.clone());
        let mut out = [0u8; HASH_LEN];
        argon2
            .hash_password_into(password.as_bytes(), salt, &mut out)
            .map_err(|e| HashError::Derive(e.to_string()))?;
        Ok(out)
    }
}

/// Length-checked comparison whose running time does not depend on where the
/// inputs first differ.
pub fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    let diff = a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y));
    diff == 0
}

/// True when the stored pair could ever verify: the hash decodes to exactly
/// `HASH_LEN` bytes and the salt to at least the Argon2 minimum.
pub fn is_structurally_valid(hash: &str, salt: &str) -> bool {
    let (Ok(hash), Ok(salt)) = (hex::decode(hash), hex::decode(salt)) else {
        return false;
    };
    hash.len() == HASH_LEN && salt.len() >= MIN_SALT_LEN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hasher() -> CredentialHasher {
        CredentialHasher::new(HashParams::low_cost()).unwrap()
    }

    #[test]
    fn hashing_is_deterministic_for_a_salt() {
        let h = hasher();
        let salt = CredentialHasher::generate_salt();
        assert_eq!(h.hash("pw", &salt).unwrap(), h.hash("pw", &salt).unwrap());
        assert_eq!(h.hash("pw", &salt).unwrap().len(), HASH_LEN * 2);
    }

    #[test]
    fn different_salts_give_different_hashes() {
        let h = hasher();
        let a = h.derive_credentials("pw").unwrap();
        let b = h.derive_credentials("pw").unwrap();
        assert_ne!(a.password_salt, b.password_salt);
        assert_ne!(a.password_hash, b.password_hash);
    }

    #[test]
    fn verify_accepts_only_the_right_password() {
        let h = hasher();
        let creds = h.derive_credentials("admin123").unwrap();
        assert!(h.verify_credentials("admin123", &creds));
        assert!(!h.verify_credentials("admin124", &creds));
        assert!(!h.verify_credentials("", &creds));
    }

    #[test]
    fn verify_rejects_malformed_stored_values() {
        let h = hasher();
        let creds = h.derive_credentials("pw").unwrap();
        assert!(!h.verify("pw", "not-hex", &creds.password_hash));
        assert!(!h.verify("pw", &creds.password_salt, "zz"));
        assert!(!h.verify("pw", &creds.password_salt, &creds.password_hash[..10]));
    }

    #[test]
    fn constant_time_eq_checks_length_and_content() {
        assert!(constant_time_eq(b"abc", b"abc"));
        assert!(!constant_time_eq(b"abc", b"abd"));
        assert!(!constant_time_eq(b"abc", b"xbc"));
        assert!(!constant_time_eq(b"abc", b"abcd"));
        assert!(constant_time_eq(b"", b""));
    }

    #[test]
    fn structural_validity() {
        let creds = hasher().derive_credentials("pw").unwrap();
        assert!(is_structurally_valid(&creds.password_hash, &creds.password_salt));
        assert!(is_structurally_valid(&creds.password_hash, &"ab".repeat(MIN_SALT_LEN)));

        assert!(!is_structurally_valid("", &creds.password_salt));
        assert!(!is_structurally_valid("00", "00"));
        assert!(!is_structurally_valid(&creds.password_hash, "00"));
        assert!(!is_structurally_valid(&creds.password_hash[..62], &creds.password_salt));
        assert!(!is_structurally_valid(&"zz".repeat(HASH_LEN), &creds.password_salt));
    }
}
