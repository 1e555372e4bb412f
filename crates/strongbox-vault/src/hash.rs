// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reference hash of the master password (`master_password` setting).
//!
//! New stores get an Argon2id PHC string. Stores written by earlier versions
//! hold a bare SHA-256 hex digest, which is still verified.

use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::{Algorithm, Argon2, Params, Version};
use ring::digest::{SHA256, digest};
use ring::rand::{SecureRandom, SystemRandom};
use strongbox_config::VaultConfig;
use strongbox_core::StrongboxError;
use subtle::ConstantTimeEq;

/// Hash a master password with Argon2id using the configured cost.
pub fn hash_master_password(password: &str, config: &VaultConfig) -> Result<String, StrongboxError> {
    let params = Params::new(
        config.kdf_memory_cost,
        config.kdf_iterations,
        config.kdf_parallelism,
        None,
    )
    .map_err(|e| StrongboxError::Config(format!("invalid Argon2id parameters: {e}")))?;

    let mut salt_bytes = [0u8; 16];
    SystemRandom::new()
        .fill(&mut salt_bytes)
        .map_err(|_| StrongboxError::Internal("failed to generate hash salt".to_string()))?;
    let salt = SaltString::encode_b64(&salt_bytes)
        .map_err(|e| StrongboxError::Internal(format!("failed to encode hash salt: {e}")))?;

    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| StrongboxError::Internal(format!("Argon2id hashing failed: {e}")))
}

/// Check a password against a stored reference hash of either format.
pub fn verify_master_password(password: &str, stored: &str) -> Result<bool, StrongboxError> {
    let stored = stored.trim();
    if is_legacy_digest(stored) {
        let expected = hex::decode(stored).map_err(|e| {
            StrongboxError::CorruptionSuspected(format!("master_password hash is not hex: {e}"))
        })?;
        let actual = digest(&SHA256, password.as_bytes());
        return Ok(bool::from(actual.as_ref().ct_eq(expected.as_slice())));
    }

    let parsed = PasswordHash::new(stored).map_err(|e| {
        StrongboxError::CorruptionSuspected(format!("master_password hash is unreadable: {e}"))
    })?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok())
}

/// Whether a stored hash is the old unsalted SHA-256 format.
pub fn is_legacy_digest(stored: &str) -> bool {
    stored.len() == 64 && stored.bytes().all(|b| b.is_ascii_hexdigit())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fast() -> VaultConfig {
        VaultConfig {
            kdf_memory_cost: 32768,
            kdf_iterations: 2,
            kdf_parallelism: 1,
        }
    }

    #[test]
    fn argon2_hash_verifies() {
        let hash = hash_master_password("correct horse", &fast()).unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_master_password("correct horse", &hash).unwrap());
        assert!(!verify_master_password("wrong horse", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        let a = hash_master_password("same", &fast()).unwrap();
        let b = hash_master_password("same", &fast()).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn legacy_sha256_digest_verifies() {
        let legacy = hex::encode(digest(&SHA256, b"oldpass123"));
        assert!(is_legacy_digest(&legacy));
        assert!(verify_master_password("oldpass123", &legacy).unwrap());
        assert!(!verify_master_password("oldpass124", &legacy).unwrap());
    }

    #[test]
    fn garbage_hash_is_corruption() {
        let err = verify_master_password("x", "not-a-hash").unwrap_err();
        assert!(matches!(err, StrongboxError::CorruptionSuspected(_)));
    }
}
