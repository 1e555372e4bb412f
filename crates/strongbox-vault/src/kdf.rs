// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Field-key derivation and salt generation.
//!
//! The field key is `SHA-256(secret || salt)`, where the salt is persisted
//! hex-encoded in the `password_salt` setting. Existing envelopes depend on
//! this exact construction.

use ring::digest::{SHA256, digest};
use ring::rand::{SecureRandom, SystemRandom};
use strongbox_core::StrongboxError;
use zeroize::Zeroizing;

use crate::keys::FieldKey;

/// Salt length in bytes before hex encoding.
pub const SALT_LEN: usize = 16;

/// Derive the field key from a secret and a hex-encoded salt.
///
/// A salt that is empty or not valid hex is reported as
/// [`StrongboxError::CorruptionSuspected`]; it is never replaced by an empty salt.
pub fn derive_field_key(secret: &[u8], salt_hex: &str) -> Result<FieldKey, StrongboxError> {
    let salt = decode_salt(salt_hex)?;

    let mut input = Zeroizing::new(Vec::with_capacity(secret.len() + salt.len()));
    input.extend_from_slice(secret);
    input.extend_from_slice(&salt);

    let mut key = Zeroizing::new([0u8; 32]);
    key.copy_from_slice(digest(&SHA256, &input).as_ref());
    Ok(FieldKey::from_bytes(key))
}

/// Generate a random salt, hex-encoded for the settings table.
pub fn generate_salt() -> Result<String, StrongboxError> {
    let rng = SystemRandom::new();
    let mut salt = [0u8; SALT_LEN];
    rng.fill(&mut salt)
        .map_err(|_| StrongboxError::Internal("failed to generate random salt".to_string()))?;
    Ok(hex::encode(salt))
}

fn decode_salt(salt_hex: &str) -> Result<Vec<u8>, StrongboxError> {
    let trimmed = salt_hex.trim();
    if trimmed.is_empty() {
        return Err(StrongboxError::CorruptionSuspected(
            "password_salt is empty".to_string(),
        ));
    }
    hex::decode(trimmed).map_err(|e| {
        StrongboxError::CorruptionSuspected(format!("password_salt is not valid hex: {e}"))
    })
}
