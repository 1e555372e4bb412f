// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! AES-256-GCM field cipher.
//!
//! Every call to [`seal`] generates a fresh random 96-bit nonce via the system
//! CSPRNG. Nonce reuse would be catastrophic for GCM security.
//!
//! The envelope stored in the `passwords.password` column is
//! `base64(nonce || ciphertext || tag)` with the standard padded alphabet and
//! no associated data.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use ring::aead::{AES_256_GCM, Aad, LessSafeKey, NONCE_LEN, Nonce, UnboundKey};
use ring::rand::{SecureRandom, SystemRandom};
use strongbox_core::StrongboxError;

use crate::keys::FieldKey;

fn aead_key(key: &[u8; 32]) -> Result<LessSafeKey, StrongboxError> {
    let unbound = UnboundKey::new(&AES_256_GCM, key)
        .map_err(|_| StrongboxError::Internal("failed to create AES-256-GCM key".to_string()))?;
    Ok(LessSafeKey::new(unbound))
}

/// Encrypt with a random nonce. Returns `(ciphertext_with_tag, nonce)`.
pub fn seal(key: &[u8; 32], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; NONCE_LEN]), StrongboxError> {
    let less_safe = aead_key(key)?;

    let mut nonce_bytes = [0u8; NONCE_LEN];
    SystemRandom::new()
        .fill(&mut nonce_bytes)
        .map_err(|_| StrongboxError::Internal("failed to generate random nonce".to_string()))?;

    let mut in_out = plaintext.to_vec();
    less_safe
        .seal_in_place_append_tag(
            Nonce::assume_unique_for_key(nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| StrongboxError::Internal("AES-256-GCM encryption failed".to_string()))?;

    Ok((in_out, nonce_bytes))
}

/// Decrypt `ciphertext` (with its appended tag).
///
/// A tag mismatch is [`StrongboxError::AuthenticationFailure`]: wrong key,
/// wrong salt, and tampering are indistinguishable here.
pub fn open(
    key: &[u8; 32],
    nonce_bytes: &[u8; NONCE_LEN],
    ciphertext: &[u8],
) -> Result<Vec<u8>, StrongboxError> {
    let less_safe = aead_key(key)?;

    let mut in_out = ciphertext.to_vec();
    let plaintext = less_safe
        .open_in_place(
            Nonce::assume_unique_for_key(*nonce_bytes),
            Aad::empty(),
            &mut in_out,
        )
        .map_err(|_| StrongboxError::AuthenticationFailure)?;

    Ok(plaintext.to_vec())
}

/// Encrypt one field value into a transportable envelope.
pub fn encrypt_field(plaintext: &str, key: &FieldKey) -> Result<String, StrongboxError> {
    let (ciphertext, nonce) = seal(key.as_bytes(), plaintext.as_bytes())?;

    let mut envelope = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    envelope.extend_from_slice(&nonce);
    envelope.extend_from_slice(&ciphertext);
    Ok(STANDARD.encode(envelope))
}

/// Decrypt an envelope produced by [`encrypt_field`].
pub fn decrypt_field(envelope: &str, key: &FieldKey) -> Result<String, StrongboxError> {
    let raw = STANDARD
        .decode(envelope.trim())
        .map_err(|e| StrongboxError::MalformedEnvelope(format!("invalid base64: {e}")))?;

    if raw.len() < NONCE_LEN {
        return Err(StrongboxError::MalformedEnvelope(format!(
            "envelope is {} bytes, shorter than the {NONCE_LEN}-byte nonce",
            raw.len()
        )));
    }

    let (nonce, ciphertext) = raw.split_at(NONCE_LEN);
    let mut nonce_bytes = [0u8; NONCE_LEN];
    nonce_bytes.copy_from_slice(nonce);

    let plaintext = open(key.as_bytes(), &nonce_bytes, ciphertext)?;
    String::from_utf8(plaintext).map_err(|_| {
        StrongboxError::CorruptionSuspected("decrypted field is not valid UTF-8".to_string())
    })
}
