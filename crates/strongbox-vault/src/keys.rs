// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key material types.
//!
//! [`StoreKey`] protects the whole store file; [`FieldKey`] protects individual
//! password envelopes. They are separate types with no conversion between them,
//! so rotating one can never silently change the other.

use secrecy::{ExposeSecret, SecretString};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

/// Passphrase applied as the store's native (SQLCipher) key.
///
/// SQLCipher runs its own PBKDF2 over the passphrase with the per-file salt
/// stored in the database header.
#[derive(Clone)]
pub struct StoreKey(SecretString);

impl StoreKey {
    /// The store key for a master password.
    pub fn from_master(master: &SecretString) -> Self {
        Self(master.clone())
    }

    /// Passphrase text for `PRAGMA key` / `PRAGMA rekey` / `ATTACH ... KEY`.
    pub fn expose_passphrase(&self) -> &str {
        self.0.expose_secret()
    }
}

impl std::fmt::Debug for StoreKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("StoreKey").field(&"[REDACTED]").finish()
    }
}

/// 256-bit AES-GCM key for credential password envelopes.
pub struct FieldKey(Zeroizing<[u8; 32]>);

impl FieldKey {
    pub(crate) fn from_bytes(bytes: Zeroizing<[u8; 32]>) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl std::fmt::Debug for FieldKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FieldKey").field(&"[REDACTED]").finish()
    }
}

impl PartialEq for FieldKey {
    fn eq(&self, other: &Self) -> bool {
        bool::from(self.0[..].ct_eq(&other.0[..]))
    }
}

impl Eq for FieldKey {}
