// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Row types as they sit in the store.

use strongbox_core::AuthLogins;

/// Well-known keys of the `settings` table.
pub mod setting_keys {
    /// Reference hash of the master password.
    pub const MASTER_PASSWORD: &str = "master_password";
    /// Hex salt for field-key derivation. Immutable once ciphertext exists.
    pub const PASSWORD_SALT: &str = "password_salt";
    /// Secret the field key is derived from, pinned across password changes.
    pub const ENCRYPTION_KEY: &str = "encryption_key";
    /// Envelope of a fixed marker, sealed with the field key at setup.
    pub const FIELD_KEY_CHECK: &str = "field_key_check";
}

/// A credential row with its password still sealed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredCredential {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub phone: String,
    /// Base64 field envelope.
    pub password: String,
    pub website: String,
    pub auth_logins: AuthLogins,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Column values for an insert or update; `password` is already an envelope.
#[derive(Debug, Clone, Default)]
pub struct CredentialRow {
    pub name: String,
    pub username: String,
    pub phone: String,
    pub password: String,
    pub website: String,
    pub auth_logins: AuthLogins,
    pub notes: String,
}
