// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key material and field-level cryptography for the Strongbox credential store.
//!
//! The master password serves two independent roles: it is the passphrase for
//! the encrypted store file ([`StoreKey`]) and, combined with a persisted salt,
//! the source of the AES-256-GCM key that seals each credential's password
//! field ([`FieldKey`]).

pub mod crypto;
pub mod hash;
pub mod kdf;
pub mod keys;
pub mod mask;
pub mod prompt;
pub mod session;

pub use crypto::{decrypt_field, encrypt_field};
pub use hash::{hash_master_password, verify_master_password};
pub use kdf::{derive_field_key, generate_salt};
pub use keys::{FieldKey, StoreKey};
pub use mask::mask_secret;
pub use prompt::{
    MASTER_PASSWORD_ENV_VAR, NEW_MASTER_PASSWORD_ENV_VAR, get_master_password,
    get_new_password_with_confirm,
};
pub use session::MasterPasswordSession;
