// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLCipher persistence for the Strongbox credential store.
//!
//! [`Database`] wraps a tokio-rusqlite connection and handles keying,
//! per-connection PRAGMAs and embedded migrations. [`StoreEncryption`] owns
//! the connection and drives the plaintext/encrypted lifecycle. Query
//! functions in [`queries`] take a `&Database` and never see plaintext
//! passwords.

pub mod database;
pub mod detect;
pub mod encryption;
pub mod migrations;
pub mod models;
pub mod queries;

pub use database::{Database, TableCounts};
pub use detect::{PLAINTEXT_HEADER, detect_setup_state, has_plaintext_header};
pub use encryption::{StoreEncryption, StoreOptions};
pub use models::{CredentialRow, StoredCredential, setting_keys};
