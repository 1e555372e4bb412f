// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Strongbox credential store.
//!
//! This crate provides the error taxonomy and the record and state types used
//! throughout the Strongbox workspace.

pub mod error;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorKind, StrongboxError};
pub use types::{
    AuthLogins, CredentialRecord, HealthStatus, LoginState, NewCredential, SetupReason,
    SetupState, StoreEncryptionState,
};
