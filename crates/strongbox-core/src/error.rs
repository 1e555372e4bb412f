// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Strongbox credential store.
//!
//! Every failure carries a stable [`ErrorKind`] so front ends can branch on the
//! category without parsing messages. Messages never contain secret material;
//! at most a length or a masked preview.

use std::path::PathBuf;

use strum::{Display, EnumString, IntoStaticStr};
use thiserror::Error;

/// Stable category of a [`StrongboxError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Caller input rejected before any state change.
    InputInvalid,
    /// Wrong master password, wrong store key, or a failed authentication tag.
    KeyMismatch,
    /// Authenticated operation attempted without a master password in session.
    SessionExpired,
    /// Store connection missing or broken.
    StoreUnavailable,
    /// Store rekey failed; see the message for rollback status.
    RekeyFailed,
    /// Stored data failed structural checks after decryption.
    CorruptionSuspected,
    /// Requested record does not exist.
    NotFound,
    /// Configuration could not be loaded or validated.
    Config,
    /// Internal or unexpected error.
    Internal,
}

/// The primary error type used across all Strongbox crates.
#[derive(Debug, Error)]
pub enum StrongboxError {
    /// Input failed validation (password too short, empty field, ...).
    #[error("invalid input: {0}")]
    InputInvalid(String),

    /// The master password supplied at login does not open the store.
    #[error("wrong master password")]
    WrongPassword,

    /// The current password supplied to a password change is wrong.
    #[error("current master password is incorrect")]
    WrongCurrentPassword,

    /// AEAD tag did not verify: wrong key, wrong salt, or tampered envelope.
    #[error("field authentication failed")]
    AuthenticationFailure,

    /// No master password is held by the session.
    #[error("session expired, log in again")]
    SessionExpired,

    /// The session token is missing, malformed, expired, or forged.
    #[error("invalid session token: {0}")]
    InvalidToken(String),

    /// An unencrypted open was attempted on a cipher-protected file.
    #[error("store at {path} is encrypted and cannot be opened without a key")]
    CipherProtected { path: PathBuf },

    /// Applying a key to the store failed. The engine cannot tell a wrong key
    /// from a damaged file.
    #[error("store key incorrect or file corrupt: {path}")]
    StoreKeyRejected { path: PathBuf },

    /// No live store connection, or the operation is illegal in the current state.
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// Rekey failed and the store was rolled back to the previous key.
    #[error("rekey failed and was rolled back: {reason}")]
    RekeyFailed { reason: String },

    /// Rekey verification failed and restoring the backup also failed.
    /// Manual recovery is needed from `backup_path`.
    #[error("rekey verification failed and rollback did not complete; backup kept at {}", backup_path.display())]
    RekeyVerificationFailed { backup_path: PathBuf },

    /// Data decrypted but is structurally invalid, or key material in settings is damaged.
    #[error("corruption suspected: {0}")]
    CorruptionSuspected(String),

    /// Envelope is not valid base64 or shorter than a nonce.
    #[error("malformed field envelope: {0}")]
    MalformedEnvelope(String),

    /// No credential record with this id.
    #[error("record {0} not found")]
    NotFound(i64),

    /// Storage backend errors (query failure, migration failure).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Filesystem errors around the store file (backup, rename, stat).
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// Configuration errors.
    #[error("configuration error: {0}")]
    Config(String),

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl StrongboxError {
    /// Stable category for this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::InputInvalid(_) => ErrorKind::InputInvalid,
            Self::WrongPassword
            | Self::WrongCurrentPassword
            | Self::AuthenticationFailure
            | Self::StoreKeyRejected { .. } => ErrorKind::KeyMismatch,
            Self::SessionExpired | Self::InvalidToken(_) => ErrorKind::SessionExpired,
            Self::CipherProtected { .. }
            | Self::StoreUnavailable(_)
            | Self::Storage { .. }
            | Self::Io { .. } => ErrorKind::StoreUnavailable,
            Self::RekeyFailed { .. } | Self::RekeyVerificationFailed { .. } => {
                ErrorKind::RekeyFailed
            }
            Self::CorruptionSuspected(_) | Self::MalformedEnvelope(_) => {
                ErrorKind::CorruptionSuspected
            }
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::Config(_) => ErrorKind::Config,
            Self::Internal(_) => ErrorKind::Internal,
        }
    }

    /// Wrap any storage-layer error.
    pub fn storage<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Storage {
            source: Box::new(err),
        }
    }

    /// Wrap an I/O error with the path it happened on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}
