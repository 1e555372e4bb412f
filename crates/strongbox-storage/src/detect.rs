// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Setup-state detection from the store file header.
//!
//! A plaintext SQLite file starts with the 16-byte magic `"SQLite format 3\0"`.
//! An SQLCipher file starts with its random per-file salt instead. Detection
//! reads that header and, for plaintext files only, looks for a reference
//! password row through a read-only connection. It never opens the file
//! read-write and never touches a live connection.

use std::io::Read;
use std::path::Path;

use rusqlite::OpenFlags;
use strongbox_core::{SetupReason, SetupState, StrongboxError};
use tracing::debug;

/// Leading bytes of every unencrypted SQLite database file.
pub const PLAINTEXT_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Determine which setup transition applies to the store at `path`.
///
/// Files smaller than `min_store_size` bytes are treated as uninitialized.
pub fn detect_setup_state(path: &Path, min_store_size: u64) -> Result<SetupState, StrongboxError> {
    let metadata = match std::fs::metadata(path) {
        Ok(m) => m,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            debug!(path = %path.display(), "store file absent");
            return Ok(SetupState::FirstTimeSetup {
                reason: SetupReason::StoreMissing,
            });
        }
        Err(e) => return Err(StrongboxError::io(path, e)),
    };

    if metadata.len() < min_store_size {
        debug!(path = %path.display(), size = metadata.len(), "store file below minimum size");
        return Ok(SetupState::FirstTimeSetup {
            reason: SetupReason::StoreEmpty,
        });
    }

    if !has_plaintext_header(path)? {
        debug!(path = %path.display(), "store header is not plaintext; treating as encrypted");
        return Ok(SetupState::EncryptedConfigured);
    }

    if has_master_password_row(path)? {
        Ok(SetupState::AlreadyConfiguredUnencrypted)
    } else {
        Ok(SetupState::FirstTimeSetup {
            reason: SetupReason::NotEncrypted,
        })
    }
}

/// Whether the file begins with the plaintext SQLite magic.
pub fn has_plaintext_header(path: &Path) -> Result<bool, StrongboxError> {
    let mut header = [0u8; 16];
    let mut file = std::fs::File::open(path).map_err(|e| StrongboxError::io(path, e))?;
    match file.read_exact(&mut header) {
        Ok(()) => Ok(&header == PLAINTEXT_HEADER),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Ok(false),
        Err(e) => Err(StrongboxError::io(path, e)),
    }
}

fn has_master_password_row(path: &Path) -> Result<bool, StrongboxError> {
    let conn = rusqlite::Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(StrongboxError::storage)?;

    let has_settings: bool = conn
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'settings')",
            [],
            |r| r.get(0),
        )
        .map_err(StrongboxError::storage)?;
    if !has_settings {
        return Ok(false);
    }

    conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM settings WHERE key = 'master_password' AND value <> '')",
        [],
        |r| r.get(0),
    )
    .map_err(StrongboxError::storage)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::Database;
    use secrecy::SecretString;
    use strongbox_vault::StoreKey;
    use tempfile::tempdir;

    async fn plain_store(path: &Path, with_master: bool) {
        let db = Database::open_unencrypted(path).await.unwrap();
        if with_master {
            db.connection()
                .call(|conn| {
                    conn.execute(
                        "INSERT INTO settings (key, value) VALUES ('master_password', 'abc')",
                        [],
                    )
                })
                .await
                .unwrap();
        }
        db.close().await.unwrap();
    }

    #[test]
    fn missing_file_is_first_time() {
        let dir = tempdir().unwrap();
        let state = detect_setup_state(&dir.path().join("none.db"), 100).unwrap();
        assert_eq!(
            state,
            SetupState::FirstTimeSetup {
                reason: SetupReason::StoreMissing
            }
        );
    }

    #[test]
    fn tiny_file_is_first_time() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tiny.db");
        std::fs::write(&path, b"SQLite").unwrap();
        assert_eq!(
            detect_setup_state(&path, 100).unwrap(),
            SetupState::FirstTimeSetup {
                reason: SetupReason::StoreEmpty
            }
        );
    }

    #[tokio::test]
    async fn plaintext_without_master_row_needs_setup() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.db");
        plain_store(&path, false).await;
        assert!(has_plaintext_header(&path).unwrap());
        assert_eq!(
            detect_setup_state(&path, 100).unwrap(),
            SetupState::FirstTimeSetup {
                reason: SetupReason::NotEncrypted
            }
        );
    }

    #[tokio::test]
    async fn plaintext_with_master_row_is_configured() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.db");
        plain_store(&path, true).await;
        assert_eq!(
            detect_setup_state(&path, 100).unwrap(),
            SetupState::AlreadyConfiguredUnencrypted
        );
    }

    #[tokio::test]
    async fn encrypted_store_detected_by_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("enc.db");
        let key = StoreKey::from_master(&SecretString::from("detect-me".to_string()));
        Database::open_with_key(&path, &key, 4096)
            .await
            .unwrap()
            .close()
            .await
            .unwrap();

        assert!(!has_plaintext_header(&path).unwrap());
        assert_eq!(
            detect_setup_state(&path, 100).unwrap(),
            SetupState::EncryptedConfigured
        );
    }

    #[test]
    fn foreign_file_is_treated_as_encrypted() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("noise.db");
        std::fs::write(&path, vec![0xA5u8; 4096]).unwrap();
        assert_eq!(
            detect_setup_state(&path, 100).unwrap(),
            SetupState::EncryptedConfigured
        );
    }

    #[tokio::test]
    async fn detection_does_not_modify_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.db");
        plain_store(&path, true).await;
        let before = std::fs::read(&path).unwrap();
        detect_setup_state(&path, 100).unwrap();
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}
