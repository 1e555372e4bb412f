// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store connection management: key application, PRAGMA setup, and lifecycle.
//!
//! All statements run on tokio-rusqlite's single background thread per
//! connection. The store uses the rollback journal (`journal_mode = DELETE`)
//! so that `PRAGMA rekey` is permitted and a closed store is one
//! self-contained file that can be copied or renamed.

use std::path::{Path, PathBuf};

use rusqlite::ErrorCode;
use strongbox_core::StrongboxError;
use strongbox_vault::StoreKey;
use tokio_rusqlite::Connection;
use tracing::debug;
use zeroize::Zeroizing;

use crate::migrations::run_migrations;

/// Row counts used to verify that a transformed store holds the same data.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableCounts {
    pub settings: i64,
    pub passwords: i64,
}

/// An open store file.
pub struct Database {
    conn: Connection,
    path: PathBuf,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database").field("path", &self.path).finish()
    }
}

impl Database {
    /// Open or create a store without a cipher.
    ///
    /// Fails with [`StrongboxError::CipherProtected`] when the file exists but
    /// is encrypted.
    pub async fn open_unencrypted(path: &Path) -> Result<Self, StrongboxError> {
        ensure_parent_dir(path).await?;
        let conn = Connection::open(path)
            .await
            .map_err(StrongboxError::storage)?;

        let owned = path.to_path_buf();
        let verified = conn
            .call(|conn| -> Result<Result<(), StrongboxError>, rusqlite::Error> {
                if let Err(e) = probe_schema(conn) {
                    return Ok(Err(e));
                }
                conn.execute_batch(CONNECTION_PRAGMAS)?;
                Ok(run_migrations(conn))
            })
            .await
            .map_err(map_tr_err)?;

        if let Err(e) = verified {
            let _ = conn.close().await;
            return Err(match e {
                StrongboxError::Storage { source } if is_not_a_database(source.as_ref()) => {
                    StrongboxError::CipherProtected { path: owned }
                }
                other => other,
            });
        }

        debug!(path = %path.display(), "opened unencrypted store");
        Ok(Self {
            conn,
            path: path.to_path_buf(),
        })
    }

    /// Open or create a store protected by `key`.
    ///
    /// Any failure to read the schema after applying the key is reported as
    /// [`StrongboxError::StoreKeyRejected`]; the engine cannot distinguish a
    /// wrong key from a damaged file.
    pub async fn open_with_key(
        path: &Path,
        key: &StoreKey,
        page_size: u32,
    ) -> Result<Self, StrongboxError> {
        ensure_parent_dir(path).await?;
        let conn = Connection::open(path)
            .await
            .map_err(StrongboxError::storage)?;

        let keying = key_statement(key, page_size);
        let verified = conn
            .call(move |conn| -> Result<Result<(), StrongboxError>, rusqlite::Error> {
                conn.execute_batch(&keying)?;
                if let Err(e) = probe_schema(conn) {
                    return Ok(Err(e));
                }
                conn.execute_batch(CONNECTION_PRAGMAS)?;
                Ok(run_migrations(conn))
            })
            .await;

        match verified {
            Ok(Ok(())) => {
                debug!(path = %path.display(), "opened encrypted store");
                Ok(Self {
                    conn,
                    path: path.to_path_buf(),
                })
            }
            Ok(Err(_)) | Err(_) => {
                let _ = conn.close().await;
                Err(StrongboxError::StoreKeyRejected {
                    path: path.to_path_buf(),
                })
            }
        }
    }

    /// Get a reference to the underlying tokio-rusqlite connection.
    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Close the connection, flushing any pending work.
    pub async fn close(self) -> Result<(), StrongboxError> {
        self.conn.close().await.map_err(StrongboxError::storage)
    }

    /// Row counts of the settings and credential tables.
    pub async fn table_counts(&self) -> Result<TableCounts, StrongboxError> {
        self.conn
            .call(|conn| {
                let settings = conn.query_row("SELECT count(*) FROM settings", [], |r| r.get(0))?;
                let passwords =
                    conn.query_row("SELECT count(*) FROM passwords", [], |r| r.get(0))?;
                Ok(TableCounts {
                    settings,
                    passwords,
                })
            })
            .await
            .map_err(map_tr_err)
    }

    /// Change the store key in place (`PRAGMA rekey`).
    pub async fn rekey(&self, new_key: &StoreKey) -> Result<(), StrongboxError> {
        let sql = Zeroizing::new(format!(
            "PRAGMA rekey = {};",
            quote_literal(new_key.expose_passphrase())
        ));
        self.conn
            .call(move |conn| conn.execute_batch(&sql))
            .await
            .map_err(map_tr_err)
    }

    /// Copy this plaintext store into a new encrypted file at `dest`.
    pub async fn export_encrypted(
        &self,
        dest: &Path,
        key: &StoreKey,
        page_size: u32,
    ) -> Result<(), StrongboxError> {
        let dest = dest.to_string_lossy().into_owned();
        let passphrase = key.expose_passphrase().to_string();
        self.conn
            .call(move |conn| {
                conn.execute(
                    "ATTACH DATABASE ?1 AS encrypted KEY ?2",
                    rusqlite::params![dest, passphrase],
                )?;
                let exported = conn
                    .execute_batch(&format!("PRAGMA encrypted.cipher_page_size = {page_size};"))
                    .and_then(|()| {
                        conn.query_row("SELECT sqlcipher_export('encrypted')", [], |_| Ok(()))
                    });
                // Detach even when the export failed so the connection stays usable.
                conn.execute("DETACH DATABASE encrypted", [])?;
                exported
            })
            .await
            .map_err(map_tr_err)
    }

    /// Cheap liveness query.
    pub async fn ping(&self) -> Result<(), StrongboxError> {
        self.conn
            .call(|conn| conn.query_row("SELECT 1", [], |_| Ok(())))
            .await
            .map_err(map_tr_err)
    }
}

/// Applied to every connection once the schema is readable.
const CONNECTION_PRAGMAS: &str = "PRAGMA journal_mode = DELETE; PRAGMA foreign_keys = ON;";

/// `PRAGMA key` plus page size, as one batch. Must run before any page is read.
fn key_statement(key: &StoreKey, page_size: u32) -> Zeroizing<String> {
    Zeroizing::new(format!(
        "PRAGMA key = {}; PRAGMA cipher_page_size = {page_size};",
        quote_literal(key.expose_passphrase())
    ))
}

/// SQL string literal with embedded quotes doubled.
fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Read the schema table; the first real page access after keying.
fn probe_schema(conn: &rusqlite::Connection) -> Result<(), StrongboxError> {
    conn.query_row("SELECT count(*) FROM sqlite_master", [], |r| r.get::<_, i64>(0))
        .map(|_| ())
        .map_err(StrongboxError::storage)
}

fn is_not_a_database(err: &(dyn std::error::Error + Send + Sync + 'static)) -> bool {
    matches!(
        err.downcast_ref::<rusqlite::Error>(),
        Some(rusqlite::Error::SqliteFailure(e, _)) if e.code == ErrorCode::NotADatabase
    )
}

async fn ensure_parent_dir(path: &Path) -> Result<(), StrongboxError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| StrongboxError::io(parent, e))?;
    }
    Ok(())
}

/// Convert tokio-rusqlite errors to [`StrongboxError::Storage`].
pub fn map_tr_err(e: tokio_rusqlite::Error<rusqlite::Error>) -> StrongboxError {
    StrongboxError::storage(e)
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::SecretString;
    use tempfile::tempdir;

    fn key(pass: &str) -> StoreKey {
        StoreKey::from_master(&SecretString::from(pass.to_string()))
    }

    #[test]
    fn literals_are_quoted() {
        assert_eq!(quote_literal("it's"), "'it''s'");
        let sql = key_statement(&key("pa'ss"), 4096);
        assert_eq!(
            sql.as_str(),
            "PRAGMA key = 'pa''ss'; PRAGMA cipher_page_size = 4096;"
        );
    }

    #[tokio::test]
    async fn fresh_plain_store_has_schema() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("plain.db");
        let db = Database::open_unencrypted(&path).await.unwrap();
        let counts = db.table_counts().await.unwrap();
        assert_eq!(counts, TableCounts { settings: 0, passwords: 0 });
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn keyed_store_rejects_wrong_key_and_plain_open() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("enc.db");
        let db = Database::open_with_key(&path, &key("right-key"), 4096).await.unwrap();
        db.ping().await.unwrap();
        db.close().await.unwrap();

        let err = Database::open_with_key(&path, &key("wrong-key"), 4096)
            .await
            .unwrap_err();
        assert!(matches!(err, StrongboxError::StoreKeyRejected { .. }));

        let err = Database::open_unencrypted(&path).await.unwrap_err();
        assert!(matches!(err, StrongboxError::CipherProtected { .. }));

        let db = Database::open_with_key(&path, &key("right-key"), 4096).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn keyed_open_of_plaintext_file_is_rejected() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("plain.db");
        Database::open_unencrypted(&path).await.unwrap().close().await.unwrap();

        let err = Database::open_with_key(&path, &key("any-key"), 4096)
            .await
            .unwrap_err();
        assert!(matches!(err, StrongboxError::StoreKeyRejected { .. }));
    }

    #[tokio::test]
    async fn rekey_switches_accepted_key() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("enc.db");
        let db = Database::open_with_key(&path, &key("old-key"), 4096).await.unwrap();
        db.rekey(&key("new-key")).await.unwrap();
        db.close().await.unwrap();

        assert!(Database::open_with_key(&path, &key("old-key"), 4096).await.is_err());
        let db = Database::open_with_key(&path, &key("new-key"), 4096).await.unwrap();
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn export_produces_keyed_copy() {
        let dir = tempdir().unwrap();
        let plain = dir.path().join("plain.db");
        let dest = dir.path().join("copy.db");

        let db = Database::open_unencrypted(&plain).await.unwrap();
        db.connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO settings (key, value) VALUES ('password_salt', 'abcd')",
                    [],
                )
            })
            .await
            .unwrap();
        db.export_encrypted(&dest, &key("export-key"), 4096).await.unwrap();
        db.close().await.unwrap();

        let copy = Database::open_with_key(&dest, &key("export-key"), 4096).await.unwrap();
        assert_eq!(copy.table_counts().await.unwrap().settings, 1);
        copy.close().await.unwrap();
    }
}
