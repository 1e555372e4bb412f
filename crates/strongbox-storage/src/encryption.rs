// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Store encryption state machine.
//!
//! [`StoreEncryption`] owns the live connection and performs the only legal
//! transitions between [`StoreEncryptionState`]s:
//!
//! ```text
//! Uninitialized --open_unencrypted--> PlaintextOpen --migrate--> EncryptedOpen
//! Uninitialized --open_with_key (new file)--> EncryptedOpen
//! EncryptedLocked --open_with_key (right key)--> EncryptedOpen
//! EncryptedLocked --open_with_key (wrong key)--> EncryptedLocked
//! EncryptedOpen --rekey ok--> EncryptedOpen (new key)
//! EncryptedOpen --rekey failed--> EncryptedOpen (old key, restored) | Fatal
//! ```
//!
//! `Uninitialized` also covers a plaintext file that exists but is not open.
//! None of these operations touch the field salt or the field key.

use std::path::{Path, PathBuf};

use strongbox_config::StorageConfig;
use strongbox_core::{StoreEncryptionState, StrongboxError};
use strongbox_vault::StoreKey;
use tracing::{error, info, warn};

use crate::database::{Database, TableCounts};
use crate::detect::has_plaintext_header;

/// Where the store lives and how its file is laid out.
#[derive(Debug, Clone)]
pub struct StoreOptions {
    pub path: PathBuf,
    pub page_size: u32,
    pub backup_dir: PathBuf,
}

impl StoreOptions {
    pub fn from_config(config: &StorageConfig) -> Self {
        Self {
            path: PathBuf::from(&config.database_path),
            page_size: config.cipher_page_size,
            backup_dir: config.resolved_backup_dir(),
        }
    }
}

/// Failure injected into the next migrate or rekey. Only settable from tests.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum InjectedFault {
    #[default]
    None,
    /// Closing the plaintext connection before the swap fails.
    MigrateClose,
    /// Post-rekey verification reports a mismatch.
    RekeyVerify,
    /// Verification fails and so does restoring the snapshot.
    RekeyRestore,
}

/// Owner of the store connection and its encryption state.
pub struct StoreEncryption {
    options: StoreOptions,
    state: StoreEncryptionState,
    db: Option<Database>,
    #[cfg(test)]
    fault: InjectedFault,
}

impl std::fmt::Debug for StoreEncryption {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StoreEncryption")
            .field("path", &self.options.path)
            .field("state", &self.state)
            .finish()
    }
}

impl StoreEncryption {
    /// Create the state machine for a store path. No connection is opened.
    pub fn new(options: StoreOptions) -> Self {
        let state = initial_state(&options.path);
        Self {
            options,
            state,
            db: None,
            #[cfg(test)]
            fault: InjectedFault::None,
        }
    }

    pub fn state(&self) -> &StoreEncryptionState {
        &self.state
    }

    pub fn options(&self) -> &StoreOptions {
        &self.options
    }

    pub fn path(&self) -> &Path {
        &self.options.path
    }

    /// The live connection, if records may be read and written.
    pub fn database(&self) -> Result<&Database, StrongboxError> {
        if !self.state.allows_records() {
            return Err(StrongboxError::StoreUnavailable(format!(
                "store is {}",
                describe(&self.state)
            )));
        }
        self.db
            .as_ref()
            .ok_or_else(|| StrongboxError::StoreUnavailable("no live connection".to_string()))
    }

    /// Open the store with no cipher.
    ///
    /// On a cipher-protected file the state becomes `EncryptedLocked` and
    /// [`StrongboxError::CipherProtected`] is returned.
    pub async fn open_unencrypted(&mut self) -> Result<(), StrongboxError> {
        if matches!(self.state, StoreEncryptionState::Fatal { .. }) {
            return Err(self.illegal("open unencrypted"));
        }
        match Database::open_unencrypted(&self.options.path).await {
            Ok(db) => {
                self.replace_connection(db).await;
                self.state = StoreEncryptionState::PlaintextOpen;
                info!(path = %self.options.path.display(), "store opened without encryption");
                Ok(())
            }
            Err(e @ StrongboxError::CipherProtected { .. }) => {
                self.state = StoreEncryptionState::EncryptedLocked;
                Err(e)
            }
            Err(e) => Err(e),
        }
    }

    /// Open the store with `key`, creating an encrypted store if no file exists.
    ///
    /// On failure the previous connection and state are kept. A `Fatal` store
    /// stays fatal and the error names the kept snapshot.
    pub async fn open_with_key(&mut self, key: &StoreKey) -> Result<(), StrongboxError> {
        if let StoreEncryptionState::Fatal { backup_path } = &self.state {
            error!(
                backup = %backup_path.display(),
                "refusing to open store after incomplete rekey rollback"
            );
            return Err(StrongboxError::RekeyVerificationFailed {
                backup_path: backup_path.clone(),
            });
        }
        let db = Database::open_with_key(&self.options.path, key, self.options.page_size).await?;
        self.replace_connection(db).await;
        self.state = StoreEncryptionState::EncryptedOpen;
        info!(path = %self.options.path.display(), "encrypted store opened");
        Ok(())
    }

    /// Convert the open plaintext store into an encrypted one under `key`.
    ///
    /// The encrypted copy is written to a temporary sibling file and verified
    /// by reopening it with `key` before it replaces the plaintext file. A
    /// failure before the swap leaves the plaintext store open and unchanged.
    pub async fn migrate_plaintext_to_encrypted(
        &mut self,
        key: &StoreKey,
    ) -> Result<(), StrongboxError> {
        if self.state != StoreEncryptionState::PlaintextOpen {
            return Err(self.illegal("migrate"));
        }
        let path = self.options.path.clone();
        let page_size = self.options.page_size;
        let temp = sibling(&path, "encrypting");

        {
            let db = self.database()?;
            let before = db.table_counts().await?;
            remove_if_exists(&temp).await?;
            if let Err(e) = export_and_verify(db, &temp, key, page_size, before).await {
                warn!(error = %e, "encrypted copy failed verification, keeping plaintext store");
                if let Err(cleanup) = remove_if_exists(&temp).await {
                    warn!(error = %cleanup, path = %temp.display(), "could not remove temporary copy");
                }
                return Err(e);
            }
        }

        if let Some(db) = self.db.take() {
            let closed = match self.take_fault() {
                InjectedFault::MigrateClose => {
                    let _ = db.close().await;
                    Err(StrongboxError::Internal("injected close failure".to_string()))
                }
                _ => db.close().await,
            };
            if let Err(e) = closed {
                warn!(error = %e, "could not close plaintext store before swap, keeping it");
                if let Err(cleanup) = remove_if_exists(&temp).await {
                    warn!(error = %cleanup, path = %temp.display(), "could not remove temporary copy");
                }
                self.reopen_plaintext().await;
                return Err(e);
            }
        }

        if let Err(e) = tokio::fs::rename(&temp, &path).await {
            warn!(error = %e, "could not replace plaintext store, reopening it");
            if let Err(cleanup) = remove_if_exists(&temp).await {
                warn!(error = %cleanup, path = %temp.display(), "could not remove temporary copy");
            }
            self.reopen_plaintext().await;
            return Err(StrongboxError::io(&path, e));
        }

        match Database::open_with_key(&path, key, page_size).await {
            Ok(db) => {
                self.db = Some(db);
                self.state = StoreEncryptionState::EncryptedOpen;
                info!(path = %path.display(), "plaintext store migrated to encrypted");
                Ok(())
            }
            Err(e) => {
                self.state = StoreEncryptionState::EncryptedLocked;
                Err(e)
            }
        }
    }

    /// Change the store key from `old` to `new`.
    ///
    /// A snapshot is copied to the backup directory first. After `PRAGMA rekey`
    /// the store is closed, reopened with `new`, and its row counts compared to
    /// the pre-rekey counts. On any failure the snapshot is restored and the
    /// store reopened with `old` ([`StrongboxError::RekeyFailed`]); if that
    /// also fails the state becomes `Fatal` and the snapshot is kept
    /// ([`StrongboxError::RekeyVerificationFailed`]). The snapshot is removed
    /// only after the store verifies under one of the two keys.
    pub async fn rekey(&mut self, old: &StoreKey, new: &StoreKey) -> Result<(), StrongboxError> {
        if self.state != StoreEncryptionState::EncryptedOpen {
            return Err(self.illegal("rekey"));
        }
        let db = self
            .db
            .take()
            .ok_or_else(|| StrongboxError::StoreUnavailable("no live connection".to_string()))?;

        let before = match db.table_counts().await {
            Ok(counts) => counts,
            Err(e) => {
                self.db = Some(db);
                return Err(e);
            }
        };

        let backup = self.backup_path();
        if let Err(e) = snapshot(&self.options.path, &backup).await {
            self.db = Some(db);
            return Err(e);
        }
        info!(backup = %backup.display(), "store snapshot taken before rekey");

        let fault = self.take_fault();
        let fail_verify = matches!(fault, InjectedFault::RekeyVerify | InjectedFault::RekeyRestore);
        match rekey_and_verify(db, &self.options, new, before, fail_verify).await {
            Ok(db) => {
                self.db = Some(db);
                discard_backup(&backup).await;
                info!(path = %self.options.path.display(), "store rekeyed");
                Ok(())
            }
            Err(cause) => {
                self.roll_back(old, &backup, before, cause, fault == InjectedFault::RekeyRestore)
                    .await
            }
        }
    }

    /// Close the connection, leaving the store locked.
    pub async fn close(&mut self) -> Result<(), StrongboxError> {
        if let Some(db) = self.db.take() {
            db.close().await?;
        }
        self.state = match &self.state {
            StoreEncryptionState::EncryptedOpen => StoreEncryptionState::EncryptedLocked,
            StoreEncryptionState::PlaintextOpen => StoreEncryptionState::Uninitialized,
            other => other.clone(),
        };
        Ok(())
    }

    async fn roll_back(
        &mut self,
        old: &StoreKey,
        backup: &Path,
        before: TableCounts,
        cause: StrongboxError,
        fail_restore: bool,
    ) -> Result<(), StrongboxError> {
        warn!(error = %cause, backup = %backup.display(), "rekey failed, restoring snapshot");

        let restored = if fail_restore {
            Err(StrongboxError::Internal("injected restore failure".to_string()))
        } else {
            restore_snapshot(&self.options, backup, old, before).await
        };

        match restored {
            Ok(db) => {
                self.db = Some(db);
                self.state = StoreEncryptionState::EncryptedOpen;
                discard_backup(backup).await;
                warn!("store restored under the previous key");
                Err(StrongboxError::RekeyFailed {
                    reason: cause.to_string(),
                })
            }
            Err(restore_err) => {
                error!(
                    error = %restore_err,
                    backup = %backup.display(),
                    "rollback after failed rekey did not complete; manual recovery required"
                );
                self.state = StoreEncryptionState::Fatal {
                    backup_path: backup.to_path_buf(),
                };
                Err(StrongboxError::RekeyVerificationFailed {
                    backup_path: backup.to_path_buf(),
                })
            }
        }
    }

    /// Reattach the plaintext connection after an aborted migrate.
    async fn reopen_plaintext(&mut self) {
        match Database::open_unencrypted(&self.options.path).await {
            Ok(db) => self.db = Some(db),
            Err(e) => {
                error!(error = %e, "could not reopen plaintext store");
                self.state = StoreEncryptionState::Uninitialized;
            }
        }
    }

    async fn replace_connection(&mut self, db: Database) {
        if let Some(previous) = self.db.replace(db)
            && let Err(e) = previous.close().await
        {
            warn!(error = %e, "failed to close previous store connection");
        }
    }

    fn backup_path(&self) -> PathBuf {
        let name = file_name(&self.options.path);
        let stamp = chrono::Utc::now().format("%Y%m%d%H%M%S%3f");
        self.options.backup_dir.join(format!("{name}.bak.{stamp}"))
    }

    fn illegal(&self, operation: &str) -> StrongboxError {
        StrongboxError::StoreUnavailable(format!(
            "cannot {operation} while store is {}",
            describe(&self.state)
        ))
    }

    #[cfg(test)]
    fn take_fault(&mut self) -> InjectedFault {
        std::mem::take(&mut self.fault)
    }

    #[cfg(not(test))]
    fn take_fault(&mut self) -> InjectedFault {
        InjectedFault::None
    }
}

fn initial_state(path: &Path) -> StoreEncryptionState {
    if !path.exists() {
        return StoreEncryptionState::Uninitialized;
    }
    match has_plaintext_header(path) {
        Ok(true) => StoreEncryptionState::Uninitialized,
        Ok(false) => StoreEncryptionState::EncryptedLocked,
        Err(e) => {
            warn!(error = %e, "could not read store header");
            StoreEncryptionState::EncryptedLocked
        }
    }
}

fn describe(state: &StoreEncryptionState) -> String {
    match state {
        StoreEncryptionState::Uninitialized => "not open".to_string(),
        StoreEncryptionState::PlaintextOpen => "open without encryption".to_string(),
        StoreEncryptionState::EncryptedLocked => "locked".to_string(),
        StoreEncryptionState::EncryptedOpen => "open".to_string(),
        StoreEncryptionState::Fatal { backup_path } => {
            format!("unusable after a failed rekey (backup at {})", backup_path.display())
        }
    }
}

async fn export_and_verify(
    db: &Database,
    temp: &Path,
    key: &StoreKey,
    page_size: u32,
    before: TableCounts,
) -> Result<(), StrongboxError> {
    db.export_encrypted(temp, key, page_size).await?;
    let copy = Database::open_with_key(temp, key, page_size).await?;
    let after = copy.table_counts().await;
    copy.close().await?;
    let after = after?;
    if after != before {
        return Err(StrongboxError::CorruptionSuspected(format!(
            "encrypted copy has {after:?}, expected {before:?}"
        )));
    }
    Ok(())
}

async fn rekey_and_verify(
    db: Database,
    options: &StoreOptions,
    new: &StoreKey,
    before: TableCounts,
    inject_failure: bool,
) -> Result<Database, StrongboxError> {
    if let Err(e) = db.rekey(new).await {
        let _ = db.close().await;
        return Err(e);
    }
    db.close().await?;

    let reopened = Database::open_with_key(&options.path, new, options.page_size).await?;
    let verified = match reopened.table_counts().await {
        Ok(_) if inject_failure => Err(StrongboxError::CorruptionSuspected(
            "injected verification failure".to_string(),
        )),
        Ok(after) if after == before => Ok(()),
        Ok(after) => Err(StrongboxError::CorruptionSuspected(format!(
            "row counts changed across rekey: {before:?} -> {after:?}"
        ))),
        Err(e) => Err(e),
    };

    match verified {
        Ok(()) => Ok(reopened),
        Err(e) => {
            let _ = reopened.close().await;
            Err(e)
        }
    }
}

/// Copy `backup` over the store and reopen it with `old`, checking row counts.
async fn restore_snapshot(
    options: &StoreOptions,
    backup: &Path,
    old: &StoreKey,
    before: TableCounts,
) -> Result<Database, StrongboxError> {
    tokio::fs::copy(backup, &options.path)
        .await
        .map_err(|e| StrongboxError::io(&options.path, e))?;
    let db = Database::open_with_key(&options.path, old, options.page_size).await?;
    match db.table_counts().await {
        Ok(counts) if counts == before => Ok(db),
        Ok(counts) => {
            let _ = db.close().await;
            Err(StrongboxError::CorruptionSuspected(format!(
                "restored store has {counts:?}, expected {before:?}"
            )))
        }
        Err(e) => {
            let _ = db.close().await;
            Err(e)
        }
    }
}

async fn snapshot(path: &Path, backup: &Path) -> Result<(), StrongboxError> {
    if let Some(dir) = backup.parent()
        && !dir.as_os_str().is_empty()
    {
        tokio::fs::create_dir_all(dir)
            .await
            .map_err(|e| StrongboxError::io(dir, e))?;
    }
    tokio::fs::copy(path, backup)
        .await
        .map(|_| ())
        .map_err(|e| StrongboxError::io(backup, e))
}

async fn discard_backup(backup: &Path) {
    if let Err(e) = tokio::fs::remove_file(backup).await {
        warn!(error = %e, backup = %backup.display(), "could not remove rekey snapshot");
    }
}

async fn remove_if_exists(path: &Path) -> Result<(), StrongboxError> {
    match tokio::fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(StrongboxError::io(path, e)),
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "store.db".to_string())
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    path.with_file_name(format!("{}.{suffix}", file_name(path)))
}
