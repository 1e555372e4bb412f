// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! The `Strongbox` facade: login, password change, and credential CRUD.
//!
//! The store sits behind a `tokio::sync::RwLock`. Login, password change and
//! reconnect hold the write guard for their whole duration, backup and
//! verification included. Record operations share the read guard, so they run
//! concurrently with each other and never overlap a migrate or rekey.

use std::path::PathBuf;

use secrecy::{ExposeSecret, SecretString};
use strongbox_config::StrongboxConfig;
use strongbox_core::{
    CredentialRecord, HealthStatus, LoginState, NewCredential, SetupReason, SetupState,
    StoreEncryptionState, StrongboxError,
};
use strongbox_storage::queries::credentials::{
    delete_credential, get_credential, insert_credential, list_credentials, search_credentials,
    update_credential,
};
use strongbox_storage::queries::settings::{get_setting, insert_setting_if_absent, set_setting};
use strongbox_storage::{
    Database, StoreEncryption, StoreOptions, detect_setup_state, setting_keys,
};
use strongbox_vault::{
    MasterPasswordSession, StoreKey, hash_master_password, verify_master_password,
};
use strum::Display;
use tokio::sync::{RwLock, RwLockReadGuard};
use tracing::{debug, info, warn};

use crate::records;
use crate::token::{SessionToken, TokenClaims, TokenIssuer};

/// What a successful login did and the token it issued.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    pub state: LoginState,
    pub token: SessionToken,
}

/// Coarse answer to "does this store still need a master password?".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "snake_case")]
pub enum FirstTimeReason {
    FirstTimeSetup,
    AlreadyConfigured,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FirstTimeStatus {
    pub first_time: bool,
    pub reason: FirstTimeReason,
    /// The detailed detection result behind `reason`.
    pub detected: SetupState,
}

/// A Strongbox credential store bound to one configuration.
pub struct Strongbox {
    config: StrongboxConfig,
    store: RwLock<StoreEncryption>,
    session: MasterPasswordSession,
    tokens: TokenIssuer,
}

impl std::fmt::Debug for Strongbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Strongbox")
            .field("database_path", &self.config.storage.database_path)
            .field("session", &self.session)
            .finish()
    }
}

impl Strongbox {
    /// Build a service for `config`. Nothing is opened until [`Strongbox::login`].
    pub fn new(config: StrongboxConfig) -> Result<Self, StrongboxError> {
        let tokens = TokenIssuer::from_config(&config.security)?;
        let store = StoreEncryption::new(StoreOptions::from_config(&config.storage));
        debug!(path = %config.storage.database_path, state = ?store.state(), "strongbox created");
        Ok(Self {
            config,
            store: RwLock::new(store),
            session: MasterPasswordSession::new(),
            tokens,
        })
    }

    pub fn config(&self) -> &StrongboxConfig {
        &self.config
    }

    pub fn session(&self) -> &MasterPasswordSession {
        &self.session
    }

    pub async fn encryption_state(&self) -> StoreEncryptionState {
        self.store.read().await.state().clone()
    }

    /// Inspect the store file without opening it.
    pub async fn detect(&self) -> Result<SetupState, StrongboxError> {
        let path = PathBuf::from(&self.config.storage.database_path);
        let min_size = self.config.storage.min_store_size;
        tokio::task::spawn_blocking(move || detect_setup_state(&path, min_size))
            .await
            .map_err(|e| StrongboxError::Internal(format!("detection task failed: {e}")))?
    }

    pub async fn check_first_time(&self) -> Result<FirstTimeStatus, StrongboxError> {
        let detected = self.detect().await?;
        let first_time = detected.is_first_time();
        Ok(FirstTimeStatus {
            first_time,
            reason: if first_time {
                FirstTimeReason::FirstTimeSetup
            } else {
                FirstTimeReason::AlreadyConfigured
            },
            detected,
        })
    }

    /// Set up, convert, or unlock the store with `master`.
    ///
    /// Which of the three happens is decided by detection. Repeating a login
    /// with the same password on an open store reopens it and changes nothing.
    pub async fn login(&self, master: SecretString) -> Result<LoginOutcome, StrongboxError> {
        self.validate_master(&master)?;
        let mut store = self.store.write().await;
        let key = StoreKey::from_master(&master);

        let state = match self.detect().await? {
            SetupState::FirstTimeSetup { reason } => {
                self.first_time_setup(&mut store, &key, reason).await?;
                LoginState::FirstTimeSetup
            }
            SetupState::AlreadyConfiguredUnencrypted => {
                self.convert_plaintext(&mut store, &master, &key).await?;
                LoginState::Converted
            }
            SetupState::EncryptedConfigured => {
                match store.open_with_key(&key).await {
                    Ok(()) => {}
                    Err(StrongboxError::StoreKeyRejected { .. }) => {
                        warn!("login rejected: master password does not open the store");
                        return Err(StrongboxError::WrongPassword);
                    }
                    Err(e) => return Err(e),
                }
                LoginState::Authenticated
            }
        };

        self.backfill_settings(store.database()?, &master).await?;
        self.session.set(master);
        let token = self.tokens.issue()?;
        info!(state = %state, "login succeeded");
        Ok(LoginOutcome { state, token })
    }

    /// Change the master password, rekeying the store.
    ///
    /// The field key does not change: its secret is pinned in `encryption_key`
    /// before the rekey. If the rekey fails the session keeps the old password;
    /// once it succeeds the session holds the new one, even if a later step
    /// fails.
    pub async fn change_master_password(
        &self,
        current: SecretString,
        new: SecretString,
    ) -> Result<SessionToken, StrongboxError> {
        self.validate_master(&new)?;
        if current.expose_secret() == new.expose_secret() {
            return Err(StrongboxError::InputInvalid(
                "new master password must differ from the current one".to_string(),
            ));
        }

        let mut store = self.store.write().await;
        let old_key = StoreKey::from_master(&current);
        let new_key = StoreKey::from_master(&new);

        if !self.session.matches(current.expose_secret()) || !store.state().allows_records() {
            match store.open_with_key(&old_key).await {
                Ok(()) => {}
                Err(StrongboxError::StoreKeyRejected { .. }) => {
                    warn!("password change rejected: current password does not open the store");
                    return Err(StrongboxError::WrongCurrentPassword);
                }
                Err(e) => return Err(e),
            }
        }

        pin_field_secret(store.database()?, &current).await?;
        store.rekey(&old_key, &new_key).await?;
        self.session.set(new.clone());

        let db = store.database()?;
        let hash = self.hash_password(&new).await?;
        set_setting(db, setting_keys::MASTER_PASSWORD, &hash).await?;
        self_test(db, &new).await?;

        info!("master password changed");
        self.tokens.issue()
    }

    /// Check a session token and require a live session.
    pub fn authorize(&self, token: &str) -> Result<TokenClaims, StrongboxError> {
        let claims = self.tokens.verify(token)?;
        if !self.session.is_authenticated() {
            return Err(StrongboxError::SessionExpired);
        }
        Ok(claims)
    }

    pub async fn create_record(
        &self,
        input: NewCredential,
    ) -> Result<CredentialRecord, StrongboxError> {
        records::validate(&input)?;
        let (store, master) = self.usable_store().await?;
        let db = store.database()?;

        let key = records::field_key(db, &master, true).await?;
        let row = records::seal_row(&input, &key)?;
        let stored = insert_credential(db, &row).await?;
        debug!(id = stored.id, "credential created");
        Ok(records::reveal(stored, Some(input.password)))
    }

    pub async fn read_record(&self, id: i64) -> Result<CredentialRecord, StrongboxError> {
        let (store, master) = self.usable_store().await?;
        let db = store.database()?;

        let stored = get_credential(db, id)
            .await?
            .ok_or(StrongboxError::NotFound(id))?;
        records::reveal_all(db, &master, vec![stored])
            .await?
            .pop()
            .ok_or(StrongboxError::NotFound(id))
    }

    /// All credentials, oldest first.
    pub async fn list_records(&self) -> Result<Vec<CredentialRecord>, StrongboxError> {
        let (store, master) = self.usable_store().await?;
        let db = store.database()?;

        let rows = list_credentials(db).await?;
        records::reveal_all(db, &master, rows).await
    }

    /// Credentials whose name contains `query`.
    pub async fn search_by_name(
        &self,
        query: &str,
    ) -> Result<Vec<CredentialRecord>, StrongboxError> {
        let (store, master) = self.usable_store().await?;
        let db = store.database()?;

        let rows = search_credentials(db, query).await?;
        debug!(matches = rows.len(), "credential search");
        records::reveal_all(db, &master, rows).await
    }

    pub async fn update_record(
        &self,
        id: i64,
        input: NewCredential,
    ) -> Result<CredentialRecord, StrongboxError> {
        records::validate(&input)?;
        let (store, master) = self.usable_store().await?;
        let db = store.database()?;

        let key = records::field_key(db, &master, true).await?;
        let row = records::seal_row(&input, &key)?;
        let stored = update_credential(db, id, &row)
            .await?
            .ok_or(StrongboxError::NotFound(id))?;
        debug!(id, "credential updated");
        Ok(records::reveal(stored, Some(input.password)))
    }

    pub async fn delete_record(&self, id: i64) -> Result<(), StrongboxError> {
        let (store, _) = self.usable_store().await?;
        if !delete_credential(store.database()?, id).await? {
            return Err(StrongboxError::NotFound(id));
        }
        debug!(id, "credential deleted");
        Ok(())
    }

    /// Store liveness as seen by this instance.
    pub async fn health_check(&self) -> HealthStatus {
        let store = self.store.read().await;
        match store.state() {
            StoreEncryptionState::Fatal { backup_path } => HealthStatus::Unhealthy(format!(
                "rekey rollback incomplete, backup at {}",
                backup_path.display()
            )),
            state if state.allows_records() => {
                let alive = match store.database() {
                    Ok(db) => db.ping().await,
                    Err(e) => Err(e),
                };
                match alive {
                    Ok(()) if self.session.is_authenticated() => HealthStatus::Healthy,
                    Ok(()) => HealthStatus::Degraded("no master password in session".to_string()),
                    Err(e) => HealthStatus::Unhealthy(e.to_string()),
                }
            }
            _ => HealthStatus::Degraded("store is not open".to_string()),
        }
    }

    /// Read guard on a usable store plus the session password, reconnecting
    /// once if the connection is missing or fails a ping.
    ///
    /// The password is read while the guard is held, so it always matches the
    /// key the store was last opened or rekeyed with.
    async fn usable_store(
        &self,
    ) -> Result<(RwLockReadGuard<'_, StoreEncryption>, SecretString), StrongboxError> {
        {
            let store = self.store.read().await;
            let master = self.session.require()?;
            let alive = match store.database() {
                Ok(db) => db.ping().await,
                Err(e) => Err(e),
            };
            match alive {
                Ok(()) => return Ok((store, master)),
                Err(e) => warn!(error = %e, "store not usable, reconnecting with session password"),
            }
        }

        self.reconnect().await?;
        let store = self.store.read().await;
        let master = self.session.require()?;
        store.database()?;
        Ok((store, master))
    }

    async fn reconnect(&self) -> Result<(), StrongboxError> {
        let mut store = self.store.write().await;
        let master = self.session.require()?;

        let alive = match store.database() {
            Ok(db) => db.ping().await.is_ok(),
            Err(_) => false,
        };
        if alive {
            return Ok(());
        }
        if let StoreEncryptionState::Fatal { .. } = store.state() {
            return Err(store
                .database()
                .err()
                .unwrap_or_else(|| StrongboxError::StoreUnavailable("store is unusable".to_string())));
        }
        if !store.path().exists() {
            return Err(StrongboxError::StoreUnavailable(format!(
                "store file {} is missing",
                store.path().display()
            )));
        }

        match store.open_with_key(&StoreKey::from_master(&master)).await {
            Ok(()) => {
                info!("store reconnected");
                Ok(())
            }
            Err(StrongboxError::StoreKeyRejected { .. }) => Err(StrongboxError::WrongPassword),
            Err(e) => Err(e),
        }
    }

    async fn first_time_setup(
        &self,
        store: &mut StoreEncryption,
        key: &StoreKey,
        reason: SetupReason,
    ) -> Result<(), StrongboxError> {
        store.close().await?;
        match reason {
            SetupReason::StoreMissing => {}
            SetupReason::StoreEmpty => {
                warn!(path = %store.path().display(), "replacing undersized store file");
                tokio::fs::remove_file(store.path())
                    .await
                    .map_err(|e| StrongboxError::io(store.path(), e))?;
            }
            SetupReason::NotEncrypted => {
                store.open_unencrypted().await?;
                store.migrate_plaintext_to_encrypted(key).await?;
            }
        }
        if store.state() != &StoreEncryptionState::EncryptedOpen {
            store.open_with_key(key).await?;
        }
        info!(reason = %reason, "new encrypted store set up");
        Ok(())
    }

    async fn convert_plaintext(
        &self,
        store: &mut StoreEncryption,
        master: &SecretString,
        key: &StoreKey,
    ) -> Result<(), StrongboxError> {
        store.close().await?;
        store.open_unencrypted().await?;

        let reference = get_setting(store.database()?, setting_keys::MASTER_PASSWORD)
            .await?
            .unwrap_or_default();
        if !self.verify_password(master, reference).await? {
            store.close().await?;
            warn!("login rejected: password does not match the stored reference hash");
            return Err(StrongboxError::WrongPassword);
        }

        store.migrate_plaintext_to_encrypted(key).await?;
        info!("plaintext store converted");
        Ok(())
    }

    /// Fill in settings a store may lack: pinned field secret, reference hash
    /// (upgrading legacy digests), salt, and field key check.
    async fn backfill_settings(
        &self,
        db: &Database,
        master: &SecretString,
    ) -> Result<(), StrongboxError> {
        pin_field_secret(db, master).await?;

        let needs_hash = match get_setting(db, setting_keys::MASTER_PASSWORD).await? {
            None => true,
            Some(hash) => hash.trim().is_empty() || strongbox_vault::hash::is_legacy_digest(hash.trim()),
        };
        if needs_hash {
            let hash = self.hash_password(master).await?;
            set_setting(db, setting_keys::MASTER_PASSWORD, &hash).await?;
            info!("reference password hash written");
        }

        match records::field_key(db, master, true).await {
            Ok(key) => records::write_sentinel_if_absent(db, &key).await,
            Err(e) => {
                warn!(error = %e, "field key unavailable, skipping field key check");
                Ok(())
            }
        }
    }

    fn validate_master(&self, password: &SecretString) -> Result<(), StrongboxError> {
        let min = self.config.security.min_password_length;
        let len = password.expose_secret().chars().count();
        if len < min {
            return Err(StrongboxError::InputInvalid(format!(
                "master password must be at least {min} characters, got {len}"
            )));
        }
        Ok(())
    }

    async fn hash_password(&self, password: &SecretString) -> Result<String, StrongboxError> {
        let password = password.clone();
        let vault = self.config.vault.clone();
        tokio::task::spawn_blocking(move || hash_master_password(password.expose_secret(), &vault))
            .await
            .map_err(|e| StrongboxError::Internal(format!("hashing task failed: {e}")))?
    }

    async fn verify_password(
        &self,
        password: &SecretString,
        reference: String,
    ) -> Result<bool, StrongboxError> {
        if reference.trim().is_empty() {
            return Ok(false);
        }
        let password = password.clone();
        tokio::task::spawn_blocking(move || verify_master_password(password.expose_secret(), &reference))
            .await
            .map_err(|e| StrongboxError::Internal(format!("verification task failed: {e}")))?
    }
}

/// Pin the field secret to `secret` unless one is already pinned.
async fn pin_field_secret(db: &Database, secret: &SecretString) -> Result<(), StrongboxError> {
    if get_setting(db, setting_keys::ENCRYPTION_KEY).await?.is_none()
        && insert_setting_if_absent(db, setting_keys::ENCRYPTION_KEY, secret.expose_secret()).await?
    {
        info!("field secret pinned");
    }
    Ok(())
}

/// After a password change, the field key must still open the sentinel.
async fn self_test(db: &Database, session: &SecretString) -> Result<(), StrongboxError> {
    let key = records::field_key(db, session, true).await?;
    match records::check_sentinel(db, &key).await? {
        Some(true) => Ok(()),
        Some(false) => Err(StrongboxError::CorruptionSuspected(
            "field key check failed after password change".to_string(),
        )),
        None => records::write_sentinel_if_absent(db, &key).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_config::VaultConfig;
    use tempfile::{TempDir, tempdir};

    fn secret(s: &str) -> SecretString {
        SecretString::from(s.to_string())
    }

    fn config(dir: &TempDir) -> StrongboxConfig {
        let mut config = StrongboxConfig::default();
        config.storage.database_path = dir
            .path()
            .join("passwordManager.db")
            .to_string_lossy()
            .into_owned();
        config.security.token_secret = Some("t".repeat(32));
        config.vault = VaultConfig {
            kdf_memory_cost: 32768,
            kdf_iterations: 2,
            kdf_parallelism: 1,
        };
        config
    }

    fn credential(name: &str, password: &str) -> NewCredential {
        NewCredential {
            name: name.to_string(),
            username: "alice".to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn short_password_rejected_before_anything_happens() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        let err = sb.login(secret("12345")).await.unwrap_err();
        assert!(matches!(err, StrongboxError::InputInvalid(_)));
        assert!(!dir.path().join("passwordManager.db").exists());
        assert_eq!(sb.encryption_state().await, StoreEncryptionState::Uninitialized);
    }

    #[tokio::test]
    async fn first_login_sets_up_and_writes_settings() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        assert!(sb.check_first_time().await.unwrap().first_time);

        let outcome = sb.login(secret("correct horse")).await.unwrap();
        assert_eq!(outcome.state, LoginState::FirstTimeSetup);
        assert!(sb.authorize(outcome.token.as_str()).is_ok());

        let status = sb.check_first_time().await.unwrap();
        assert_eq!(status.reason, FirstTimeReason::AlreadyConfigured);

        let store = sb.store.read().await;
        let db = store.database().unwrap();
        for key in [
            setting_keys::PASSWORD_SALT,
            setting_keys::ENCRYPTION_KEY,
            setting_keys::MASTER_PASSWORD,
            setting_keys::FIELD_KEY_CHECK,
        ] {
            assert!(get_setting(db, key).await.unwrap().is_some(), "{key} missing");
        }
        let hash = get_setting(db, setting_keys::MASTER_PASSWORD).await.unwrap().unwrap();
        assert!(hash.starts_with("$argon2id$"));
    }

    #[tokio::test]
    async fn crud_roundtrip() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        sb.login(secret("correct horse")).await.unwrap();

        let created = sb.create_record(credential("GitHub", "gh-pass")).await.unwrap();
        assert_eq!(created.password.as_deref(), Some("gh-pass"));

        let read = sb.read_record(created.id).await.unwrap();
        assert_eq!(read, created);

        let updated = sb
            .update_record(created.id, credential("GitHub (work)", "rotated"))
            .await
            .unwrap();
        assert_eq!(updated.name, "GitHub (work)");
        assert_eq!(updated.password.as_deref(), Some("rotated"));

        assert_eq!(sb.search_by_name("work").await.unwrap().len(), 1);
        sb.delete_record(created.id).await.unwrap();
        assert!(matches!(
            sb.read_record(created.id).await.unwrap_err(),
            StrongboxError::NotFound(_)
        ));
        assert!(matches!(
            sb.delete_record(created.id).await.unwrap_err(),
            StrongboxError::NotFound(_)
        ));
        assert!(sb.list_records().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn envelope_on_disk_is_not_plaintext() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        sb.login(secret("correct horse")).await.unwrap();
        let created = sb.create_record(credential("Mail", "visible?")).await.unwrap();

        let store = sb.store.read().await;
        let stored = get_credential(store.database().unwrap(), created.id)
            .await
            .unwrap()
            .unwrap();
        assert_ne!(stored.password, "visible?");
        assert!(!stored.password.contains("visible"));
    }

    #[tokio::test]
    async fn records_need_a_session() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        assert!(matches!(
            sb.list_records().await.unwrap_err(),
            StrongboxError::SessionExpired
        ));
        assert!(matches!(
            sb.create_record(credential("x", "y")).await.unwrap_err(),
            StrongboxError::SessionExpired
        ));
    }

    #[tokio::test]
    async fn lost_connection_is_reopened_with_session_password() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        sb.login(secret("correct horse")).await.unwrap();
        sb.create_record(credential("A", "1")).await.unwrap();

        sb.store.write().await.close().await.unwrap();
        assert_eq!(sb.encryption_state().await, StoreEncryptionState::EncryptedLocked);

        let all = sb.list_records().await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(sb.encryption_state().await, StoreEncryptionState::EncryptedOpen);
    }

    #[tokio::test]
    async fn change_password_keeps_field_key() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        sb.login(secret("first-pass")).await.unwrap();
        let created = sb.create_record(credential("Bank", "pin-1234")).await.unwrap();

        let err = sb
            .change_master_password(secret("not-the-pass"), secret("second-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, StrongboxError::WrongCurrentPassword));

        let token = sb
            .change_master_password(secret("first-pass"), secret("second-pass"))
            .await
            .unwrap();
        assert!(sb.authorize(token.as_str()).is_ok());
        assert!(sb.session().matches("second-pass"));
        assert_eq!(
            sb.read_record(created.id).await.unwrap().password.as_deref(),
            Some("pin-1234")
        );

        let fresh = Strongbox::new(config(&dir)).unwrap();
        assert!(matches!(
            fresh.login(secret("first-pass")).await.unwrap_err(),
            StrongboxError::WrongPassword
        ));
        fresh.login(secret("second-pass")).await.unwrap();
        assert_eq!(
            fresh.read_record(created.id).await.unwrap().password.as_deref(),
            Some("pin-1234")
        );
    }

    #[tokio::test]
    async fn record_call_queued_behind_rekey_uses_new_password() {
        let dir = tempdir().unwrap();
        let sb = std::sync::Arc::new(Strongbox::new(config(&dir)).unwrap());
        sb.login(secret("first-pass")).await.unwrap();
        sb.create_record(credential("Bank", "pin-1234")).await.unwrap();

        let mut store = sb.store.write().await;
        let pending = tokio::spawn({
            let sb = sb.clone();
            async move { sb.list_records().await }
        });
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        store
            .rekey(
                &StoreKey::from_master(&secret("first-pass")),
                &StoreKey::from_master(&secret("second-pass")),
            )
            .await
            .unwrap();
        sb.session().set(secret("second-pass"));
        // Force the queued call through the reconnect path.
        store.close().await.unwrap();
        drop(store);

        let all = pending.await.unwrap().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].password.as_deref(), Some("pin-1234"));
        assert_eq!(sb.encryption_state().await, StoreEncryptionState::EncryptedOpen);
    }

    #[tokio::test]
    async fn failed_follow_up_after_rekey_keeps_session_on_new_password() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        sb.login(secret("first-pass")).await.unwrap();
        let created = sb.create_record(credential("Bank", "pin-1234")).await.unwrap();
        {
            let store = sb.store.read().await;
            set_setting(store.database().unwrap(), setting_keys::FIELD_KEY_CHECK, "damaged")
                .await
                .unwrap();
        }

        let err = sb
            .change_master_password(secret("first-pass"), secret("second-pass"))
            .await
            .unwrap_err();
        assert!(matches!(err, StrongboxError::CorruptionSuspected(_)));
        assert!(sb.session().matches("second-pass"));

        sb.store.write().await.close().await.unwrap();
        assert_eq!(
            sb.read_record(created.id).await.unwrap().password.as_deref(),
            Some("pin-1234")
        );
    }

    #[tokio::test]
    async fn change_password_validates_input_first() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        sb.login(secret("first-pass")).await.unwrap();

        for (current, new) in [("first-pass", "short"), ("first-pass", "first-pass")] {
            let err = sb
                .change_master_password(secret(current), secret(new))
                .await
                .unwrap_err();
            assert!(matches!(err, StrongboxError::InputInvalid(_)), "{new}");
        }
        assert!(sb.session().matches("first-pass"));
    }

    #[tokio::test]
    async fn health_reflects_store_state() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        assert!(matches!(sb.health_check().await, HealthStatus::Degraded(_)));
        sb.login(secret("correct horse")).await.unwrap();
        assert_eq!(sb.health_check().await, HealthStatus::Healthy);
    }

    #[tokio::test]
    async fn token_without_session_is_rejected() {
        let dir = tempdir().unwrap();
        let sb = Strongbox::new(config(&dir)).unwrap();
        let token = sb.tokens.issue().unwrap();
        assert!(matches!(
            sb.authorize(token.as_str()).unwrap_err(),
            StrongboxError::SessionExpired
        ));
        assert!(matches!(
            sb.authorize("garbage").unwrap_err(),
            StrongboxError::InvalidToken(_)
        ));
    }
}
