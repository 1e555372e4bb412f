// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness for end-to-end tests.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use ring::digest::{SHA256, digest};
use secrecy::SecretString;
use strongbox_config::{StrongboxConfig, VaultConfig};
use strongbox_core::StrongboxError;
use strongbox_service::Strongbox;
use strongbox_storage::queries::credentials::insert_credential;
use strongbox_storage::queries::settings::set_setting;
use strongbox_storage::{CredentialRow, Database, setting_keys};
use strongbox_vault::{derive_field_key, encrypt_field, generate_salt};
use tracing::debug;

const TEST_TOKEN_SECRET: &str = "strongbox-test-token-secret-0123456789";

/// A credential to seed into a legacy plaintext store.
#[derive(Debug, Clone)]
pub struct LegacyCredential {
    pub name: String,
    pub username: String,
    pub password: String,
}

impl LegacyCredential {
    pub fn new(name: &str, username: &str, password: &str) -> Self {
        Self {
            name: name.to_string(),
            username: username.to_string(),
            password: password.to_string(),
        }
    }
}

/// Builder for [`TestHarness`].
pub struct TestHarnessBuilder {
    min_password_length: Option<usize>,
    legacy_store: Option<(String, Vec<LegacyCredential>)>,
    plaintext_without_master: bool,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        Self {
            min_password_length: None,
            legacy_store: None,
            plaintext_without_master: false,
        }
    }

    pub fn with_min_password_length(mut self, len: usize) -> Self {
        self.min_password_length = Some(len);
        self
    }

    /// Seed a plaintext store the way older versions wrote it: a SHA-256 hex
    /// reference hash, a salt, and passwords sealed under the master password.
    pub fn with_legacy_plaintext_store(
        mut self,
        master: &str,
        credentials: Vec<LegacyCredential>,
    ) -> Self {
        self.legacy_store = Some((master.to_string(), credentials));
        self
    }

    /// Seed a plaintext store with its schema but no master password.
    pub fn with_unconfigured_plaintext_store(mut self) -> Self {
        self.plaintext_without_master = true;
        self
    }

    pub async fn build(self) -> Result<TestHarness, StrongboxError> {
        let temp_dir = tempfile::TempDir::new()
            .map_err(|e| StrongboxError::io(std::env::temp_dir(), e))?;
        let db_path = temp_dir.path().join("passwordManager.db");

        let mut config = StrongboxConfig::default();
        config.storage.database_path = db_path.to_string_lossy().into_owned();
        config.storage.backup_dir = Some(temp_dir.path().join("backups").to_string_lossy().into_owned());
        config.security.token_secret = Some(TEST_TOKEN_SECRET.to_string());
        if let Some(len) = self.min_password_length {
            config.security.min_password_length = len;
        }
        config.vault = VaultConfig {
            kdf_memory_cost: 32768,
            kdf_iterations: 2,
            kdf_parallelism: 1,
        };

        if let Some((master, credentials)) = &self.legacy_store {
            seed_legacy_store(&db_path, master, credentials).await?;
        } else if self.plaintext_without_master {
            Database::open_unencrypted(&db_path).await?.close().await?;
        }

        let strongbox = Arc::new(Strongbox::new(config.clone())?);
        Ok(TestHarness {
            strongbox,
            config,
            db_path,
            _temp_dir: temp_dir,
        })
    }
}

/// A [`Strongbox`] over a throwaway store.
pub struct TestHarness {
    pub strongbox: Arc<Strongbox>,
    pub config: StrongboxConfig,
    db_path: PathBuf,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }

    pub fn backup_dir(&self) -> PathBuf {
        self.config.storage.resolved_backup_dir()
    }

    /// A second, independent service over the same store file, as after a restart.
    pub fn restart(&self) -> Result<Strongbox, StrongboxError> {
        Strongbox::new(self.config.clone())
    }

    pub fn secret(value: &str) -> SecretString {
        SecretString::from(value.to_string())
    }
}

async fn seed_legacy_store(
    path: &Path,
    master: &str,
    credentials: &[LegacyCredential],
) -> Result<(), StrongboxError> {
    let db = Database::open_unencrypted(path).await?;
    let salt = generate_salt()?;
    let legacy_hash = hex::encode(digest(&SHA256, master.as_bytes()));
    set_setting(&db, setting_keys::PASSWORD_SALT, &salt).await?;
    set_setting(&db, setting_keys::MASTER_PASSWORD, &legacy_hash).await?;

    let key = derive_field_key(master.as_bytes(), &salt)?;
    for credential in credentials {
        let row = CredentialRow {
            name: credential.name.clone(),
            username: credential.username.clone(),
            password: encrypt_field(&credential.password, &key)?,
            ..Default::default()
        };
        insert_credential(&db, &row).await?;
    }
    debug!(count = credentials.len(), "seeded legacy plaintext store");
    db.close().await
}
