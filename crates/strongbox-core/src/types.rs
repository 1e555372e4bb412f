// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Common types shared by the storage, vault, and service layers.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Third-party login providers a credential can also sign in with.
///
/// Persisted as a JSON object in the `auth_logins` column.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AuthLogins {
    pub google: bool,
    pub wechat: bool,
    pub weibo: bool,
    pub baidu: bool,
    pub facebook: bool,
    pub github: bool,
    pub qq: bool,
    pub alipay: bool,
    pub taobao: bool,
    pub dingtalk: bool,
    pub douyin: bool,
    pub feishu: bool,
    pub twitter: bool,
}

impl AuthLogins {
    /// Names of the enabled providers, in declaration order.
    pub fn enabled(&self) -> Vec<&'static str> {
        [
            ("google", self.google),
            ("wechat", self.wechat),
            ("weibo", self.weibo),
            ("baidu", self.baidu),
            ("facebook", self.facebook),
            ("github", self.github),
            ("qq", self.qq),
            ("alipay", self.alipay),
            ("taobao", self.taobao),
            ("dingtalk", self.dingtalk),
            ("douyin", self.douyin),
            ("feishu", self.feishu),
            ("twitter", self.twitter),
        ]
        .into_iter()
        .filter_map(|(name, on)| on.then_some(name))
        .collect()
    }

    /// Turn on a provider by its lowercase name. Returns `false` for unknown names.
    pub fn enable(&mut self, provider: &str) -> bool {
        let flag = match provider.trim().to_ascii_lowercase().as_str() {
            "google" => &mut self.google,
            "wechat" => &mut self.wechat,
            "weibo" => &mut self.weibo,
            "baidu" => &mut self.baidu,
            "facebook" => &mut self.facebook,
            "github" => &mut self.github,
            "qq" => &mut self.qq,
            "alipay" => &mut self.alipay,
            "taobao" => &mut self.taobao,
            "dingtalk" => &mut self.dingtalk,
            "douyin" => &mut self.douyin,
            "feishu" => &mut self.feishu,
            "twitter" => &mut self.twitter,
            _ => return false,
        };
        *flag = true;
        true
    }
}

/// Caller-supplied credential contents for create and update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewCredential {
    pub name: String,
    pub username: String,
    pub phone: String,
    pub password: String,
    pub website: String,
    pub auth_logins: AuthLogins,
    pub notes: String,
}

/// A credential record with its password decrypted for the caller.
///
/// `password` is `None` when that one record's envelope failed to decrypt
/// while the rest of the store was readable.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CredentialRecord {
    pub id: i64,
    pub name: String,
    pub username: String,
    pub phone: String,
    pub password: Option<String>,
    pub website: String,
    pub auth_logins: AuthLogins,
    pub notes: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Why a store still needs first-time setup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString)]
#[strum(serialize_all = "snake_case")]
pub enum SetupReason {
    /// No store file on disk.
    StoreMissing,
    /// File exists but is too small to be an initialized store.
    StoreEmpty,
    /// Plaintext store without a master password row.
    NotEncrypted,
}

/// Result of inspecting a store file before opening it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SetupState {
    /// No master password was ever set for this store.
    FirstTimeSetup { reason: SetupReason },
    /// Plaintext store that already has a reference password hash.
    AlreadyConfiguredUnencrypted,
    /// Cipher-protected store; a master password must already exist.
    EncryptedConfigured,
}

impl SetupState {
    pub fn is_first_time(&self) -> bool {
        matches!(self, Self::FirstTimeSetup { .. })
    }
}

/// Lifecycle of the store connection and its key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEncryptionState {
    /// No store file, no connection.
    Uninitialized,
    /// Plaintext file open without a cipher.
    PlaintextOpen,
    /// Encrypted file present, key not yet verified.
    EncryptedLocked,
    /// Key verified and connection live.
    EncryptedOpen,
    /// Rekey failed and the backup could not be restored.
    Fatal { backup_path: PathBuf },
}

impl StoreEncryptionState {
    /// Whether credential reads and writes are legal in this state.
    pub fn allows_records(&self) -> bool {
        matches!(self, Self::PlaintextOpen | Self::EncryptedOpen)
    }
}

/// Which transition a successful login performed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LoginState {
    /// A new encrypted store was created under this password.
    FirstTimeSetup,
    /// An existing plaintext store was converted to an encrypted one.
    Converted,
    /// An encrypted store was opened.
    Authenticated,
}

/// Health status reported by the service health check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HealthStatus {
    /// Store is open and answering queries.
    Healthy,
    /// Store is reachable but not usable for records (locked, no session).
    Degraded(String),
    /// Store is not operational.
    Unhealthy(String),
}
