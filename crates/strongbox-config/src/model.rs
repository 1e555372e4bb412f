// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Strongbox credential store.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level Strongbox configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StrongboxConfig {
    /// Log output settings.
    #[serde(default)]
    pub log: LogConfig,

    /// Store file settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// Password policy and session token settings.
    #[serde(default)]
    pub security: SecurityConfig,

    /// Reference password hash settings.
    #[serde(default)]
    pub vault: VaultConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct LogConfig {
    /// Default filter level when `RUST_LOG` is unset.
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Store file configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the store file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Directory for rekey backups. Defaults to the store's own directory.
    #[serde(default)]
    pub backup_dir: Option<String>,

    /// SQLCipher page size in bytes.
    #[serde(default = "default_cipher_page_size")]
    pub cipher_page_size: u32,

    /// Files smaller than this are treated as uninitialized.
    #[serde(default = "default_min_store_size")]
    pub min_store_size: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            backup_dir: None,
            cipher_page_size: default_cipher_page_size(),
            min_store_size: default_min_store_size(),
        }
    }
}

impl StorageConfig {
    /// Directory rekey backups are written to.
    pub fn resolved_backup_dir(&self) -> PathBuf {
        match &self.backup_dir {
            Some(dir) => PathBuf::from(dir),
            None => PathBuf::from(&self.database_path)
                .parent()
                .map(|p| p.to_path_buf())
                .unwrap_or_default(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("strongbox").join("passwordManager.db"))
        .unwrap_or_else(|| PathBuf::from("data").join("passwordManager.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_cipher_page_size() -> u32 {
    4096
}

fn default_min_store_size() -> u64 {
    100
}

/// Password policy and session token configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SecurityConfig {
    /// Minimum accepted master password length, in characters.
    #[serde(default = "default_min_password_length")]
    pub min_password_length: usize,

    /// HMAC secret for session tokens. A random per-process secret is used when unset.
    #[serde(default)]
    pub token_secret: Option<String>,

    /// Session token lifetime in seconds.
    #[serde(default = "default_token_ttl_secs")]
    pub token_ttl_secs: u64,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            min_password_length: default_min_password_length(),
            token_secret: None,
            token_ttl_secs: default_token_ttl_secs(),
        }
    }
}

fn default_min_password_length() -> usize {
    6
}

fn default_token_ttl_secs() -> u64 {
    24 * 60 * 60
}

/// Argon2id parameters for the reference master-password hash.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct VaultConfig {
    /// Argon2id memory cost in KiB (default: 65536 = 64 MiB).
    #[serde(default = "default_kdf_memory_cost")]
    pub kdf_memory_cost: u32,

    /// Argon2id iteration count (default: 3).
    #[serde(default = "default_kdf_iterations")]
    pub kdf_iterations: u32,

    /// Argon2id parallelism lanes (default: 4).
    #[serde(default = "default_kdf_parallelism")]
    pub kdf_parallelism: u32,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            kdf_memory_cost: default_kdf_memory_cost(),
            kdf_iterations: default_kdf_iterations(),
            kdf_parallelism: default_kdf_parallelism(),
        }
    }
}

fn default_kdf_memory_cost() -> u32 {
    65536 // 64 MiB per OWASP recommendation
}

fn default_kdf_iterations() -> u32 {
    3
}

fn default_kdf_parallelism() -> u32 {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_store_format() {
        let config = StrongboxConfig::default();
        assert_eq!(config.storage.cipher_page_size, 4096);
        assert_eq!(config.storage.min_store_size, 100);
        assert_eq!(config.security.min_password_length, 6);
        assert!(config.security.token_secret.is_none());
        assert!(config.storage.database_path.ends_with("passwordManager.db"));
    }

    #[test]
    fn backup_dir_defaults_to_store_directory() {
        let storage = StorageConfig {
            database_path: "/var/lib/strongbox/passwordManager.db".to_string(),
            ..Default::default()
        };
        assert_eq!(
            storage.resolved_backup_dir(),
            PathBuf::from("/var/lib/strongbox")
        );

        let storage = StorageConfig {
            backup_dir: Some("/backups".to_string()),
            ..storage
        };
        assert_eq!(storage.resolved_backup_dir(), PathBuf::from("/backups"));
    }

    #[test]
    fn unknown_section_rejected() {
        let result = toml::from_str::<StrongboxConfig>("[agent]\nname = \"x\"\n");
        assert!(result.is_err());
    }
}
