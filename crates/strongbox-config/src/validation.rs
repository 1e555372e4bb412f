// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Checks constraints serde attributes cannot express. All failures are
//! collected; validation does not stop at the first one.

use crate::diagnostic::ConfigError;
use crate::model::StrongboxConfig;

/// Shortest master password any configuration may allow.
pub const MIN_PASSWORD_LENGTH_FLOOR: usize = 6;

/// Shortest configured token secret, in bytes.
pub const MIN_TOKEN_SECRET_LEN: usize = 32;

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validate a deserialized configuration for semantic correctness.
pub fn validate_config(config: &StrongboxConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if !LOG_LEVELS.contains(&config.log.level.to_ascii_lowercase().as_str()) {
        fail(format!(
            "log.level must be one of {}, got `{}`",
            LOG_LEVELS.join(", "),
            config.log.level
        ));
    }

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    if let Some(dir) = &config.storage.backup_dir
        && dir.trim().is_empty()
    {
        fail("storage.backup_dir must not be empty when set".to_string());
    }

    let page = config.storage.cipher_page_size;
    if !(512..=65536).contains(&page) || !page.is_power_of_two() {
        fail(format!(
            "storage.cipher_page_size must be a power of two between 512 and 65536, got {page}"
        ));
    }

    if config.security.min_password_length < MIN_PASSWORD_LENGTH_FLOOR {
        fail(format!(
            "security.min_password_length must be at least {MIN_PASSWORD_LENGTH_FLOOR}, got {}",
            config.security.min_password_length
        ));
    }

    if let Some(secret) = &config.security.token_secret
        && secret.len() < MIN_TOKEN_SECRET_LEN
    {
        // Length only; the secret itself never goes into a message.
        fail(format!(
            "security.token_secret must be at least {MIN_TOKEN_SECRET_LEN} bytes, got {}",
            secret.len()
        ));
    }

    if config.security.token_ttl_secs == 0 {
        fail("security.token_ttl_secs must be greater than 0".to_string());
    }

    if config.vault.kdf_memory_cost < 32768 {
        fail(format!(
            "vault.kdf_memory_cost must be at least 32768 (32 MiB), got {}",
            config.vault.kdf_memory_cost
        ));
    }

    if config.vault.kdf_iterations < 2 {
        fail(format!(
            "vault.kdf_iterations must be at least 2, got {}",
            config.vault.kdf_iterations
        ));
    }

    if config.vault.kdf_parallelism < 1 {
        fail(format!(
            "vault.kdf_parallelism must be at least 1, got {}",
            config.vault.kdf_parallelism
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
