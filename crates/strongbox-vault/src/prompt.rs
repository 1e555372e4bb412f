// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Master password acquisition via TTY prompt or environment variable.

use secrecy::{ExposeSecret, SecretString};
use strongbox_core::StrongboxError;

/// The environment variable name for providing the master password.
pub const MASTER_PASSWORD_ENV_VAR: &str = "STRONGBOX_MASTER_PASSWORD";

/// The environment variable holding the replacement password for a change.
pub const NEW_MASTER_PASSWORD_ENV_VAR: &str = "STRONGBOX_NEW_MASTER_PASSWORD";

/// Get the master password from the environment or an interactive prompt.
///
/// Priority:
/// 1. `STRONGBOX_MASTER_PASSWORD` (for scripts and headless use)
/// 2. Interactive TTY prompt via `rpassword`
pub fn get_master_password(label: &str) -> Result<SecretString, StrongboxError> {
    if let Some(password) = from_env(MASTER_PASSWORD_ENV_VAR) {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        return read_non_empty(label);
    }

    Err(no_source())
}

/// Prompt twice for a new password and require both entries to match.
///
/// A password taken from `env_var` needs no confirmation.
pub fn get_new_password_with_confirm(
    label: &str,
    env_var: &str,
) -> Result<SecretString, StrongboxError> {
    if let Some(password) = from_env(env_var) {
        return Ok(password);
    }

    if std::io::IsTerminal::is_terminal(&std::io::stdin()) {
        let first = read_non_empty(label)?;
        let second = read_non_empty("Confirm password")?;
        if first.expose_secret() != second.expose_secret() {
            return Err(StrongboxError::InputInvalid(
                "passwords do not match".to_string(),
            ));
        }
        return Ok(first);
    }

    Err(no_source())
}

fn from_env(var: &str) -> Option<SecretString> {
    std::env::var(var)
        .ok()
        .filter(|value| !value.is_empty())
        .map(SecretString::from)
}

fn read_non_empty(label: &str) -> Result<SecretString, StrongboxError> {
    eprint!("{label}: ");
    let password = rpassword::read_password()
        .map_err(|e| StrongboxError::InputInvalid(format!("failed to read password: {e}")))?;
    if password.is_empty() {
        return Err(StrongboxError::InputInvalid(
            "empty password not allowed".to_string(),
        ));
    }
    Ok(SecretString::from(password))
}

fn no_source() -> StrongboxError {
    StrongboxError::InputInvalid(format!(
        "no master password provided; set {MASTER_PASSWORD_ENV_VAR} or run interactively"
    ))
}
