// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strongbox login` and `strongbox change-password`.

use serde::Serialize;
use strongbox_config::StrongboxConfig;
use strongbox_core::{LoginState, StrongboxError};
use strongbox_service::Strongbox;
use strongbox_vault::{
    MASTER_PASSWORD_ENV_VAR, NEW_MASTER_PASSWORD_ENV_VAR, get_master_password,
    get_new_password_with_confirm,
};

#[derive(Debug, Serialize)]
struct LoginReport {
    state: LoginState,
    token: String,
}

/// Open a service and log in, prompting for a new password with
/// confirmation when the store has none yet.
pub(crate) async fn login(config: StrongboxConfig) -> Result<(Strongbox, LoginState, String), StrongboxError> {
    let strongbox = Strongbox::new(config)?;
    let status = strongbox.check_first_time().await?;
    let master = if status.first_time {
        eprintln!("No master password is set for this store yet. Choose one.");
        get_new_password_with_confirm("New master password", MASTER_PASSWORD_ENV_VAR)?
    } else {
        get_master_password("Master password")?
    };
    let outcome = strongbox.login(master).await?;
    Ok((strongbox, outcome.state, outcome.token.into_string()))
}

/// Log in for a record command. Refuses to create a store as a side effect.
pub(crate) async fn unlock(config: StrongboxConfig) -> Result<Strongbox, StrongboxError> {
    let strongbox = Strongbox::new(config)?;
    if strongbox.check_first_time().await?.first_time {
        return Err(StrongboxError::StoreUnavailable(
            "no master password is set; run `strongbox login` first".to_string(),
        ));
    }
    strongbox.login(get_master_password("Master password")?).await?;
    Ok(strongbox)
}

pub async fn run_login(config: StrongboxConfig, json: bool) -> Result<(), StrongboxError> {
    let (_strongbox, state, token) = login(config).await?;
    if json {
        print_json(&LoginReport { state, token })?;
    } else {
        println!("{}", describe(state));
        println!("session token: {token}");
    }
    Ok(())
}

pub async fn run_change_password(config: StrongboxConfig, json: bool) -> Result<(), StrongboxError> {
    let strongbox = unlock(config).await?;
    let current = strongbox.session().require()?;
    let new = get_new_password_with_confirm("New master password", NEW_MASTER_PASSWORD_ENV_VAR)?;
    let token = strongbox.change_master_password(current, new).await?;
    if json {
        print_json(&serde_json::json!({ "changed": true, "token": token.as_str() }))?;
    } else {
        println!("master password changed");
        println!("session token: {}", token.as_str());
    }
    Ok(())
}

fn describe(state: LoginState) -> &'static str {
    match state {
        LoginState::FirstTimeSetup => "created a new encrypted store",
        LoginState::Converted => "converted the plaintext store to an encrypted one",
        LoginState::Authenticated => "store unlocked",
    }
}

pub(crate) fn print_json<T: Serialize>(value: &T) -> Result<(), StrongboxError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| StrongboxError::Internal(format!("failed to encode output: {e}")))?;
    println!("{text}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_login_state_is_described() {
        for state in [
            LoginState::FirstTimeSetup,
            LoginState::Converted,
            LoginState::Authenticated,
        ] {
            assert!(!describe(state).is_empty());
        }
    }

    #[test]
    fn login_report_uses_snake_case_state() {
        let report = LoginReport {
            state: LoginState::FirstTimeSetup,
            token: "t".to_string(),
        };
        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"first_time_setup\""));
    }
}
