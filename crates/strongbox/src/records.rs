// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential commands: add, get, list, search, update, delete.

use secrecy::{ExposeSecret, SecretString};
use strongbox_config::StrongboxConfig;
use strongbox_core::{AuthLogins, CredentialRecord, NewCredential, StrongboxError};
use strongbox_vault::mask_secret;

use crate::CredentialArgs;
use crate::auth::{print_json, unlock};

/// Environment variable for a credential's password in non-interactive use.
const CREDENTIAL_PASSWORD_ENV_VAR: &str = "STRONGBOX_CREDENTIAL_PASSWORD";

pub async fn run_add(
    config: StrongboxConfig,
    fields: CredentialArgs,
    json: bool,
) -> Result<(), StrongboxError> {
    let strongbox = unlock(config).await?;
    let input = to_credential(fields, read_credential_password()?)?;
    let record = strongbox.create_record(input).await?;
    print_records(&[record], false, json)
}

pub async fn run_get(
    config: StrongboxConfig,
    id: i64,
    reveal: bool,
    json: bool,
) -> Result<(), StrongboxError> {
    let strongbox = unlock(config).await?;
    let record = strongbox.read_record(id).await?;
    print_records(&[record], reveal, json)
}

pub async fn run_list(config: StrongboxConfig, reveal: bool, json: bool) -> Result<(), StrongboxError> {
    let strongbox = unlock(config).await?;
    let records = strongbox.list_records().await?;
    print_records(&records, reveal, json)
}

pub async fn run_search(
    config: StrongboxConfig,
    query: &str,
    reveal: bool,
    json: bool,
) -> Result<(), StrongboxError> {
    let strongbox = unlock(config).await?;
    let records = strongbox.search_by_name(query).await?;
    print_records(&records, reveal, json)
}

pub async fn run_update(
    config: StrongboxConfig,
    id: i64,
    fields: CredentialArgs,
    json: bool,
) -> Result<(), StrongboxError> {
    let strongbox = unlock(config).await?;
    let input = to_credential(fields, read_credential_password()?)?;
    let record = strongbox.update_record(id, input).await?;
    print_records(&[record], false, json)
}

pub async fn run_delete(config: StrongboxConfig, id: i64) -> Result<(), StrongboxError> {
    let strongbox = unlock(config).await?;
    strongbox.delete_record(id).await?;
    println!("deleted credential {id}");
    Ok(())
}

fn to_credential(fields: CredentialArgs, password: SecretString) -> Result<NewCredential, StrongboxError> {
    let mut auth_logins = AuthLogins::default();
    for provider in &fields.auth_logins {
        if !auth_logins.enable(provider) {
            return Err(StrongboxError::InputInvalid(format!(
                "unknown login provider `{provider}`"
            )));
        }
    }
    Ok(NewCredential {
        name: fields.name,
        username: fields.username,
        phone: fields.phone,
        password: password.expose_secret().to_string(),
        website: fields.website,
        auth_logins,
        notes: fields.notes,
    })
}

fn read_credential_password() -> Result<SecretString, StrongboxError> {
    if let Ok(value) = std::env::var(CREDENTIAL_PASSWORD_ENV_VAR) {
        return Ok(SecretString::from(value));
    }
    rpassword::prompt_password("Credential password: ")
        .map(SecretString::from)
        .map_err(|e| StrongboxError::InputInvalid(format!("failed to read password: {e}")))
}

/// The password column as shown: revealed, masked, or a decrypt failure marker.
fn shown_password(record: &CredentialRecord, reveal: bool) -> String {
    match &record.password {
        Some(password) if reveal => password.clone(),
        Some(password) => mask_secret(password),
        None => "<unreadable>".to_string(),
    }
}

fn print_records(records: &[CredentialRecord], reveal: bool, json: bool) -> Result<(), StrongboxError> {
    if json {
        let shown: Vec<CredentialRecord> = records
            .iter()
            .map(|r| CredentialRecord {
                password: r.password.as_ref().map(|_| shown_password(r, reveal)),
                ..r.clone()
            })
            .collect();
        return print_json(&shown);
    }

    if records.is_empty() {
        println!("no credentials");
        return Ok(());
    }
    for record in records {
        let logins = record.auth_logins.enabled().join(",");
        println!(
            "{:>4}  {:<24}  {:<20}  {:<16}  {}{}",
            record.id,
            record.name,
            record.username,
            shown_password(record, reveal),
            record.website,
            if logins.is_empty() {
                String::new()
            } else {
                format!("  [{logins}]")
            }
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(logins: &[&str]) -> CredentialArgs {
        CredentialArgs {
            name: "Mail".to_string(),
            username: "alice".to_string(),
            phone: String::new(),
            website: "https://mail.example".to_string(),
            notes: String::new(),
            auth_logins: logins.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn record(password: Option<&str>) -> CredentialRecord {
        CredentialRecord {
            id: 1,
            name: "Mail".to_string(),
            username: "alice".to_string(),
            phone: String::new(),
            password: password.map(str::to_string),
            website: String::new(),
            auth_logins: AuthLogins::default(),
            notes: String::new(),
            created_at: String::new(),
            updated_at: String::new(),
        }
    }

    #[test]
    fn known_providers_become_flags() {
        let input = to_credential(args(&["google", "GitHub"]), SecretString::from("pw".to_string()))
            .unwrap();
        assert!(input.auth_logins.google);
        assert!(input.auth_logins.github);
        assert_eq!(input.password, "pw");
    }

    #[test]
    fn unknown_provider_rejected() {
        let err = to_credential(args(&["myspace"]), SecretString::from("pw".to_string())).unwrap_err();
        assert!(matches!(err, StrongboxError::InputInvalid(_)));
    }

    #[test]
    fn passwords_masked_unless_revealed() {
        let r = record(Some("a-long-credential-password"));
        assert_eq!(shown_password(&r, true), "a-long-credential-password");
        assert_eq!(shown_password(&r, false), "a-lo...word");
        assert_eq!(shown_password(&record(None), true), "<unreadable>");
    }
}
