// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Field key resolution and per-record sealing.
//!
//! The field secret is the pinned `encryption_key` setting, falling back to
//! the session password for stores that never pinned one. The salt is created
//! at most once, and only while the credential table is empty.

use secrecy::{ExposeSecret, SecretString};
use strongbox_core::{CredentialRecord, NewCredential, StrongboxError};
use strongbox_storage::queries::credentials::{count_credentials, list_credentials};
use strongbox_storage::queries::settings::{get_setting, insert_setting_if_absent};
use strongbox_storage::{CredentialRow, Database, StoredCredential, setting_keys};
use strongbox_vault::{FieldKey, decrypt_field, derive_field_key, encrypt_field, generate_salt};
use tracing::{error, info, warn};
use zeroize::Zeroizing;

/// Plaintext sealed into the `field_key_check` setting.
pub(crate) const FIELD_KEY_MARKER: &str = "strongbox:field-key-check:v1";

pub(crate) fn validate(input: &NewCredential) -> Result<(), StrongboxError> {
    if input.name.trim().is_empty() {
        return Err(StrongboxError::InputInvalid(
            "credential name must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// The secret the field key is derived from.
pub(crate) async fn field_secret(
    db: &Database,
    session: &SecretString,
) -> Result<Zeroizing<String>, StrongboxError> {
    match get_setting(db, setting_keys::ENCRYPTION_KEY).await? {
        Some(pinned) if !pinned.is_empty() => Ok(Zeroizing::new(pinned)),
        _ => Ok(Zeroizing::new(session.expose_secret().to_string())),
    }
}

/// The stored salt, creating one if the store holds no credentials yet.
pub(crate) async fn ensure_salt(db: &Database) -> Result<String, StrongboxError> {
    if let Some(salt) = get_setting(db, setting_keys::PASSWORD_SALT).await? {
        return Ok(salt);
    }

    let existing = count_credentials(db).await?;
    if existing > 0 {
        error!(count = existing, "password_salt missing while credentials exist");
        return Err(StrongboxError::CorruptionSuspected(format!(
            "password_salt is missing but {existing} credential(s) are stored"
        )));
    }

    let salt = generate_salt()?;
    if insert_setting_if_absent(db, setting_keys::PASSWORD_SALT, &salt).await? {
        info!("field salt generated");
        return Ok(salt);
    }
    // Lost a race with a concurrent writer; theirs is authoritative.
    get_setting(db, setting_keys::PASSWORD_SALT)
        .await?
        .ok_or_else(|| StrongboxError::Internal("password_salt vanished after insert".to_string()))
}

/// Resolve the field key. With `create_salt`, a missing salt is generated
/// for an empty store; otherwise a missing salt is corruption.
pub(crate) async fn field_key(
    db: &Database,
    session: &SecretString,
    create_salt: bool,
) -> Result<FieldKey, StrongboxError> {
    let salt = if create_salt {
        ensure_salt(db).await?
    } else {
        get_setting(db, setting_keys::PASSWORD_SALT)
            .await?
            .ok_or_else(|| StrongboxError::CorruptionSuspected("password_salt is missing".to_string()))?
    };
    let secret = field_secret(db, session).await?;
    derive_field_key(secret.as_bytes(), &salt)
}

pub(crate) fn seal_row(input: &NewCredential, key: &FieldKey) -> Result<CredentialRow, StrongboxError> {
    Ok(CredentialRow {
        name: input.name.clone(),
        username: input.username.clone(),
        phone: input.phone.clone(),
        password: encrypt_field(&input.password, key)?,
        website: input.website.clone(),
        auth_logins: input.auth_logins,
        notes: input.notes.clone(),
    })
}

pub(crate) fn reveal(stored: StoredCredential, password: Option<String>) -> CredentialRecord {
    CredentialRecord {
        id: stored.id,
        name: stored.name,
        username: stored.username,
        phone: stored.phone,
        password,
        website: stored.website,
        auth_logins: stored.auth_logins,
        notes: stored.notes,
        created_at: stored.created_at,
        updated_at: stored.updated_at,
    }
}

/// Decrypt a batch of rows.
///
/// A row that fails alone is returned with `password: None`. When every row
/// fails, the sentinel decides between a key mismatch and corruption.
pub(crate) async fn reveal_all(
    db: &Database,
    session: &SecretString,
    rows: Vec<StoredCredential>,
) -> Result<Vec<CredentialRecord>, StrongboxError> {
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let key = field_key(db, session, false).await?;

    let total = rows.len();
    let mut failed = 0usize;
    let records: Vec<CredentialRecord> = rows
        .into_iter()
        .map(|row| match decrypt_field(&row.password, &key) {
            Ok(password) => reveal(row, Some(password)),
            Err(e) => {
                failed += 1;
                warn!(id = row.id, error = %e, "credential password did not decrypt");
                reveal(row, None)
            }
        })
        .collect();

    if failed == total {
        return Err(diagnose(db, &key, total).await);
    }
    if failed > 0 {
        warn!(failed, total, "some credential passwords did not decrypt");
    }
    Ok(records)
}

async fn diagnose(db: &Database, key: &FieldKey, total: usize) -> StrongboxError {
    match check_sentinel(db, key).await {
        Ok(Some(false)) => {
            error!(total, "field key does not match this store's salt and secret");
            StrongboxError::AuthenticationFailure
        }
        Ok(Some(true)) => StrongboxError::CorruptionSuspected(format!(
            "{total} credential(s) failed to decrypt under a verified field key"
        )),
        Ok(None) => StrongboxError::CorruptionSuspected(format!(
            "{total} credential(s) failed to decrypt and no field key check is stored"
        )),
        Err(e) => e,
    }
}

/// `Some(true)` if the stored sentinel opens under `key`, `None` if there is none.
pub(crate) async fn check_sentinel(db: &Database, key: &FieldKey) -> Result<Option<bool>, StrongboxError> {
    let Some(envelope) = get_setting(db, setting_keys::FIELD_KEY_CHECK).await? else {
        return Ok(None);
    };
    Ok(Some(matches!(
        decrypt_field(&envelope, key),
        Ok(marker) if marker == FIELD_KEY_MARKER
    )))
}

/// Seal the sentinel under `key` unless one exists.
///
/// Skipped when the store holds credentials and the first one does not open
/// under `key`: the sentinel must never vouch for the wrong key.
pub(crate) async fn write_sentinel_if_absent(db: &Database, key: &FieldKey) -> Result<(), StrongboxError> {
    if get_setting(db, setting_keys::FIELD_KEY_CHECK).await?.is_some() {
        return Ok(());
    }
    if let Some(first) = list_credentials(db).await?.into_iter().next()
        && decrypt_field(&first.password, key).is_err()
    {
        warn!("existing credentials do not open under the current field key, no check written");
        return Ok(());
    }
    let envelope = encrypt_field(FIELD_KEY_MARKER, key)?;
    if insert_setting_if_absent(db, setting_keys::FIELD_KEY_CHECK, &envelope).await? {
        info!("field key check written");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use strongbox_storage::queries::credentials::insert_credential;
    use strongbox_storage::queries::settings::set_setting;
    use tempfile::tempdir;

    fn session(pass: &str) -> SecretString {
        SecretString::from(pass.to_string())
    }

    fn input(name: &str, password: &str) -> NewCredential {
        NewCredential {
            name: name.to_string(),
            password: password.to_string(),
            ..Default::default()
        }
    }

    async fn store() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open_unencrypted(&dir.path().join("records.db"))
            .await
            .unwrap();
        (db, dir)
    }

    #[test]
    fn blank_name_rejected() {
        assert!(validate(&input("  ", "x")).is_err());
        assert!(validate(&input("Mail", "")).is_ok());
    }

    #[tokio::test]
    async fn salt_created_once_for_empty_store() {
        let (db, _dir) = store().await;
        let first = ensure_salt(&db).await.unwrap();
        let second = ensure_salt(&db).await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.len(), 32);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn missing_salt_with_rows_is_corruption() {
        let (db, _dir) = store().await;
        let row = CredentialRow {
            name: "orphan".to_string(),
            password: "AAAA".to_string(),
            ..Default::default()
        };
        insert_credential(&db, &row).await.unwrap();
        let err = ensure_salt(&db).await.unwrap_err();
        assert!(matches!(err, StrongboxError::CorruptionSuspected(_)));
        assert!(get_setting(&db, setting_keys::PASSWORD_SALT).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn pinned_secret_wins_over_session() {
        let (db, _dir) = store().await;
        let salt = ensure_salt(&db).await.unwrap();
        set_setting(&db, setting_keys::ENCRYPTION_KEY, "pinned-secret")
            .await
            .unwrap();

        let key = field_key(&db, &session("session-pass"), false).await.unwrap();
        let expected = derive_field_key(b"pinned-secret", &salt).unwrap();
        assert_eq!(key, expected);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn single_bad_row_is_masked_not_fatal() {
        let (db, _dir) = store().await;
        let pass = session("session-pass");
        let key = field_key(&db, &pass, true).await.unwrap();
        let good = insert_credential(&db, &seal_row(&input("good", "s3cret"), &key).unwrap())
            .await
            .unwrap();
        let mut broken = seal_row(&input("broken", "other"), &key).unwrap();
        broken.password = "AAAAAAAAAAAAAAAAAAAAAAAAAAAAAAAA".to_string();
        insert_credential(&db, &broken).await.unwrap();

        let rows = list_credentials(&db).await.unwrap();
        let records = reveal_all(&db, &pass, rows).await.unwrap();
        assert_eq!(records[0].id, good.id);
        assert_eq!(records[0].password.as_deref(), Some("s3cret"));
        assert_eq!(records[1].password, None);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn all_rows_failing_is_key_mismatch_when_sentinel_disagrees() {
        let (db, _dir) = store().await;
        let right = session("right-pass");
        let key = field_key(&db, &right, true).await.unwrap();
        write_sentinel_if_absent(&db, &key).await.unwrap();
        insert_credential(&db, &seal_row(&input("a", "1"), &key).unwrap())
            .await
            .unwrap();

        let rows = list_credentials(&db).await.unwrap();
        let err = reveal_all(&db, &session("wrong-pass"), rows).await.unwrap_err();
        assert!(matches!(err, StrongboxError::AuthenticationFailure));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn all_rows_failing_is_corruption_when_sentinel_agrees() {
        let (db, _dir) = store().await;
        let pass = session("right-pass");
        let key = field_key(&db, &pass, true).await.unwrap();
        write_sentinel_if_absent(&db, &key).await.unwrap();
        let mut row = seal_row(&input("a", "1"), &key).unwrap();
        row.password = "not base64 at all".to_string();
        insert_credential(&db, &row).await.unwrap();

        let rows = list_credentials(&db).await.unwrap();
        let err = reveal_all(&db, &pass, rows).await.unwrap_err();
        assert!(matches!(err, StrongboxError::CorruptionSuspected(_)));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn sentinel_not_written_for_foreign_rows() {
        let (db, _dir) = store().await;
        let key = field_key(&db, &session("original"), true).await.unwrap();
        insert_credential(&db, &seal_row(&input("a", "1"), &key).unwrap())
            .await
            .unwrap();

        let other = field_key(&db, &session("someone-else"), false).await.unwrap();
        write_sentinel_if_absent(&db, &other).await.unwrap();
        assert_eq!(check_sentinel(&db, &other).await.unwrap(), None);

        write_sentinel_if_absent(&db, &key).await.unwrap();
        assert_eq!(check_sentinel(&db, &key).await.unwrap(), Some(true));
        assert_eq!(check_sentinel(&db, &other).await.unwrap(), Some(false));
        db.close().await.unwrap();
    }
}
