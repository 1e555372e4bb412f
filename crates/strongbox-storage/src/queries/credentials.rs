// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Credential CRUD operations. Passwords arrive and leave as envelopes.

use rusqlite::params;
use rusqlite::types::ValueRef;
use strongbox_core::{AuthLogins, StrongboxError};

use crate::database::{Database, map_tr_err};
use crate::models::{CredentialRow, StoredCredential};

const SELECT_COLUMNS: &str = "SELECT id, name, username, phone, password, website, auth_logins, notes, created_at, updated_at FROM passwords";

/// Insert a credential and return the stored row.
pub async fn insert_credential(
    db: &Database,
    row: &CredentialRow,
) -> Result<StoredCredential, StrongboxError> {
    let row = row.clone();
    let logins = auth_logins_json(&row.auth_logins)?;
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO passwords (name, username, phone, password, website, auth_logins, notes, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7,
                         strftime('%Y-%m-%dT%H:%M:%fZ', 'now'), strftime('%Y-%m-%dT%H:%M:%fZ', 'now'))",
                params![
                    row.name,
                    row.username,
                    row.phone,
                    row.password,
                    row.website,
                    logins,
                    row.notes,
                ],
            )?;
            let id = conn.last_insert_rowid();
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                map_row,
            )
        })
        .await
        .map_err(map_tr_err)
}

/// Get a credential by id.
pub async fn get_credential(
    db: &Database,
    id: i64,
) -> Result<Option<StoredCredential>, StrongboxError> {
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                map_row,
            );
            match result {
                Ok(stored) => Ok(Some(stored)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// List all credentials, oldest first.
pub async fn list_credentials(db: &Database) -> Result<Vec<StoredCredential>, StrongboxError> {
    db.connection()
        .call(|conn| {
            let mut stmt = conn.prepare(&format!("{SELECT_COLUMNS} ORDER BY id"))?;
            let rows = stmt.query_map([], map_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Credentials whose name contains `query`, case-insensitively for ASCII.
///
/// `%` and `_` in the query match literally.
pub async fn search_credentials(
    db: &Database,
    query: &str,
) -> Result<Vec<StoredCredential>, StrongboxError> {
    let pattern = format!("%{}%", escape_like(query));
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "{SELECT_COLUMNS} WHERE name LIKE ?1 ESCAPE '\\' ORDER BY id"
            ))?;
            let rows = stmt.query_map(params![pattern], map_row)?;
            rows.collect()
        })
        .await
        .map_err(map_tr_err)
}

/// Replace a credential's contents. Returns the updated row, or `None` if absent.
pub async fn update_credential(
    db: &Database,
    id: i64,
    row: &CredentialRow,
) -> Result<Option<StoredCredential>, StrongboxError> {
    let row = row.clone();
    let logins = auth_logins_json(&row.auth_logins)?;
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE passwords
                 SET name = ?1, username = ?2, phone = ?3, password = ?4, website = ?5,
                     auth_logins = ?6, notes = ?7,
                     updated_at = strftime('%Y-%m-%dT%H:%M:%fZ', 'now')
                 WHERE id = ?8",
                params![
                    row.name,
                    row.username,
                    row.phone,
                    row.password,
                    row.website,
                    logins,
                    row.notes,
                    id,
                ],
            )?;
            if changed == 0 {
                return Ok(None);
            }
            conn.query_row(
                &format!("{SELECT_COLUMNS} WHERE id = ?1"),
                params![id],
                map_row,
            )
            .map(Some)
        })
        .await
        .map_err(map_tr_err)
}

/// Delete a credential. Returns `true` if a row was removed.
pub async fn delete_credential(db: &Database, id: i64) -> Result<bool, StrongboxError> {
    db.connection()
        .call(move |conn| {
            let removed = conn.execute("DELETE FROM passwords WHERE id = ?1", params![id])?;
            Ok(removed > 0)
        })
        .await
        .map_err(map_tr_err)
}

/// Number of stored credentials.
pub async fn count_credentials(db: &Database) -> Result<i64, StrongboxError> {
    db.connection()
        .call(|conn| conn.query_row("SELECT count(*) FROM passwords", [], |r| r.get(0)))
        .await
        .map_err(map_tr_err)
}

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<StoredCredential> {
    Ok(StoredCredential {
        id: row.get(0)?,
        name: text_column(row, 1)?,
        username: text_column(row, 2)?,
        phone: text_column(row, 3)?,
        password: text_column(row, 4)?,
        website: text_column(row, 5)?,
        auth_logins: parse_auth_logins(&text_column(row, 6)?),
        notes: text_column(row, 7)?,
        created_at: text_column(row, 8)?,
        updated_at: text_column(row, 9)?,
    })
}

/// Read a column as text. Older stores left optional columns NULL and may
/// hold timestamps as numbers.
fn text_column(row: &rusqlite::Row<'_>, idx: usize) -> rusqlite::Result<String> {
    Ok(match row.get_ref(idx)? {
        ValueRef::Null => String::new(),
        ValueRef::Integer(i) => i.to_string(),
        ValueRef::Real(f) => f.to_string(),
        ValueRef::Text(t) | ValueRef::Blob(t) => String::from_utf8_lossy(t).into_owned(),
    })
}

fn parse_auth_logins(raw: &str) -> AuthLogins {
    if raw.trim().is_empty() {
        return AuthLogins::default();
    }
    serde_json::from_str(raw).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "unreadable auth_logins column, using defaults");
        AuthLogins::default()
    })
}

fn auth_logins_json(logins: &AuthLogins) -> Result<String, StrongboxError> {
    serde_json::to_string(logins)
        .map_err(|e| StrongboxError::Internal(format!("failed to encode auth_logins: {e}")))
}

fn escape_like(query: &str) -> String {
    let mut escaped = String::with_capacity(query.len());
    for c in query.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open_unencrypted(&dir.path().join("creds.db"))
            .await
            .unwrap();
        (db, dir)
    }

    fn row(name: &str) -> CredentialRow {
        CredentialRow {
            name: name.to_string(),
            username: "alice".to_string(),
            password: "ZW52ZWxvcGU=".to_string(),
            auth_logins: AuthLogins {
                github: true,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn insert_get_roundtrip() {
        let (db, _dir) = setup_db().await;
        let stored = insert_credential(&db, &row("GitHub")).await.unwrap();
        assert!(stored.id > 0);
        assert!(stored.auth_logins.github);
        assert!(stored.created_at.ends_with('Z'));

        let fetched = get_credential(&db, stored.id).await.unwrap().unwrap();
        assert_eq!(fetched, stored);
        assert!(get_credential(&db, stored.id + 100).await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn search_is_substring_and_escapes_wildcards() {
        let (db, _dir) = setup_db().await;
        insert_credential(&db, &row("GitHub")).await.unwrap();
        insert_credential(&db, &row("GitLab")).await.unwrap();
        insert_credential(&db, &row("100% Bank")).await.unwrap();

        assert_eq!(search_credentials(&db, "git").await.unwrap().len(), 2);
        assert_eq!(search_credentials(&db, "Hub").await.unwrap().len(), 1);
        let pct = search_credentials(&db, "%").await.unwrap();
        assert_eq!(pct.len(), 1);
        assert_eq!(pct[0].name, "100% Bank");
        assert!(search_credentials(&db, "_").await.unwrap().is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn update_and_delete() {
        let (db, _dir) = setup_db().await;
        let stored = insert_credential(&db, &row("Mail")).await.unwrap();

        let mut changed = row("Mail (work)");
        changed.notes = "rotated".to_string();
        let updated = update_credential(&db, stored.id, &changed).await.unwrap().unwrap();
        assert_eq!(updated.name, "Mail (work)");
        assert_eq!(updated.notes, "rotated");
        assert_eq!(updated.created_at, stored.created_at);
        assert!(update_credential(&db, 9999, &changed).await.unwrap().is_none());

        assert!(delete_credential(&db, stored.id).await.unwrap());
        assert!(!delete_credential(&db, stored.id).await.unwrap());
        assert_eq!(count_credentials(&db).await.unwrap(), 0);
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn legacy_nulls_and_bad_json_are_tolerated() {
        let (db, _dir) = setup_db().await;
        db.connection()
            .call(|conn| {
                conn.execute(
                    "INSERT INTO passwords (name, password, auth_logins) VALUES ('old', 'x', 'not json')",
                    [],
                )
            })
            .await
            .unwrap();
        let all = list_credentials(&db).await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].username, "");
        assert_eq!(all[0].auth_logins, AuthLogins::default());
        assert!(!all[0].created_at.is_empty());
        db.close().await.unwrap();
    }

    #[test]
    fn like_escaping() {
        assert_eq!(escape_like(r"a%b_c\d"), r"a\%b\_c\\d");
    }
}
