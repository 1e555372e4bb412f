// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Key/value settings.

use rusqlite::params;
use strongbox_core::StrongboxError;

use crate::database::{Database, map_tr_err};

/// Get a setting value, or `None` if unset.
pub async fn get_setting(db: &Database, key: &str) -> Result<Option<String>, StrongboxError> {
    let key = key.to_string();
    db.connection()
        .call(move |conn| {
            let result = conn.query_row(
                "SELECT value FROM settings WHERE key = ?1",
                params![key],
                |row| row.get(0),
            );
            match result {
                Ok(value) => Ok(Some(value)),
                Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(map_tr_err)
}

/// Insert or replace a setting.
pub async fn set_setting(db: &Database, key: &str, value: &str) -> Result<(), StrongboxError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT INTO settings (key, value) VALUES (?1, ?2)
                 ON CONFLICT(key) DO UPDATE SET value = excluded.value",
                params![key, value],
            )?;
            Ok(())
        })
        .await
        .map_err(map_tr_err)
}

/// Insert a setting only if the key is absent. Returns `true` if inserted.
///
/// Used for values that must never be overwritten once written, like the salt.
pub async fn insert_setting_if_absent(
    db: &Database,
    key: &str,
    value: &str,
) -> Result<bool, StrongboxError> {
    let key = key.to_string();
    let value = value.to_string();
    db.connection()
        .call(move |conn| {
            let inserted = conn.execute(
                "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
                params![key, value],
            )?;
            Ok(inserted == 1)
        })
        .await
        .map_err(map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db = Database::open_unencrypted(&dir.path().join("settings.db"))
            .await
            .unwrap();
        (db, dir)
    }

    #[tokio::test]
    async fn set_then_get() {
        let (db, _dir) = setup_db().await;
        assert_eq!(get_setting(&db, "password_salt").await.unwrap(), None);

        set_setting(&db, "password_salt", "aa").await.unwrap();
        set_setting(&db, "password_salt", "bb").await.unwrap();
        assert_eq!(
            get_setting(&db, "password_salt").await.unwrap().as_deref(),
            Some("bb")
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn insert_if_absent_never_overwrites() {
        let (db, _dir) = setup_db().await;
        assert!(insert_setting_if_absent(&db, "password_salt", "first").await.unwrap());
        assert!(!insert_setting_if_absent(&db, "password_salt", "second").await.unwrap());
        assert_eq!(
            get_setting(&db, "password_salt").await.unwrap().as_deref(),
            Some("first")
        );
        db.close().await.unwrap();
    }
}
