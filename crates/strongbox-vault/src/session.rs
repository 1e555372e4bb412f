// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Holder of the currently authenticated master password.

use std::sync::RwLock;

use secrecy::{ExposeSecret, SecretString};
use strongbox_core::StrongboxError;
use subtle::ConstantTimeEq;
use tracing::{debug, warn};

/// The master password for the lifetime of one service instance.
///
/// Many readers, one writer. Empty input never clears an existing password.
#[derive(Default)]
pub struct MasterPasswordSession {
    password: RwLock<Option<SecretString>>,
}

impl MasterPasswordSession {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the held password. Returns `true` if the value changed.
    ///
    /// Empty input is ignored with a warning.
    pub fn set(&self, password: SecretString) -> bool {
        if password.expose_secret().is_empty() {
            warn!("ignoring attempt to set an empty master password");
            return false;
        }

        let mut guard = self.password.write().unwrap_or_else(|e| e.into_inner());
        let changed = guard
            .as_ref()
            .is_none_or(|current| !secrets_equal(current.expose_secret(), password.expose_secret()));
        *guard = Some(password);
        debug!(changed, "master password session updated");
        changed
    }

    /// The held password, if any.
    pub fn get(&self) -> Option<SecretString> {
        self.password
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// The held password, or [`StrongboxError::SessionExpired`].
    pub fn require(&self) -> Result<SecretString, StrongboxError> {
        self.get().ok_or(StrongboxError::SessionExpired)
    }

    pub fn is_authenticated(&self) -> bool {
        self.password
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .is_some()
    }

    /// Compare a candidate with the held password.
    pub fn matches(&self, candidate: &str) -> bool {
        self.password
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .as_ref()
            .is_some_and(|current| secrets_equal(current.expose_secret(), candidate))
    }
}

fn secrets_equal(a: &str, b: &str) -> bool {
    bool::from(a.as_bytes().ct_eq(b.as_bytes()))
}

impl std::fmt::Debug for MasterPasswordSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MasterPasswordSession")
            .field("authenticated", &self.is_authenticated())
            .field("password", &"[REDACTED]")
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_unauthenticated() {
        let session = MasterPasswordSession::new();
        assert!(!session.is_authenticated());
        assert!(session.get().is_none());
        assert!(matches!(session.require(), Err(StrongboxError::SessionExpired)));
    }

    #[test]
    fn set_reports_change() {
        let session = MasterPasswordSession::new();
        assert!(session.set(SecretString::from("first-pass")));
        assert!(!session.set(SecretString::from("first-pass")));
        assert!(session.set(SecretString::from("second-pass")));
        assert!(session.matches("second-pass"));
        assert!(!session.matches("first-pass"));
    }

    #[test]
    fn matches_rejects_prefixes_and_extensions() {
        let session = MasterPasswordSession::new();
        assert!(!session.matches("anything"));
        session.set(SecretString::from("correct-horse"));
        assert!(session.matches("correct-horse"));
        assert!(!session.matches("correct"));
        assert!(!session.matches("correct-horse-battery"));
        assert!(!session.matches(""));
    }

    #[test]
    #[tracing_test::traced_test]
    fn empty_set_keeps_existing_password() {
        let session = MasterPasswordSession::new();
        session.set(SecretString::from("keep-me"));
        assert!(!session.set(SecretString::from("")));
        assert_eq!(session.get().unwrap().expose_secret(), "keep-me");
        assert!(logs_contain("empty master password"));
    }

    #[test]
    fn debug_is_redacted() {
        let session = MasterPasswordSession::new();
        session.set(SecretString::from("hunter22"));
        let rendered = format!("{session:?}");
        assert!(!rendered.contains("hunter22"));
        assert!(rendered.contains("authenticated: true"));
    }
}
