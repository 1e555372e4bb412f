// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `strongbox status` command implementation.
//!
//! Reports what detection sees on disk without opening the store or asking
//! for a password.

use std::io::IsTerminal;

use serde::Serialize;
use strongbox_config::StrongboxConfig;
use strongbox_core::{SetupState, StrongboxError};
use strongbox_service::Strongbox;

use crate::auth::print_json;

/// Structured status output for `--json` mode.
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub database_path: String,
    pub exists: bool,
    pub encrypted: bool,
    pub first_time: bool,
    pub detail: String,
}

pub(crate) fn status_response(path: &str, detected: SetupState) -> StatusResponse {
    let (encrypted, detail) = match detected {
        SetupState::FirstTimeSetup { reason } => (false, format!("needs setup ({reason})")),
        SetupState::AlreadyConfiguredUnencrypted => {
            (false, "plaintext, will be encrypted at next login".to_string())
        }
        SetupState::EncryptedConfigured => (true, "encrypted".to_string()),
    };
    StatusResponse {
        database_path: path.to_string(),
        exists: std::path::Path::new(path).exists(),
        encrypted,
        first_time: detected.is_first_time(),
        detail,
    }
}

pub async fn run_status(config: StrongboxConfig, json: bool) -> Result<(), StrongboxError> {
    let path = config.storage.database_path.clone();
    let strongbox = Strongbox::new(config)?;
    let response = status_response(&path, strongbox.detect().await?);

    if json {
        return print_json(&response);
    }

    let label = if std::io::stdout().is_terminal() {
        use colored::Colorize;
        if response.encrypted {
            response.detail.green().to_string()
        } else {
            response.detail.yellow().to_string()
        }
    } else {
        response.detail.clone()
    };
    println!("store:  {}", response.database_path);
    println!("state:  {label}");
    Ok(())
}
