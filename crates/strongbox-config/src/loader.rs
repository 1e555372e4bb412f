// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./strongbox.toml` > `~/.config/strongbox/strongbox.toml`
//! > `/etc/strongbox/strongbox.toml` with environment variable overrides via
//! the `STRONGBOX_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::StrongboxConfig;

/// Config sections that may be overridden from the environment.
const ENV_SECTIONS: &[&str] = &["log", "storage", "security", "vault"];

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/strongbox/strongbox.toml` (system-wide)
/// 3. `~/.config/strongbox/strongbox.toml` (user XDG config)
/// 4. `./strongbox.toml` (local directory)
/// 5. `STRONGBOX_*` environment variables
pub fn load_config() -> Result<StrongboxConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no XDG lookup, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<StrongboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<StrongboxConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(StrongboxConfig::default()))
        .merge(Toml::file("/etc/strongbox/strongbox.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("strongbox/strongbox.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("strongbox.toml"))
        .merge(env_provider())
}

/// Environment provider mapping `STRONGBOX_<SECTION>_<KEY>` to `<section>.<key>`.
///
/// Uses an explicit section table rather than `Env::split("_")` because key
/// names contain underscores (`STRONGBOX_STORAGE_DATABASE_PATH` must become
/// `storage.database_path`). Variables outside the known sections, such as
/// `STRONGBOX_MASTER_PASSWORD`, are not config and are filtered out.
fn env_provider() -> Env {
    Env::prefixed("STRONGBOX_")
        .filter(|key| section_of(key.as_str()).is_some())
        .map(|key| {
            let key_str = key.as_str();
            match section_of(key_str) {
                Some(section) => {
                    format!("{section}.{}", &key_str[section.len() + 1..]).into()
                }
                None => key_str.to_string().into(),
            }
        })
}

fn section_of(key: &str) -> Option<&'static str> {
    ENV_SECTIONS.iter().copied().find(|section| {
        key.len() > section.len() + 1
            && key[..section.len()].eq_ignore_ascii_case(section)
            && key.as_bytes()[section.len()] == b'_'
    })
}
