// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for settings and credential rows.

pub mod credentials;
pub mod settings;
