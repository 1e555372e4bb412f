// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Strongbox integration tests.
//!
//! [`TestHarness`] builds a [`strongbox_service::Strongbox`] over a store in a
//! temporary directory, with cheap Argon2 parameters and a fixed token secret.
//! It can also seed a plaintext store in the layout older versions wrote.

pub mod harness;

pub use harness::{LegacyCredential, TestHarness, TestHarnessBuilder};
