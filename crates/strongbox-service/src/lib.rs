// SPDX-FileCopyrightText: 2026 Strongbox Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Service layer for the Strongbox credential store.
//!
//! [`Strongbox`] ties together detection, the store encryption lifecycle, the
//! master-password session, and field-level sealing of credential passwords.

mod records;
pub mod service;
pub mod token;

pub use service::{FirstTimeReason, FirstTimeStatus, LoginOutcome, Strongbox};
pub use token::{SessionToken, TokenClaims, TokenIssuer};
