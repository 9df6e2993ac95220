// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Authentication Module
//!
//! The service sits behind an authenticating gateway. The gateway verifies
//! the caller and forwards the tenant in the `X-Profile-Id` header; every
//! `/v1` handler except the DID and checksum helpers takes it through the
//! [`ProfileId`] extractor.
//!
//! ## Security
//!
//! - All non-health endpoints that touch stored state require the header
//! - Every engine call is scoped to the extracted profile namespace
//! - The header is never trusted for anything but the namespace

pub mod error;
pub mod extractor;

pub use error::AuthError;
pub use extractor::{ProfileId, PROFILE_ID_HEADER};
