// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Axum extractor for the caller's profile.
//!
//! ```rust,ignore
//! async fn my_handler(ProfileId(profile_id): ProfileId) -> impl IntoResponse {
//!     // profile_id is the tenant namespace
//! }
//! ```

use axum::{extract::FromRequestParts, http::request::Parts};

use super::AuthError;
use crate::state::AppState;

/// Header set by the authenticating gateway.
pub const PROFILE_ID_HEADER: &str = "x-profile-id";

/// Profile used when the header is absent in development builds.
#[cfg(feature = "dev")]
pub const DEV_PROFILE_ID: &str = "dev";

/// Profile id of the authenticated caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileId(pub String);

impl FromRequestParts<AppState> for ProfileId {
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &AppState) -> Result<Self, Self::Rejection> {
        let Some(value) = parts.headers.get(PROFILE_ID_HEADER) else {
            #[cfg(feature = "dev")]
            {
                tracing::warn!("No profile header, using the development profile");
                return Ok(ProfileId(DEV_PROFILE_ID.to_string()));
            }
            #[cfg(not(feature = "dev"))]
            return Err(AuthError::MissingProfileHeader);
        };

        let profile_id = value
            .to_str()
            .map_err(|_| AuthError::InvalidProfileHeader)?
            .trim();
        if profile_id.is_empty() {
            return Err(AuthError::InvalidProfileHeader);
        }

        tracing::Span::current().record("profile_id", profile_id);
        Ok(ProfileId(profile_id.to_string()))
    }
}
