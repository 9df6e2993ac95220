// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Explicit ownership of keyring entries.
//!
//! A credential names its owning profile in a field. Reads compare that
//! field for equality; names and record keys are never parsed for it.

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum OwnershipError {
    #[error("no such resource")]
    Missing,

    #[error("profile {profile_id} does not own {resource}")]
    Foreign { profile_id: String, resource: String },
}

pub trait OwnedResource {
    fn owner_profile_id(&self) -> &str;

    /// Label used in ownership errors and logs.
    fn describe(&self) -> String;

    fn ensure_owned_by(&self, profile_id: &str) -> Result<(), OwnershipError> {
        if self.owner_profile_id() == profile_id {
            return Ok(());
        }
        tracing::debug!(
            profile_id = %profile_id,
            resource = %self.describe(),
            "Foreign resource access refused"
        );
        Err(OwnershipError::Foreign {
            profile_id: profile_id.to_string(),
            resource: self.describe(),
        })
    }
}

/// Ownership check on a lookup result; a miss and a foreign owner are both
/// errors.
pub trait RequireOwner<T> {
    fn require_owner(self, profile_id: &str) -> Result<T, OwnershipError>;
}

impl<T: OwnedResource> RequireOwner<T> for Option<T> {
    fn require_owner(self, profile_id: &str) -> Result<T, OwnershipError> {
        let resource = self.ok_or(OwnershipError::Missing)?;
        resource.ensure_owned_by(profile_id)?;
        Ok(resource)
    }
}
