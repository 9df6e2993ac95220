// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Keyring
//!
//! Named private-key storage for custodial accounts.
//!
//! Every credential carries an explicit [`CredentialOwner`]. Reverse lookup
//! (address → owning profile) reads that field; credential names follow the
//! `{profile_id}_{index}` / `{profile_id}_imported_{index}` layout for
//! compatibility, but are never parsed to decide ownership.
//!
//! Keyring mutations are not transactional. Callers that pair a keyring
//! write with a record-store batch compensate through [`crate::saga::Saga`].

pub mod armor;
pub mod file;
pub mod hd;

use chrono::{DateTime, Utc};
use k256::ecdsa::SigningKey;
use serde::{Deserialize, Serialize};

use crate::storage::{OwnedResource, StorageError};

pub use file::FileKeyring;

#[derive(Debug, thiserror::Error)]
pub enum KeyringError {
    #[error("key not found: {0}")]
    NotFound(String),

    #[error("key already exists: {0}")]
    AlreadyExists(String),

    #[error("address {address} already held by {existing}")]
    DuplicateAddress { address: String, existing: String },

    #[error("invalid mnemonic")]
    InvalidMnemonic,

    #[error("key derivation failed: {0}")]
    Derivation(String),

    #[error("armor error: {0}")]
    Armor(String),

    #[error("keyring storage error: {0}")]
    Storage(#[from] StorageError),
}

pub type KeyringResult<T> = Result<T, KeyringError>;

/// How a credential entered the keyring.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialKind {
    Hd,
    Imported,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialOwner {
    pub profile_id: String,
    pub kind: CredentialKind,
    /// HD derivation index or import counter value.
    pub index: u64,
}

impl CredentialOwner {
    pub fn hd(profile_id: &str, index: u32) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            kind: CredentialKind::Hd,
            index: u64::from(index),
        }
    }

    pub fn imported(profile_id: &str, index: u64) -> Self {
        Self {
            profile_id: profile_id.to_string(),
            kind: CredentialKind::Imported,
            index,
        }
    }
}

/// Public half of a keyring entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    pub name: String,
    /// Lowercase `0x` address.
    pub address: String,
    /// Uppercase hex of the compressed public key.
    pub public_key: String,
    pub owner: CredentialOwner,
    pub created_at: DateTime<Utc>,
}

impl CredentialRecord {
    pub fn is_imported(&self) -> bool {
        self.owner.kind == CredentialKind::Imported
    }
}

impl OwnedResource for CredentialRecord {
    fn owner_profile_id(&self) -> &str {
        &self.owner.profile_id
    }

    fn describe(&self) -> String {
        format!("account {}", self.address)
    }
}

/// Named private-key store.
///
/// Calls may block on local disk I/O.
pub trait CredentialStore: Send + Sync {
    /// Derive a key from `mnemonic` at `hd_path` and store it under `name`.
    ///
    /// Fails `DuplicateAddress` when the derived address is already held by
    /// another entry.
    fn create(
        &self,
        name: &str,
        mnemonic: &str,
        hd_path: &str,
        owner: CredentialOwner,
    ) -> KeyringResult<CredentialRecord>;

    /// Store an armored private key under `name`.
    fn import_armored(
        &self,
        name: &str,
        armor: &str,
        passphrase: &str,
        owner: CredentialOwner,
    ) -> KeyringResult<CredentialRecord>;

    fn export_armored(&self, name: &str, passphrase: &str) -> KeyringResult<String>;

    fn get(&self, name: &str) -> KeyringResult<Option<CredentialRecord>>;

    fn lookup_by_address(&self, address: &str) -> KeyringResult<Option<CredentialRecord>>;

    fn signing_key(&self, name: &str) -> KeyringResult<SigningKey>;

    /// Fails `NotFound` when nothing is stored under `name`.
    fn delete(&self, name: &str) -> KeyringResult<()>;
}
