// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Deterministic asset identifiers.
//!
//! A DID is derived only from the physical-asset identifiers, so two
//! submissions with the same serial number, manufacturer and part number
//! always address the same registry document.
//!
//! ```text
//! did = "did:obada:" + hex(sha256(hex(sha256(serial)) + hex(sha256(manufacturer)) + hex(sha256(part))))
//! usn = base58(sha256(did))[..12]
//! ```

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use utoipa::ToSchema;

pub const DID_PREFIX: &str = "did:obada:";

/// Length of the short lookup key.
pub const USN_LENGTH: usize = 12;

/// Reserved document type whose content is always synthesized from the
/// identifying fields.
pub const PHYSICAL_ASSET_IDENTIFIERS: &str = "physicalAssetIdentifiers";

/// Content of the `physicalAssetIdentifiers` document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PhysicalAssetIdentifiers {
    pub serial_number: String,
    pub manufacturer: String,
    pub part_number: String,
}

impl PhysicalAssetIdentifiers {
    pub fn new(serial_number: &str, manufacturer: &str, part_number: &str) -> Self {
        Self {
            serial_number: serial_number.to_string(),
            manufacturer: manufacturer.to_string(),
            part_number: part_number.to_string(),
        }
    }

    /// Canonical JSON bytes stored in the content store.
    pub fn to_document(&self) -> Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    pub fn did(&self) -> AssetDid {
        let digest = format!(
            "{}{}{}",
            sha256_hex(self.serial_number.as_bytes()),
            sha256_hex(self.manufacturer.as_bytes()),
            sha256_hex(self.part_number.as_bytes()),
        );
        AssetDid::from_did(format!("{DID_PREFIX}{}", sha256_hex(digest.as_bytes())))
    }
}

/// A DID together with its USN encodings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AssetDid {
    pub did: String,
    pub usn: String,
    pub full_usn: String,
}

impl AssetDid {
    fn from_did(did: String) -> Self {
        let full_usn = bs58::encode(Sha256::digest(did.as_bytes())).into_string();
        let usn = full_usn.chars().take(USN_LENGTH).collect();
        Self { did, usn, full_usn }
    }

    /// `{did}#keys-1`, the verification method registered at creation.
    pub fn key_id(&self) -> String {
        verification_method_id(&self.did)
    }
}

pub fn verification_method_id(did: &str) -> String {
    format!("{did}#keys-1")
}

/// Lowercase hex SHA-256.
pub fn sha256_hex(data: &[u8]) -> String {
    alloy::hex::encode(Sha256::digest(data))
}
