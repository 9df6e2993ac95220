// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::validation::ValidationErrors;

/// A physical asset record, stored under `devices:{pid}:{did}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Device {
    pub usn: String,
    pub did: String,
    /// Registry root hash at the last save or import.
    pub checksum: String,
    pub serial_number: String,
    pub manufacturer: String,
    pub part_number: String,
    pub documents: Vec<DeviceDocument>,
    /// Owning account address.
    pub address: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct DeviceDocument {
    pub name: String,
    /// `ipfs://{cid}` of the stored (possibly encrypted) copy.
    pub uri: String,
    pub description: String,
    #[serde(rename = "type")]
    pub kind: String,
    /// Hex SHA-256 of the plaintext.
    pub hash: String,
    pub encrypted: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SaveDeviceDocument {
    pub name: String,
    #[serde(default)]
    pub description: String,
    /// Base64 content. Ignored for `physicalAssetIdentifiers`.
    #[serde(rename = "document_file", default)]
    pub file: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub should_encrypt: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct SaveDevice {
    pub serial_number: String,
    pub manufacturer: String,
    pub part_number: String,
    #[serde(default)]
    pub documents: Vec<SaveDeviceDocument>,
    /// Owning account; batch items take the batch address instead.
    #[serde(default)]
    pub address: String,
}

impl SaveDevice {
    pub fn validate(&self) -> Result<(), ValidationErrors> {
        let mut errors = ValidationErrors::new();
        errors.require("serial_number", &self.serial_number);
        errors.require("manufacturer", &self.manufacturer);
        errors.require("part_number", &self.part_number);
        errors.require("address", &self.address);
        for (i, doc) in self.documents.iter().enumerate() {
            errors.require(&format!("documents[{i}].name"), &doc.name);
            errors.require(&format!("documents[{i}].type"), &doc.kind);
        }
        errors.into_result()
    }
}

#[derive(Debug, Clone, Default, Deserialize, ToSchema)]
pub struct BatchSaveDevice {
    #[serde(default)]
    pub should_mint: bool,
    #[serde(rename = "obits")]
    pub devices: Vec<SaveDevice>,
    pub address: String,
}

/// Result of running the document pipeline without storing anything.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ChecksumPreview {
    pub did: String,
    pub usn: String,
    pub checksum: String,
    pub documents: Vec<DeviceDocument>,
}
