// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Document pipeline shared by save and checksum preview.
//!
//! The `physicalAssetIdentifiers` document is always synthesized from the
//! identifying fields, so its fingerprint depends on nothing else. Every
//! fingerprint is taken over the plaintext, before optional encryption.

use std::collections::BTreeMap;

use base64ct::{Base64, Encoding};
use k256::ecdsa::VerifyingKey;

use super::encryption;
use super::error::{DeviceError, DeviceResult};
use super::models::{DeviceDocument, SaveDevice, SaveDeviceDocument};
use crate::content::ContentStore;
use crate::did::{sha256_hex, PhysicalAssetIdentifiers, PHYSICAL_ASSET_IDENTIFIERS};
use crate::registry::RegistryObject;

const URI_SCHEME: &str = "ipfs://";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedDocument {
    pub document: DeviceDocument,
    /// Hex SHA-256 of the stored ciphertext; empty when stored in clear.
    pub encrypted_hash: String,
}

/// Documents of `request`, with the identifier document appended when the
/// client did not send one.
fn with_identifier_document(request: &SaveDevice) -> Vec<SaveDeviceDocument> {
    let mut documents = request.documents.clone();
    if !documents.iter().any(|d| d.kind == PHYSICAL_ASSET_IDENTIFIERS) {
        documents.push(SaveDeviceDocument {
            name: PHYSICAL_ASSET_IDENTIFIERS.to_string(),
            kind: PHYSICAL_ASSET_IDENTIFIERS.to_string(),
            ..Default::default()
        });
    }
    documents
}

/// Fingerprint, optionally encrypt, and hand every document to the content
/// store. With `persist == false` identifiers are computed but nothing is
/// stored or encrypted.
pub async fn process(
    content: &dyn ContentStore,
    request: &SaveDevice,
    recipient: Option<&VerifyingKey>,
    persist: bool,
) -> DeviceResult<Vec<ProcessedDocument>> {
    let identifiers = PhysicalAssetIdentifiers::new(
        &request.serial_number,
        &request.manufacturer,
        &request.part_number,
    );

    let mut processed = Vec::new();
    for doc in with_identifier_document(request) {
        let plaintext = if doc.kind == PHYSICAL_ASSET_IDENTIFIERS {
            identifiers.to_document().map_err(|e| DeviceError::InvalidDocument {
                name: doc.name.clone(),
                reason: e.to_string(),
            })?
        } else {
            Base64::decode_vec(&doc.file).map_err(|e| DeviceError::InvalidDocument {
                name: doc.name.clone(),
                reason: e.to_string(),
            })?
        };

        let hash = sha256_hex(&plaintext);

        let (stored, encrypted_hash) = if persist && doc.should_encrypt {
            let recipient = recipient
                .ok_or_else(|| DeviceError::Encryption("no recipient key".to_string()))?;
            let sealed = encryption::encrypt(recipient, &plaintext)?;
            let sealed_hash = sha256_hex(&sealed);
            (sealed, sealed_hash)
        } else {
            (plaintext, String::new())
        };

        let cid = content.put(stored, persist).await?;

        processed.push(ProcessedDocument {
            document: DeviceDocument {
                name: doc.name,
                uri: format!("{URI_SCHEME}{cid}"),
                description: doc.description,
                kind: doc.kind,
                hash,
                encrypted: doc.should_encrypt,
            },
            encrypted_hash,
        });
    }

    Ok(processed)
}

pub fn registry_objects(documents: &[ProcessedDocument]) -> Vec<RegistryObject> {
    documents
        .iter()
        .map(|p| {
            let mut metadata = BTreeMap::new();
            metadata.insert("type".to_string(), p.document.kind.clone());
            metadata.insert("name".to_string(), p.document.name.clone());
            metadata.insert("description".to_string(), p.document.description.clone());
            RegistryObject {
                url: p.document.uri.clone(),
                metadata,
                hash_unencrypted_object: p.document.hash.clone(),
                hash_encrypted_data_object: p.encrypted_hash.clone(),
            }
        })
        .collect()
}

/// Rebuild device documents from registry metadata. Also returns the
/// content identifier of the identifier document, if present.
pub fn from_registry(objects: &[RegistryObject]) -> (Vec<DeviceDocument>, Option<String>) {
    let mut identifier_cid = None;
    let documents = objects
        .iter()
        .map(|object| {
            if object.meta("type") == PHYSICAL_ASSET_IDENTIFIERS {
                identifier_cid = object
                    .url
                    .split_once("://")
                    .map(|(_, cid)| cid.to_string());
            }
            DeviceDocument {
                name: object.meta("name").to_string(),
                uri: object.url.clone(),
                description: object.meta("description").to_string(),
                kind: object.meta("type").to_string(),
                hash: object.hash_unencrypted_object.clone(),
                encrypted: !object.hash_encrypted_data_object.is_empty(),
            }
        })
        .collect();
    (documents, identifier_cid)
}
