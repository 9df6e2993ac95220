// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Device Engine
//!
//! Physical-asset records anchored to the identity registry.
//!
//! A device is stored under three keys of its profile namespace, always
//! written and deleted together in one batch:
//!
//! ```text
//! devices:{pid}:{did}             device JSON
//! devices:{pid}:usn:{usn}         -> device key
//! devices:{pid}:{address}:{did}   -> DID
//! ```
//!
//! Every lookup goes through the caller's namespace, so cross-profile reads
//! always miss.

pub mod batch;
pub mod documents;
pub mod encryption;
pub mod error;
pub mod models;

use std::sync::Arc;

use k256::ecdsa::SigningKey;

use crate::account::normalize_address;
use crate::blockchain::signing::public_key_base58;
use crate::blockchain::Asset;
use crate::content::ContentStore;
use crate::did::{AssetDid, PhysicalAssetIdentifiers, USN_LENGTH};
use crate::events::{DeviceSaved, EventBus, EventPayload, Topic};
use crate::registry::{
    self, IdentityRegistry, RegistryError, SaveMetadataData, Signed, VerificationMethod,
};
use crate::storage::{keys, RecordStore, WriteBatch};

pub use error::{DeviceError, DeviceResult};
pub use models::{BatchSaveDevice, ChecksumPreview, Device, DeviceDocument, SaveDevice, SaveDeviceDocument};

pub struct DeviceEngine {
    records: Arc<dyn RecordStore>,
    content: Arc<dyn ContentStore>,
    registry: Arc<dyn IdentityRegistry>,
    bus: Arc<EventBus>,
}

impl DeviceEngine {
    pub fn new(
        records: Arc<dyn RecordStore>,
        content: Arc<dyn ContentStore>,
        registry: Arc<dyn IdentityRegistry>,
        bus: Arc<EventBus>,
    ) -> Self {
        Self {
            records,
            content,
            registry,
            bus,
        }
    }

    /// Register (if needed) and update the asset's DID document, then store
    /// the device under the caller's namespace.
    ///
    /// `key` is the private key of the owning account; it signs the registry
    /// update and receives encrypted documents.
    pub async fn save(&self, profile_id: &str, mut request: SaveDevice, key: &SigningKey) -> DeviceResult<Device> {
        request.validate()?;
        request.address = normalize_address(&request.address);

        let asset_did = identifiers(&request).did();
        let key_id = asset_did.key_id();

        match self.registry.get(&asset_did.did).await {
            Ok(_) => {}
            Err(RegistryError::NotFound(_)) => {
                let method = VerificationMethod::secp256k1(
                    &key_id,
                    &asset_did.did,
                    &public_key_base58(key.verifying_key()),
                );
                self.registry
                    .register(&asset_did.did, vec![method], vec![key_id.clone()])
                    .await?;
                tracing::info!(did = %asset_did.did, "DID registered");
            }
            Err(e) => return Err(e.into()),
        }

        let processed =
            documents::process(self.content.as_ref(), &request, Some(key.verifying_key()), true).await?;

        let data = SaveMetadataData {
            did: asset_did.did.clone(),
            authentication_key_id: key_id,
            objects: documents::registry_objects(&processed),
        };
        self.registry.save_metadata(Signed::new(data, key)?).await?;

        let document = self.registry.get(&asset_did.did).await?;

        let device = Device {
            usn: asset_did.usn,
            did: asset_did.did,
            checksum: document.metadata.root_hash,
            serial_number: request.serial_number,
            manufacturer: request.manufacturer,
            part_number: request.part_number,
            documents: processed.into_iter().map(|p| p.document).collect(),
            address: request.address,
        };

        self.store(profile_id, &device).await?;
        tracing::info!(profile_id = %profile_id, did = %device.did, "Device saved");
        Ok(device)
    }

    /// Store an on-chain asset under `profile_id`, rebuilding its documents
    /// from the registry.
    pub async fn import_device(&self, profile_id: &str, asset: &Asset, address: &str) -> DeviceResult<Device> {
        let document = self.registry.get(&asset.did).await?;
        let (documents, identifier_cid) = documents::from_registry(&document.metadata.objects);
        let cid = identifier_cid.ok_or_else(|| DeviceError::MissingIdentifier(asset.did.clone()))?;

        let raw = self.content.get(&cid).await?;
        let identifiers: PhysicalAssetIdentifiers =
            serde_json::from_slice(&raw).map_err(|e| DeviceError::InvalidDocument {
                name: cid.clone(),
                reason: e.to_string(),
            })?;

        let device = Device {
            usn: asset.usn.clone(),
            did: asset.did.clone(),
            checksum: asset.uri_hash.clone(),
            serial_number: identifiers.serial_number,
            manufacturer: identifiers.manufacturer,
            part_number: identifiers.part_number,
            documents,
            address: normalize_address(address),
        };

        self.store(profile_id, &device).await?;
        tracing::info!(profile_id = %profile_id, did = %device.did, "Device imported");
        Ok(device)
    }

    async fn store(&self, profile_id: &str, device: &Device) -> DeviceResult<()> {
        let device_key = keys::device(profile_id, &device.did);
        let previous: Option<Device> = self.records.get_json(&device_key)?;

        let mut batch = WriteBatch::new();
        // A re-save under another owner moves the address index entry.
        if let Some(previous) = previous.filter(|p| p.address != device.address) {
            batch.delete(keys::device_address(profile_id, &previous.address, &device.did));
        }
        batch.set_json(device_key.clone(), device)?;
        batch.set(keys::device_usn(profile_id, &device.usn), device_key.into_bytes());
        batch.set(
            keys::device_address(profile_id, &device.address, &device.did),
            device.did.clone().into_bytes(),
        );
        self.records.write(batch)?;

        self.bus
            .emit(
                Topic::DeviceSaved,
                EventPayload::DeviceSaved(DeviceSaved {
                    device: device.clone(),
                    profile_id: profile_id.to_string(),
                }),
            )
            .await?;
        Ok(())
    }

    /// Run the document pipeline without storing anything and return the
    /// checksum the registry would compute.
    pub async fn checksum_preview(&self, request: &SaveDevice) -> DeviceResult<ChecksumPreview> {
        request.validate()?;
        let asset_did = identifiers(request).did();

        let processed = documents::process(self.content.as_ref(), request, None, false).await?;
        let data = SaveMetadataData {
            did: asset_did.did.clone(),
            authentication_key_id: asset_did.key_id(),
            objects: documents::registry_objects(&processed),
        };

        Ok(ChecksumPreview {
            checksum: alloy::hex::encode(registry::checksum(&data)?),
            did: asset_did.did,
            usn: asset_did.usn,
            documents: processed.into_iter().map(|p| p.document).collect(),
        })
    }

    /// DID and USN of a set of identifying attributes.
    pub fn generate_did(serial_number: &str, manufacturer: &str, part_number: &str) -> AssetDid {
        PhysicalAssetIdentifiers::new(serial_number, manufacturer, part_number).did()
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Lookup by USN when `key` has the USN length, by DID otherwise.
    pub fn get(&self, profile_id: &str, key: &str) -> DeviceResult<Device> {
        if key.len() == USN_LENGTH {
            self.get_by_usn(profile_id, key)
        } else {
            self.get_by_did(profile_id, key)
        }
    }

    pub fn get_by_did(&self, profile_id: &str, did: &str) -> DeviceResult<Device> {
        self.records
            .get_json(&keys::device(profile_id, did))?
            .ok_or(DeviceError::DeviceNotExists)
    }

    pub fn get_by_usn(&self, profile_id: &str, usn: &str) -> DeviceResult<Device> {
        let device_key = self
            .records
            .get(&keys::device_usn(profile_id, usn))?
            .ok_or(DeviceError::DeviceNotExists)?;
        self.get_by_device_key(profile_id, &device_key)
    }

    fn get_by_device_key(&self, profile_id: &str, device_key: &[u8]) -> DeviceResult<Device> {
        let device_key = String::from_utf8_lossy(device_key);
        let did = keys::did_from_device_key(profile_id, &device_key).ok_or(DeviceError::DeviceNotExists)?;
        self.get_by_did(profile_id, did)
    }

    pub fn get_by_dids(&self, profile_id: &str, dids: &[String]) -> DeviceResult<Vec<Device>> {
        dids.iter().map(|did| self.get_by_did(profile_id, did)).collect()
    }

    pub fn get_by_address(&self, profile_id: &str, address: &str) -> DeviceResult<Vec<Device>> {
        let address = normalize_address(address);
        self.records
            .scan_prefix(&keys::device_address(profile_id, &address, ""))?
            .into_iter()
            .map(|(_, did)| self.get_by_did(profile_id, &String::from_utf8_lossy(&did)))
            .collect()
    }

    pub fn get_by_user(&self, profile_id: &str) -> DeviceResult<Vec<Device>> {
        self.records
            .scan_prefix(&keys::device_usn(profile_id, ""))?
            .into_iter()
            .map(|(_, device_key)| self.get_by_device_key(profile_id, &device_key))
            .collect()
    }

    // =========================================================================
    // Deletes
    // =========================================================================

    pub fn delete(&self, profile_id: &str, key: &str) -> DeviceResult<()> {
        let device = self.get(profile_id, key)?;

        let mut batch = WriteBatch::new();
        delete_keys(&mut batch, profile_id, &device);
        self.records.write(batch)?;

        tracing::info!(profile_id = %profile_id, did = %device.did, "Device deleted");
        Ok(())
    }

    /// Delete every device owned by `address`. Returns the number deleted.
    pub fn delete_by_address(&self, profile_id: &str, address: &str) -> DeviceResult<usize> {
        let address = normalize_address(address);
        let mut batch = WriteBatch::new();
        let mut deleted = 0;

        for (_, did) in self
            .records
            .scan_prefix(&keys::device_address(profile_id, &address, ""))?
        {
            let did = String::from_utf8_lossy(&did).into_owned();
            let device = self.get_by_did(profile_id, &did)?;
            if device.address != address {
                return Err(DeviceError::Integrity { address, did });
            }
            delete_keys(&mut batch, profile_id, &device);
            deleted += 1;
        }

        if !batch.is_empty() {
            self.records.write(batch)?;
        }

        tracing::info!(profile_id = %profile_id, address = %address, deleted, "Devices deleted by address");
        Ok(deleted)
    }
}

fn identifiers(request: &SaveDevice) -> PhysicalAssetIdentifiers {
    PhysicalAssetIdentifiers::new(&request.serial_number, &request.manufacturer, &request.part_number)
}

fn delete_keys(batch: &mut WriteBatch, profile_id: &str, device: &Device) {
    batch
        .delete(keys::device_usn(profile_id, &device.usn))
        .delete(keys::device_address(profile_id, &device.address, &device.did))
        .delete(keys::device(profile_id, &device.did));
}
