// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! NFT orchestration over the device records, the asset registry contract
//! and the identity registry.
//!
//! Every operation signs with the key of the account that owns the device.

use std::sync::Arc;

use k256::ecdsa::SigningKey;

use crate::account::{normalize_address, AccountEngine, AccountError};
use crate::blockchain::{Asset, ChainError, ChainMsg, ChainService, TxOutcome};
use crate::device::{Device, DeviceEngine, DeviceError};
use crate::did::verification_method_id;
use crate::registry::{
    IdentityRegistry, RegistryClient, RegistryError, SaveVerificationMethodsData, Signed,
};

#[derive(Debug, thiserror::Error)]
pub enum NftError {
    #[error(transparent)]
    Account(#[from] AccountError),

    #[error(transparent)]
    Device(#[from] DeviceError),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("cannot delete device after transfer: {0}")]
    DeleteAfterTransfer(DeviceError),

    #[error("no devices to mint")]
    EmptyBatch,
}

pub type NftResult<T> = Result<T, NftError>;

pub struct NftService {
    accounts: Arc<AccountEngine>,
    devices: Arc<DeviceEngine>,
    chain: Arc<dyn ChainService>,
    registry: Arc<dyn IdentityRegistry>,
    registry_url: String,
}

impl NftService {
    pub fn new(
        accounts: Arc<AccountEngine>,
        devices: Arc<DeviceEngine>,
        chain: Arc<dyn ChainService>,
        registry: Arc<dyn IdentityRegistry>,
        registry_url: &str,
    ) -> Self {
        Self {
            accounts,
            devices,
            chain,
            registry,
            registry_url: registry_url.to_string(),
        }
    }

    /// On-chain record of a local device.
    pub async fn nft(&self, profile_id: &str, key: &str) -> NftResult<Asset> {
        let device = self.devices.get(profile_id, key)?;
        Ok(self.chain.asset(&device.did).await?)
    }

    pub async fn mint(&self, profile_id: &str, key: &str) -> NftResult<TxOutcome> {
        let device = self.devices.get(profile_id, key)?;
        let signer = self.accounts.account_private_key(profile_id, &device.address)?;
        self.mint_device(&device, &signer).await
    }

    /// Mint several devices, all signed by the owner of the first one.
    pub async fn batch_mint(&self, profile_id: &str, dids: &[String]) -> NftResult<Vec<TxOutcome>> {
        let devices = self.devices.get_by_dids(profile_id, dids)?;
        let first = devices.first().ok_or(NftError::EmptyBatch)?;
        let signer = self.accounts.account_private_key(profile_id, &first.address)?;

        let mut outcomes = Vec::with_capacity(devices.len());
        for device in &devices {
            outcomes.push(self.mint_device(device, &signer).await?);
        }
        Ok(outcomes)
    }

    async fn mint_device(&self, device: &Device, signer: &SigningKey) -> NftResult<TxOutcome> {
        self.require_activity(&device.address).await?;

        let outcome = self
            .chain
            .send_signed_tx(
                ChainMsg::Mint {
                    did: device.did.clone(),
                    usn: device.usn.clone(),
                    uri: RegistryClient::document_url(&self.registry_url, &device.did),
                    uri_hash: device.checksum.clone(),
                },
                signer,
            )
            .await?;

        tracing::info!(did = %device.did, tx_hash = %outcome.tx_hash, "NFT minted");
        Ok(outcome)
    }

    /// Point the NFT's uri hash at the device's current checksum.
    pub async fn update_metadata(&self, profile_id: &str, key: &str) -> NftResult<TxOutcome> {
        let device = self.devices.get(profile_id, key)?;
        self.chain.asset(&device.did).await?;
        let signer = self.accounts.account_private_key(profile_id, &device.address)?;

        let outcome = self
            .chain
            .send_signed_tx(
                ChainMsg::UpdateUriHash {
                    did: device.did.clone(),
                    uri_hash: device.checksum.clone(),
                },
                &signer,
            )
            .await?;

        tracing::info!(did = %device.did, tx_hash = %outcome.tx_hash, "NFT metadata updated");
        Ok(outcome)
    }

    /// Transfer on chain, hand the DID's verification key to the receiver,
    /// then drop the local device.
    pub async fn transfer(&self, profile_id: &str, key: &str, receiver: &str) -> NftResult<TxOutcome> {
        let device = self.devices.get(profile_id, key)?;
        let signer = self.accounts.account_private_key(profile_id, &device.address)?;
        let receiver = normalize_address(receiver);

        self.require_activity(&device.address).await?;

        let outcome = self
            .chain
            .send_signed_tx(
                ChainMsg::Transfer {
                    did: device.did.clone(),
                    to: receiver.clone(),
                },
                &signer,
            )
            .await?;

        let receiver_key = self.registry.get_public_key(&receiver).await?;
        let document = self.registry.get(&device.did).await?;
        let key_id = verification_method_id(&device.did);

        let verification_methods = document
            .verification_method
            .into_iter()
            .map(|mut vm| {
                if vm.id == key_id {
                    vm.public_key_base58 = receiver_key.clone();
                }
                vm
            })
            .collect();

        let data = SaveVerificationMethodsData {
            did: device.did.clone(),
            authentication_key_id: key_id,
            authentication: document.authentication,
            verification_methods,
        };
        self.registry
            .save_verification_methods(Signed::new(data, &signer)?)
            .await?;

        self.devices
            .delete(profile_id, &device.did)
            .map_err(NftError::DeleteAfterTransfer)?;

        tracing::info!(did = %device.did, to = %receiver, tx_hash = %outcome.tx_hash, "NFT transferred");
        Ok(outcome)
    }

    async fn require_activity(&self, address: &str) -> NftResult<()> {
        if self.chain.has_on_chain_activity(address).await? {
            Ok(())
        } else {
            Err(ChainError::InsufficientFunds.into())
        }
    }
}
