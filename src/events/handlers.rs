// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Built-in subscribers wiring account and device writes to their side
//! effects.

use std::sync::Arc;

use async_trait::async_trait;

use super::{BusError, DomainEvent, EventBus, EventHandler, EventPayload, FanOut, HandlerError, Topic};
use crate::blockchain::signing::public_key_base58;
use crate::blockchain::ChainService;
use crate::device::DeviceEngine;
use crate::keyring::CredentialStore;
use crate::registry::{IdentityRegistry, RegistryError};
use crate::storage::AccountSnapshotCache;

fn account_event(event: &DomainEvent) -> Result<&super::AccountEvent, HandlerError> {
    match &event.payload {
        EventPayload::Account(e) => Ok(e),
        other => Err(HandlerError(format!(
            "unexpected payload for {}: {other:?}",
            event.topic
        ))),
    }
}

/// Makes a new account known to the identity registry and imports the
/// assets it already owns on chain.
pub struct AccountCreatedHandler {
    registry: Arc<dyn IdentityRegistry>,
    chain: Arc<dyn ChainService>,
    keyring: Arc<dyn CredentialStore>,
    devices: Arc<DeviceEngine>,
}

impl AccountCreatedHandler {
    pub fn new(
        registry: Arc<dyn IdentityRegistry>,
        chain: Arc<dyn ChainService>,
        keyring: Arc<dyn CredentialStore>,
        devices: Arc<DeviceEngine>,
    ) -> Self {
        Self {
            registry,
            chain,
            keyring,
            devices,
        }
    }

    async fn register_account(&self, address: &str) -> Result<(), HandlerError> {
        let record = self
            .keyring
            .lookup_by_address(address)
            .map_err(HandlerError::new)?
            .ok_or_else(|| HandlerError(format!("no keyring entry for {address}")))?;
        let key = self.keyring.signing_key(&record.name).map_err(HandlerError::new)?;

        self.registry
            .register_account(&public_key_base58(key.verifying_key()))
            .await
            .map_err(HandlerError::new)
    }
}

#[async_trait]
impl EventHandler for AccountCreatedHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        let payload = account_event(event)?;

        match self.registry.get_public_key(&payload.address).await {
            Ok(_) => {}
            Err(e) => {
                if !matches!(e, RegistryError::NotFound(_)) {
                    tracing::warn!(address = %payload.address, error = %e, "Registry key lookup failed");
                }
                if let Err(e) = self.register_account(&payload.address).await {
                    tracing::warn!(address = %payload.address, error = %e, "Account registration failed");
                }
            }
        }

        let assets = self
            .chain
            .assets_by_address(&payload.address)
            .await
            .map_err(HandlerError::new)?;

        for asset in &assets {
            if let Err(e) = self
                .devices
                .import_device(&payload.profile_id, asset, &payload.address)
                .await
            {
                tracing::warn!(
                    profile_id = %payload.profile_id,
                    did = %asset.did,
                    error = %e,
                    "Asset import failed"
                );
            }
        }

        Ok(())
    }
}

/// Removes the devices of a deleted account and announces the deletion.
pub struct AccountDeletedHandler {
    devices: Arc<DeviceEngine>,
    fanout: Arc<dyn FanOut>,
    cache: Arc<AccountSnapshotCache>,
}

impl AccountDeletedHandler {
    pub fn new(devices: Arc<DeviceEngine>, fanout: Arc<dyn FanOut>, cache: Arc<AccountSnapshotCache>) -> Self {
        Self { devices, fanout, cache }
    }
}

#[async_trait]
impl EventHandler for AccountDeletedHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        let payload = account_event(event)?;
        self.cache.invalidate(&payload.address);

        let deleted = self
            .devices
            .delete_by_address(&payload.profile_id, &payload.address)
            .map_err(HandlerError::new)?;
        tracing::debug!(address = %payload.address, deleted, "Devices of deleted account removed");

        self.fanout.publish(event.topic.as_str(), payload.address.clone());
        Ok(())
    }
}

/// Re-publishes device and NFT events on the fan-out channel.
pub struct FanOutHandler {
    fanout: Arc<dyn FanOut>,
    cache: Arc<AccountSnapshotCache>,
}

impl FanOutHandler {
    pub fn new(fanout: Arc<dyn FanOut>, cache: Arc<AccountSnapshotCache>) -> Self {
        Self { fanout, cache }
    }
}

#[async_trait]
impl EventHandler for FanOutHandler {
    async fn handle(&self, event: &DomainEvent) -> Result<(), HandlerError> {
        if let Some(address) = event.payload.address() {
            self.cache.invalidate(address);
        }

        let message = match &event.payload {
            EventPayload::Nft(nft) => nft.did.clone(),
            other => serde_json::to_string(other).map_err(HandlerError::new)?,
        };
        self.fanout.publish(event.topic.as_str(), message);
        Ok(())
    }
}

/// Register every topic and the built-in handler of each.
pub fn register_handlers(
    bus: &EventBus,
    account_created: AccountCreatedHandler,
    account_deleted: AccountDeletedHandler,
    fanout: FanOutHandler,
) -> Result<(), BusError> {
    bus.register_topics(&Topic::ALL);

    bus.register_handler(
        Topic::AccountCreated.handler_key(),
        Topic::AccountCreated,
        Arc::new(account_created),
    )?;
    bus.register_handler(
        Topic::AccountDeleted.handler_key(),
        Topic::AccountDeleted,
        Arc::new(account_deleted),
    )?;

    let fanout: Arc<dyn EventHandler> = Arc::new(fanout);
    for topic in [
        Topic::DeviceSaved,
        Topic::NftMinted,
        Topic::NftTransferred,
        Topic::NftMetadataUpdated,
    ] {
        bus.register_handler(topic.handler_key(), topic, Arc::clone(&fanout))?;
    }
    Ok(())
}
