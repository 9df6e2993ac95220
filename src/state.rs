// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;
use std::time::Duration;

use crate::account::AccountEngine;
use crate::blockchain::ChainService;
use crate::content::ContentStore;
use crate::device::DeviceEngine;
use crate::events::handlers::{
    register_handlers, AccountCreatedHandler, AccountDeletedHandler, FanOutHandler,
};
use crate::events::{BusError, EventBus, FanOut};
use crate::keyring::CredentialStore;
use crate::nft::NftService;
use crate::registry::IdentityRegistry;
use crate::storage::{AccountSnapshotCache, EncryptedStorage, RecordStore};

/// External collaborators the engines are built on.
pub struct Collaborators {
    pub records: Arc<dyn RecordStore>,
    pub keyring: Arc<dyn CredentialStore>,
    pub chain: Arc<dyn ChainService>,
    pub content: Arc<dyn ContentStore>,
    pub registry: Arc<dyn IdentityRegistry>,
    pub fanout: Arc<dyn FanOut>,
}

pub struct EngineSettings {
    /// BIP-44 coin type of derived accounts.
    pub coin_type: u32,
    /// Base URL recorded as the DID-document URI of minted assets.
    pub registry_url: String,
    pub cache_capacity: usize,
    pub cache_ttl: Duration,
}

/// The engines and the bus they share, with every built-in handler
/// registered.
#[derive(Clone)]
pub struct Services {
    pub accounts: Arc<AccountEngine>,
    pub devices: Arc<DeviceEngine>,
    pub nft: Arc<NftService>,
    pub bus: Arc<EventBus>,
    pub cache: Arc<AccountSnapshotCache>,
}

impl Services {
    pub fn wire(collaborators: Collaborators, settings: &EngineSettings) -> Result<Self, BusError> {
        let Collaborators {
            records,
            keyring,
            chain,
            content,
            registry,
            fanout,
        } = collaborators;

        let bus = Arc::new(EventBus::new());
        let cache = Arc::new(AccountSnapshotCache::new(
            settings.cache_capacity,
            settings.cache_ttl,
        ));

        let accounts = Arc::new(AccountEngine::new(
            records.clone(),
            keyring.clone(),
            chain.clone(),
            bus.clone(),
            cache.clone(),
            settings.coin_type,
        ));
        let devices = Arc::new(DeviceEngine::new(
            records,
            content,
            registry.clone(),
            bus.clone(),
        ));
        let nft = Arc::new(NftService::new(
            accounts.clone(),
            devices.clone(),
            chain.clone(),
            registry.clone(),
            &settings.registry_url,
        ));

        register_handlers(
            &bus,
            AccountCreatedHandler::new(registry, chain, keyring, devices.clone()),
            AccountDeletedHandler::new(devices.clone(), fanout.clone(), cache.clone()),
            FanOutHandler::new(fanout, cache.clone()),
        )?;

        Ok(Self {
            accounts,
            devices,
            nft,
            bus,
            cache,
        })
    }
}

#[derive(Clone)]
pub struct AppState {
    pub services: Services,
    /// Checked by the readiness endpoint.
    pub storage: EncryptedStorage,
    pub records: Arc<dyn RecordStore>,
    /// Worker cap for batch device saves.
    pub batch_concurrency: usize,
}

impl AppState {
    pub fn new(
        services: Services,
        storage: EncryptedStorage,
        records: Arc<dyn RecordStore>,
        batch_concurrency: usize,
    ) -> Self {
        Self {
            services,
            storage,
            records,
            batch_concurrency: batch_concurrency.max(1),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{EventPayload, NftEvent, Topic};
    use crate::testing::Harness;

    #[tokio::test]
    async fn wired_bus_knows_every_topic() {
        let h = Harness::new();
        let mut rx = h.fanout.subscribe();

        for topic in [Topic::NftMinted, Topic::NftTransferred, Topic::NftMetadataUpdated] {
            let payload = EventPayload::Nft(NftEvent {
                did: "did:obada:abc".to_string(),
                address: None,
            });
            h.services.bus.emit(topic, payload).await.unwrap();
            assert_eq!(rx.recv().await.unwrap().channel, topic.as_str());
        }
    }

    #[test]
    fn batch_concurrency_is_at_least_one() {
        let h = Harness::new();
        let state = AppState::new(
            h.services.clone(),
            h.keyring.storage().clone(),
            h.records.clone(),
            0,
        );
        assert_eq!(state.batch_concurrency, 1);
    }
}
