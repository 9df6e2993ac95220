// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Asset Event Listener
//!
//! Background task that polls asset registry logs and re-emits them as NFT
//! domain events.
//!
//! ## Follow-up imports
//!
//! - `AssetUriHashUpdated`: the editor's profile re-imports the device so
//!   its checksum and documents follow the new registry state.
//! - `AssetTransferred`: the receiver's profile imports the device, when the
//!   receiver is a local account.
//!
//! ## Checkpointing
//!
//! The last processed block is stored in the record store's checkpoint
//! table under `asset_events`. On restart the listener resumes from there.

use std::sync::Arc;
use std::time::Duration;

use alloy::rpc::types::Log;
use alloy::sol_types::SolEvent;
use tokio_util::sync::CancellationToken;

use super::assets::IAssetRegistry;
use super::{ChainError, ChainService, EvmChainClient};
use crate::account::{AccountEngine, AccountError};
use crate::device::{DeviceEngine, DeviceError};
use crate::events::{BusError, EventBus, EventPayload, NftEvent, Topic};
use crate::storage::{KvError, RecordStore};

const CHECKPOINT: &str = "asset_events";

/// Block chunk size per `eth_getLogs` query.
const CHUNK_SIZE: u64 = 2000;

/// How far back to look when starting fresh (no checkpoint).
const INITIAL_LOOKBACK_BLOCKS: u64 = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ListenerError {
    #[error("chain: {0}")]
    Chain(#[from] ChainError),

    #[error("checkpoint: {0}")]
    Checkpoint(#[from] KvError),

    #[error("event bus: {0}")]
    Bus(#[from] BusError),

    #[error("owner lookup: {0}")]
    Account(#[from] AccountError),

    #[error("device import: {0}")]
    Device(#[from] DeviceError),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssetEvent {
    Minted { owner: String, did: String },
    Transferred { from: String, to: String, did: String },
    UriHashUpdated { editor: String, did: String },
}

fn lower(address: alloy::primitives::Address) -> String {
    format!("{address:?}").to_lowercase()
}

/// Decode a registry log; `None` for events the listener ignores.
pub fn decode_log(log: &Log) -> Option<AssetEvent> {
    let topic = *log.topic0()?;

    if topic == IAssetRegistry::AssetMinted::SIGNATURE_HASH {
        let event = log.log_decode::<IAssetRegistry::AssetMinted>().ok()?.inner.data;
        Some(AssetEvent::Minted {
            owner: lower(event.owner),
            did: event.did,
        })
    } else if topic == IAssetRegistry::AssetTransferred::SIGNATURE_HASH {
        let event = log.log_decode::<IAssetRegistry::AssetTransferred>().ok()?.inner.data;
        Some(AssetEvent::Transferred {
            from: lower(event.from),
            to: lower(event.to),
            did: event.did,
        })
    } else if topic == IAssetRegistry::AssetUriHashUpdated::SIGNATURE_HASH {
        let event = log.log_decode::<IAssetRegistry::AssetUriHashUpdated>().ok()?.inner.data;
        Some(AssetEvent::UriHashUpdated {
            editor: lower(event.editor),
            did: event.did,
        })
    } else {
        None
    }
}

pub struct AssetEventListener {
    chain: Arc<dyn ChainService>,
    accounts: Arc<AccountEngine>,
    devices: Arc<DeviceEngine>,
    bus: Arc<EventBus>,
    records: Arc<dyn RecordStore>,
}

impl AssetEventListener {
    pub fn new(
        chain: Arc<dyn ChainService>,
        accounts: Arc<AccountEngine>,
        devices: Arc<DeviceEngine>,
        bus: Arc<EventBus>,
        records: Arc<dyn RecordStore>,
    ) -> Self {
        Self {
            chain,
            accounts,
            devices,
            bus,
            records,
        }
    }

    /// Run the listener loop until the cancellation token is triggered.
    ///
    /// ```rust,ignore
    /// tokio::spawn(listener.run(client, poll, shutdown.clone()));
    /// ```
    pub async fn run(self, client: Arc<EvmChainClient>, poll_interval: Duration, shutdown: CancellationToken) {
        tracing::info!(network = %client.network().name, "Asset event listener starting");

        loop {
            if shutdown.is_cancelled() {
                tracing::info!("Asset event listener shutting down");
                return;
            }

            if let Err(e) = self.poll_step(&client).await {
                tracing::warn!(error = %e, "Listener step failed, will retry");
            }

            tokio::select! {
                _ = tokio::time::sleep(poll_interval) => {},
                _ = shutdown.cancelled() => {
                    tracing::info!("Asset event listener shutting down");
                    return;
                }
            }
        }
    }

    async fn poll_step(&self, client: &EvmChainClient) -> Result<(), ListenerError> {
        let checkpoint = self.records.checkpoint(CHECKPOINT)?;
        let head = client.block_number().await?;

        let start = if checkpoint == 0 {
            head.saturating_sub(INITIAL_LOOKBACK_BLOCKS)
        } else {
            checkpoint + 1
        };

        let mut from = start;
        while from <= head {
            let to = (from + CHUNK_SIZE - 1).min(head);

            let logs = client.registry_logs(from, to).await?;
            for event in logs.iter().filter_map(decode_log) {
                if let Err(e) = self.handle_event(event.clone()).await {
                    tracing::warn!(error = %e, event = ?event, "Asset event handling failed");
                }
            }

            self.records.set_checkpoint(CHECKPOINT, to)?;
            from = to + 1;
        }

        Ok(())
    }

    pub async fn handle_event(&self, event: AssetEvent) -> Result<(), ListenerError> {
        match event {
            AssetEvent::Minted { owner, did } => {
                self.emit(Topic::NftMinted, did, owner).await?;
            }
            AssetEvent::UriHashUpdated { editor, did } => {
                self.emit(Topic::NftMetadataUpdated, did.clone(), editor.clone()).await?;
                self.import_for(&editor, &did).await?;
            }
            AssetEvent::Transferred { from, to, did } => {
                tracing::debug!(did = %did, from = %from, to = %to, "Asset transferred");
                self.emit(Topic::NftTransferred, did.clone(), to.clone()).await?;
                self.import_for(&to, &did).await?;
            }
        }
        Ok(())
    }

    async fn emit(&self, topic: Topic, did: String, address: String) -> Result<(), BusError> {
        self.bus
            .emit(
                topic,
                EventPayload::Nft(NftEvent {
                    did,
                    address: Some(address),
                }),
            )
            .await?;
        Ok(())
    }

    /// Import `did` under the profile owning `address`, if any.
    async fn import_for(&self, address: &str, did: &str) -> Result<(), ListenerError> {
        let Some(profile_id) = self.accounts.profile_by_address(address)? else {
            return Ok(());
        };

        let asset = self.chain.asset(did).await?;
        self.devices.import_device(&profile_id, &asset, address).await?;
        Ok(())
    }
}
