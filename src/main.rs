// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use std::sync::Arc;

use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use relational_custody_server::{
    api::router,
    blockchain::{AssetEventListener, ChainService, EvmChainClient},
    config::{AppConfig, LogFormat, ACCOUNT_CACHE_CAPACITY},
    content::IpfsClient,
    events::BroadcastFanOut,
    keyring::FileKeyring,
    registry::RegistryClient,
    state::{AppState, Collaborators, EngineSettings, Services},
    storage::{EncryptedStorage, RecordStore, RedbRecordStore, StoragePaths},
};

/// Fan-out channel capacity.
const FANOUT_CAPACITY: usize = 1024;

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("Invalid configuration");
    init_tracing(config.log_format);

    tracing::info!(
        data_dir = %config.data_dir,
        network = %config.network.name,
        chain_id = config.network.chain_id,
        "Starting Relational Custody server"
    );

    let paths = StoragePaths::new(&config.data_dir);
    let mut storage = EncryptedStorage::new(paths.clone());
    storage
        .initialize()
        .expect("Failed to initialize sealed storage");

    let records: Arc<dyn RecordStore> = Arc::new(
        RedbRecordStore::open(&paths.records_db()).expect("Failed to open record store"),
    );
    let chain_client =
        Arc::new(EvmChainClient::new(config.network.clone()).expect("Invalid chain configuration"));
    let chain: Arc<dyn ChainService> = chain_client.clone();

    let collaborators = Collaborators {
        records: records.clone(),
        keyring: Arc::new(FileKeyring::new(storage.clone())),
        chain: chain.clone(),
        content: Arc::new(IpfsClient::new(&config.ipfs_url).expect("Invalid IPFS URL")),
        registry: Arc::new(RegistryClient::new(&config.registry_url).expect("Invalid registry URL")),
        fanout: Arc::new(BroadcastFanOut::new(FANOUT_CAPACITY)),
    };
    let services = Services::wire(
        collaborators,
        &EngineSettings {
            coin_type: config.coin_type,
            registry_url: config.registry_url.clone(),
            cache_capacity: ACCOUNT_CACHE_CAPACITY,
            cache_ttl: config.account_cache_ttl,
        },
    )
    .expect("Failed to register event handlers");

    let shutdown = CancellationToken::new();

    let listener_handle = if config.network.asset_registry.is_some() {
        let listener = AssetEventListener::new(
            chain,
            services.accounts.clone(),
            services.devices.clone(),
            services.bus.clone(),
            records.clone(),
        );
        tracing::info!(poll_secs = config.listener_poll.as_secs(), "Asset event listener enabled");
        Some(tokio::spawn(listener.run(
            chain_client,
            config.listener_poll,
            shutdown.clone(),
        )))
    } else {
        tracing::info!("ASSET_REGISTRY_ADDRESS not set, asset event listener disabled");
        None
    };

    let state = AppState::new(services, storage, records, config.batch_concurrency);
    let app = router(state);

    let addr = config.bind_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind listen address");
    tracing::info!(addr = %addr, "Listening (docs at /docs)");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await
        .expect("HTTP server failed");

    shutdown.cancel();
    if let Some(handle) = listener_handle {
        if let Err(e) = handle.await {
            tracing::warn!(error = %e, "Asset event listener task failed");
        }
    }
    tracing::info!("Shutdown complete");
}

fn init_tracing(format: LogFormat) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,tower_http=debug".into());
    let registry = tracing_subscriber::registry().with(filter);

    match format {
        LogFormat::Json => registry.with(tracing_subscriber::fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(tracing_subscriber::fmt::layer()).init(),
    }
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("Received Ctrl+C"),
        _ = terminate => tracing::info!("Received SIGTERM"),
    }

    shutdown.cancel();
}
