// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Runtime Configuration
//!
//! This module defines environment variable names and default values used
//! throughout the application. Configuration is loaded from the environment
//! at startup by [`AppConfig::from_env`].
//!
//! ## Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `DATA_DIR` | Root of sealed storage (keyring files and `records.redb`) | `/data` |
//! | `HOST` | Server bind address | `0.0.0.0` |
//! | `PORT` | Server bind port | `8080` |
//! | `LOG_FORMAT` | Logging format (`json` or `pretty`) | `pretty` |
//! | `RUST_LOG` | Log level filter | `info,tower_http=debug` |
//! | `RPC_URL` | EVM JSON-RPC endpoint | Avalanche Fuji C-Chain |
//! | `CHAIN_ID` | Chain id | `43113` |
//! | `ASSET_REGISTRY_ADDRESS` | Asset registry contract; the chain listener is off when unset | unset |
//! | `REGISTRY_URL` | Identity registry base URL | `http://localhost:2017` |
//! | `IPFS_URL` | IPFS HTTP API base URL | `http://localhost:5001` |
//! | `HD_COIN_TYPE` | BIP-44 coin type of derived accounts | `60` |
//! | `BATCH_CONCURRENCY` | Worker cap for batch device saves | CPU count |
//! | `LISTENER_POLL_SECS` | Chain listener poll interval | `5` |
//! | `ACCOUNT_CACHE_TTL_SECS` | TTL of cached balances and asset counts | `30` |

use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

use crate::blockchain::NetworkConfig;
use crate::storage::paths::DATA_ROOT;

/// Environment variable name for the sealed data directory path.
///
/// All keyring material and the record database live here.
///
/// # Default
/// `/data`
pub const DATA_DIR_ENV: &str = "DATA_DIR";
pub const HOST_ENV: &str = "HOST";
pub const PORT_ENV: &str = "PORT";
pub const LOG_FORMAT_ENV: &str = "LOG_FORMAT";
pub const RPC_URL_ENV: &str = "RPC_URL";
pub const CHAIN_ID_ENV: &str = "CHAIN_ID";
pub const ASSET_REGISTRY_ADDRESS_ENV: &str = "ASSET_REGISTRY_ADDRESS";
pub const REGISTRY_URL_ENV: &str = "REGISTRY_URL";
pub const IPFS_URL_ENV: &str = "IPFS_URL";
pub const HD_COIN_TYPE_ENV: &str = "HD_COIN_TYPE";
pub const BATCH_CONCURRENCY_ENV: &str = "BATCH_CONCURRENCY";
pub const LISTENER_POLL_SECS_ENV: &str = "LISTENER_POLL_SECS";
pub const ACCOUNT_CACHE_TTL_SECS_ENV: &str = "ACCOUNT_CACHE_TTL_SECS";

pub const DEFAULT_REGISTRY_URL: &str = "http://localhost:2017";
pub const DEFAULT_IPFS_URL: &str = "http://localhost:5001";

/// Entries kept by the account snapshot cache.
pub const ACCOUNT_CACHE_CAPACITY: usize = 10_000;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid value for {name}: {value:?} ({reason})")]
    Invalid {
        name: &'static str,
        value: String,
        reason: String,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Pretty,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub data_dir: String,
    pub host: String,
    pub port: u16,
    pub log_format: LogFormat,
    pub network: NetworkConfig,
    pub registry_url: String,
    pub ipfs_url: String,
    pub coin_type: u32,
    pub batch_concurrency: usize,
    pub listener_poll: Duration,
    pub account_cache_ttl: Duration,
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(std::env::vars().collect())
    }

    /// Build from an explicit variable map. Blank values count as unset.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let get = |name: &str| {
            vars.get(name)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut network = NetworkConfig::fuji();
        if let Some(url) = get(RPC_URL_ENV) {
            network.rpc_url = url;
        }
        network.chain_id = parse_or(CHAIN_ID_ENV, get(CHAIN_ID_ENV), network.chain_id)?;
        network.asset_registry = get(ASSET_REGISTRY_ADDRESS_ENV);

        let log_format = match get(LOG_FORMAT_ENV).as_deref() {
            Some("json") => LogFormat::Json,
            _ => LogFormat::Pretty,
        };

        let batch_concurrency = parse_or(
            BATCH_CONCURRENCY_ENV,
            get(BATCH_CONCURRENCY_ENV),
            std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1),
        )?;
        if batch_concurrency == 0 {
            return Err(ConfigError::Invalid {
                name: BATCH_CONCURRENCY_ENV,
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(Self {
            data_dir: get(DATA_DIR_ENV).unwrap_or_else(|| DATA_ROOT.to_string()),
            host: get(HOST_ENV).unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(PORT_ENV, get(PORT_ENV), 8080)?,
            log_format,
            network,
            registry_url: get(REGISTRY_URL_ENV).unwrap_or_else(|| DEFAULT_REGISTRY_URL.to_string()),
            ipfs_url: get(IPFS_URL_ENV).unwrap_or_else(|| DEFAULT_IPFS_URL.to_string()),
            coin_type: parse_or(HD_COIN_TYPE_ENV, get(HD_COIN_TYPE_ENV), 60)?,
            batch_concurrency,
            listener_poll: Duration::from_secs(parse_or(
                LISTENER_POLL_SECS_ENV,
                get(LISTENER_POLL_SECS_ENV),
                5,
            )?),
            account_cache_ttl: Duration::from_secs(parse_or(
                ACCOUNT_CACHE_TTL_SECS_ENV,
                get(ACCOUNT_CACHE_TTL_SECS_ENV),
                30,
            )?),
        })
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

fn parse_or<T>(name: &'static str, value: Option<String>, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match value {
        None => Ok(default),
        Some(raw) => raw.parse().map_err(|e: T::Err| ConfigError::Invalid {
            name,
            value: raw.clone(),
            reason: e.to_string(),
        }),
    }
}
