// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Blockchain integration for an EVM chain (Avalanche C-Chain by default).
//!
//! This module provides:
//! - The [`ChainService`] seam the engines call (activity, balances,
//!   signed transactions, asset lookups)
//! - [`EvmChainClient`], its alloy implementation
//! - The asset registry contract binding
//! - The chain-event listener that re-emits asset events on the bus

pub mod assets;
pub mod client;
pub mod listener;
pub mod signing;
pub mod types;

use async_trait::async_trait;
use k256::ecdsa::SigningKey;

pub use client::EvmChainClient;
pub use listener::AssetEventListener;
pub use types::*;

/// Errors that can occur during blockchain operations.
#[derive(Debug, thiserror::Error)]
pub enum ChainError {
    #[error("Invalid RPC URL: {0}")]
    InvalidRpcUrl(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Invalid private key: {0}")]
    InvalidPrivateKey(String),

    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("RPC error: {0}")]
    Rpc(String),

    #[error("Contract error: {0}")]
    Contract(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("out of funds")]
    InsufficientFunds,

    #[error("not found: {0}")]
    NotFound(String),

    #[error("asset registry is not configured")]
    RegistryNotConfigured,
}

impl ChainError {
    /// Translate a node rejection, recognising the insufficient-funds
    /// sentinel. Unrecognised messages pass through unchanged.
    pub fn from_send_failure(message: impl Into<String>) -> Self {
        let message = message.into();
        if message.to_ascii_lowercase().contains("insufficient funds") {
            ChainError::InsufficientFunds
        } else {
            ChainError::TransactionFailed(message)
        }
    }
}

pub type ChainResult<T> = Result<T, ChainError>;

/// Chain collaborator used by the engines.
///
/// Every call may block on network I/O.
#[async_trait]
pub trait ChainService: Send + Sync {
    /// `true` once the address has sent a transaction or holds funds.
    async fn has_on_chain_activity(&self, address: &str) -> ChainResult<bool>;

    async fn balance(&self, address: &str) -> ChainResult<TokenBalance>;

    /// Sign `msg` with `key` and broadcast it.
    async fn send_signed_tx(&self, msg: ChainMsg, key: &SigningKey) -> ChainResult<TxOutcome>;

    async fn assets_by_address(&self, address: &str) -> ChainResult<Vec<Asset>>;

    /// Fails `NotFound` when no asset carries `did`.
    async fn asset(&self, did: &str) -> ChainResult<Asset>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn insufficient_funds_is_remapped() {
        let err = ChainError::from_send_failure(
            "server returned an error response: insufficient funds for gas * price + value",
        );
        assert!(matches!(err, ChainError::InsufficientFunds));
        assert_eq!(err.to_string(), "out of funds");
    }

    #[test]
    fn other_failures_pass_through() {
        let err = ChainError::from_send_failure("nonce too low");
        assert!(matches!(err, ChainError::TransactionFailed(ref m) if m == "nonce too low"));
    }
}
