// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! EVM client for blockchain interactions.

use alloy::{
    network::Ethereum,
    providers::{
        fillers::{BlobGasFiller, ChainIdFiller, FillProvider, GasFiller, JoinFill, NonceFiller},
        Identity, Provider, ProviderBuilder, RootProvider,
    },
    rpc::types::{Filter, Log, TransactionRequest},
};
use async_trait::async_trait;
use k256::ecdsa::SigningKey;

use super::assets::{parse_address, AssetRegistry, IAssetRegistry};
use super::signing::wallet_from_key;
use super::types::*;
use super::{ChainError, ChainResult, ChainService};

/// HTTP provider type (with all fillers).
type HttpProvider = FillProvider<
    JoinFill<
        Identity,
        JoinFill<GasFiller, JoinFill<BlobGasFiller, JoinFill<NonceFiller, ChainIdFiller>>>,
    >,
    RootProvider<Ethereum>,
>;

/// EVM chain client.
pub struct EvmChainClient {
    network: NetworkConfig,
    url: url::Url,
    provider: HttpProvider,
}

impl EvmChainClient {
    pub fn new(network: NetworkConfig) -> ChainResult<Self> {
        let url: url::Url = network
            .rpc_url
            .parse()
            .map_err(|e: url::ParseError| ChainError::InvalidRpcUrl(e.to_string()))?;

        let provider = ProviderBuilder::new().connect_http(url.clone());

        Ok(Self {
            network,
            url,
            provider,
        })
    }

    pub fn network(&self) -> &NetworkConfig {
        &self.network
    }

    fn registry_address(&self) -> ChainResult<&str> {
        self.network
            .asset_registry
            .as_deref()
            .ok_or(ChainError::RegistryNotConfigured)
    }

    /// Get the current block number.
    pub async fn block_number(&self) -> ChainResult<u64> {
        self.provider
            .get_block_number()
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    /// Asset registry logs in `[from, to]`.
    pub async fn registry_logs(&self, from: u64, to: u64) -> ChainResult<Vec<Log>> {
        let address = parse_address(self.registry_address()?)?;
        let filter = Filter::new().address(address).from_block(from).to_block(to);
        self.provider
            .get_logs(&filter)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))
    }

    async fn send_native(&self, key: &SigningKey, to: &str, amount: &str) -> ChainResult<TxOutcome> {
        let to_addr = parse_address(to)?;
        let value = parse_amount(amount, NATIVE_DECIMALS)?;

        let provider = ProviderBuilder::new()
            .wallet(wallet_from_key(key))
            .connect_http(self.url.clone());

        let tx = TransactionRequest::default().to(to_addr).value(value);
        let pending = provider
            .send_transaction(tx)
            .await
            .map_err(|e| ChainError::from_send_failure(e.to_string()))?;

        Ok(TxOutcome {
            tx_hash: format!("{:?}", pending.tx_hash()),
        })
    }

    async fn send_registry_call(&self, key: &SigningKey, msg: ChainMsg) -> ChainResult<TxOutcome> {
        let registry = parse_address(self.registry_address()?)?;

        let provider = ProviderBuilder::new()
            .wallet(wallet_from_key(key))
            .connect_http(self.url.clone());
        let contract = IAssetRegistry::new(registry, &provider);

        let pending = match msg {
            ChainMsg::Mint {
                did,
                usn,
                uri,
                uri_hash,
            } => contract.mint(did, usn, uri, uri_hash).send().await,
            ChainMsg::Transfer { did, to } => contract.transfer(did, parse_address(&to)?).send().await,
            ChainMsg::UpdateUriHash { did, uri_hash } => {
                contract.updateUriHash(did, uri_hash).send().await
            }
            ChainMsg::Send { .. } => {
                return Err(ChainError::TransactionFailed(
                    "native transfer routed to registry".to_string(),
                ))
            }
        }
        .map_err(|e| ChainError::from_send_failure(e.to_string()))?;

        Ok(TxOutcome {
            tx_hash: format!("{:?}", pending.tx_hash()),
        })
    }
}

#[async_trait]
impl ChainService for EvmChainClient {
    async fn has_on_chain_activity(&self, address: &str) -> ChainResult<bool> {
        let addr = parse_address(address)?;

        let nonce = self
            .provider
            .get_transaction_count(addr)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        if nonce > 0 {
            return Ok(true);
        }

        let balance = self
            .provider
            .get_balance(addr)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;
        Ok(!balance.is_zero())
    }

    async fn balance(&self, address: &str) -> ChainResult<TokenBalance> {
        let addr = parse_address(address)?;

        let balance = self
            .provider
            .get_balance(addr)
            .await
            .map_err(|e| ChainError::Rpc(e.to_string()))?;

        Ok(TokenBalance::native(balance, &self.network.native_symbol))
    }

    async fn send_signed_tx(&self, msg: ChainMsg, key: &SigningKey) -> ChainResult<TxOutcome> {
        match msg {
            ChainMsg::Send { to, amount } => self.send_native(key, &to, &amount).await,
            other => self.send_registry_call(key, other).await,
        }
    }

    async fn assets_by_address(&self, address: &str) -> ChainResult<Vec<Asset>> {
        let Some(registry) = self.network.asset_registry.as_deref() else {
            return Ok(Vec::new());
        };
        AssetRegistry::new(&self.provider, registry)?
            .assets_of(address)
            .await
    }

    async fn asset(&self, did: &str) -> ChainResult<Asset> {
        AssetRegistry::new(&self.provider, self.registry_address()?)?
            .asset_of(did)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_rpc_url_is_rejected() {
        let mut network = NetworkConfig::fuji();
        network.rpc_url = "not a url".to_string();
        assert!(matches!(
            EvmChainClient::new(network),
            Err(ChainError::InvalidRpcUrl(_))
        ));
    }

    #[tokio::test]
    async fn assets_are_empty_without_registry() {
        let client = EvmChainClient::new(NetworkConfig::fuji()).unwrap();
        let assets = client
            .assets_by_address("0x9858effd232b4033e47d90003d41ec34ecaeda94")
            .await
            .unwrap();
        assert!(assets.is_empty());
    }

    #[tokio::test]
    async fn registry_calls_need_a_contract() {
        let client = EvmChainClient::new(NetworkConfig::fuji()).unwrap();
        assert!(matches!(
            client.asset("did:obada:abc").await,
            Err(ChainError::RegistryNotConfigured)
        ));
    }
}
