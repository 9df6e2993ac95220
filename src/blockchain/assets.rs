// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Asset registry contract interactions.
//!
//! Each physical asset is an NFT keyed by its DID. The registry stores the
//! USN, the owner, the DID-document URI and the URI hash (the document
//! checksum at mint or last metadata update).

use std::str::FromStr;

use alloy::{
    primitives::Address,
    providers::Provider,
    sol,
};

use super::types::Asset;
use super::ChainError;

sol! {
    #[sol(rpc)]
    interface IAssetRegistry {
        struct AssetRecord {
            string did;
            string usn;
            address owner;
            string uri;
            string uriHash;
        }

        event AssetMinted(address indexed owner, string did);
        event AssetTransferred(address indexed from, address indexed to, string did);
        event AssetUriHashUpdated(address indexed editor, string did, string uriHash);

        function mint(string did, string usn, string uri, string uriHash) external;
        function transfer(string did, address to) external;
        function updateUriHash(string did, string uriHash) external;
        function exists(string did) external view returns (bool);
        function assetOf(string did) external view returns (AssetRecord memory);
        function assetsOf(address owner) external view returns (AssetRecord[] memory);
    }
}

impl From<IAssetRegistry::AssetRecord> for Asset {
    fn from(record: IAssetRegistry::AssetRecord) -> Self {
        Asset {
            did: record.did,
            usn: record.usn,
            owner: format!("{:?}", record.owner).to_lowercase(),
            uri: record.uri,
            uri_hash: record.uriHash,
        }
    }
}

/// Read-side wrapper around the registry contract.
pub struct AssetRegistry<P> {
    contract: IAssetRegistry::IAssetRegistryInstance<P>,
}

impl<P: Provider + Clone> AssetRegistry<P> {
    pub fn new(provider: &P, contract_address: &str) -> Result<Self, ChainError> {
        let address = parse_address(contract_address)?;
        let contract = IAssetRegistry::new(address, provider.clone());
        Ok(Self { contract })
    }

    pub async fn assets_of(&self, owner: &str) -> Result<Vec<Asset>, ChainError> {
        let owner = parse_address(owner)?;
        let records = self
            .contract
            .assetsOf(owner)
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        Ok(records.into_iter().map(Asset::from).collect())
    }

    pub async fn asset_of(&self, did: &str) -> Result<Asset, ChainError> {
        let exists = self
            .contract
            .exists(did.to_string())
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        if !exists {
            return Err(ChainError::NotFound(did.to_string()));
        }

        let record = self
            .contract
            .assetOf(did.to_string())
            .call()
            .await
            .map_err(|e| ChainError::Contract(e.to_string()))?;
        Ok(record.into())
    }
}

pub fn parse_address(address: &str) -> Result<Address, ChainError> {
    Address::from_str(address).map_err(|e| ChainError::InvalidAddress(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::sol_types::SolEvent;

    #[test]
    fn record_converts_with_lowercase_owner() {
        let owner = Address::from_str("0x9858EfFD232B4033E47d90003D41EC34EcaEda94").unwrap();
        let asset: Asset = IAssetRegistry::AssetRecord {
            did: "did:obada:abc".to_string(),
            usn: "2zYt3Xq5vYQm".to_string(),
            owner,
            uri: "https://registry/api/v1.0/diddoc/did:obada:abc".to_string(),
            uriHash: "deadbeef".to_string(),
        }
        .into();

        assert_eq!(asset.owner, "0x9858effd232b4033e47d90003d41ec34ecaeda94");
        assert_eq!(asset.uri_hash, "deadbeef");
    }

    #[test]
    fn event_signatures_are_distinct() {
        let minted = IAssetRegistry::AssetMinted::SIGNATURE_HASH;
        let transferred = IAssetRegistry::AssetTransferred::SIGNATURE_HASH;
        let updated = IAssetRegistry::AssetUriHashUpdated::SIGNATURE_HASH;
        assert_ne!(minted, transferred);
        assert_ne!(minted, updated);
        assert_ne!(transferred, updated);
    }

    #[test]
    fn bad_address_is_rejected() {
        assert!(matches!(parse_address("nope"), Err(ChainError::InvalidAddress(_))));
    }
}
