// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::blockchain::TokenBalance;
use crate::keyring::CredentialRecord;
use crate::storage::AccountSnapshot;

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct NewProfile {
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Profile {
    pub id: String,
    pub email: String,
}

/// Stored under `profiles:{pid}:wallet`. Never serialized to clients.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wallet {
    pub mnemonic: String,
    /// Highest allocated HD index.
    pub account_index: u32,
}

impl std::fmt::Debug for Wallet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Wallet")
            .field("mnemonic", &"<redacted>")
            .field("account_index", &self.account_index)
            .finish()
    }
}

/// Per-account metadata stored under the hd/imported account keys.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AccountMetadata {
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Account {
    pub name: String,
    /// Uppercase hex of the compressed public key.
    #[serde(rename = "pub_key")]
    pub public_key: String,
    pub address: String,
    pub balance: TokenBalance,
    #[serde(rename = "nft_count")]
    pub asset_count: usize,
}

impl Account {
    pub fn from_parts(record: &CredentialRecord, metadata: AccountMetadata, snapshot: AccountSnapshot) -> Self {
        Self {
            name: metadata.name,
            public_key: record.public_key.clone(),
            address: record.address.clone(),
            balance: snapshot.balance,
            asset_count: snapshot.asset_count,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, ToSchema)]
pub struct ProfileAccounts {
    pub hd_accounts: Vec<Account>,
    pub imported_accounts: Vec<Account>,
}

#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct Balance {
    pub address: String,
    pub balance: TokenBalance,
}
