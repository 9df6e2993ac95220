// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Relational Custody - Multi-tenant Wallet & Asset Identity Service
//!
//! Custodial HD wallets and imported accounts for many profiles, plus
//! physical-asset records ("devices") anchored to a DID registry and an
//! on-chain asset registry.
//!
//! ## Modules
//!
//! - `account` - Profile, wallet and account lifecycle
//! - `device` - Device records and the document pipeline
//! - `nft` - Mint, metadata update and transfer of device NFTs
//! - `events` - In-process event bus, built-in handlers, fan-out
//! - `api` - HTTP API handlers (Axum)
//! - `auth` - Gateway profile header
//! - `blockchain` - EVM chain client, asset registry, chain listener
//! - `keyring` - Sealed credential store and HD derivation
//! - `registry` / `content` - Identity registry and IPFS clients
//! - `storage` - Record store (redb) and sealed files

pub mod account;
pub mod api;
pub mod auth;
pub mod blockchain;
pub mod config;
pub mod content;
pub mod device;
pub mod did;
pub mod error;
pub mod events;
pub mod keyring;
pub mod nft;
pub mod registry;
pub mod saga;
pub mod state;
pub mod storage;
pub mod validation;

#[cfg(test)]
pub(crate) mod testing;
