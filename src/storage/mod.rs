// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Storage Module
//!
//! Two persistence layers share one sealed data directory:
//!
//! - **Record store** (`kv`): ordered redb table holding profiles, wallets,
//!   account metadata and devices under namespaced keys (`keys`).
//! - **Sealed files** (`encrypted_fs`): credential material written by the
//!   keyring as plain files on a volume the deployment mounts encrypted.
//!
//! ## Storage Layout
//!
//! ```text
//! /data/
//!   records.redb            # profiles:*, devices:*, listener checkpoints
//!   keyring/{name}/
//!     meta.json             # address, public key, explicit owner
//!     key.pem               # PKCS#8 private key (NEVER exposed via API)
//!   keyring-index/
//!     {address}.json        # address -> credential name
//! ```
//!
//! ## Important Notes
//!
//! - The record store and the keyring share no transaction. Writes that
//!   touch both are sequenced through [`crate::saga::Saga`].
//! - DO NOT implement any storage crypto in Rust.

pub mod cache;
pub mod encrypted_fs;
pub mod keys;
pub mod kv;
pub mod ownership;
pub mod paths;

pub use cache::{AccountSnapshot, AccountSnapshotCache};
pub use encrypted_fs::{EncryptedStorage, StorageError, StorageResult};
pub use kv::{KvError, KvResult, RecordStore, RedbRecordStore, WriteBatch};
pub use ownership::{OwnedResource, OwnershipError, RequireOwner};
pub use paths::StoragePaths;
