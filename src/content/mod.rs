// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Content-addressable document storage.

pub mod ipfs;

use async_trait::async_trait;

pub use ipfs::IpfsClient;

#[derive(Debug, thiserror::Error)]
pub enum ContentError {
    #[error("content store request failed: {0}")]
    Request(String),

    #[error("content store response was invalid: {0}")]
    InvalidResponse(String),

    #[error("content not found: {0}")]
    NotFound(String),
}

pub type ContentResult<T> = Result<T, ContentError>;

/// Blob store addressed by content identifier.
///
/// Every call may block on network I/O.
#[async_trait]
pub trait ContentStore: Send + Sync {
    /// Compute the content identifier of `data`; store it only when
    /// `persist` is set.
    async fn put(&self, data: Vec<u8>, persist: bool) -> ContentResult<String>;

    async fn get(&self, cid: &str) -> ContentResult<Vec<u8>>;
}
