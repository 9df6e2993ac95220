// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! LRU cache for per-address chain state.
//!
//! Listing a profile's accounts queries balance and asset count for every
//! address. Snapshots are cached for a short TTL and invalidated by the
//! fan-out handler whenever an event touches the address.

use std::num::NonZeroUsize;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use alloy::primitives::U256;
use lru::LruCache;

use crate::blockchain::TokenBalance;

/// Chain state of one address.
#[derive(Debug, Clone, PartialEq)]
pub struct AccountSnapshot {
    pub balance: TokenBalance,
    pub asset_count: usize,
}

impl AccountSnapshot {
    /// Zero balance and no assets, for an address whose chain state could
    /// not be read. Never cached.
    pub fn unknown() -> Self {
        Self {
            balance: TokenBalance::native(U256::ZERO, ""),
            asset_count: 0,
        }
    }
}

struct CacheEntry {
    snapshot: AccountSnapshot,
    inserted_at: Instant,
}

/// In-process LRU cache for hot account lookups.
pub struct AccountSnapshotCache {
    cache: Mutex<LruCache<String, CacheEntry>>,
    ttl: Duration,
}

impl AccountSnapshotCache {
    /// - `capacity`: max number of addresses to cache.
    /// - `ttl`: time-to-live for each entry.
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self {
            cache: Mutex::new(LruCache::new(
                NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN),
            )),
            ttl,
        }
    }

    /// Returns `None` if not cached or expired.
    pub fn get(&self, address: &str) -> Option<AccountSnapshot> {
        let key = address.to_lowercase();
        let mut cache = self.cache.lock().ok()?;
        if let Some(entry) = cache.get(&key) {
            if entry.inserted_at.elapsed() < self.ttl {
                return Some(entry.snapshot.clone());
            }
            cache.pop(&key);
        }
        None
    }

    pub fn put(&self, address: &str, snapshot: AccountSnapshot) {
        let key = address.to_lowercase();
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(
                key,
                CacheEntry {
                    snapshot,
                    inserted_at: Instant::now(),
                },
            );
        }
    }

    pub fn invalidate(&self, address: &str) {
        let key = address.to_lowercase();
        if let Ok(mut cache) = self.cache.lock() {
            cache.pop(&key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::U256;

    fn snapshot(count: usize) -> AccountSnapshot {
        AccountSnapshot {
            balance: TokenBalance::native(U256::from(1_500_000_000_000_000_000u64), "AVAX"),
            asset_count: count,
        }
    }

    #[test]
    fn cache_put_and_get() {
        let cache = AccountSnapshotCache::new(10, Duration::from_secs(300));
        assert!(cache.get("0xABCD").is_none());

        cache.put("0xABCD", snapshot(2));
        assert_eq!(cache.get("0xabcd").unwrap().asset_count, 2);
    }

    #[test]
    fn cache_invalidate() {
        let cache = AccountSnapshotCache::new(10, Duration::from_secs(300));
        cache.put("0xabcd", snapshot(1));
        cache.invalidate("0xABCD");
        assert!(cache.get("0xabcd").is_none());
    }

    #[test]
    fn cache_ttl_expiry() {
        let cache = AccountSnapshotCache::new(10, Duration::from_millis(1));
        cache.put("0xabcd", snapshot(1));

        std::thread::sleep(Duration::from_millis(5));

        assert!(cache.get("0xabcd").is_none());
    }
}
