// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Per-profile exclusive sections for wallet and account mutations.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Default)]
pub struct ProfileLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl ProfileLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for the profile's section. Held until the guard drops.
    pub async fn lock(&self, profile_id: &str) -> OwnedMutexGuard<()> {
        let section = {
            let mut sections = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(sections.entry(profile_id.to_string()).or_default())
        };
        section.lock_owned().await
    }
}
