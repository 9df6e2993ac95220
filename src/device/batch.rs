// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Concurrent batch save.
//!
//! Items are saved independently by a bounded worker set. The first error
//! is returned once every worker has finished; items that succeeded stay
//! persisted.

use std::sync::Arc;

use k256::ecdsa::SigningKey;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use super::error::{DeviceError, DeviceResult};
use super::models::{BatchSaveDevice, Device};
use super::DeviceEngine;

pub async fn save_batch(
    engine: Arc<DeviceEngine>,
    profile_id: &str,
    request: BatchSaveDevice,
    key: SigningKey,
    concurrency: usize,
) -> DeviceResult<Vec<Device>> {
    let permits = Arc::new(Semaphore::new(concurrency.max(1)));
    let key = Arc::new(key);
    let mut workers = JoinSet::new();

    for (index, mut item) in request.devices.into_iter().enumerate() {
        item.address = request.address.clone();
        let engine = Arc::clone(&engine);
        let permits = Arc::clone(&permits);
        let key = Arc::clone(&key);
        let profile_id = profile_id.to_string();

        workers.spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|e| DeviceError::Worker(e.to_string()))?;
            engine
                .save(&profile_id, item, &key)
                .await
                .map(|device| (index, device))
        });
    }

    let mut saved = Vec::new();
    let mut first_error = None;

    while let Some(joined) = workers.join_next().await {
        match joined {
            Ok(Ok(device)) => saved.push(device),
            Ok(Err(e)) => {
                tracing::warn!(profile_id = %profile_id, error = %e, "Batch item failed");
                first_error.get_or_insert(e);
            }
            Err(e) => {
                first_error.get_or_insert(DeviceError::Worker(e.to_string()));
            }
        }
    }

    if let Some(err) = first_error {
        return Err(err);
    }

    saved.sort_by_key(|(index, _)| *index);
    Ok(saved.into_iter().map(|(_, device)| device).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::device::models::SaveDevice;
    use crate::testing::Harness;
    use k256::elliptic_curve::rand_core::OsRng;

    fn item(serial: &str) -> SaveDevice {
        SaveDevice {
            serial_number: serial.to_string(),
            manufacturer: "SONY".to_string(),
            part_number: "PN1".to_string(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn batch_saves_in_request_order() {
        let h = Harness::new();
        let key = SigningKey::random(&mut OsRng);
        let request = BatchSaveDevice {
            should_mint: false,
            devices: vec![item("SN1"), item("SN2"), item("SN3")],
            address: "0xabc".to_string(),
        };

        let saved = save_batch(Arc::clone(&h.services.devices), "u1", request, key, 2)
            .await
            .unwrap();

        let serials: Vec<_> = saved.iter().map(|d| d.serial_number.as_str()).collect();
        assert_eq!(serials, vec!["SN1", "SN2", "SN3"]);
        assert!(saved.iter().all(|d| d.address == "0xabc"));
    }

    #[tokio::test]
    async fn failing_item_does_not_roll_back_the_others() {
        let h = Harness::new();
        let key = SigningKey::random(&mut OsRng);
        let request = BatchSaveDevice {
            should_mint: false,
            devices: vec![item("SN1"), item(""), item("SN3")],
            address: "0xabc".to_string(),
        };

        let err = save_batch(Arc::clone(&h.services.devices), "u1", request, key, 4)
            .await
            .unwrap_err();
        assert!(matches!(err, DeviceError::Validation(_)));
        assert_eq!(h.services.devices.get_by_user("u1").unwrap().len(), 2);
    }
}
