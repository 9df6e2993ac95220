// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Device (physical asset) endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    auth::ProfileId,
    blockchain::TxOutcome,
    device::{batch::save_batch, BatchSaveDevice, ChecksumPreview, Device, DeviceEngine, SaveDevice},
    did::AssetDid,
    error::ApiError,
    state::AppState,
    validation::ValidationErrors,
};

#[derive(Debug, Clone, Deserialize, IntoParams)]
pub struct DeviceSearch {
    /// Owning account address; all devices of the profile when absent.
    pub q: Option<String>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct BatchSaveResponse {
    pub devices: Vec<Device>,
    /// Mint transactions, when `should_mint` was set.
    pub transactions: Vec<TxOutcome>,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct GenerateDidRequest {
    pub serial_number: String,
    pub manufacturer: String,
    pub part_number: String,
}

#[utoipa::path(
    get,
    path = "/v1/devices",
    tag = "Devices",
    security(("profile_id" = [])),
    params(DeviceSearch),
    responses(
        (status = 200, description = "Devices of the profile", body = [Device])
    )
)]
pub async fn list_devices(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Query(search): Query<DeviceSearch>,
) -> Result<Json<Vec<Device>>, ApiError> {
    let devices = &state.services.devices;
    let found = match search.q.as_deref().map(str::trim).filter(|q| !q.is_empty()) {
        Some(address) => devices.get_by_address(&profile_id, address)?,
        None => devices.get_by_user(&profile_id)?,
    };
    Ok(Json(found))
}

/// Save a device under one of the caller's accounts.
///
/// Registers the DID on first save, uploads the documents and records the
/// new metadata in the identity registry.
#[utoipa::path(
    post,
    path = "/v1/devices",
    tag = "Devices",
    security(("profile_id" = [])),
    request_body = SaveDevice,
    responses(
        (status = 201, description = "Device saved", body = Device),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn save_device(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Json(request): Json<SaveDevice>,
) -> Result<(StatusCode, Json<Device>), ApiError> {
    request.validate()?;
    let key = state
        .services
        .accounts
        .account_private_key(&profile_id, &request.address)?;
    let device = state.services.devices.save(&profile_id, request, &key).await?;
    Ok((StatusCode::CREATED, Json(device)))
}

/// Save many devices for one account, optionally minting them afterwards.
#[utoipa::path(
    post,
    path = "/v1/devices/batch",
    tag = "Devices",
    security(("profile_id" = [])),
    request_body = BatchSaveDevice,
    responses(
        (status = 201, description = "Devices saved", body = BatchSaveResponse),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn save_devices(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Json(request): Json<BatchSaveDevice>,
) -> Result<(StatusCode, Json<BatchSaveResponse>), ApiError> {
    let mut errors = ValidationErrors::new();
    errors.require("address", &request.address);
    errors.into_result()?;

    let key = state
        .services
        .accounts
        .account_private_key(&profile_id, &request.address)?;
    let should_mint = request.should_mint;

    let devices = save_batch(
        Arc::clone(&state.services.devices),
        &profile_id,
        request,
        key,
        state.batch_concurrency,
    )
    .await?;

    let transactions = if should_mint && !devices.is_empty() {
        let dids: Vec<String> = devices.iter().map(|d| d.did.clone()).collect();
        state.services.nft.batch_mint(&profile_id, &dids).await?
    } else {
        Vec::new()
    };

    Ok((
        StatusCode::CREATED,
        Json(BatchSaveResponse {
            devices,
            transactions,
        }),
    ))
}

/// Look a device up by DID or USN.
#[utoipa::path(
    get,
    path = "/v1/devices/{key}",
    tag = "Devices",
    security(("profile_id" = [])),
    params(("key" = String, Path, description = "DID or USN")),
    responses(
        (status = 200, description = "Device", body = Device),
        (status = 404, description = "Device not found")
    )
)]
pub async fn get_device(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Device>, ApiError> {
    Ok(Json(state.services.devices.get(&profile_id, &key)?))
}

#[utoipa::path(
    delete,
    path = "/v1/devices/{key}",
    tag = "Devices",
    security(("profile_id" = [])),
    params(("key" = String, Path, description = "DID or USN")),
    responses(
        (status = 204, description = "Device deleted"),
        (status = 404, description = "Device not found")
    )
)]
pub async fn delete_device(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.services.devices.delete(&profile_id, &key)?;
    Ok(StatusCode::NO_CONTENT)
}

/// Registry checksum the device would get, without storing anything.
#[utoipa::path(
    post,
    path = "/v1/checksum",
    tag = "Devices",
    request_body = SaveDevice,
    responses(
        (status = 200, description = "Checksum preview", body = ChecksumPreview),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn checksum(
    State(state): State<AppState>,
    Json(request): Json<SaveDevice>,
) -> Result<Json<ChecksumPreview>, ApiError> {
    Ok(Json(state.services.devices.checksum_preview(&request).await?))
}

/// DID and USN of a physical asset.
#[utoipa::path(
    post,
    path = "/v1/did",
    tag = "Devices",
    request_body = GenerateDidRequest,
    responses(
        (status = 200, description = "Asset identifiers", body = AssetDid),
        (status = 400, description = "Validation failed")
    )
)]
pub async fn generate_did(Json(request): Json<GenerateDidRequest>) -> Result<Json<AssetDid>, ApiError> {
    let mut errors = ValidationErrors::new();
    errors.require("serial_number", &request.serial_number);
    errors.require("manufacturer", &request.manufacturer);
    errors.require("part_number", &request.part_number);
    errors.into_result()?;

    Ok(Json(DeviceEngine::generate_did(
        &request.serial_number,
        &request.manufacturer,
        &request.part_number,
    )))
}
