// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! NFT endpoints. Each call signs with the account that owns the device.

use axum::{
    extract::{Path, State},
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{
    auth::ProfileId,
    blockchain::{Asset, TxOutcome},
    error::ApiError,
    state::AppState,
    validation::ValidationErrors,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct TransferRequest {
    /// Receiving address; its key must be known to the identity registry.
    pub receiver: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct BatchMintRequest {
    /// Device DIDs, all owned by the same account.
    pub nfts: Vec<String>,
}

#[utoipa::path(
    get,
    path = "/v1/nft/{key}",
    tag = "NFT",
    security(("profile_id" = [])),
    params(("key" = String, Path, description = "Device DID or USN")),
    responses(
        (status = 200, description = "On-chain asset", body = Asset),
        (status = 404, description = "Device or NFT not found")
    )
)]
pub async fn get_nft(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<Asset>, ApiError> {
    Ok(Json(state.services.nft.nft(&profile_id, &key).await?))
}

/// Mint the device NFT. The owning account needs on-chain activity.
#[utoipa::path(
    post,
    path = "/v1/nft/{key}/mint",
    tag = "NFT",
    security(("profile_id" = [])),
    params(("key" = String, Path, description = "Device DID or USN")),
    responses(
        (status = 200, description = "Mint submitted", body = TxOutcome),
        (status = 400, description = "Out of funds"),
        (status = 404, description = "Device not found")
    )
)]
pub async fn mint(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TxOutcome>, ApiError> {
    Ok(Json(state.services.nft.mint(&profile_id, &key).await?))
}

#[utoipa::path(
    post,
    path = "/v1/nft/batch-mint",
    tag = "NFT",
    security(("profile_id" = [])),
    request_body = BatchMintRequest,
    responses(
        (status = 200, description = "Mints submitted", body = [TxOutcome]),
        (status = 400, description = "Empty batch or out of funds")
    )
)]
pub async fn batch_mint(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Json(request): Json<BatchMintRequest>,
) -> Result<Json<Vec<TxOutcome>>, ApiError> {
    Ok(Json(
        state
            .services
            .nft
            .batch_mint(&profile_id, &request.nfts)
            .await?,
    ))
}

/// Point the NFT at the device's current registry checksum.
#[utoipa::path(
    post,
    path = "/v1/nft/{key}/metadata",
    tag = "NFT",
    security(("profile_id" = [])),
    params(("key" = String, Path, description = "Device DID or USN")),
    responses(
        (status = 200, description = "Update submitted", body = TxOutcome),
        (status = 404, description = "Device or NFT not found")
    )
)]
pub async fn update_metadata(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<TxOutcome>, ApiError> {
    Ok(Json(state.services.nft.update_metadata(&profile_id, &key).await?))
}

/// Transfer the NFT and hand the DID document over to the receiver.
#[utoipa::path(
    post,
    path = "/v1/nft/{key}/send",
    tag = "NFT",
    security(("profile_id" = [])),
    params(("key" = String, Path, description = "Device DID or USN")),
    request_body = TransferRequest,
    responses(
        (status = 200, description = "Transfer submitted", body = TxOutcome),
        (status = 404, description = "Device or receiver key not found")
    )
)]
pub async fn send(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(key): Path<String>,
    Json(request): Json<TransferRequest>,
) -> Result<Json<TxOutcome>, ApiError> {
    let mut errors = ValidationErrors::new();
    errors.require("receiver", &request.receiver);
    errors.into_result()?;

    Ok(Json(
        state
            .services
            .nft
            .transfer(&profile_id, &key, &request.receiver)
            .await?,
    ))
}
