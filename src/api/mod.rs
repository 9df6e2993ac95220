// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    routing::{delete, get, post},
    Router,
};
use tower_http::{
    cors::CorsLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};
use utoipa::{
    openapi::security::{ApiKey, ApiKeyValue, SecurityScheme},
    Modify, OpenApi,
};
use utoipa_swagger_ui::SwaggerUi;

use crate::{
    account::{Account, AccountMetadata, Balance, NewProfile, Profile, ProfileAccounts},
    auth::PROFILE_ID_HEADER,
    blockchain::{Asset, TokenBalance, TxOutcome},
    device::{BatchSaveDevice, ChecksumPreview, Device, DeviceDocument, SaveDevice, SaveDeviceDocument},
    did::AssetDid,
    state::AppState,
    validation::FieldError,
};

pub mod accounts;
pub mod devices;
pub mod health;
pub mod nft;

pub fn router(state: AppState) -> Router {
    let v1_routes = Router::new()
        .route("/accounts", get(accounts::list_accounts))
        .route("/accounts/register", post(accounts::register))
        .route("/accounts/profile", get(accounts::get_profile))
        .route("/accounts/new-wallet", post(accounts::new_wallet))
        .route("/accounts/import-wallet", post(accounts::import_wallet))
        .route("/accounts/wallet", delete(accounts::delete_wallet))
        .route("/accounts/new-mnemonic", get(accounts::new_mnemonic))
        .route("/accounts/mnemonic", get(accounts::get_mnemonic))
        .route("/accounts/new-account", post(accounts::new_account))
        .route("/accounts/import-account", post(accounts::import_account))
        .route("/accounts/export-account", post(accounts::export_account))
        .route(
            "/accounts/{address}",
            get(accounts::get_account)
                .post(accounts::update_account)
                .delete(accounts::delete_account),
        )
        .route("/accounts/{address}/balance", get(accounts::get_balance))
        .route("/accounts/{address}/send-coins", post(accounts::send_coins))
        .route(
            "/devices",
            get(devices::list_devices).post(devices::save_device),
        )
        .route("/devices/batch", post(devices::save_devices))
        .route(
            "/devices/{key}",
            get(devices::get_device).delete(devices::delete_device),
        )
        .route("/checksum", post(devices::checksum))
        .route("/did", post(devices::generate_did))
        .route("/nft/batch-mint", post(nft::batch_mint))
        .route("/nft/{key}", get(nft::get_nft))
        .route("/nft/{key}/mint", post(nft::mint))
        .route("/nft/{key}/metadata", post(nft::update_metadata))
        .route("/nft/{key}/send", post(nft::send));

    let health_routes = Router::new()
        .route("/health", get(health::health))
        .route("/health/live", get(health::liveness))
        .route("/health/ready", get(health::readiness));

    Router::new()
        .nest("/v1", v1_routes)
        .merge(health_routes)
        .with_state(state)
        .merge(SwaggerUi::new("/docs").url("/api-doc/openapi.json", ApiDoc::openapi()))
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(CorsLayer::permissive())
}

struct ProfileHeader;

impl Modify for ProfileHeader {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "profile_id",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(PROFILE_ID_HEADER))),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health::health,
        health::liveness,
        health::readiness,
        accounts::register,
        accounts::get_profile,
        accounts::list_accounts,
        accounts::new_wallet,
        accounts::import_wallet,
        accounts::delete_wallet,
        accounts::new_mnemonic,
        accounts::get_mnemonic,
        accounts::new_account,
        accounts::import_account,
        accounts::export_account,
        accounts::get_account,
        accounts::update_account,
        accounts::delete_account,
        accounts::get_balance,
        accounts::send_coins,
        devices::list_devices,
        devices::save_device,
        devices::save_devices,
        devices::get_device,
        devices::delete_device,
        devices::checksum,
        devices::generate_did,
        nft::get_nft,
        nft::mint,
        nft::batch_mint,
        nft::update_metadata,
        nft::send
    ),
    components(
        schemas(
            health::CheckStatus,
            health::ComponentChecks,
            health::ReadinessReport,
            health::LivenessReport,
            NewProfile,
            Profile,
            Account,
            AccountMetadata,
            ProfileAccounts,
            Balance,
            TokenBalance,
            TxOutcome,
            Asset,
            FieldError,
            accounts::WalletRequest,
            accounts::MnemonicResponse,
            accounts::ImportAccountRequest,
            accounts::ExportAccountRequest,
            accounts::ExportAccountResponse,
            accounts::SendCoinsRequest,
            Device,
            DeviceDocument,
            SaveDevice,
            SaveDeviceDocument,
            BatchSaveDevice,
            ChecksumPreview,
            AssetDid,
            devices::BatchSaveResponse,
            devices::GenerateDidRequest,
            nft::TransferRequest,
            nft::BatchMintRequest
        )
    ),
    modifiers(&ProfileHeader),
    tags(
        (name = "Health", description = "Liveness and readiness checks"),
        (name = "Accounts", description = "Profiles, wallets and accounts"),
        (name = "Devices", description = "Physical asset records"),
        (name = "NFT", description = "Asset registry tokens")
    )
)]
struct ApiDoc;
