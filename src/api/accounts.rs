// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Profile, wallet and account endpoints.
//!
//! Every handler is scoped to the caller's `X-Profile-Id`. Private keys only
//! leave the service armored, through `export-account`.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::{
    account::{Account, AccountEngine, AccountError, AccountMetadata, Balance, NewProfile, Profile, ProfileAccounts},
    auth::ProfileId,
    blockchain::TxOutcome,
    error::ApiError,
    state::AppState,
    validation::ValidationErrors,
};

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct WalletRequest {
    /// BIP-39 phrase.
    pub mnemonic: String,
    /// Replace an existing wallet (deleting its HD accounts).
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MnemonicResponse {
    pub mnemonic: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ImportAccountRequest {
    /// Armored private key (PKCS#8 PEM, encrypted when a passphrase is set).
    pub private_key: String,
    #[serde(default)]
    pub passphrase: String,
    #[serde(default)]
    pub name: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct ExportAccountRequest {
    pub address: String,
    #[serde(default)]
    pub passphrase: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ExportAccountResponse {
    pub private_key: String,
}

#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct SendCoinsRequest {
    pub to: String,
    /// Human-readable amount, e.g. "1.5".
    pub amount: String,
}

/// Register the caller's profile.
#[utoipa::path(
    post,
    path = "/v1/accounts/register",
    tag = "Accounts",
    security(("profile_id" = [])),
    request_body = NewProfile,
    responses(
        (status = 201, description = "Profile registered", body = Profile),
        (status = 400, description = "Validation failed"),
        (status = 409, description = "Profile already exists")
    )
)]
pub async fn register(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Json(request): Json<NewProfile>,
) -> Result<(StatusCode, Json<Profile>), ApiError> {
    let profile = state
        .services
        .accounts
        .register_profile(&profile_id, request)
        .await?;
    Ok((StatusCode::CREATED, Json(profile)))
}

#[utoipa::path(
    get,
    path = "/v1/accounts/profile",
    tag = "Accounts",
    security(("profile_id" = [])),
    responses(
        (status = 200, description = "Caller profile", body = Profile),
        (status = 404, description = "Profile not registered")
    )
)]
pub async fn get_profile(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
) -> Result<Json<Profile>, ApiError> {
    Ok(Json(state.services.accounts.profile(&profile_id)?))
}

/// HD and imported accounts of the caller, with balances.
#[utoipa::path(
    get,
    path = "/v1/accounts",
    tag = "Accounts",
    security(("profile_id" = [])),
    responses(
        (status = 200, description = "Profile accounts", body = ProfileAccounts)
    )
)]
pub async fn list_accounts(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
) -> Result<Json<ProfileAccounts>, ApiError> {
    Ok(Json(state.services.accounts.profile_accounts(&profile_id).await?))
}

/// Create the profile wallet from a mnemonic and derive its first account.
#[utoipa::path(
    post,
    path = "/v1/accounts/new-wallet",
    tag = "Accounts",
    security(("profile_id" = [])),
    request_body = WalletRequest,
    responses(
        (status = 201, description = "Wallet created", body = ProfileAccounts),
        (status = 400, description = "Invalid mnemonic"),
        (status = 409, description = "Wallet already exists")
    )
)]
pub async fn new_wallet(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Json(request): Json<WalletRequest>,
) -> Result<(StatusCode, Json<ProfileAccounts>), ApiError> {
    let accounts = &state.services.accounts;
    accounts
        .new_wallet(&profile_id, &request.mnemonic, request.force)
        .await?;
    Ok((StatusCode::CREATED, Json(accounts.profile_accounts(&profile_id).await?)))
}

/// Create the profile wallet and rediscover every used HD account.
#[utoipa::path(
    post,
    path = "/v1/accounts/import-wallet",
    tag = "Accounts",
    security(("profile_id" = [])),
    request_body = WalletRequest,
    responses(
        (status = 201, description = "Wallet imported", body = ProfileAccounts),
        (status = 400, description = "Invalid mnemonic"),
        (status = 409, description = "Wallet or account already exists")
    )
)]
pub async fn import_wallet(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Json(request): Json<WalletRequest>,
) -> Result<(StatusCode, Json<ProfileAccounts>), ApiError> {
    let accounts = &state.services.accounts;
    accounts
        .import_wallet(&profile_id, &request.mnemonic, request.force)
        .await?;
    Ok((StatusCode::CREATED, Json(accounts.profile_accounts(&profile_id).await?)))
}

#[utoipa::path(
    delete,
    path = "/v1/accounts/wallet",
    tag = "Accounts",
    security(("profile_id" = [])),
    responses(
        (status = 204, description = "Wallet and HD accounts deleted"),
        (status = 404, description = "No wallet")
    )
)]
pub async fn delete_wallet(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
) -> Result<StatusCode, ApiError> {
    state.services.accounts.delete_wallet(&profile_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A fresh 24-word mnemonic. Nothing is stored.
#[utoipa::path(
    get,
    path = "/v1/accounts/new-mnemonic",
    tag = "Accounts",
    responses(
        (status = 200, description = "Generated mnemonic", body = MnemonicResponse)
    )
)]
pub async fn new_mnemonic() -> Result<Json<MnemonicResponse>, ApiError> {
    let mnemonic = AccountEngine::generate_mnemonic()?;
    Ok(Json(MnemonicResponse { mnemonic }))
}

#[utoipa::path(
    get,
    path = "/v1/accounts/mnemonic",
    tag = "Accounts",
    security(("profile_id" = [])),
    responses(
        (status = 200, description = "Wallet mnemonic", body = MnemonicResponse),
        (status = 404, description = "No wallet")
    )
)]
pub async fn get_mnemonic(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
) -> Result<Json<MnemonicResponse>, ApiError> {
    let mnemonic = state.services.accounts.wallet_mnemonic(&profile_id)?;
    Ok(Json(MnemonicResponse { mnemonic }))
}

/// Derive the next HD account. Fails while the latest one is unused.
#[utoipa::path(
    post,
    path = "/v1/accounts/new-account",
    tag = "Accounts",
    security(("profile_id" = [])),
    request_body = AccountMetadata,
    responses(
        (status = 201, description = "Account created", body = Account),
        (status = 400, description = "Latest account has no on-chain activity"),
        (status = 404, description = "No wallet")
    )
)]
pub async fn new_account(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Json(request): Json<AccountMetadata>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let account = state.services.accounts.new_account(&profile_id, request).await?;
    Ok((StatusCode::CREATED, Json(account)))
}

#[utoipa::path(
    post,
    path = "/v1/accounts/import-account",
    tag = "Accounts",
    security(("profile_id" = [])),
    request_body = ImportAccountRequest,
    responses(
        (status = 201, description = "Account imported", body = Account),
        (status = 400, description = "Key could not be read"),
        (status = 409, description = "Account already exists")
    )
)]
pub async fn import_account(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Json(request): Json<ImportAccountRequest>,
) -> Result<(StatusCode, Json<Account>), ApiError> {
    let mut errors = ValidationErrors::new();
    errors.require("private_key", &request.private_key);
    errors.into_result()?;

    let account = state
        .services
        .accounts
        .import_account(
            &profile_id,
            &request.private_key,
            &request.passphrase,
            AccountMetadata { name: request.name },
        )
        .await?;
    Ok((StatusCode::CREATED, Json(account)))
}

/// Armored private key of an owned account.
#[utoipa::path(
    post,
    path = "/v1/accounts/export-account",
    tag = "Accounts",
    security(("profile_id" = [])),
    request_body = ExportAccountRequest,
    responses(
        (status = 200, description = "Armored key", body = ExportAccountResponse),
        (status = 404, description = "Account not found")
    )
)]
pub async fn export_account(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Json(request): Json<ExportAccountRequest>,
) -> Result<Json<ExportAccountResponse>, ApiError> {
    let private_key = state
        .services
        .accounts
        .export_account(&profile_id, &request.address, &request.passphrase)?;
    tracing::info!(profile_id = %profile_id, address = %request.address, "Account exported");
    Ok(Json(ExportAccountResponse { private_key }))
}

#[utoipa::path(
    get,
    path = "/v1/accounts/{address}",
    tag = "Accounts",
    security(("profile_id" = [])),
    params(("address" = String, Path, description = "Account address")),
    responses(
        (status = 200, description = "Account details", body = Account),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_account(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Account>, ApiError> {
    Ok(Json(
        state
            .services
            .accounts
            .profile_account(&profile_id, &address)
            .await?,
    ))
}

/// Rename an account.
#[utoipa::path(
    post,
    path = "/v1/accounts/{address}",
    tag = "Accounts",
    security(("profile_id" = [])),
    params(("address" = String, Path, description = "Account address")),
    request_body = AccountMetadata,
    responses(
        (status = 200, description = "Account updated", body = Account),
        (status = 404, description = "Account not found")
    )
)]
pub async fn update_account(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(request): Json<AccountMetadata>,
) -> Result<Json<Account>, ApiError> {
    let accounts = &state.services.accounts;
    accounts
        .update_account_name(&profile_id, &address, &request.name)
        .await?;
    Ok(Json(accounts.profile_account(&profile_id, &address).await?))
}

/// Delete an imported account. HD accounts go with their wallet only.
#[utoipa::path(
    delete,
    path = "/v1/accounts/{address}",
    tag = "Accounts",
    security(("profile_id" = [])),
    params(("address" = String, Path, description = "Account address")),
    responses(
        (status = 204, description = "Account deleted"),
        (status = 400, description = "HD accounts cannot be deleted"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn delete_account(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<StatusCode, ApiError> {
    state
        .services
        .accounts
        .delete_account(&profile_id, &address)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    get,
    path = "/v1/accounts/{address}/balance",
    tag = "Accounts",
    security(("profile_id" = [])),
    params(("address" = String, Path, description = "Account address")),
    responses(
        (status = 200, description = "Native balance", body = Balance),
        (status = 404, description = "Account not found")
    )
)]
pub async fn get_balance(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(address): Path<String>,
) -> Result<Json<Balance>, ApiError> {
    let accounts = &state.services.accounts;
    if !accounts.has_account(&profile_id, &address) {
        return Err(AccountError::AccountNotExists.into());
    }
    Ok(Json(accounts.balance(&address).await?))
}

#[utoipa::path(
    post,
    path = "/v1/accounts/{address}/send-coins",
    tag = "Accounts",
    security(("profile_id" = [])),
    params(("address" = String, Path, description = "Sending account address")),
    request_body = SendCoinsRequest,
    responses(
        (status = 200, description = "Transaction submitted", body = TxOutcome),
        (status = 400, description = "Out of funds or invalid amount"),
        (status = 404, description = "Account not found")
    )
)]
pub async fn send_coins(
    ProfileId(profile_id): ProfileId,
    State(state): State<AppState>,
    Path(address): Path<String>,
    Json(request): Json<SendCoinsRequest>,
) -> Result<Json<TxOutcome>, ApiError> {
    let mut errors = ValidationErrors::new();
    errors.require("to", &request.to);
    errors.require("amount", &request.amount);
    errors.into_result()?;

    let outcome = state
        .services
        .accounts
        .send_coins(&profile_id, &address, &request.to, &request.amount)
        .await?;
    Ok(Json(outcome))
}
