// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

use crate::account::AccountError;
use crate::blockchain::ChainError;
use crate::device::DeviceError;
use crate::keyring::KeyringError;
use crate::nft::NftError;
use crate::registry::RegistryError;
use crate::validation::{FieldError, ValidationErrors};

#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub message: String,
    pub fields: Vec<FieldError>,
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    fields: Vec<FieldError>,
}

impl ApiError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            fields: Vec::new(),
        }
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::new(StatusCode::CONFLICT, message)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message)
    }

    pub fn validation(errors: ValidationErrors) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            message: "validation failed".to_string(),
            fields: errors.0,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if self.status.is_server_error() {
            tracing::error!(status = %self.status, error = %self.message, "Request failed");
        }
        let body = Json(ErrorBody {
            error: self.message,
            fields: self.fields,
        });
        (self.status, body).into_response()
    }
}

impl From<ChainError> for ApiError {
    fn from(err: ChainError) -> Self {
        match err {
            ChainError::InsufficientFunds
            | ChainError::InvalidAddress(_)
            | ChainError::InvalidAmount(_) => Self::bad_request(err.to_string()),
            ChainError::NotFound(_) => Self::not_found(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::NotFound(_) => Self::not_found(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::ProfileExists | AccountError::WalletExists | AccountError::AccountExists => {
                Self::conflict(err.to_string())
            }
            AccountError::ProfileNotExists
            | AccountError::WalletNotExists
            | AccountError::AccountNotExists => Self::not_found(err.to_string()),
            AccountError::AccountHasZeroTx
            | AccountError::InvalidMnemonic
            | AccountError::HdAccountDelete => Self::bad_request(err.to_string()),
            AccountError::Keyring(KeyringError::Armor(_)) => Self::bad_request(err.to_string()),
            AccountError::Validation(errors) => Self::validation(errors),
            AccountError::Chain(chain) => chain.into(),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<DeviceError> for ApiError {
    fn from(err: DeviceError) -> Self {
        match err {
            DeviceError::DeviceNotExists => Self::not_found(err.to_string()),
            DeviceError::MissingIdentifier(_) | DeviceError::InvalidDocument { .. } => {
                Self::bad_request(err.to_string())
            }
            DeviceError::Validation(errors) => Self::validation(errors),
            DeviceError::Registry(registry) => registry.into(),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<NftError> for ApiError {
    fn from(err: NftError) -> Self {
        match err {
            NftError::Account(e) => e.into(),
            NftError::Device(e) => e.into(),
            NftError::Chain(e) => e.into(),
            NftError::Registry(e) => e.into(),
            NftError::EmptyBatch => Self::bad_request(err.to_string()),
            other => Self::internal(other.to_string()),
        }
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::validation(errors)
    }
}
