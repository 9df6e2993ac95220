// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::content::ContentError;
use crate::events::BusError;
use crate::registry::RegistryError;
use crate::storage::KvError;
use crate::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("device doesn't exists")]
    DeviceNotExists,

    #[error("data integrity error for address {address} and DID {did}")]
    Integrity { address: String, did: String },

    #[error("missing physical asset identifier: {0}")]
    MissingIdentifier(String),

    #[error("invalid document {name}: {reason}")]
    InvalidDocument { name: String, reason: String },

    #[error("document encryption failed: {0}")]
    Encryption(String),

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error("content store: {0}")]
    Content(#[from] ContentError),

    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    #[error("record store: {0}")]
    Records(#[from] KvError),

    #[error("event bus: {0}")]
    Bus(#[from] BusError),

    #[error("batch worker failed: {0}")]
    Worker(String),
}

pub type DeviceResult<T> = Result<T, DeviceError>;
