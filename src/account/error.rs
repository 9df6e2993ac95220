// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

use crate::blockchain::ChainError;
use crate::events::BusError;
use crate::keyring::KeyringError;
use crate::saga::{CompensationError, RollbackFailed};
use crate::storage::KvError;
use crate::validation::ValidationErrors;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("profile already exists")]
    ProfileExists,

    #[error("profile doesn't exists")]
    ProfileNotExists,

    #[error("profile wallet already exists")]
    WalletExists,

    #[error("profile wallet doesn't exists")]
    WalletNotExists,

    #[error("account doesn't exists")]
    AccountNotExists,

    #[error("account already exists")]
    AccountExists,

    #[error("please use the prior address before creating a new one")]
    AccountHasZeroTx,

    #[error("invalid mnemonic")]
    InvalidMnemonic,

    #[error("cannot delete hd account")]
    HdAccountDelete,

    #[error(transparent)]
    Validation(#[from] ValidationErrors),

    #[error(transparent)]
    Chain(#[from] ChainError),

    #[error("keyring: {0}")]
    Keyring(KeyringError),

    #[error("record store: {0}")]
    Records(#[from] KvError),

    #[error("event bus: {0}")]
    Bus(#[from] BusError),

    #[error("{rollback} : {original}")]
    RollbackFailed {
        rollback: CompensationError,
        original: Box<AccountError>,
    },
}

impl From<KeyringError> for AccountError {
    fn from(err: KeyringError) -> Self {
        match err {
            KeyringError::InvalidMnemonic => AccountError::InvalidMnemonic,
            KeyringError::DuplicateAddress { .. } | KeyringError::AlreadyExists(_) => {
                AccountError::AccountExists
            }
            other => AccountError::Keyring(other),
        }
    }
}

impl RollbackFailed for AccountError {
    fn rollback_failed(rollback: CompensationError, original: Self) -> Self {
        AccountError::RollbackFailed {
            rollback,
            original: Box::new(original),
        }
    }
}

pub type AccountResult<T> = Result<T, AccountError>;
