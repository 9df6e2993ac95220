// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! BIP-39 mnemonics and BIP-32 derivation.

use bip39::{Language, Mnemonic};
use k256::ecdsa::SigningKey;
use k256::elliptic_curve::rand_core::{OsRng, RngCore};
use tiny_hderive::bip32::ExtendedPrivKey;

use super::{KeyringError, KeyringResult};

/// Reject phrases that fail the word-list or checksum check.
pub fn validate_mnemonic(phrase: &str) -> KeyringResult<Mnemonic> {
    Mnemonic::parse_in_normalized(Language::English, phrase).map_err(|_| KeyringError::InvalidMnemonic)
}

/// Fresh 24-word English mnemonic.
pub fn generate_mnemonic() -> KeyringResult<String> {
    let mut entropy = [0u8; 32];
    OsRng.fill_bytes(&mut entropy);

    let mnemonic = Mnemonic::from_entropy_in(Language::English, &entropy)
        .map_err(|e| KeyringError::Derivation(e.to_string()))?;
    Ok(mnemonic.to_string())
}

/// `m/44'/{coin}'/{index}'/0/0`
pub fn derivation_path(coin_type: u32, index: u32) -> String {
    format!("m/44'/{coin_type}'/{index}'/0/0")
}

pub fn derive_signing_key(phrase: &str, path: &str) -> KeyringResult<SigningKey> {
    let mnemonic = validate_mnemonic(phrase)?;
    let seed = mnemonic.to_seed("");

    let ext_key = ExtendedPrivKey::derive(&seed, path)
        .map_err(|e| KeyringError::Derivation(format!("{path}: {e:?}")))?;

    SigningKey::from_slice(&ext_key.secret()).map_err(|e| KeyringError::Derivation(e.to_string()))
}
