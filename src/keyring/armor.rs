// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Private-key armor.
//!
//! An empty passphrase means plain PKCS#8 PEM; anything else produces or
//! expects an encrypted PKCS#8 PEM (PBES2).

use k256::ecdsa::SigningKey;
use k256::elliptic_curve::rand_core::OsRng;
use pkcs8::{DecodePrivateKey, EncodePrivateKey, LineEnding};

use super::{KeyringError, KeyringResult};

pub fn armor(key: &SigningKey, passphrase: &str) -> KeyringResult<String> {
    let pem = if passphrase.is_empty() {
        key.to_pkcs8_pem(LineEnding::LF)
    } else {
        key.to_pkcs8_encrypted_pem(&mut OsRng, passphrase.as_bytes(), LineEnding::LF)
    }
    .map_err(|e| KeyringError::Armor(e.to_string()))?;

    Ok(pem.to_string())
}

pub fn unarmor(armored: &str, passphrase: &str) -> KeyringResult<SigningKey> {
    if passphrase.is_empty() {
        SigningKey::from_pkcs8_pem(armored)
    } else {
        SigningKey::from_pkcs8_encrypted_pem(armored, passphrase.as_bytes())
    }
    .map_err(|e| KeyringError::Armor(e.to_string()))
}
