// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Document encryption to an account public key (ECIES over secp256k1).
//!
//! ```text
//! ephemeral compressed pubkey (33) || nonce (12) || AES-256-GCM ciphertext
//! key = sha256(ECDH(ephemeral, recipient).x)
//! ```

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use k256::ecdh::EphemeralSecret;
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::elliptic_curve::rand_core::{OsRng, RngCore};
use k256::elliptic_curve::sec1::ToEncodedPoint;
use k256::PublicKey;
use sha2::{Digest, Sha256};

use super::error::{DeviceError, DeviceResult};

const EPHEMERAL_LEN: usize = 33;
const NONCE_LEN: usize = 12;

fn cipher(shared_x: &[u8]) -> DeviceResult<Aes256Gcm> {
    let key = Sha256::digest(shared_x);
    Aes256Gcm::new_from_slice(&key).map_err(|e| DeviceError::Encryption(e.to_string()))
}

pub fn encrypt(recipient: &VerifyingKey, plaintext: &[u8]) -> DeviceResult<Vec<u8>> {
    let recipient = PublicKey::from(recipient);
    let ephemeral = EphemeralSecret::random(&mut OsRng);
    let shared = ephemeral.diffie_hellman(&recipient);

    let mut nonce = [0u8; NONCE_LEN];
    OsRng.fill_bytes(&mut nonce);

    let ciphertext = cipher(shared.raw_secret_bytes())?
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| DeviceError::Encryption(e.to_string()))?;

    let ephemeral_public = ephemeral.public_key().to_encoded_point(true);
    let mut out = Vec::with_capacity(EPHEMERAL_LEN + NONCE_LEN + ciphertext.len());
    out.extend_from_slice(ephemeral_public.as_bytes());
    out.extend_from_slice(&nonce);
    out.extend_from_slice(&ciphertext);
    Ok(out)
}

pub fn decrypt(key: &SigningKey, data: &[u8]) -> DeviceResult<Vec<u8>> {
    if data.len() < EPHEMERAL_LEN + NONCE_LEN {
        return Err(DeviceError::Encryption("ciphertext too short".to_string()));
    }
    let (ephemeral, rest) = data.split_at(EPHEMERAL_LEN);
    let (nonce, ciphertext) = rest.split_at(NONCE_LEN);

    let ephemeral =
        PublicKey::from_sec1_bytes(ephemeral).map_err(|e| DeviceError::Encryption(e.to_string()))?;
    let shared = k256::ecdh::diffie_hellman(key.as_nonzero_scalar(), ephemeral.as_affine());

    cipher(shared.raw_secret_bytes())?
        .decrypt(Nonce::from_slice(nonce), ciphertext)
        .map_err(|e| DeviceError::Encryption(e.to_string()))
}
