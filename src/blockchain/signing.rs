// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Key handling for transaction signing.
//!
//! Keyring entries store PKCS#8 PEM private keys. This module turns them
//! into signers for alloy and derives the public encodings the rest of the
//! service needs (EVM address, registry key, display key).

use alloy::{
    network::EthereumWallet,
    primitives::keccak256,
    signers::local::PrivateKeySigner,
};
use k256::ecdsa::{SigningKey, VerifyingKey};
use k256::SecretKey;

use super::ChainError;

/// Parse a PEM private key (PKCS#8, or SEC1 as a fallback).
pub fn signing_key_from_pem(pem_bytes: &[u8]) -> Result<SigningKey, ChainError> {
    let pem_str = std::str::from_utf8(pem_bytes)
        .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid UTF-8: {e}")))?;

    let pem = pem::parse(pem_str)
        .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid PEM: {e}")))?;

    let secret_key = parse_pkcs8_to_secret_key(pem.contents())
        .or_else(|_| SecretKey::from_sec1_der(pem.contents()).map_err(|e| e.to_string()))
        .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid key format: {e}")))?;

    Ok(SigningKey::from(secret_key))
}

fn parse_pkcs8_to_secret_key(der: &[u8]) -> Result<SecretKey, String> {
    use k256::pkcs8::DecodePrivateKey;
    SecretKey::from_pkcs8_der(der).map_err(|e| e.to_string())
}

/// Create an alloy signer from a key.
pub fn signer_from_key(key: &SigningKey) -> PrivateKeySigner {
    PrivateKeySigner::from_signing_key(key.clone())
}

/// Create an Ethereum wallet from a key.
pub fn wallet_from_key(key: &SigningKey) -> EthereumWallet {
    EthereumWallet::from(signer_from_key(key))
}

/// Lowercase `0x` EVM address: last 20 bytes of keccak256 over the
/// uncompressed public key without its 0x04 prefix.
pub fn address_of(key: &VerifyingKey) -> String {
    let uncompressed = key.to_encoded_point(false);
    let hash = keccak256(&uncompressed.as_bytes()[1..]);
    format!("0x{}", alloy::hex::encode(&hash[12..]))
}

/// Uppercase hex of the compressed public key.
pub fn public_key_hex(key: &VerifyingKey) -> String {
    alloy::hex::encode_upper(key.to_encoded_point(true).as_bytes())
}

/// Base58 of the compressed public key, as registered in DID documents.
pub fn public_key_base58(key: &VerifyingKey) -> String {
    bs58::encode(key.to_encoded_point(true).as_bytes()).into_string()
}

/// Inverse of [`public_key_base58`].
pub fn verifying_key_from_base58(encoded: &str) -> Result<VerifyingKey, ChainError> {
    let bytes = bs58::decode(encoded)
        .into_vec()
        .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid base58 key: {e}")))?;
    VerifyingKey::from_sec1_bytes(&bytes)
        .map_err(|e| ChainError::InvalidPrivateKey(format!("Invalid public key: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::pkcs8::{EncodePrivateKey, LineEnding};

    #[test]
    fn generated_key_round_trips_through_pem() {
        let key = SigningKey::random(&mut k256::elliptic_curve::rand_core::OsRng);
        let pem = key.to_pkcs8_pem(LineEnding::LF).unwrap();

        let parsed = signing_key_from_pem(pem.as_bytes()).unwrap();
        assert_eq!(parsed.to_bytes(), key.to_bytes());
    }

    #[test]
    fn address_matches_alloy_signer() {
        let key = SigningKey::random(&mut k256::elliptic_curve::rand_core::OsRng);
        let address = address_of(key.verifying_key());
        let signer = signer_from_key(&key);

        assert_eq!(address.len(), 42);
        assert_eq!(address, format!("{:?}", signer.address()).to_lowercase());
    }

    #[test]
    fn base58_public_key_round_trips() {
        let key = SigningKey::random(&mut k256::elliptic_curve::rand_core::OsRng);
        let encoded = public_key_base58(key.verifying_key());
        let decoded = verifying_key_from_base58(&encoded).unwrap();
        assert_eq!(&decoded, key.verifying_key());
    }

    #[test]
    fn public_key_hex_is_uppercase_compressed() {
        let key = SigningKey::random(&mut k256::elliptic_curve::rand_core::OsRng);
        let hex = public_key_hex(key.verifying_key());
        assert_eq!(hex.len(), 66);
        assert!(hex.starts_with("02") || hex.starts_with("03"));
        assert_eq!(hex, hex.to_uppercase());
    }
}
