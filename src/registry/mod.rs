// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! # Identity Registry
//!
//! Remote DID-document registry. Every asset DID owns a document holding
//! its verification methods and the metadata objects (one per device
//! document). Mutations are signed with the owning account key over a
//! SHA-256 checksum of the deterministic JSON encoding of the payload.

pub mod client;

use std::collections::BTreeMap;

use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use k256::ecdsa::{signature::Signer, Signature, SigningKey};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

pub use client::RegistryClient;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("not found in registry: {0}")]
    NotFound(String),

    #[error("registry request failed: {0}")]
    Request(String),

    #[error("registry rejected request ({status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("registry response was invalid: {0}")]
    InvalidResponse(String),

    #[error("registry payload encoding failed: {0}")]
    Encoding(#[from] serde_json::Error),
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Verification method type recorded for account keys.
pub const VERIFICATION_KEY_TYPE: &str = "EcdsaSecp256k1VerificationKey2019";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationMethod {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: String,
    pub controller: String,
    pub public_key_base58: String,
}

impl VerificationMethod {
    pub fn secp256k1(id: &str, controller: &str, public_key_base58: &str) -> Self {
        Self {
            id: id.to_string(),
            kind: VERIFICATION_KEY_TYPE.to_string(),
            controller: controller.to_string(),
            public_key_base58: public_key_base58.to_string(),
        }
    }
}

/// One metadata object per device document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryObject {
    pub url: String,
    /// `type`, `name` and `description` of the document.
    pub metadata: BTreeMap<String, String>,
    pub hash_unencrypted_object: String,
    /// Non-empty when the stored copy is encrypted.
    #[serde(default)]
    pub hash_encrypted_data_object: String,
}

impl RegistryObject {
    pub fn meta(&self, key: &str) -> &str {
        self.metadata.get(key).map(String::as_str).unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidMetadata {
    #[serde(default)]
    pub root_hash: String,
    #[serde(default)]
    pub objects: Vec<RegistryObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DidDocument {
    pub id: String,
    #[serde(default)]
    pub verification_method: Vec<VerificationMethod>,
    #[serde(default)]
    pub authentication: Vec<String>,
    #[serde(default)]
    pub metadata: DidMetadata,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveMetadataData {
    pub did: String,
    pub authentication_key_id: String,
    pub objects: Vec<RegistryObject>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SaveVerificationMethodsData {
    pub did: String,
    pub authentication_key_id: String,
    pub authentication: Vec<String>,
    pub verification_methods: Vec<VerificationMethod>,
}

/// Signed mutation envelope.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Signed<T> {
    pub data: T,
    /// Base64 of the 64-byte `r || s` signature.
    pub signature: String,
}

impl<T: Serialize> Signed<T> {
    pub fn new(data: T, key: &SigningKey) -> RegistryResult<Self> {
        let signature = sign_checksum(key, &checksum(&data)?);
        Ok(Self { data, signature })
    }
}

/// SHA-256 over the deterministic JSON encoding (declaration-ordered
/// fields, sorted maps).
pub fn checksum<T: Serialize>(data: &T) -> RegistryResult<[u8; 32]> {
    let encoded = serde_json::to_vec(data)?;
    Ok(Sha256::digest(&encoded).into())
}

pub fn sign_checksum(key: &SigningKey, checksum: &[u8; 32]) -> String {
    let signature: Signature = key.sign(checksum);
    Base64::encode_string(&signature.to_bytes())
}

/// DID-document registry.
///
/// Every call may block on network I/O.
#[async_trait]
pub trait IdentityRegistry: Send + Sync {
    async fn register(
        &self,
        did: &str,
        verification_methods: Vec<VerificationMethod>,
        authentication: Vec<String>,
    ) -> RegistryResult<()>;

    /// Fails `NotFound` for unknown DIDs.
    async fn get(&self, did: &str) -> RegistryResult<DidDocument>;

    async fn save_metadata(&self, request: Signed<SaveMetadataData>) -> RegistryResult<()>;

    async fn save_verification_methods(
        &self,
        request: Signed<SaveVerificationMethodsData>,
    ) -> RegistryResult<()>;

    /// Base58 public key registered for an account address.
    async fn get_public_key(&self, address: &str) -> RegistryResult<String>;

    async fn register_account(&self, public_key_base58: &str) -> RegistryResult<()>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use k256::ecdsa::{signature::Verifier, VerifyingKey};
    use k256::elliptic_curve::rand_core::OsRng;

    fn data() -> SaveMetadataData {
        let mut metadata = BTreeMap::new();
        metadata.insert("type".to_string(), "physicalAssetIdentifiers".to_string());
        metadata.insert("name".to_string(), "physicalAssetIdentifiers".to_string());
        SaveMetadataData {
            did: "did:obada:abc".to_string(),
            authentication_key_id: "did:obada:abc#keys-1".to_string(),
            objects: vec![RegistryObject {
                url: "ipfs://bafk".to_string(),
                metadata,
                hash_unencrypted_object: "00".to_string(),
                hash_encrypted_data_object: String::new(),
            }],
        }
    }

    #[test]
    fn checksum_is_stable() {
        assert_eq!(checksum(&data()).unwrap(), checksum(&data()).unwrap());

        let mut changed = data();
        changed.objects[0].hash_unencrypted_object = "01".to_string();
        assert_ne!(checksum(&data()).unwrap(), checksum(&changed).unwrap());
    }

    #[test]
    fn signature_verifies_against_the_signer() {
        let key = SigningKey::random(&mut OsRng);
        let signed = Signed::new(data(), &key).unwrap();

        let bytes = Base64::decode_vec(&signed.signature).unwrap();
        let signature = Signature::from_slice(&bytes).unwrap();
        let sum = checksum(&signed.data).unwrap();

        let verifying: &VerifyingKey = key.verifying_key();
        assert!(verifying.verify(&sum, &signature).is_ok());
    }

    #[test]
    fn object_meta_defaults_to_empty() {
        let object = &data().objects[0];
        assert_eq!(object.meta("type"), "physicalAssetIdentifiers");
        assert_eq!(object.meta("description"), "");
    }
}
