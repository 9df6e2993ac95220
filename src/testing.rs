// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! In-memory collaborators and a fully wired service set for tests.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alloy::primitives::U256;
use async_trait::async_trait;
use base64ct::{Base64, Encoding};
use k256::ecdsa::{signature::Verifier, Signature, SigningKey};
use tempfile::TempDir;

use crate::blockchain::signing::{address_of, verifying_key_from_base58};
use crate::blockchain::{Asset, ChainError, ChainMsg, ChainResult, ChainService, TokenBalance, TxOutcome};
use crate::content::{ContentError, ContentResult, ContentStore};
use crate::did::sha256_hex;
use crate::events::BroadcastFanOut;
use crate::keyring::FileKeyring;
use crate::registry::{
    checksum, DidDocument, DidMetadata, IdentityRegistry, RegistryError, RegistryResult,
    SaveMetadataData, SaveVerificationMethodsData, Signed, VerificationMethod,
};
use crate::state::{Collaborators, EngineSettings, Services};
use crate::storage::{
    EncryptedStorage, KvError, KvResult, RecordStore, RedbRecordStore, StoragePaths, WriteBatch,
};

pub const MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

/// Address of `MNEMONIC` at `m/44'/60'/0'/0/0`.
pub const MNEMONIC_ADDRESS_0: &str = "0x9858effd232b4033e47d90003d41ec34ecaeda94";

// =============================================================================
// Record store
// =============================================================================

/// redb store whose writes can be made to fail.
pub struct FailingRecordStore {
    inner: RedbRecordStore,
    fail_writes: AtomicBool,
}

impl FailingRecordStore {
    pub fn open(paths: &StoragePaths) -> Self {
        Self {
            inner: RedbRecordStore::open(&paths.records_db()).unwrap(),
            fail_writes: AtomicBool::new(false),
        }
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

impl RecordStore for FailingRecordStore {
    fn get(&self, key: &str) -> KvResult<Option<Vec<u8>>> {
        self.inner.get(key)
    }

    fn scan_prefix(&self, prefix: &str) -> KvResult<Vec<(String, Vec<u8>)>> {
        self.inner.scan_prefix(prefix)
    }

    fn write(&self, batch: WriteBatch) -> KvResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(KvError::Unavailable("injected write failure".to_string()));
        }
        self.inner.write(batch)
    }

    fn checkpoint(&self, name: &str) -> KvResult<u64> {
        self.inner.checkpoint(name)
    }

    fn set_checkpoint(&self, name: &str, value: u64) -> KvResult<()> {
        self.inner.set_checkpoint(name, value)
    }
}

// =============================================================================
// Chain
// =============================================================================

#[derive(Default)]
struct ChainState {
    active: HashSet<String>,
    unreachable: HashSet<String>,
    assets: BTreeMap<String, Asset>,
    sent: Vec<ChainMsg>,
}

/// Registry contract and account activity kept in memory.
#[derive(Default)]
pub struct MemoryChain {
    state: Mutex<ChainState>,
}

impl MemoryChain {
    pub fn set_active(&self, address: &str) {
        self.state.lock().unwrap().active.insert(address.to_lowercase());
    }

    /// Reads about `address` fail with an RPC error.
    pub fn set_unreachable(&self, address: &str) {
        self.state.lock().unwrap().unreachable.insert(address.to_lowercase());
    }

    fn check_reachable(&self, address: &str) -> ChainResult<()> {
        if self.state.lock().unwrap().unreachable.contains(&address.to_lowercase()) {
            return Err(ChainError::Rpc(format!("connection refused reading {address}")));
        }
        Ok(())
    }

    pub fn sent(&self) -> Vec<ChainMsg> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn asset_owner(&self, did: &str) -> Option<String> {
        self.state.lock().unwrap().assets.get(did).map(|a| a.owner.clone())
    }
}

#[async_trait]
impl ChainService for MemoryChain {
    async fn has_on_chain_activity(&self, address: &str) -> ChainResult<bool> {
        self.check_reachable(address)?;
        Ok(self.state.lock().unwrap().active.contains(&address.to_lowercase()))
    }

    async fn balance(&self, address: &str) -> ChainResult<TokenBalance> {
        let active = self.has_on_chain_activity(address).await?;
        let raw = if active { U256::from(10u64).pow(U256::from(18u64)) } else { U256::ZERO };
        Ok(TokenBalance::native(raw, "AVAX"))
    }

    async fn send_signed_tx(&self, msg: ChainMsg, key: &SigningKey) -> ChainResult<TxOutcome> {
        let signer = address_of(key.verifying_key());
        let mut state = self.state.lock().unwrap();

        match &msg {
            ChainMsg::Send { .. } => {}
            ChainMsg::Mint { did, usn, uri, uri_hash } => {
                state.assets.insert(
                    did.clone(),
                    Asset {
                        did: did.clone(),
                        usn: usn.clone(),
                        owner: signer,
                        uri: uri.clone(),
                        uri_hash: uri_hash.clone(),
                    },
                );
            }
            ChainMsg::Transfer { did, to } => {
                let asset = state
                    .assets
                    .get_mut(did)
                    .ok_or_else(|| ChainError::NotFound(did.clone()))?;
                asset.owner = to.to_lowercase();
            }
            ChainMsg::UpdateUriHash { did, uri_hash } => {
                let asset = state
                    .assets
                    .get_mut(did)
                    .ok_or_else(|| ChainError::NotFound(did.clone()))?;
                asset.uri_hash = uri_hash.clone();
            }
        }

        state.sent.push(msg);
        Ok(TxOutcome {
            tx_hash: format!("0x{:064x}", state.sent.len()),
        })
    }

    async fn assets_by_address(&self, address: &str) -> ChainResult<Vec<Asset>> {
        self.check_reachable(address)?;
        let address = address.to_lowercase();
        Ok(self
            .state
            .lock()
            .unwrap()
            .assets
            .values()
            .filter(|a| a.owner == address)
            .cloned()
            .collect())
    }

    async fn asset(&self, did: &str) -> ChainResult<Asset> {
        self.state
            .lock()
            .unwrap()
            .assets
            .get(did)
            .cloned()
            .ok_or_else(|| ChainError::NotFound(did.to_string()))
    }
}

// =============================================================================
// Content store
// =============================================================================

/// Content-addressed blobs; identifiers are derived from the bytes.
#[derive(Default)]
pub struct MemoryContentStore {
    blobs: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryContentStore {
    pub fn stored_count(&self) -> usize {
        self.blobs.lock().unwrap().len()
    }
}

#[async_trait]
impl ContentStore for MemoryContentStore {
    async fn put(&self, data: Vec<u8>, persist: bool) -> ContentResult<String> {
        let cid = format!("bafk{}", &sha256_hex(&data)[..32]);
        if persist {
            self.blobs.lock().unwrap().insert(cid.clone(), data);
        }
        Ok(cid)
    }

    async fn get(&self, cid: &str) -> ContentResult<Vec<u8>> {
        self.blobs
            .lock()
            .unwrap()
            .get(cid)
            .cloned()
            .ok_or_else(|| ContentError::NotFound(cid.to_string()))
    }
}

// =============================================================================
// Identity registry
// =============================================================================

#[derive(Default)]
struct RegistryState {
    documents: HashMap<String, DidDocument>,
    accounts: HashMap<String, String>,
    registrations: usize,
}

/// Registry that verifies signatures the way the remote one does and uses
/// the hex payload checksum as root hash.
#[derive(Default)]
pub struct MemoryRegistry {
    state: Mutex<RegistryState>,
}

impl MemoryRegistry {
    pub fn registrations(&self) -> usize {
        self.state.lock().unwrap().registrations
    }

    pub fn document(&self, did: &str) -> Option<DidDocument> {
        self.state.lock().unwrap().documents.get(did).cloned()
    }

    pub fn insert_document(&self, document: DidDocument) {
        self.state
            .lock()
            .unwrap()
            .documents
            .insert(document.id.clone(), document);
    }

    pub fn insert_account(&self, address: &str, public_key_base58: &str) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(address.to_lowercase(), public_key_base58.to_string());
    }

    pub fn has_account(&self, address: &str) -> bool {
        self.state.lock().unwrap().accounts.contains_key(&address.to_lowercase())
    }

    fn verify<T: serde::Serialize>(
        document: &DidDocument,
        key_id: &str,
        request: &Signed<T>,
    ) -> RegistryResult<[u8; 32]> {
        let rejected = |body: &str| RegistryError::Rejected {
            status: 401,
            body: body.to_string(),
        };

        let method: &VerificationMethod = document
            .verification_method
            .iter()
            .find(|vm| vm.id == key_id)
            .ok_or_else(|| rejected("unknown key"))?;
        let key = verifying_key_from_base58(&method.public_key_base58)
            .map_err(|_| rejected("bad key"))?;
        let bytes = Base64::decode_vec(&request.signature).map_err(|_| rejected("bad signature"))?;
        let signature = Signature::from_slice(&bytes).map_err(|_| rejected("bad signature"))?;

        let digest = checksum(&request.data)?;
        key.verify(&digest, &signature)
            .map_err(|_| rejected("signature mismatch"))?;
        Ok(digest)
    }
}

#[async_trait]
impl IdentityRegistry for MemoryRegistry {
    async fn register(
        &self,
        did: &str,
        verification_methods: Vec<VerificationMethod>,
        authentication: Vec<String>,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        if state.documents.contains_key(did) {
            return Err(RegistryError::Rejected {
                status: 409,
                body: "already registered".to_string(),
            });
        }
        state.documents.insert(
            did.to_string(),
            DidDocument {
                id: did.to_string(),
                verification_method: verification_methods,
                authentication,
                metadata: DidMetadata::default(),
            },
        );
        state.registrations += 1;
        Ok(())
    }

    async fn get(&self, did: &str) -> RegistryResult<DidDocument> {
        self.document(did)
            .ok_or_else(|| RegistryError::NotFound(did.to_string()))
    }

    async fn save_metadata(&self, request: Signed<SaveMetadataData>) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        let document = state
            .documents
            .get_mut(&request.data.did)
            .ok_or_else(|| RegistryError::NotFound(request.data.did.clone()))?;

        let digest = Self::verify(document, &request.data.authentication_key_id, &request)?;
        document.metadata = DidMetadata {
            root_hash: alloy::hex::encode(digest),
            objects: request.data.objects,
        };
        Ok(())
    }

    async fn save_verification_methods(
        &self,
        request: Signed<SaveVerificationMethodsData>,
    ) -> RegistryResult<()> {
        let mut state = self.state.lock().unwrap();
        let document = state
            .documents
            .get_mut(&request.data.did)
            .ok_or_else(|| RegistryError::NotFound(request.data.did.clone()))?;

        Self::verify(document, &request.data.authentication_key_id, &request)?;
        document.verification_method = request.data.verification_methods;
        document.authentication = request.data.authentication;
        Ok(())
    }

    async fn get_public_key(&self, address: &str) -> RegistryResult<String> {
        self.state
            .lock()
            .unwrap()
            .accounts
            .get(&address.to_lowercase())
            .cloned()
            .ok_or_else(|| RegistryError::NotFound(address.to_string()))
    }

    async fn register_account(&self, public_key_base58: &str) -> RegistryResult<()> {
        let key = verifying_key_from_base58(public_key_base58)
            .map_err(|e| RegistryError::InvalidResponse(e.to_string()))?;
        self.insert_account(&address_of(&key), public_key_base58);
        Ok(())
    }
}

// =============================================================================
// Harness
// =============================================================================

pub struct Harness {
    pub records: Arc<FailingRecordStore>,
    pub keyring: Arc<FileKeyring>,
    pub chain: Arc<MemoryChain>,
    pub content: Arc<MemoryContentStore>,
    pub registry: Arc<MemoryRegistry>,
    pub fanout: Arc<BroadcastFanOut>,
    pub services: Services,
    _dir: TempDir,
}

impl Harness {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        let paths = StoragePaths::new(dir.path());
        let records = Arc::new(FailingRecordStore::open(&paths));
        let mut storage = EncryptedStorage::new(paths);
        storage.initialize().unwrap();
        let keyring = Arc::new(FileKeyring::new(storage));
        let chain = Arc::new(MemoryChain::default());
        let content = Arc::new(MemoryContentStore::default());
        let registry = Arc::new(MemoryRegistry::default());
        let fanout = Arc::new(BroadcastFanOut::new(64));

        let services = Services::wire(
            Collaborators {
                records: records.clone(),
                keyring: keyring.clone(),
                chain: chain.clone(),
                content: content.clone(),
                registry: registry.clone(),
                fanout: fanout.clone(),
            },
            &EngineSettings {
                coin_type: 60,
                registry_url: "http://registry.test".to_string(),
                cache_capacity: 128,
                cache_ttl: Duration::from_secs(30),
            },
        )
        .unwrap();

        Self {
            records,
            keyring,
            chain,
            content,
            registry,
            fanout,
            services,
            _dir: dir,
        }
    }

    /// The record store behind the engines, as a trait object.
    pub fn kv(&self) -> &dyn RecordStore {
        self.records.as_ref()
    }
}
