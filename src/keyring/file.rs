// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! File-backed keyring on the sealed data volume.
//!
//! ```text
//! keyring/{name}/meta.json     CredentialRecord
//! keyring/{name}/key.pem       PKCS#8 private key
//! keyring-index/{address}.json { "name": ... }
//! ```

use std::sync::Mutex;

use chrono::Utc;
use k256::ecdsa::SigningKey;
use pkcs8::{EncodePrivateKey, LineEnding};
use serde::{Deserialize, Serialize};

use super::{armor, hd, CredentialOwner, CredentialRecord, CredentialStore, KeyringError, KeyringResult};
use crate::blockchain::signing::{address_of, public_key_hex, signing_key_from_pem};
use crate::storage::{EncryptedStorage, StorageError};

#[derive(Debug, Serialize, Deserialize)]
struct AddressIndexEntry {
    name: String,
}

pub struct FileKeyring {
    storage: EncryptedStorage,
    /// Serializes the uniqueness checks with the writes that follow them.
    write_lock: Mutex<()>,
}

impl FileKeyring {
    pub fn new(storage: EncryptedStorage) -> Self {
        Self {
            storage,
            write_lock: Mutex::new(()),
        }
    }

    pub fn storage(&self) -> &EncryptedStorage {
        &self.storage
    }

    fn store(&self, name: &str, key: &SigningKey, owner: CredentialOwner) -> KeyringResult<CredentialRecord> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| KeyringError::Storage(StorageError::Integrity("keyring lock poisoned".into())))?;

        let paths = self.storage.paths();
        let address = address_of(key.verifying_key());

        if self.storage.exists(paths.credential_meta(name)) {
            return Err(KeyringError::AlreadyExists(name.to_string()));
        }
        if let Some(existing) = self.index_entry(&address)? {
            return Err(KeyringError::DuplicateAddress {
                address,
                existing: existing.name,
            });
        }

        let pem = key
            .to_pkcs8_pem(LineEnding::LF)
            .map_err(|e| KeyringError::Armor(e.to_string()))?;

        let record = CredentialRecord {
            name: name.to_string(),
            address: address.clone(),
            public_key: public_key_hex(key.verifying_key()),
            owner,
            created_at: Utc::now(),
        };

        self.storage.write_raw(paths.credential_key(name), pem.as_bytes())?;
        self.storage.write_json(paths.credential_meta(name), &record)?;
        self.storage.write_json(
            paths.address_index(&address),
            &AddressIndexEntry {
                name: name.to_string(),
            },
        )?;

        tracing::debug!(name = %name, address = %address, "Credential stored");
        Ok(record)
    }

    fn index_entry(&self, address: &str) -> KeyringResult<Option<AddressIndexEntry>> {
        let path = self.storage.paths().address_index(&address.to_lowercase());
        if !self.storage.exists(&path) {
            return Ok(None);
        }
        Ok(Some(self.storage.read_json(path)?))
    }
}

impl CredentialStore for FileKeyring {
    fn create(
        &self,
        name: &str,
        mnemonic: &str,
        hd_path: &str,
        owner: CredentialOwner,
    ) -> KeyringResult<CredentialRecord> {
        let key = hd::derive_signing_key(mnemonic, hd_path)?;
        self.store(name, &key, owner)
    }

    fn import_armored(
        &self,
        name: &str,
        armored: &str,
        passphrase: &str,
        owner: CredentialOwner,
    ) -> KeyringResult<CredentialRecord> {
        let key = armor::unarmor(armored, passphrase)?;
        self.store(name, &key, owner)
    }

    fn export_armored(&self, name: &str, passphrase: &str) -> KeyringResult<String> {
        let key = self.signing_key(name)?;
        armor::armor(&key, passphrase)
    }

    fn get(&self, name: &str) -> KeyringResult<Option<CredentialRecord>> {
        let path = self.storage.paths().credential_meta(name);
        if !self.storage.exists(&path) {
            return Ok(None);
        }
        Ok(Some(self.storage.read_json(path)?))
    }

    fn lookup_by_address(&self, address: &str) -> KeyringResult<Option<CredentialRecord>> {
        match self.index_entry(address)? {
            Some(entry) => self.get(&entry.name),
            None => Ok(None),
        }
    }

    fn signing_key(&self, name: &str) -> KeyringResult<SigningKey> {
        let path = self.storage.paths().credential_key(name);
        if !self.storage.exists(&path) {
            return Err(KeyringError::NotFound(name.to_string()));
        }
        let pem = self.storage.read_raw(path)?;
        signing_key_from_pem(&pem).map_err(|e| KeyringError::Armor(e.to_string()))
    }

    fn delete(&self, name: &str) -> KeyringResult<()> {
        let record = self
            .get(name)?
            .ok_or_else(|| KeyringError::NotFound(name.to_string()))?;

        let paths = self.storage.paths();
        let index_path = paths.address_index(&record.address);
        if self.storage.exists(&index_path) {
            self.storage.delete(index_path)?;
        }
        self.storage.delete_dir(paths.credential_dir(name))?;

        tracing::debug!(name = %name, address = %record.address, "Credential deleted");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::keyring::hd::derivation_path;
    use crate::storage::{OwnedResource, StoragePaths};
    use k256::elliptic_curve::rand_core::OsRng;
    use tempfile::TempDir;

    const PHRASE: &str =
        "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

    fn keyring() -> (FileKeyring, TempDir) {
        let dir = TempDir::new().unwrap();
        let mut storage = EncryptedStorage::new(StoragePaths::new(dir.path()));
        storage.initialize().unwrap();
        (FileKeyring::new(storage), dir)
    }

    #[test]
    fn create_and_lookup() {
        let (keyring, _dir) = keyring();
        let record = keyring
            .create("3_0", PHRASE, &derivation_path(60, 0), CredentialOwner::hd("3", 0))
            .unwrap();

        assert_eq!(record.address, "0x9858effd232b4033e47d90003d41ec34ecaeda94");
        assert!(!record.is_imported());

        let found = keyring
            .lookup_by_address("0x9858EFFD232B4033E47D90003D41EC34ECAEDA94")
            .unwrap()
            .unwrap();
        assert_eq!(found.name, "3_0");
        assert!(found.ensure_owned_by("3").is_ok());
        assert!(found.ensure_owned_by("4").is_err());
    }

    #[test]
    fn duplicate_address_is_rejected() {
        let (keyring, _dir) = keyring();
        let path = derivation_path(60, 0);
        keyring.create("3_0", PHRASE, &path, CredentialOwner::hd("3", 0)).unwrap();

        let err = keyring
            .create("4_0", PHRASE, &path, CredentialOwner::hd("4", 0))
            .unwrap_err();
        assert!(matches!(err, KeyringError::DuplicateAddress { ref existing, .. } if existing == "3_0"));

        let err = keyring
            .create("3_0", PHRASE, &derivation_path(60, 1), CredentialOwner::hd("3", 0))
            .unwrap_err();
        assert!(matches!(err, KeyringError::AlreadyExists(_)));
    }

    #[test]
    fn import_export_round_trip() {
        let (keyring, _dir) = keyring();
        let key = SigningKey::random(&mut OsRng);
        let armored = armor::armor(&key, "secret").unwrap();

        let record = keyring
            .import_armored("3_imported_1", &armored, "secret", CredentialOwner::imported("3", 1))
            .unwrap();
        assert!(record.is_imported());
        assert_eq!(record.address, address_of(key.verifying_key()));

        let exported = keyring.export_armored("3_imported_1", "").unwrap();
        assert_eq!(armor::unarmor(&exported, "").unwrap().to_bytes(), key.to_bytes());
        assert_eq!(keyring.signing_key("3_imported_1").unwrap().to_bytes(), key.to_bytes());
    }

    #[test]
    fn delete_removes_entry_and_index() {
        let (keyring, _dir) = keyring();
        let record = keyring
            .create("3_0", PHRASE, &derivation_path(60, 0), CredentialOwner::hd("3", 0))
            .unwrap();

        keyring.delete("3_0").unwrap();
        assert!(keyring.get("3_0").unwrap().is_none());
        assert!(keyring.lookup_by_address(&record.address).unwrap().is_none());
        assert!(matches!(keyring.delete("3_0"), Err(KeyringError::NotFound(_))));
        assert!(matches!(keyring.signing_key("3_0"), Err(KeyringError::NotFound(_))));
    }
}
