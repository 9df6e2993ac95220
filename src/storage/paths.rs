// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Layout of the sealed data directory.

use std::path::{Path, PathBuf};

/// Default `DATA_DIR`.
pub const DATA_ROOT: &str = "/data";

const RECORDS_FILE: &str = "records.redb";
const KEYRING_DIR: &str = "keyring";
const ADDRESS_INDEX_DIR: &str = "keyring-index";

#[derive(Debug, Clone)]
pub struct StoragePaths {
    root: PathBuf,
}

impl Default for StoragePaths {
    fn default() -> Self {
        Self::new(DATA_ROOT)
    }
}

impl StoragePaths {
    pub fn new(root: impl AsRef<Path>) -> Self {
        Self {
            root: root.as_ref().to_path_buf(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn records_db(&self) -> PathBuf {
        self.root.join(RECORDS_FILE)
    }

    /// One sub-directory per credential name.
    pub fn keyring_dir(&self) -> PathBuf {
        self.root.join(KEYRING_DIR)
    }

    pub fn credential_dir(&self, name: &str) -> PathBuf {
        self.keyring_dir().join(name)
    }

    pub fn credential_meta(&self, name: &str) -> PathBuf {
        self.credential_dir(name).join("meta.json")
    }

    /// PKCS#8 private key. Leaves the volume only through an armored export.
    pub fn credential_key(&self, name: &str) -> PathBuf {
        self.credential_dir(name).join("key.pem")
    }

    pub fn address_index_dir(&self) -> PathBuf {
        self.root.join(ADDRESS_INDEX_DIR)
    }

    /// `address` is expected lowercase.
    pub fn address_index(&self, address: &str) -> PathBuf {
        self.address_index_dir().join(format!("{address}.json"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn records_and_keyring_share_the_root() {
        let paths = StoragePaths::default();
        assert_eq!(paths.records_db(), PathBuf::from("/data/records.redb"));
        assert_eq!(paths.keyring_dir(), PathBuf::from("/data/keyring"));
    }

    #[test]
    fn credential_files_live_under_their_name() {
        let paths = StoragePaths::new("/srv/custody");
        assert_eq!(
            paths.credential_meta("3_0"),
            PathBuf::from("/srv/custody/keyring/3_0/meta.json")
        );
        assert_eq!(
            paths.credential_key("3_imported_1"),
            PathBuf::from("/srv/custody/keyring/3_imported_1/key.pem")
        );
        assert_eq!(
            paths.address_index("0xabc"),
            PathBuf::from("/srv/custody/keyring-index/0xabc.json")
        );
    }
}
