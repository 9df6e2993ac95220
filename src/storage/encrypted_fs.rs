// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Keyring files on the sealed volume.
//!
//! `DATA_DIR` is mounted encrypted and integrity-protected by the
//! deployment. Everything here is plain `std::fs`; no storage crypto is
//! implemented in Rust.
//!
//! Writes go to a sibling `.tmp` file and are renamed into place, so a
//! reader sees either the previous or the new content of a credential file.

use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{de::DeserializeOwned, Serialize};

use super::StoragePaths;

#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("sealed storage is not initialized")]
    NotInitialized,

    #[error("missing file: {}", .0.display())]
    Missing(PathBuf),

    /// The volume rejected a read (tag mismatch or tampering).
    #[error("integrity violation: {0}")]
    Integrity(String),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl StorageError {
    fn io(path: &Path, source: io::Error) -> Self {
        // Sealed volumes report authentication failures as generic I/O errors.
        let message = source.to_string();
        if message.contains("Authentication") || message.contains("integrity") {
            StorageError::Integrity(format!("{}: {message}", path.display()))
        } else if source.kind() == io::ErrorKind::NotFound {
            StorageError::Missing(path.to_path_buf())
        } else {
            StorageError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    }

    fn json(path: &Path, source: serde_json::Error) -> Self {
        StorageError::Json {
            path: path.to_path_buf(),
            source,
        }
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

/// File access rooted at the sealed data directory.
#[derive(Debug, Clone)]
pub struct EncryptedStorage {
    paths: StoragePaths,
    initialized: bool,
}

impl EncryptedStorage {
    /// Nothing touches the disk until [`initialize`](Self::initialize).
    pub fn new(paths: StoragePaths) -> Self {
        Self {
            paths,
            initialized: false,
        }
    }

    pub fn paths(&self) -> &StoragePaths {
        &self.paths
    }

    /// Create the keyring and address-index directories. Idempotent.
    pub fn initialize(&mut self) -> StorageResult<()> {
        for dir in [self.paths.keyring_dir(), self.paths.address_index_dir()] {
            fs::create_dir_all(&dir).map_err(|e| StorageError::io(&dir, e))?;
        }
        self.initialized = true;
        tracing::debug!(root = %self.paths.root().display(), "Sealed storage initialized");
        Ok(())
    }

    /// Round-trip a scratch file through the volume.
    pub fn health_check(&self) -> StorageResult<()> {
        self.ready()?;

        let scratch = self.paths.root().join(".health-check");
        let payload = b"custody-health-check";
        self.write_raw(&scratch, payload)?;
        let read = self.read_raw(&scratch)?;
        fs::remove_file(&scratch).map_err(|e| StorageError::io(&scratch, e))?;

        if read != payload {
            return Err(StorageError::Integrity("health check content changed".to_string()));
        }
        Ok(())
    }

    pub fn read_json<T: DeserializeOwned>(&self, path: impl AsRef<Path>) -> StorageResult<T> {
        let path = path.as_ref();
        let bytes = self.read_raw(path)?;
        serde_json::from_slice(&bytes).map_err(|e| StorageError::json(path, e))
    }

    pub fn write_json<T: Serialize>(&self, path: impl AsRef<Path>, value: &T) -> StorageResult<()> {
        let path = path.as_ref();
        self.write_atomic(path, |writer| {
            serde_json::to_writer_pretty(&mut *writer, value)
                .map_err(|e| StorageError::json(path, e))
        })
    }

    pub fn read_raw(&self, path: impl AsRef<Path>) -> StorageResult<Vec<u8>> {
        self.ready()?;
        let path = path.as_ref();
        fs::read(path).map_err(|e| StorageError::io(path, e))
    }

    /// PEM keys and other opaque blobs.
    pub fn write_raw(&self, path: impl AsRef<Path>, data: &[u8]) -> StorageResult<()> {
        let path = path.as_ref();
        self.write_atomic(path, |writer| {
            writer.write_all(data).map_err(|e| StorageError::io(path, e))
        })
    }

    /// Opening instead of `Path::exists`: `stat` can fail on sealed files
    /// that read fine.
    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        File::open(path.as_ref()).is_ok()
    }

    pub fn delete(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        self.ready()?;
        let path = path.as_ref();
        fs::remove_file(path).map_err(|e| StorageError::io(path, e))
    }

    pub fn delete_dir(&self, path: impl AsRef<Path>) -> StorageResult<()> {
        self.ready()?;
        let path = path.as_ref();
        fs::remove_dir_all(path).map_err(|e| StorageError::io(path, e))
    }

    fn ready(&self) -> StorageResult<()> {
        if self.initialized {
            Ok(())
        } else {
            Err(StorageError::NotInitialized)
        }
    }

    fn write_atomic<F>(&self, path: &Path, fill: F) -> StorageResult<()>
    where
        F: FnOnce(&mut BufWriter<File>) -> StorageResult<()>,
    {
        self.ready()?;

        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| StorageError::io(parent, e))?;
        }

        let staging = path.with_extension("tmp");
        let file = File::create(&staging).map_err(|e| StorageError::io(&staging, e))?;
        let mut writer = BufWriter::new(file);
        fill(&mut writer)?;
        writer.flush().map_err(|e| StorageError::io(&staging, e))?;
        drop(writer);

        fs::rename(&staging, path).map_err(|e| StorageError::io(path, e))
    }
}
