//! Backing Store Module
//!
//! Persistence contract the cache writes serialized entries to, with an
//! in-memory and a directory-backed implementation.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};

use crate::error::StoreError;

// == Backing Store Trait ==
/// A persistent key/value medium.
///
/// Writes may fail when the host runs out of room; the cache handles that.
pub trait BackingStore: Send {
    /// Returns the bytes stored under `key`, or None if absent.
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;

    /// Stores `bytes` under `key`, replacing any previous value.
    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError>;

    /// Removes `key`. Deleting an absent key succeeds.
    fn delete(&mut self, key: &str) -> Result<(), StoreError>;
}

// == Memory Store ==
/// In-memory backing store with an optional host quota.
///
/// The quota counts every stored byte, including the cache's own index
/// record, the way a browser's storage quota would.
#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    data: HashMap<String, Vec<u8>>,
    quota: Option<u64>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes pushing total usage past `quota` bytes.
    pub fn with_quota(quota: u64) -> Self {
        Self {
            data: HashMap::new(),
            quota: Some(quota),
        }
    }

    /// Total bytes held across all keys.
    pub fn used_bytes(&self) -> u64 {
        self.data.values().map(|v| v.len() as u64).sum()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}

impl BackingStore for MemoryStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.data.get(key).cloned())
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        if let Some(quota) = self.quota {
            let replaced = self.data.get(key).map(|v| v.len() as u64).unwrap_or(0);
            let projected = self.used_bytes() - replaced + bytes.len() as u64;
            if projected > quota {
                return Err(StoreError::Quota(format!(
                    "writing {} bytes to '{}' would use {} of {} bytes",
                    bytes.len(),
                    key,
                    projected,
                    quota
                )));
            }
        }
        self.data.insert(key.to_string(), bytes.to_vec());
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        self.data.remove(key);
        Ok(())
    }
}

// == File Store ==
/// One file per key inside a directory.
///
/// File names are the hex SHA-256 digest of the key: fixed length, so keys
/// of any length (including the empty key) map to a valid name. Writes go to
/// a temporary file first and are renamed into place.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Opens (creating if needed) a store rooted at `dir`.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Path of the file holding `key`.
    pub fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(encode_key(key))
    }
}

impl BackingStore for FileStore {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match fs::read(self.path_for(key)) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn write(&mut self, key: &str, bytes: &[u8]) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("tmp");
        if let Err(e) = fs::write(&tmp, bytes) {
            let _ = fs::remove_file(&tmp);
            return Err(e.into());
        }
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn delete(&mut self, key: &str) -> Result<(), StoreError> {
        match fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

fn encode_key(key: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(key.as_bytes());
    hasher
        .finalize()
        .iter()
        .map(|b| format!("{:02x}", b))
        .collect()
}
