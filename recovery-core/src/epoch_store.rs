//! Crash-atomic persistence of the local epoch counter.
//!
//! Format: 8 bytes big-endian, no framing, no checksum — a torn write
//! affects only the temp file, never the canonical one.

use crate::error::EpochStoreError;
use byteorder::{BigEndian, ByteOrder};
use std::{
    fs::{self, File},
    io::{self, Write},
    path::{Path, PathBuf},
};

const EPOCH_FILE_NAME: &str = "sync.epoch";
const TEMP_SUFFIX: &str = ".tmp";

/// Read/write access to the monotonic local epoch counter on stable storage.
pub trait EpochStore: Send + Sync {
    /// Returns 0 if no epoch has ever been persisted, otherwise the last
    /// persisted value.
    fn read(&self) -> Result<u64, EpochStoreError>;

    /// Replaces the persisted value with `v`, atomically with respect to
    /// crashes. Callers must only pass values strictly greater than the
    /// prior `read`.
    fn write(&self, v: u64) -> Result<(), EpochStoreError>;
}

/// File-backed `EpochStore`. The canonical file lives at
/// `<dir>/sync.epoch`; the sibling temp file is `<dir>/sync.epoch.tmp`.
pub struct FileEpochStore {
    dir: PathBuf,
}

impl FileEpochStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    fn canonical_path(&self) -> PathBuf {
        self.dir.join(EPOCH_FILE_NAME)
    }

    fn temp_path(&self) -> PathBuf {
        self.dir.join(format!("{EPOCH_FILE_NAME}{TEMP_SUFFIX}"))
    }

    /// Flushes the directory entry so the rename itself survives a crash,
    /// not just the bytes behind it.
    fn sync_dir(&self, dir: &Path) -> Result<(), EpochStoreError> {
        let dir_file = File::open(dir).map_err(|source| EpochStoreError::Sync {
            path: dir.to_path_buf(),
            source,
        })?;
        dir_file.sync_all().map_err(|source| EpochStoreError::Sync {
            path: dir.to_path_buf(),
            source,
        })
    }
}

impl EpochStore for FileEpochStore {
    fn read(&self) -> Result<u64, EpochStoreError> {
        let path = self.canonical_path();
        match fs::read(&path) {
            Ok(bytes) if bytes.len() == 8 => Ok(BigEndian::read_u64(&bytes)),
            Ok(bytes) => Err(EpochStoreError::Corrupt {
                path,
                len: bytes.len(),
            }),
            Err(source) if source.kind() == io::ErrorKind::NotFound => Ok(0),
            Err(source) => Err(EpochStoreError::Read { path, source }),
        }
    }

    fn write(&self, v: u64) -> Result<(), EpochStoreError> {
        let temp_path = self.temp_path();
        let canonical_path = self.canonical_path();

        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, v);

        let mut file = File::create(&temp_path).map_err(|source| EpochStoreError::Write {
            path: temp_path.clone(),
            source,
        })?;
        file.write_all(&buf).map_err(|source| EpochStoreError::Write {
            path: temp_path.clone(),
            source,
        })?;
        file.sync_all().map_err(|source| EpochStoreError::Write {
            path: temp_path.clone(),
            source,
        })?;
        drop(file);

        fs::rename(&temp_path, &canonical_path).map_err(|source| EpochStoreError::Rename {
            from: temp_path,
            to: canonical_path,
            source,
        })?;

        self.sync_dir(&self.dir)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_returns_zero_when_file_absent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEpochStore::new(dir.path());
        assert_eq!(store.read().unwrap(), 0);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEpochStore::new(dir.path());
        store.write(7).unwrap();
        assert_eq!(store.read().unwrap(), 7);
    }

    #[test]
    fn sequential_writes_observe_strictly_increasing_values() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEpochStore::new(dir.path());
        store.write(1).unwrap();
        store.write(2).unwrap();
        assert_eq!(store.read().unwrap(), 2);
    }

    #[test]
    fn temp_file_does_not_replace_canonical_file_until_rename() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEpochStore::new(dir.path());
        store.write(5).unwrap();

        // Simulate a crash mid-write: the temp file exists with a new value,
        // but the canonical file must still be the last fully-written one
        // until a rename actually happens.
        let mut buf = [0u8; 8];
        BigEndian::write_u64(&mut buf, 99);
        fs::write(store.temp_path(), buf).unwrap();

        assert_eq!(store.read().unwrap(), 5);
    }

    #[test]
    fn corrupt_file_length_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileEpochStore::new(dir.path());
        fs::write(store.canonical_path(), b"short").unwrap();
        claims::assert_matches!(store.read(), Err(EpochStoreError::Corrupt { len: 5, .. }));
    }
}
