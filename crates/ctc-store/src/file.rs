use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{StoreError, StoreResult};
use crate::memory::{install_writes, validate_reads};
use crate::traits::{Versioned, VersionedStore};
use crate::transaction::{ReadSet, WriteSet};

/// On-disk image: one JSON document holding every key.
///
/// ```text
/// { "entries": { "<key>": { "version": 3, "value": "<hex>" | null } } }
/// ```
#[derive(Debug, Default, Serialize, Deserialize)]
struct FileImage {
    entries: BTreeMap<String, FileEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct FileEntry {
    version: u64,
    value: Option<String>,
}

/// Versioned store persisted as a single JSON file.
///
/// Each applied unit of work rewrites the whole image into a temporary file
/// in the same directory and renames it over the old one, so a crash leaves
/// either the previous or the new image on disk. Nothing is cached: every
/// read and every apply loads the current image, so writes made through
/// another handle on the same path are always observed. Writers in separate
/// processes are not locked against each other.
pub struct FileKvStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKvStore {
    /// Open the store at `path`, creating parent directories as needed.
    ///
    /// A missing file is an empty store; it is created on the first write.
    /// An existing file is loaded once so that a corrupt image is reported
    /// here rather than on first use.
    pub fn open(path: impl AsRef<Path>) -> StoreResult<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        let entries = load(&path)?;
        debug!(path = %path.display(), keys = entries.len(), "opened file store");
        Ok(Self {
            path,
            write_lock: Mutex::new(()),
        })
    }

    /// Location of the backing file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl VersionedStore for FileKvStore {
    fn read_versioned(&self, key: &str) -> StoreResult<Versioned> {
        let mut entries = load(&self.path)?;
        Ok(entries.remove(key).unwrap_or_default())
    }

    fn apply(&self, reads: &ReadSet, writes: &WriteSet) -> StoreResult<()> {
        let _guard = self.write_lock.lock().map_err(|_| StoreError::LockPoisoned)?;
        let mut entries = load(&self.path)?;
        validate_reads(&entries, reads)?;
        install_writes(&mut entries, writes);
        persist(&self.path, &entries)
    }
}

impl std::fmt::Debug for FileKvStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileKvStore")
            .field("path", &self.path)
            .finish()
    }
}

fn load(path: &Path) -> StoreResult<HashMap<String, Versioned>> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(HashMap::new()),
        Err(e) => return Err(e.into()),
    };
    let image: FileImage = serde_json::from_slice(&bytes).map_err(|e| StoreError::Corrupt {
        reason: format!("{}: {e}", path.display()),
    })?;

    image
        .entries
        .into_iter()
        .map(|(key, entry)| {
            let value = entry
                .value
                .map(|hex_value| hex::decode(hex_value))
                .transpose()
                .map_err(|e| StoreError::Corrupt {
                    reason: format!("value of {key:?} is not hex: {e}"),
                })?;
            Ok((
                key,
                Versioned {
                    version: entry.version,
                    value,
                },
            ))
        })
        .collect()
}

fn persist(path: &Path, entries: &HashMap<String, Versioned>) -> StoreResult<()> {
    let image = FileImage {
        entries: entries
            .iter()
            .map(|(key, v)| {
                (
                    key.clone(),
                    FileEntry {
                        version: v.version,
                        value: v.value.as_ref().map(hex::encode),
                    },
                )
            })
            .collect(),
    };
    let bytes =
        serde_json::to_vec_pretty(&image).map_err(|e| StoreError::Serialization(e.to_string()))?;

    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    let mut tmp = tempfile::NamedTempFile::new_in(dir)?;
    tmp.write_all(&bytes)?;
    tmp.as_file().sync_all()?;
    tmp.persist(path).map_err(|e| StoreError::Io(e.error))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::traits::KvStore;

    #[test]
    fn missing_file_is_empty_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileKvStore::open(dir.path().join("store.json")).unwrap();
        assert_eq!(store.read_versioned("k").unwrap(), Versioned::absent());
        assert!(!store.path().exists());
    }

    #[test]
    fn committed_writes_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        {
            let store = FileKvStore::open(&path).unwrap();
            let mut txn = store.begin();
            txn.put("record", vec![0, 1, 2, 255]).unwrap();
            txn.put("head", b"abc".to_vec()).unwrap();
            txn.commit().unwrap();
        }

        let reopened = FileKvStore::open(&path).unwrap();
        let record = reopened.read_versioned("record").unwrap();
        assert_eq!(record.value, Some(vec![0, 1, 2, 255]));
        assert_eq!(record.version, 1);
        assert_eq!(
            reopened.read_versioned("head").unwrap().value,
            Some(b"abc".to_vec())
        );
    }

    #[test]
    fn deletes_persist_as_tombstones() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileKvStore::open(&path).unwrap();

        let mut txn = store.begin();
        txn.put("head", b"h".to_vec()).unwrap();
        txn.commit().unwrap();

        let mut txn = store.begin();
        txn.delete("head").unwrap();
        txn.commit().unwrap();

        let reopened = FileKvStore::open(&path).unwrap();
        let head = reopened.read_versioned("head").unwrap();
        assert!(head.value.is_none());
        assert_eq!(head.version, 2);
    }

    #[test]
    fn conflict_leaves_file_untouched() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileKvStore::open(&path).unwrap();

        let mut stale = store.begin();
        assert!(stale.get("head").unwrap().is_none());
        stale.put("head", b"stale".to_vec()).unwrap();

        let mut winner = store.begin();
        winner.put("head", b"winner".to_vec()).unwrap();
        winner.commit().unwrap();
        let before = fs::read(&path).unwrap();

        assert!(stale.commit().unwrap_err().is_conflict());
        assert_eq!(fs::read(&path).unwrap(), before);
    }

    #[test]
    fn writes_from_another_handle_are_validated() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let a = FileKvStore::open(&path).unwrap();
        let b = FileKvStore::open(&path).unwrap();

        let mut from_a = a.begin();
        assert!(from_a.get("head").unwrap().is_none());
        from_a.put("head", b"a".to_vec()).unwrap();

        let mut from_b = b.begin();
        from_b.put("head", b"b".to_vec()).unwrap();
        from_b.commit().unwrap();

        assert!(from_a.commit().unwrap_err().is_conflict());

        // A fresh unit of work on the losing handle sees the winner's write.
        let mut retry = a.begin();
        assert_eq!(retry.get("head").unwrap(), Some(b"b".to_vec()));
        retry.put("head", b"a-after-b".to_vec()).unwrap();
        retry.commit().unwrap();

        let head = b.read_versioned("head").unwrap();
        assert_eq!(head.value, Some(b"a-after-b".to_vec()));
        assert_eq!(head.version, 2);
    }

    #[test]
    fn reads_reflect_writes_from_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let reader = FileKvStore::open(&path).unwrap();
        let writer = FileKvStore::open(&path).unwrap();
        assert!(reader.read_versioned("k").unwrap().value.is_none());

        let mut txn = writer.begin();
        txn.put("k", b"v".to_vec()).unwrap();
        txn.commit().unwrap();

        assert_eq!(reader.read_versioned("k").unwrap().value, Some(b"v".to_vec()));
    }

    #[test]
    fn garbage_file_is_reported_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        fs::write(&path, b"{not json").unwrap();
        let err = FileKvStore::open(&path).unwrap_err();
        assert!(matches!(err, StoreError::Corrupt { .. }));
    }
}
