use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use thiserror::Error;
use tracing::{debug, warn};

use crate::dto::StoredRecord;

pub const RECORDS_KEY: &str = "pinned_records";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("session storage i/o failed for {}: {source}", path.display())]
    Io { path: PathBuf, source: io::Error },
    #[error("failed to encode records: {0}")]
    Encode(#[from] serde_json::Error),
}

/// String key/value storage scoped to one session, shaped like Web Storage.
pub trait SessionStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn set_item(&self, key: &str, value: String) -> Result<(), StoreError>;
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;
}

/**
 * Arc so clones share the same session
 * Dashmap for concurrent access
 */
#[derive(Clone, Default)]
pub struct MemoryStorage {
    items: Arc<DashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SessionStorage for MemoryStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.items.get(key).map(|v| v.value().clone()))
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        self.items.insert(key.to_string(), value);
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        self.items.remove(key);
        Ok(())
    }
}

/// One JSON object file per session. Lives in the temp dir by default, so it goes
/// away with the machine's temp cleanup or an explicit `clear`.
/// The file name carries the session name hex-encoded, so distinct names never share a file.
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn for_session(session: &str) -> Self {
        Self::in_dir(&std::env::temp_dir().join("pinmint"), session)
    }

    pub fn in_dir(dir: &Path, session: &str) -> Self {
        Self { path: dir.join(format!("session-{}.json", hex::encode(session))) }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn load(&self) -> Result<HashMap<String, String>, StoreError> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(err) if err.kind() == io::ErrorKind::NotFound => return Ok(HashMap::new()),
            Err(source) => return Err(StoreError::Io { path: self.path.clone(), source }),
        };
        //A broken file reads as an empty session, the next write replaces it
        match serde_json::from_slice(&data) {
            Ok(items) => Ok(items),
            Err(err) => {
                warn!(path = %self.path.display(), %err, "session file is unreadable, treating as empty");
                Ok(HashMap::new())
            }
        }
    }

    //Write to a sibling tmp file then rename over the old one
    fn save(&self, items: &HashMap<String, String>) -> Result<(), StoreError> {
        let io_err = |source| StoreError::Io { path: self.path.clone(), source };
        if let Some(dir) = self.path.parent() {
            fs::create_dir_all(dir).map_err(io_err)?;
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, serde_json::to_vec_pretty(items)?).map_err(io_err)?;
        match fs::rename(&tmp, &self.path) {
            Ok(()) => Ok(()),
            Err(rename_err) => {
                if self.path.exists() {
                    fs::remove_file(&self.path).map_err(io_err)?;
                    fs::rename(&tmp, &self.path).map_err(io_err)
                } else {
                    Err(io_err(rename_err))
                }
            }
        }
    }
}

impl SessionStorage for FileStorage {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key))
    }

    fn set_item(&self, key: &str, value: String) -> Result<(), StoreError> {
        let mut items = self.load()?;
        items.insert(key.to_string(), value);
        self.save(&items)
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut items = self.load()?;
        //Rewrite whenever the file exists so an unreadable one gets replaced too
        if items.remove(key).is_some() || self.path.exists() {
            self.save(&items)?;
        }
        Ok(())
    }
}

/// The session's list of pinned uploads. Read and append are the only ways in.
pub struct RecordStore<S> {
    storage: S,
}

impl<S: SessionStorage> RecordStore<S> {
    pub fn new(storage: S) -> Self {
        Self { storage }
    }

    /// Full list as stored (newest first). Absent or unparseable data reads as empty.
    pub fn read_all(&self) -> Result<Vec<StoredRecord>, StoreError> {
        let Some(raw) = self.storage.get_item(RECORDS_KEY)? else {
            return Ok(Vec::new());
        };
        match serde_json::from_str(&raw) {
            Ok(records) => Ok(records),
            Err(err) => {
                warn!(%err, "stored records are malformed, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    /// Prepends `record` and writes the whole list back. Returns the record as
    /// stored, whose id may carry a suffix if the timestamp id was already taken.
    pub fn append(&self, mut record: StoredRecord) -> Result<StoredRecord, StoreError> {
        let mut records = self.read_all()?;

        let base = record.id.clone();
        let mut n = 0;
        while records.iter().any(|r| r.id == record.id) {
            n += 1;
            record.id = format!("{base}-{n}");
        }

        records.insert(0, record.clone());
        self.storage.set_item(RECORDS_KEY, serde_json::to_string(&records)?)?;
        debug!(id = %record.id, total = records.len(), "record appended");
        Ok(record)
    }

    pub fn clear(&self) -> Result<(), StoreError> {
        self.storage.remove_item(RECORDS_KEY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(ms: i64, description: &str) -> StoredRecord {
        StoredRecord::new(format!("ipfs://cid{ms}"), description, ms)
    }

    #[test]
    fn empty_store_reads_empty() {
        let store = RecordStore::new(MemoryStorage::new());
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn append_n_reads_n_newest_first() {
        let store = RecordStore::new(MemoryStorage::new());
        for ms in [100, 200, 300] {
            store.append(record(ms, "x")).unwrap();
        }
        let all = store.read_all().unwrap();
        assert_eq!(all.len(), 3);
        let stamps: Vec<i64> = all.iter().map(|r| r.created_at).collect();
        assert_eq!(stamps, vec![300, 200, 100]);
    }

    #[test]
    fn duplicate_timestamp_gets_unique_id() {
        let store = RecordStore::new(MemoryStorage::new());
        let first = store.append(record(5, "a")).unwrap();
        let second = store.append(record(5, "b")).unwrap();
        let third = store.append(record(5, "c")).unwrap();
        assert_eq!(first.id, "5");
        assert_eq!(second.id, "5-1");
        assert_eq!(third.id, "5-2");
    }

    #[test]
    fn malformed_json_reads_as_empty_and_append_recovers() {
        let storage = MemoryStorage::new();
        storage.set_item(RECORDS_KEY, "{not json".to_string()).unwrap();
        let store = RecordStore::new(storage.clone());

        assert!(store.read_all().unwrap().is_empty());
        store.append(record(1, "fresh")).unwrap();
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn stored_value_is_a_json_array_under_one_key() {
        let storage = MemoryStorage::new();
        let store = RecordStore::new(storage.clone());
        store.append(record(42, "dog")).unwrap();

        let raw = storage.get_item(RECORDS_KEY).unwrap().unwrap();
        let value: serde_json::Value = serde_json::from_str(&raw).unwrap();
        assert_eq!(value[0]["contentRef"], "ipfs://cid42");
    }

    #[test]
    fn clear_empties_the_list() {
        let store = RecordStore::new(MemoryStorage::new());
        store.append(record(1, "a")).unwrap();
        store.clear().unwrap();
        assert!(store.read_all().unwrap().is_empty());
    }

    #[test]
    fn file_storage_persists_across_instances() {
        let dir = tempfile::tempdir().unwrap();
        RecordStore::new(FileStorage::in_dir(dir.path(), "tab-1"))
            .append(record(7, "persisted"))
            .unwrap();

        let reopened = RecordStore::new(FileStorage::in_dir(dir.path(), "tab-1"));
        let all = reopened.read_all().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].description, "persisted");

        let other = RecordStore::new(FileStorage::in_dir(dir.path(), "tab-2"));
        assert!(other.read_all().unwrap().is_empty());
    }

    #[test]
    fn file_storage_encodes_session_name() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path(), "../evil name");
        assert_eq!(storage.path(), dir.path().join("session-2e2e2f6576696c206e616d65.json"));
        assert_eq!(storage.path().parent(), Some(dir.path()));
    }

    #[test]
    fn similar_session_names_stay_isolated() {
        let dir = tempfile::tempdir().unwrap();
        RecordStore::new(FileStorage::in_dir(dir.path(), "tab 1"))
            .append(record(1, "from tab 1"))
            .unwrap();

        for other in ["tab_1", "tab.1", "tab/1", ""] {
            let store = RecordStore::new(FileStorage::in_dir(dir.path(), other));
            assert!(store.read_all().unwrap().is_empty(), "session {other:?} saw records of \"tab 1\"");
        }
        let own = RecordStore::new(FileStorage::in_dir(dir.path(), "tab 1"));
        assert_eq!(own.read_all().unwrap().len(), 1);
    }

    #[test]
    fn corrupt_session_file_reads_empty_and_recovers() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path(), "bad");
        fs::write(storage.path(), "[1, 2").unwrap();
        assert_eq!(storage.get_item(RECORDS_KEY).unwrap(), None);

        let store = RecordStore::new(FileStorage::in_dir(dir.path(), "bad"));
        assert!(store.read_all().unwrap().is_empty());
        store.clear().unwrap();
        let on_disk: HashMap<String, String> = serde_json::from_slice(&fs::read(storage.path()).unwrap()).unwrap();
        assert!(on_disk.is_empty());

        store.append(record(9, "after repair")).unwrap();
        assert_eq!(store.read_all().unwrap()[0].description, "after repair");
    }

    #[test]
    fn append_over_corrupt_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path(), "bad");
        fs::write(storage.path(), "not json at all").unwrap();

        let store = RecordStore::new(storage);
        store.append(record(3, "kept")).unwrap();
        assert_eq!(store.read_all().unwrap().len(), 1);
    }

    #[test]
    fn clear_on_missing_file_creates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::in_dir(dir.path(), "never-used");
        let path = storage.path().to_path_buf();
        RecordStore::new(storage).clear().unwrap();
        assert!(!path.exists());
    }
}
