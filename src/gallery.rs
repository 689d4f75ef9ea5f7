use crate::dto::StoredRecord;
use crate::session_store::{RecordStore, SessionStorage, StoreError};
use crate::utils::resolve_gateway_url;

/// Snapshot of the session's records, sorted newest first. Loaded once; filtering
/// never goes back to the store.
pub struct Gallery {
    records: Vec<StoredRecord>,
}

impl Gallery {
    pub fn load<S: SessionStorage>(store: &RecordStore<S>) -> Result<Self, StoreError> {
        Ok(Self::from_records(store.read_all()?))
    }

    pub fn from_records(mut records: Vec<StoredRecord>) -> Self {
        records.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Self { records }
    }

    pub fn records(&self) -> &[StoredRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Case-insensitive substring match on the description, query taken as typed.
    /// An empty or all-whitespace query keeps everything.
    pub fn filter(&self, query: &str) -> Vec<&StoredRecord> {
        if query.trim().is_empty() {
            return self.records.iter().collect();
        }
        let needle = query.to_lowercase();
        self.records
            .iter()
            .filter(|r| r.description.to_lowercase().contains(&needle))
            .collect()
    }

    pub fn find(&self, id: &str) -> Option<&StoredRecord> {
        self.records.iter().find(|r| r.id == id)
    }
}

pub fn gateway_url(record: &StoredRecord, gateway: &str) -> String {
    resolve_gateway_url(&record.content_ref, gateway)
}
