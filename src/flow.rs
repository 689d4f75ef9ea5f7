use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::dto::StoredRecord;
use crate::pin_client::{PinClient, UploadError};
use crate::session_store::{RecordStore, SessionStorage, StoreError};
use crate::utils::now_millis;

#[derive(Debug, Error)]
pub enum FlowError {
    #[error(transparent)]
    Upload(#[from] UploadError),
    #[error("file was pinned as {content_ref} but could not be recorded: {source}")]
    Record { content_ref: String, source: StoreError },
}

/// Upload, pin, then record the reference at the head of the session list.
/// Nothing is recorded unless the pin succeeded.
pub fn upload_and_record<S: SessionStorage>(
    pin: &PinClient,
    store: &RecordStore<S>,
    file: &Path,
    description: &str,
) -> Result<StoredRecord, FlowError> {
    let content_ref = pin.upload_file(file)?;
    record(store, content_ref, description, now_millis())
}

pub fn record<S: SessionStorage>(
    store: &RecordStore<S>,
    content_ref: String,
    description: &str,
    created_at: i64,
) -> Result<StoredRecord, FlowError> {
    let entry = StoredRecord::new(content_ref.clone(), description.trim(), created_at);
    let stored = store
        .append(entry)
        .map_err(|source| FlowError::Record { content_ref, source })?;
    info!(id = %stored.id, content_ref = %stored.content_ref, "upload recorded");
    Ok(stored)
}
