use serde::{Deserialize, Serialize};

//One pinned upload as kept in session storage, newest-first in the list
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StoredRecord {
    pub id: String,
    pub content_ref: String,
    pub description: String,
    pub created_at: i64,
}

impl StoredRecord {
    pub fn new(content_ref: impl Into<String>, description: impl Into<String>, created_at: i64) -> Self {
        Self {
            id: created_at.to_string(),
            content_ref: content_ref.into(),
            description: description.into(),
            created_at,
        }
    }
}

#[derive(Deserialize, Debug)]
pub struct PinResponse {
    #[serde(rename = "IpfsHash")]
    pub ipfs_hash: String,
    #[serde(rename = "PinSize", default)]
    pub pin_size: Option<u64>,
    #[serde(rename = "Timestamp", default)]
    pub timestamp: Option<String>,
}

#[derive(Serialize, Debug)]
pub struct PinMetadata<'a> {
    pub name: &'a str,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct Call {
    pub to: String,
    pub data: String,
    pub value: String,
}

//wallet_sendCalls params[0]
#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct SendCallsPayload {
    pub version: String,
    pub chain_id: String,
    pub from: String,
    pub atomic_required: bool,
    pub calls: Vec<Call>,
}

#[derive(Serialize, Debug, Clone, PartialEq, Eq)]
pub struct MintReceipt {
    pub record_id: String,
    pub content_ref: String,
    pub call_id: String,
    pub from: String,
}
