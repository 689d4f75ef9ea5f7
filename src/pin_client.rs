use std::fs;
use std::path::{Path, PathBuf};

use reqwest::StatusCode;
use reqwest::blocking::{Client, multipart};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{Config, ConfigError};
use crate::dto::{PinMetadata, PinResponse};
use crate::utils::IPFS_SCHEME;

#[derive(Debug, Error)]
pub enum UploadError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{0} is not an image file")]
    NotAnImage(String),
    #[error("failed to read {}: {source}", path.display())]
    Io { path: PathBuf, source: std::io::Error },
    #[error("upload request failed: {0}")]
    Http(#[from] reqwest::Error),
    #[error("upload rejected ({status}): {message}")]
    Rejected { status: u16, message: String },
    #[error("unexpected pinning response: {0}")]
    MalformedResponse(String),
}

/// Thin client over the pinning service's `pinFileToIPFS` endpoint.
pub struct PinClient {
    http: Client,
    endpoint: String,
    jwt: Option<String>,
}

impl PinClient {
    pub fn new(config: &Config) -> Result<Self, UploadError> {
        let http = Client::builder().timeout(config.http_timeout()?).build()?;
        Ok(Self {
            http,
            endpoint: config.pinata_endpoint.clone(),
            jwt: config.pinata_jwt.clone(),
        })
    }

    pub fn upload_file(&self, path: &Path) -> Result<String, UploadError> {
        self.credential()?;
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::NotAnImage(path.display().to_string()))?;
        let bytes = fs::read(path).map_err(|source| UploadError::Io { path: path.to_path_buf(), source })?;
        self.upload_bytes(name, bytes)
    }

    //Single attempt, the caller decides what to do with a failure
    pub fn upload_bytes(&self, name: &str, bytes: Vec<u8>) -> Result<String, UploadError> {
        let jwt = self.credential()?;
        let content_type = image_content_type(name).ok_or_else(|| UploadError::NotAnImage(name.to_string()))?;

        let metadata = serde_json::to_string(&PinMetadata { name })
            .map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
        let size = bytes.len();
        let part = multipart::Part::bytes(bytes)
            .file_name(name.to_string())
            .mime_str(content_type)?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("pinataMetadata", metadata);

        info!(file = name, size, "pinning file");
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(jwt)
            .multipart(form)
            .send()?;

        let status = response.status();
        let body = response.text()?;
        debug!(%status, "pinning service responded");

        if !status.is_success() {
            return Err(UploadError::Rejected {
                status: status.as_u16(),
                message: error_message(status, &body),
            });
        }

        let pinned: PinResponse =
            serde_json::from_str(&body).map_err(|e| UploadError::MalformedResponse(e.to_string()))?;
        if pinned.ipfs_hash.trim().is_empty() {
            return Err(UploadError::MalformedResponse("empty IpfsHash".to_string()));
        }

        info!(cid = %pinned.ipfs_hash, "file pinned");
        Ok(format!("{IPFS_SCHEME}{}", pinned.ipfs_hash))
    }

    fn credential(&self) -> Result<&str, UploadError> {
        Ok(self.jwt.as_deref().ok_or(ConfigError::MissingCredential)?)
    }
}

pub fn image_content_type(name: &str) -> Option<&'static str> {
    let ext = Path::new(name).extension()?.to_str()?.to_ascii_lowercase();
    let mime = match ext.as_str() {
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "bmp" => "image/bmp",
        "avif" => "image/avif",
        _ => return None,
    };
    Some(mime)
}

//Pinata isn't consistent about error bodies, dig out whatever is most specific
fn error_message(status: StatusCode, body: &str) -> String {
    let fallback = || {
        status
            .canonical_reason()
            .map(str::to_string)
            .unwrap_or_else(|| format!("HTTP {}", status.as_u16()))
    };

    let Ok(json) = serde_json::from_str::<Value>(body) else {
        return fallback();
    };

    match &json["error"] {
        Value::String(s) => return s.clone(),
        Value::Object(obj) => {
            let reason = obj.get("reason").and_then(Value::as_str);
            let details = obj.get("details").and_then(Value::as_str);
            match (reason, details) {
                (Some(r), Some(d)) => return format!("{r}: {d}"),
                (Some(m), None) | (None, Some(m)) => return m.to_string(),
                (None, None) => {}
            }
        }
        _ => {}
    }

    json["message"].as_str().map(str::to_string).unwrap_or_else(fallback)
}
