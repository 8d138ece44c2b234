use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Error types for storage operations
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// The credentials blob is not valid base64
    #[error("invalid storage credentials: {0}")]
    Credentials(String),

    /// The decoded credentials are not a service-account key
    #[error("invalid service account key: {0}")]
    Key(#[from] serde_json::Error),

    #[error("failed to sign token request: {0}")]
    Signing(#[from] jsonwebtoken::errors::Error),

    /// The token endpoint refused the grant
    #[error("token request failed with {status}: {body}")]
    Token { status: u16, body: String },

    /// The storage API refused an object
    #[error("upload of {key} failed with {status}: {body}")]
    Upload { key: String, status: u16, body: String },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Object metadata returned by the storage API
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedObject {
    pub name: String,

    #[serde(default)]
    pub bucket: String,

    /// Decimal string, as the API reports it
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_link: Option<String>,
}

/// Outcome of one attempted upload
#[derive(Debug)]
pub struct UploadResult {
    /// Destination key
    pub file_name: String,
    pub status: Result<UploadedObject, StorageError>,
}

impl UploadResult {
    pub fn is_ok(&self) -> bool {
        self.status.is_ok()
    }
}

/// Success/failure counts over a batch of uploads
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UploadSummary {
    pub attempted: usize,
    pub succeeded: usize,
    pub failed: usize,
}

impl UploadSummary {
    pub fn from_results(results: &[UploadResult]) -> Self {
        let failed = results.iter().filter(|r| !r.is_ok()).count();
        Self {
            attempted: results.len(),
            succeeded: results.len() - failed,
            failed,
        }
    }
}
