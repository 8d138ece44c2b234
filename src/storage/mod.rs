//! Object storage: the store abstraction, the Cloud Storage client and the
//! artifact uploader.

pub mod gcs;
pub mod types;
pub mod upload;

use std::path::Path;

use async_trait::async_trait;

pub use gcs::{GcsClient, ServiceAccountKey, content_type_for, materialize_credentials};
pub use types::{StorageError, StorageResult, UploadResult, UploadSummary, UploadedObject};
pub use upload::{collect_files, upload_artifacts, upload_directory, upload_file};

/// Write-only access to one bucket
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Bucket every key is written to
    fn bucket(&self) -> &str;

    /// Upload the file at `local` under `key`
    async fn upload(&self, local: &Path, key: &str) -> StorageResult<UploadedObject>;
}
