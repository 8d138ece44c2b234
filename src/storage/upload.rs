//! Artifact uploads.
//!
//! Every file of a directory walk is uploaded concurrently. A failed upload is
//! recorded in its [`UploadResult`] and never cancels its siblings; nothing is
//! retried.

use std::path::{Path, PathBuf};

use futures::future::join_all;
use tracing::{debug, info, warn};
use walkdir::WalkDir;

use super::ObjectStore;
use super::types::{UploadResult, UploadSummary};
use crate::config::{HTML_REPORT_NAME, ReportPaths};
use crate::media::relative_key;

/// Regular files under `root`, sorted. Missing or unreadable roots yield
/// nothing.
pub fn collect_files(root: &Path) -> Vec<PathBuf> {
    if !root.is_dir() {
        return Vec::new();
    }

    WalkDir::new(root)
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| match entry {
            Ok(entry) => Some(entry),
            Err(e) => {
                warn!(error = %e, "skipping unreadable entry");
                None
            }
        })
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .collect()
}

/// Upload one file under `key`
pub async fn upload_file<S>(store: &S, local: &Path, key: &str) -> UploadResult
where
    S: ObjectStore + ?Sized,
{
    let status = store.upload(local, key).await;
    if let Err(e) = &status {
        warn!(file = %key, error = %e, "upload failed");
    }
    UploadResult {
        file_name: key.to_string(),
        status,
    }
}

/// Upload every file under `root` to `{prefix}/{path relative to root's parent}`.
///
/// For `root = .../cypress/screenshots` a file `screenshots/a/b.png` lands at
/// `{prefix}/screenshots/a/b.png`.
pub async fn upload_directory<S>(store: &S, root: &Path, prefix: &str) -> Vec<UploadResult>
where
    S: ObjectStore + ?Sized,
{
    debug!("starting upload directoryPath : {} ; dirName : {}", root.display(), prefix);

    let files = collect_files(root);
    let base = root.parent().unwrap_or(root);

    debug!(
        "uploading files : {} ; dirName : {}",
        files.iter().map(|f| f.display().to_string()).collect::<Vec<_>>().join(", "),
        prefix
    );

    let uploads = files.iter().filter_map(|path| {
        let relative = relative_key(base, path)?;
        let key = format!("{}/{}", prefix.trim_end_matches('/'), relative);
        Some(async move { upload_file(store, path, &key).await })
    });
    let results = join_all(uploads).await;

    let summary = UploadSummary::from_results(&results);
    debug!(
        "{} files uploaded to {} successfully.",
        summary.succeeded,
        store.bucket()
    );

    results
}

/// Upload the HTML report, then the screenshots and videos directories.
pub async fn upload_artifacts<S>(store: &S, paths: &ReportPaths, dir_name: &str) -> Vec<UploadResult>
where
    S: ObjectStore + ?Sized,
{
    info!("uploading artifacts to {}/{}", store.bucket(), dir_name);

    let report_key = format!("{dir_name}/{HTML_REPORT_NAME}");
    let mut results = vec![upload_file(store, &paths.html_report, &report_key).await];
    results.extend(upload_directory(store, &paths.screenshots, dir_name).await);
    results.extend(upload_directory(store, &paths.videos, dir_name).await);

    let summary = UploadSummary::from_results(&results);
    if summary.failed > 0 {
        warn!(
            "{} of {} uploads to {} failed",
            summary.failed,
            summary.attempted,
            store.bucket()
        );
    } else {
        info!("{} files uploaded to {}", summary.succeeded, store.bucket());
    }

    results
}
