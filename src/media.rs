//! Screenshot and video discovery, and the public URLs they end up at.

use std::path::{Path, PathBuf};

use percent_encoding::percent_decode_str;
use tracing::warn;
use url::Url;
use walkdir::WalkDir;

/// Media category, by file extension
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MediaKind {
    /// `.png`
    Screenshot,
    /// `.mp4`
    Video,
    Other,
}

impl MediaKind {
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .map(|ext| ext.to_string_lossy().to_ascii_lowercase())
            .as_deref()
        {
            Some("png") => Self::Screenshot,
            Some("mp4") => Self::Video,
            _ => Self::Other,
        }
    }

    /// Same classification, for a URL or key
    pub fn from_name(name: &str) -> Self {
        Self::from_path(Path::new(name))
    }
}

/// A screenshot or video found on disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    pub path: PathBuf,
    /// Path relative to the Cypress folder, `/`-separated
    /// (e.g. `screenshots/login.cy.js/fails.png`)
    pub relative: String,
    pub kind: MediaKind,
}

/// Screenshots and videos under `{cypress_root}/screenshots` and
/// `{cypress_root}/videos`, screenshots first, each group sorted by path.
/// Missing directories contribute nothing.
pub fn discover_media(cypress_root: &Path) -> Vec<MediaFile> {
    let mut media = Vec::new();

    for category in ["screenshots", "videos"] {
        let dir = cypress_root.join(category);
        if !dir.is_dir() {
            continue;
        }

        let mut found: Vec<MediaFile> = WalkDir::new(&dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!(error = %e, "skipping unreadable media entry");
                    None
                }
            })
            .filter(|entry| entry.file_type().is_file())
            .filter_map(|entry| {
                let kind = MediaKind::from_path(entry.path());
                if kind == MediaKind::Other {
                    return None;
                }
                let relative = relative_key(cypress_root, entry.path())?;
                Some(MediaFile {
                    path: entry.into_path(),
                    relative,
                    kind,
                })
            })
            .collect();

        media.append(&mut found);
    }

    media
}

/// `path` relative to `base`, joined with `/`
pub fn relative_key(base: &Path, path: &Path) -> Option<String> {
    let relative = path.strip_prefix(base).ok()?;
    let parts: Vec<String> = relative
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect();
    if parts.is_empty() {
        return None;
    }
    Some(parts.join("/"))
}

/// Public, percent-encoded URL of an object.
///
/// `https://{host}/{bucket}/{dir_name}/{relative}` where every segment of
/// `dir_name` and `relative` is encoded on its own, so spaces, `#` and `?`
/// in Cypress screenshot names stay part of the path.
pub fn object_url(host: &str, bucket: &str, dir_name: &str, relative: &str) -> Option<String> {
    let base = if host.contains("://") {
        host.to_string()
    } else {
        format!("https://{host}")
    };
    let mut url = Url::parse(&base).ok()?;
    {
        let mut segments = url.path_segments_mut().ok()?;
        segments.pop_if_empty();
        segments.push(bucket);
        for part in dir_name.split('/').chain(relative.split('/')) {
            if !part.is_empty() {
                segments.push(part);
            }
        }
    }
    Some(url.to_string())
}

/// Last path segment of a URL, percent-decoded.
///
/// Bare keys and file names are accepted too.
pub fn file_name_of(url: &str) -> String {
    let segment = match Url::parse(url) {
        Ok(parsed) => parsed
            .path_segments()
            .and_then(|mut segments| segments.next_back())
            .unwrap_or_default()
            .to_string(),
        Err(_) => Path::new(url)
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default(),
    };
    percent_decode_str(&segment).decode_utf8_lossy().into_owned()
}
