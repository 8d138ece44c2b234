//! Result merging and HTML rendering.

pub mod html;
pub mod merge;
pub mod types;

use std::path::PathBuf;

pub use html::{RenderError, RenderResult, render_html, render_to_string};
pub use merge::{find_fragments, merge, merge_fragments, read_fragment, write_json};
pub use types::{AggregateReport, Stats, Suite, Test, TestError, TestState};

/// Result type for merge operations
pub type ReportResult<T> = Result<T, ReportError>;

/// Errors raised while collecting and merging result fragments
#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    /// No fragment matched; the pipeline treats this as "nothing to report"
    #[error("no mochawesome reports found matching {pattern}")]
    NoReports { pattern: String },

    #[error("invalid report glob: {0}")]
    Pattern(#[from] glob::PatternError),

    #[error("failed to access {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse report {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
