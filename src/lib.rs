//! Cypress Report - failure reporting for Cypress CI runs.
//!
//! This crate provides:
//! - Merging of per-process mochawesome JSON fragments into one report
//! - Standalone HTML rendering of the merged report
//! - Collision-free per-run directory names
//! - Concurrent upload of the report, screenshots and videos to Cloud Storage
//! - A Slack failure message linking every failed test to its screenshot,
//!   with a back-link to the CI run
//!
//! # Example
//!
//! ```rust,no_run
//! use cypress_report::{Config, Pipeline, PipelineOutcome};
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let config = Config::from_env()?;
//! match Pipeline::new(config).run().await? {
//!     PipelineOutcome::Skipped => println!("no reports"),
//!     PipelineOutcome::Reported(summary) => println!("report at {}", summary.report_url),
//! }
//! # Ok(())
//! # }
//! ```

pub mod actions;
pub mod config;
pub mod media;
pub mod naming;
pub mod notify;
pub mod pipeline;
pub mod report;
pub mod storage;

/// `User-Agent` sent with every outbound request
pub(crate) const USER_AGENT: &str = concat!("cypress-report/", env!("CARGO_PKG_VERSION"));

// Re-export configuration
pub use config::{Config, ConfigError, ReportPaths, Secret};

// Re-export report types
pub use report::{AggregateReport, RenderError, ReportError, Suite, Test, TestState};

// Re-export naming
pub use naming::{DirNameStrategy, DirNamer, random_id, slugify};

// Re-export storage
pub use storage::{GcsClient, ObjectStore, StorageError, UploadResult, UploadSummary, UploadedObject};

// Re-export notification
pub use notify::{Block, Notifier, NotifyError};

// Re-export the pipeline
pub use pipeline::{Pipeline, PipelineError, PipelineOutcome, ReportSummary};
