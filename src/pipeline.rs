//! The failure-report pipeline: merge, render, name, upload, notify.
//!
//! Runs once per invocation after the test step has failed. A run without
//! result fragments is a no-op; every other failure except per-file upload
//! errors and back-link lookups aborts the run.

use serde::Serialize;
use tracing::{debug, info, warn};

use crate::actions::write_outputs;
use crate::config::{Config, ConfigError};
use crate::naming::DirNamer;
use crate::notify::{NotifyError, Notifier};
use crate::report::{AggregateReport, RenderError, ReportError, merge_fragments, render_html, write_json};
use crate::storage::{GcsClient, ObjectStore, StorageError, UploadSummary, upload_artifacts};

/// Result type for pipeline runs
pub type PipelineResult<T> = Result<T, PipelineError>;

/// Fatal pipeline errors
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Report(#[from] ReportError),

    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Notify(#[from] NotifyError),
}

/// What a pipeline run did
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum PipelineOutcome {
    /// No result fragments were found
    Skipped,
    /// Artifacts were uploaded and the notification was posted
    Reported(ReportSummary),
}

/// Summary of a reported run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReportSummary {
    pub dir_name: String,
    pub report_url: String,
    pub failed_tests: usize,
    pub uploads: UploadSummary,
}

/// One configured pipeline
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Merge the fragments and render the HTML report.
    ///
    /// Returns `None` when there are no fragments.
    pub fn prepare(&self) -> PipelineResult<Option<AggregateReport>> {
        let paths = self.config.paths();

        let report = match merge_fragments(&paths.fragments_glob) {
            Ok(report) => report,
            Err(ReportError::NoReports { pattern }) => {
                info!("no mochawesome reports matching {}, nothing to report", pattern);
                return Ok(None);
            }
            Err(e) => return Err(e.into()),
        };

        info!(
            "merged {} tests, {} failed",
            report.test_count(),
            report.failed_tests().len()
        );

        debug!("generating mochawesome HTML");
        render_html(&report, &paths.html_report)?;
        write_json(&report, &paths.json_report)?;

        Ok(Some(report))
    }

    /// Full run against Cloud Storage
    pub async fn run(&self) -> PipelineResult<PipelineOutcome> {
        debug!("starting failure report");
        self.config.validate_for_report()?;

        let Some(report) = self.prepare()? else {
            return Ok(PipelineOutcome::Skipped);
        };

        let paths = self.config.paths();
        let store = GcsClient::connect(&self.config.storage, &paths.credentials_file).await?;
        self.deliver(&report, &store).await
    }

    /// Full run against a caller-provided store
    pub async fn run_with_store<S>(&self, store: &S) -> PipelineResult<PipelineOutcome>
    where
        S: ObjectStore + ?Sized,
    {
        let Some(report) = self.prepare()? else {
            return Ok(PipelineOutcome::Skipped);
        };
        self.deliver(&report, store).await
    }

    async fn deliver<S>(&self, report: &AggregateReport, store: &S) -> PipelineResult<PipelineOutcome>
    where
        S: ObjectStore + ?Sized,
    {
        let notifier = Notifier::new(&self.config)?;

        let dir_name = DirNamer::new(self.config.naming.strategy)
            .job_name(self.config.naming.job_name.as_deref())
            .generate();
        info!("uploading to dir : {}", dir_name);

        let results = upload_artifacts(store, &self.config.paths(), &dir_name).await;
        let uploads = UploadSummary::from_results(&results);

        notifier.notify(report, &dir_name).await?;

        let summary = ReportSummary {
            report_url: notifier.report_url(&dir_name),
            failed_tests: report.failed_tests().len(),
            dir_name,
            uploads,
        };
        self.publish_outputs(&summary);

        Ok(PipelineOutcome::Reported(summary))
    }

    fn publish_outputs(&self, summary: &ReportSummary) {
        let Some(path) = &self.config.github.output_file else {
            return;
        };
        let outputs = [
            ("dir-name", summary.dir_name.as_str()),
            ("report-url", summary.report_url.as_str()),
        ];
        if let Err(e) = write_outputs(path, &outputs) {
            warn!(error = %e, "failed to write step outputs to {}", path.display());
        }
    }
}
