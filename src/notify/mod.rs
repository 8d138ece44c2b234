//! Failure notification: message building, Slack delivery and the CI back-link.

pub mod blocks;
pub mod github;
pub mod slack;
pub mod types;

use std::path::PathBuf;

use tracing::{debug, warn};

pub use blocks::{INTRO_TEXT, MessageContext, build_blocks, failure_block, find_screenshot, limit_violations, media_block};
pub use github::{GithubClient, check_run_url, resolve_back_link};
pub use slack::SlackClient;
pub use types::{Accessory, Block, TextObject};

use crate::config::{Config, GithubSettings, HTML_REPORT_NAME};
use crate::media::{discover_media, object_url};
use crate::report::AggregateReport;

/// Plain-text fallback shown in notifications
pub const FALLBACK_TEXT: &str = "Cypress tests failed";

/// Result type for notification operations
pub type NotifyResult<T> = Result<T, NotifyError>;

/// Error types for notification operations
#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    /// Slack refused the message; `payload` is the raw response body
    #[error("Failed to send slack report: {payload}")]
    Delivery { payload: String },

    /// A GitHub lookup answered with an error status
    #[error("GitHub lookup failed with {status}: {body}")]
    Lookup { status: u16, body: String },

    #[error("workflow run {run_id} has no check suite")]
    MissingCheckSuite { run_id: u64 },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),
}

/// Builds and sends the failure message for one run
#[derive(Debug, Clone)]
pub struct Notifier {
    slack: SlackClient,
    channel: String,
    mention: Option<String>,
    github: GithubSettings,
    public_host: String,
    bucket: String,
    cypress_root: PathBuf,
}

impl Notifier {
    pub fn new(config: &Config) -> NotifyResult<Self> {
        Ok(Self {
            slack: SlackClient::new(&config.slack)?,
            channel: config.slack.channel.clone(),
            mention: config.slack.mention.clone(),
            github: config.github.clone(),
            public_host: config.storage.public_host.clone(),
            bucket: config.storage.bucket.clone(),
            cypress_root: config.paths().cypress_root,
        })
    }

    /// Public URL of the HTML report stored under `dir_name`
    pub fn report_url(&self, dir_name: &str) -> String {
        object_url(&self.public_host, &self.bucket, dir_name, HTML_REPORT_NAME).unwrap_or_else(|| {
            format!("https://{}/{}/{}/{}", self.public_host, self.bucket, dir_name, HTML_REPORT_NAME)
        })
    }

    /// Public URLs of every screenshot and video on disk
    pub fn media_urls(&self, dir_name: &str) -> Vec<String> {
        discover_media(&self.cypress_root)
            .iter()
            .filter_map(|media| object_url(&self.public_host, &self.bucket, dir_name, &media.relative))
            .collect()
    }

    /// Post the failure message for `report`.
    ///
    /// Only a failed post is an error; a missing back-link just leaves the
    /// link out.
    pub async fn notify(&self, report: &AggregateReport, dir_name: &str) -> NotifyResult<()> {
        debug!("sending Slack notification");

        let media_urls = self.media_urls(dir_name);
        debug!("generated media urls : {}", media_urls.join(", "));

        let report_url = self.report_url(dir_name);
        let back_link = resolve_back_link(&self.github).await;

        let blocks = build_blocks(
            report,
            &media_urls,
            &MessageContext {
                report_url: &report_url,
                mention: self.mention.as_deref(),
                back_link: back_link.as_deref(),
            },
        );
        debug!(
            "generated slack blocks : {}",
            serde_json::to_string(&blocks).unwrap_or_default()
        );

        for violation in limit_violations(&blocks) {
            warn!("Slack may reject the message: {}", violation);
        }
        self.slack.post_message(&self.channel, FALLBACK_TEXT, &blocks).await
    }
}
