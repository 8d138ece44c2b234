//! Configuration management with environment variable support.
//!
//! All external configuration is read once at start-up into a [`Config`] and
//! handed to each component at construction. Nothing below this module reads
//! the environment on its own.
//!
//! # Environment Variables
//!
//! | Variable | Fallback | Description | Default |
//! |----------|----------|-------------|---------|
//! | `CYPRESS_REPORT_BUCKET` | `INPUT_BUCKET-NAME` | Storage bucket name | *(required)* |
//! | `CYPRESS_REPORT_GCLOUD_AUTH` | `INPUT_GCLOUD-AUTH` | Base64 service-account key | *(required)* |
//! | `CYPRESS_REPORT_SLACK_TOKEN` | `INPUT_SLACK-TOKEN` | Slack bot token | *(required)* |
//! | `CYPRESS_REPORT_SLACK_CHANNEL` | `INPUT_SLACK-CHANNEL` | Slack channel / DM id | *(required)* |
//! | `CYPRESS_REPORT_SLACK_MENTION` | `INPUT_SLACK-MENTION` | Mention added to the closing line | none |
//! | `CYPRESS_REPORT_GITHUB_TOKEN` | `INPUT_GITHUB-TOKEN`, `GITHUB_TOKEN` | Token for the back-link lookup | none |
//! | `CYPRESS_REPORT_CYPRESS_DIR` | | Cypress folder inside the work dir | `cypress` |
//! | `CYPRESS_REPORT_DIR_STRATEGY` | | `timestamp` or `job` | `timestamp` |
//! | `CYPRESS_REPORT_STORAGE_API` | | Storage upload API base | `https://storage.googleapis.com` |
//! | `CYPRESS_REPORT_STORAGE_HOST` | | Public storage host used in links | `storage.googleapis.com` |
//! | `CYPRESS_REPORT_TOKEN_URI` | | Overrides the key file's `token_uri` | none |
//! | `CYPRESS_REPORT_SLACK_API` | | Slack Web API base | `https://slack.com/api` |
//! | `GITHUB_WORKSPACE` | | Work dir | `.` |
//! | `GITHUB_REPOSITORY` | | `owner/repo` | none |
//! | `GITHUB_RUN_ID` | | Workflow run id | none |
//! | `GITHUB_JOB` | | Job id (check-run name, job-scoped dir names) | none |
//! | `GITHUB_API_URL` | | REST API base | `https://api.github.com` |
//! | `GITHUB_SERVER_URL` | | Web base for the back-link | `https://github.com` |
//! | `GITHUB_OUTPUT` | | Step output file (`dir-name`, `report-url`) | none |

use std::env;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::warn;

use crate::naming::DirNameStrategy;

// ============================================================================
// Default Values
// ============================================================================

/// Default Cypress folder name inside the work dir
pub const DEFAULT_CYPRESS_DIR: &str = "cypress";

/// Default storage upload API base
pub const DEFAULT_STORAGE_API: &str = "https://storage.googleapis.com";

/// Default public storage host
pub const DEFAULT_STORAGE_HOST: &str = "storage.googleapis.com";

/// Default Slack Web API base
pub const DEFAULT_SLACK_API: &str = "https://slack.com/api";

/// Default GitHub REST API base
pub const DEFAULT_GITHUB_API: &str = "https://api.github.com";

/// Default GitHub web base
pub const DEFAULT_GITHUB_SERVER: &str = "https://github.com";

/// File name the credentials blob is materialized to, inside the work dir
pub const CREDENTIALS_FILE_NAME: &str = "google-auth.json";

/// File name of the rendered HTML report (local and remote)
pub const HTML_REPORT_NAME: &str = "mochawesome.html";

/// File name of the merged JSON report
pub const JSON_REPORT_NAME: &str = "mochawesome.json";

// ============================================================================
// Environment Variable Names
// ============================================================================

pub const ENV_BUCKET: &str = "CYPRESS_REPORT_BUCKET";
pub const ENV_GCLOUD_AUTH: &str = "CYPRESS_REPORT_GCLOUD_AUTH";
pub const ENV_SLACK_TOKEN: &str = "CYPRESS_REPORT_SLACK_TOKEN";
pub const ENV_SLACK_CHANNEL: &str = "CYPRESS_REPORT_SLACK_CHANNEL";
pub const ENV_SLACK_MENTION: &str = "CYPRESS_REPORT_SLACK_MENTION";
pub const ENV_GITHUB_TOKEN: &str = "CYPRESS_REPORT_GITHUB_TOKEN";
pub const ENV_CYPRESS_DIR: &str = "CYPRESS_REPORT_CYPRESS_DIR";
pub const ENV_DIR_STRATEGY: &str = "CYPRESS_REPORT_DIR_STRATEGY";
pub const ENV_STORAGE_API: &str = "CYPRESS_REPORT_STORAGE_API";
pub const ENV_STORAGE_HOST: &str = "CYPRESS_REPORT_STORAGE_HOST";
pub const ENV_TOKEN_URI: &str = "CYPRESS_REPORT_TOKEN_URI";
pub const ENV_SLACK_API: &str = "CYPRESS_REPORT_SLACK_API";

pub const ENV_WORKSPACE: &str = "GITHUB_WORKSPACE";
pub const ENV_REPOSITORY: &str = "GITHUB_REPOSITORY";
pub const ENV_RUN_ID: &str = "GITHUB_RUN_ID";
pub const ENV_JOB: &str = "GITHUB_JOB";
pub const ENV_API_URL: &str = "GITHUB_API_URL";
pub const ENV_SERVER_URL: &str = "GITHUB_SERVER_URL";
pub const ENV_DEFAULT_GITHUB_TOKEN: &str = "GITHUB_TOKEN";
pub const ENV_OUTPUT: &str = "GITHUB_OUTPUT";

// ============================================================================
// Action Input Fallbacks (inputs are exported as INPUT_<NAME> by the runner)
// ============================================================================

pub const INPUT_BUCKET: &str = "INPUT_BUCKET-NAME";
pub const INPUT_GCLOUD_AUTH: &str = "INPUT_GCLOUD-AUTH";
pub const INPUT_SLACK_TOKEN: &str = "INPUT_SLACK-TOKEN";
pub const INPUT_SLACK_CHANNEL: &str = "INPUT_SLACK-CHANNEL";
pub const INPUT_SLACK_MENTION: &str = "INPUT_SLACK-MENTION";
pub const INPUT_GITHUB_TOKEN: &str = "INPUT_GITHUB-TOKEN";

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required value has no environment variable set
    #[error("{0} missing")]
    Missing(&'static str),

    /// A value is present but cannot be parsed
    #[error("invalid value for {name}: {message}")]
    Invalid { name: &'static str, message: String },
}

pub type ConfigResult<T> = Result<T, ConfigError>;

/// A string that never shows up in `Debug` output.
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Secret(String);

impl Secret {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.is_empty() {
            f.write_str("Secret(<empty>)")
        } else {
            f.write_str("Secret(***)")
        }
    }
}

/// Centralized configuration for one pipeline invocation
#[derive(Debug, Clone)]
pub struct Config {
    pub workspace: WorkspaceSettings,
    pub storage: StorageSettings,
    pub slack: SlackSettings,
    pub github: GithubSettings,
    pub naming: NamingSettings,
}

/// Local filesystem layout
#[derive(Debug, Clone)]
pub struct WorkspaceSettings {
    /// Root all local paths are resolved against
    pub work_dir: PathBuf,
    /// Cypress folder name inside `work_dir`
    pub cypress_dir: String,
}

/// Object storage settings
#[derive(Debug, Clone)]
pub struct StorageSettings {
    pub bucket: String,
    /// Base64 encoded service-account key
    pub credentials: Secret,
    /// Upload API base URL
    pub api_base: String,
    /// Host used when building public object links
    pub public_host: String,
    /// Overrides the `token_uri` found in the key file
    pub token_uri: Option<String>,
}

/// Chat notification settings
#[derive(Debug, Clone)]
pub struct SlackSettings {
    pub token: Secret,
    /// Channel, DM, MPDM or group id
    pub channel: String,
    pub mention: Option<String>,
    pub api_base: String,
}

/// Source-control settings used for the back-link
#[derive(Debug, Clone)]
pub struct GithubSettings {
    pub token: Option<Secret>,
    pub api_url: String,
    pub server_url: String,
    /// `owner/repo`
    pub repository: Option<String>,
    pub run_id: Option<u64>,
    pub job: Option<String>,
    /// File step outputs are appended to
    pub output_file: Option<PathBuf>,
}

/// Directory naming settings
#[derive(Debug, Clone)]
pub struct NamingSettings {
    pub strategy: DirNameStrategy,
    /// Job name for [`DirNameStrategy::JobScoped`]
    pub job_name: Option<String>,
}

impl Config {
    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> ConfigResult<Self> {
        let github = GithubSettings::from_env();
        Ok(Self {
            workspace: WorkspaceSettings::from_env(),
            storage: StorageSettings::from_env(),
            slack: SlackSettings::from_env(),
            naming: NamingSettings::from_env(github.job.clone())?,
            github,
        })
    }

    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            workspace: WorkspaceSettings::defaults(),
            storage: StorageSettings::defaults(),
            slack: SlackSettings::defaults(),
            github: GithubSettings::defaults(),
            naming: NamingSettings::defaults(),
        }
    }

    /// Set the work dir
    pub fn with_work_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.workspace.work_dir = dir.into();
        self
    }

    /// Set the Cypress folder name
    pub fn with_cypress_dir(mut self, name: impl Into<String>) -> Self {
        self.workspace.cypress_dir = name.into();
        self
    }

    /// Set the bucket and encoded credentials
    pub fn with_storage(mut self, bucket: impl Into<String>, credentials: impl Into<String>) -> Self {
        self.storage.bucket = bucket.into();
        self.storage.credentials = Secret::new(credentials);
        self
    }

    /// Set the Slack token and channel
    pub fn with_slack(mut self, token: impl Into<String>, channel: impl Into<String>) -> Self {
        self.slack.token = Secret::new(token);
        self.slack.channel = channel.into();
        self
    }

    /// Set the directory naming strategy
    pub fn with_strategy(mut self, strategy: DirNameStrategy) -> Self {
        self.naming.strategy = strategy;
        self
    }

    /// Check that everything the failure report needs is present
    pub fn validate_for_report(&self) -> ConfigResult<()> {
        if self.storage.bucket.is_empty() {
            return Err(ConfigError::Missing(ENV_BUCKET));
        }
        if self.storage.credentials.is_empty() {
            return Err(ConfigError::Missing(ENV_GCLOUD_AUTH));
        }
        if self.slack.token.is_empty() {
            return Err(ConfigError::Missing(ENV_SLACK_TOKEN));
        }
        if self.slack.channel.is_empty() {
            return Err(ConfigError::Missing(ENV_SLACK_CHANNEL));
        }
        Ok(())
    }

    /// Resolved local paths
    pub fn paths(&self) -> ReportPaths {
        ReportPaths::new(&self.workspace.work_dir, &self.workspace.cypress_dir)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::defaults()
    }
}

impl WorkspaceSettings {
    pub fn from_env() -> Self {
        Self {
            work_dir: non_empty_var(&[ENV_WORKSPACE])
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(".")),
            cypress_dir: non_empty_var(&[ENV_CYPRESS_DIR])
                .unwrap_or_else(|| DEFAULT_CYPRESS_DIR.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            work_dir: PathBuf::from("."),
            cypress_dir: DEFAULT_CYPRESS_DIR.to_string(),
        }
    }
}

impl StorageSettings {
    pub fn from_env() -> Self {
        Self {
            bucket: non_empty_var(&[ENV_BUCKET, INPUT_BUCKET]).unwrap_or_default(),
            credentials: Secret::new(
                non_empty_var(&[ENV_GCLOUD_AUTH, INPUT_GCLOUD_AUTH]).unwrap_or_default(),
            ),
            api_base: non_empty_var(&[ENV_STORAGE_API])
                .unwrap_or_else(|| DEFAULT_STORAGE_API.to_string()),
            public_host: non_empty_var(&[ENV_STORAGE_HOST])
                .unwrap_or_else(|| DEFAULT_STORAGE_HOST.to_string()),
            token_uri: non_empty_var(&[ENV_TOKEN_URI]),
        }
    }

    pub fn defaults() -> Self {
        Self {
            bucket: String::new(),
            credentials: Secret::default(),
            api_base: DEFAULT_STORAGE_API.to_string(),
            public_host: DEFAULT_STORAGE_HOST.to_string(),
            token_uri: None,
        }
    }
}

impl SlackSettings {
    pub fn from_env() -> Self {
        Self {
            token: Secret::new(
                non_empty_var(&[ENV_SLACK_TOKEN, INPUT_SLACK_TOKEN]).unwrap_or_default(),
            ),
            channel: non_empty_var(&[ENV_SLACK_CHANNEL, INPUT_SLACK_CHANNEL]).unwrap_or_default(),
            mention: non_empty_var(&[ENV_SLACK_MENTION, INPUT_SLACK_MENTION]),
            api_base: non_empty_var(&[ENV_SLACK_API])
                .unwrap_or_else(|| DEFAULT_SLACK_API.to_string()),
        }
    }

    pub fn defaults() -> Self {
        Self {
            token: Secret::default(),
            channel: String::new(),
            mention: None,
            api_base: DEFAULT_SLACK_API.to_string(),
        }
    }
}

impl GithubSettings {
    /// Read the source-control settings. An unparsable run id is dropped
    /// with a warning and leaves the run without a back-link.
    pub fn from_env() -> Self {
        let run_id = non_empty_var(&[ENV_RUN_ID]).and_then(|raw| match raw.parse::<u64>() {
            Ok(id) => Some(id),
            Err(e) => {
                warn!("ignoring {}={:?}: {}, run link disabled", ENV_RUN_ID, raw, e);
                None
            }
        });

        Self {
            token: non_empty_var(&[ENV_GITHUB_TOKEN, INPUT_GITHUB_TOKEN, ENV_DEFAULT_GITHUB_TOKEN])
                .map(Secret::new),
            api_url: non_empty_var(&[ENV_API_URL]).unwrap_or_else(|| DEFAULT_GITHUB_API.to_string()),
            server_url: non_empty_var(&[ENV_SERVER_URL])
                .unwrap_or_else(|| DEFAULT_GITHUB_SERVER.to_string()),
            repository: non_empty_var(&[ENV_REPOSITORY]),
            run_id,
            job: non_empty_var(&[ENV_JOB]),
            output_file: non_empty_var(&[ENV_OUTPUT]).map(PathBuf::from),
        }
    }

    pub fn defaults() -> Self {
        Self {
            token: None,
            api_url: DEFAULT_GITHUB_API.to_string(),
            server_url: DEFAULT_GITHUB_SERVER.to_string(),
            repository: None,
            run_id: None,
            job: None,
            output_file: None,
        }
    }

    /// Split `owner/repo`
    pub fn owner_repo(&self) -> Option<(&str, &str)> {
        let (owner, repo) = self.repository.as_deref()?.split_once('/')?;
        if owner.is_empty() || repo.is_empty() {
            return None;
        }
        Some((owner, repo))
    }
}

impl NamingSettings {
    pub fn from_env(job_name: Option<String>) -> ConfigResult<Self> {
        let strategy = match non_empty_var(&[ENV_DIR_STRATEGY]) {
            Some(raw) => raw.parse().map_err(|message| ConfigError::Invalid {
                name: ENV_DIR_STRATEGY,
                message,
            })?,
            None => DirNameStrategy::default(),
        };
        Ok(Self { strategy, job_name })
    }

    pub fn defaults() -> Self {
        Self {
            strategy: DirNameStrategy::default(),
            job_name: None,
        }
    }
}

/// Local paths the pipeline reads from and writes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportPaths {
    /// `{work}/{cypress}`
    pub cypress_root: PathBuf,
    /// `{work}/{cypress}/reports/mochawesome/*.json`
    pub fragments_glob: String,
    /// `{work}/{cypress}/reports/mochawesome.html`
    pub html_report: PathBuf,
    /// `{work}/{cypress}/reports/mochawesome.json`
    pub json_report: PathBuf,
    /// `{work}/{cypress}/screenshots`
    pub screenshots: PathBuf,
    /// `{work}/{cypress}/videos`
    pub videos: PathBuf,
    /// `{work}/google-auth.json`
    pub credentials_file: PathBuf,
}

impl ReportPaths {
    pub fn new(work_dir: &Path, cypress_dir: &str) -> Self {
        let cypress_root = work_dir.join(cypress_dir);
        let reports = cypress_root.join("reports");
        let fragments_dir = reports.join("mochawesome");

        Self {
            fragments_glob: format!("{}/*.json", glob::Pattern::escape(&fragments_dir.to_string_lossy())),
            html_report: reports.join(HTML_REPORT_NAME),
            json_report: reports.join(JSON_REPORT_NAME),
            screenshots: cypress_root.join("screenshots"),
            videos: cypress_root.join("videos"),
            credentials_file: work_dir.join(CREDENTIALS_FILE_NAME),
            cypress_root,
        }
    }
}

// ============================================================================
// Helper Functions
// ============================================================================

/// First non-empty value among `names`, in order
fn non_empty_var(names: &[&str]) -> Option<String> {
    names
        .iter()
        .filter_map(|name| env::var(name).ok())
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
