//! Back-link resolution through the GitHub REST API.
//!
//! The workflow run gives its check suite; the suite's check runs filtered by
//! job name give the check run the link points at.

use reqwest::header::ACCEPT;
use serde::Deserialize;
use tracing::{debug, info, warn};

use super::{NotifyError, NotifyResult};
use crate::USER_AGENT;
use crate::config::{GithubSettings, Secret};

const GITHUB_JSON: &str = "application/vnd.github+json";

/// REST client for the two lookups behind the back-link
#[derive(Debug, Clone)]
pub struct GithubClient {
    http: reqwest::Client,
    api_url: String,
    token: Option<Secret>,
}

#[derive(Debug, Deserialize)]
struct WorkflowRun {
    #[serde(default)]
    check_suite_id: Option<u64>,
    #[serde(default)]
    check_suite_url: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CheckRunList {
    #[serde(default)]
    check_runs: Vec<CheckRun>,
}

#[derive(Debug, Deserialize)]
struct CheckRun {
    id: u64,
}

impl GithubClient {
    pub fn new(settings: &GithubSettings) -> NotifyResult<Self> {
        Ok(Self {
            http: reqwest::Client::builder().user_agent(USER_AGENT).build()?,
            api_url: settings.api_url.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: &str,
        query: &[(&str, &str)],
    ) -> NotifyResult<T> {
        let mut request = self.http.get(url).header(ACCEPT, GITHUB_JSON).query(query);
        if let Some(token) = &self.token {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Lookup {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }
        Ok(response.json().await?)
    }

    /// Check suite that the workflow run belongs to
    pub async fn check_suite_id(&self, owner: &str, repo: &str, run_id: u64) -> NotifyResult<u64> {
        info!("Getting workflow with ID: {}.", run_id);

        let url = format!("{}/repos/{}/{}/actions/runs/{}", self.api_url, owner, repo, run_id);
        let run: WorkflowRun = self.get_json(&url, &[]).await?;

        if let Some(id) = run.check_suite_id {
            return Ok(id);
        }

        debug!("found check suite url {:?}", run.check_suite_url);
        run.check_suite_url
            .as_deref()
            .and_then(|url| url.trim_end_matches('/').rsplit('/').next())
            .and_then(|id| id.parse().ok())
            .ok_or(NotifyError::MissingCheckSuite { run_id })
    }

    /// Id of the last check run named `job` in the suite
    pub async fn last_check_run_id(
        &self,
        owner: &str,
        repo: &str,
        check_suite_id: u64,
        job: &str,
    ) -> NotifyResult<Option<u64>> {
        info!(
            "Getting check suite runs with ID: {} and check_name: \"{}\".",
            check_suite_id, job
        );

        let url = format!(
            "{}/repos/{}/{}/check-suites/{}/check-runs",
            self.api_url, owner, repo, check_suite_id
        );
        let list: CheckRunList = self.get_json(&url, &[("check_name", job)]).await?;
        Ok(list.check_runs.last().map(|run| run.id))
    }

    /// Both lookups in sequence
    pub async fn resolve_check_run(
        &self,
        owner: &str,
        repo: &str,
        run_id: u64,
        job: &str,
    ) -> NotifyResult<Option<u64>> {
        let suite = self.check_suite_id(owner, repo, run_id).await?;
        self.last_check_run_id(owner, repo, suite, job).await
    }
}

/// Web URL of a check run
pub fn check_run_url(server_url: &str, owner: &str, repo: &str, check_run_id: u64) -> String {
    format!(
        "{}/{}/{}/runs/{}?check_suite_focus=true",
        server_url.trim_end_matches('/'),
        owner,
        repo,
        check_run_id
    )
}

/// Best-effort back-link to the CI run.
///
/// Missing repository/run/job information or any lookup failure yields `None`.
pub async fn resolve_back_link(settings: &GithubSettings) -> Option<String> {
    let Some((owner, repo)) = settings.owner_repo() else {
        debug!("no repository configured, skipping run link");
        return None;
    };
    let (Some(run_id), Some(job)) = (settings.run_id, settings.job.as_deref()) else {
        debug!("no run id or job configured, skipping run link");
        return None;
    };

    let client = match GithubClient::new(settings) {
        Ok(client) => client,
        Err(e) => {
            warn!(error = %e, "could not build GitHub client, skipping run link");
            return None;
        }
    };

    match client.resolve_check_run(owner, repo, run_id, job).await {
        Ok(Some(id)) => Some(check_run_url(&settings.server_url, owner, repo, id)),
        Ok(None) => {
            warn!("no check run named \"{}\" found, skipping run link", job);
            None
        }
        Err(e) => {
            warn!(error = %e, "failed to resolve run link");
            None
        }
    }
}
