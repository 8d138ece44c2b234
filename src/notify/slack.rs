use serde::Deserialize;
use tracing::{debug, warn};

use super::types::{Block, PostMessage};
use super::{NotifyError, NotifyResult};
use crate::USER_AGENT;
use crate::config::{Secret, SlackSettings};

/// Slack Web API client (only `chat.postMessage`)
#[derive(Debug, Clone)]
pub struct SlackClient {
    http: reqwest::Client,
    api_base: String,
    token: Secret,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    ok: bool,
    #[serde(default)]
    warning: Option<String>,
}

impl SlackClient {
    pub fn new(settings: &SlackSettings) -> NotifyResult<Self> {
        Ok(Self {
            http: reqwest::Client::builder().user_agent(USER_AGENT).build()?,
            api_base: settings.api_base.trim_end_matches('/').to_string(),
            token: settings.token.clone(),
        })
    }

    /// Post `blocks` to `channel`.
    ///
    /// Any non-2xx status or `"ok": false` answer is returned as
    /// [`NotifyError::Delivery`] carrying the raw response body.
    pub async fn post_message(&self, channel: &str, text: &str, blocks: &[Block]) -> NotifyResult<()> {
        let url = format!("{}/chat.postMessage", self.api_base);
        let body = PostMessage { channel, text, blocks };

        let response = self
            .http
            .post(&url)
            .bearer_auth(self.token.expose())
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let payload = response.text().await?;
        if !status.is_success() {
            return Err(NotifyError::Delivery { payload });
        }

        match serde_json::from_str::<ApiResponse>(&payload) {
            Ok(answer) if answer.ok => {
                if let Some(warning) = answer.warning {
                    warn!("slack accepted the message with a warning: {}", warning);
                }
                debug!("slack message posted to {}", channel);
                Ok(())
            }
            _ => Err(NotifyError::Delivery { payload }),
        }
    }
}
