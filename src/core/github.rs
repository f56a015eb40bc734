//! GitHub REST and OAuth client
//!
//! Handles the OAuth device flow, minting Copilot tokens from a GitHub token,
//! and the account endpoints used by the CLI (user, usage).

use crate::core::constants::{editor, github};
use crate::core::headers::github_headers;
use crate::models::copilot::{
    AccessTokenResponse, CopilotToken, CopilotUsage, DeviceCodeResponse, GitHubUser,
};
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::debug;

/// Seconds added to the poll interval on `slow_down`
const SLOW_DOWN_STEP: u64 = 5;

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("{context}: HTTP {status}: {body}")]
    Http {
        context: &'static str,
        status: u16,
        body: String,
    },

    #[error("Device code expired before authorization completed")]
    DeviceFlowExpired,

    #[error("User denied authorization")]
    AccessDenied,

    #[error("OAuth error: {0}")]
    OAuth(String),

    #[error("Failed to parse response: {0}")]
    Parse(String),
}

/// What to do after one poll of the token endpoint
#[derive(Debug, PartialEq, Eq)]
enum PollOutcome {
    Token(String),
    Pending,
    SlowDown,
}

fn interpret_poll(response: AccessTokenResponse) -> Result<PollOutcome, AuthError> {
    match response {
        AccessTokenResponse::Success(token) => Ok(PollOutcome::Token(token.access_token)),
        AccessTokenResponse::Pending(error) => match error.error.as_str() {
            "authorization_pending" => Ok(PollOutcome::Pending),
            "slow_down" => Ok(PollOutcome::SlowDown),
            "expired_token" => Err(AuthError::DeviceFlowExpired),
            "access_denied" => Err(AuthError::AccessDenied),
            other => Err(AuthError::OAuth(format!(
                "{} {}",
                other,
                error.error_description.unwrap_or_default()
            ))),
        },
    }
}

pub struct GitHubClient {
    client: Client,
    api_base_url: String,
    base_url: String,
}

impl GitHubClient {
    pub fn new(timeout: u64) -> Result<Self, AuthError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout))
            .build()
            .map_err(|e| AuthError::Network(e.to_string()))?;

        Ok(Self {
            client,
            api_base_url: github::API_BASE_URL.to_string(),
            base_url: github::BASE_URL.to_string(),
        })
    }

    /// Initiate the device authorization flow
    pub async fn get_device_code(&self) -> Result<DeviceCodeResponse, AuthError> {
        let response = self
            .client
            .post(format!("{}/login/device/code", self.base_url))
            .header("accept", "application/json")
            .form(&[("client_id", github::CLIENT_ID), ("scope", github::APP_SCOPES)])
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        read_json(response, "Failed to get device code").await
    }

    /// Poll until the user authorizes the device or the code expires
    pub async fn poll_access_token(
        &self,
        device: &DeviceCodeResponse,
    ) -> Result<String, AuthError> {
        let mut interval = Duration::from_secs(device.interval);
        let deadline = Duration::from_secs(device.expires_in);
        let started = Instant::now();

        loop {
            if started.elapsed() >= deadline {
                return Err(AuthError::DeviceFlowExpired);
            }

            tokio::time::sleep(interval).await;

            let response = self
                .client
                .post(format!("{}/login/oauth/access_token", self.base_url))
                .header("accept", "application/json")
                .form(&[
                    ("client_id", github::CLIENT_ID),
                    ("device_code", device.device_code.as_str()),
                    ("grant_type", github::DEVICE_GRANT_TYPE),
                ])
                .send()
                .await
                .map_err(|e| AuthError::Network(e.to_string()))?;

            let body: AccessTokenResponse =
                read_json(response, "Failed to poll access token").await?;

            match interpret_poll(body)? {
                PollOutcome::Token(token) => return Ok(token),
                PollOutcome::Pending => debug!("Authorization pending"),
                PollOutcome::SlowDown => {
                    interval += Duration::from_secs(SLOW_DOWN_STEP);
                    debug!("Slowing down device polling to {:?}", interval);
                }
            }
        }
    }

    /// Mint a Copilot token for the given GitHub token
    pub async fn get_copilot_token(
        &self,
        github_token: &str,
        vscode_version: &str,
    ) -> Result<CopilotToken, AuthError> {
        self.get_authenticated(
            "/copilot_internal/v2/token",
            github_token,
            vscode_version,
            "Failed to get Copilot token",
        )
        .await
    }

    pub async fn get_user(&self, github_token: &str) -> Result<GitHubUser, AuthError> {
        // The user endpoint rejects the newer API version header
        let response = self
            .client
            .get(format!("{}/user", self.api_base_url))
            .header("accept", "application/json")
            .header("authorization", format!("token {}", github_token))
            .header("user-agent", editor::USER_AGENT)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        read_json(response, "Failed to get GitHub user").await
    }

    pub async fn get_copilot_usage(
        &self,
        github_token: &str,
        vscode_version: &str,
    ) -> Result<CopilotUsage, AuthError> {
        self.get_authenticated(
            "/copilot_internal/user",
            github_token,
            vscode_version,
            "Failed to get Copilot usage",
        )
        .await
    }

    /// Latest VS Code release, falling back to a known version on any failure
    pub async fn get_vscode_version(&self) -> String {
        #[derive(Deserialize)]
        struct Release {
            tag_name: String,
        }

        let result = async {
            let response = self
                .client
                .get(github::VSCODE_RELEASE_URL)
                .header("accept", "application/vnd.github.v3+json")
                .header("user-agent", editor::USER_AGENT)
                .send()
                .await
                .map_err(|e| AuthError::Network(e.to_string()))?;
            read_json::<Release>(response, "Failed to get VS Code release").await
        }
        .await;

        match result {
            Ok(release) => release.tag_name.trim_start_matches('v').to_string(),
            Err(e) => {
                debug!("Falling back to default VS Code version: {}", e);
                editor::FALLBACK_VSCODE_VERSION.to_string()
            }
        }
    }

    async fn get_authenticated<T: DeserializeOwned>(
        &self,
        path: &str,
        github_token: &str,
        vscode_version: &str,
        context: &'static str,
    ) -> Result<T, AuthError> {
        let headers = github_headers(github_token, vscode_version)
            .map_err(|e| AuthError::OAuth(e.to_string()))?;

        let response = self
            .client
            .get(format!("{}{}", self.api_base_url, path))
            .headers(headers)
            .send()
            .await
            .map_err(|e| AuthError::Network(e.to_string()))?;

        read_json(response, context).await
    }
}

async fn read_json<T: DeserializeOwned>(
    response: reqwest::Response,
    context: &'static str,
) -> Result<T, AuthError> {
    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| AuthError::Network(e.to_string()))?;

    if !status.is_success() {
        return Err(AuthError::Http {
            context,
            status: status.as_u16(),
            body,
        });
    }

    serde_json::from_str(&body).map_err(|e| AuthError::Parse(format!("{}: {}", e, body)))
}
