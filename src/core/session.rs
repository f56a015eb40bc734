//! Credentials and editor identity shared by the server and the refresh task

use crate::core::constants::editor;
use crate::core::provider::AccountType;
use crate::models::copilot::CopilotToken;
use tokio::sync::RwLock;

pub struct Session {
    account_type: AccountType,
    github_token: RwLock<Option<String>>,
    copilot_token: RwLock<Option<CopilotToken>>,
    vscode_version: RwLock<String>,
}

impl Session {
    pub fn new(account_type: AccountType) -> Self {
        Self {
            account_type,
            github_token: RwLock::new(None),
            copilot_token: RwLock::new(None),
            vscode_version: RwLock::new(editor::FALLBACK_VSCODE_VERSION.to_string()),
        }
    }

    pub fn account_type(&self) -> AccountType {
        self.account_type
    }

    /// Copilot API base URL for the configured account type
    pub fn base_url(&self) -> String {
        self.account_type.base_url()
    }

    pub async fn github_token(&self) -> Option<String> {
        self.github_token.read().await.clone()
    }

    pub async fn set_github_token(&self, token: String) {
        *self.github_token.write().await = Some(token);
    }

    /// Current Copilot bearer token
    pub async fn copilot_token(&self) -> Option<String> {
        self.copilot_token
            .read()
            .await
            .as_ref()
            .map(|t| t.token.clone())
    }

    /// Expiry of the current Copilot token as a Unix timestamp
    pub async fn copilot_token_expires_at(&self) -> Option<i64> {
        self.copilot_token.read().await.as_ref().map(|t| t.expires_at)
    }

    pub async fn set_copilot_token(&self, token: CopilotToken) {
        *self.copilot_token.write().await = Some(token);
    }

    pub async fn vscode_version(&self) -> String {
        self.vscode_version.read().await.clone()
    }

    pub async fn set_vscode_version(&self, version: String) {
        *self.vscode_version.write().await = version;
    }
}
