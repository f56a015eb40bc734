//! GitHub and Copilot API data models
//!
//! OAuth device flow payloads, the Copilot token, the model catalog and the
//! usage / quota report.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Response from the device authorization endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceCodeResponse {
    pub device_code: String,
    pub user_code: String,
    pub verification_uri: String,
    pub expires_in: u64,
    #[serde(default = "default_interval")]
    pub interval: u64,
}

fn default_interval() -> u64 {
    5
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AccessToken {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeviceTokenError {
    pub error: String,
    #[serde(default)]
    pub error_description: Option<String>,
}

/// Token endpoint answer while polling
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AccessTokenResponse {
    Success(AccessToken),
    Pending(DeviceTokenError),
}

/// Short-lived Copilot token minted from the GitHub token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CopilotToken {
    pub token: String,
    /// Unix timestamp (seconds)
    #[serde(default)]
    pub expires_at: i64,
    /// Seconds until the token should be refreshed
    #[serde(default = "default_refresh_in")]
    pub refresh_in: u64,
}

fn default_refresh_in() -> u64 {
    1500
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GitHubUser {
    pub login: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Model catalog returned by `GET /models`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelsResponse {
    #[serde(default = "default_list_object")]
    pub object: String,
    #[serde(default)]
    pub data: Vec<Model>,
}

impl Default for ModelsResponse {
    fn default() -> Self {
        Self {
            object: default_list_object(),
            data: Vec::new(),
        }
    }
}

fn default_list_object() -> String {
    "list".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Model {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vendor: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub capabilities: Option<ModelCapabilities>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCapabilities {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub family: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limits: Option<ModelLimits>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelLimits {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_prompt_tokens: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_context_window_tokens: Option<u32>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Model {
    pub fn max_output_tokens(&self) -> Option<u32> {
        self.capabilities
            .as_ref()?
            .limits
            .as_ref()?
            .max_output_tokens
    }
}

/// Copilot usage report from `copilot_internal/user`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CopilotUsage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub copilot_plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_reset_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quota_snapshots: Option<QuotaSnapshots>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaSnapshots {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub chat: Option<QuotaDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub completions: Option<QuotaDetail>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub premium_interactions: Option<QuotaDetail>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QuotaDetail {
    #[serde(default)]
    pub entitlement: f64,
    #[serde(default)]
    pub remaining: f64,
    #[serde(default)]
    pub percent_remaining: f64,
    #[serde(default)]
    pub unlimited: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl QuotaDetail {
    /// One-line human summary, e.g. `120/300 used (40.0% used, 60.0% remaining)`
    pub fn summary(&self) -> String {
        if self.unlimited {
            return "unlimited".to_string();
        }
        let used = (self.entitlement - self.remaining).max(0.0);
        let percent_used = if self.entitlement > 0.0 {
            used / self.entitlement * 100.0
        } else {
            0.0
        };
        format!(
            "{}/{} used ({:.1}% used, {:.1}% remaining)",
            used, self.entitlement, percent_used, self.percent_remaining
        )
    }
}

impl CopilotUsage {
    /// Rows of (label, value) for terminal display
    pub fn summary_rows(&self) -> Vec<(&'static str, String)> {
        let mut rows = Vec::new();
        if let Some(plan) = &self.copilot_plan {
            rows.push(("Plan", plan.clone()));
        }
        if let Some(reset) = &self.quota_reset_date {
            rows.push(("Quota resets", reset.clone()));
        }
        if let Some(snapshots) = &self.quota_snapshots {
            let quotas = [
                ("Premium", &snapshots.premium_interactions),
                ("Chat", &snapshots.chat),
                ("Completions", &snapshots.completions),
            ];
            for (label, quota) in quotas {
                if let Some(detail) = quota {
                    rows.push((label, detail.summary()));
                }
            }
        }
        rows
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_access_token_pending() {
        let resp: AccessTokenResponse = serde_json::from_value(json!({
            "error": "authorization_pending",
            "error_description": "waiting"
        }))
        .unwrap();
        match resp {
            AccessTokenResponse::Pending(err) => assert_eq!(err.error, "authorization_pending"),
            AccessTokenResponse::Success(_) => panic!("expected pending"),
        }
    }

    #[test]
    fn test_access_token_success() {
        let resp: AccessTokenResponse = serde_json::from_value(json!({
            "access_token": "gho_123",
            "token_type": "bearer",
            "scope": "read:user"
        }))
        .unwrap();
        assert!(matches!(resp, AccessTokenResponse::Success(t) if t.access_token == "gho_123"));
    }

    #[test]
    fn test_device_code_default_interval() {
        let resp: DeviceCodeResponse = serde_json::from_value(json!({
            "device_code": "dc",
            "user_code": "ABCD-1234",
            "verification_uri": "https://github.com/login/device",
            "expires_in": 900
        }))
        .unwrap();
        assert_eq!(resp.interval, 5);
    }

    #[test]
    fn test_model_limits_and_passthrough() {
        let models: ModelsResponse = serde_json::from_value(json!({
            "object": "list",
            "data": [{
                "id": "gpt-4o",
                "version": "2024-11-20",
                "capabilities": {"family": "gpt-4o", "limits": {"max_output_tokens": 4096}}
            }]
        }))
        .unwrap();
        assert_eq!(models.data[0].max_output_tokens(), Some(4096));

        let out = serde_json::to_value(&models).unwrap();
        assert_eq!(out["data"][0]["version"], json!("2024-11-20"));
    }

    #[test]
    fn test_quota_summary() {
        let detail = QuotaDetail {
            entitlement: 300.0,
            remaining: 180.0,
            percent_remaining: 60.0,
            unlimited: false,
            extra: Map::new(),
        };
        assert_eq!(detail.summary(), "120/300 used (40.0% used, 60.0% remaining)");
    }

    #[test]
    fn test_usage_rows() {
        let usage: CopilotUsage = serde_json::from_value(json!({
            "copilot_plan": "individual",
            "quota_reset_date": "2026-11-01",
            "quota_snapshots": {
                "chat": {"entitlement": 0, "remaining": 0, "percent_remaining": 100, "unlimited": true}
            }
        }))
        .unwrap();
        let rows = usage.summary_rows();
        assert_eq!(rows[0], ("Plan", "individual".to_string()));
        assert_eq!(rows[2], ("Chat", "unlimited".to_string()));
    }
}
