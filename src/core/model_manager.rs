//! Cached Copilot model catalog
//!
//! The catalog is fetched once at startup. It supplies default output limits
//! and maps dated Claude model names onto Copilot's undated ids.

use crate::models::copilot::{Model, ModelsResponse};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct ModelManager {
    catalog: RwLock<Option<ModelsResponse>>,
}

impl ModelManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn set_models(&self, models: ModelsResponse) {
        *self.catalog.write().await = Some(models);
    }

    /// Cached catalog, if one has been loaded
    pub async fn models(&self) -> Option<ModelsResponse> {
        self.catalog.read().await.clone()
    }

    pub async fn model_ids(&self) -> Vec<String> {
        self.catalog
            .read()
            .await
            .as_ref()
            .map(|c| c.data.iter().map(|m| m.id.clone()).collect())
            .unwrap_or_default()
    }

    /// Output token limit advertised for `model`
    pub async fn max_output_tokens(&self, model: &str) -> Option<u32> {
        let catalog = self.catalog.read().await;
        find(catalog.as_ref()?, model)?.max_output_tokens()
    }

    /// Map a requested model name onto a catalog id
    ///
    /// An exact match wins. Otherwise a trailing `-YYYYMMDD` suffix is
    /// stripped and used when that matches; anything else passes through.
    pub async fn resolve_model(&self, requested: &str) -> String {
        let catalog = self.catalog.read().await;
        let Some(catalog) = catalog.as_ref() else {
            return requested.to_string();
        };

        if find(catalog, requested).is_some() {
            return requested.to_string();
        }

        match strip_date_suffix(requested) {
            Some(base) if find(catalog, base).is_some() => base.to_string(),
            _ => requested.to_string(),
        }
    }
}

fn find<'a>(catalog: &'a ModelsResponse, id: &str) -> Option<&'a Model> {
    catalog.data.iter().find(|m| m.id == id)
}

/// `claude-sonnet-4-20250514` -> `claude-sonnet-4`
pub fn strip_date_suffix(model: &str) -> Option<&str> {
    let (base, suffix) = model.rsplit_once('-')?;
    if suffix.len() == 8 && suffix.bytes().all(|b| b.is_ascii_digit()) && !base.is_empty() {
        Some(base)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    async fn manager() -> ModelManager {
        let manager = ModelManager::new();
        let catalog: ModelsResponse = serde_json::from_value(json!({
            "object": "list",
            "data": [
                {"id": "gpt-4o", "capabilities": {"limits": {"max_output_tokens": 4096}}},
                {"id": "claude-sonnet-4", "capabilities": {"limits": {"max_output_tokens": 16000}}},
                {"id": "o3-mini-20250131"}
            ]
        }))
        .unwrap();
        manager.set_models(catalog).await;
        manager
    }

    #[test]
    fn test_strip_date_suffix() {
        assert_eq!(
            strip_date_suffix("claude-sonnet-4-20250514"),
            Some("claude-sonnet-4")
        );
        assert_eq!(strip_date_suffix("gpt-4o"), None);
        assert_eq!(strip_date_suffix("claude-3-5-sonnet-2024"), None);
        assert_eq!(strip_date_suffix("20250514"), None);
    }

    #[tokio::test]
    async fn test_resolve_dated_name() {
        let manager = manager().await;
        assert_eq!(
            manager.resolve_model("claude-sonnet-4-20250514").await,
            "claude-sonnet-4"
        );
    }

    #[tokio::test]
    async fn test_exact_match_wins() {
        let manager = manager().await;
        assert_eq!(
            manager.resolve_model("o3-mini-20250131").await,
            "o3-mini-20250131"
        );
    }

    #[tokio::test]
    async fn test_unknown_passes_through() {
        let manager = manager().await;
        assert_eq!(
            manager.resolve_model("claude-opus-9-20300101").await,
            "claude-opus-9-20300101"
        );
        assert_eq!(
            ModelManager::new().resolve_model("gpt-4o-20240101").await,
            "gpt-4o-20240101"
        );
    }

    #[tokio::test]
    async fn test_max_output_tokens() {
        let manager = manager().await;
        assert_eq!(manager.max_output_tokens("gpt-4o").await, Some(4096));
        assert_eq!(manager.max_output_tokens("o3-mini-20250131").await, None);
        assert_eq!(manager.max_output_tokens("missing").await, None);
        assert_eq!(manager.model_ids().await.len(), 3);
    }
}
