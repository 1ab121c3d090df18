//! Schema-sync client: pushes the normalized role/permission/action
//! vocabulary to the external policy engine after role or permission
//! mutations.

use async_trait::async_trait;
use serde::Serialize;

/// Placeholders pushed when a vocabulary list is empty, since the downstream
/// schema rejects empty definition lists.
pub const FALLBACK_ROLE: &str = "test role";
pub const FALLBACK_PERMISSION: &str = "test permission";
pub const FALLBACK_ACTION: &str = "test action";

#[derive(Debug, Clone, Default, Serialize, PartialEq)]
pub struct Vocabulary {
    pub role_names: Vec<String>,
    pub permission_names: Vec<String>,
    pub action_names: Vec<String>,
}

impl Vocabulary {
    pub fn new(
        role_names: Vec<String>,
        permission_names: Vec<String>,
        action_names: Vec<String>,
    ) -> Self {
        Self {
            role_names: normalize(role_names),
            permission_names: normalize(permission_names),
            action_names: normalize(action_names),
        }
    }

    /// Replace empty lists with their documented placeholder.
    pub fn with_fallbacks(mut self) -> Self {
        if self.role_names.is_empty() {
            self.role_names.push(FALLBACK_ROLE.to_string());
        }
        if self.permission_names.is_empty() {
            self.permission_names.push(FALLBACK_PERMISSION.to_string());
        }
        if self.action_names.is_empty() {
            self.action_names.push(FALLBACK_ACTION.to_string());
        }
        self
    }
}

fn normalize(names: Vec<String>) -> Vec<String> {
    let mut names: Vec<String> = names
        .into_iter()
        .map(|n| n.trim().to_lowercase())
        .filter(|n| !n.is_empty())
        .collect();
    names.sort();
    names.dedup();
    names
}

#[async_trait]
pub trait SchemaSyncClient: Send + Sync {
    async fn push_vocabulary(&self, vocabulary: &Vocabulary) -> Result<(), anyhow::Error>;
}

/// HTTP client pushing the vocabulary as JSON to the configured endpoint.
#[derive(Clone)]
pub struct HttpSchemaSyncClient {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpSchemaSyncClient {
    pub fn new(config: &crate::config::SchemaSyncConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: config.endpoint.clone(),
        }
    }
}

#[async_trait]
impl SchemaSyncClient for HttpSchemaSyncClient {
    async fn push_vocabulary(&self, vocabulary: &Vocabulary) -> Result<(), anyhow::Error> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(vocabulary)
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("Schema sync request failed: {}", e))?;

        if !response.status().is_success() {
            return Err(anyhow::anyhow!(
                "Schema sync rejected with status {}",
                response.status()
            ));
        }

        tracing::debug!(
            roles = vocabulary.role_names.len(),
            permissions = vocabulary.permission_names.len(),
            actions = vocabulary.action_names.len(),
            "Pushed vocabulary to schema engine"
        );
        Ok(())
    }
}

/// No-op client for deployments without a schema engine.
pub struct NullSchemaSyncClient;

#[async_trait]
impl SchemaSyncClient for NullSchemaSyncClient {
    async fn push_vocabulary(&self, _vocabulary: &Vocabulary) -> Result<(), anyhow::Error> {
        Ok(())
    }
}

/// Records pushed vocabularies; used by tests.
#[derive(Default)]
pub struct RecordingSchemaSyncClient {
    pub pushed: std::sync::Mutex<Vec<Vocabulary>>,
}

impl RecordingSchemaSyncClient {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SchemaSyncClient for RecordingSchemaSyncClient {
    async fn push_vocabulary(&self, vocabulary: &Vocabulary) -> Result<(), anyhow::Error> {
        self.pushed
            .lock()
            .map_err(|e| anyhow::anyhow!("schema sync mutex poisoned: {}", e))?
            .push(vocabulary.clone());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_lowercases_and_dedups() {
        let v = Vocabulary::new(
            vec!["Admin".to_string(), "admin".to_string(), " Viewer ".to_string()],
            vec![],
            vec!["READ".to_string()],
        );
        assert_eq!(v.role_names, vec!["admin", "viewer"]);
        assert_eq!(v.action_names, vec!["read"]);
    }

    #[test]
    fn test_empty_lists_get_placeholders() {
        let v = Vocabulary::default().with_fallbacks();
        assert_eq!(v.role_names, vec![FALLBACK_ROLE]);
        assert_eq!(v.permission_names, vec![FALLBACK_PERMISSION]);
        assert_eq!(v.action_names, vec![FALLBACK_ACTION]);
    }

    #[test]
    fn test_populated_lists_keep_their_names() {
        let v = Vocabulary::new(vec!["admin".to_string()], vec![], vec![]).with_fallbacks();
        assert_eq!(v.role_names, vec!["admin"]);
        assert_eq!(v.permission_names, vec![FALLBACK_PERMISSION]);
    }
}
