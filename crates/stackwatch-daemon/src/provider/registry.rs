//! Connector registry: picks an API client for a credential set

use super::api::{ErasedOrchestrationApi, ProviderError};
use super::aws::AwsCliProvider;
use stackwatch_core::Credentials;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Provider used when credentials carry no `provider` entry
pub const DEFAULT_PROVIDER: &str = "aws";

/// A factory function that opens a connection for a credential set
pub type ConnectorFn = Arc<
    dyn Fn(&Credentials) -> Result<Box<dyn ErasedOrchestrationApi>, ProviderError> + Send + Sync,
>;

/// A named connection factory
#[derive(Clone)]
pub struct ApiConnector {
    /// Provider name matched against the credentials' `provider` entry
    pub name: String,
    /// Human-readable description
    pub description: String,
    /// Factory function
    pub connect: ConnectorFn,
}

impl std::fmt::Debug for ApiConnector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConnector")
            .field("name", &self.name)
            .field("description", &self.description)
            .field("connect", &"<connector_fn>")
            .finish()
    }
}

/// Registry of orchestration API connectors keyed by provider name
#[derive(Debug, Clone, Default)]
pub struct ApiRegistry {
    connectors: HashMap<String, ApiConnector>,
}

impl ApiRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with the built-in AWS CLI provider
    pub fn with_builtin() -> Self {
        let mut registry = Self::new();
        registry.register(ApiConnector {
            name: DEFAULT_PROVIDER.to_string(),
            description: "AWS CloudFormation via the aws CLI (built-in)".to_string(),
            connect: Arc::new(|credentials| {
                AwsCliProvider::from_credentials(credentials)
                    .map(|p| Box::new(p) as Box<dyn ErasedOrchestrationApi>)
            }),
        });
        registry
    }

    /// Register a connector. A connector with the same name is replaced.
    pub fn register(&mut self, connector: ApiConnector) {
        self.connectors
            .insert(connector.name.to_ascii_lowercase(), connector);
    }

    /// Open a connection for `credentials`.
    ///
    /// The connector is chosen by the credentials' `provider` entry
    /// (case-insensitive), falling back to [`DEFAULT_PROVIDER`].
    ///
    /// # Errors
    ///
    /// `ProviderError::UnknownProvider` if no connector matches, or whatever
    /// the connector itself returns.
    pub fn connect(
        &self,
        credentials: &Credentials,
    ) -> Result<Box<dyn ErasedOrchestrationApi>, ProviderError> {
        let name = provider_name(credentials);
        let connector = self
            .connectors
            .get(&name)
            .ok_or(ProviderError::UnknownProvider { name: name.clone() })?;
        debug!("Connecting with provider '{}'", connector.name);
        (connector.connect)(credentials)
    }

    /// List registered provider names
    pub fn list_providers(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.connectors.keys().map(|s| s.as_str()).collect();
        names.sort_unstable();
        names
    }

    pub fn has_provider(&self, name: &str) -> bool {
        self.connectors.contains_key(&name.to_ascii_lowercase())
    }

    pub fn len(&self) -> usize {
        self.connectors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.connectors.is_empty()
    }
}

fn provider_name(credentials: &Credentials) -> String {
    credentials
        .get("provider")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_ascii_lowercase())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| DEFAULT_PROVIDER.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockOrchestrationApi;

    fn creds(provider: Option<&str>) -> Credentials {
        let mut table = Credentials::new();
        if let Some(p) = provider {
            table.insert("provider".to_string(), p.into());
        }
        table
    }

    #[test]
    fn test_builtin_registry() {
        let registry = ApiRegistry::with_builtin();
        assert_eq!(registry.list_providers(), vec!["aws"]);
        assert!(registry.has_provider("AWS"));
    }

    #[test]
    fn test_connect_selects_by_provider_entry() {
        let mock = MockOrchestrationApi::new();
        let mut registry = ApiRegistry::new();
        registry.register(mock.connector("Mock"));

        let api = registry.connect(&creds(Some("MOCK"))).unwrap();
        assert_eq!(api.provider_name(), "mock");
    }

    #[test]
    fn test_missing_provider_entry_uses_default() {
        let registry = ApiRegistry::with_builtin();
        let api = registry.connect(&creds(None)).unwrap();
        assert_eq!(api.provider_name(), "aws");
    }

    #[test]
    fn test_unknown_provider() {
        let registry = ApiRegistry::new();
        let err = registry.connect(&creds(Some("openstack"))).unwrap_err();
        assert!(matches!(err, ProviderError::UnknownProvider { ref name } if name == "openstack"));
    }

    #[test]
    fn test_connector_errors_propagate() {
        let mock = MockOrchestrationApi::new();
        mock.fail_next_connects(1);
        let mut registry = ApiRegistry::new();
        registry.register(mock.connector("mock"));

        assert!(matches!(
            registry.connect(&creds(Some("mock"))),
            Err(ProviderError::Connect { .. })
        ));
        assert!(registry.connect(&creds(Some("mock"))).is_ok());
    }
}
