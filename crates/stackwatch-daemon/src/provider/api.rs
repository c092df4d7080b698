//! Provider trait for orchestration API access

use stackwatch_core::{ResourceEvent, Snapshot, StackState};
use std::future::Future;
use std::pin::Pin;

/// Stack listing entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StackSummary {
    pub id: String,
    pub name: String,
    pub status: String,
}

impl StackSummary {
    pub fn new(id: impl Into<String>, name: impl Into<String>, status: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            status: status.into(),
        }
    }
}

/// Provider errors with structured variants
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
    #[error("connection failed: {message}")]
    Connect {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("API request failed: {message}")]
    Request {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("orchestration provider '{name}' not registered")]
    UnknownProvider { name: String },
}

impl ProviderError {
    pub fn request(message: impl Into<String>) -> Self {
        ProviderError::Request {
            message: message.into(),
            source: None,
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        ProviderError::Connect {
            message: message.into(),
            source: None,
        }
    }
}

/// Async trait for orchestration services.
///
/// Uses RPITIT (Return Position Impl Trait in Traits) with explicit Send bounds.
/// Both listings are complete on every call; paging, if any, is the
/// implementation's business.
pub trait OrchestrationApi: Send + Sync + std::fmt::Debug {
    /// List every stack visible to these credentials
    fn list_stacks(&self) -> impl Future<Output = Result<Vec<StackSummary>, ProviderError>> + Send;

    /// List a stack's resource events, oldest first
    fn list_events(
        &self,
        stack_id: &str,
    ) -> impl Future<Output = Result<Vec<ResourceEvent>, ProviderError>> + Send;

    /// Provider name for logging/display
    fn provider_name(&self) -> &str;
}

/// Object-safe version of OrchestrationApi for type erasure.
///
/// Implemented automatically for all types that implement OrchestrationApi,
/// so pollers can hold a `Box<dyn ErasedOrchestrationApi>`.
pub trait ErasedOrchestrationApi: Send + Sync + std::fmt::Debug {
    fn list_stacks<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<StackSummary>, ProviderError>> + Send + 'a>>;

    fn list_events<'a>(
        &'a self,
        stack_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ResourceEvent>, ProviderError>> + Send + 'a>>;

    fn provider_name(&self) -> &str;
}

impl<T: OrchestrationApi> ErasedOrchestrationApi for T {
    fn list_stacks<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<StackSummary>, ProviderError>> + Send + 'a>> {
        Box::pin(OrchestrationApi::list_stacks(self))
    }

    fn list_events<'a>(
        &'a self,
        stack_id: &'a str,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<ResourceEvent>, ProviderError>> + Send + 'a>> {
        Box::pin(OrchestrationApi::list_events(self, stack_id))
    }

    fn provider_name(&self) -> &str {
        OrchestrationApi::provider_name(self)
    }
}

/// Fetch a complete snapshot: every stack, each with its full event list.
///
/// Stacks appear in the order the provider lists them.
pub async fn fetch_state(api: &dyn ErasedOrchestrationApi) -> Result<Snapshot, ProviderError> {
    let stacks = api.list_stacks().await?;
    let mut snapshot = Snapshot::new();
    for stack in stacks {
        let events = api.list_events(&stack.id).await?;
        snapshot.insert(stack.id, StackState::new(stack.status, stack.name, events));
    }
    Ok(snapshot)
}
