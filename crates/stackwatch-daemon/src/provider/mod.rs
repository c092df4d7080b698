//! Orchestration API abstraction
//!
//! Pollers only need two things from the remote service: the list of stacks
//! with their status, and each stack's resource events. Concrete clients
//! implement [`OrchestrationApi`]; the [`ApiRegistry`] picks one per target
//! from the `provider` entry of its credentials.

mod api;
mod aws;
mod mock;
mod registry;

pub use api::{fetch_state, ErasedOrchestrationApi, OrchestrationApi, ProviderError, StackSummary};
pub use aws::AwsCliProvider;
pub use mock::{MockCall, MockOrchestrationApi};
pub use registry::{ApiConnector, ApiRegistry, ConnectorFn, DEFAULT_PROVIDER};
