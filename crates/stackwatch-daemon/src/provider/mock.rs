//! Mock orchestration API for testing

use super::api::{ErasedOrchestrationApi, OrchestrationApi, ProviderError, StackSummary};
use super::registry::ApiConnector;
use stackwatch_core::ResourceEvent;
use std::sync::{Arc, Mutex, MutexGuard};

/// In-memory orchestration API.
///
/// Clones share state, so a test can keep one clone, hand another to a
/// poller, and change the "remote" stacks between cycles.
#[derive(Debug, Clone, Default)]
pub struct MockOrchestrationApi {
    state: Arc<Mutex<MockState>>,
}

#[derive(Debug, Default)]
struct MockState {
    stacks: Vec<MockStack>,
    error: Option<String>,
    connect_failures: usize,
    calls: Vec<MockCall>,
}

#[derive(Debug, Clone)]
struct MockStack {
    summary: StackSummary,
    events: Vec<ResourceEvent>,
}

/// Record of method calls for test assertions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    Connect,
    ListStacks,
    ListEvents(String),
}

impl MockOrchestrationApi {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Insert a stack, or update name/status of an existing one
    pub fn set_stack(&self, id: &str, name: &str, status: &str) {
        let mut state = self.lock();
        match state.stacks.iter_mut().find(|s| s.summary.id == id) {
            Some(stack) => {
                stack.summary.name = name.to_string();
                stack.summary.status = status.to_string();
            }
            None => state.stacks.push(MockStack {
                summary: StackSummary::new(id, name, status),
                events: Vec::new(),
            }),
        }
    }

    /// Change only the status of an existing stack
    pub fn set_status(&self, id: &str, status: &str) {
        let mut state = self.lock();
        if let Some(stack) = state.stacks.iter_mut().find(|s| s.summary.id == id) {
            stack.summary.status = status.to_string();
        }
    }

    /// Append a resource event to an existing stack
    pub fn push_event(&self, id: &str, event: ResourceEvent) {
        let mut state = self.lock();
        if let Some(stack) = state.stacks.iter_mut().find(|s| s.summary.id == id) {
            stack.events.push(event);
        }
    }

    pub fn remove_stack(&self, id: &str) {
        self.lock().stacks.retain(|s| s.summary.id != id);
    }

    /// Make every API call fail with `message` until cleared
    pub fn fail_with(&self, message: &str) {
        self.lock().error = Some(message.to_string());
    }

    pub fn clear_failure(&self) {
        self.lock().error = None;
    }

    /// Make the next `count` connection attempts fail
    pub fn fail_next_connects(&self, count: usize) {
        self.lock().connect_failures = count;
    }

    /// Get a copy of the call log for assertions
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Number of full listings served
    pub fn fetch_count(&self) -> usize {
        self.lock()
            .calls
            .iter()
            .filter(|c| **c == MockCall::ListStacks)
            .count()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    /// Hand out a connection sharing this mock's state
    pub fn connect(&self) -> Result<Self, ProviderError> {
        let mut state = self.lock();
        state.calls.push(MockCall::Connect);
        if state.connect_failures > 0 {
            state.connect_failures -= 1;
            return Err(ProviderError::connect("mock connection refused"));
        }
        Ok(self.clone())
    }

    /// Connector registering this mock under `name`
    pub fn connector(&self, name: &str) -> ApiConnector {
        let mock = self.clone();
        ApiConnector {
            name: name.to_string(),
            description: "In-memory mock provider".to_string(),
            connect: Arc::new(move |_credentials| {
                mock.connect()
                    .map(|api| Box::new(api) as Box<dyn ErasedOrchestrationApi>)
            }),
        }
    }

    fn check_error(state: &MockState) -> Result<(), ProviderError> {
        match &state.error {
            Some(message) => Err(ProviderError::request(message.clone())),
            None => Ok(()),
        }
    }
}

impl OrchestrationApi for MockOrchestrationApi {
    async fn list_stacks(&self) -> Result<Vec<StackSummary>, ProviderError> {
        let mut state = self.lock();
        state.calls.push(MockCall::ListStacks);
        Self::check_error(&state)?;
        Ok(state.stacks.iter().map(|s| s.summary.clone()).collect())
    }

    async fn list_events(&self, stack_id: &str) -> Result<Vec<ResourceEvent>, ProviderError> {
        let mut state = self.lock();
        state.calls.push(MockCall::ListEvents(stack_id.to_string()));
        Self::check_error(&state)?;
        state
            .stacks
            .iter()
            .find(|s| s.summary.id == stack_id)
            .map(|s| s.events.clone())
            .ok_or_else(|| ProviderError::request(format!("stack {stack_id} does not exist")))
    }

    fn provider_name(&self) -> &str {
        "mock"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_clones_share_state() {
        let mock = MockOrchestrationApi::new();
        let handed_out = mock.connect().unwrap();

        mock.set_stack("s-1", "web", "CREATE_IN_PROGRESS");
        mock.set_status("s-1", "CREATE_COMPLETE");

        let stacks = OrchestrationApi::list_stacks(&handed_out).await.unwrap();
        assert_eq!(stacks, vec![StackSummary::new("s-1", "web", "CREATE_COMPLETE")]);
        assert_eq!(mock.fetch_count(), 1);
    }

    #[tokio::test]
    async fn test_unknown_stack_events_is_error() {
        let mock = MockOrchestrationApi::new();
        assert!(OrchestrationApi::list_events(&mock, "missing").await.is_err());
        assert_eq!(mock.calls(), vec![MockCall::ListEvents("missing".to_string())]);
    }

    #[test]
    fn test_connect_failures_are_consumed() {
        let mock = MockOrchestrationApi::new();
        mock.fail_next_connects(2);
        assert!(mock.connect().is_err());
        assert!(mock.connect().is_err());
        assert!(mock.connect().is_ok());
    }

    #[tokio::test]
    async fn test_failure_can_be_cleared() {
        let mock = MockOrchestrationApi::new();
        mock.fail_with("boom");
        assert!(OrchestrationApi::list_stacks(&mock).await.is_err());
        mock.clear_failure();
        assert!(OrchestrationApi::list_stacks(&mock).await.is_ok());
    }
}
