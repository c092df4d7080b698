//! Keeps one poller alive per configured target
//!
//! The supervisor owns an ordered list of slots, each pairing a target with
//! the handle of the poller currently serving it. When a poller reports a
//! termination, the slot holding it gets a fresh poller built from the same
//! target, at the same index. Only the cache file carries over.

use crate::poller::{Poller, PollerContext, PollerError, PollerHandle, PollerId, PollerSettings, Termination};
use crate::provider::ApiRegistry;
use crate::shutdown::{graceful_shutdown, ShutdownSummary};
use crate::sink::{Sink, SinkResolver};
use stackwatch_core::config::DaemonConfig;
use stackwatch_core::{EventRecord, Target, TargetConfig};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Supervisor tunables
#[derive(Debug, Clone)]
pub struct SupervisorOptions {
    pub poller: PollerSettings,
    /// Per-poller wait during shutdown
    pub shutdown_timeout: Duration,
}

impl Default for SupervisorOptions {
    fn default() -> Self {
        Self {
            poller: PollerSettings::default(),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl From<&DaemonConfig> for SupervisorOptions {
    fn from(config: &DaemonConfig) -> Self {
        Self {
            poller: PollerSettings::from(config),
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        }
    }
}

#[derive(Debug)]
struct Slot {
    target: Arc<Target>,
    handle: PollerHandle,
}

/// Sink that hands records to the supervisor's downstream unchanged
#[derive(Debug)]
struct Intake {
    downstream: Arc<dyn Sink>,
}

impl Sink for Intake {
    fn transmit(&self, record: EventRecord) {
        self.downstream.transmit(record);
    }
}

pub struct Supervisor {
    slots: Vec<Slot>,
    ctx: PollerContext,
    terminations: mpsc::UnboundedReceiver<Termination>,
    downstream: Arc<dyn Sink>,
    shutdown_timeout: Duration,
}

impl std::fmt::Debug for Supervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Supervisor")
            .field("slots", &self.slots)
            .field("shutdown_timeout", &self.shutdown_timeout)
            .finish_non_exhaustive()
    }
}

impl Supervisor {
    /// Build one poller per target, in input order.
    ///
    /// Every target is validated before any poller is spawned. Must be
    /// called inside a tokio runtime.
    ///
    /// # Errors
    ///
    /// `PollerError::Target` for the first invalid target.
    pub fn build(
        targets: &[TargetConfig],
        apis: Arc<ApiRegistry>,
        sinks: Arc<dyn SinkResolver>,
        downstream: Arc<dyn Sink>,
        options: SupervisorOptions,
    ) -> Result<Self, PollerError> {
        let targets = targets
            .iter()
            .map(|config| Target::from_config(config).map(Arc::new))
            .collect::<Result<Vec<_>, _>>()?;

        let (tx, terminations) = mpsc::unbounded_channel();
        let ctx = PollerContext {
            apis,
            sinks,
            settings: options.poller,
            terminations: tx,
            cancel: CancellationToken::new(),
        };

        let slots = targets
            .into_iter()
            .map(|target| Slot {
                handle: Poller::spawn(target.clone(), &ctx),
                target,
            })
            .collect::<Vec<_>>();
        info!("Supervisor built {} poller(s)", slots.len());

        Ok(Self {
            slots,
            ctx,
            terminations,
            downstream,
            shutdown_timeout: options.shutdown_timeout,
        })
    }

    /// Handles in slot order
    pub fn handles(&self) -> impl Iterator<Item = &PollerHandle> {
        self.slots.iter().map(|slot| &slot.handle)
    }

    pub fn handle(&self, index: usize) -> Option<&PollerHandle> {
        self.slots.get(index).map(|slot| &slot.handle)
    }

    /// Target served by slot `index`
    pub fn target(&self, index: usize) -> Option<&Arc<Target>> {
        self.slots.get(index).map(|slot| &slot.target)
    }

    pub fn ids(&self) -> Vec<PollerId> {
        self.handles().map(PollerHandle::id).collect()
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Wait for the next poller termination
    pub async fn next_termination(&mut self) -> Option<Termination> {
        self.terminations.recv().await
    }

    /// Rebuild the slot whose poller terminated.
    ///
    /// Returns false if no slot holds `termination.id` any more.
    pub fn handle_termination(&mut self, termination: Termination) -> bool {
        let Some(index) = self
            .slots
            .iter()
            .position(|slot| slot.handle.id() == termination.id)
        else {
            debug!("Ignoring termination of replaced {}", termination.id);
            return false;
        };

        let slot = &mut self.slots[index];
        let replacement = Poller::spawn(slot.target.clone(), &self.ctx);
        warn!(
            "Slot {} rebuilt as {} after {} terminated: {}",
            index,
            replacement.id(),
            termination.id,
            termination.cause
        );
        slot.handle = replacement;
        true
    }

    /// Forward an externally arriving record downstream as-is
    pub fn accept(&self, record: EventRecord) {
        self.downstream.transmit(record);
    }

    /// A sink equivalent to [`accept`](Self::accept), for registering the
    /// supervisor as a named destination
    pub fn intake(&self) -> Arc<dyn Sink> {
        Arc::new(Intake {
            downstream: self.downstream.clone(),
        })
    }

    /// Rebuild terminated pollers until `cancel` fires, then shut down
    pub async fn run(mut self, cancel: CancellationToken) -> ShutdownSummary {
        info!("Supervising {} poller(s)", self.slots.len());
        loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                termination = self.terminations.recv() => match termination {
                    Some(termination) => {
                        self.handle_termination(termination);
                    }
                    None => break,
                },
            }
        }
        self.shutdown().await
    }

    /// Cancel every poller and wait for them with the configured timeout
    pub async fn shutdown(self) -> ShutdownSummary {
        self.ctx.cancel.cancel();
        let handles = self.slots.into_iter().map(|slot| slot.handle).collect();
        graceful_shutdown(handles, self.shutdown_timeout).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::MockOrchestrationApi;
    use crate::sink::{ChannelSink, SinkRegistry};
    use serde_json::json;
    use stackwatch_core::Credentials;
    use tempfile::TempDir;

    fn supervisor(dir: &TempDir, mock: &MockOrchestrationApi) -> (Supervisor, mpsc::UnboundedReceiver<EventRecord>) {
        let mut apis = ApiRegistry::new();
        apis.register(mock.connector("mock"));
        let mut credentials = Credentials::new();
        credentials.insert("provider".to_string(), "mock".into());
        let targets = vec![TargetConfig::new(credentials, "out")
            .with_cache_directory(dir.path())
            .with_auto_start(false)];
        let (downstream, rx) = ChannelSink::new();
        let sup = Supervisor::build(
            &targets,
            Arc::new(apis),
            Arc::new(SinkRegistry::new()),
            Arc::new(downstream),
            SupervisorOptions::default(),
        )
        .unwrap();
        (sup, rx)
    }

    #[tokio::test]
    async fn test_invalid_target_builds_nothing() {
        let mock = MockOrchestrationApi::new();
        let mut apis = ApiRegistry::new();
        apis.register(mock.connector("mock"));
        let targets = vec![TargetConfig::default()];
        let (downstream, _rx) = ChannelSink::new();

        let err = Supervisor::build(
            &targets,
            Arc::new(apis),
            Arc::new(SinkRegistry::new()),
            Arc::new(downstream),
            SupervisorOptions::default(),
        )
        .unwrap_err();

        assert!(matches!(err, PollerError::Target(_)));
        assert!(mock.calls().is_empty());
    }

    #[tokio::test]
    async fn test_accept_and_intake_forward_unchanged() {
        let dir = TempDir::new().unwrap();
        let mock = MockOrchestrationApi::new();
        let (sup, mut rx) = supervisor(&dir, &mock);

        let mut record = EventRecord::new();
        record.insert("anything".to_string(), json!([1, 2, 3]));
        sup.accept(record.clone());
        sup.intake().transmit(record.clone());

        assert_eq!(rx.try_recv().unwrap(), record);
        assert_eq!(rx.try_recv().unwrap(), record);
        sup.shutdown().await;
    }

    #[tokio::test]
    async fn test_stale_termination_is_ignored() {
        let dir = TempDir::new().unwrap();
        let mock = MockOrchestrationApi::new();
        let (mut sup, _rx) = supervisor(&dir, &mock);
        let original = sup.ids()[0];

        assert!(sup.handle_termination(Termination {
            id: original,
            cause: PollerError::Shutdown,
        }));
        let rebuilt = sup.ids()[0];
        assert_ne!(rebuilt, original);

        assert!(!sup.handle_termination(Termination {
            id: original,
            cause: PollerError::Shutdown,
        }));
        assert_eq!(sup.ids(), vec![rebuilt]);
        sup.shutdown().await;
    }
}
