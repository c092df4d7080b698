//! Per-target poller
//!
//! A poller owns one API connection, one seed, and one schedule, all on a
//! single tokio task. Scheduled ticks and handle commands are taken from
//! the same `select!`, so a cycle never overlaps another one and the seed
//! needs no lock.
//!
//! Start-up failures (connection, corrupt cache, bootstrap fetch) end the
//! task and are reported as a [`Termination`]. Failures inside a cycle are
//! logged, followed by the recovery delay, and the poller carries on.

use crate::provider::{fetch_state, ApiRegistry, ErasedOrchestrationApi, ProviderError};
use crate::sink::SinkResolver;
use stackwatch_core::config::DaemonConfig;
use stackwatch_core::io::{load_seed, save_seed};
use stackwatch_core::{diff, SeedError, Snapshot, Target, TargetConfig, TargetError};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::{AbortHandle, JoinError, JoinHandle};
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

static NEXT_POLLER_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identity of one poller instance.
///
/// A rebuilt slot gets a fresh id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PollerId(u64);

impl PollerId {
    fn next() -> Self {
        Self(NEXT_POLLER_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for PollerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "poller-{}", self.0)
    }
}

/// Errors that end a poller, or fail a single cycle
#[derive(Debug, Error)]
pub enum PollerError {
    #[error("invalid target: {0}")]
    Target(#[from] TargetError),

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Seed(#[from] SeedError),

    #[error("destination '{name}' is not available")]
    SinkUnavailable { name: String },

    #[error("poller task panicked: {message}")]
    Panicked { message: String },

    /// The poller task is no longer running
    #[error("poller has shut down")]
    Shutdown,
}

/// A poller that died outside a cycle
#[derive(Debug)]
pub struct Termination {
    pub id: PollerId,
    pub cause: PollerError,
}

/// Tunables shared by every poller of a supervisor
#[derive(Debug, Clone)]
pub struct PollerSettings {
    /// Cooldown after a failed cycle
    pub recovery_delay: Duration,
}

impl Default for PollerSettings {
    fn default() -> Self {
        Self {
            recovery_delay: Duration::from_secs(DaemonConfig::DEFAULT_RECOVERY_DELAY_SECS),
        }
    }
}

impl From<&DaemonConfig> for PollerSettings {
    fn from(config: &DaemonConfig) -> Self {
        Self {
            recovery_delay: Duration::from_secs(config.recovery_delay_secs),
        }
    }
}

/// Everything a poller needs besides its target
#[derive(Clone)]
pub struct PollerContext {
    pub apis: Arc<ApiRegistry>,
    pub sinks: Arc<dyn SinkResolver>,
    pub settings: PollerSettings,
    /// Where start-up failures are reported
    pub terminations: mpsc::UnboundedSender<Termination>,
    /// Parent of every poller's cancellation token
    pub cancel: CancellationToken,
}

impl std::fmt::Debug for PollerContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PollerContext")
            .field("apis", &self.apis)
            .field("sinks", &"<sink_resolver>")
            .field("settings", &self.settings)
            .finish()
    }
}

/// Result of one cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    /// Cycle completed; this many events were sent
    Delivered(usize),
    /// Cycle failed and was skipped after the recovery delay
    Failed(String),
}

/// Point-in-time view of a running poller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollerStatus {
    /// True while periodic polling is active
    pub scheduled: bool,
    /// Number of stacks in the current seed
    pub seed_stacks: usize,
}

enum Command {
    Pause(oneshot::Sender<()>),
    Unpause(oneshot::Sender<()>),
    PollNow(oneshot::Sender<CycleOutcome>),
    Status(oneshot::Sender<PollerStatus>),
}

/// Running state of one poller, owned by its task
pub struct Poller {
    target: Arc<Target>,
    api: Box<dyn ErasedOrchestrationApi>,
    seed: Snapshot,
    cache_file: PathBuf,
    sinks: Arc<dyn SinkResolver>,
    settings: PollerSettings,
    schedule: Option<Interval>,
    cancel: CancellationToken,
}

impl Poller {
    /// Validate `config` and spawn a poller for it.
    ///
    /// # Errors
    ///
    /// Returns [`TargetError`] if credentials or destination are missing.
    /// Nothing is spawned in that case.
    pub fn start(config: &TargetConfig, ctx: &PollerContext) -> Result<PollerHandle, TargetError> {
        let target = Target::from_config(config)?;
        Ok(Self::spawn(Arc::new(target), ctx))
    }

    /// Spawn a poller for an already validated target.
    ///
    /// Connecting and loading the seed happen on the new task; if either
    /// fails the task ends and a [`Termination`] is sent on
    /// `ctx.terminations`.
    pub fn spawn(target: Arc<Target>, ctx: &PollerContext) -> PollerHandle {
        let id = PollerId::next();
        let cancel = ctx.cancel.child_token();
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();

        let inner = tokio::spawn(run_poller(
            id,
            target.clone(),
            ctx.clone(),
            cancel.clone(),
            commands_rx,
        ));
        let abort = inner.abort_handle();

        let terminations = ctx.terminations.clone();
        let task = tokio::spawn(async move {
            let cause = match inner.await {
                Ok(Ok(())) => return,
                Ok(Err(e)) => e,
                Err(e) if e.is_cancelled() => return,
                Err(e) => PollerError::Panicked {
                    message: panic_message(e),
                },
            };
            error!("{} terminated: {}", id, cause);
            if terminations.send(Termination { id, cause }).is_err() {
                debug!("No supervisor listening for termination of {}", id);
            }
        });

        PollerHandle {
            id,
            cache_file: target.cache_file(),
            target,
            commands: commands_tx,
            cancel,
            task,
            abort,
        }
    }

    async fn connect(
        id: PollerId,
        target: Arc<Target>,
        ctx: &PollerContext,
        cancel: CancellationToken,
    ) -> Result<Self, PollerError> {
        let api = ctx.apis.connect(target.credentials())?;
        let cache_file = target.cache_file();

        let seed = match load_seed(&cache_file)? {
            Some(seed) => {
                debug!("{} loaded seed with {} stack(s)", id, seed.len());
                seed
            }
            None => {
                info!("{} has no cache file; fetching baseline", id);
                let seed = fetch_state(api.as_ref()).await?;
                if let Err(e) = save_seed(&cache_file, &seed) {
                    warn!("{} could not persist baseline: {}", id, e);
                }
                seed
            }
        };

        Ok(Self {
            target,
            api,
            seed,
            cache_file,
            sinks: ctx.sinks.clone(),
            settings: ctx.settings.clone(),
            schedule: None,
            cancel,
        })
    }

    fn is_scheduled(&self) -> bool {
        self.schedule.is_some()
    }

    fn pause(&mut self) {
        if self.schedule.take().is_some() {
            info!("Polling paused for {}", self.target.cache_key());
        }
    }

    fn unpause(&mut self) {
        if self.schedule.is_some() {
            return;
        }
        let period = self.target.interval();
        let mut schedule = tokio::time::interval_at(Instant::now() + period, period);
        schedule.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.schedule = Some(schedule);
        info!(
            "Polling {} every {:?}",
            self.target.cache_key(),
            period
        );
    }

    /// Run one cycle. Errors are logged and followed by the recovery delay.
    async fn poll(&mut self) -> CycleOutcome {
        match self.cycle().await {
            Ok(sent) => {
                debug!("Cycle for {} sent {} event(s)", self.target.cache_key(), sent);
                CycleOutcome::Delivered(sent)
            }
            Err(e) => {
                error!(
                    cache_key = %self.target.cache_key(),
                    "Poll cycle failed: {}", e
                );
                tokio::select! {
                    _ = self.cancel.cancelled() => {}
                    _ = tokio::time::sleep(self.settings.recovery_delay) => {}
                }
                CycleOutcome::Failed(e.to_string())
            }
        }
    }

    /// fetch, diff, send, swap seed, persist
    async fn cycle(&mut self) -> Result<usize, PollerError> {
        let current = fetch_state(self.api.as_ref()).await?;
        let events = diff(&self.seed, &current);

        let destination = self.target.destination();
        for event in &events {
            let sink = self
                .sinks
                .resolve(destination)
                .ok_or_else(|| PollerError::SinkUnavailable {
                    name: destination.to_string(),
                })?;
            sink.transmit(event.to_record());
        }

        let previous = std::mem::replace(&mut self.seed, current);
        if let Err(e) = save_seed(&self.cache_file, &self.seed) {
            self.seed = previous;
            return Err(e.into());
        }
        Ok(events.len())
    }

    async fn handle(&mut self, command: Command) {
        match command {
            Command::Pause(ack) => {
                self.pause();
                let _ = ack.send(());
            }
            Command::Unpause(ack) => {
                self.unpause();
                let _ = ack.send(());
            }
            Command::PollNow(reply) => {
                let outcome = self.poll().await;
                let _ = reply.send(outcome);
            }
            Command::Status(reply) => {
                let _ = reply.send(PollerStatus {
                    scheduled: self.is_scheduled(),
                    seed_stacks: self.seed.len(),
                });
            }
        }
    }
}

async fn next_tick(schedule: &mut Option<Interval>) {
    match schedule {
        Some(interval) => {
            interval.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn run_poller(
    id: PollerId,
    target: Arc<Target>,
    ctx: PollerContext,
    cancel: CancellationToken,
    mut commands: mpsc::UnboundedReceiver<Command>,
) -> Result<(), PollerError> {
    let mut poller = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Ok(()),
        poller = Poller::connect(id, target, &ctx, cancel.clone()) => poller?,
    };

    if poller.target.auto_start() {
        poller.unpause();
    }
    info!("{} started for {}", id, poller.target.cache_key());

    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            command = commands.recv() => match command {
                Some(command) => poller.handle(command).await,
                None => break,
            },
            _ = next_tick(&mut poller.schedule) => {
                poller.poll().await;
            }
        }
    }

    debug!("{} stopped", id);
    Ok(())
}

fn panic_message(err: JoinError) -> String {
    match err.try_into_panic() {
        Ok(payload) => payload
            .downcast_ref::<&str>()
            .map(|s| s.to_string())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_string()),
        Err(err) => err.to_string(),
    }
}

/// Result of stopping a poller
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Clean,
    TimedOut,
}

/// Owner's handle to a running poller.
///
/// Dropping the handle stops the poller.
#[derive(Debug)]
pub struct PollerHandle {
    id: PollerId,
    target: Arc<Target>,
    cache_file: PathBuf,
    commands: mpsc::UnboundedSender<Command>,
    cancel: CancellationToken,
    task: JoinHandle<()>,
    abort: AbortHandle,
}

impl std::fmt::Debug for Command {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Command::Pause(_) => "Pause",
            Command::Unpause(_) => "Unpause",
            Command::PollNow(_) => "PollNow",
            Command::Status(_) => "Status",
        };
        f.write_str(name)
    }
}

impl PollerHandle {
    pub fn id(&self) -> PollerId {
        self.id
    }

    pub fn target(&self) -> &Arc<Target> {
        &self.target
    }

    pub fn cache_key(&self) -> &str {
        self.target.cache_key()
    }

    pub fn cache_file(&self) -> &Path {
        &self.cache_file
    }

    /// True once the poller task has exited, for whatever reason
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    async fn request<T>(&self, make: impl FnOnce(oneshot::Sender<T>) -> Command) -> Result<T, PollerError> {
        let (tx, rx) = oneshot::channel();
        self.commands
            .send(make(tx))
            .map_err(|_| PollerError::Shutdown)?;
        rx.await.map_err(|_| PollerError::Shutdown)
    }

    /// Stop scheduled polling.
    ///
    /// Waits for an in-flight cycle to finish; once this returns no further
    /// scheduled cycle runs until [`unpause`](Self::unpause).
    pub async fn pause(&self) -> Result<(), PollerError> {
        self.request(Command::Pause).await
    }

    /// Resume scheduled polling. No-op if already scheduled.
    pub async fn unpause(&self) -> Result<(), PollerError> {
        self.request(Command::Unpause).await
    }

    /// Run one cycle now, serialized with scheduled ticks.
    ///
    /// Runs even while paused; pausing only stops scheduled ticks, and the
    /// schedule stays off afterwards.
    pub async fn poll_now(&self) -> Result<CycleOutcome, PollerError> {
        self.request(Command::PollNow).await
    }

    pub async fn status(&self) -> Result<PollerStatus, PollerError> {
        self.request(Command::Status).await
    }

    /// Signal the poller to stop without waiting
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Cancel the poller and wait up to `timeout` for it to exit.
    ///
    /// A poller still running after `timeout` is aborted.
    pub async fn stop(mut self, timeout: Duration) -> StopOutcome {
        self.cancel.cancel();
        match tokio::time::timeout(timeout, &mut self.task).await {
            Ok(_) => StopOutcome::Clean,
            Err(_) => {
                self.abort.abort();
                StopOutcome::TimedOut
            }
        }
    }
}

impl Drop for PollerHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}
