//! Graceful shutdown coordination for pollers

use crate::poller::{PollerHandle, StopOutcome};
use std::time::Duration;
use tracing::{debug, info, warn};

/// What happened to each poller during shutdown
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownSummary {
    pub clean: usize,
    pub timed_out: usize,
}

/// Stop every poller.
///
/// All pollers are signalled first, then each one is awaited for at most
/// `shutdown_timeout`. A poller that overruns is aborted and counted in
/// [`ShutdownSummary::timed_out`]; shutdown continues with the rest.
pub async fn graceful_shutdown(
    pollers: Vec<PollerHandle>,
    shutdown_timeout: Duration,
) -> ShutdownSummary {
    info!(
        "Beginning graceful shutdown of {} poller(s) (timeout: {:?})",
        pollers.len(),
        shutdown_timeout
    );

    for poller in &pollers {
        poller.cancel();
    }

    let mut summary = ShutdownSummary::default();
    for poller in pollers {
        let id = poller.id();
        match poller.stop(shutdown_timeout).await {
            StopOutcome::Clean => {
                debug!("{} shut down cleanly", id);
                summary.clean += 1;
            }
            StopOutcome::TimedOut => {
                warn!("{} shutdown timed out after {:?}", id, shutdown_timeout);
                summary.timed_out += 1;
            }
        }
    }

    info!(
        "Graceful shutdown complete: {} clean, {} timeout",
        summary.clean, summary.timed_out
    );
    summary
}
