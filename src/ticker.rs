use crate::engine::{Reconciler, TickError, TickOutcome};
use log::{error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;

/// Runs reconciliation ticks, once or on a fixed period.
pub struct Ticker {
    reconciler: Arc<Reconciler>,
    period: Duration,
}

impl Ticker {
    pub fn new(reconciler: Arc<Reconciler>, period: Duration) -> Self {
        Self { reconciler, period }
    }

    /// One tick. Failures are logged and left for the next tick.
    pub async fn run_once(&self) -> Option<TickOutcome> {
        let result = self.reconciler.tick().await;
        log_result(self.reconciler.season(), &result);
        result.ok()
    }

    /// Tick now, then every `period` until the process stops.
    pub async fn run(self) {
        self.run_once().await;

        let mut ticks = interval(self.period);
        // Skip the immediate first tick; the start-up tick already ran.
        ticks.tick().await;

        loop {
            ticks.tick().await;
            if let Some(TickOutcome::Complete) = self.run_once().await {
                info!("season {} is complete, still watching", self.reconciler.season());
            }
        }
    }
}

fn log_result(season: u16, result: &Result<TickOutcome, TickError>) {
    match result {
        Ok(TickOutcome::Created) => info!("season {season}: tournament created"),
        Ok(TickOutcome::Wrote { writes }) => info!("season {season}: {writes} write(s) confirmed"),
        Ok(TickOutcome::Advanced) => info!("season {season}: round advanced"),
        Ok(TickOutcome::Idle { reason }) => info!("season {season}: idle, {reason}"),
        Ok(TickOutcome::Complete) => info!("season {season}: tournament complete"),
        Err(e @ (TickError::NotReady(_) | TickError::Feed(_))) => warn!("season {season}: {e}"),
        Err(e) => error!("season {season}: {e}"),
    }
}
