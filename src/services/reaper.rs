//! Periodic release of expired reservations.

use metrics::{counter, histogram};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use super::reservations::{CleanupResult, InventoryReservationService};
use crate::context::CallContext;
use crate::errors::ServiceError;

/// Runs [`InventoryReservationService::clean_expired_reservations`] on a fixed interval.
///
/// Cancelling the token stops the loop. A sweep in progress stops between
/// reservations; every release it already committed stands.
#[derive(Clone)]
pub struct ExpirationReaper {
    reservations: InventoryReservationService,
    interval: Duration,
}

impl ExpirationReaper {
    pub fn new(reservations: InventoryReservationService, interval: Duration) -> Self {
        Self {
            reservations,
            interval,
        }
    }

    /// Sweeps immediately, then once per interval, until `token` is cancelled.
    pub async fn run(self, token: CancellationToken) {
        info!(interval = ?self.interval, "Starting expiration reaper");

        let mut ticker = tokio::time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => break,
                _ = ticker.tick() => {}
            }

            self.sweep_once(&CallContext::with_token(token.child_token()))
                .await;
        }

        info!("Expiration reaper stopped");
    }

    /// One sweep. Errors are logged and swallowed so the loop keeps going.
    pub async fn sweep_once(&self, ctx: &CallContext) -> Option<CleanupResult> {
        let start = Instant::now();
        counter!("inventory.reaper.sweeps", 1);

        let result = self.reservations.clean_expired_reservations(ctx).await;
        histogram!("inventory.reaper.sweep_duration", start.elapsed());

        match result {
            Ok(result) => {
                if result.failed_count > 0 {
                    warn!(
                        failed_count = result.failed_count,
                        "Some expired reservations could not be released; retrying next sweep"
                    );
                }
                Some(result)
            }
            Err(ServiceError::Cancelled) => None,
            Err(e) => {
                counter!("inventory.reaper.sweep_errors", 1);
                error!(error = %e, "Expired reservation sweep failed");
                None
            }
        }
    }

    /// Starts the reaper on the current runtime.
    pub fn spawn(self) -> ReaperHandle {
        let token = CancellationToken::new();
        let task = tokio::spawn(self.run(token.clone()));
        ReaperHandle { token, task }
    }
}

/// Owner of a running reaper.
pub struct ReaperHandle {
    token: CancellationToken,
    task: JoinHandle<()>,
}

impl ReaperHandle {
    pub fn cancellation_token(&self) -> CancellationToken {
        self.token.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Stops the reaper and waits for any in-flight sweep to finish.
    pub async fn shutdown(self) {
        self.token.cancel();
        if let Err(e) = self.task.await {
            error!(error = %e, "Expiration reaper task panicked");
        }
    }
}
