//! The accrual synchronization daemon.
//!
//! One logical worker walks the ledger's pending orders, asks the oracle
//! about each, and writes the answers back. Every wait and every oracle
//! request is raced against the cancellation token, so shutdown is prompt
//! and leaves each order at its last committed status.

use std::sync::Arc;
use std::time::Duration;

use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use loyalty_core::ledger::{LedgerError, LedgerStore};
use loyalty_core::orders::StatusUpdate;
use loyalty_shared::OrderNumber;
use loyalty_shared::config::AccrualConfig;

use crate::oracle::{AccrualInfo, AccrualOracle, OracleResponse};

/// Unrecoverable daemon failures.
#[derive(Debug, Error)]
pub enum DaemonError {
    /// The ledger store became unusable.
    #[error("ledger store failed: {0}")]
    Store(#[from] LedgerError),
}

/// Daemon timing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DaemonConfig {
    /// Pause between two cycles.
    pub poll_interval: Duration,
    /// Pause after the oracle reports an order it does not know yet.
    pub no_content_delay: Duration,
    /// Backoff for a 429 without a usable `Retry-After`.
    pub default_retry_after: Duration,
}

impl Default for DaemonConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(1),
            no_content_delay: Duration::from_secs(1),
            default_retry_after: Duration::from_secs(60),
        }
    }
}

impl From<&AccrualConfig> for DaemonConfig {
    fn from(config: &AccrualConfig) -> Self {
        Self {
            poll_interval: Duration::from_millis(config.poll_interval_ms),
            no_content_delay: Duration::from_secs(config.no_content_delay_secs),
            default_retry_after: Duration::from_secs(config.default_retry_after_secs),
        }
    }
}

/// Outcome counts for one pass over the pending orders.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    /// Orders whose status changed.
    pub applied: usize,
    /// Answers that changed nothing (already terminal or same status).
    pub unchanged: usize,
    /// Rate-limit responses received.
    pub rate_limited: usize,
    /// Orders the oracle did not know yet.
    pub deferred: usize,
    /// Orders skipped after an oracle or per-order store error.
    pub failed: usize,
}

impl CycleReport {
    /// Returns true if the cycle touched nothing.
    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.applied == 0
            && self.unchanged == 0
            && self.rate_limited == 0
            && self.deferred == 0
            && self.failed == 0
    }
}

/// Polls the oracle for every non-terminal order until cancelled.
pub struct AccrualDaemon {
    store: Arc<dyn LedgerStore>,
    oracle: Arc<dyn AccrualOracle>,
    config: DaemonConfig,
}

/// Sleeps for `duration` unless cancelled first. Returns false on cancel.
async fn pause(cancel: &CancellationToken, duration: Duration) -> bool {
    tokio::select! {
        () = cancel.cancelled() => false,
        () = sleep(duration) => true,
    }
}

impl AccrualDaemon {
    /// Creates a daemon over a shared store and oracle.
    pub fn new(
        store: Arc<dyn LedgerStore>,
        oracle: Arc<dyn AccrualOracle>,
        config: DaemonConfig,
    ) -> Self {
        Self {
            store,
            oracle,
            config,
        }
    }

    /// Runs cycles until `cancel` fires.
    ///
    /// Returns `Err` only when the store is unusable; every other failure is
    /// logged and the loop moves on.
    pub async fn start(&self, cancel: CancellationToken) -> Result<(), DaemonError> {
        info!(poll_interval = ?self.config.poll_interval, "Accrual daemon started");

        while !cancel.is_cancelled() {
            match self.run_cycle(&cancel).await {
                Ok(report) if report.is_idle() => debug!("Accrual cycle idle"),
                Ok(report) => info!(
                    applied = report.applied,
                    unchanged = report.unchanged,
                    rate_limited = report.rate_limited,
                    deferred = report.deferred,
                    failed = report.failed,
                    "Accrual cycle finished"
                ),
                Err(e) => {
                    error!(error = %e, "Accrual daemon stopping on fatal store error");
                    return Err(e);
                }
            }

            if !pause(&cancel, self.config.poll_interval).await {
                break;
            }
        }

        info!("Accrual daemon stopped");
        Ok(())
    }

    /// Makes one pass over the pending orders.
    pub async fn run_cycle(&self, cancel: &CancellationToken) -> Result<CycleReport, DaemonError> {
        let mut report = CycleReport::default();

        let pending = match self.store.pending_orders().await {
            Ok(pending) => pending,
            Err(e) if e.is_fatal() => return Err(e.into()),
            Err(e) => {
                warn!(error = %e, "Failed to load pending orders");
                report.failed += 1;
                return Ok(report);
            }
        };

        for number in pending {
            if cancel.is_cancelled() {
                break;
            }
            self.sync_order(number, cancel, &mut report).await?;
        }

        Ok(report)
    }

    async fn sync_order(
        &self,
        number: OrderNumber,
        cancel: &CancellationToken,
        report: &mut CycleReport,
    ) -> Result<(), DaemonError> {
        loop {
            let response = tokio::select! {
                () = cancel.cancelled() => return Ok(()),
                response = self.oracle.order_info(number) => response,
            };

            match response {
                Ok(OracleResponse::Resolved(info)) => return self.apply(number, &info, report).await,
                Ok(OracleResponse::RateLimited { retry_after }) => {
                    report.rate_limited += 1;
                    let delay = retry_after.unwrap_or(self.config.default_retry_after);
                    warn!(
                        order = %number,
                        retry_after_secs = delay.as_secs(),
                        "Oracle rate limit hit, pausing polling"
                    );
                    if !pause(cancel, delay).await {
                        return Ok(());
                    }
                }
                Ok(OracleResponse::NotRegistered) => {
                    report.deferred += 1;
                    debug!(order = %number, "Order not registered with the oracle yet");
                    pause(cancel, self.config.no_content_delay).await;
                    return Ok(());
                }
                Err(e) => {
                    report.failed += 1;
                    warn!(order = %number, error = %e, "Oracle query failed");
                    return Ok(());
                }
            }
        }
    }

    async fn apply(
        &self,
        number: OrderNumber,
        info: &AccrualInfo,
        report: &mut CycleReport,
    ) -> Result<(), DaemonError> {
        if info.order != number {
            report.failed += 1;
            warn!(order = %number, answered = %info.order, "Oracle answered for a different order");
            return Ok(());
        }

        let update = match StatusUpdate::from_oracle(info.status, info.accrual) {
            Ok(update) => update,
            Err(e) => {
                report.failed += 1;
                warn!(order = %number, error = %e, "Rejected oracle answer");
                return Ok(());
            }
        };

        match self.store.update_order_status(number, update).await {
            Ok(true) => {
                report.applied += 1;
                info!(
                    order = %number,
                    status = %update.status(),
                    accrual = ?update.accrual(),
                    resolved = update.status().is_terminal(),
                    "Order status updated"
                );
                Ok(())
            }
            Ok(false) => {
                report.unchanged += 1;
                Ok(())
            }
            Err(e) if e.is_fatal() => Err(e.into()),
            Err(e) => {
                report.failed += 1;
                warn!(order = %number, error = %e, "Failed to store order status");
                Ok(())
            }
        }
    }
}
