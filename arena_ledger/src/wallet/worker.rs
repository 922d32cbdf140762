//! Background settlement loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{Notify, watch};
use tokio::task::JoinHandle;

use super::settlement::SettlementProcessor;

/// Polls for approved entries and settles them
pub struct SettlementWorker {
    processor: Arc<SettlementProcessor>,
    poll_interval: Duration,
    batch_size: usize,
    wake: Arc<Notify>,
}

impl SettlementWorker {
    pub fn new(
        processor: Arc<SettlementProcessor>,
        poll_interval: Duration,
        batch_size: usize,
        wake: Arc<Notify>,
    ) -> Self {
        Self {
            processor,
            poll_interval,
            batch_size,
            wake,
        }
    }

    /// Run until `shutdown` becomes `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        log::info!(
            "Settlement worker started (interval {:?}, batch {})",
            self.poll_interval,
            self.batch_size
        );

        loop {
            tokio::select! {
                _ = ticker.tick() => {}
                _ = self.wake.notified() => {}
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
            }

            match self.processor.settle_pending(self.batch_size).await {
                Ok(report) if report.scanned > 0 => {
                    log::info!(
                        "Settlement scan: {} scanned, {} applied, {} skipped, {} failed",
                        report.scanned,
                        report.applied,
                        report.skipped,
                        report.failed
                    );
                }
                Ok(_) => {}
                Err(e) => log::error!("Settlement scan failed: {}", e),
            }
        }

        log::info!("Settlement worker stopped");
    }

    /// Spawn onto the current tokio runtime
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}
