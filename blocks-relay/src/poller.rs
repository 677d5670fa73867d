use blocks_common::metrics::{gauge, inc, timing_guard};
use blocks_common::policy::Classify;
use blocks_common::record::Checkpoint;
use tracing::{debug, error, info, warn};

use crate::app_context::AppContext;
use crate::error::SourceError;
use crate::metrics_consts::*;
use crate::scheduler::Scheduler;

/// What a single poll cycle did. The poller reports its own metrics, this is mostly for tests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub fetched: usize,
    pub delivered: usize,
    pub failed_deliveries: usize,
    pub failed_saves: usize,
    pub checkpoint: Checkpoint,
}

/// Polls the block report from the current checkpoint and relays what it finds.
///
/// The checkpoint lives here and nowhere else: it is advanced record by record and persisted
/// every time it moves, so an abrupt exit only loses notifications that were never sent.
pub struct Poller<'a> {
    context: &'a AppContext,
    checkpoint: Checkpoint,
}

impl<'a> Poller<'a> {
    pub fn new(context: &'a AppContext, checkpoint: Checkpoint) -> Self {
        Self {
            context,
            checkpoint,
        }
    }

    pub fn checkpoint(&self) -> Checkpoint {
        self.checkpoint
    }

    /// Run one cycle: fetch everything at or after the checkpoint, notify each record and move
    /// the checkpoint past it.
    ///
    /// A failed fetch leaves the checkpoint untouched. Failed deliveries and failed saves are
    /// logged and counted but never stop the checkpoint from advancing.
    pub async fn poll_once(&mut self) -> Result<CycleReport, SourceError> {
        debug!(checkpoint = %self.checkpoint, "fetching block report");
        let records = self
            .context
            .source
            .fetch_since(self.checkpoint.value())
            .await?;

        inc(RECORDS_FETCHED, &[], records.len() as u64);

        let mut report = CycleReport {
            fetched: records.len(),
            delivered: 0,
            failed_deliveries: 0,
            failed_saves: 0,
            checkpoint: self.checkpoint,
        };

        for record in &records {
            match self.context.notifier.notify(record).await {
                Ok(()) => {
                    report.delivered += 1;
                    inc(DELIVERIES, &[], 1);
                    info!(created = record.created, email = %record.email, "relayed block");
                }
                Err(e) => {
                    report.failed_deliveries += 1;
                    inc(DELIVERY_FAILURES, &[], 1);
                    error!(
                        created = record.created,
                        email = %record.email,
                        policy = %e.policy(),
                        "failed to relay block: {}",
                        e
                    );
                }
            }

            if !self.checkpoint.advance_past(record.created) {
                continue;
            }

            gauge(CHECKPOINT, &[], self.checkpoint.value() as f64);
            if let Err(e) = self.context.store.save(self.checkpoint.value()).await {
                report.failed_saves += 1;
                inc(CHECKPOINT_SAVE_FAILURES, &[], 1);
                error!(
                    checkpoint = %self.checkpoint,
                    policy = %e.policy(),
                    "failed to persist checkpoint, a restart may relay blocks again: {}",
                    e
                );
            }
        }

        report.checkpoint = self.checkpoint;
        Ok(report)
    }

    /// Run a cycle on every tick of `scheduler`, until it stops ticking.
    pub async fn run<S: Scheduler>(&mut self, scheduler: &mut S) {
        while scheduler.tick().await {
            self.run_cycle().await;
            self.context.poller_liveness.report_healthy();
        }
    }

    async fn run_cycle(&mut self) {
        let _cycle_time = timing_guard(CYCLE_TIME, &[]);
        inc(CYCLE_STARTS, &[], 1);

        let result = self.poll_once().await;

        inc(CYCLE_ENDS, &[], 1);
        match result {
            Ok(report) => {
                if report.fetched > 0 {
                    info!(
                        fetched = report.fetched,
                        failed_deliveries = report.failed_deliveries,
                        checkpoint = %report.checkpoint,
                        "poll cycle complete"
                    );
                }
            }
            Err(e) => {
                inc(FETCH_FAILURES, &[], 1);
                warn!(
                    checkpoint = %self.checkpoint,
                    policy = %e.policy(),
                    "failed to fetch block report, retrying on the next tick: {}",
                    e
                );
            }
        }
    }
}
