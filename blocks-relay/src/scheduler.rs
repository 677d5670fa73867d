use std::time::Duration;

use async_trait::async_trait;
use tokio::time::{Interval, MissedTickBehavior};

/// Paces the poll loop. The loop runs one cycle per tick and stops when `tick` returns `false`.
#[async_trait]
pub trait Scheduler: Send {
    async fn tick(&mut self) -> bool;
}

/// Ticks on a fixed period, forever. The first tick completes immediately.
pub struct IntervalScheduler {
    interval: Interval,
}

impl IntervalScheduler {
    pub fn new(period: Duration) -> Self {
        let mut interval = tokio::time::interval(period);
        // A cycle that overruns the period swallows the ticks it missed instead of bursting.
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        Self { interval }
    }
}

#[async_trait]
impl Scheduler for IntervalScheduler {
    async fn tick(&mut self) -> bool {
        self.interval.tick().await;
        true
    }
}
