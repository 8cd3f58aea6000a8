//! Periodic reporting of the server counters.
//!
//! Every period the reporter takes one [`Report`] from the
//! [`CounterSet`], which resets the interval counters, and hands that same
//! report to every observer. The first report is produced one full period
//! after [`Reporter::spawn`]; there is no report at time zero.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::counters::CounterSet;
use crate::observers::Observer;
use crate::snapshot::Report;

/// Drives the observers from a fixed-period timer.
pub struct Reporter {
    counters: Arc<CounterSet>,
    period: Duration,
    observers: Vec<Box<dyn Observer>>,
}

impl Reporter {
    /// Creates a reporter with no observers.
    pub fn new(counters: Arc<CounterSet>, period: Duration) -> Self {
        Self {
            counters,
            period,
            observers: Vec::new(),
        }
    }

    /// Adds an observer.
    pub fn with_observer(mut self, observer: impl Observer + 'static) -> Self {
        self.observers.push(Box::new(observer));
        self
    }

    /// Adds an already boxed observer.
    pub fn with_boxed_observer(mut self, observer: Box<dyn Observer>) -> Self {
        self.observers.push(observer);
        self
    }

    /// Number of registered observers.
    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Takes one report and fans it out.
    ///
    /// A failing observer is logged and skipped; the others still receive
    /// the report.
    pub fn tick(&self) -> Report {
        let report = self.counters.report().stamped_now();
        debug!(
            new = report.new,
            duplicate = report.duplicate,
            total = report.total,
            "reporting"
        );
        for observer in &self.observers {
            if let Err(e) = observer.observe(&report) {
                warn!(error = %e, "observer failed");
            }
        }
        report
    }

    /// Runs the reporter on the current runtime until the handle is aborted.
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.tick();
            }
        })
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter")
            .field("counters", &self.counters)
            .field("period", &self.period)
            .field("observers", &self.observers.len())
            .finish()
    }
}
