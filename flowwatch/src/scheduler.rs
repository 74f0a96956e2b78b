use chrono::NaiveDateTime;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, instrument};

use crate::calendar::{self, GateDecision, GateState};
use crate::clock::Clock;
use crate::collector::SnapshotCollector;
use crate::errors::HarvestError;
use crate::history::HistoryStore;
use crate::snapshot::Snapshot;

/// What one pass of the loop did.
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// The window was closed; slept until it reopens.
    Waited {
        state: GateState,
        until: NaiveDateTime,
    },
    /// Collected and persisted a snapshot, then slept the collection interval.
    Collected { snapshot: Snapshot, records: usize },
}

/// Drives gate check → wait or collect/append → interval, forever.
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    collector: SnapshotCollector,
    store: HistoryStore,
    interval: Duration,
}

impl Scheduler {
    pub fn new(
        clock: Arc<dyn Clock>,
        collector: SnapshotCollector,
        store: HistoryStore,
        interval: Duration,
    ) -> Self {
        Self {
            clock,
            collector,
            store,
            interval,
        }
    }

    #[instrument(level = "debug", skip(self))]
    pub async fn tick(&mut self) -> Result<Tick, HarvestError> {
        let now = self.clock.now();
        match calendar::decide(now) {
            GateDecision::Closed { state, resume_at } => {
                info!(%state, %now, %resume_at, "Outside trading window, waiting");
                self.clock.sleep_until(resume_at).await;
                Ok(Tick::Waited {
                    state,
                    until: resume_at,
                })
            }
            GateDecision::Open => {
                let snapshot = self.collector.collect().await?;
                let records = self.store.append(&snapshot)?;
                info!(
                    entry = %serde_json::to_string(&snapshot)?,
                    records,
                    path = %self.store.path().display(),
                    "Appended snapshot"
                );
                self.clock.sleep(self.interval).await;
                Ok(Tick::Collected { snapshot, records })
            }
        }
    }

    /// Loop until an error surfaces. Never returns `Ok`.
    pub async fn run(&mut self) -> Result<(), HarvestError> {
        info!(
            clock = self.clock.name(),
            interval = ?self.interval,
            points = self.collector.points().len(),
            "Scheduler started"
        );
        loop {
            self.tick().await?;
        }
    }

    /// Release the browser session.
    pub async fn shutdown(self) -> Result<(), HarvestError> {
        info!("Releasing browser session");
        self.collector.into_session().close().await
    }
}
