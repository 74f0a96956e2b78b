use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::clock::Clock;
use crate::errors::HarvestError;
use crate::session::ExtractionSession;
use crate::snapshot::{ChartPoint, Snapshot};

/// Runs one collection cycle over a fixed, ordered set of chart points.
pub struct SnapshotCollector {
    session: ExtractionSession,
    points: Vec<ChartPoint>,
    clock: Arc<dyn Clock>,
}

impl SnapshotCollector {
    pub fn new(session: ExtractionSession, points: Vec<ChartPoint>, clock: Arc<dyn Clock>) -> Self {
        Self {
            session,
            points,
            clock,
        }
    }

    pub fn points(&self) -> &[ChartPoint] {
        &self.points
    }

    /// Hover every point in order and assemble a snapshot stamped with the
    /// time of invocation. The first failing hover aborts the whole cycle.
    #[instrument(level = "debug", skip(self))]
    pub async fn collect(&mut self) -> Result<Snapshot, HarvestError> {
        let taken_at = self.clock.now();
        let mut data = BTreeMap::new();

        for point in &self.points {
            debug!(%point, "Hovering");
            let tooltip = self.session.hover_and_read(*point).await?;
            data.insert(point.key(), tooltip);
        }

        Ok(Snapshot::new(taken_at, data))
    }

    /// Give the browser session back, e.g. to release it on shutdown.
    pub fn into_session(self) -> ExtractionSession {
        self.session
    }
}
