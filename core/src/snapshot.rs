//! Population snapshots: the append-only time series of aggregation runs.
//!
//! One snapshot is recorded per aggregation run. Snapshots are never
//! updated or removed; consumers read them in creation order.

use crate::{
    aggregation::PopulationSummary,
    error::RiskResult,
    types::SnapshotId,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PopulationSnapshot {
    pub snapshot_id: SnapshotId,
    pub created_at:  DateTime<Utc>,
    /// Master seed the run's risk streams were derived from.
    pub seed:        u64,
    pub summary:     PopulationSummary,
}

impl PopulationSnapshot {
    pub fn new(seed: u64, summary: PopulationSummary) -> Self {
        Self {
            snapshot_id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            seed,
            summary,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotLog {
    entries: Vec<PopulationSnapshot>,
}

impl SnapshotLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a snapshot. Creation times never move backwards within a log;
    /// a clock step back is clamped to the previous entry's time.
    pub fn append(&mut self, mut snapshot: PopulationSnapshot) -> &PopulationSnapshot {
        if let Some(last) = self.entries.last() {
            if snapshot.created_at < last.created_at {
                snapshot.created_at = last.created_at;
            }
        }
        log::debug!(
            "Snapshot {} recorded for {}",
            snapshot.snapshot_id,
            snapshot.summary.period
        );
        self.entries.push(snapshot);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[PopulationSnapshot] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&PopulationSnapshot> {
        self.entries.last()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_json(&self) -> RiskResult<String> {
        Ok(serde_json::to_string(self)?)
    }
}
