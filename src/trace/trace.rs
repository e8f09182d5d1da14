use serde::Serialize;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::element::element_model::Locator;
use crate::heal::heal_model::{CandidateMatch, HealOutcome};

/// One JSONL line describing a heal attempt.
#[derive(Debug, Serialize)]
pub struct HealTraceEvent {
    pub timestamp_ms: u128,
    pub old_locator: String,
    pub outcome: &'static str,
    pub reason: Option<String>,
    pub healed_locator: Option<String>,
    pub distance: Option<f64>,
    pub tolerance: f64,
    pub snapshot_size: usize,
    pub neighbors: Vec<TraceNeighbor>,
}

#[derive(Debug, Serialize)]
pub struct TraceNeighbor {
    pub index: usize,
    pub distance: f64,
    pub locator: String,
}

impl From<&CandidateMatch> for TraceNeighbor {
    fn from(candidate: &CandidateMatch) -> Self {
        Self {
            index: candidate.index,
            distance: candidate.distance,
            locator: candidate.locator.to_string(),
        }
    }
}

impl HealTraceEvent {
    pub fn now(old_locator: &Locator, tolerance: f64) -> Self {
        Self {
            timestamp_ms: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map(|d| d.as_millis())
                .unwrap_or_default(),
            old_locator: old_locator.to_string(),
            outcome: "unmatched",
            reason: None,
            healed_locator: None,
            distance: None,
            tolerance,
            snapshot_size: 0,
            neighbors: vec![],
        }
    }

    pub fn with_outcome(mut self, outcome: &HealOutcome) -> Self {
        match outcome {
            HealOutcome::Healed(healed) => {
                self.outcome = "healed";
                self.healed_locator = Some(healed.locator.to_string());
                self.distance = Some(healed.distance);
            }
            HealOutcome::Unmatched(reason) => {
                self.outcome = "unmatched";
                self.reason = Some(reason.to_string());
                self.distance = reason.nearest_distance();
            }
        }
        self
    }

    pub fn with_snapshot_size(mut self, size: usize) -> Self {
        self.snapshot_size = size;
        self
    }

    pub fn with_neighbors(mut self, neighbors: &[CandidateMatch]) -> Self {
        self.neighbors = neighbors.iter().map(TraceNeighbor::from).collect();
        self
    }
}
