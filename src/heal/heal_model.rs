use std::fmt;

use crate::element::element_model::Locator;

/// One of the k nearest snapshot elements.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateMatch {
    /// Row in the page snapshot (document order)
    pub index: usize,
    pub distance: f64,
    pub locator: Locator,
}

/// A broken locator and the substitute chosen for it.
#[derive(Debug, Clone, PartialEq)]
pub struct HealedMatch {
    pub old_locator: Locator,
    pub locator: Locator,
    /// Distance between the recorded element and the chosen one
    pub distance: f64,
    /// All ranked candidates, nearest first
    pub neighbors: Vec<CandidateMatch>,
}

/// Why a heal attempt produced no substitute.
#[derive(Debug, Clone, PartialEq)]
pub enum UnmatchedReason {
    /// No success was ever recorded for the locator.
    NotRecorded,
    /// The current page produced no scanned elements.
    EmptyPage,
    EncodingFailed(String),
    SearchFailed(String),
    /// The nearest element is farther than the configured tolerance.
    AboveTolerance {
        distance: f64,
        tolerance: f64,
        neighbors: Vec<CandidateMatch>,
    },
}

impl UnmatchedReason {
    pub fn nearest_distance(&self) -> Option<f64> {
        match self {
            UnmatchedReason::AboveTolerance { distance, .. } => Some(*distance),
            _ => None,
        }
    }
}

impl fmt::Display for UnmatchedReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnmatchedReason::NotRecorded => write!(f, "locator was never recorded"),
            UnmatchedReason::EmptyPage => write!(f, "current page has no scanned elements"),
            UnmatchedReason::EncodingFailed(e) => write!(f, "encoding failed: {}", e),
            UnmatchedReason::SearchFailed(e) => write!(f, "neighbor search failed: {}", e),
            UnmatchedReason::AboveTolerance {
                distance,
                tolerance,
                ..
            } => write!(f, "nearest distance {} exceeds tolerance {}", distance, tolerance),
        }
    }
}

/// Result of one heal attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum HealOutcome {
    Healed(HealedMatch),
    Unmatched(UnmatchedReason),
}

impl HealOutcome {
    pub fn is_healed(&self) -> bool {
        matches!(self, HealOutcome::Healed(_))
    }

    /// The substitute locator, if any.
    pub fn into_locator(self) -> Option<Locator> {
        match self {
            HealOutcome::Healed(healed) => Some(healed.locator),
            HealOutcome::Unmatched(_) => None,
        }
    }

    /// Ranked candidates considered by the attempt, empty when the search never ran.
    pub fn neighbors(&self) -> &[CandidateMatch] {
        match self {
            HealOutcome::Healed(healed) => &healed.neighbors,
            HealOutcome::Unmatched(UnmatchedReason::AboveTolerance { neighbors, .. }) => neighbors,
            HealOutcome::Unmatched(_) => &[],
        }
    }
}
