use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::matcher::ball_tree::{BallTree, offer};

/// Below this many rows `Auto` scans linearly instead of building a tree.
const AUTO_BRUTE_THRESHOLD: usize = 32;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum MatchError {
    #[error("no candidates to search")]
    EmptyIndex,

    #[error("query has {found} dimensions, index has {expected}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("at least one neighbor must be requested")]
    ZeroNeighbors,
}

// ============================================================================
// Search algorithm selection
// ============================================================================

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SearchAlgorithm {
    #[default]
    Auto,
    BallTree,
    Brute,
}

impl fmt::Display for SearchAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SearchAlgorithm::Auto => "auto",
            SearchAlgorithm::BallTree => "ball_tree",
            SearchAlgorithm::Brute => "brute",
        })
    }
}

impl FromStr for SearchAlgorithm {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "auto" => Ok(SearchAlgorithm::Auto),
            "ball_tree" => Ok(SearchAlgorithm::BallTree),
            "brute" => Ok(SearchAlgorithm::Brute),
            other => Err(format!(
                "unknown algorithm '{}' (expected auto, ball_tree or brute)",
                other
            )),
        }
    }
}

// ============================================================================
// Neighbors
// ============================================================================

/// A snapshot row and its distance to the query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Neighbor {
    pub index: usize,
    pub distance: f64,
}

impl Neighbor {
    /// Closer first; equal distances fall back to document order.
    pub fn rank_cmp(&self, other: &Neighbor) -> Ordering {
        self.distance
            .total_cmp(&other.distance)
            .then(self.index.cmp(&other.index))
    }
}

pub fn euclidean(a: ArrayView1<'_, f64>, b: ArrayView1<'_, f64>) -> f64 {
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| (x - y) * (x - y))
        .sum::<f64>()
        .sqrt()
}

/// Accept a candidate at `distance` under `tolerance`. Inclusive.
pub fn accepts(distance: f64, tolerance: f64) -> bool {
    distance <= tolerance
}

#[derive(Debug, Clone)]
enum SearchIndex {
    Brute,
    BallTree(BallTree),
}

/// k-nearest-neighbor search over the rows of an encoded snapshot.
#[derive(Debug, Clone)]
pub struct NearestNeighbors<'a> {
    data: ArrayView2<'a, f64>,
    index: SearchIndex,
}

impl<'a> NearestNeighbors<'a> {
    pub fn fit(data: ArrayView2<'a, f64>, algorithm: SearchAlgorithm) -> Result<Self, MatchError> {
        if data.nrows() == 0 {
            return Err(MatchError::EmptyIndex);
        }
        let use_tree = match algorithm {
            SearchAlgorithm::Brute => false,
            SearchAlgorithm::BallTree => true,
            SearchAlgorithm::Auto => data.nrows() >= AUTO_BRUTE_THRESHOLD,
        };
        let index = if use_tree {
            SearchIndex::BallTree(BallTree::build(data))
        } else {
            SearchIndex::Brute
        };
        debug!(rows = data.nrows(), %algorithm, tree = use_tree, "neighbor index built");
        Ok(Self { data, index })
    }

    /// The `k` closest rows (fewer if the index is smaller), ordered by
    /// distance then row index.
    pub fn kneighbors(&self, query: ArrayView1<'_, f64>, k: usize) -> Result<Vec<Neighbor>, MatchError> {
        if k == 0 {
            return Err(MatchError::ZeroNeighbors);
        }
        if query.len() != self.data.ncols() {
            return Err(MatchError::DimensionMismatch {
                expected: self.data.ncols(),
                found: query.len(),
            });
        }
        let k = k.min(self.data.nrows());

        let neighbors = match &self.index {
            SearchIndex::Brute => {
                let mut best = Vec::with_capacity(k + 1);
                for (index, row) in self.data.rows().into_iter().enumerate() {
                    offer(&mut best, k, Neighbor {
                        index,
                        distance: euclidean(query, row),
                    });
                }
                best
            }
            SearchIndex::BallTree(tree) => tree.query(self.data, query, k),
        };
        Ok(neighbors)
    }
}

/// Result of one nearest-neighbor lookup.
#[derive(Debug, Clone, PartialEq)]
pub struct NeighborSearch {
    /// Ranked neighbors; only the first is a healing candidate
    pub neighbors: Vec<Neighbor>,
}

impl NeighborSearch {
    pub fn nearest(&self) -> Option<Neighbor> {
        self.neighbors.first().copied()
    }
}

/// Search `snapshot` for the rows nearest `query`, with `k` clamped to the
/// number of rows.
pub fn find_nearest(
    snapshot: ArrayView2<'_, f64>,
    query: ArrayView1<'_, f64>,
    k: usize,
    algorithm: SearchAlgorithm,
) -> Result<NeighborSearch, MatchError> {
    let index = NearestNeighbors::fit(snapshot, algorithm)?;
    let k = k.min(snapshot.nrows());
    let neighbors = index.kneighbors(query, k)?;
    info!(
        indexes = ?neighbors.iter().map(|n| n.index).collect::<Vec<_>>(),
        distances = ?neighbors.iter().map(|n| n.distance).collect::<Vec<_>>(),
        "similar elements found"
    );
    Ok(NeighborSearch { neighbors })
}
