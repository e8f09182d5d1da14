use ndarray::{Array1, ArrayView1, ArrayView2, Axis};

use crate::matcher::neighbors::{Neighbor, euclidean};

/// Points per leaf before a node is split.
const LEAF_SIZE: usize = 8;

/// Slack on the pruning bound so rounding never discards an exact tie.
const PRUNE_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone)]
struct Node {
    /// Range into `BallTree::indices`
    start: usize,
    end: usize,
    centroid: Array1<f64>,
    radius: f64,
    children: Option<(usize, usize)>,
}

/// Exact k-nearest-neighbor index over the rows of a matrix.
///
/// Each node bounds its points by a ball around their centroid; a subtree is
/// skipped once its ball cannot hold anything closer than the current k-th
/// candidate.
#[derive(Debug, Clone)]
pub struct BallTree {
    nodes: Vec<Node>,
    indices: Vec<usize>,
}

impl BallTree {
    pub fn build(data: ArrayView2<'_, f64>) -> Self {
        let mut tree = BallTree {
            nodes: Vec::new(),
            indices: (0..data.nrows()).collect(),
        };
        if data.nrows() > 0 {
            tree.build_node(data, 0, data.nrows());
        }
        tree
    }

    fn build_node(&mut self, data: ArrayView2<'_, f64>, start: usize, end: usize) -> usize {
        let members = &self.indices[start..end];
        let rows = data.select(Axis(0), members);
        let centroid = rows
            .mean_axis(Axis(0))
            .unwrap_or_else(|| Array1::zeros(data.ncols()));
        let radius = rows
            .rows()
            .into_iter()
            .map(|row| euclidean(row, centroid.view()))
            .fold(0.0, f64::max);

        let id = self.nodes.len();
        self.nodes.push(Node {
            start,
            end,
            centroid,
            radius,
            children: None,
        });

        if end - start <= LEAF_SIZE {
            return id;
        }

        // Split on the dimension with the widest spread
        let mut split_dim = 0;
        let mut widest = 0.0;
        for (dim, column) in rows.columns().into_iter().enumerate() {
            let lo = column.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = column.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            if hi - lo > widest {
                widest = hi - lo;
                split_dim = dim;
            }
        }
        if widest == 0.0 {
            // All points identical
            return id;
        }

        self.indices[start..end].sort_by(|&a, &b| {
            data[[a, split_dim]]
                .total_cmp(&data[[b, split_dim]])
                .then(a.cmp(&b))
        });
        let mid = start + (end - start) / 2;
        let left = self.build_node(data, start, mid);
        let right = self.build_node(data, mid, end);
        self.nodes[id].children = Some((left, right));
        id
    }

    /// The `k` rows closest to `query`, ordered by (distance, row index).
    pub fn query(&self, data: ArrayView2<'_, f64>, query: ArrayView1<'_, f64>, k: usize) -> Vec<Neighbor> {
        let mut best = Vec::with_capacity(k + 1);
        if !self.nodes.is_empty() && k > 0 {
            self.search(0, data, query, k, &mut best);
        }
        best
    }

    fn search(
        &self,
        node_id: usize,
        data: ArrayView2<'_, f64>,
        query: ArrayView1<'_, f64>,
        k: usize,
        best: &mut Vec<Neighbor>,
    ) {
        let node = &self.nodes[node_id];
        let lower_bound = (euclidean(query, node.centroid.view()) - node.radius).max(0.0);
        if best.len() == k {
            if let Some(worst) = best.last() {
                if lower_bound > worst.distance + PRUNE_EPSILON {
                    return;
                }
            }
        }

        match node.children {
            None => {
                for &index in &self.indices[node.start..node.end] {
                    let distance = euclidean(query, data.row(index));
                    offer(best, k, Neighbor { index, distance });
                }
            }
            Some((left, right)) => {
                let dl = euclidean(query, self.nodes[left].centroid.view());
                let dr = euclidean(query, self.nodes[right].centroid.view());
                let (first, second) = if dl <= dr { (left, right) } else { (right, left) };
                self.search(first, data, query, k, best);
                self.search(second, data, query, k, best);
            }
        }
    }
}

/// Insert a candidate into a sorted best-k list.
pub(crate) fn offer(best: &mut Vec<Neighbor>, k: usize, candidate: Neighbor) {
    let at = best.partition_point(|n| n.rank_cmp(&candidate).is_lt());
    if at >= k {
        return;
    }
    best.insert(at, candidate);
    best.truncate(k);
}
