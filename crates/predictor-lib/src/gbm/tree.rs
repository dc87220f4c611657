//! Regression trees grown depth-first with exact greedy splits.

use ndarray::{Array2, ArrayView1};
use serde::{Deserialize, Serialize};

/// A node in the flat tree layout. Children are indices into the node vector.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: f64,
    },
}

/// A fitted regression tree. Rows with `x[feature] <= threshold` go left.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    nodes: Vec<Node>,
}

impl RegressionTree {
    pub fn predict_row(&self, row: ArrayView1<'_, f64>) -> f64 {
        let mut idx = 0;
        loop {
            match &self.nodes[idx] {
                Node::Leaf { value } => return *value,
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if row[*feature] <= *threshold {
                        *left
                    } else {
                        *right
                    };
                }
            }
        }
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn n_leaves(&self) -> usize {
        self.nodes
            .iter()
            .filter(|n| matches!(n, Node::Leaf { .. }))
            .count()
    }

    pub fn depth(&self) -> usize {
        fn walk(nodes: &[Node], idx: usize) -> usize {
            match &nodes[idx] {
                Node::Leaf { .. } => 0,
                Node::Split { left, right, .. } => 1 + walk(nodes, *left).max(walk(nodes, *right)),
            }
        }
        walk(&self.nodes, 0)
    }

    /// Overwrite a leaf value after the loss-specific line search
    pub(crate) fn set_leaf(&mut self, node: usize, value: f64) {
        if let Some(Node::Leaf { value: v }) = self.nodes.get_mut(node) {
            *v = value;
        }
    }
}

/// Growth limits for one tree
#[derive(Debug, Clone, Copy)]
pub(crate) struct TreeParams {
    pub max_depth: usize,
    pub min_samples_split: usize,
    pub min_samples_leaf: usize,
}

/// A leaf of a freshly grown tree and the training samples that reached it
pub(crate) struct LeafMembers {
    pub node: usize,
    pub samples: Vec<usize>,
}

struct SplitCandidate {
    feature: usize,
    threshold: f64,
    gain: f64,
}

/// Grows a single tree against fixed pseudo-residual targets
pub(crate) struct TreeBuilder<'a> {
    x: &'a Array2<f64>,
    targets: &'a [f64],
    params: TreeParams,
    feature_order: &'a [usize],
}

impl<'a> TreeBuilder<'a> {
    pub fn new(
        x: &'a Array2<f64>,
        targets: &'a [f64],
        params: TreeParams,
        feature_order: &'a [usize],
    ) -> Self {
        Self {
            x,
            targets,
            params,
            feature_order,
        }
    }

    pub fn build(&self, samples: Vec<usize>) -> (RegressionTree, Vec<LeafMembers>) {
        let mut nodes = Vec::new();
        let mut leaves = Vec::new();
        self.grow(&mut nodes, &mut leaves, samples, 0);
        (RegressionTree { nodes }, leaves)
    }

    fn grow(
        &self,
        nodes: &mut Vec<Node>,
        leaves: &mut Vec<LeafMembers>,
        samples: Vec<usize>,
        depth: usize,
    ) -> usize {
        let id = nodes.len();
        let mean = samples.iter().map(|&i| self.targets[i]).sum::<f64>() / samples.len() as f64;
        nodes.push(Node::Leaf { value: mean });

        let splittable =
            depth < self.params.max_depth && samples.len() >= self.params.min_samples_split;

        let split = if splittable {
            self.best_split(&samples)
        } else {
            None
        };

        if let Some(split) = split {
            let (left_samples, right_samples): (Vec<usize>, Vec<usize>) = samples
                .into_iter()
                .partition(|&i| self.x[[i, split.feature]] <= split.threshold);

            let left = self.grow(nodes, leaves, left_samples, depth + 1);
            let right = self.grow(nodes, leaves, right_samples, depth + 1);
            nodes[id] = Node::Split {
                feature: split.feature,
                threshold: split.threshold,
                left,
                right,
            };
            return id;
        }

        leaves.push(LeafMembers { node: id, samples });
        id
    }

    /// Best split by reduction in squared error. Among equal gains the first
    /// feature in `feature_order` wins.
    fn best_split(&self, samples: &[usize]) -> Option<SplitCandidate> {
        let n = samples.len();
        let total: f64 = samples.iter().map(|&i| self.targets[i]).sum();
        let total_sq: f64 = samples.iter().map(|&i| self.targets[i].powi(2)).sum();
        let parent_score = total * total / n as f64;

        // Pure node: nothing to gain
        if total_sq - parent_score <= 1e-12 * total_sq.max(1.0) {
            return None;
        }

        let min_leaf = self.params.min_samples_leaf.max(1);
        let mut best: Option<SplitCandidate> = None;
        let mut column: Vec<(f64, f64)> = Vec::with_capacity(n);

        for &feature in self.feature_order {
            column.clear();
            column.extend(
                samples
                    .iter()
                    .map(|&i| (self.x[[i, feature]], self.targets[i])),
            );
            column.sort_by(|a, b| a.0.total_cmp(&b.0));

            let mut sum_left = 0.0;
            for pos in 0..n - 1 {
                sum_left += column[pos].1;
                let n_left = pos + 1;
                let n_right = n - n_left;

                if column[pos].0 >= column[pos + 1].0 {
                    continue;
                }
                if n_left < min_leaf || n_right < min_leaf {
                    continue;
                }

                let sum_right = total - sum_left;
                let gain = sum_left * sum_left / n_left as f64
                    + sum_right * sum_right / n_right as f64
                    - parent_score;

                if gain > best.as_ref().map_or(0.0, |b| b.gain) {
                    let lo = column[pos].0;
                    let hi = column[pos + 1].0;
                    let mut threshold = lo / 2.0 + hi / 2.0;
                    if threshold >= hi || !threshold.is_finite() {
                        threshold = lo;
                    }
                    best = Some(SplitCandidate {
                        feature,
                        threshold,
                        gain,
                    });
                }
            }
        }

        best
    }
}
