//! Gradient-boosted regression trees
//!
//! Each stage fits a depth-limited regression tree to the pseudo-residuals of
//! the current ensemble, replaces its leaf values with the loss-optimal
//! constant, and adds it scaled by the learning rate. All randomness (row
//! subsampling, feature visit order) flows from one seeded ChaCha stream, so
//! identical inputs and seed give bit-identical trees.

mod loss;
mod tree;

pub use loss::LossKind;
pub use tree::{Node, RegressionTree};

use crate::error::{PredictorError, Result};
use ndarray::Array2;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};
use tracing::debug;
use tree::{TreeBuilder, TreeParams};

/// Seed used when none is configured
pub const DEFAULT_RANDOM_SEED: u64 = 42;

/// Stages between training-loss debug events
const LOG_EVERY: usize = 50;

/// Hyperparameters of the boosted ensemble
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoostingParams {
    #[serde(default = "default_learning_rate")]
    pub learning_rate: f64,
    #[serde(default = "default_n_estimators")]
    pub n_estimators: usize,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub loss: LossKind,
    /// Fraction of rows drawn (without replacement) per stage
    #[serde(default = "default_subsample")]
    pub subsample: f64,
    #[serde(default = "default_min_samples_split")]
    pub min_samples_split: usize,
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: usize,
    #[serde(default = "default_random_seed")]
    pub random_seed: u64,
}

fn default_learning_rate() -> f64 {
    0.01
}

fn default_n_estimators() -> usize {
    300
}

fn default_max_depth() -> usize {
    5
}

fn default_subsample() -> f64 {
    1.0
}

fn default_min_samples_split() -> usize {
    2
}

fn default_min_samples_leaf() -> usize {
    1
}

fn default_random_seed() -> u64 {
    DEFAULT_RANDOM_SEED
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            learning_rate: default_learning_rate(),
            n_estimators: default_n_estimators(),
            max_depth: default_max_depth(),
            loss: LossKind::default(),
            subsample: default_subsample(),
            min_samples_split: default_min_samples_split(),
            min_samples_leaf: default_min_samples_leaf(),
            random_seed: default_random_seed(),
        }
    }
}

impl BoostingParams {
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(PredictorError::Configuration(msg));

        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return invalid(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            ));
        }
        if self.n_estimators == 0 {
            return invalid("n_estimators must be at least 1".to_string());
        }
        if self.max_depth == 0 {
            return invalid("max_depth must be at least 1".to_string());
        }
        if !(self.subsample > 0.0 && self.subsample <= 1.0) {
            return invalid(format!("subsample must be in (0, 1], got {}", self.subsample));
        }
        if self.min_samples_split < 2 {
            return invalid(format!(
                "min_samples_split must be at least 2, got {}",
                self.min_samples_split
            ));
        }
        if self.min_samples_leaf == 0 {
            return invalid("min_samples_leaf must be at least 1".to_string());
        }
        Ok(())
    }

    fn tree_params(&self) -> TreeParams {
        TreeParams {
            max_depth: self.max_depth,
            min_samples_split: self.min_samples_split,
            min_samples_leaf: self.min_samples_leaf,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Ensemble {
    init: f64,
    n_features: usize,
    trees: Vec<RegressionTree>,
    /// Mean training loss after each stage
    train_loss: Vec<f64>,
}

/// Gradient-boosted decision-tree regressor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradientBoostingRegressor {
    params: BoostingParams,
    fitted: Option<Ensemble>,
}

impl GradientBoostingRegressor {
    pub fn new(params: BoostingParams) -> Result<Self> {
        params.validate()?;
        Ok(Self {
            params,
            fitted: None,
        })
    }

    pub fn params(&self) -> &BoostingParams {
        &self.params
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    pub fn n_trees(&self) -> usize {
        self.fitted.as_ref().map_or(0, |e| e.trees.len())
    }

    pub fn trees(&self) -> &[RegressionTree] {
        self.fitted
            .as_ref()
            .map(|e| e.trees.as_slice())
            .unwrap_or(&[])
    }

    /// Per-stage mean training loss of the last fit
    pub fn train_loss(&self) -> &[f64] {
        self.fitted
            .as_ref()
            .map(|e| e.train_loss.as_slice())
            .unwrap_or(&[])
    }

    /// Fit the ensemble. On error the regressor is left unchanged.
    pub fn fit(&mut self, x: &Array2<f64>, y: &[f64]) -> Result<()> {
        let (n_rows, n_features) = x.dim();
        if n_rows == 0 || n_features == 0 {
            return Err(PredictorError::Training(format!(
                "cannot fit on a {}x{} feature matrix",
                n_rows, n_features
            )));
        }
        if n_rows != y.len() {
            return Err(PredictorError::Training(format!(
                "feature matrix has {} rows but {} targets were given",
                n_rows,
                y.len()
            )));
        }
        if let Some(((row, col), v)) = x.indexed_iter().find(|(_, v)| !v.is_finite()) {
            return Err(PredictorError::Training(format!(
                "non-finite feature value {} at row {}, column {}",
                v, row, col
            )));
        }
        if let Some((row, v)) = y.iter().enumerate().find(|(_, v)| !v.is_finite()) {
            return Err(PredictorError::Training(format!(
                "non-finite target {} at row {}",
                v, row
            )));
        }

        let params = self.params;
        let loss = params.loss;
        let mut rng = ChaCha8Rng::seed_from_u64(params.random_seed);

        let init = loss.init_estimate(y);
        let mut raw = vec![init; n_rows];
        let mut gradient = vec![0.0; n_rows];
        let mut trees = Vec::with_capacity(params.n_estimators);
        let mut train_loss = Vec::with_capacity(params.n_estimators);
        let n_sampled = ((params.subsample * n_rows as f64) as usize).clamp(1, n_rows);

        for stage in 0..params.n_estimators {
            loss.negative_gradient(y, &raw, &mut gradient);

            let samples: Vec<usize> = if n_sampled < n_rows {
                let mut drawn = rand::seq::index::sample(&mut rng, n_rows, n_sampled).into_vec();
                drawn.sort_unstable();
                drawn
            } else {
                (0..n_rows).collect()
            };

            let mut feature_order: Vec<usize> = (0..n_features).collect();
            feature_order.shuffle(&mut rng);

            let builder = TreeBuilder::new(x, &gradient, params.tree_params(), &feature_order);
            let (mut tree, leaves) = builder.build(samples);

            for leaf in leaves {
                let mut residuals: Vec<f64> =
                    leaf.samples.iter().map(|&i| y[i] - raw[i]).collect();
                tree.set_leaf(leaf.node, loss.leaf_value(&mut residuals));
            }

            for (i, row) in x.rows().into_iter().enumerate() {
                raw[i] += params.learning_rate * tree.predict_row(row);
            }

            let stage_loss = loss.loss(y, &raw);
            if !stage_loss.is_finite() {
                return Err(PredictorError::Training(format!(
                    "training loss diverged at stage {}",
                    stage
                )));
            }
            if (stage + 1) % LOG_EVERY == 0 {
                debug!(stage = stage + 1, loss = stage_loss, "Boosting progress");
            }

            train_loss.push(stage_loss);
            trees.push(tree);
        }

        self.fitted = Some(Ensemble {
            init,
            n_features,
            trees,
            train_loss,
        });
        Ok(())
    }

    /// Predict one value per row of `x`
    pub fn predict(&self, x: &Array2<f64>) -> Result<Vec<f64>> {
        let ensemble = self.fitted.as_ref().ok_or_else(|| {
            PredictorError::Prediction("regressor has not been fitted".to_string())
        })?;

        if x.ncols() != ensemble.n_features {
            return Err(PredictorError::Prediction(format!(
                "expected {} features, got {}",
                ensemble.n_features,
                x.ncols()
            )));
        }

        let lr = self.params.learning_rate;
        Ok(x.rows()
            .into_iter()
            .map(|row| {
                ensemble.init
                    + ensemble
                        .trees
                        .iter()
                        .map(|t| lr * t.predict_row(row))
                        .sum::<f64>()
            })
            .collect())
    }
}
