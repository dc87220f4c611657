//! Regression losses for boosting
//!
//! - [`LossKind::AbsoluteError`]: L = |y - F|, median initialisation, sign
//!   pseudo-residuals, leaves set to the median residual
//! - [`LossKind::SquaredError`]: L = 0.5 (y - F)², mean initialisation, raw
//!   residuals, leaves set to the mean residual

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Loss optimised by the boosting stages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LossKind {
    /// Robust to outliers; estimates the conditional median
    #[default]
    AbsoluteError,
    /// Estimates the conditional mean
    SquaredError,
}

impl LossKind {
    /// Constant prediction the ensemble starts from
    pub fn init_estimate(&self, y: &[f64]) -> f64 {
        match self {
            LossKind::AbsoluteError => {
                let mut sorted = y.to_vec();
                median(&mut sorted)
            }
            LossKind::SquaredError => y.iter().sum::<f64>() / y.len() as f64,
        }
    }

    /// Pseudo-residuals the next tree is fitted to
    pub fn negative_gradient(&self, y: &[f64], raw: &[f64], out: &mut [f64]) {
        debug_assert_eq!(y.len(), raw.len());
        debug_assert_eq!(y.len(), out.len());

        match self {
            LossKind::AbsoluteError => {
                for i in 0..y.len() {
                    out[i] = if y[i] > raw[i] { 1.0 } else { -1.0 };
                }
            }
            LossKind::SquaredError => {
                for i in 0..y.len() {
                    out[i] = y[i] - raw[i];
                }
            }
        }
    }

    /// Optimal leaf value given the residuals `y - F` of the samples in a leaf
    pub fn leaf_value(&self, residuals: &mut [f64]) -> f64 {
        match self {
            LossKind::AbsoluteError => median(residuals),
            LossKind::SquaredError => residuals.iter().sum::<f64>() / residuals.len() as f64,
        }
    }

    /// Mean loss over the training rows
    pub fn loss(&self, y: &[f64], raw: &[f64]) -> f64 {
        let n = y.len() as f64;
        match self {
            LossKind::AbsoluteError => {
                y.iter().zip(raw).map(|(t, p)| (t - p).abs()).sum::<f64>() / n
            }
            LossKind::SquaredError => {
                y.iter().zip(raw).map(|(t, p)| 0.5 * (t - p).powi(2)).sum::<f64>() / n
            }
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            LossKind::AbsoluteError => "absolute_error",
            LossKind::SquaredError => "squared_error",
        }
    }
}

impl fmt::Display for LossKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for LossKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "absolute_error" => Ok(LossKind::AbsoluteError),
            "squared_error" => Ok(LossKind::SquaredError),
            other => Err(format!("unsupported loss: {}", other)),
        }
    }
}

/// Median with midpoint interpolation for even lengths. Reorders `values`.
pub(crate) fn median(values: &mut [f64]) -> f64 {
    if values.is_empty() {
        return f64::NAN;
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}
