//! Column-wise preprocessing: supervised target encoding of categorical
//! columns, numeric columns passed through unchanged.
//!
//! The learned category→value mappings are part of the fitted pipeline and
//! are never recomputed at prediction time.

use crate::error::{PredictorError, Result};
use crate::models::{Dataset, Value};
use ndarray::Array2;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Smoothing parameters for target encoding
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EncoderParams {
    /// Category count at which the category mean and the prior weigh equally
    #[serde(default = "default_min_samples_leaf")]
    pub min_samples_leaf: f64,
    /// Steepness of the blend between prior and category mean
    #[serde(default = "default_smoothing")]
    pub smoothing: f64,
}

fn default_min_samples_leaf() -> f64 {
    20.0
}

fn default_smoothing() -> f64 {
    10.0
}

impl Default for EncoderParams {
    fn default() -> Self {
        Self {
            min_samples_leaf: default_min_samples_leaf(),
            smoothing: default_smoothing(),
        }
    }
}

/// Learned encoding for one categorical column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEncoding {
    /// Global training-set target mean, used for unseen or missing categories
    prior: f64,
    mapping: BTreeMap<String, f64>,
}

impl TargetEncoding {
    fn fit<'a>(
        values: impl Iterator<Item = &'a Value>,
        y: &[f64],
        prior: f64,
        params: &EncoderParams,
    ) -> Self {
        let mut stats: BTreeMap<String, (f64, usize)> = BTreeMap::new();
        for (value, &target) in values.zip(y) {
            if let Some(key) = value.category_key() {
                let entry = stats.entry(key).or_insert((0.0, 0));
                entry.0 += target;
                entry.1 += 1;
            }
        }

        let mapping = stats
            .into_iter()
            .map(|(key, (sum, count))| {
                let encoded = if count <= 1 {
                    // A single observation carries no usable signal
                    prior
                } else {
                    let mean = sum / count as f64;
                    let weight = 1.0
                        / (1.0
                            + (-(count as f64 - params.min_samples_leaf) / params.smoothing)
                                .exp());
                    prior * (1.0 - weight) + mean * weight
                };
                (key, encoded)
            })
            .collect();

        Self { prior, mapping }
    }

    /// Encoded value for a cell; unseen and missing categories fall back to the prior
    pub fn encode(&self, value: &Value) -> f64 {
        value
            .category_key()
            .and_then(|key| self.mapping.get(&key).copied())
            .unwrap_or(self.prior)
    }

    pub fn prior(&self) -> f64 {
        self.prior
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.mapping.keys().map(String::as_str)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct FittedState {
    /// Column order seen at fit time; transform reproduces it
    input_columns: Vec<String>,
    encodings: BTreeMap<String, TargetEncoding>,
}

/// Transform stage that target-encodes categorical columns and passes the
/// rest through
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnPreprocessor {
    categorical_columns: Vec<String>,
    params: EncoderParams,
    fitted: Option<FittedState>,
}

/// Build an unfit preprocessor for the given categorical columns
pub fn build_preprocessor<S: AsRef<str>>(
    categorical_columns: &[S],
    params: EncoderParams,
) -> Result<ColumnPreprocessor> {
    if categorical_columns.is_empty() {
        return Err(PredictorError::Configuration(
            "at least one categorical column is required".to_string(),
        ));
    }
    if !(params.smoothing > 0.0) || !params.min_samples_leaf.is_finite() {
        return Err(PredictorError::Configuration(format!(
            "invalid encoder parameters: {:?}",
            params
        )));
    }

    Ok(ColumnPreprocessor {
        categorical_columns: categorical_columns
            .iter()
            .map(|c| c.as_ref().to_string())
            .collect(),
        params,
        fitted: None,
    })
}

impl ColumnPreprocessor {
    pub fn categorical_columns(&self) -> &[String] {
        &self.categorical_columns
    }

    pub fn is_fitted(&self) -> bool {
        self.fitted.is_some()
    }

    /// Columns consumed by [`transform`](Self::transform), once fitted
    pub fn input_columns(&self) -> Option<&[String]> {
        self.fitted.as_ref().map(|f| f.input_columns.as_slice())
    }

    pub fn encoding(&self, column: &str) -> Option<&TargetEncoding> {
        self.fitted.as_ref()?.encodings.get(column)
    }

    /// Learn per-category target statistics
    pub fn fit(&mut self, x: &Dataset, y: &[f64]) -> Result<()> {
        if x.len() != y.len() {
            return Err(PredictorError::Validation(format!(
                "feature rows ({}) and targets ({}) differ in length",
                x.len(),
                y.len()
            )));
        }
        if y.is_empty() {
            return Err(PredictorError::Validation(
                "cannot fit encoder on empty data".to_string(),
            ));
        }

        let prior = y.iter().sum::<f64>() / y.len() as f64;
        let mut encodings = BTreeMap::new();
        for column in &self.categorical_columns {
            let values = x.column(column).ok_or_else(|| {
                PredictorError::Validation(format!(
                    "categorical column '{}' not present in training data",
                    column
                ))
            })?;
            let encoding = TargetEncoding::fit(values.into_iter(), y, prior, &self.params);
            debug!(
                column = %column,
                categories = encoding.mapping.len(),
                prior = prior,
                "Fitted target encoding"
            );
            encodings.insert(column.clone(), encoding);
        }

        self.fitted = Some(FittedState {
            input_columns: x.columns().to_vec(),
            encodings,
        });
        Ok(())
    }

    /// Produce the dense numeric matrix fed to the regressor
    pub fn transform(&self, x: &Dataset) -> Result<Array2<f64>> {
        let fitted = self.fitted.as_ref().ok_or_else(|| {
            PredictorError::Internal("preprocessor used before fitting".to_string())
        })?;

        let x = x.select(&fitted.input_columns)?;
        let n_cols = fitted.input_columns.len();
        let mut data = Vec::with_capacity(x.len() * n_cols);

        for (row_idx, row) in x.rows().enumerate() {
            for (col_idx, value) in row.iter().enumerate() {
                let column = &fitted.input_columns[col_idx];
                let encoded = match fitted.encodings.get(column) {
                    Some(encoding) => encoding.encode(value),
                    None => numeric_cell(column, row_idx, value)?,
                };
                data.push(encoded);
            }
        }

        Array2::from_shape_vec((x.len(), n_cols), data)
            .map_err(|e| PredictorError::Internal(format!("feature matrix shape: {}", e)))
    }

    pub fn fit_transform(&mut self, x: &Dataset, y: &[f64]) -> Result<Array2<f64>> {
        self.fit(x, y)?;
        self.transform(x)
    }
}

fn numeric_cell(column: &str, row: usize, value: &Value) -> Result<f64> {
    match value {
        Value::Number(n) => Ok(*n),
        Value::Missing => Err(PredictorError::Validation(format!(
            "numeric column '{}' is missing a value at row {}",
            column, row
        ))),
        Value::Text(s) => Err(PredictorError::Validation(format!(
            "numeric column '{}' has non-numeric value {:?} at row {}",
            column, s, row
        ))),
    }
}
