//! Feature column selection
//!
//! Derives the ordered feature manifest from a dataset's columns. The order
//! of the input is preserved; it becomes the column order expected at
//! inference time.

use crate::error::{PredictorError, Result};

/// Bookkeeping columns never used as model inputs
pub const EXCLUDED_COLUMNS: &[&str] = &["id", "target"];

/// Default categorical columns
pub const DEFAULT_CATEGORICAL_COLUMNS: &[&str] = &["type", "sector"];

/// Default label column
pub const DEFAULT_TARGET_COLUMN: &str = "price";

/// Stable filter of `columns` dropping [`EXCLUDED_COLUMNS`]
pub fn select_feature_columns<S: AsRef<str>>(columns: &[S]) -> Result<Vec<String>> {
    let selected: Vec<String> = columns
        .iter()
        .map(AsRef::as_ref)
        .filter(|c| !EXCLUDED_COLUMNS.contains(c))
        .map(str::to_string)
        .collect();

    if selected.is_empty() {
        return Err(PredictorError::Validation(format!(
            "no feature columns remain after excluding {:?}",
            EXCLUDED_COLUMNS
        )));
    }

    Ok(selected)
}
