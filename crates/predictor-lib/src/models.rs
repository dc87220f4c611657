//! Core data models for the price predictor

use crate::error::{PredictorError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fmt;

/// A single scalar cell: numeric, categorical text, or absent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Interpret a raw text field the way tabular readers do: empty or NaN is
    /// missing, anything that parses as a float is numeric, the rest is text
    pub fn parse(field: &str) -> Self {
        let trimmed = field.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_nan() => Value::Missing,
            Ok(n) => Value::Number(n),
            Err(_) => Value::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Key used when the value is treated as a category
    pub fn category_key(&self) -> Option<String> {
        match self {
            Value::Text(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            Value::Missing => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{:?}", s),
            Value::Missing => write!(f, "<missing>"),
        }
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::Text(s.to_string())
    }
}

/// One property's features keyed by column name
pub type FeatureRow = BTreeMap<String, Value>;

/// Ordered rows sharing one column schema
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Dataset {
    /// Build a dataset, rejecting duplicate column names and ragged rows
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(PredictorError::DataFormat(format!(
                    "duplicate column name '{}'",
                    column
                )));
            }
        }

        if let Some((idx, row)) = rows
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != columns.len())
        {
            return Err(PredictorError::DataFormat(format!(
                "row {} has {} values, expected {}",
                idx,
                row.len(),
                columns.len()
            )));
        }

        Ok(Self { columns, rows })
    }

    /// Build a dataset from keyed rows, extracting exactly `columns` in order.
    /// Extra keys are ignored; absent keys are reported together.
    pub fn from_feature_rows(columns: &[String], rows: &[FeatureRow]) -> Result<Self> {
        let mut missing: Vec<String> = Vec::new();
        for row in rows {
            for column in columns {
                if !row.contains_key(column) && !missing.contains(column) {
                    missing.push(column.clone());
                }
            }
        }
        if !missing.is_empty() {
            return Err(PredictorError::BadRequest { missing });
        }

        let data = rows
            .iter()
            .map(|row| columns.iter().map(|c| row[c].clone()).collect())
            .collect();
        Self::new(columns.to_vec(), data)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn rows(&self) -> impl Iterator<Item = &[Value]> {
        self.rows.iter().map(|r| r.as_slice())
    }

    /// Values of one column, top to bottom
    pub fn column(&self, name: &str) -> Option<Vec<&Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(|r| &r[idx]).collect())
    }

    /// Project onto `names` in the given order
    pub fn select(&self, names: &[String]) -> Result<Dataset> {
        let mut indices = Vec::with_capacity(names.len());
        let mut missing = Vec::new();
        for name in names {
            match self.column_index(name) {
                Some(idx) => indices.push(idx),
                None => missing.push(name.clone()),
            }
        }
        if !missing.is_empty() {
            return Err(PredictorError::Validation(format!(
                "dataset is missing columns: {}",
                missing.join(", ")
            )));
        }

        let rows = self
            .rows
            .iter()
            .map(|row| indices.iter().map(|&i| row[i].clone()).collect())
            .collect();
        Ok(Dataset {
            columns: names.to_vec(),
            rows,
        })
    }

    /// Extract a numeric target column; missing cells become `None`
    pub fn target(&self, name: &str) -> Result<Vec<Option<f64>>> {
        let values = self.column(name).ok_or_else(|| {
            PredictorError::Validation(format!("target column '{}' not found", name))
        })?;

        values
            .into_iter()
            .enumerate()
            .map(|(row, value)| match value {
                Value::Number(n) => Ok(Some(*n)),
                Value::Missing => Ok(None),
                Value::Text(s) => Err(PredictorError::Validation(format!(
                    "target column '{}' has non-numeric value {:?} at row {}",
                    name, s, row
                ))),
            })
            .collect()
    }

    /// Row `idx` as a keyed feature row
    pub fn feature_row(&self, idx: usize) -> Option<FeatureRow> {
        let row = self.rows.get(idx)?;
        Some(
            self.columns
                .iter()
                .cloned()
                .zip(row.iter().cloned())
                .collect(),
        )
    }
}

/// Accuracy metrics for one evaluation run
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetricsReport {
    pub rmse: f64,
    pub mape: f64,
    pub mae: f64,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Dataset {
        Dataset::new(
            vec!["type".into(), "net_area".into(), "price".into()],
            vec![
                vec!["casa".into(), 120.0.into(), 5000.0.into()],
                vec!["departamento".into(), 60.0.into(), Value::Missing],
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_value_parse() {
        assert_eq!(Value::parse(""), Value::Missing);
        assert_eq!(Value::parse("  "), Value::Missing);
        assert_eq!(Value::parse("NaN"), Value::Missing);
        assert_eq!(Value::parse("3.5"), Value::Number(3.5));
        assert_eq!(Value::parse("las condes"), Value::Text("las condes".into()));
    }

    #[test]
    fn test_value_deserializes_untagged() {
        let row: FeatureRow =
            serde_json::from_str(r#"{"type": "casa", "n_rooms": 3, "extra": null}"#).unwrap();
        assert_eq!(row["type"], Value::Text("casa".into()));
        assert_eq!(row["n_rooms"], Value::Number(3.0));
        assert_eq!(row["extra"], Value::Missing);
    }

    #[test]
    fn test_dataset_rejects_ragged_rows() {
        let err = Dataset::new(vec!["a".into(), "b".into()], vec![vec![1.0.into()]]).unwrap_err();
        assert!(matches!(err, PredictorError::DataFormat(_)));
    }

    #[test]
    fn test_dataset_rejects_duplicate_columns() {
        let err = Dataset::new(vec!["a".into(), "a".into()], vec![]).unwrap_err();
        assert!(matches!(err, PredictorError::DataFormat(_)));
    }

    #[test]
    fn test_select_reorders_and_reports_missing() {
        let ds = sample();
        let selected = ds.select(&["net_area".into(), "type".into()]).unwrap();
        assert_eq!(selected.columns(), &["net_area".to_string(), "type".to_string()]);
        assert_eq!(selected.rows().next().unwrap()[0], Value::Number(120.0));

        let err = ds.select(&["latitude".into()]).unwrap_err();
        assert!(err.to_string().contains("latitude"));
    }

    #[test]
    fn test_target_keeps_missing_as_none() {
        let ds = sample();
        assert_eq!(ds.target("price").unwrap(), vec![Some(5000.0), None]);
        assert!(matches!(
            ds.target("type").unwrap_err(),
            PredictorError::Validation(_)
        ));
    }

    #[test]
    fn test_from_feature_rows_ignores_extras_and_reports_missing() {
        let columns = vec!["type".to_string(), "net_area".to_string()];
        let mut row = FeatureRow::new();
        row.insert("net_area".into(), 80.0.into());
        row.insert("type".into(), "casa".into());
        row.insert("unused".into(), 1.0.into());

        let ds = Dataset::from_feature_rows(&columns, &[row.clone()]).unwrap();
        assert_eq!(ds.columns(), columns.as_slice());
        assert_eq!(ds.rows().next().unwrap()[0], Value::Text("casa".into()));

        row.remove("net_area");
        match Dataset::from_feature_rows(&columns, &[row]).unwrap_err() {
            PredictorError::BadRequest { missing } => assert_eq!(missing, vec!["net_area"]),
            other => panic!("unexpected error: {other}"),
        }
    }
}
