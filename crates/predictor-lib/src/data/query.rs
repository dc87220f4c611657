//! Query-backed data source
//!
//! Backed by DuckDB when the crate is built with the `sql` feature. Without it
//! the engine is reported as unavailable.

use crate::error::{PredictorError, Result};
use crate::models::Dataset;
use tracing::info;

/// Loads train/test datasets by running two queries
#[derive(Debug, Clone)]
pub struct QuerySource {
    connection_string: String,
    train_query: String,
    test_query: String,
}

impl QuerySource {
    pub fn new(
        connection_string: impl Into<String>,
        train_query: impl Into<String>,
        test_query: impl Into<String>,
    ) -> Self {
        Self {
            connection_string: connection_string.into(),
            train_query: train_query.into(),
            test_query: test_query.into(),
        }
    }

    pub fn load_training_data(&self) -> Result<(Dataset, Dataset)> {
        info!(query = %self.train_query, "Loading training data from SQL");
        let conn = engine::connect(&self.connection_string)?;
        let train = engine::run_query(&conn, &self.train_query)?;

        info!(query = %self.test_query, "Loading test data from SQL");
        let test = engine::run_query(&conn, &self.test_query)?;

        if train.is_empty() || test.is_empty() {
            return Err(PredictorError::DataFormat(format!(
                "query returned no rows (train: {}, test: {})",
                train.len(),
                test.len()
            )));
        }

        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            "SQL data loaded"
        );
        Ok((train, test))
    }
}

#[cfg(feature = "sql")]
mod engine {
    use crate::error::{PredictorError, Result};
    use crate::models::{Dataset, Value};
    use duckdb::types::Value as DbValue;
    use duckdb::Connection;

    pub fn connect(connection_string: &str) -> Result<Connection> {
        let conn = if connection_string == ":memory:" {
            Connection::open_in_memory()
        } else {
            Connection::open(connection_string)
        };
        conn.map_err(|e| {
            PredictorError::Configuration(format!(
                "cannot open database '{}': {}",
                connection_string, e
            ))
        })
    }

    pub fn run_query(conn: &Connection, query: &str) -> Result<Dataset> {
        let query_err =
            |e: duckdb::Error| PredictorError::DataFormat(format!("query '{}' failed: {}", query, e));

        let mut stmt = conn.prepare(query).map_err(query_err)?;
        let mut rows = stmt.query([]).map_err(query_err)?;
        let columns: Vec<String> = rows
            .as_ref()
            .map(|s| s.column_names())
            .unwrap_or_default();

        let mut data = Vec::new();
        while let Some(row) = rows.next().map_err(query_err)? {
            let mut values = Vec::with_capacity(columns.len());
            for idx in 0..columns.len() {
                let value: DbValue = row.get(idx).map_err(query_err)?;
                values.push(convert(value));
            }
            data.push(values);
        }

        Dataset::new(columns, data)
    }

    fn convert(value: DbValue) -> Value {
        match value {
            DbValue::Null => Value::Missing,
            DbValue::Boolean(b) => Value::Number(if b { 1.0 } else { 0.0 }),
            DbValue::TinyInt(n) => Value::Number(n as f64),
            DbValue::SmallInt(n) => Value::Number(n as f64),
            DbValue::Int(n) => Value::Number(n as f64),
            DbValue::BigInt(n) => Value::Number(n as f64),
            DbValue::HugeInt(n) => Value::Number(n as f64),
            DbValue::UTinyInt(n) => Value::Number(n as f64),
            DbValue::USmallInt(n) => Value::Number(n as f64),
            DbValue::UInt(n) => Value::Number(n as f64),
            DbValue::UBigInt(n) => Value::Number(n as f64),
            DbValue::Float(n) => Value::Number(n as f64),
            DbValue::Double(n) if n.is_nan() => Value::Missing,
            DbValue::Double(n) => Value::Number(n),
            DbValue::Text(s) => Value::Text(s),
            other => Value::parse(&format!("{:?}", other)),
        }
    }
}

#[cfg(not(feature = "sql"))]
mod engine {
    use crate::error::{PredictorError, Result};
    use crate::models::Dataset;

    pub struct Connection;

    pub fn connect(_connection_string: &str) -> Result<Connection> {
        Err(PredictorError::Configuration(
            "SQL data sources require building with the `sql` feature".to_string(),
        ))
    }

    pub fn run_query(_conn: &Connection, query: &str) -> Result<Dataset> {
        Err(PredictorError::Configuration(format!(
            "cannot run '{}': SQL engine unavailable",
            query
        )))
    }
}
