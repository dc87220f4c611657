//! Training data ingestion
//!
//! A [`DataSource`] yields the (train, test) dataset pair from one of the
//! supported origins. [`create_data_source`] picks the variant from the
//! configured source-type tag.

mod file;
mod query;

pub use file::FileSource;
pub use query::QuerySource;

use crate::error::{PredictorError, Result};
use crate::models::Dataset;
use serde::Deserialize;
use std::path::PathBuf;

pub const DEFAULT_TRAIN_PATH: &str = "data/train.csv";
pub const DEFAULT_TEST_PATH: &str = "data/test.csv";
pub const DEFAULT_TRAIN_QUERY: &str = "SELECT * FROM train_data";
pub const DEFAULT_TEST_QUERY: &str = "SELECT * FROM test_data";

/// Settings consumed by [`create_data_source`]
#[derive(Debug, Clone, Deserialize)]
pub struct SourceSettings {
    /// Source-type tag: `csv` or `sql`
    #[serde(default = "default_source_type")]
    pub source_type: String,

    #[serde(default = "default_train_path")]
    pub train_path: PathBuf,

    #[serde(default = "default_test_path")]
    pub test_path: PathBuf,

    /// Required for `sql`
    #[serde(default)]
    pub connection_string: Option<String>,

    #[serde(default = "default_train_query")]
    pub train_query: String,

    #[serde(default = "default_test_query")]
    pub test_query: String,
}

fn default_source_type() -> String {
    "csv".to_string()
}

fn default_train_path() -> PathBuf {
    PathBuf::from(DEFAULT_TRAIN_PATH)
}

fn default_test_path() -> PathBuf {
    PathBuf::from(DEFAULT_TEST_PATH)
}

fn default_train_query() -> String {
    DEFAULT_TRAIN_QUERY.to_string()
}

fn default_test_query() -> String {
    DEFAULT_TEST_QUERY.to_string()
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            source_type: default_source_type(),
            train_path: default_train_path(),
            test_path: default_test_path(),
            connection_string: None,
            train_query: default_train_query(),
            test_query: default_test_query(),
        }
    }
}

/// Origin of the training/test datasets
#[derive(Debug, Clone)]
pub enum DataSource {
    /// Two delimited files on disk
    File(FileSource),
    /// Two queries against a relational engine
    Query(QuerySource),
}

impl DataSource {
    /// Load the (train, test) pair; both are guaranteed non-empty on success
    pub fn load_training_data(&self) -> Result<(Dataset, Dataset)> {
        let (train, test) = match self {
            DataSource::File(source) => source.load_training_data()?,
            DataSource::Query(source) => source.load_training_data()?,
        };
        ensure_non_empty(&train, &test)?;
        Ok((train, test))
    }

    pub fn kind(&self) -> &'static str {
        match self {
            DataSource::File(_) => "csv",
            DataSource::Query(_) => "sql",
        }
    }
}

/// Select the data source variant from its type tag (case-insensitive)
pub fn create_data_source(settings: &SourceSettings) -> Result<DataSource> {
    match settings.source_type.to_lowercase().as_str() {
        "csv" => Ok(DataSource::File(FileSource::new(
            settings.train_path.clone(),
            settings.test_path.clone(),
        ))),
        "sql" => {
            let connection_string = settings.connection_string.clone().ok_or_else(|| {
                PredictorError::Configuration(
                    "sql source requires a connection_string".to_string(),
                )
            })?;
            Ok(DataSource::Query(QuerySource::new(
                connection_string,
                settings.train_query.clone(),
                settings.test_query.clone(),
            )))
        }
        other => Err(PredictorError::Configuration(format!(
            "unsupported source type: {}",
            other
        ))),
    }
}

fn ensure_non_empty(train: &Dataset, test: &Dataset) -> Result<()> {
    if train.is_empty() || test.is_empty() {
        return Err(PredictorError::DataFormat(format!(
            "one or more datasets are empty (train: {} rows, test: {} rows)",
            train.len(),
            test.len()
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_factory_selects_file_source() {
        let source = create_data_source(&SourceSettings::default()).unwrap();
        assert!(matches!(source, DataSource::File(_)));
        assert_eq!(source.kind(), "csv");
    }

    #[test]
    fn test_factory_tag_is_case_insensitive() {
        let settings = SourceSettings {
            source_type: "CSV".to_string(),
            ..SourceSettings::default()
        };
        assert!(create_data_source(&settings).is_ok());
    }

    #[test]
    fn test_factory_selects_query_source() {
        let settings = SourceSettings {
            source_type: "sql".to_string(),
            connection_string: Some(":memory:".to_string()),
            ..SourceSettings::default()
        };
        let source = create_data_source(&settings).unwrap();
        assert!(matches!(source, DataSource::Query(_)));
    }

    #[test]
    fn test_factory_sql_without_connection_string() {
        let settings = SourceSettings {
            source_type: "sql".to_string(),
            ..SourceSettings::default()
        };
        let err = create_data_source(&settings).unwrap_err();
        assert!(matches!(err, PredictorError::Configuration(_)));
    }

    #[test]
    fn test_factory_rejects_unknown_tag() {
        let settings = SourceSettings {
            source_type: "parquet".to_string(),
            ..SourceSettings::default()
        };
        let err = create_data_source(&settings).unwrap_err();
        assert!(matches!(err, PredictorError::Configuration(_)));
        assert!(err.to_string().contains("parquet"));
    }
}
