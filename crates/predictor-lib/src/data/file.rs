//! File-backed data source reading delimited text with headers

use crate::error::{PredictorError, Result};
use crate::models::{Dataset, Value};
use std::path::{Path, PathBuf};
use tracing::info;

/// Loads train/test datasets from two CSV files
#[derive(Debug, Clone)]
pub struct FileSource {
    train_path: PathBuf,
    test_path: PathBuf,
}

impl FileSource {
    pub fn new(train_path: impl Into<PathBuf>, test_path: impl Into<PathBuf>) -> Self {
        Self {
            train_path: train_path.into(),
            test_path: test_path.into(),
        }
    }

    pub fn load_training_data(&self) -> Result<(Dataset, Dataset)> {
        // Both paths are checked before any parsing happens
        for path in [&self.train_path, &self.test_path] {
            if !path.exists() {
                return Err(PredictorError::NotFound(format!(
                    "data file not found: {}",
                    path.display()
                )));
            }
        }

        info!(path = %self.train_path.display(), "Loading training data from CSV");
        let train = read_csv(&self.train_path)?;

        info!(path = %self.test_path.display(), "Loading test data from CSV");
        let test = read_csv(&self.test_path)?;

        info!(
            train_rows = train.len(),
            test_rows = test.len(),
            "CSV data loaded"
        );
        Ok((train, test))
    }
}

/// Parse one CSV file into a dataset
pub fn read_csv(path: &Path) -> Result<Dataset> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .map_err(|e| {
            PredictorError::DataFormat(format!("cannot open {}: {}", path.display(), e))
        })?;

    let columns: Vec<String> = reader
        .headers()
        .map_err(|e| {
            PredictorError::DataFormat(format!("cannot read header of {}: {}", path.display(), e))
        })?
        .iter()
        .map(str::to_string)
        .collect();

    if columns.is_empty() || columns.iter().all(String::is_empty) {
        return Err(PredictorError::DataFormat(format!(
            "{} has no header row",
            path.display()
        )));
    }

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| {
            PredictorError::DataFormat(format!("{}: {}", path.display(), e))
        })?;
        rows.push(record.iter().map(Value::parse).collect());
    }

    if rows.is_empty() {
        return Err(PredictorError::DataFormat(format!(
            "{} contains no data rows",
            path.display()
        )));
    }

    Dataset::new(columns, rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    const HEADER: &str = "type,sector,net_usable_area,net_area,n_rooms,n_bathroom,latitude,longitude,price";

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_loads_train_and_test() {
        let dir = TempDir::new().unwrap();
        let train = write(
            &dir,
            "train.csv",
            &format!(
                "{HEADER}\ncasa,vitacura,152,257,3,3,-33.3794,-70.5447,11900\n\
                 departamento,la reina,84,84,2,2,-33.4415,-70.5594,4000\n"
            ),
        );
        let test = write(
            &dir,
            "test.csv",
            &format!("{HEADER}\ncasa,nunoa,100,150,3,2,-33.45,-70.6,6000\n"),
        );

        let (train, test) = FileSource::new(train, test).load_training_data().unwrap();
        assert_eq!(train.len(), 2);
        assert_eq!(test.len(), 1);
        assert_eq!(train.columns().len(), 9);
        assert_eq!(
            train.column("sector").unwrap()[1],
            &Value::Text("la reina".to_string())
        );
        assert_eq!(train.target("price").unwrap(), vec![Some(11900.0), Some(4000.0)]);
    }

    #[test]
    fn test_missing_train_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let test = write(&dir, "test.csv", &format!("{HEADER}\ncasa,nunoa,1,1,1,1,0,0,1\n"));
        let err = FileSource::new(dir.path().join("absent.csv"), test)
            .load_training_data()
            .unwrap_err();
        assert!(matches!(err, PredictorError::NotFound(_)));
        assert!(err.to_string().contains("absent.csv"));
    }

    #[test]
    fn test_missing_test_file_is_not_found() {
        let dir = TempDir::new().unwrap();
        let train = write(&dir, "train.csv", &format!("{HEADER}\ncasa,nunoa,1,1,1,1,0,0,1\n"));
        let err = FileSource::new(train, dir.path().join("absent.csv"))
            .load_training_data()
            .unwrap_err();
        assert!(matches!(err, PredictorError::NotFound(_)));
    }

    #[test]
    fn test_header_only_file_is_data_format_error() {
        let dir = TempDir::new().unwrap();
        let train = write(&dir, "train.csv", &format!("{HEADER}\n"));
        let test = write(&dir, "test.csv", &format!("{HEADER}\ncasa,nunoa,1,1,1,1,0,0,1\n"));
        let err = FileSource::new(train, test).load_training_data().unwrap_err();
        assert!(matches!(err, PredictorError::DataFormat(_)));
    }

    #[test]
    fn test_empty_file_is_data_format_error() {
        let dir = TempDir::new().unwrap();
        let train = write(&dir, "train.csv", "");
        let err = read_csv(&train).unwrap_err();
        assert!(matches!(err, PredictorError::DataFormat(_)));
    }

    #[test]
    fn test_ragged_rows_are_data_format_error() {
        let dir = TempDir::new().unwrap();
        let path = write(&dir, "train.csv", "a,b,c\n1,2,3\n4,5\n");
        let err = read_csv(&path).unwrap_err();
        assert!(matches!(err, PredictorError::DataFormat(_)));
    }
}
