//! Dataset loading utilities

use crate::error::{AutoRegressError, Result};
use polars::prelude::*;
use std::fs::File;
use std::path::Path;

/// CSV data loader
pub struct DataLoader {
    /// Number of leading rows used for dtype inference
    infer_schema_rows: usize,
}

impl Default for DataLoader {
    fn default() -> Self {
        Self::new()
    }
}

impl DataLoader {
    /// Create a new data loader
    pub fn new() -> Self {
        Self {
            infer_schema_rows: 100,
        }
    }

    /// Set the number of rows used for schema inference
    pub fn with_infer_schema_rows(mut self, n: usize) -> Self {
        self.infer_schema_rows = n;
        self
    }

    /// Load a CSV file into a DataFrame.
    ///
    /// Rows where every value is null are dropped, as are columns where
    /// every value is null; the caller always sees usable data or an error.
    pub fn load_csv(&self, path: &Path) -> Result<DataFrame> {
        if path.extension().map(|e| e.to_ascii_lowercase()) != Some("csv".into()) {
            return Err(AutoRegressError::DataError(format!(
                "not a CSV file: {}",
                path.display()
            )));
        }

        let file = File::open(path)
            .map_err(|e| AutoRegressError::DataError(format!("{}: {}", path.display(), e)))?;

        let df = CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(self.infer_schema_rows))
            .into_reader_with_file_handle(file)
            .finish()
            .map_err(|e| AutoRegressError::DataError(e.to_string()))?;

        let df = drop_all_null_rows(&df)?;
        let df = drop_all_null_columns(&df)?;

        if df.height() == 0 {
            return Err(AutoRegressError::DataError(
                "dataset contains no usable rows".to_string(),
            ));
        }

        Ok(df)
    }
}

/// Drop rows whose every value is null.
fn drop_all_null_rows(df: &DataFrame) -> Result<DataFrame> {
    if df.width() == 0 {
        return Ok(df.clone());
    }

    let mut all_null = BooleanChunked::full("mask".into(), true, df.height());
    for col in df.get_columns() {
        all_null = &all_null & &col.as_materialized_series().is_null();
    }

    let keep = !all_null;
    df.filter(&keep)
        .map_err(|e| AutoRegressError::DataError(e.to_string()))
}

/// Drop columns whose every value is null.
fn drop_all_null_columns(df: &DataFrame) -> Result<DataFrame> {
    let keep: Vec<Column> = df
        .get_columns()
        .iter()
        .filter(|col| col.as_materialized_series().null_count() < col.len())
        .cloned()
        .collect();

    DataFrame::new(keep).map_err(|e| AutoRegressError::DataError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(content: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".csv")
            .tempfile()
            .unwrap();
        file.write_all(content.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_load_basic_csv() {
        let file = write_csv("a,b\n1,x\n2,y\n3,z\n");
        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 3);
        assert_eq!(df.width(), 2);
    }

    #[test]
    fn test_rejects_non_csv() {
        let result = DataLoader::new().load_csv(Path::new("/tmp/data.parquet"));
        assert!(result.is_err());
    }

    #[test]
    fn test_drops_empty_rows() {
        let file = write_csv("a,b\n1,x\n,\n3,z\n");
        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.height(), 2);
    }

    #[test]
    fn test_drops_empty_columns() {
        let file = write_csv("a,b,c\n1,,x\n2,,y\n");
        let df = DataLoader::new().load_csv(file.path()).unwrap();
        assert_eq!(df.width(), 2);
        assert!(df.column("b").is_err());
    }
}
