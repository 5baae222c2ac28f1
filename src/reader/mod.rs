//! Tabular data loading
//!
//! Twiss tables, tracking output and lattice tables are read into
//! [`PlotData`]: one `f64` column per numeric source column. Text columns such
//! as element names are skipped.
//!
//! Supported formats, chosen by file extension:
//!
//! - `.csv` / `.tsv` - header row required
//! - `.parquet` - with the `parquet` feature
//! - `.json` - an object of equally long arrays, `null` entries become NaN
//!
//! # Example
//!
//! ```rust,ignore
//! use beamplot::reader::read_table;
//!
//! let twiss = read_table("twiss.csv")?;
//! let plot = TwissPlot::new(Figure::new(), Some(&twiss), "bet-dx,x+y", PlotOptions::new())?;
//! ```

use polars::prelude::*;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, info};

use crate::plot::PlotData;
use crate::{PlotError, Result};

/// Read a table from `path`, dispatching on its extension
pub fn read_table(path: impl AsRef<Path>) -> Result<PlotData> {
    let path = path.as_ref();
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    let data = match extension.as_str() {
        "csv" => from_dataframe(&read_delimited(path, b',')?)?,
        "tsv" => from_dataframe(&read_delimited(path, b'\t')?)?,
        "parquet" => from_dataframe(&read_parquet(path)?)?,
        "json" => from_json_str(&std::fs::read_to_string(path)?)?,
        other => {
            return Err(PlotError::ReaderError(format!(
                "Unsupported file type '{}' for {}",
                other,
                path.display()
            )))
        }
    };

    info!(path = %path.display(), columns = data.len(), "read table");
    Ok(data)
}

fn read_delimited(path: &Path, separator: u8) -> Result<DataFrame> {
    CsvReadOptions::default()
        .with_has_header(true)
        .map_parse_options(|options| options.with_separator(separator))
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .map_err(|e| {
            PlotError::ReaderError(format!("Failed to read {}: {}", path.display(), e))
        })
}

#[cfg(feature = "parquet")]
fn read_parquet(path: &Path) -> Result<DataFrame> {
    let file = std::fs::File::open(path)?;
    ParquetReader::new(file).finish().map_err(|e| {
        PlotError::ReaderError(format!("Failed to read {}: {}", path.display(), e))
    })
}

#[cfg(not(feature = "parquet"))]
fn read_parquet(path: &Path) -> Result<DataFrame> {
    Err(PlotError::ReaderError(format!(
        "Cannot read {}: built without the 'parquet' feature",
        path.display()
    )))
}

fn is_numeric(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Numeric columns of a DataFrame as `f64`; nulls become NaN
pub fn from_dataframe(df: &DataFrame) -> Result<PlotData> {
    let mut data = PlotData::new();
    for column in df.get_columns() {
        let name = column.name().as_str();
        if !is_numeric(column.dtype()) {
            debug!(column = name, dtype = %column.dtype(), "skipping non-numeric column");
            continue;
        }

        let series = column
            .as_materialized_series()
            .cast(&DataType::Float64)
            .map_err(|e| PlotError::ReaderError(format!("Failed to cast '{}': {}", name, e)))?;
        let values = series
            .f64()
            .map_err(|e| PlotError::ReaderError(format!("Failed to read '{}': {}", name, e)))?
            .into_iter()
            .map(|v| v.unwrap_or(f64::NAN))
            .collect();
        data.insert(name, values);
    }
    Ok(data)
}

/// Parse a JSON object of columns
///
/// Columns holding anything but numbers and `null` are skipped.
pub fn from_json_str(json: &str) -> Result<PlotData> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| PlotError::ReaderError(format!("Invalid JSON table: {}", e)))?;
    let Value::Object(columns) = value else {
        return Err(PlotError::ReaderError(
            "JSON table must be an object of columns".to_string(),
        ));
    };

    let mut data = PlotData::new();
    for (name, column) in columns {
        let values: Option<Vec<f64>> = match &column {
            Value::Array(items) => items
                .iter()
                .map(|item| match item {
                    Value::Null => Some(f64::NAN),
                    other => other.as_f64(),
                })
                .collect(),
            _ => None,
        };
        match values {
            Some(values) => {
                data.insert(name, values);
            }
            None => debug!(column = %name, "skipping non-numeric column"),
        }
    }
    Ok(data)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(suffix: &str, contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::Builder::new().suffix(suffix).tempfile().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_read_csv_skips_text_columns() {
        let file = write_file(
            ".csv",
            "name,s,betx,k1l\nstart,0.0,10.5,0\nqf,1.5,12,0.25\nend,3,11.0,\n",
        );
        let data = read_table(file.path()).unwrap();
        assert!(!data.contains("name"));
        assert_eq!(data.get("s").unwrap(), &[0.0, 1.5, 3.0]);
        assert_eq!(data.get("betx").unwrap(), &[10.5, 12.0, 11.0]);
        let k1l = data.get("k1l").unwrap();
        assert_eq!(k1l[1], 0.25);
        assert!(k1l[2].is_nan());
    }

    #[test]
    fn test_read_tsv() {
        let file = write_file(".tsv", "t\tx\n0\t1e-3\n1\t2e-3\n");
        let data = read_table(file.path()).unwrap();
        assert_eq!(data.get("x").unwrap(), &[1e-3, 2e-3]);
    }

    #[test]
    fn test_read_json() {
        let file = write_file(
            ".json",
            r#"{"s": [0, 1, 2], "x": [0.1, null, 0.3], "name": ["a", "b", "c"], "meta": {"k": 1}}"#,
        );
        let data = read_table(file.path()).unwrap();
        assert_eq!(data.len(), 2);
        assert_eq!(data.get("s").unwrap(), &[0.0, 1.0, 2.0]);
        assert!(data.get("x").unwrap()[1].is_nan());
    }

    #[test]
    fn test_json_must_be_object() {
        assert!(matches!(
            from_json_str("[1, 2]"),
            Err(PlotError::ReaderError(_))
        ));
    }

    #[test]
    fn test_unsupported_extension() {
        let file = write_file(".xlsx", "");
        let err = read_table(file.path()).unwrap_err();
        assert!(err.to_string().contains("Unsupported file type 'xlsx'"));
    }

    #[test]
    fn test_missing_file() {
        assert!(read_table("/nonexistent/twiss.json").is_err());
    }

    #[test]
    fn test_from_dataframe() {
        let df = df! {
            "s" => [0.0f64, 1.0],
            "turn" => [1i64, 2],
            "name" => ["a", "b"],
        }
        .unwrap();
        let data = from_dataframe(&df).unwrap();
        assert_eq!(data.get("turn").unwrap(), &[1.0, 2.0]);
        assert!(!data.contains("name"));
    }
}
