//! Stream point type and CSV point loading.
//!
//! This module provides the point record flowing through the engine and an
//! efficient parser for numeric point CSVs (one row per point, one column
//! per attribute, with or without a header row).

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

use csv::ReaderBuilder;
use thiserror::Error;

/// Errors that can occur during point loading.
#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV parsing error: {0}")]
    Csv(#[from] csv::Error),

    #[error("Empty file: {0}")]
    EmptyFile(PathBuf),

    #[error("Row {row} has {found} attributes, expected {expected}")]
    InconsistentDimensions {
        row: usize,
        expected: usize,
        found: usize,
    },

    #[error("Parse error at row {row}, column {column}: '{value}'")]
    ParseError {
        row: usize,
        column: usize,
        value: String,
    },
}

/// Result type for loader operations.
pub type Result<T> = std::result::Result<T, LoaderError>;

/// A single record in the point stream.
///
/// Points are immutable once read from the stream except for the `covered`
/// flag, which is only used while the point sits in the warm-up buffer
/// (it marks whether the seeding pass has assigned the point to a cluster).
#[derive(Debug, Clone)]
pub struct StreamPoint {
    /// Real-valued attributes of the point.
    pub values: Vec<f64>,
    /// Logical arrival time.
    pub timestamp: u64,
    /// Seeding-pass assignment flag.
    pub covered: bool,
}

impl StreamPoint {
    /// Creates a point from its attribute vector and arrival time.
    pub fn new(values: Vec<f64>, timestamp: u64) -> Self {
        Self {
            values,
            timestamp,
            covered: false,
        }
    }

    /// Returns the number of attributes.
    #[inline]
    pub fn num_attributes(&self) -> usize {
        self.values.len()
    }
}

/// Euclidean distance between two attribute vectors.
#[inline]
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len(), "vectors must have same length");
    a.iter()
        .zip(b.iter())
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum::<f64>()
        .sqrt()
}

/// Returns true if every field of the record parses as a float.
fn is_numeric_row(record: &csv::StringRecord) -> bool {
    !record.is_empty()
        && record
            .iter()
            .all(|field| field.trim().parse::<f64>().is_ok())
}

/// Load a stream of points from a CSV file.
///
/// Each row is one point; each column is one attribute. When `has_headers`
/// is `None`, the first row is sniffed: if every field parses as a float it
/// is treated as data, otherwise as a header.
///
/// # Arguments
///
/// * `path` - Path to the CSV file
/// * `has_headers` - Force header handling, or `None` to sniff
///
/// # Returns
///
/// The attribute vectors in file order.
///
/// # Errors
///
/// Fails on IO/CSV errors, an empty file, a non-numeric data field, or rows
/// with differing attribute counts.
pub fn load_points_csv(path: &Path, has_headers: Option<bool>) -> Result<Vec<Vec<f64>>> {
    let file = File::open(path)?;
    let reader = BufReader::with_capacity(64 * 1024, file);

    // Sniffing is done on our side, so the csv reader never skips rows.
    let mut csv_reader = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut points: Vec<Vec<f64>> = Vec::with_capacity(1024);
    let mut expected_dims: Option<usize> = None;

    for (row_idx, record) in csv_reader.records().enumerate() {
        let record = record?;

        if record.is_empty() || (record.len() == 1 && record[0].is_empty()) {
            continue;
        }

        if row_idx == 0 {
            let skip = match has_headers {
                Some(forced) => forced,
                None => !is_numeric_row(&record),
            };
            if skip {
                log::debug!("{}: skipping header row", path.display());
                continue;
            }
        }

        let mut values = Vec::with_capacity(record.len());
        for (col_idx, field) in record.iter().enumerate() {
            let value =
                field
                    .trim()
                    .parse::<f64>()
                    .map_err(|_| LoaderError::ParseError {
                        row: row_idx + 1,
                        column: col_idx + 1,
                        value: field.to_string(),
                    })?;
            values.push(value);
        }

        match expected_dims {
            None => expected_dims = Some(values.len()),
            Some(expected) if expected != values.len() => {
                return Err(LoaderError::InconsistentDimensions {
                    row: row_idx + 1,
                    expected,
                    found: values.len(),
                });
            }
            Some(_) => {}
        }

        points.push(values);
    }

    if points.is_empty() {
        return Err(LoaderError::EmptyFile(path.to_path_buf()));
    }

    log::info!(
        "{}: loaded {} points with {} attributes",
        path.display(),
        points.len(),
        expected_dims.unwrap_or(0)
    );

    Ok(points)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn write_file(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_stream_point_basics() {
        let point = StreamPoint::new(vec![1.0, 2.0, 3.0], 7);
        assert_eq!(point.num_attributes(), 3);
        assert_eq!(point.timestamp, 7);
        assert!(!point.covered);
    }

    #[test]
    fn test_euclidean_distance() {
        assert_eq!(euclidean_distance(&[0.0, 0.0], &[3.0, 4.0]), 5.0);
        assert_eq!(euclidean_distance(&[1.0], &[1.0]), 0.0);
    }

    #[test]
    fn test_load_with_header() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "pts.csv", "x,y\n1.0,2.0\n3.0,4.0\n");

        let points = load_points_csv(&path, None).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], vec![1.0, 2.0]);
        assert_eq!(points[1], vec![3.0, 4.0]);
    }

    #[test]
    fn test_load_without_header() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "pts.csv", "1.0,2.0\n3.0,4.0\n");

        let points = load_points_csv(&path, None).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0], vec![1.0, 2.0]);
    }

    #[test]
    fn test_load_forced_headers() {
        let dir = tempdir().unwrap();
        // First row is numeric but the caller says it is a header.
        let path = write_file(dir.path(), "pts.csv", "1.0,2.0\n3.0,4.0\n");

        let points = load_points_csv(&path, Some(true)).unwrap();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0], vec![3.0, 4.0]);
    }

    #[test]
    fn test_load_inconsistent_dimensions() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "pts.csv", "1.0,2.0\n3.0,4.0,5.0\n");

        let result = load_points_csv(&path, None);
        match result {
            Err(LoaderError::InconsistentDimensions {
                row,
                expected,
                found,
            }) => {
                assert_eq!(row, 2);
                assert_eq!(expected, 2);
                assert_eq!(found, 3);
            }
            _ => panic!("expected InconsistentDimensions error"),
        }
    }

    #[test]
    fn test_load_bad_field() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "pts.csv", "1.0,2.0\n3.0,oops\n");

        assert!(matches!(
            load_points_csv(&path, None),
            Err(LoaderError::ParseError { row: 2, column: 2, .. })
        ));
    }

    #[test]
    fn test_load_empty_file() {
        let dir = tempdir().unwrap();
        let path = write_file(dir.path(), "empty.csv", "");

        assert!(matches!(
            load_points_csv(&path, None),
            Err(LoaderError::EmptyFile(_))
        ));
    }
}
