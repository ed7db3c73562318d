//! CSV writers for clustering snapshots.
//!
//! This module provides functions for writing engine state to disk:
//! - Micro-cluster snapshots (one row per cluster with its summary stats)
//! - Macro-cluster snapshots produced by the offline extraction

use std::fs::{self, File};
use std::io::BufWriter;
use std::path::Path;

use thiserror::Error;

use crate::core::microcluster::ClusterSet;
use crate::processors::offline::MacroCluster;

/// Errors that can occur during write operations.
#[derive(Error, Debug)]
pub enum WriteError {
    /// Failed to create parent directories.
    #[error("failed to create parent directories for '{path}': {source}")]
    CreateDirectory {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Failed to create or open file for writing.
    #[error("failed to create file '{path}': {source}")]
    CreateFile {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// CSV writing error.
    #[error("CSV write error for '{path}': {source}")]
    CsvError {
        path: String,
        #[source]
        source: csv::Error,
    },

    /// Failed to flush data to file.
    #[error("failed to write to file '{path}': {source}")]
    WriteFile {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result type for writer operations.
pub type Result<T> = std::result::Result<T, WriteError>;

fn ensure_parent_dirs(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|source| WriteError::CreateDirectory {
                path: path.display().to_string(),
                source,
            })?;
        }
    }
    Ok(())
}

fn open_csv_writer(path: &Path) -> Result<csv::Writer<BufWriter<File>>> {
    ensure_parent_dirs(path)?;
    let file = File::create(path).map_err(|source| WriteError::CreateFile {
        path: path.display().to_string(),
        source,
    })?;
    Ok(csv::Writer::from_writer(BufWriter::new(file)))
}

/// Write a micro-cluster snapshot to CSV.
///
/// Columns: `creation_time`, `weight`, `radius` (both read at `now`), then
/// one `c{i}` column per center dimension.
pub fn write_micro_clusters_csv(path: &Path, set: &ClusterSet, now: u64) -> Result<()> {
    let mut writer = open_csv_writer(path)?;
    let path_str = path.display().to_string();

    let dims = set.get(0).map_or(0, |c| c.dims());
    let mut header = vec![
        "creation_time".to_string(),
        "weight".to_string(),
        "radius".to_string(),
    ];
    header.extend((0..dims).map(|i| format!("c{}", i)));
    writer
        .write_record(&header)
        .map_err(|source| WriteError::CsvError {
            path: path_str.clone(),
            source,
        })?;

    for cluster in set {
        let mut record = vec![
            cluster.creation_time().to_string(),
            format!("{:.6}", cluster.weight_at(now)),
            format!("{:.6}", cluster.radius_at(now)),
        ];
        record.extend(cluster.center().iter().map(|v| format!("{:.6}", v)));
        writer
            .write_record(&record)
            .map_err(|source| WriteError::CsvError {
                path: path_str.clone(),
                source,
            })?;
    }

    writer.flush().map_err(|source| WriteError::WriteFile {
        path: path_str,
        source,
    })?;

    Ok(())
}

/// Write a macro-cluster snapshot to CSV.
///
/// Columns: `cluster`, `members`, `weight`, then one `c{i}` column per
/// center dimension.
pub fn write_macro_clusters_csv(path: &Path, clusters: &[MacroCluster]) -> Result<()> {
    let mut writer = open_csv_writer(path)?;
    let path_str = path.display().to_string();

    let dims = clusters.first().map_or(0, |c| c.center.len());
    let mut header = vec![
        "cluster".to_string(),
        "members".to_string(),
        "weight".to_string(),
    ];
    header.extend((0..dims).map(|i| format!("c{}", i)));
    writer
        .write_record(&header)
        .map_err(|source| WriteError::CsvError {
            path: path_str.clone(),
            source,
        })?;

    for (id, cluster) in clusters.iter().enumerate() {
        let mut record = vec![
            id.to_string(),
            cluster.members.len().to_string(),
            format!("{:.6}", cluster.weight),
        ];
        record.extend(cluster.center.iter().map(|v| format!("{:.6}", v)));
        writer
            .write_record(&record)
            .map_err(|source| WriteError::CsvError {
                path: path_str.clone(),
                source,
            })?;
    }

    writer.flush().map_err(|source| WriteError::WriteFile {
        path: path_str,
        source,
    })?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::microcluster::MicroCluster;
    use std::fs;
    use tempfile::tempdir;

    fn test_set() -> ClusterSet {
        let mut set = ClusterSet::new();
        let mut a = MicroCluster::new(&[0.0, 0.0], 0, 0.25);
        a.insert(&[1.0, 0.0], 0);
        set.add(a);
        set.add(MicroCluster::new(&[5.0, 5.0], 2, 0.25));
        set
    }

    #[test]
    fn test_write_micro_clusters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("micro.csv");

        write_micro_clusters_csv(&path, &test_set(), 2).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "creation_time,weight,radius,c0,c1");
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with("0,"));
        assert!(lines[2].starts_with("2,"));
    }

    #[test]
    fn test_write_micro_clusters_empty_set() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("micro.csv");

        write_micro_clusters_csv(&path, &ClusterSet::new(), 0).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content.lines().count(), 1); // header only
    }

    #[test]
    fn test_write_macro_clusters() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("macro.csv");
        let clusters = vec![
            MacroCluster {
                members: vec![0, 1],
                center: vec![0.5, 0.0],
                weight: 3.0,
            },
            MacroCluster {
                members: vec![2],
                center: vec![5.0, 5.0],
                weight: 1.0,
            },
        ];

        write_macro_clusters_csv(&path, &clusters).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines[0], "cluster,members,weight,c0,c1");
        assert!(lines[1].starts_with("0,2,3.000000"));
        assert!(lines[2].starts_with("1,1,1.000000"));
    }

    #[test]
    fn test_write_creates_parent_dirs() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("deep").join("micro.csv");

        write_micro_clusters_csv(&path, &test_set(), 0).unwrap();

        assert!(path.exists());
    }
}
