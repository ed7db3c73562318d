//! Core data types and I/O operations.

pub mod loaders;
pub mod microcluster;
pub mod writers;

pub use loaders::{euclidean_distance, load_points_csv, LoaderError, StreamPoint};
pub use microcluster::{ClusterSet, MicroCluster};
pub use writers::{write_macro_clusters_csv, write_micro_clusters_csv, WriteError};
