//! Streaming density-based clustering pipeline.
//!
//! This crate provides tools for:
//! - Maintaining an evolving micro-cluster summary of an unbounded point
//!   stream with time-decayed statistics (DenStream)
//! - Density-based warm-up seeding of the initial cluster population
//! - On-demand offline extraction of macro clusters from the summary
//! - Loading point streams from CSV and writing cluster snapshots
//!
//! # Example
//!
//! ```no_run
//! use denstream_pipeline::{DenStream, DenStreamConfig};
//!
//! let config = DenStreamConfig {
//!     mu: 10.0,
//!     init_points: 100,
//!     ..DenStreamConfig::default()
//! };
//! let mut engine = DenStream::new(config).unwrap();
//! engine.ingest(&[0.4, 0.7]).unwrap();
//! let macro_clusters = engine.extract();
//! ```

pub mod cli;
pub mod config;
pub mod core;
pub mod model;
pub mod processors;

pub use config::{ConfigError, DenStreamConfig, PipelineConfig, StreamConfig};
pub use core::loaders::StreamPoint;
pub use core::microcluster::{ClusterSet, MicroCluster};
pub use model::StreamModel;
pub use processors::engine::{DenStream, EngineError};
pub use processors::offline::MacroCluster;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
