//! Stream processing modules.

pub mod engine;
pub mod offline;
pub mod seeding;

// Re-export key types for convenience
pub use engine::{outlier_survival_bound, DenStream, EngineError};
pub use offline::{group_centers, group_clusters, MacroCluster};
pub use seeding::seed_initial_clusters;
