//! Capability interface between the streaming engine and a host driver.

use crate::processors::engine::EngineError;

/// A model that learns incrementally from a point stream.
///
/// The host loop owns the stream and feeds the model one point at a time;
/// the model owns all learned state. Implementations that cannot score
/// individual instances report `supports_votes() == false`.
pub trait StreamModel {
    /// Clears all learned state, keeping the configuration.
    fn reset(&mut self);

    /// Incorporates one point.
    fn ingest_one(&mut self, values: &[f64]) -> Result<(), EngineError>;

    /// A short human-readable description of the current model state.
    fn describe_model(&self) -> String;

    /// Whether the model can vote on individual instances.
    fn supports_votes(&self) -> bool;
}
