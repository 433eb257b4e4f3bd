//! # Null Simulator
//!
//! Produces, for each entity, a matrix of synthetic return paths drawn from a normal
//! distribution matched to the entity's observed mean and standard deviation. Every test
//! that needs a null distribution reads its columns.
//!
//! Randomness is always explicit: callers hand in a seeded generator, typically obtained
//! from [`entity_rng`], so that a run can be replayed exactly.

pub mod error;
pub mod null;
pub mod synthetic;

pub use error::SimulationError;
pub use null::{NullMatrix, NullSimulator, entity_rng, round_to};
pub use synthetic::SyntheticDataset;
