pub mod dataset;
pub mod enums;
pub mod error;
pub mod labeled;

// Re-export the core types to provide a clean public API.
pub use dataset::{Dataset, Entity, FactorMatrix};
pub use enums::TestKind;
pub use error::CoreError;
pub use labeled::LabeledArray;
