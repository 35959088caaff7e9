//! Worker configuration: YAML types, loading, and validation.

pub mod loader;
pub mod types;

pub use loader::ConfigLoader;
pub use types::*;
