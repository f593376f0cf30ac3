// Re-export all types so consumers can keep using `domain::types::*`.
// The split below only organizes code internally.

pub use validation::*;
pub use chain::*;
pub use manifest::*;
pub use config::*;

// Module declarations
mod validation;
mod chain;
mod manifest;
mod config;
