pub mod compose;
pub mod directive;
pub mod error;
pub mod manager;
pub mod policy;
pub mod types;
