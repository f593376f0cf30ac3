pub mod envelope;
pub mod evaluation;
pub mod source;
