//! Data model for workflow template documents

pub mod workflow;

pub use workflow::*;
