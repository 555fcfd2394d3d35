//! Pure structural editing of workflow documents
//!
//! Every operation takes a document by reference and returns a new document;
//! inputs are never mutated. Operations re-establish the document-wide
//! invariants on the way out: unique ids, contiguous 1..N goal ordering,
//! and no dangling task dependencies.

pub mod engine;
pub mod operations;

use crate::validation::ValidationIssue;
use thiserror::Error;

pub use engine::*;
pub use operations::{
    ConstraintPatch, EditOperation, FormPatch, GoalPatch, MetadataPatch, PolicyPatch, TaskPatch,
};

/// Error types for editing operations
#[derive(Error, Debug)]
pub enum EditError {
    #[error("{kind} not found: {id}")]
    NotFound { kind: String, id: String },

    #[error("Duplicate id: {0}")]
    DuplicateId(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid reorder: {0}")]
    InvalidReorder(String),

    #[error("edit would produce an invalid document ({} errors)", .0.len())]
    InvalidResult(Vec<ValidationIssue>),
}

impl EditError {
    pub fn not_found(kind: impl std::fmt::Display, id: impl Into<String>) -> Self {
        EditError::NotFound {
            kind: kind.to_string(),
            id: id.into(),
        }
    }
}
