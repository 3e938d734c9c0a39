//! Error types for query model operations.
//!
//! These errors report structural violations: a clause chain that is not
//! linear, references to sources the model does not contain, or clauses
//! missing data they are required to carry.

use thiserror::Error;

use super::{ClauseRef, SourceId};

#[derive(Debug, Clone, Error, PartialEq)]
pub enum QueryModelError {
    #[error("Query source item names must not be empty")]
    EmptyItemName,

    #[error("{clause} does not exist in this query model")]
    ClauseOutOfRange { clause: ClauseRef },

    #[error("{clause} is not an order by clause")]
    NotAnOrderByClause { clause: ClauseRef },

    #[error("{clause} is not a from clause that takes a projection")]
    NotAProjectingFromClause { clause: ClauseRef },

    #[error("Previous clause of {clause} must be {expected}, found {found}")]
    BrokenChain {
        clause: ClauseRef,
        expected: ClauseRef,
        found: ClauseRef,
    },

    #[error("Ordering {index} of {clause} does not point back at its order by clause")]
    OrderingBackReference { clause: ClauseRef, index: usize },

    #[error("From clause '{item_name}' has no projection expression")]
    MissingFromProjection { item_name: String },

    #[error("Query model has no select or group clause")]
    MissingSelectOrGroupClause,

    #[error("Query model already has a select or group clause")]
    SelectOrGroupClauseAlreadySet,

    #[error("Query source '{item_name}' ({source_id}) appears more than once")]
    DuplicateSource { item_name: String, source_id: SourceId },

    #[error("Expression in {clause} references query source {source_id}, which is not visible there")]
    DanglingReference { clause: String, source_id: SourceId },
}
