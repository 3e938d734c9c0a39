use thiserror::Error;

use crate::query_model::QueryModelError;

/// Failures of query model construction. Construction is deterministic, so
/// none of these are worth retrying without changing the input.
#[derive(Debug, Clone, Error, PartialEq)]
pub enum ParserError {
    #[error("From expression '{identifier}' ({source_expression}) doesn't have a projection expression.")]
    MissingProjection {
        identifier: String,
        source_expression: String,
    },

    #[error("There is no projection for the select clause.")]
    NoProjection,

    #[error("Cannot resolve reference '{reference}': it does not appear in the source chain.")]
    UnresolvableReference { reference: String },

    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Sub-query nesting depth {depth} exceeds the configured limit of {limit}.")]
    RecursionLimit { depth: u32, limit: u32 },

    #[error("Query model error: {0}")]
    Model(#[from] QueryModelError),
}

pub type ParseResult<T> = Result<T, ParserError>;
