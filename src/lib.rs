//! querymodel - front-end of a query translation pipeline
//!
//! This crate turns a query expression into a normalized query model through:
//! - A node chain mirroring the query's operation sequence
//! - A fold pass that applies each node and resolves its lambdas
//! - A legacy path building the model from pre-parsed comprehension parts
//! - The query model itself: ordered clauses plus trailing result operators

pub mod config;
pub mod expression;
pub mod parsing;
pub mod query_model;
