//! Query model construction.
//!
//! Two entry points produce the same [`QueryModel`]:
//!
//! - [`build_query_model`] folds a [`NodeChain`] node by node, resolving the
//!   lambdas of each node against the clauses created so far
//! - [`create_query_model`] places the expressions of a
//!   [`ParseResultCollector`] into clauses directly
//!
//! Both fail with a [`ParserError`]; no partial model is returned.

pub mod errors;
pub mod legacy;
pub mod structure;

pub use errors::{ParseResult, ParserError};
pub use legacy::{ParseResultCollector, QueryModelCreator};
pub use structure::{
    builder::{build_query_model, build_query_model_with_context},
    ClauseGenerationContext, ExpressionNode, NodeChain, NodeId, NodeKind,
};

use crate::{config::BuilderConfig, expression::Expr, query_model::QueryModel};

/// Build a model from a collector. The result type is taken from `root`.
pub fn create_query_model(
    root: &Expr,
    collector: ParseResultCollector,
    config: &BuilderConfig,
) -> ParseResult<QueryModel> {
    QueryModelCreator::new(root.clone(), collector)
        .with_config(config.clone())
        .create_query_model()
}
