//! Legacy construction path: builds a query model from a flat
//! [`ParseResultCollector`] instead of a node chain. No resolution happens
//! here; expressions are placed into clauses as the collector holds them.

pub mod parse_result_collector;
pub mod query_model_creator;

pub use parse_result_collector::{
    BodyExpressionData, FromExpressionData, LetExpressionData, OrderExpressionData,
    ParseResultCollector, WhereExpressionData,
};
pub use query_model_creator::QueryModelCreator;
