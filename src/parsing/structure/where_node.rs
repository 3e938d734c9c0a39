use serde::{Deserialize, Serialize};

use crate::{
    expression::LambdaExpr,
    parsing::errors::ParseResult,
    query_model::{BodyClause, QueryModel, WhereClause},
};

use super::{
    clause_generation_context::{ClauseGenerationContext, ContextInfo},
    ExpressionNode, NodeChain,
};

/// Filter. Adds a where clause and forwards resolution to its source.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WhereNode {
    pub predicate: LambdaExpr,
}

impl WhereNode {
    pub fn new(predicate: LambdaExpr) -> Self {
        WhereNode { predicate }
    }

    pub(super) fn apply(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        ctx.ensure_body_clause_allowed(&node.call_site)?;
        let predicate = chain.resolve_lambda(node.source_id()?, &self.predicate, ctx)?;
        let position = model.add_body_clause(BodyClause::Where(WhereClause::new(predicate)));
        ctx.add_context_info(node.id, ContextInfo::clause(position))
    }
}
