use serde::{Deserialize, Serialize};

use crate::{
    expression::{substitution::substitute_parameter, Expr, LambdaExpr, Parameter, QuerySourceRef},
    parsing::errors::ParseResult,
    query_model::{BodyClause, LetClause, QueryModel},
};

use super::{
    clause_generation_context::{ClauseGenerationContext, ContextInfo},
    ExpressionNode, NodeChain,
};

/// `let identifier = value(x)`. The upstream item stays visible; the new
/// name resolves to the let clause.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LetNode {
    pub identifier: Parameter,
    pub value: LambdaExpr,
}

impl LetNode {
    pub fn new(identifier: Parameter, value: LambdaExpr) -> Self {
        LetNode { identifier, value }
    }

    pub(super) fn apply(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        ctx.ensure_body_clause_allowed(&node.call_site)?;
        let value = chain.resolve_lambda(node.source_id()?, &self.value, ctx)?;
        let clause = LetClause::new(self.identifier.clone(), value)?;
        let reference = QuerySourceRef::from(clause.source());
        let position = model.add_body_clause(BodyClause::Let(clause));
        ctx.add_context_info(node.id, ContextInfo::source(position, reference))
    }

    pub(super) fn resolve(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        input: &Parameter,
        body: &Expr,
        ctx: &ClauseGenerationContext,
    ) -> ParseResult<Expr> {
        let forwarded = chain.resolve(node.source_id()?, input, body, ctx)?;
        let reference = Expr::QuerySourceRef(ctx.source_ref(node.id)?.clone());
        Ok(substitute_parameter(&forwarded, &self.identifier, &reference))
    }
}
