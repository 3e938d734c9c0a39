use serde::{Deserialize, Serialize};

use crate::{
    expression::{substitution::substitute_parameter, Expr, LambdaExpr, Parameter},
    parsing::errors::ParseResult,
    query_model::QueryModel,
};

use super::{
    clause_generation_context::{ClauseGenerationContext, ContextInfo, RegisteredProjection},
    ExpressionNode, NodeChain,
};

/// Projection. Adds no clause: it fills the projection of a from clause
/// waiting for one and registers itself as the candidate terminal
/// projection. The last registered projection becomes the select clause.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SelectNode {
    pub selector: LambdaExpr,
}

impl SelectNode {
    pub fn new(selector: LambdaExpr) -> Self {
        SelectNode { selector }
    }

    /// `x => x`
    pub fn is_identity(&self) -> bool {
        match (self.selector.single_parameter(), self.selector.body.as_ref()) {
            (Some(param), Expr::Parameter(body)) => param == body,
            _ => false,
        }
    }

    pub(super) fn apply(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        ctx.ensure_projection_allowed(&node.call_site, self.is_identity())?;
        let projection = chain.resolve_lambda(node.source_id()?, &self.selector, ctx)?;
        if let Some(pending) = ctx.take_pending_projection() {
            log::trace!(
                "{} supplies the projection of from clause '{}'",
                node.call_site,
                pending.identifier
            );
            model.set_from_projection(pending.clause, projection.clone())?;
        }
        ctx.register_projection(RegisteredProjection::Select(projection));
        ctx.add_context_info(node.id, ContextInfo::none())
    }

    pub(super) fn resolve(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        input: &Parameter,
        body: &Expr,
        ctx: &ClauseGenerationContext,
    ) -> ParseResult<Expr> {
        let projection = chain.resolve_lambda(node.source_id()?, &self.selector, ctx)?;
        Ok(substitute_parameter(body, input, &projection))
    }
}
