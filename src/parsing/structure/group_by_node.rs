use serde::{Deserialize, Serialize};

use crate::{
    expression::{Expr, LambdaExpr},
    parsing::errors::{ParseResult, ParserError},
    query_model::QueryModel,
};

use super::{
    clause_generation_context::{ClauseGenerationContext, ContextInfo, RegisteredProjection},
    ExpressionNode, NodeChain,
};

/// `group element(x) by key(x)`; without an element selector the item itself
/// is grouped. Registers a group clause as the terminal projection.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GroupByNode {
    pub key_selector: LambdaExpr,
    #[serde(default)]
    pub element_selector: Option<LambdaExpr>,
}

impl GroupByNode {
    pub fn new(key_selector: LambdaExpr, element_selector: Option<LambdaExpr>) -> Self {
        GroupByNode {
            key_selector,
            element_selector,
        }
    }

    pub(super) fn apply(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        _model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        ctx.ensure_body_clause_allowed(&node.call_site)?;
        ctx.ensure_projection_allowed(&node.call_site, false)?;
        let source = node.source_id()?;
        let key = chain.resolve_lambda(source, &self.key_selector, ctx)?;
        let element = match &self.element_selector {
            Some(selector) => chain.resolve_lambda(source, selector, ctx)?,
            None => {
                let param = self.key_selector.single_parameter().ok_or_else(|| {
                    ParserError::InvalidState(format!(
                        "key selector {} must take one parameter",
                        Expr::Lambda(self.key_selector.clone())
                    ))
                })?;
                chain.resolve(source, param, &Expr::Parameter(param.clone()), ctx)?
            }
        };
        if let Some(pending) = ctx.pending_projection() {
            return Err(pending.clone().into_error());
        }
        ctx.register_projection(RegisteredProjection::Group { key, element });
        ctx.add_context_info(node.id, ContextInfo::none())
    }
}
