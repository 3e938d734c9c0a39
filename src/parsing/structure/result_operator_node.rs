use serde::{Deserialize, Serialize};

use crate::{
    expression::Expr,
    parsing::errors::{ParseResult, ParserError},
    query_model::{QueryModel, ResultOperator},
};

use super::{
    clause_generation_context::{ClauseGenerationContext, ContextInfo},
    ExpressionNode, NodeChain,
};

/// Count, Distinct, Take, First, All, ... Operator expressions that are
/// one-parameter lambdas (the `All` predicate) are resolved against the
/// source; everything else is carried as given.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ResultOperatorNode {
    pub operator: ResultOperator,
}

impl ResultOperatorNode {
    pub fn new(operator: ResultOperator) -> Self {
        ResultOperatorNode { operator }
    }

    pub(super) fn apply(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        if self.operator.cast_item_type().is_some() {
            return Err(ParserError::InvalidState(format!(
                "{} must be expressed as a cast node",
                self.operator.name()
            )));
        }

        let source = node.source_id()?;
        let mut operator = self.operator.clone();
        let mut failure = None;
        {
            let resolve_ctx: &ClauseGenerationContext = ctx;
            operator.transform_expressions(&mut |expr| match &expr {
                Expr::Lambda(lambda) if lambda.params.len() == 1 && failure.is_none() => {
                    match chain.resolve_lambda(source, lambda, resolve_ctx) {
                        Ok(resolved) => resolved,
                        Err(e) => {
                            failure = Some(e);
                            expr
                        }
                    }
                }
                _ => expr,
            });
        }
        if let Some(e) = failure {
            return Err(e);
        }

        log::trace!("{} adds result operator {}", node.call_site, operator);
        model.add_result_operator(operator);
        ctx.close_by_result_operator();
        ctx.add_context_info(node.id, ContextInfo::none())
    }
}
