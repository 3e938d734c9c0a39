use serde::{Deserialize, Serialize};

use crate::{
    expression::LambdaExpr,
    parsing::errors::ParseResult,
    query_model::{BodyClause, ClauseRef, OrderByClause, Ordering, OrderingDirection, QueryModel},
};

use super::{
    clause_generation_context::{ClauseGenerationContext, ContextInfo},
    ExpressionNode, NodeChain,
};

/// `OrderBy` / `ThenBy` (and their descending forms).
///
/// `OrderBy` always opens a new order by clause. `ThenBy` appends to the
/// immediately preceding order by clause, or opens one if the last clause is
/// something else.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OrderByNode {
    pub key_selector: LambdaExpr,
    pub direction: OrderingDirection,
    #[serde(default)]
    pub then_by: bool,
}

impl OrderByNode {
    pub fn order_by(key_selector: LambdaExpr, direction: OrderingDirection) -> Self {
        OrderByNode {
            key_selector,
            direction,
            then_by: false,
        }
    }

    pub fn then_by(key_selector: LambdaExpr, direction: OrderingDirection) -> Self {
        OrderByNode {
            key_selector,
            direction,
            then_by: true,
        }
    }

    pub(super) fn apply(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        ctx.ensure_body_clause_allowed(&node.call_site)?;
        let key = chain.resolve_lambda(node.source_id()?, &self.key_selector, ctx)?;
        let ordering = Ordering::new(key, self.direction);

        let trailing = match model.last_clause() {
            ClauseRef::Body(index)
                if self.then_by
                    && model
                        .body_clause(index)
                        .is_some_and(|c| c.as_order_by().is_some()) =>
            {
                Some(ClauseRef::Body(index))
            }
            _ => None,
        };

        let position = match trailing {
            Some(clause) => {
                log::trace!("{} extends {}", node.call_site, clause);
                model.add_ordering(clause, ordering)?;
                clause
            }
            None => model.add_body_clause(BodyClause::OrderBy(OrderByClause::new(vec![ordering]))),
        };
        ctx.add_context_info(node.id, ContextInfo::clause(position))
    }
}
