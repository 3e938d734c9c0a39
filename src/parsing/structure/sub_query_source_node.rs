use serde::{Deserialize, Serialize};

use crate::{
    expression::{Expr, Parameter, QuerySourceRef, TypeRef},
    parsing::errors::{ParseResult, ParserError},
    query_model::{BodyClause, ClauseRef, MainFromClause, QueryModel, SubQueryFromClause},
};

use super::{
    builder,
    clause_generation_context::{ClauseGenerationContext, ContextInfo, PendingProjection},
    ExpressionNode, NodeChain,
};

/// A nested query used as a source. The nested chain is built into its own
/// model, one level deeper than the model being built.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SubQuerySourceNode {
    pub chain: Box<NodeChain>,
}

impl SubQuerySourceNode {
    pub fn new(chain: NodeChain) -> Self {
        SubQuerySourceNode {
            chain: Box::new(chain),
        }
    }

    fn build_nested(&self, ctx: &ClauseGenerationContext) -> ParseResult<(QueryModel, TypeRef)> {
        let nested = builder::build_at_depth(&self.chain, ctx.config(), ctx.depth() + 1)?;
        let item_type = nested
            .result_operators()
            .iter()
            .rev()
            .find_map(|op| op.cast_item_type().cloned())
            .or_else(|| nested.output_item_type())
            .ok_or_else(|| {
                ParserError::InvalidState(format!("sub-query {} has no output item type", nested))
            })?;
        Ok((nested, item_type))
    }

    pub(super) fn create_main_from_clause(
        &self,
        node: &ExpressionNode,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<MainFromClause> {
        let (nested, item_type) = self.build_nested(ctx)?;
        let identifier = Parameter::new(node.associated_identifier.clone(), item_type);
        let clause = MainFromClause::new(identifier, Expr::sub_query(nested))?;
        ctx.add_context_info(
            node.id,
            ContextInfo::source(ClauseRef::MainFrom, QuerySourceRef::from(clause.source())),
        )?;
        Ok(clause)
    }

    pub(super) fn apply(
        &self,
        node: &ExpressionNode,
        model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        ctx.ensure_body_clause_allowed(&node.call_site)?;
        let (nested, item_type) = self.build_nested(ctx)?;
        let rendered = Expr::sub_query(nested.clone()).to_string();
        let identifier = Parameter::new(node.associated_identifier.clone(), item_type);
        let clause = SubQueryFromClause::new(identifier, nested)?;
        let reference = QuerySourceRef::from(clause.source());
        let position = model.add_body_clause(BodyClause::SubQueryFrom(clause));
        ctx.set_pending_projection(PendingProjection {
            node: node.id,
            clause: position,
            identifier: node.associated_identifier.clone(),
            source_expression: rendered,
        })?;
        ctx.add_context_info(node.id, ContextInfo::source(position, reference))
    }
}
