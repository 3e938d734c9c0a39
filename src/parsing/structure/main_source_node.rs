use serde::{Deserialize, Serialize};

use crate::{
    expression::{Expr, Parameter, QuerySourceRef, TypeRef},
    parsing::errors::{ParseResult, ParserError},
    query_model::{AdditionalFromClause, BodyClause, ClauseRef, MainFromClause, QueryModel},
};

use super::{
    clause_generation_context::{ClauseGenerationContext, ContextInfo, PendingProjection},
    ExpressionNode,
};

/// A constant or externally supplied sequence, e.g. an in-memory array.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MainSourceNode {
    pub expression: Expr,
}

impl MainSourceNode {
    pub fn new(expression: Expr) -> Self {
        MainSourceNode { expression }
    }

    pub fn item_type(&self) -> ParseResult<TypeRef> {
        let ty = self.expression.ty();
        ty.element_type().cloned().ok_or_else(|| {
            ParserError::InvalidState(format!(
                "source expression {} of type {} is not a sequence",
                self.expression, ty
            ))
        })
    }

    fn identifier(&self, node: &ExpressionNode) -> ParseResult<Parameter> {
        Ok(Parameter::new(node.associated_identifier.clone(), self.item_type()?))
    }

    pub(super) fn create_main_from_clause(
        &self,
        node: &ExpressionNode,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<MainFromClause> {
        let clause = MainFromClause::new(self.identifier(node)?, self.expression.clone())?;
        ctx.add_context_info(
            node.id,
            ContextInfo::source(ClauseRef::MainFrom, QuerySourceRef::from(clause.source())),
        )?;
        Ok(clause)
    }

    /// A source after the first position joins another sequence. Its
    /// projection arrives with a later select.
    pub(super) fn apply(
        &self,
        node: &ExpressionNode,
        model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        ctx.ensure_body_clause_allowed(&node.call_site)?;
        let clause = AdditionalFromClause::new(self.identifier(node)?, self.expression.clone())?;
        let reference = QuerySourceRef::from(clause.source());
        let position = model.add_body_clause(BodyClause::AdditionalFrom(clause));
        ctx.set_pending_projection(PendingProjection {
            node: node.id,
            clause: position,
            identifier: node.associated_identifier.clone(),
            source_expression: self.expression.to_string(),
        })?;
        ctx.add_context_info(node.id, ContextInfo::source(position, reference))
    }
}
