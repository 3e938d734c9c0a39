use serde::{Deserialize, Serialize};

use crate::{
    expression::{substitution::substitute_parameter, Expr, LambdaExpr, Parameter, QuerySourceRef},
    parsing::errors::{ParseResult, ParserError},
    query_model::{
        AdditionalFromClause, BodyClause, ClauseRef, MemberFromClause, QueryModel, SubQueryFromClause,
    },
};

use super::{
    clause_generation_context::{
        ClauseGenerationContext, ContextInfo, PendingProjection, RegisteredProjection,
    },
    ensure_resolved, ExpressionNode, NodeChain,
};

/// `from x in source from y in collection_selector(x) select result_selector(x, y)`.
///
/// The kind of from clause follows the shape of the resolved collection:
/// a nested query gives a sub-query from clause, a member access gives a
/// member from clause, anything else an additional from clause. A result
/// selector is both the clause's projection and the current select projection.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SelectManyNode {
    pub collection_selector: LambdaExpr,
    #[serde(default)]
    pub result_selector: Option<LambdaExpr>,
}

impl SelectManyNode {
    pub fn new(collection_selector: LambdaExpr, result_selector: Option<LambdaExpr>) -> Self {
        SelectManyNode {
            collection_selector,
            result_selector,
        }
    }

    fn result_selector_parameters(&self) -> ParseResult<Option<(&Parameter, &Parameter)>> {
        match &self.result_selector {
            None => Ok(None),
            Some(selector) => match selector.params.as_slice() {
                [outer, inner] => Ok(Some((outer, inner))),
                _ => Err(ParserError::InvalidState(format!(
                    "result selector {} must take two parameters",
                    Expr::Lambda(selector.clone())
                ))),
            },
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
        if self.result_selector.is_some() {
            ctx.ensure_projection_allowed(&node.call_site, false)?;
        }
        let source = node.source_id()?;
        let from_expression = chain.resolve_lambda(source, &self.collection_selector, ctx)?;
        let from_type = from_expression.ty();
        let element_type = from_type.element_type().cloned().ok_or_else(|| {
            ParserError::InvalidState(format!(
                "collection selector {} of type {} is not a sequence",
                from_expression, from_type
            ))
        })?;

        let identifier = match self.result_selector_parameters()? {
            Some((_, inner)) => inner.clone(),
            None => Parameter::new(node.associated_identifier.clone(), element_type),
        };
        let rendered = from_expression.to_string();
        let clause = match from_expression {
            Expr::SubQuery(nested) => BodyClause::SubQueryFrom(SubQueryFromClause::new(identifier, *nested)?),
            member @ Expr::MemberAccess(_) => {
                BodyClause::MemberFrom(MemberFromClause::new(identifier, member)?)
            }
            other => BodyClause::AdditionalFrom(AdditionalFromClause::new(identifier, other)?),
        };
        let reference = clause
            .query_source()
            .map(QuerySourceRef::from)
            .ok_or_else(|| ParserError::InvalidState("from clause without a query source".into()))?;

        // Registered before the result selector is resolved; the selector's
        // second parameter refers to this clause.
        let position = ClauseRef::Body(model.body_clauses().len());
        ctx.add_context_info(node.id, ContextInfo::source(position, reference))?;

        match self.result_selector {
            Some(_) => {
                let projection = self.resolve_result_selector(node, chain, ctx)?;
                let mut clause = clause;
                clause.set_projection_expression(projection.clone());
                model.add_body_clause(clause);
                ctx.register_projection(RegisteredProjection::Select(projection));
            }
            None => {
                model.add_body_clause(clause);
                ctx.set_pending_projection(PendingProjection {
                    node: node.id,
                    clause: position,
                    identifier: node.associated_identifier.clone(),
                    source_expression: rendered,
                })?;
            }
        }
        Ok(())
    }

    fn resolve_result_selector(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        ctx: &ClauseGenerationContext,
    ) -> ParseResult<Expr> {
        let (Some(selector), Some((outer, inner))) =
            (&self.result_selector, self.result_selector_parameters()?)
        else {
            return Err(ParserError::InvalidState(format!(
                "{} has no result selector",
                node.call_site
            )));
        };
        let reference = Expr::QuerySourceRef(ctx.source_ref(node.id)?.clone());
        let with_inner = substitute_parameter(&selector.body, inner, &reference);
        let resolved = chain.resolve(node.source_id()?, outer, &with_inner, ctx)?;
        ensure_resolved(&resolved)?;
        Ok(resolved)
    }

    pub(super) fn resolve(
        &self,
        node: &ExpressionNode,
        chain: &NodeChain,
        input: &Parameter,
        body: &Expr,
        ctx: &ClauseGenerationContext,
    ) -> ParseResult<Expr> {
        let replacement = match self.result_selector {
            Some(_) => self.resolve_result_selector(node, chain, ctx)?,
            None => Expr::QuerySourceRef(ctx.source_ref(node.id)?.clone()),
        };
        Ok(substitute_parameter(body, input, &replacement))
    }
}
