use serde::{Deserialize, Serialize};

use crate::{
    expression::{substitution::substitute_parameter, Expr, Parameter, TypeRef},
    parsing::errors::ParseResult,
    query_model::{QueryModel, ResultOperator},
};

use super::{
    clause_generation_context::{ClauseGenerationContext, ContextInfo},
    ExpressionNode, NodeChain,
};

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum CastKind {
    Cast,
    OfType,
}

/// `Cast<T>()` / `OfType<T>()`. Adds a result operator and changes the item
/// type seen by downstream nodes; references to the cast item resolve to an
/// explicit conversion of the upstream item.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct CastNode {
    pub cast_item_type: TypeRef,
    pub kind: CastKind,
}

impl CastNode {
    pub fn cast(cast_item_type: TypeRef) -> Self {
        CastNode {
            cast_item_type,
            kind: CastKind::Cast,
        }
    }

    pub fn of_type(search_item_type: TypeRef) -> Self {
        CastNode {
            cast_item_type: search_item_type,
            kind: CastKind::OfType,
        }
    }

    pub fn result_operator(&self) -> ResultOperator {
        match self.kind {
            CastKind::Cast => ResultOperator::Cast {
                cast_item_type: self.cast_item_type.clone(),
            },
            CastKind::OfType => ResultOperator::OfType {
                search_item_type: self.cast_item_type.clone(),
            },
        }
    }

    pub(super) fn apply(
        &self,
        node: &ExpressionNode,
        model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        model.add_result_operator(self.result_operator());
        // OfType drops items, so later filters would run on a different sequence.
        // Cast keeps the sequence but pins the projection.
        match self.kind {
            CastKind::OfType => ctx.close_by_result_operator(),
            CastKind::Cast => ctx.record_cast(),
        }
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
        let source = node.source_id()?;
        let upstream = Parameter::new(input.name.clone(), chain.output_item_type(source, ctx)?);
        let converted = Expr::convert(Expr::Parameter(upstream.clone()), self.cast_item_type.clone());
        let rewritten = substitute_parameter(body, input, &converted);
        chain.resolve(source, &upstream, &rewritten, ctx)
    }
}
