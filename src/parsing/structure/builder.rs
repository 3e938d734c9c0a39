//! Fold pass: applies a node chain in order and synthesizes the terminal clause.

use crate::{
    config::BuilderConfig,
    parsing::errors::{ParseResult, ParserError},
    query_model::{GroupClause, QueryModel, SelectClause, SelectOrGroupClause},
};

use super::{
    clause_generation_context::{ClauseGenerationContext, RegisteredProjection},
    create_main_from_clause, NodeChain,
};

pub fn build_query_model(chain: &NodeChain, config: &BuilderConfig) -> ParseResult<QueryModel> {
    build_at_depth(chain, config, 0)
}

/// Like [`build_query_model`], also returning the context so callers can
/// resolve further expressions against the chain.
pub fn build_query_model_with_context(
    chain: &NodeChain,
    config: &BuilderConfig,
) -> ParseResult<(QueryModel, ClauseGenerationContext)> {
    fold(chain, config, 0)
}

/// Build `chain` as a model nested `depth` levels below the outermost query.
pub(crate) fn build_at_depth(chain: &NodeChain, config: &BuilderConfig, depth: u32) -> ParseResult<QueryModel> {
    fold(chain, config, depth).map(|(model, _)| model)
}

fn fold(
    chain: &NodeChain,
    config: &BuilderConfig,
    depth: u32,
) -> ParseResult<(QueryModel, ClauseGenerationContext)> {
    if depth > config.max_subquery_depth {
        log::warn!(
            "build_query_model: sub-query depth {} exceeds limit {}",
            depth,
            config.max_subquery_depth
        );
        return Err(ParserError::RecursionLimit {
            depth,
            limit: config.max_subquery_depth,
        });
    }

    log::debug!(
        "build_query_model: folding {} nodes at depth {}",
        chain.len(),
        depth
    );

    let Some((first, rest)) = chain.nodes().split_first() else {
        return Err(ParserError::NoProjection);
    };
    chain.check_links()?;

    let mut ctx = ClauseGenerationContext::new(config.clone(), depth);
    let main_from_clause = create_main_from_clause(first, &mut ctx)?;
    let mut model = QueryModel::new(main_from_clause, chain.result_type().clone());

    for node in rest {
        node.apply(chain, &mut model, &mut ctx)?;
    }

    let terminal = match ctx.projection() {
        None => return Err(ParserError::NoProjection),
        Some(RegisteredProjection::Select(selector)) => {
            SelectOrGroupClause::Select(SelectClause::new(selector.clone()))
        }
        Some(RegisteredProjection::Group { key, element }) => {
            SelectOrGroupClause::Group(GroupClause::new(key.clone(), element.clone()))
        }
    };
    if let Some(pending) = ctx.take_pending_projection() {
        return Err(pending.into_error());
    }
    model.set_select_or_group_clause(terminal)?;

    log::debug!(
        "build_query_model: {} clauses, {} result operators",
        model.clause_count(),
        model.result_operators().len()
    );

    if config.validate_models {
        model.validate()?;
    }
    Ok((model, ctx))
}
