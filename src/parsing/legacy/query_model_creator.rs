use crate::{
    config::BuilderConfig,
    expression::Expr,
    parsing::errors::{ParseResult, ParserError},
    query_model::{
        AdditionalFromClause, BodyClause, ClauseRef, LetClause, MainFromClause, MemberFromClause,
        OrderByClause, Ordering, QueryModel, ResultOperator, SelectClause, SelectOrGroupClause,
        SubQueryFromClause, WhereClause,
    },
};

use super::parse_result_collector::{BodyExpressionData, FromExpressionData, ParseResultCollector};

/// Builds a query model directly from a [`ParseResultCollector`].
///
/// Projections are handed out in order to from records after the first one;
/// where, let and order records never take a projection. The last projection
/// becomes the select clause.
pub struct QueryModelCreator {
    expression_tree_root: Expr,
    collector: ParseResultCollector,
    config: BuilderConfig,
}

impl QueryModelCreator {
    pub fn new(expression_tree_root: Expr, collector: ParseResultCollector) -> Self {
        QueryModelCreator {
            expression_tree_root,
            collector,
            config: BuilderConfig::default(),
        }
    }

    pub fn with_config(mut self, config: BuilderConfig) -> Self {
        self.config = config;
        self
    }

    pub fn create_query_model(&self) -> ParseResult<QueryModel> {
        let mut body = self.collector.body_expressions.iter();
        let main_from_clause = match body.next() {
            Some(BodyExpressionData::From(from)) => {
                MainFromClause::new(from.identifier.clone(), from.typed_expression.clone())?
            }
            Some(other) => {
                return Err(ParserError::InvalidState(format!(
                    "the first body expression must be a from expression, found {}",
                    other.kind_name()
                )))
            }
            None => {
                return Err(ParserError::InvalidState(
                    "the query has no from expression".to_string(),
                ))
            }
        };

        log::debug!(
            "QueryModelCreator: {} body expressions, {} projections",
            self.collector.body_expressions.len(),
            self.collector.projection_expressions.len()
        );

        let mut model = QueryModel::new(main_from_clause, self.expression_tree_root.ty());
        let mut projections = self.collector.projection_expressions.iter();
        let mut current_order_by: Option<ClauseRef> = None;

        for expression in body {
            match expression {
                BodyExpressionData::From(from) => {
                    let projection = projections.next().ok_or_else(|| ParserError::MissingProjection {
                        identifier: from.identifier.name.clone(),
                        source_expression: from.typed_expression.to_string(),
                    })?;
                    model.add_body_clause(create_from_clause(from, projection.clone())?);
                    current_order_by = None;
                }
                BodyExpressionData::Where(data) => {
                    model.add_body_clause(BodyClause::Where(WhereClause::new(data.typed_expression.clone())));
                    current_order_by = None;
                }
                BodyExpressionData::Let(data) => {
                    let clause = LetClause::new(data.identifier.clone(), data.typed_expression.clone())?;
                    model.add_body_clause(BodyClause::Let(clause));
                    current_order_by = None;
                }
                BodyExpressionData::Order(data) => {
                    let ordering = Ordering::new(data.typed_expression.clone(), data.direction);
                    match current_order_by {
                        Some(clause) if !data.first_order_by => model.add_ordering(clause, ordering)?,
                        _ => {
                            let clause =
                                model.add_body_clause(BodyClause::OrderBy(OrderByClause::new(vec![ordering])));
                            current_order_by = Some(clause);
                        }
                    }
                }
            }
        }

        let Some(select_projection) = self.collector.projection_expressions.last() else {
            return Err(ParserError::NoProjection);
        };
        model.set_select_or_group_clause(SelectOrGroupClause::Select(SelectClause::new(
            select_projection.clone(),
        )))?;
        if self.collector.is_distinct {
            model.add_result_operator(ResultOperator::Distinct);
        }

        if self.config.validate_models {
            model.validate()?;
        }
        Ok(model)
    }
}

/// The clause kind follows the shape of the from expression, looking through a lambda.
fn create_from_clause(from: &FromExpressionData, projection: Expr) -> ParseResult<BodyClause> {
    let shape = match &from.typed_expression {
        Expr::Lambda(lambda) => lambda.body.as_ref(),
        other => other,
    };
    let identifier = from.identifier.clone();
    let clause = match shape {
        Expr::SubQuery(nested) => BodyClause::SubQueryFrom(
            SubQueryFromClause::new(identifier, nested.as_ref().clone())?.with_projection(projection),
        ),
        Expr::MemberAccess(_) => BodyClause::MemberFrom(
            MemberFromClause::new(identifier, from.typed_expression.clone())?.with_projection(projection),
        ),
        _ => BodyClause::AdditionalFrom(
            AdditionalFromClause::new(identifier, from.typed_expression.clone())?.with_projection(projection),
        ),
    };
    Ok(clause)
}
