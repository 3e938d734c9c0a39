use serde::{Deserialize, Serialize};

use crate::{
    expression::{Expr, Parameter},
    query_model::OrderingDirection,
};

/// `from identifier in typed_expression`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct FromExpressionData {
    pub typed_expression: Expr,
    pub identifier: Parameter,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WhereExpressionData {
    pub typed_expression: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LetExpressionData {
    pub identifier: Parameter,
    pub typed_expression: Expr,
}

/// One ordering. `first_order_by` starts a new order by clause.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OrderExpressionData {
    pub first_order_by: bool,
    pub direction: OrderingDirection,
    pub typed_expression: Expr,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum BodyExpressionData {
    From(FromExpressionData),
    Where(WhereExpressionData),
    Let(LetExpressionData),
    Order(OrderExpressionData),
}

impl BodyExpressionData {
    pub fn from(identifier: Parameter, typed_expression: Expr) -> Self {
        BodyExpressionData::From(FromExpressionData {
            typed_expression,
            identifier,
        })
    }

    pub fn where_(typed_expression: Expr) -> Self {
        BodyExpressionData::Where(WhereExpressionData { typed_expression })
    }

    pub fn let_(identifier: Parameter, typed_expression: Expr) -> Self {
        BodyExpressionData::Let(LetExpressionData {
            identifier,
            typed_expression,
        })
    }

    pub fn order(first_order_by: bool, direction: OrderingDirection, typed_expression: Expr) -> Self {
        BodyExpressionData::Order(OrderExpressionData {
            first_order_by,
            direction,
            typed_expression,
        })
    }

    pub fn kind_name(&self) -> &'static str {
        match self {
            BodyExpressionData::From(_) => "from",
            BodyExpressionData::Where(_) => "where",
            BodyExpressionData::Let(_) => "let",
            BodyExpressionData::Order(_) => "order",
        }
    }
}

/// Flat output of a comprehension parser: body records in source order and
/// projections, one per from record after the first plus the final select.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct ParseResultCollector {
    #[serde(default)]
    pub expression_tree_root: Option<Expr>,
    #[serde(default)]
    pub body_expressions: Vec<BodyExpressionData>,
    #[serde(default)]
    pub projection_expressions: Vec<Expr>,
    #[serde(default)]
    pub is_distinct: bool,
}

impl ParseResultCollector {
    pub fn new(expression_tree_root: Expr) -> Self {
        ParseResultCollector {
            expression_tree_root: Some(expression_tree_root),
            ..Default::default()
        }
    }

    pub fn add_body_expression(&mut self, expression: BodyExpressionData) {
        self.body_expressions.push(expression);
    }

    pub fn add_projection_expression(&mut self, expression: Expr) {
        self.projection_expressions.push(expression);
    }

    pub fn set_distinct(&mut self) {
        self.is_distinct = true;
    }
}
