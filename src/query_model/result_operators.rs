//! Result operators.
//!
//! Trailing, order-sensitive steps applied to the item sequence a query model
//! produces. They stay outside the clause chain: `Take` after `Where` is not
//! the same as `Where` after `Take`, so operators are only ever appended.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::transform_in_place;
use crate::expression::{Expr, TypeRef};

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum ResultOperator {
    /// Converts every item to `cast_item_type`.
    Cast { cast_item_type: TypeRef },
    /// Keeps only items of `search_item_type`.
    OfType { search_item_type: TypeRef },
    Count,
    LongCount,
    Distinct,
    Take { count: Expr },
    Skip { count: Expr },
    First { return_default_when_empty: bool },
    Last { return_default_when_empty: bool },
    Single { return_default_when_empty: bool },
    Any,
    All { predicate: Expr },
    Contains { item: Expr },
    Sum,
    Min,
    Max,
    Average,
}

impl ResultOperator {
    pub fn name(&self) -> &'static str {
        match self {
            ResultOperator::Cast { .. } => "Cast",
            ResultOperator::OfType { .. } => "OfType",
            ResultOperator::Count => "Count",
            ResultOperator::LongCount => "LongCount",
            ResultOperator::Distinct => "Distinct",
            ResultOperator::Take { .. } => "Take",
            ResultOperator::Skip { .. } => "Skip",
            ResultOperator::First { return_default_when_empty: false } => "First",
            ResultOperator::First { .. } => "FirstOrDefault",
            ResultOperator::Last { return_default_when_empty: false } => "Last",
            ResultOperator::Last { .. } => "LastOrDefault",
            ResultOperator::Single { return_default_when_empty: false } => "Single",
            ResultOperator::Single { .. } => "SingleOrDefault",
            ResultOperator::Any => "Any",
            ResultOperator::All { .. } => "All",
            ResultOperator::Contains { .. } => "Contains",
            ResultOperator::Sum => "Sum",
            ResultOperator::Min => "Min",
            ResultOperator::Max => "Max",
            ResultOperator::Average => "Average",
        }
    }

    /// Item type after the operator for operators that change it.
    pub fn cast_item_type(&self) -> Option<&TypeRef> {
        match self {
            ResultOperator::Cast { cast_item_type } => Some(cast_item_type),
            ResultOperator::OfType { search_item_type } => Some(search_item_type),
            _ => None,
        }
    }

    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            ResultOperator::Take { count } | ResultOperator::Skip { count } => vec![count],
            ResultOperator::All { predicate } => vec![predicate],
            ResultOperator::Contains { item } => vec![item],
            _ => vec![],
        }
    }

    pub fn transform_expressions<F>(&mut self, f: &mut F)
    where
        F: FnMut(Expr) -> Expr,
    {
        match self {
            ResultOperator::Take { count } | ResultOperator::Skip { count } => {
                transform_in_place(count, f)
            }
            ResultOperator::All { predicate } => transform_in_place(predicate, f),
            ResultOperator::Contains { item } => transform_in_place(item, f),
            _ => {}
        }
    }
}

impl fmt::Display for ResultOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResultOperator::Cast { cast_item_type } => write!(f, "Cast<{}>()", cast_item_type),
            ResultOperator::OfType { search_item_type } => {
                write!(f, "OfType<{}>()", search_item_type)
            }
            op => {
                write!(f, "{}(", op.name())?;
                for (i, e) in op.expressions().into_iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", e)?;
                }
                f.write_str(")")
            }
        }
    }
}
