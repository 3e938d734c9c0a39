//! Clauses of a query model.
//!
//! A model is `MainFromClause`, then zero or more [`BodyClause`]s in
//! evaluation order, then one [`SelectOrGroupClause`]. Every clause after the
//! main from clause records its predecessor as a [`ClauseRef`]; the model
//! assigns it when the clause is added.
//!
//! From-like clauses (main, additional, member, sub-query) and let clauses are
//! query sources: they own a [`QuerySource`] that expressions reference via
//! `Expr::QuerySourceRef`.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::{transform_in_place, ClauseRef, QueryModel, QueryModelError, QuerySource};
use crate::expression::{Expr, MemberAccess, Parameter, TypeRef};

/// The clause every query model starts from.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MainFromClause {
    source: QuerySource,
    from_expression: Expr,
}

impl MainFromClause {
    pub fn new(identifier: Parameter, from_expression: Expr) -> Result<Self, QueryModelError> {
        Ok(MainFromClause {
            source: QuerySource::new(identifier)?,
            from_expression,
        })
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    /// Renaming keeps the source identity; retyping mints a new one.
    pub fn source_mut(&mut self) -> &mut QuerySource {
        &mut self.source
    }

    pub fn identifier(&self) -> &Parameter {
        self.source.identifier()
    }

    pub fn item_name(&self) -> &str {
        self.source.item_name()
    }

    pub fn item_type(&self) -> &TypeRef {
        self.source.item_type()
    }

    pub fn from_expression(&self) -> &Expr {
        &self.from_expression
    }

    pub fn set_from_expression(&mut self, from_expression: Expr) {
        self.from_expression = from_expression;
    }

    pub fn transform_expressions<F>(&mut self, f: &mut F)
    where
        F: FnMut(Expr) -> Expr,
    {
        transform_in_place(&mut self.from_expression, f);
    }
}

impl fmt::Display for MainFromClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "from {} {} in {}",
            self.item_type(),
            self.item_name(),
            self.from_expression
        )
    }
}

/// A further source whose items are combined with the upstream items through
/// a projection.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct AdditionalFromClause {
    source: QuerySource,
    from_expression: Expr,
    projection_expression: Option<Expr>,
    previous_clause: ClauseRef,
}

impl AdditionalFromClause {
    pub fn new(identifier: Parameter, from_expression: Expr) -> Result<Self, QueryModelError> {
        Ok(AdditionalFromClause {
            source: QuerySource::new(identifier)?,
            from_expression,
            projection_expression: None,
            previous_clause: ClauseRef::MainFrom,
        })
    }

    pub fn with_projection(mut self, projection: Expr) -> Self {
        self.projection_expression = Some(projection);
        self
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    pub fn identifier(&self) -> &Parameter {
        self.source.identifier()
    }

    pub fn from_expression(&self) -> &Expr {
        &self.from_expression
    }

    pub fn projection_expression(&self) -> Option<&Expr> {
        self.projection_expression.as_ref()
    }

    pub fn previous_clause(&self) -> ClauseRef {
        self.previous_clause
    }
}

/// A from clause iterating a member of the upstream item, e.g.
/// `from k in s.Kitchens`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MemberFromClause {
    source: QuerySource,
    from_expression: Expr,
    projection_expression: Option<Expr>,
    previous_clause: ClauseRef,
}

impl MemberFromClause {
    pub fn new(identifier: Parameter, from_expression: Expr) -> Result<Self, QueryModelError> {
        Ok(MemberFromClause {
            source: QuerySource::new(identifier)?,
            from_expression,
            projection_expression: None,
            previous_clause: ClauseRef::MainFrom,
        })
    }

    pub fn with_projection(mut self, projection: Expr) -> Self {
        self.projection_expression = Some(projection);
        self
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    pub fn identifier(&self) -> &Parameter {
        self.source.identifier()
    }

    pub fn from_expression(&self) -> &Expr {
        &self.from_expression
    }

    /// The member access the clause iterates, looking through a lambda.
    pub fn member_expression(&self) -> Option<&MemberAccess> {
        let body = match &self.from_expression {
            Expr::Lambda(lambda) => lambda.body.as_ref(),
            other => other,
        };
        match body {
            Expr::MemberAccess(member) => Some(member),
            _ => None,
        }
    }

    pub fn projection_expression(&self) -> Option<&Expr> {
        self.projection_expression.as_ref()
    }

    pub fn previous_clause(&self) -> ClauseRef {
        self.previous_clause
    }
}

/// A from clause whose items come from an owned, nested query model.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SubQueryFromClause {
    source: QuerySource,
    sub_query_model: Box<QueryModel>,
    projection_expression: Option<Expr>,
    previous_clause: ClauseRef,
}

impl SubQueryFromClause {
    pub fn new(identifier: Parameter, sub_query_model: QueryModel) -> Result<Self, QueryModelError> {
        Ok(SubQueryFromClause {
            source: QuerySource::new(identifier)?,
            sub_query_model: Box::new(sub_query_model),
            projection_expression: None,
            previous_clause: ClauseRef::MainFrom,
        })
    }

    pub fn with_projection(mut self, projection: Expr) -> Self {
        self.projection_expression = Some(projection);
        self
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    pub fn identifier(&self) -> &Parameter {
        self.source.identifier()
    }

    pub fn sub_query_model(&self) -> &QueryModel {
        &self.sub_query_model
    }

    pub fn projection_expression(&self) -> Option<&Expr> {
        self.projection_expression.as_ref()
    }

    pub fn previous_clause(&self) -> ClauseRef {
        self.previous_clause
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct WhereClause {
    predicate: Expr,
    previous_clause: ClauseRef,
}

impl WhereClause {
    pub fn new(predicate: Expr) -> Self {
        WhereClause {
            predicate,
            previous_clause: ClauseRef::MainFrom,
        }
    }

    pub fn predicate(&self) -> &Expr {
        &self.predicate
    }

    pub fn previous_clause(&self) -> ClauseRef {
        self.previous_clause
    }
}

/// Binds a new named item next to the upstream item.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LetClause {
    source: QuerySource,
    expression: Expr,
    previous_clause: ClauseRef,
}

impl LetClause {
    pub fn new(identifier: Parameter, expression: Expr) -> Result<Self, QueryModelError> {
        Ok(LetClause {
            source: QuerySource::new(identifier)?,
            expression,
            previous_clause: ClauseRef::MainFrom,
        })
    }

    pub fn source(&self) -> &QuerySource {
        &self.source
    }

    pub fn identifier(&self) -> &Parameter {
        self.source.identifier()
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    pub fn previous_clause(&self) -> ClauseRef {
        self.previous_clause
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Copy, Serialize, Deserialize)]
pub enum OrderingDirection {
    Asc,
    Desc,
}

impl fmt::Display for OrderingDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OrderingDirection::Asc => f.write_str("asc"),
            OrderingDirection::Desc => f.write_str("desc"),
        }
    }
}

/// One sort key of an [`OrderByClause`].
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Ordering {
    expression: Expr,
    direction: OrderingDirection,
    /// The containing clause; set when the ordering is attached to a model.
    order_by_clause: Option<ClauseRef>,
}

impl Ordering {
    pub fn new(expression: Expr, direction: OrderingDirection) -> Self {
        Ordering {
            expression,
            direction,
            order_by_clause: None,
        }
    }

    pub fn expression(&self) -> &Expr {
        &self.expression
    }

    pub fn direction(&self) -> OrderingDirection {
        self.direction
    }

    pub fn order_by_clause(&self) -> Option<ClauseRef> {
        self.order_by_clause
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OrderByClause {
    orderings: Vec<Ordering>,
    previous_clause: ClauseRef,
}

impl OrderByClause {
    pub fn new(orderings: Vec<Ordering>) -> Self {
        OrderByClause {
            orderings,
            previous_clause: ClauseRef::MainFrom,
        }
    }

    pub fn orderings(&self) -> &[Ordering] {
        &self.orderings
    }

    pub fn previous_clause(&self) -> ClauseRef {
        self.previous_clause
    }

    pub(crate) fn push_ordering(&mut self, mut ordering: Ordering, owner: ClauseRef) {
        ordering.order_by_clause = Some(owner);
        self.orderings.push(ordering);
    }
}

/// A clause between the main from clause and the select or group clause.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum BodyClause {
    AdditionalFrom(AdditionalFromClause),
    MemberFrom(MemberFromClause),
    SubQueryFrom(SubQueryFromClause),
    Where(WhereClause),
    Let(LetClause),
    OrderBy(OrderByClause),
}

impl BodyClause {
    pub fn kind_name(&self) -> &'static str {
        match self {
            BodyClause::AdditionalFrom(_) => "AdditionalFromClause",
            BodyClause::MemberFrom(_) => "MemberFromClause",
            BodyClause::SubQueryFrom(_) => "SubQueryFromClause",
            BodyClause::Where(_) => "WhereClause",
            BodyClause::Let(_) => "LetClause",
            BodyClause::OrderBy(_) => "OrderByClause",
        }
    }

    pub fn previous_clause(&self) -> ClauseRef {
        match self {
            BodyClause::AdditionalFrom(c) => c.previous_clause,
            BodyClause::MemberFrom(c) => c.previous_clause,
            BodyClause::SubQueryFrom(c) => c.previous_clause,
            BodyClause::Where(c) => c.previous_clause,
            BodyClause::Let(c) => c.previous_clause,
            BodyClause::OrderBy(c) => c.previous_clause,
        }
    }

    /// Attach the clause at `position`, linking it to `previous`.
    pub(crate) fn attach(&mut self, position: ClauseRef, previous: ClauseRef) {
        match self {
            BodyClause::AdditionalFrom(c) => c.previous_clause = previous,
            BodyClause::MemberFrom(c) => c.previous_clause = previous,
            BodyClause::SubQueryFrom(c) => c.previous_clause = previous,
            BodyClause::Where(c) => c.previous_clause = previous,
            BodyClause::Let(c) => c.previous_clause = previous,
            BodyClause::OrderBy(c) => {
                c.previous_clause = previous;
                for ordering in &mut c.orderings {
                    ordering.order_by_clause = Some(position);
                }
            }
        }
    }

    /// The query source this clause introduces, if any.
    pub fn query_source(&self) -> Option<&QuerySource> {
        match self {
            BodyClause::AdditionalFrom(c) => Some(&c.source),
            BodyClause::MemberFrom(c) => Some(&c.source),
            BodyClause::SubQueryFrom(c) => Some(&c.source),
            BodyClause::Let(c) => Some(&c.source),
            BodyClause::Where(_) | BodyClause::OrderBy(_) => None,
        }
    }

    pub fn query_source_mut(&mut self) -> Option<&mut QuerySource> {
        match self {
            BodyClause::AdditionalFrom(c) => Some(&mut c.source),
            BodyClause::MemberFrom(c) => Some(&mut c.source),
            BodyClause::SubQueryFrom(c) => Some(&mut c.source),
            BodyClause::Let(c) => Some(&mut c.source),
            BodyClause::Where(_) | BodyClause::OrderBy(_) => None,
        }
    }

    /// True for from clauses that must carry a projection.
    pub fn is_from_like(&self) -> bool {
        matches!(
            self,
            BodyClause::AdditionalFrom(_) | BodyClause::MemberFrom(_) | BodyClause::SubQueryFrom(_)
        )
    }

    pub fn projection_expression(&self) -> Option<&Expr> {
        match self {
            BodyClause::AdditionalFrom(c) => c.projection_expression.as_ref(),
            BodyClause::MemberFrom(c) => c.projection_expression.as_ref(),
            BodyClause::SubQueryFrom(c) => c.projection_expression.as_ref(),
            _ => None,
        }
    }

    /// Returns false when the clause does not take a projection.
    pub(crate) fn set_projection_expression(&mut self, projection: Expr) -> bool {
        let slot = match self {
            BodyClause::AdditionalFrom(c) => &mut c.projection_expression,
            BodyClause::MemberFrom(c) => &mut c.projection_expression,
            BodyClause::SubQueryFrom(c) => &mut c.projection_expression,
            _ => return false,
        };
        *slot = Some(projection);
        true
    }

    pub(crate) fn as_order_by_mut(&mut self) -> Option<&mut OrderByClause> {
        match self {
            BodyClause::OrderBy(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_order_by(&self) -> Option<&OrderByClause> {
        match self {
            BodyClause::OrderBy(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_where(&self) -> Option<&WhereClause> {
        match self {
            BodyClause::Where(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_let(&self) -> Option<&LetClause> {
        match self {
            BodyClause::Let(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_additional_from(&self) -> Option<&AdditionalFromClause> {
        match self {
            BodyClause::AdditionalFrom(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_member_from(&self) -> Option<&MemberFromClause> {
        match self {
            BodyClause::MemberFrom(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_sub_query_from(&self) -> Option<&SubQueryFromClause> {
        match self {
            BodyClause::SubQueryFrom(c) => Some(c),
            _ => None,
        }
    }

    /// Expressions owned directly by the clause. Nested models are not included.
    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            BodyClause::AdditionalFrom(c) => std::iter::once(&c.from_expression)
                .chain(c.projection_expression.iter())
                .collect(),
            BodyClause::MemberFrom(c) => std::iter::once(&c.from_expression)
                .chain(c.projection_expression.iter())
                .collect(),
            BodyClause::SubQueryFrom(c) => c.projection_expression.iter().collect(),
            BodyClause::Where(c) => vec![&c.predicate],
            BodyClause::Let(c) => vec![&c.expression],
            BodyClause::OrderBy(c) => c.orderings.iter().map(|o| &o.expression).collect(),
        }
    }

    pub fn transform_expressions<F>(&mut self, f: &mut F)
    where
        F: FnMut(Expr) -> Expr,
    {
        match self {
            BodyClause::AdditionalFrom(c) => {
                transform_in_place(&mut c.from_expression, f);
                if let Some(projection) = &mut c.projection_expression {
                    transform_in_place(projection, f);
                }
            }
            BodyClause::MemberFrom(c) => {
                transform_in_place(&mut c.from_expression, f);
                if let Some(projection) = &mut c.projection_expression {
                    transform_in_place(projection, f);
                }
            }
            BodyClause::SubQueryFrom(c) => {
                c.sub_query_model.transform_expressions(f);
                if let Some(projection) = &mut c.projection_expression {
                    transform_in_place(projection, f);
                }
            }
            BodyClause::Where(c) => transform_in_place(&mut c.predicate, f),
            BodyClause::Let(c) => transform_in_place(&mut c.expression, f),
            BodyClause::OrderBy(c) => {
                for ordering in &mut c.orderings {
                    transform_in_place(&mut ordering.expression, f);
                }
            }
        }
    }
}

impl fmt::Display for BodyClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyClause::AdditionalFrom(c) => write!(
                f,
                "from {} {} in {}",
                c.source.item_type(),
                c.source.item_name(),
                c.from_expression
            ),
            BodyClause::MemberFrom(c) => write!(
                f,
                "from {} {} in {}",
                c.source.item_type(),
                c.source.item_name(),
                c.from_expression
            ),
            BodyClause::SubQueryFrom(c) => write!(
                f,
                "from {} {} in {{{}}}",
                c.source.item_type(),
                c.source.item_name(),
                c.sub_query_model
            ),
            BodyClause::Where(c) => write!(f, "where {}", c.predicate),
            BodyClause::Let(c) => write!(f, "let {} = {}", c.source.item_name(), c.expression),
            BodyClause::OrderBy(c) => {
                f.write_str("orderby ")?;
                for (i, ordering) in c.orderings.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{} {}", ordering.expression, ordering.direction)?;
                }
                Ok(())
            }
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct SelectClause {
    selector: Expr,
    previous_clause: ClauseRef,
}

impl SelectClause {
    pub fn new(selector: Expr) -> Self {
        SelectClause {
            selector,
            previous_clause: ClauseRef::MainFrom,
        }
    }

    pub fn selector(&self) -> &Expr {
        &self.selector
    }

    pub fn previous_clause(&self) -> ClauseRef {
        self.previous_clause
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct GroupClause {
    key_selector: Expr,
    element_selector: Expr,
    previous_clause: ClauseRef,
}

impl GroupClause {
    pub fn new(key_selector: Expr, element_selector: Expr) -> Self {
        GroupClause {
            key_selector,
            element_selector,
            previous_clause: ClauseRef::MainFrom,
        }
    }

    pub fn key_selector(&self) -> &Expr {
        &self.key_selector
    }

    pub fn element_selector(&self) -> &Expr {
        &self.element_selector
    }

    pub fn previous_clause(&self) -> ClauseRef {
        self.previous_clause
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum SelectOrGroupClause {
    Select(SelectClause),
    Group(GroupClause),
}

impl SelectOrGroupClause {
    pub fn previous_clause(&self) -> ClauseRef {
        match self {
            SelectOrGroupClause::Select(c) => c.previous_clause,
            SelectOrGroupClause::Group(c) => c.previous_clause,
        }
    }

    pub(crate) fn set_previous_clause(&mut self, previous: ClauseRef) {
        match self {
            SelectOrGroupClause::Select(c) => c.previous_clause = previous,
            SelectOrGroupClause::Group(c) => c.previous_clause = previous,
        }
    }

    pub fn as_select(&self) -> Option<&SelectClause> {
        match self {
            SelectOrGroupClause::Select(c) => Some(c),
            SelectOrGroupClause::Group(_) => None,
        }
    }

    pub fn as_group(&self) -> Option<&GroupClause> {
        match self {
            SelectOrGroupClause::Group(c) => Some(c),
            SelectOrGroupClause::Select(_) => None,
        }
    }

    /// Type of the items the query produces. Lambda selectors contribute the
    /// type of their body.
    pub fn output_item_type(&self) -> TypeRef {
        fn projected(expr: &Expr) -> TypeRef {
            match expr {
                Expr::Lambda(lambda) => lambda.body.ty(),
                other => other.ty(),
            }
        }
        match self {
            SelectOrGroupClause::Select(c) => projected(&c.selector),
            SelectOrGroupClause::Group(c) => {
                TypeRef::grouping(projected(&c.key_selector), projected(&c.element_selector))
            }
        }
    }

    pub fn expressions(&self) -> Vec<&Expr> {
        match self {
            SelectOrGroupClause::Select(c) => vec![&c.selector],
            SelectOrGroupClause::Group(c) => vec![&c.key_selector, &c.element_selector],
        }
    }

    pub fn transform_expressions<F>(&mut self, f: &mut F)
    where
        F: FnMut(Expr) -> Expr,
    {
        match self {
            SelectOrGroupClause::Select(c) => transform_in_place(&mut c.selector, f),
            SelectOrGroupClause::Group(c) => {
                transform_in_place(&mut c.key_selector, f);
                transform_in_place(&mut c.element_selector, f);
            }
        }
    }
}

impl fmt::Display for SelectOrGroupClause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SelectOrGroupClause::Select(c) => write!(f, "select {}", c.selector),
            SelectOrGroupClause::Group(c) => {
                write!(f, "group {} by {}", c.element_selector, c.key_selector)
            }
        }
    }
}
