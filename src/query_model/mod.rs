//! The normalized query model.
//!
//! [`QueryModel`] is the linear representation consumers walk instead of the
//! raw operator chain:
//!
//! ```text
//! MainFromClause ← body clause 0 ← body clause 1 ← ... ← SelectOrGroupClause
//!                                                       + result operators
//! ```
//!
//! Back-references between clauses are [`ClauseRef`] indices into the model,
//! never owning pointers. The model owns every clause; sub-query from clauses
//! own their nested model.
//!
//! # Query source identity
//!
//! Each source carries a [`SourceId`] drawn from a process-wide counter.
//! References match on the id only; item names are for display. Changing a
//! source's item type mints a new id (see [`QuerySource::retype`]), so stale
//! references show up in [`QueryModel::validate`] instead of silently
//! pointing at items of the wrong type.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use crate::expression::{visitors::source_references, Expr, Literal, Parameter, TypeRef};

pub mod clauses;
pub mod errors;
pub mod result_operators;

pub use clauses::{
    AdditionalFromClause, BodyClause, GroupClause, LetClause, MainFromClause, MemberFromClause,
    OrderByClause, Ordering, OrderingDirection, SelectClause, SelectOrGroupClause,
    SubQueryFromClause, WhereClause,
};
pub use errors::QueryModelError;
pub use result_operators::ResultOperator;

/// Global counter for query source identities.
static SOURCE_COUNTER: AtomicU64 = AtomicU64::new(1);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SourceId(u64);

impl SourceId {
    pub fn next() -> Self {
        SourceId(SOURCE_COUNTER.fetch_add(1, AtomicOrdering::SeqCst))
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A named, typed stream of items.
///
/// Names are not unique within a model; use [`QuerySource::id`] to match
/// references.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct QuerySource {
    id: SourceId,
    identifier: Parameter,
}

impl QuerySource {
    pub fn new(identifier: Parameter) -> Result<Self, QueryModelError> {
        if identifier.name.is_empty() {
            return Err(QueryModelError::EmptyItemName);
        }
        Ok(QuerySource {
            id: SourceId::next(),
            identifier,
        })
    }

    pub fn id(&self) -> SourceId {
        self.id
    }

    pub fn identifier(&self) -> &Parameter {
        &self.identifier
    }

    pub fn item_name(&self) -> &str {
        &self.identifier.name
    }

    pub fn item_type(&self) -> &TypeRef {
        &self.identifier.ty
    }

    pub fn set_item_name(&mut self, item_name: impl Into<String>) -> Result<(), QueryModelError> {
        let item_name = item_name.into();
        if item_name.is_empty() {
            return Err(QueryModelError::EmptyItemName);
        }
        self.identifier.name = item_name;
        Ok(())
    }

    /// Change the item type. Returns the new identity; existing references
    /// keep the old one and must be re-resolved.
    pub fn retype(&mut self, item_type: TypeRef) -> SourceId {
        self.identifier.ty = item_type;
        self.id = SourceId::next();
        self.id
    }
}

/// Position of a clause inside its model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ClauseRef {
    MainFrom,
    Body(usize),
}

impl fmt::Display for ClauseRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ClauseRef::MainFrom => f.write_str("main from clause"),
            ClauseRef::Body(index) => write!(f, "body clause {}", index),
        }
    }
}

/// Replace `expr` in place with `f(expr)`.
pub(crate) fn transform_in_place<F>(expr: &mut Expr, f: &mut F)
where
    F: FnMut(Expr) -> Expr,
{
    let placeholder = Expr::constant(Literal::Null, TypeRef::object());
    let owned = std::mem::replace(expr, placeholder);
    *expr = f(owned);
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct QueryModel {
    main_from_clause: MainFromClause,
    body_clauses: Vec<BodyClause>,
    select_or_group_clause: Option<SelectOrGroupClause>,
    result_operators: Vec<ResultOperator>,
    /// Type of the original query expression, not the item type.
    result_type: TypeRef,
}

impl QueryModel {
    pub fn new(main_from_clause: MainFromClause, result_type: TypeRef) -> Self {
        QueryModel {
            main_from_clause,
            body_clauses: vec![],
            select_or_group_clause: None,
            result_operators: vec![],
            result_type,
        }
    }

    pub fn main_from_clause(&self) -> &MainFromClause {
        &self.main_from_clause
    }

    pub fn main_from_clause_mut(&mut self) -> &mut MainFromClause {
        &mut self.main_from_clause
    }

    pub fn body_clauses(&self) -> &[BodyClause] {
        &self.body_clauses
    }

    pub fn body_clause(&self, index: usize) -> Option<&BodyClause> {
        self.body_clauses.get(index)
    }

    /// The clause the next appended clause will point back at.
    pub fn last_clause(&self) -> ClauseRef {
        match self.body_clauses.len() {
            0 => ClauseRef::MainFrom,
            n => ClauseRef::Body(n - 1),
        }
    }

    /// Append a body clause, linking it to the current last clause.
    pub fn add_body_clause(&mut self, mut clause: BodyClause) -> ClauseRef {
        let position = ClauseRef::Body(self.body_clauses.len());
        clause.attach(position, self.last_clause());
        self.body_clauses.push(clause);
        position
    }

    /// Append an ordering to the order by clause at `clause`.
    pub fn add_ordering(&mut self, clause: ClauseRef, ordering: Ordering) -> Result<(), QueryModelError> {
        let ClauseRef::Body(index) = clause else {
            return Err(QueryModelError::NotAnOrderByClause { clause });
        };
        let body = self
            .body_clauses
            .get_mut(index)
            .ok_or(QueryModelError::ClauseOutOfRange { clause })?;
        let order_by = body
            .as_order_by_mut()
            .ok_or(QueryModelError::NotAnOrderByClause { clause })?;
        order_by.push_ordering(ordering, clause);
        Ok(())
    }

    /// Set the projection of the from clause at `clause`.
    pub fn set_from_projection(&mut self, clause: ClauseRef, projection: Expr) -> Result<(), QueryModelError> {
        let ClauseRef::Body(index) = clause else {
            return Err(QueryModelError::NotAProjectingFromClause { clause });
        };
        let body = self
            .body_clauses
            .get_mut(index)
            .ok_or(QueryModelError::ClauseOutOfRange { clause })?;
        if body.set_projection_expression(projection) {
            Ok(())
        } else {
            Err(QueryModelError::NotAProjectingFromClause { clause })
        }
    }

    pub fn select_or_group_clause(&self) -> Option<&SelectOrGroupClause> {
        self.select_or_group_clause.as_ref()
    }

    /// Set the terminal clause, linking it to the current last clause.
    pub fn set_select_or_group_clause(&mut self, mut clause: SelectOrGroupClause) -> Result<(), QueryModelError> {
        if self.select_or_group_clause.is_some() {
            return Err(QueryModelError::SelectOrGroupClauseAlreadySet);
        }
        clause.set_previous_clause(self.last_clause());
        self.select_or_group_clause = Some(clause);
        Ok(())
    }

    pub fn result_operators(&self) -> &[ResultOperator] {
        &self.result_operators
    }

    pub fn add_result_operator(&mut self, operator: ResultOperator) {
        self.result_operators.push(operator);
    }

    pub fn result_type(&self) -> &TypeRef {
        &self.result_type
    }

    pub fn set_result_type(&mut self, result_type: TypeRef) {
        self.result_type = result_type;
    }

    /// Main from clause + body clauses + terminal clause if present.
    pub fn clause_count(&self) -> usize {
        1 + self.body_clauses.len() + usize::from(self.select_or_group_clause.is_some())
    }

    /// Every query source of this model, in clause order.
    pub fn query_sources(&self) -> Vec<&QuerySource> {
        std::iter::once(self.main_from_clause.source())
            .chain(self.body_clauses.iter().filter_map(BodyClause::query_source))
            .collect()
    }

    pub fn find_source(&self, id: SourceId) -> Option<&QuerySource> {
        self.query_sources().into_iter().find(|s| s.id() == id)
    }

    /// Type of the items produced by the terminal clause, before result operators.
    pub fn output_item_type(&self) -> Option<TypeRef> {
        self.select_or_group_clause
            .as_ref()
            .map(SelectOrGroupClause::output_item_type)
    }

    /// Apply `f` to every expression the model owns, replacing each with the
    /// result. Recurses into the models of sub-query from clauses.
    pub fn transform_expressions<F>(&mut self, f: &mut F)
    where
        F: FnMut(Expr) -> Expr,
    {
        self.main_from_clause.transform_expressions(f);
        for clause in &mut self.body_clauses {
            clause.transform_expressions(f);
        }
        if let Some(clause) = &mut self.select_or_group_clause {
            clause.transform_expressions(f);
        }
        for operator in &mut self.result_operators {
            operator.transform_expressions(f);
        }
    }

    /// Check the structural invariants of the model.
    pub fn validate(&self) -> Result<(), QueryModelError> {
        self.validate_within(&[])
    }

    fn validate_within(&self, outer: &[SourceId]) -> Result<(), QueryModelError> {
        let mut visible: Vec<SourceId> = outer.to_vec();

        check_references(
            "main from clause",
            std::iter::once(self.main_from_clause.from_expression()),
            &visible,
        )?;
        register_source(&mut visible, self.main_from_clause.source())?;

        for (index, clause) in self.body_clauses.iter().enumerate() {
            let position = ClauseRef::Body(index);
            let expected = match index {
                0 => ClauseRef::MainFrom,
                n => ClauseRef::Body(n - 1),
            };
            if clause.previous_clause() != expected {
                return Err(QueryModelError::BrokenChain {
                    clause: position,
                    expected,
                    found: clause.previous_clause(),
                });
            }

            if let Some(source) = clause.query_source() {
                register_source(&mut visible, source)?;
                if clause.is_from_like() && clause.projection_expression().is_none() {
                    return Err(QueryModelError::MissingFromProjection {
                        item_name: source.item_name().to_string(),
                    });
                }
            }

            if let BodyClause::OrderBy(order_by) = clause {
                for (i, ordering) in order_by.orderings().iter().enumerate() {
                    if ordering.order_by_clause() != Some(position) {
                        return Err(QueryModelError::OrderingBackReference {
                            clause: position,
                            index: i,
                        });
                    }
                }
            }

            if let BodyClause::SubQueryFrom(sub_query) = clause {
                sub_query.sub_query_model().validate_within(&visible)?;
            }

            check_references(&position.to_string(), clause.expressions().into_iter(), &visible)?;
        }

        let terminal = self
            .select_or_group_clause
            .as_ref()
            .ok_or(QueryModelError::MissingSelectOrGroupClause)?;
        if terminal.previous_clause() != self.last_clause() {
            return Err(QueryModelError::BrokenChain {
                clause: ClauseRef::Body(self.body_clauses.len()),
                expected: self.last_clause(),
                found: terminal.previous_clause(),
            });
        }
        check_references("select or group clause", terminal.expressions().into_iter(), &visible)?;

        for operator in &self.result_operators {
            check_references(operator.name(), operator.expressions().into_iter(), &visible)?;
        }
        Ok(())
    }
}

fn register_source(visible: &mut Vec<SourceId>, source: &QuerySource) -> Result<(), QueryModelError> {
    if visible.contains(&source.id()) {
        return Err(QueryModelError::DuplicateSource {
            item_name: source.item_name().to_string(),
            source_id: source.id(),
        });
    }
    visible.push(source.id());
    Ok(())
}

fn check_references<'a>(
    clause: &str,
    exprs: impl Iterator<Item = &'a Expr>,
    visible: &[SourceId],
) -> Result<(), QueryModelError> {
    for expr in exprs {
        if let Some(missing) = source_references(expr)
            .into_iter()
            .find(|id| !visible.contains(id))
        {
            return Err(QueryModelError::DanglingReference {
                clause: clause.to_string(),
                source_id: missing,
            });
        }
    }
    Ok(())
}

impl fmt::Display for QueryModel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.main_from_clause)?;
        for clause in &self.body_clauses {
            write!(f, " {}", clause)?;
        }
        if let Some(clause) = &self.select_or_group_clause {
            write!(f, " {}", clause)?;
        }
        for operator in &self.result_operators {
            write!(f, " => {}", operator)?;
        }
        Ok(())
    }
}
