//! Expression Visitor Pattern
//!
//! Read-only traversal of [`Expr`] trees. Implementors override the `visit_*`
//! methods they care about; [`walk_expression`] handles the recursion.
//!
//! Two analyses used by model construction live here:
//! - [`free_parameters`] - parameters not bound by an enclosing lambda
//! - [`source_references`] - query sources an expression points at

use super::{Expr, LambdaExpr, Parameter, QuerySourceRef};
use crate::query_model::{QueryModel, SourceId};

/// Trait for visiting Expr nodes.
///
/// The default implementations do nothing, allowing visitors to be selective.
pub trait ExpressionVisitor {
    type Output: Default;

    fn visit_parameter(&mut self, _param: &Parameter) -> Self::Output {
        Self::Output::default()
    }

    fn visit_source_ref(&mut self, _reference: &QuerySourceRef) -> Self::Output {
        Self::Output::default()
    }

    /// Called before the lambda body is walked.
    fn visit_lambda(&mut self, _lambda: &LambdaExpr) -> Self::Output {
        Self::Output::default()
    }

    /// Called after the lambda body was walked.
    fn leave_lambda(&mut self, _lambda: &LambdaExpr) {}

    /// Nested models are not descended into by the walker.
    fn visit_sub_query(&mut self, _model: &QueryModel) -> Self::Output {
        Self::Output::default()
    }

    /// Called for every other expression before its children are walked.
    fn visit_other(&mut self, _expr: &Expr) -> Self::Output {
        Self::Output::default()
    }
}

/// Walk an expression tree, calling visitor methods for each node.
pub fn walk_expression<V: ExpressionVisitor>(expr: &Expr, visitor: &mut V) -> V::Output {
    match expr {
        Expr::Parameter(param) => visitor.visit_parameter(param),
        Expr::QuerySourceRef(reference) => visitor.visit_source_ref(reference),
        Expr::SubQuery(model) => visitor.visit_sub_query(model),
        Expr::Lambda(lambda) => {
            let result = visitor.visit_lambda(lambda);
            walk_expression(&lambda.body, visitor);
            visitor.leave_lambda(lambda);
            result
        }
        other => {
            let result = visitor.visit_other(other);
            for child in other.children() {
                walk_expression(child, visitor);
            }
            result
        }
    }
}

#[derive(Default)]
struct FreeParameterCollector {
    bound: Vec<Parameter>,
    free: Vec<Parameter>,
}

impl ExpressionVisitor for FreeParameterCollector {
    type Output = ();

    fn visit_parameter(&mut self, param: &Parameter) {
        if !self.bound.contains(param) && !self.free.contains(param) {
            self.free.push(param.clone());
        }
    }

    fn visit_lambda(&mut self, lambda: &LambdaExpr) {
        self.bound.extend(lambda.params.iter().cloned());
    }

    fn leave_lambda(&mut self, lambda: &LambdaExpr) {
        let keep = self.bound.len() - lambda.params.len();
        self.bound.truncate(keep);
    }
}

/// Parameters referenced by `expr` that no enclosing lambda binds, in order of
/// first appearance.
pub fn free_parameters(expr: &Expr) -> Vec<Parameter> {
    let mut collector = FreeParameterCollector::default();
    walk_expression(expr, &mut collector);
    collector.free
}

#[derive(Default)]
struct SourceReferenceCollector {
    sources: Vec<SourceId>,
}

impl ExpressionVisitor for SourceReferenceCollector {
    type Output = ();

    fn visit_source_ref(&mut self, reference: &QuerySourceRef) {
        if !self.sources.contains(&reference.source) {
            self.sources.push(reference.source);
        }
    }
}

/// Query sources referenced by `expr`, not counting references inside nested models.
pub fn source_references(expr: &Expr) -> Vec<SourceId> {
    let mut collector = SourceReferenceCollector::default();
    walk_expression(expr, &mut collector);
    collector.sources
}
