//! Placeholder substitution over expression trees.
//!
//! Resolution rewrites user lambdas so that their parameters point at items of
//! the query model. The only primitive it needs is "replace every occurrence of
//! this subtree with that one", which is what this module provides.
//!
//! ```text
//! substitute(s.Name == "x", s, [s])  →  [s].Name == "x"
//! ```

use super::{Expr, Parameter};

/// Replace every subtree structurally equal to `placeholder` with `replacement`.
///
/// A parameter placeholder is not replaced inside a lambda that binds a
/// parameter equal to it; such occurrences belong to the inner binding.
pub fn substitute(expression: &Expr, placeholder: &Expr, replacement: &Expr) -> Expr {
    replace(expression.clone(), placeholder, replacement)
}

/// Shorthand for substituting a parameter.
pub fn substitute_parameter(expression: &Expr, parameter: &Parameter, replacement: &Expr) -> Expr {
    substitute(expression, &Expr::Parameter(parameter.clone()), replacement)
}

fn replace(expr: Expr, placeholder: &Expr, replacement: &Expr) -> Expr {
    if &expr == placeholder {
        return replacement.clone();
    }
    if let (Expr::Lambda(lambda), Expr::Parameter(param)) = (&expr, placeholder) {
        if lambda.params.contains(param) {
            return expr;
        }
    }
    expr.map_children(&mut |child| replace(child, placeholder, replacement))
}
