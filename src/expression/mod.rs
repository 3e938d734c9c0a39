//! Host expression tree.
//!
//! [`Expr`] is the expression language embedded in query operations and in
//! the clauses of a [`QueryModel`]. Every expression knows its static type
//! ([`Expr::ty`]); types are carried as [`TypeRef`] values and only
//! propagated, never checked.
//!
//! # Key Components
//!
//! - [`Expr`] - closed set of expression kinds
//! - [`TypeRef`] - type names with generic arguments (sequences expose an element type)
//! - [`substitution`] - placeholder replacement used by node resolution
//! - [`visitors`] - read-only traversal and free-parameter analysis

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::query_model::{QueryModel, QuerySource, SourceId};

pub mod substitution;
pub mod visitors;

pub use substitution::substitute;
pub use visitors::{free_parameters, walk_expression, ExpressionVisitor};

const ARRAY_TYPE_NAME: &str = "[]";
const GROUPING_TYPE_NAME: &str = "IGrouping";
const FUNC_TYPE_NAME: &str = "Func";

/// Generic type names whose single argument is the element type.
const SEQUENCE_TYPE_NAMES: &[&str] = &[
    ARRAY_TYPE_NAME,
    "IEnumerable",
    "IQueryable",
    "IOrderedEnumerable",
    "IOrderedQueryable",
    "List",
];

/// A type name plus generic arguments, e.g. `IQueryable<Cook>` or `Cook[]`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TypeRef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<TypeRef>,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef {
            name: name.into(),
            args: vec![],
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeRef>) -> Self {
        TypeRef {
            name: name.into(),
            args,
        }
    }

    pub fn array(element: TypeRef) -> Self {
        Self::generic(ARRAY_TYPE_NAME, vec![element])
    }

    pub fn enumerable(element: TypeRef) -> Self {
        Self::generic("IEnumerable", vec![element])
    }

    pub fn queryable(element: TypeRef) -> Self {
        Self::generic("IQueryable", vec![element])
    }

    pub fn grouping(key: TypeRef, element: TypeRef) -> Self {
        Self::generic(GROUPING_TYPE_NAME, vec![key, element])
    }

    pub fn boolean() -> Self {
        Self::named("bool")
    }

    pub fn int32() -> Self {
        Self::named("int")
    }

    pub fn string() -> Self {
        Self::named("string")
    }

    pub fn object() -> Self {
        Self::named("object")
    }

    /// Element type of a sequence type; the element of `IGrouping<K, E>` is `E`.
    pub fn element_type(&self) -> Option<&TypeRef> {
        if self.name == GROUPING_TYPE_NAME {
            return self.args.get(1);
        }
        if self.args.len() == 1 && SEQUENCE_TYPE_NAMES.contains(&self.name.as_str()) {
            return self.args.first();
        }
        None
    }

    pub fn is_sequence(&self) -> bool {
        self.element_type().is_some()
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.name == ARRAY_TYPE_NAME && self.args.len() == 1 {
            return write!(f, "{}[]", self.args[0]);
        }
        f.write_str(&self.name)?;
        if !self.args.is_empty() {
            f.write_str("<")?;
            for (i, arg) in self.args.iter().enumerate() {
                if i > 0 {
                    f.write_str(", ")?;
                }
                write!(f, "{}", arg)?;
            }
            f.write_str(">")?;
        }
        Ok(())
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Literal {
    Null,
    Boolean(bool),
    Integer(i64),
    Float(f64),
    String(String),
    /// A value supplied by the caller that the model only carries around,
    /// such as the in-memory collection a query starts from.
    Opaque(String),
}

impl fmt::Display for Literal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Literal::Null => f.write_str("null"),
            Literal::Boolean(b) => write!(f, "{}", b),
            Literal::Integer(i) => write!(f, "{}", i),
            Literal::Float(x) => write!(f, "{}", x),
            Literal::String(s) => write!(f, "\"{}\"", s),
            Literal::Opaque(desc) => write!(f, "value({})", desc),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Constant {
    pub value: Literal,
    pub ty: TypeRef,
}

/// A named, typed placeholder, e.g. the `s` in `s => s.Name`.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
pub struct Parameter {
    pub name: String,
    pub ty: TypeRef,
}

impl Parameter {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Parameter {
            name: name.into(),
            ty,
        }
    }
}

/// Reference to the items produced by a query source of the model.
///
/// Matching is by `source`; `item_name` is carried for display only.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct QuerySourceRef {
    pub source: SourceId,
    pub item_name: String,
    pub item_type: TypeRef,
}

impl From<&QuerySource> for QuerySourceRef {
    fn from(source: &QuerySource) -> Self {
        QuerySourceRef {
            source: source.id(),
            item_name: source.item_name().to_string(),
            item_type: source.item_type().clone(),
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MemberAccess {
    pub object: Box<Expr>,
    pub member: String,
    pub ty: TypeRef,
}

/// Explicit type conversion, rendered as `Convert(operand, Type)`.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Convert {
    pub operand: Box<Expr>,
    pub ty: TypeRef,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum UnaryOperator {
    Not,
    Negate,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct UnaryApplication {
    pub operator: UnaryOperator,
    pub operand: Box<Expr>,
    pub ty: TypeRef,
}

#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub enum BinaryOperator {
    Equal,
    NotEqual,
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
    AndAlso,
    OrElse,
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulo,
}

impl BinaryOperator {
    /// Operators whose result is a boolean regardless of operand types.
    pub fn is_predicate(self) -> bool {
        !matches!(
            self,
            BinaryOperator::Add
                | BinaryOperator::Subtract
                | BinaryOperator::Multiply
                | BinaryOperator::Divide
                | BinaryOperator::Modulo
        )
    }

    fn symbol(self) -> &'static str {
        match self {
            BinaryOperator::Equal => "==",
            BinaryOperator::NotEqual => "!=",
            BinaryOperator::LessThan => "<",
            BinaryOperator::LessThanOrEqual => "<=",
            BinaryOperator::GreaterThan => ">",
            BinaryOperator::GreaterThanOrEqual => ">=",
            BinaryOperator::AndAlso => "&&",
            BinaryOperator::OrElse => "||",
            BinaryOperator::Add => "+",
            BinaryOperator::Subtract => "-",
            BinaryOperator::Multiply => "*",
            BinaryOperator::Divide => "/",
            BinaryOperator::Modulo => "%",
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct BinaryApplication {
    pub operator: BinaryOperator,
    pub left: Box<Expr>,
    pub right: Box<Expr>,
    pub ty: TypeRef,
}

/// Method or function call; `object` is `None` for static calls.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct MethodCall {
    pub object: Option<Box<Expr>>,
    pub method: String,
    pub args: Vec<Expr>,
    pub ty: TypeRef,
}

/// Object construction. With `members` set this is an anonymous-type style
/// initializer (`new { a = x, b = y }`), one member name per argument.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NewObject {
    pub ty: TypeRef,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub members: Vec<String>,
    pub args: Vec<Expr>,
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct LambdaExpr {
    pub params: Vec<Parameter>,
    pub body: Box<Expr>,
}

impl LambdaExpr {
    pub fn new(params: Vec<Parameter>, body: Expr) -> Self {
        LambdaExpr {
            params,
            body: Box::new(body),
        }
    }

    /// The parameter of a one-argument lambda.
    pub fn single_parameter(&self) -> Option<&Parameter> {
        match self.params.as_slice() {
            [param] => Some(param),
            _ => None,
        }
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum Expr {
    Constant(Constant),

    Parameter(Parameter),

    /// Reference to a from clause, let clause or sub-query of the model.
    QuerySourceRef(QuerySourceRef),

    MemberAccess(MemberAccess),

    Convert(Convert),

    Unary(UnaryApplication),

    Binary(BinaryApplication),

    Call(MethodCall),

    New(NewObject),

    Lambda(LambdaExpr),

    /// A nested, fully built query model used as a value.
    SubQuery(Box<QueryModel>),
}

impl Expr {
    pub fn constant(value: Literal, ty: TypeRef) -> Self {
        Expr::Constant(Constant { value, ty })
    }

    /// Opaque caller-provided value such as an in-memory array.
    pub fn opaque(description: impl Into<String>, ty: TypeRef) -> Self {
        Self::constant(Literal::Opaque(description.into()), ty)
    }

    pub fn integer(value: i64) -> Self {
        Self::constant(Literal::Integer(value), TypeRef::int32())
    }

    pub fn parameter(name: impl Into<String>, ty: TypeRef) -> Self {
        Expr::Parameter(Parameter::new(name, ty))
    }

    pub fn source_ref(source: &QuerySource) -> Self {
        Expr::QuerySourceRef(QuerySourceRef::from(source))
    }

    pub fn member(object: Expr, member: impl Into<String>, ty: TypeRef) -> Self {
        Expr::MemberAccess(MemberAccess {
            object: Box::new(object),
            member: member.into(),
            ty,
        })
    }

    pub fn convert(operand: Expr, ty: TypeRef) -> Self {
        Expr::Convert(Convert {
            operand: Box::new(operand),
            ty,
        })
    }

    pub fn not(operand: Expr) -> Self {
        Expr::Unary(UnaryApplication {
            operator: UnaryOperator::Not,
            operand: Box::new(operand),
            ty: TypeRef::boolean(),
        })
    }

    pub fn binary(operator: BinaryOperator, left: Expr, right: Expr) -> Self {
        let ty = if operator.is_predicate() {
            TypeRef::boolean()
        } else {
            left.ty()
        };
        Expr::Binary(BinaryApplication {
            operator,
            left: Box::new(left),
            right: Box::new(right),
            ty,
        })
    }

    pub fn call(object: Option<Expr>, method: impl Into<String>, args: Vec<Expr>, ty: TypeRef) -> Self {
        Expr::Call(MethodCall {
            object: object.map(Box::new),
            method: method.into(),
            args,
            ty,
        })
    }

    pub fn new_object(ty: TypeRef, members: Vec<String>, args: Vec<Expr>) -> Self {
        Expr::New(NewObject { ty, members, args })
    }

    pub fn lambda(params: Vec<Parameter>, body: Expr) -> Self {
        Expr::Lambda(LambdaExpr::new(params, body))
    }

    pub fn sub_query(model: QueryModel) -> Self {
        Expr::SubQuery(Box::new(model))
    }

    /// Static type of the expression.
    pub fn ty(&self) -> TypeRef {
        match self {
            Expr::Constant(c) => c.ty.clone(),
            Expr::Parameter(p) => p.ty.clone(),
            Expr::QuerySourceRef(r) => r.item_type.clone(),
            Expr::MemberAccess(m) => m.ty.clone(),
            Expr::Convert(c) => c.ty.clone(),
            Expr::Unary(u) => u.ty.clone(),
            Expr::Binary(b) => b.ty.clone(),
            Expr::Call(c) => c.ty.clone(),
            Expr::New(n) => n.ty.clone(),
            Expr::Lambda(l) => {
                let mut args: Vec<TypeRef> = l.params.iter().map(|p| p.ty.clone()).collect();
                args.push(l.body.ty());
                TypeRef::generic(FUNC_TYPE_NAME, args)
            }
            Expr::SubQuery(model) => model.result_type().clone(),
        }
    }

    pub fn as_lambda(&self) -> Option<&LambdaExpr> {
        match self {
            Expr::Lambda(l) => Some(l),
            _ => None,
        }
    }

    /// Direct child expressions. Nested query models are opaque here.
    pub fn children(&self) -> Vec<&Expr> {
        match self {
            Expr::Constant(_)
            | Expr::Parameter(_)
            | Expr::QuerySourceRef(_)
            | Expr::SubQuery(_) => vec![],
            Expr::MemberAccess(m) => vec![&m.object],
            Expr::Convert(c) => vec![&c.operand],
            Expr::Unary(u) => vec![&u.operand],
            Expr::Binary(b) => vec![&b.left, &b.right],
            Expr::Call(c) => c.object.iter().map(|o| o.as_ref()).chain(c.args.iter()).collect(),
            Expr::New(n) => n.args.iter().collect(),
            Expr::Lambda(l) => vec![&l.body],
        }
    }

    /// Rebuild this expression with every direct child replaced by `f(child)`.
    pub fn map_children<F>(self, f: &mut F) -> Expr
    where
        F: FnMut(Expr) -> Expr,
    {
        match self {
            leaf @ (Expr::Constant(_)
            | Expr::Parameter(_)
            | Expr::QuerySourceRef(_)
            | Expr::SubQuery(_)) => leaf,
            Expr::MemberAccess(m) => Expr::MemberAccess(MemberAccess {
                object: Box::new(f(*m.object)),
                member: m.member,
                ty: m.ty,
            }),
            Expr::Convert(c) => Expr::Convert(Convert {
                operand: Box::new(f(*c.operand)),
                ty: c.ty,
            }),
            Expr::Unary(u) => Expr::Unary(UnaryApplication {
                operator: u.operator,
                operand: Box::new(f(*u.operand)),
                ty: u.ty,
            }),
            Expr::Binary(b) => {
                let left = f(*b.left);
                let right = f(*b.right);
                Expr::Binary(BinaryApplication {
                    operator: b.operator,
                    left: Box::new(left),
                    right: Box::new(right),
                    ty: b.ty,
                })
            }
            Expr::Call(c) => {
                let object = c.object.map(|o| Box::new(f(*o)));
                let args = c.args.into_iter().map(&mut *f).collect();
                Expr::Call(MethodCall {
                    object,
                    method: c.method,
                    args,
                    ty: c.ty,
                })
            }
            Expr::New(n) => Expr::New(NewObject {
                ty: n.ty,
                members: n.members,
                args: n.args.into_iter().map(&mut *f).collect(),
            }),
            Expr::Lambda(l) => Expr::Lambda(LambdaExpr {
                params: l.params,
                body: Box::new(f(*l.body)),
            }),
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Constant(c) => write!(f, "{}", c.value),
            Expr::Parameter(p) => f.write_str(&p.name),
            Expr::QuerySourceRef(r) => write!(f, "[{}]", r.item_name),
            Expr::MemberAccess(m) => write!(f, "{}.{}", m.object, m.member),
            Expr::Convert(c) => write!(f, "Convert({}, {})", c.operand, c.ty),
            Expr::Unary(u) => match u.operator {
                UnaryOperator::Not => write!(f, "Not({})", u.operand),
                UnaryOperator::Negate => write!(f, "-{}", u.operand),
            },
            Expr::Binary(b) => write!(f, "({} {} {})", b.left, b.operator.symbol(), b.right),
            Expr::Call(c) => {
                if let Some(object) = &c.object {
                    write!(f, "{}.", object)?;
                }
                write!(f, "{}(", c.method)?;
                write_comma_separated(f, &c.args)?;
                f.write_str(")")
            }
            Expr::New(n) => {
                write!(f, "new {}(", n.ty)?;
                if n.members.len() == n.args.len() && !n.members.is_empty() {
                    for (i, (member, arg)) in n.members.iter().zip(&n.args).enumerate() {
                        if i > 0 {
                            f.write_str(", ")?;
                        }
                        write!(f, "{} = {}", member, arg)?;
                    }
                } else {
                    write_comma_separated(f, &n.args)?;
                }
                f.write_str(")")
            }
            Expr::Lambda(l) => {
                match l.params.as_slice() {
                    [single] => write!(f, "{}", single.name)?,
                    params => {
                        f.write_str("(")?;
                        for (i, p) in params.iter().enumerate() {
                            if i > 0 {
                                f.write_str(", ")?;
                            }
                            f.write_str(&p.name)?;
                        }
                        f.write_str(")")?;
                    }
                }
                write!(f, " => {}", l.body)
            }
            Expr::SubQuery(model) => write!(f, "{{{}}}", model),
        }
    }
}

fn write_comma_separated(f: &mut fmt::Formatter<'_>, exprs: &[Expr]) -> fmt::Result {
    for (i, e) in exprs.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", e)?;
    }
    Ok(())
}
