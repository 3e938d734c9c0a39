//! Intermediate node chain.
//!
//! A [`NodeChain`] mirrors the operation sequence of a query expression,
//! source first. Each [`ExpressionNode`] knows how to fold itself into a
//! [`QueryModel`] (`apply`) and how to rewrite an expression that refers to
//! the item it produces (`resolve`).
//!
//! ```text
//! chain:   MainSource(s) → Where → OrderBy → Select
//! model:   from s in ... where ... orderby ... select ...
//!
//! resolve(Select, x, x.Name)
//!   → Select substitutes its selector for x
//!   → OrderBy, Where forward unchanged
//!   → MainSource substitutes [s] for the selector parameter
//! ```
//!
//! Node kinds are a closed enum with one module per kind; dispatch is an
//! exhaustive match in [`ExpressionNode::apply`] and [`ExpressionNode::resolve`].

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::{
    expression::{free_parameters, Expr, LambdaExpr, Parameter, TypeRef},
    parsing::errors::{ParseResult, ParserError},
    query_model::{MainFromClause, QueryModel},
};

pub mod builder;
pub mod cast_node;
pub mod clause_generation_context;
pub mod group_by_node;
pub mod let_node;
pub mod main_source_node;
pub mod order_by_node;
pub mod result_operator_node;
pub mod select_many_node;
pub mod select_node;
pub mod sub_query_source_node;
pub mod where_node;

pub use cast_node::{CastKind, CastNode};
pub use clause_generation_context::{ClauseGenerationContext, ContextInfo, RegisteredProjection};
pub use group_by_node::GroupByNode;
pub use let_node::LetNode;
pub use main_source_node::MainSourceNode;
pub use order_by_node::OrderByNode;
pub use result_operator_node::ResultOperatorNode;
pub use select_many_node::SelectManyNode;
pub use select_node::SelectNode;
pub use sub_query_source_node::SubQuerySourceNode;
pub use where_node::WhereNode;

/// Position of a node within its chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub usize);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "n{}", self.0)
    }
}

#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub enum NodeKind {
    MainSource(MainSourceNode),
    SubQuerySource(SubQuerySourceNode),
    SelectMany(SelectManyNode),
    Where(WhereNode),
    OrderBy(OrderByNode),
    Select(SelectNode),
    Let(LetNode),
    GroupBy(GroupByNode),
    Cast(CastNode),
    ResultOperator(ResultOperatorNode),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        match self {
            NodeKind::MainSource(_) => "MainSource",
            NodeKind::SubQuerySource(_) => "SubQuerySource",
            NodeKind::SelectMany(_) => "SelectMany",
            NodeKind::Where(_) => "Where",
            NodeKind::OrderBy(node) if node.then_by => "ThenBy",
            NodeKind::OrderBy(_) => "OrderBy",
            NodeKind::Select(_) => "Select",
            NodeKind::Let(_) => "Let",
            NodeKind::GroupBy(_) => "GroupBy",
            NodeKind::Cast(node) => match node.kind {
                CastKind::Cast => "Cast",
                CastKind::OfType => "OfType",
            },
            NodeKind::ResultOperator(node) => node.operator.name(),
        }
    }

    /// Source-introducing kinds may start a chain.
    pub fn is_source(&self) -> bool {
        matches!(self, NodeKind::MainSource(_) | NodeKind::SubQuerySource(_))
    }
}

/// One element of a node chain. Never mutated after creation.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ExpressionNode {
    pub id: NodeId,
    /// The node this one was chained from; `None` only for a chain's first node
    /// or for a later source that starts an independent sequence.
    #[serde(default)]
    pub source: Option<NodeId>,
    /// Item name inferred for the node's output, e.g. `s` in `from s in ...`.
    pub associated_identifier: String,
    /// Originating operation, used in diagnostics only.
    #[serde(default)]
    pub call_site: String,
    pub kind: NodeKind,
}

impl ExpressionNode {
    pub fn source_id(&self) -> ParseResult<NodeId> {
        self.source.ok_or_else(|| {
            ParserError::InvalidState(format!("{} has no source node", self.describe()))
        })
    }

    fn describe(&self) -> String {
        if self.call_site.is_empty() {
            format!("{} node {}", self.kind.name(), self.id)
        } else {
            format!("{} node {}", self.call_site, self.id)
        }
    }

    /// Fold this node into `model`, registering what it produced in `ctx`.
    pub fn apply(
        &self,
        chain: &NodeChain,
        model: &mut QueryModel,
        ctx: &mut ClauseGenerationContext,
    ) -> ParseResult<()> {
        if ctx.is_applied(self.id) {
            return Err(ParserError::InvalidState(format!(
                "{} has already been applied",
                self.describe()
            )));
        }
        log::debug!("Applying {}", self.describe());
        match &self.kind {
            NodeKind::MainSource(node) => node.apply(self, model, ctx),
            NodeKind::SubQuerySource(node) => node.apply(self, model, ctx),
            NodeKind::SelectMany(node) => node.apply(self, chain, model, ctx),
            NodeKind::Where(node) => node.apply(self, chain, model, ctx),
            NodeKind::OrderBy(node) => node.apply(self, chain, model, ctx),
            NodeKind::Select(node) => node.apply(self, chain, model, ctx),
            NodeKind::Let(node) => node.apply(self, chain, model, ctx),
            NodeKind::GroupBy(node) => node.apply(self, chain, model, ctx),
            NodeKind::Cast(node) => node.apply(self, model, ctx),
            NodeKind::ResultOperator(node) => node.apply(self, chain, model, ctx),
        }
    }

    /// Rewrite `body`, replacing `input` with a reference to the item this
    /// node exposes.
    pub fn resolve(
        &self,
        chain: &NodeChain,
        input: &Parameter,
        body: &Expr,
        ctx: &ClauseGenerationContext,
    ) -> ParseResult<Expr> {
        match &self.kind {
            NodeKind::MainSource(_) | NodeKind::SubQuerySource(_) => {
                source_node_resolve(self, input, body, ctx)
            }
            NodeKind::SelectMany(node) => node.resolve(self, chain, input, body, ctx),
            NodeKind::Select(node) => node.resolve(self, chain, input, body, ctx),
            NodeKind::Let(node) => node.resolve(self, chain, input, body, ctx),
            NodeKind::GroupBy(_) => Err(ParserError::InvalidState(format!(
                "cannot resolve through {}; wrap the grouping in a sub-query",
                self.describe()
            ))),
            NodeKind::Cast(node) => node.resolve(self, chain, input, body, ctx),
            NodeKind::Where(_) | NodeKind::OrderBy(_) | NodeKind::ResultOperator(_) => {
                chain.resolve(self.source_id()?, input, body, ctx)
            }
        }
    }

    /// Type of the items this node exposes downstream.
    pub fn output_item_type(&self, chain: &NodeChain, ctx: &ClauseGenerationContext) -> ParseResult<TypeRef> {
        match &self.kind {
            NodeKind::MainSource(_) | NodeKind::SubQuerySource(_) => {
                Ok(ctx.source_ref(self.id)?.item_type.clone())
            }
            NodeKind::SelectMany(node) => match &node.result_selector {
                Some(selector) => Ok(selector.body.ty()),
                None => Ok(ctx.source_ref(self.id)?.item_type.clone()),
            },
            NodeKind::Select(node) => Ok(node.selector.body.ty()),
            NodeKind::GroupBy(node) => {
                let element = match &node.element_selector {
                    Some(selector) => selector.body.ty(),
                    None => chain.output_item_type(self.source_id()?, ctx)?,
                };
                Ok(TypeRef::grouping(node.key_selector.body.ty(), element))
            }
            NodeKind::Cast(node) => Ok(node.cast_item_type.clone()),
            NodeKind::Where(_)
            | NodeKind::OrderBy(_)
            | NodeKind::Let(_)
            | NodeKind::ResultOperator(_) => chain.output_item_type(self.source_id()?, ctx),
        }
    }
}

/// Sources substitute a reference to the clause they created.
fn source_node_resolve(
    node: &ExpressionNode,
    input: &Parameter,
    body: &Expr,
    ctx: &ClauseGenerationContext,
) -> ParseResult<Expr> {
    let reference = ctx.source_ref(node.id).map_err(|_| {
        ParserError::InvalidState(format!("{} resolved before it was applied", node.describe()))
    })?;
    Ok(crate::expression::substitution::substitute_parameter(
        body,
        input,
        &Expr::QuerySourceRef(reference.clone()),
    ))
}

/// An ordered sequence of nodes plus the static type of the whole query.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct NodeChain {
    nodes: Vec<ExpressionNode>,
    result_type: TypeRef,
}

impl NodeChain {
    pub fn new(result_type: TypeRef) -> Self {
        NodeChain {
            nodes: vec![],
            result_type,
        }
    }

    /// Append a node chained from the current last node.
    pub fn push(&mut self, associated_identifier: impl Into<String>, kind: NodeKind) -> NodeId {
        let source = self.nodes.last().map(|n| n.id);
        self.push_with_source(source, associated_identifier, kind)
    }

    /// Append a node with an explicit source (`None` for an independent sequence).
    pub fn push_with_source(
        &mut self,
        source: Option<NodeId>,
        associated_identifier: impl Into<String>,
        kind: NodeKind,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let call_site = kind.name().to_string();
        self.nodes.push(ExpressionNode {
            id,
            source,
            associated_identifier: associated_identifier.into(),
            call_site,
            kind,
        });
        id
    }

    pub fn nodes(&self) -> &[ExpressionNode] {
        &self.nodes
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn result_type(&self) -> &TypeRef {
        &self.result_type
    }

    pub fn node(&self, id: NodeId) -> ParseResult<&ExpressionNode> {
        self.nodes
            .get(id.0)
            .ok_or_else(|| ParserError::UnresolvableReference {
                reference: id.to_string(),
            })
    }

    /// Node ids must match positions and sources must point backwards.
    pub fn check_links(&self) -> ParseResult<()> {
        for (position, node) in self.nodes.iter().enumerate() {
            if node.id.0 != position {
                return Err(ParserError::InvalidState(format!(
                    "node at position {} carries id {}",
                    position, node.id
                )));
            }
            if let Some(source) = node.source {
                if source.0 >= position {
                    return Err(ParserError::InvalidState(format!(
                        "{} is chained from {}, which is not an earlier node",
                        node.describe(),
                        source
                    )));
                }
            }
        }
        Ok(())
    }

    pub fn resolve(
        &self,
        id: NodeId,
        input: &Parameter,
        body: &Expr,
        ctx: &ClauseGenerationContext,
    ) -> ParseResult<Expr> {
        self.node(id)?.resolve(self, input, body, ctx)
    }

    /// Resolve the body of a one-parameter lambda against node `id`. The
    /// result must not contain free parameters.
    pub fn resolve_lambda(
        &self,
        id: NodeId,
        lambda: &LambdaExpr,
        ctx: &ClauseGenerationContext,
    ) -> ParseResult<Expr> {
        let param = lambda.single_parameter().ok_or_else(|| {
            ParserError::InvalidState(format!(
                "expected a lambda with one parameter, found {}",
                Expr::Lambda(lambda.clone())
            ))
        })?;
        let resolved = self.resolve(id, param, &lambda.body, ctx)?;
        ensure_resolved(&resolved)?;
        Ok(resolved)
    }

    pub fn output_item_type(&self, id: NodeId, ctx: &ClauseGenerationContext) -> ParseResult<TypeRef> {
        self.node(id)?.output_item_type(self, ctx)
    }
}

/// Fails with the first parameter left unbound by resolution.
pub(crate) fn ensure_resolved(expr: &Expr) -> ParseResult<()> {
    match free_parameters(expr).into_iter().next() {
        Some(param) => Err(ParserError::UnresolvableReference {
            reference: param.name,
        }),
        None => Ok(()),
    }
}

/// Build the main from clause from a chain's first node.
pub(crate) fn create_main_from_clause(
    node: &ExpressionNode,
    ctx: &mut ClauseGenerationContext,
) -> ParseResult<MainFromClause> {
    match &node.kind {
        NodeKind::MainSource(source) => source.create_main_from_clause(node, ctx),
        NodeKind::SubQuerySource(source) => source.create_main_from_clause(node, ctx),
        other => Err(ParserError::InvalidState(format!(
            "a query must start with a source, found {}",
            other.name()
        ))),
    }
}
