//! Clause generation context.
//!
//! [`ClauseGenerationContext`] is threaded through the fold pass. It records,
//! per node, what applying the node produced so that later nodes can resolve
//! references to earlier ones without re-walking the model:
//!
//! - node → clause (and query source, for source-introducing nodes)
//! - the projection registered by the most recent select or group node
//! - a from clause still waiting for its projection
//! - whether result operators or a grouping closed the clause chain
//!
//! Entries are append-only: a node can be registered once. A second
//! registration means the node was applied twice.

use std::collections::HashMap;

use crate::{
    config::BuilderConfig,
    expression::{Expr, QuerySourceRef},
    parsing::errors::{ParseResult, ParserError},
    query_model::ClauseRef,
};

use super::NodeId;

/// What applying one node produced.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ContextInfo {
    pub clause: Option<ClauseRef>,
    pub source: Option<QuerySourceRef>,
}

impl ContextInfo {
    /// A node that only added a result operator or registered a projection.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn clause(clause: ClauseRef) -> Self {
        ContextInfo {
            clause: Some(clause),
            source: None,
        }
    }

    pub fn source(clause: ClauseRef, source: QuerySourceRef) -> Self {
        ContextInfo {
            clause: Some(clause),
            source: Some(source),
        }
    }
}

/// The projection that becomes the terminal clause once the chain is folded.
#[derive(Debug, Clone, PartialEq)]
pub enum RegisteredProjection {
    Select(Expr),
    Group { key: Expr, element: Expr },
}

/// A from clause created without a projection of its own.
#[derive(Debug, Clone, PartialEq)]
pub struct PendingProjection {
    pub node: NodeId,
    pub clause: ClauseRef,
    pub identifier: String,
    pub source_expression: String,
}

impl PendingProjection {
    pub fn into_error(self) -> ParserError {
        ParserError::MissingProjection {
            identifier: self.identifier,
            source_expression: self.source_expression,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClauseGenerationContext {
    infos: HashMap<NodeId, ContextInfo>,
    projection: Option<RegisteredProjection>,
    pending_projection: Option<PendingProjection>,
    /// Set by the first result operator that changes cardinality or shape.
    closed_by_result_operator: bool,
    /// Set by a `Cast`; only identity projections may follow it.
    cast_applied: bool,
    grouped: bool,
    depth: u32,
    config: BuilderConfig,
}

impl Default for ClauseGenerationContext {
    fn default() -> Self {
        Self::new(BuilderConfig::default(), 0)
    }
}

impl ClauseGenerationContext {
    pub fn new(config: BuilderConfig, depth: u32) -> Self {
        ClauseGenerationContext {
            infos: HashMap::new(),
            projection: None,
            pending_projection: None,
            closed_by_result_operator: false,
            cast_applied: false,
            grouped: false,
            depth,
            config,
        }
    }

    pub fn config(&self) -> &BuilderConfig {
        &self.config
    }

    /// Nesting depth of the model being built; 0 for the outermost query.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn count(&self) -> usize {
        self.infos.len()
    }

    pub fn add_context_info(&mut self, node: NodeId, info: ContextInfo) -> ParseResult<()> {
        if self.infos.contains_key(&node) {
            return Err(ParserError::InvalidState(format!(
                "node {} has already been applied",
                node
            )));
        }
        log::trace!("ClauseGenerationContext: node {} → {:?}", node, info);
        self.infos.insert(node, info);
        Ok(())
    }

    pub fn is_applied(&self, node: NodeId) -> bool {
        self.infos.contains_key(&node)
    }

    pub fn get_context_info(&self, node: NodeId) -> ParseResult<&ContextInfo> {
        self.infos.get(&node).ok_or_else(|| {
            ParserError::InvalidState(format!(
                "node {} must be applied before it can be resolved",
                node
            ))
        })
    }

    /// The query source produced by a source-introducing node.
    pub fn source_ref(&self, node: NodeId) -> ParseResult<&QuerySourceRef> {
        self.get_context_info(node)?.source.as_ref().ok_or_else(|| {
            ParserError::InvalidState(format!("node {} did not produce a query source", node))
        })
    }

    pub fn projection(&self) -> Option<&RegisteredProjection> {
        self.projection.as_ref()
    }

    /// Later registrations replace earlier ones; the last one wins.
    pub fn register_projection(&mut self, projection: RegisteredProjection) {
        if matches!(projection, RegisteredProjection::Group { .. }) {
            self.grouped = true;
        }
        self.projection = Some(projection);
    }

    pub fn pending_projection(&self) -> Option<&PendingProjection> {
        self.pending_projection.as_ref()
    }

    /// Fails if another from clause is still waiting for its projection.
    pub fn set_pending_projection(&mut self, pending: PendingProjection) -> ParseResult<()> {
        if let Some(previous) = self.pending_projection.take() {
            return Err(previous.into_error());
        }
        self.pending_projection = Some(pending);
        Ok(())
    }

    pub fn take_pending_projection(&mut self) -> Option<PendingProjection> {
        self.pending_projection.take()
    }

    pub fn close_by_result_operator(&mut self) {
        self.closed_by_result_operator = true;
    }

    pub fn record_cast(&mut self) {
        self.cast_applied = true;
    }

    pub fn is_grouped(&self) -> bool {
        self.grouped
    }

    /// A projection lands in the select clause, which the model evaluates
    /// before every result operator. It is rejected once an operator exists,
    /// except for an identity projection after a cast.
    pub fn ensure_projection_allowed(&self, call_site: &str, identity: bool) -> ParseResult<()> {
        if self.grouped {
            return Err(ParserError::InvalidState(format!(
                "{} cannot project a grouping without a sub-query",
                call_site
            )));
        }
        if self.closed_by_result_operator {
            return Err(ParserError::InvalidState(format!(
                "{} cannot project after a result operator without a sub-query",
                call_site
            )));
        }
        if self.cast_applied && !identity {
            return Err(ParserError::InvalidState(format!(
                "{} cannot change the projection after a cast without a sub-query",
                call_site
            )));
        }
        Ok(())
    }

    /// Body clauses cannot follow a grouping or a result operator without a sub-query.
    pub fn ensure_body_clause_allowed(&self, call_site: &str) -> ParseResult<()> {
        if self.grouped {
            return Err(ParserError::InvalidState(format!(
                "{} cannot follow a grouping without a sub-query",
                call_site
            )));
        }
        if self.closed_by_result_operator {
            return Err(ParserError::InvalidState(format!(
                "{} cannot follow a result operator without a sub-query",
                call_site
            )));
        }
        Ok(())
    }
}
