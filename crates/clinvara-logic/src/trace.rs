// crates/clinvara-logic/src/trace.rs
// ============================================================================
// Module: Evaluation Trace
// Description: Tree-shaped record of a requirement evaluation.
// Purpose: Store per-node tri-state results and support replay checks.
// Dependencies: serde, crate::tristate
// ============================================================================

//! ## Overview
//! A [`TraceNode`] mirrors the requirement tree that produced it. Leaves keep
//! the domain detail captured at evaluation time; combinators keep their
//! combined result and children. Traces can be recomputed bottom-up from leaf
//! results alone, which is how stored outcomes are checked for divergence.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

use crate::tristate::TriLogic;
use crate::tristate::TriState;

// ============================================================================
// SECTION: Trace Tree
// ============================================================================

/// Evaluation record for one node of a requirement tree.
///
/// # Invariants
/// - For traces produced by `Requirement::evaluate`, every combinator result
///   equals the logic-table combination of its children.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum TraceNode<D> {
    /// Predicate leaf.
    Predicate {
        /// Leaf result.
        result: TriState,
        /// Domain detail captured at evaluation time.
        detail: D,
    },
    /// Conjunction.
    And {
        /// Combined result.
        result: TriState,
        /// Child traces in tree order.
        children: Vec<Self>,
    },
    /// Disjunction.
    Or {
        /// Combined result.
        result: TriState,
        /// Child traces in tree order.
        children: Vec<Self>,
    },
    /// Negation.
    Not {
        /// Combined result.
        result: TriState,
        /// Negated child trace.
        child: Box<Self>,
    },
}

/// Borrowed view of a trace node handed to visitors.
#[derive(Debug, Clone, Copy)]
pub struct TraceVisit<'a, D> {
    /// Nesting depth (root is zero).
    pub depth: usize,
    /// Child index path from the root.
    pub path: &'a [usize],
    /// Node being visited.
    pub node: &'a TraceNode<D>,
}

impl<D> TraceNode<D> {
    /// Returns the stored result for this node.
    #[must_use]
    pub const fn result(&self) -> TriState {
        match self {
            Self::Predicate {
                result, ..
            }
            | Self::And {
                result, ..
            }
            | Self::Or {
                result, ..
            }
            | Self::Not {
                result, ..
            } => *result,
        }
    }

    /// Recomputes this node's result from leaf results only.
    ///
    /// Stored combinator results are ignored, so a trace whose recorded
    /// values were edited will disagree with [`TraceNode::result`].
    pub fn recompute<L: TriLogic>(&self, logic: &L) -> TriState {
        match self {
            Self::Predicate {
                result, ..
            } => *result,
            Self::And {
                children, ..
            } => logic.and_all(children.iter().map(|child| child.recompute(logic))),
            Self::Or {
                children, ..
            } => logic.or_all(children.iter().map(|child| child.recompute(logic))),
            Self::Not {
                child, ..
            } => logic.not(child.recompute(logic)),
        }
    }

    /// Returns true when every stored combinator result matches recomputation.
    pub fn is_consistent<L: TriLogic>(&self, logic: &L) -> bool {
        let children_ok = match self {
            Self::Predicate {
                ..
            } => true,
            Self::And {
                children, ..
            }
            | Self::Or {
                children, ..
            } => children.iter().all(|child| child.is_consistent(logic)),
            Self::Not {
                child, ..
            } => child.is_consistent(logic),
        };
        children_ok && self.recompute(logic) == self.result()
    }

    /// Visits every node depth-first in tree order.
    pub fn walk<F>(&self, visitor: &mut F)
    where
        F: FnMut(TraceVisit<'_, D>),
    {
        let mut path = Vec::new();
        walk_inner(self, 0, &mut path, visitor);
    }

    /// Returns leaf details in depth-first order.
    #[must_use]
    pub fn leaves(&self) -> Vec<(TriState, &D)> {
        let mut out = Vec::new();
        collect_leaves(self, &mut out);
        out
    }

    /// Returns the unknown leaves that propagate up to this node.
    ///
    /// A leaf qualifies only when every node on its path to this node is
    /// unknown; unknown leaves masked by a determined sibling are excluded.
    #[must_use]
    pub fn contributing_unknowns(&self) -> Vec<&D> {
        let mut out = Vec::new();
        collect_contributing(self, &mut out);
        out
    }
}

/// Recursive helper for [`TraceNode::walk`].
fn walk_inner<D, F>(node: &TraceNode<D>, depth: usize, path: &mut Vec<usize>, visitor: &mut F)
where
    F: FnMut(TraceVisit<'_, D>),
{
    visitor(TraceVisit {
        depth,
        path: path.as_slice(),
        node,
    });
    match node {
        TraceNode::Predicate {
            ..
        } => {}
        TraceNode::And {
            children, ..
        }
        | TraceNode::Or {
            children, ..
        } => {
            for (index, child) in children.iter().enumerate() {
                path.push(index);
                walk_inner(child, depth + 1, path, visitor);
                path.pop();
            }
        }
        TraceNode::Not {
            child, ..
        } => {
            path.push(0);
            walk_inner(child, depth + 1, path, visitor);
            path.pop();
        }
    }
}

/// Recursive helper for [`TraceNode::leaves`].
fn collect_leaves<'a, D>(node: &'a TraceNode<D>, out: &mut Vec<(TriState, &'a D)>) {
    match node {
        TraceNode::Predicate {
            result,
            detail,
        } => out.push((*result, detail)),
        TraceNode::And {
            children, ..
        }
        | TraceNode::Or {
            children, ..
        } => {
            for child in children {
                collect_leaves(child, out);
            }
        }
        TraceNode::Not {
            child, ..
        } => collect_leaves(child, out),
    }
}

/// Recursive helper for [`TraceNode::contributing_unknowns`].
fn collect_contributing<'a, D>(node: &'a TraceNode<D>, out: &mut Vec<&'a D>) {
    if !node.result().is_unknown() {
        return;
    }
    match node {
        TraceNode::Predicate {
            detail, ..
        } => out.push(detail),
        TraceNode::And {
            children, ..
        }
        | TraceNode::Or {
            children, ..
        } => {
            for child in children {
                collect_contributing(child, out);
            }
        }
        TraceNode::Not {
            child, ..
        } => collect_contributing(child, out),
    }
}
