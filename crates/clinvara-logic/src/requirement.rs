// crates/clinvara-logic/src/requirement.rs
// ============================================================================
// Module: Requirement Core Types
// Description: Boolean algebra over typed predicates with traced evaluation.
// Purpose: Define `Requirement` and the single recursive evaluator that builds
// a trace mirroring the tree. Dependencies: serde, smallvec
// ============================================================================

//! ## Overview
//! This module defines the requirement tree: logical combinators (`And`, `Or`,
//! `Not`) with domain-specific `Predicate` leaves. Evaluation is a single
//! recursive walk that records every node into a [`TraceNode`], so the outcome
//! and its explanation come from the same pass.

// ============================================================================
// SECTION: Imports
// ============================================================================

use serde::Deserialize;
use serde::Serialize;
use smallvec::SmallVec;

use crate::trace::TraceNode;
use crate::tristate::TriLogic;
use crate::tristate::TriState;

// ============================================================================
// SECTION: Predicate Evaluation Trait
// ============================================================================

/// Domain hook for evaluating a predicate leaf with tri-state semantics.
///
/// Implementations must be pure: the same predicate and reader always yield
/// the same result and detail.
pub trait TracedPredicateEval {
    /// Read-only view of the subject being evaluated.
    type Reader<'a>;
    /// Per-leaf detail captured into the trace.
    type Detail;

    /// Evaluates the predicate and returns its result plus trace detail.
    fn eval_traced(&self, reader: &Self::Reader<'_>) -> (TriState, Self::Detail);
}

// ============================================================================
// SECTION: Requirement Definition
// ============================================================================

/// Requirement tree with domain-specific leaves
///
/// The logical operators are domain-agnostic, while the `Predicate` variant is
/// the boundary where domain semantics are injected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Requirement<P> {
    /// Logical AND: all sub-requirements must be satisfied
    ///
    /// Empty And is trivially satisfied (mathematical identity).
    And(SmallVec<[Box<Self>; 4]>),

    /// Logical OR: at least one sub-requirement must be satisfied
    ///
    /// Empty Or is trivially unsatisfiable (no options available).
    Or(SmallVec<[Box<Self>; 4]>),

    /// Logical NOT: inverts the result of the sub-requirement
    Not(Box<Self>),

    /// Domain-specific atomic predicate
    Predicate(P),
}

// ============================================================================
// SECTION: Evaluation
// ============================================================================

impl<P> Requirement<P> {
    /// Evaluates the tree and returns a trace mirroring its structure.
    ///
    /// Every child is evaluated (no short-circuit) so the trace covers every
    /// node; the combined result is identical to a short-circuit evaluation
    /// under the supplied logic.
    pub fn evaluate<L>(&self, reader: &P::Reader<'_>, logic: &L) -> TraceNode<P::Detail>
    where
        P: TracedPredicateEval,
        L: TriLogic,
    {
        match self {
            Self::Predicate(predicate) => {
                let (result, detail) = predicate.eval_traced(reader);
                TraceNode::Predicate {
                    result,
                    detail,
                }
            }
            Self::Not(requirement) => {
                let child = requirement.evaluate(reader, logic);
                TraceNode::Not {
                    result: logic.not(child.result()),
                    child: Box::new(child),
                }
            }
            Self::And(requirements) => {
                let children: Vec<_> =
                    requirements.iter().map(|req| req.evaluate(reader, logic)).collect();
                TraceNode::And {
                    result: logic.and_all(children.iter().map(TraceNode::result)),
                    children,
                }
            }
            Self::Or(requirements) => {
                let children: Vec<_> =
                    requirements.iter().map(|req| req.evaluate(reader, logic)).collect();
                TraceNode::Or {
                    result: logic.or_all(children.iter().map(TraceNode::result)),
                    children,
                }
            }
        }
    }

    /// Returns the total number of nodes in the tree
    pub fn complexity(&self) -> usize {
        match self {
            Self::Predicate(_) => 1,
            Self::Not(req) => 1 + req.complexity(),
            Self::And(reqs) | Self::Or(reqs) => {
                1 + reqs.iter().map(|r| r.complexity()).sum::<usize>()
            }
        }
    }

    /// Returns the depth of the tree (a lone predicate has depth 1)
    pub fn depth(&self) -> usize {
        match self {
            Self::Predicate(_) => 1,
            Self::Not(req) => 1 + req.depth(),
            Self::And(reqs) | Self::Or(reqs) => {
                1 + reqs.iter().map(|r| r.depth()).max().unwrap_or(0)
            }
        }
    }

    /// Returns the predicate leaves in depth-first, left-to-right order
    pub fn predicates(&self) -> Vec<&P> {
        let mut out = Vec::new();
        collect_predicates(self, &mut out);
        out
    }
}

/// Walks a requirement tree and appends predicate references.
fn collect_predicates<'a, P>(requirement: &'a Requirement<P>, out: &mut Vec<&'a P>) {
    match requirement {
        Requirement::Predicate(predicate) => out.push(predicate),
        Requirement::Not(inner) => collect_predicates(inner, out),
        Requirement::And(reqs) | Requirement::Or(reqs) => {
            for req in reqs {
                collect_predicates(req, out);
            }
        }
    }
}

// ============================================================================
// SECTION: Constructor Helpers
// ============================================================================

impl<P> Requirement<P> {
    /// Creates a logical AND of the given requirements
    pub fn and(requirements: Vec<Self>) -> Self {
        Self::And(requirements.into_iter().map(Box::new).collect())
    }

    /// Creates a logical OR of the given requirements
    pub fn or(requirements: Vec<Self>) -> Self {
        Self::Or(requirements.into_iter().map(Box::new).collect())
    }

    /// Creates a logical NOT of the given requirement
    pub fn negate(requirement: Self) -> Self {
        Self::Not(Box::new(requirement))
    }

    /// Creates a requirement from a predicate
    pub const fn predicate(predicate: P) -> Self {
        Self::Predicate(predicate)
    }

    /// Creates a requirement that can never be satisfied (empty OR)
    pub fn never() -> Self {
        Self::Or(SmallVec::new())
    }
}

impl<P> Default for Requirement<P> {
    /// Creates an empty And requirement (trivially satisfied)
    fn default() -> Self {
        Self::And(SmallVec::new())
    }
}
