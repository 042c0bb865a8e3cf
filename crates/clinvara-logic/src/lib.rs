// crates/clinvara-logic/src/lib.rs
// ============================================================================
// Module: Requirement Logic Root
// Description: Public API surface for the tri-state requirement algebra.
// Purpose: Wire together the tri-state tables, requirement tree, and traces.
// Dependencies: crate::{requirement, trace, tristate}
// ============================================================================

//! ## Overview
//! `clinvara-logic` is the domain-agnostic core of the eligibility engine: a
//! three-valued truth type with strong Kleene tables, a requirement tree with
//! pluggable predicate leaves, and the evaluation trace that mirrors it.

// ============================================================================
// SECTION: Core Modules
// ============================================================================

pub mod requirement;
pub mod trace;
pub mod tristate;

// ============================================================================
// SECTION: Re-Exports
// ============================================================================

pub use requirement::Requirement;
pub use requirement::TracedPredicateEval;
pub use trace::TraceNode;
pub use trace::TraceVisit;
pub use tristate::KleeneLogic;
pub use tristate::TriLogic;
pub use tristate::TriState;
