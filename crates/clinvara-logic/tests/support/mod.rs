// crates/clinvara-logic/tests/support/mod.rs
// ============================================================================
// Module: Test Support
// Description: Shared leaf predicate and reader for requirement tests.
// ============================================================================
//! ## Overview
//! Provides an indexed leaf predicate whose value is read from a slice, so
//! tests can drive any combination of tri-state leaf outcomes.

#![allow(
    clippy::panic,
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::use_debug,
    clippy::dbg_macro,
    clippy::panic_in_result_fn,
    clippy::unwrap_in_result,
    dead_code,
    reason = "Test-only output and panic-based assertions are permitted."
)]

use clinvara_logic::Requirement;
use clinvara_logic::TraceNode;
use clinvara_logic::TracedPredicateEval;
use clinvara_logic::TriState;

/// Leaf that reads its value from slot `0` of the reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slot(pub usize);

/// Reader holding one tri-state value per slot.
pub struct Slots(pub Vec<TriState>);

impl TracedPredicateEval for Slot {
    type Reader<'a> = Slots;
    type Detail = usize;

    fn eval_traced(&self, reader: &Self::Reader<'_>) -> (TriState, usize) {
        let value = reader.0.get(self.0).copied().unwrap_or(TriState::Unknown);
        (value, self.0)
    }
}

/// Shorthand for a leaf requirement.
pub fn leaf(slot: usize) -> Requirement<Slot> {
    Requirement::predicate(Slot(slot))
}

/// Returns the slot indices of a trace's leaves in order.
pub fn leaf_slots(trace: &TraceNode<usize>) -> Vec<usize> {
    trace.leaves().into_iter().map(|(_, slot)| *slot).collect()
}
