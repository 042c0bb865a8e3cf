// crates/clinvara-logic/tests/monotonicity.rs
// ============================================================================
// Module: Kleene Property Tests
// Description: Property tests for determinism and information monotonicity.
// Purpose: Show that unknown leaves can only weaken a result, never flip it.
// ============================================================================

//! Property-based tests for Kleene evaluation invariants.

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
    reason = "Test-only assertions and helpers are permitted."
)]

mod support;

use clinvara_logic::KleeneLogic;
use clinvara_logic::Requirement;
use clinvara_logic::TriState;
use proptest::prelude::*;
use support::Slot;
use support::Slots;

/// Number of leaf slots available to generated trees.
const SLOTS: usize = 6;

fn tristate_strategy() -> impl Strategy<Value = TriState> {
    prop_oneof![Just(TriState::True), Just(TriState::False), Just(TriState::Unknown)]
}

fn requirement_strategy() -> impl Strategy<Value = Requirement<Slot>> {
    let leaf = (0 .. SLOTS).prop_map(|slot| Requirement::predicate(Slot(slot)));
    leaf.prop_recursive(4, 32, 4, |inner| {
        prop_oneof![
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Requirement::and),
            prop::collection::vec(inner.clone(), 0 .. 4).prop_map(Requirement::or),
            inner.prop_map(Requirement::negate),
        ]
    })
}

proptest! {
    #[test]
    fn evaluation_is_deterministic(
        req in requirement_strategy(),
        values in prop::collection::vec(tristate_strategy(), SLOTS),
    ) {
        let first = req.evaluate(&Slots(values.clone()), &KleeneLogic);
        let second = req.evaluate(&Slots(values), &KleeneLogic);
        prop_assert_eq!(first, second);
    }

    #[test]
    fn unknown_leaf_never_flips_a_determined_root(
        req in requirement_strategy(),
        values in prop::collection::vec(tristate_strategy(), SLOTS),
        masked in 0 .. SLOTS,
    ) {
        let before = req.evaluate(&Slots(values.clone()), &KleeneLogic).result();
        let mut weakened = values;
        weakened[masked] = TriState::Unknown;
        let after = req.evaluate(&Slots(weakened), &KleeneLogic).result();
        if !after.is_unknown() {
            prop_assert_eq!(before, after);
        }
    }

    #[test]
    fn traces_recompute_to_their_root(
        req in requirement_strategy(),
        values in prop::collection::vec(tristate_strategy(), SLOTS),
    ) {
        let trace = req.evaluate(&Slots(values), &KleeneLogic);
        prop_assert!(trace.is_consistent(&KleeneLogic));
        prop_assert_eq!(trace.recompute(&KleeneLogic), trace.result());
    }
}
