// crates/clinvara-logic/src/tristate.rs
// ============================================================================
// Module: Tri-State Logic
// Description: Tri-state truth values and the strong Kleene logic table.
// Purpose: Provide deterministic tri-state evaluation for eligibility trees.
// Dependencies: serde::{Deserialize, Serialize}
// ============================================================================

//! ## Overview
//! Defines tri-state truth values (`true/false/unknown`) and the logic table
//! used to combine them. Strong Kleene logic lets a determined sibling mask an
//! unknown one, so missing data only leaks to the root when it matters.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Tri-State Value
// ============================================================================

/// Tri-state truth value for evidence-aware evaluation
///
/// # Invariants
/// - Represents a closed set of truth values: true, false, or unknown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriState {
    /// Definitively true
    True,
    /// Definitively false
    False,
    /// Indeterminate due to missing data
    Unknown,
}

impl TriState {
    /// Returns true if the value is `True`
    #[must_use]
    pub const fn is_true(self) -> bool {
        matches!(self, Self::True)
    }

    /// Returns true if the value is `False`
    #[must_use]
    pub const fn is_false(self) -> bool {
        matches!(self, Self::False)
    }

    /// Returns true if the value is `Unknown`
    #[must_use]
    pub const fn is_unknown(self) -> bool {
        matches!(self, Self::Unknown)
    }

    /// Returns a stable lowercase label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::True => "true",
            Self::False => "false",
            Self::Unknown => "unknown",
        }
    }
}

impl From<bool> for TriState {
    fn from(value: bool) -> Self {
        if value { Self::True } else { Self::False }
    }
}

impl fmt::Display for TriState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// SECTION: Logic Tables
// ============================================================================

/// Tri-state logic tables for composable evaluation
pub trait TriLogic {
    /// Logical AND for tri-state values
    fn and(&self, lhs: TriState, rhs: TriState) -> TriState;

    /// Logical OR for tri-state values
    fn or(&self, lhs: TriState, rhs: TriState) -> TriState;

    /// Logical NOT for tri-state values
    fn not(&self, value: TriState) -> TriState;

    /// Folds a sequence with AND, starting from the identity `True`.
    fn and_all<I>(&self, values: I) -> TriState
    where
        I: IntoIterator<Item = TriState>,
    {
        values.into_iter().fold(TriState::True, |acc, value| self.and(acc, value))
    }

    /// Folds a sequence with OR, starting from the identity `False`.
    fn or_all<I>(&self, values: I) -> TriState
    where
        I: IntoIterator<Item = TriState>,
    {
        values.into_iter().fold(TriState::False, |acc, value| self.or(acc, value))
    }
}

/// Strong Kleene logic
///
/// # Invariants
/// - Zero-sized marker type; carries no state.
#[derive(Debug, Clone, Copy, Default)]
pub struct KleeneLogic;

impl TriLogic for KleeneLogic {
    fn and(&self, lhs: TriState, rhs: TriState) -> TriState {
        match (lhs, rhs) {
            (TriState::False, _) | (_, TriState::False) => TriState::False,
            (TriState::True, TriState::True) => TriState::True,
            _ => TriState::Unknown,
        }
    }

    fn or(&self, lhs: TriState, rhs: TriState) -> TriState {
        match (lhs, rhs) {
            (TriState::True, _) | (_, TriState::True) => TriState::True,
            (TriState::False, TriState::False) => TriState::False,
            _ => TriState::Unknown,
        }
    }

    fn not(&self, value: TriState) -> TriState {
        match value {
            TriState::True => TriState::False,
            TriState::False => TriState::True,
            TriState::Unknown => TriState::Unknown,
        }
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::KleeneLogic;
    use super::TriLogic;
    use super::TriState;

    const ALL: [TriState; 3] = [TriState::True, TriState::False, TriState::Unknown];

    #[test]
    fn kleene_and_or_are_commutative() {
        for lhs in ALL {
            for rhs in ALL {
                assert_eq!(KleeneLogic.and(lhs, rhs), KleeneLogic.and(rhs, lhs));
                assert_eq!(KleeneLogic.or(lhs, rhs), KleeneLogic.or(rhs, lhs));
            }
        }
    }

    #[test]
    fn empty_folds_return_identities() {
        assert_eq!(KleeneLogic.and_all([]), TriState::True);
        assert_eq!(KleeneLogic.or_all([]), TriState::False);
    }

    #[test]
    fn de_morgan_holds_under_kleene() {
        for lhs in ALL {
            for rhs in ALL {
                let left = KleeneLogic.not(KleeneLogic.and(lhs, rhs));
                let right = KleeneLogic.or(KleeneLogic.not(lhs), KleeneLogic.not(rhs));
                assert_eq!(left, right);
            }
        }
    }
}
