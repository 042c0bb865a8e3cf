// crates/clinvara-core/src/runtime/summary.rs
// ============================================================================
// Module: Clinvara Review Summaries
// Description: Aggregates over stored traces and overrides for one version.
// Purpose: Report per-criterion outcome tallies and reviewer override counts.
// Dependencies: serde, clinvara-logic, crate::{core, runtime::engine}
// ============================================================================

//! ## Overview
//! Summaries read stored verdicts and overrides only; they never re-evaluate.
//! Tallies count leaf results per criterion across every verdict of a
//! version, which shows which criteria fail most and which lack data.
//!
//! Security posture: summaries carry counts and identifiers only, never
//! observed attribute values.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::collections::BTreeMap;

use clinvara_logic::TriState;
use serde::Deserialize;
use serde::Serialize;

use crate::core::CriteriaVersion;
use crate::core::CriterionId;
use crate::core::Eligibility;
use crate::core::Override;
use crate::core::StudyId;
use crate::core::TreeSide;
use crate::core::Verdict;
use crate::core::resolve_effective;
use crate::runtime::engine::EngineError;
use crate::runtime::engine::ScreeningEngine;
use crate::runtime::engine::StudyContext;

// ============================================================================
// SECTION: Summary Types
// ============================================================================

/// Leaf outcome counts for one criterion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CriterionTally {
    /// Tree the criterion belongs to.
    pub side: TreeSide,
    /// Criterion identifier.
    pub criterion_id: CriterionId,
    /// Rule description.
    pub description: String,
    /// Verdicts where the criterion was true.
    pub true_count: usize,
    /// Verdicts where the criterion was false.
    pub false_count: usize,
    /// Verdicts where the criterion lacked data.
    pub unknown_count: usize,
}

/// Verdict counts by eligibility value.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EligibilityCounts {
    /// Eligible verdicts.
    pub eligible: usize,
    /// Ineligible verdicts.
    pub ineligible: usize,
    /// Indeterminate verdicts.
    pub indeterminate: usize,
}

impl EligibilityCounts {
    /// Counts one value.
    const fn add(&mut self, value: Eligibility) {
        match value {
            Eligibility::Eligible => self.eligible += 1,
            Eligibility::Ineligible => self.ineligible += 1,
            Eligibility::Indeterminate => self.indeterminate += 1,
        }
    }
}

/// Number of verdicts whose effective value moved from one value to another.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverrideTransition {
    /// Computed value.
    pub from: Eligibility,
    /// Effective value after review.
    pub to: Eligibility,
    /// Verdicts with this transition.
    pub count: usize,
}

/// Review summary for one criteria version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReviewSummary {
    /// Study identifier.
    pub study_id: StudyId,
    /// Criteria version.
    pub version: CriteriaVersion,
    /// Verdicts summarized.
    pub verdicts: usize,
    /// Per-criterion tallies in tree order.
    pub criteria: Vec<CriterionTally>,
    /// Counts of computed values.
    pub computed: EligibilityCounts,
    /// Counts of effective values.
    pub effective: EligibilityCounts,
    /// Verdicts with at least one override.
    pub overridden: usize,
    /// Computed-to-effective transitions where the value changed.
    pub transitions: Vec<OverrideTransition>,
}

// ============================================================================
// SECTION: Summarization
// ============================================================================

/// Summarizes verdicts of one version with the study's overrides.
#[must_use]
pub fn summarize(
    study_id: &StudyId,
    version: CriteriaVersion,
    verdicts: &[Verdict],
    overrides: &[Override],
) -> ReviewSummary {
    let mut criteria: Vec<CriterionTally> = Vec::new();
    let mut index: BTreeMap<(TreeSide, CriterionId), usize> = BTreeMap::new();
    let mut computed = EligibilityCounts::default();
    let mut effective = EligibilityCounts::default();
    let mut overridden = 0;
    let mut transitions: BTreeMap<(Eligibility, Eligibility), usize> = BTreeMap::new();

    for verdict in verdicts.iter().filter(|verdict| verdict.criteria_version == version) {
        let trees = [
            (TreeSide::Inclusion, &verdict.trace.inclusion),
            (TreeSide::Exclusion, &verdict.trace.exclusion),
        ];
        for (side, trace) in trees {
            for (result, observation) in trace.leaves() {
                let key = (side, observation.criterion_id.clone());
                let slot = *index.entry(key).or_insert_with(|| {
                    criteria.push(CriterionTally {
                        side,
                        criterion_id: observation.criterion_id.clone(),
                        description: observation.description.clone(),
                        true_count: 0,
                        false_count: 0,
                        unknown_count: 0,
                    });
                    criteria.len() - 1
                });
                if let Some(tally) = criteria.get_mut(slot) {
                    match result {
                        TriState::True => tally.true_count += 1,
                        TriState::False => tally.false_count += 1,
                        TriState::Unknown => tally.unknown_count += 1,
                    }
                }
            }
        }

        let resolved = resolve_effective(verdict, overrides);
        computed.add(resolved.computed);
        effective.add(resolved.value);
        if resolved.override_count > 0 {
            overridden += 1;
        }
        if resolved.value != resolved.computed {
            *transitions.entry((resolved.computed, resolved.value)).or_default() += 1;
        }
    }

    ReviewSummary {
        study_id: study_id.clone(),
        version,
        verdicts: computed.eligible + computed.ineligible + computed.indeterminate,
        criteria,
        computed,
        effective,
        overridden,
        transitions: transitions
            .into_iter()
            .map(|((from, to), count)| OverrideTransition {
                from,
                to,
                count,
            })
            .collect(),
    }
}

impl ScreeningEngine {
    /// Builds the review summary for a criteria version.
    ///
    /// The audit chain is verified first; a corrupt study yields no summary.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::AuditCorruption`] when the chain is corrupt, or
    /// [`EngineError::Store`] when loading fails.
    pub fn review_summary(
        &self,
        ctx: &StudyContext,
        version: CriteriaVersion,
    ) -> Result<ReviewSummary, EngineError> {
        self.ensure_audit_intact(ctx)?;
        let verdicts = self.list_verdicts(ctx, version)?;
        let overrides = self.study_overrides(ctx)?;
        Ok(summarize(ctx.study_id(), version, &verdicts, &overrides))
    }
}
