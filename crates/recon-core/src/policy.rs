//! Caller-defined auto-resolution.
//!
//! The ledger never decides on its own that a conflict is settled. A policy
//! looks at an unresolved conflict plus the current mappings and candidates
//! and may propose a resolution; [`apply_policy`] records it.

use recon_model::{
    ConfidenceLevel, ConflictId, ConflictType, FieldMapping, MappingCandidate, MappingConflict,
    ResolutionAction, Result,
};
use serde::Serialize;
use serde_json::json;
use tracing::debug;

use crate::ledger::ConflictLedger;

/// A resolution proposed by a policy.
#[derive(Debug, Clone, PartialEq)]
pub struct AutoResolution {
    pub action: ResolutionAction,
    pub details: Option<serde_json::Value>,
    pub reason: String,
}

/// Candidates scored between one source object and one target object.
///
/// Field names only mean something inside their object pair, so candidates
/// are never pooled across pairs.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ObjectCandidates {
    pub source_object: String,
    pub target_object: String,
    pub candidates: Vec<MappingCandidate>,
}

impl ObjectCandidates {
    pub fn new(
        source_object: impl Into<String>,
        target_object: impl Into<String>,
        candidates: Vec<MappingCandidate>,
    ) -> Self {
        Self {
            source_object: source_object.into(),
            target_object: target_object.into(),
            candidates,
        }
    }
}

/// What a policy may look at besides the conflict itself.
#[derive(Debug, Clone, Copy)]
pub struct PolicyContext<'a> {
    pub mappings: &'a [FieldMapping],
    pub candidates: &'a [ObjectCandidates],
}

pub trait AutoResolvePolicy {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Propose a resolution for an unresolved conflict, or `None` to leave it
    /// for a human.
    fn decide(
        &self,
        conflict: &MappingConflict,
        context: &PolicyContext<'_>,
    ) -> Option<AutoResolution>;
}

/// Settles a duplicate-target conflict when exactly one of the competing
/// mappings is backed by a high-confidence candidate.
///
/// Only candidates from the competing mappings' own object pairs count.
#[derive(Debug, Clone, Copy, Default)]
pub struct SingleHighConfidence;

impl AutoResolvePolicy for SingleHighConfidence {
    fn name(&self) -> &'static str {
        "single_high_confidence"
    }

    fn decide(
        &self,
        conflict: &MappingConflict,
        context: &PolicyContext<'_>,
    ) -> Option<AutoResolution> {
        if conflict.conflict_type != ConflictType::DuplicateMapping {
            return None;
        }
        let target = conflict.target.as_ref()?;
        let target_field = target.field.as_deref()?;
        let competing: Vec<&FieldMapping> = context
            .mappings
            .iter()
            .filter(|m| {
                m.is_active()
                    && m.target_object.eq_ignore_ascii_case(&target.object)
                    && m.target_field.eq_ignore_ascii_case(target_field)
            })
            .collect();
        if competing.len() < 2 {
            return None;
        }

        let mut high = context
            .candidates
            .iter()
            .filter(|group| group.target_object.eq_ignore_ascii_case(&target.object))
            .flat_map(|group| group.candidates.iter().map(move |c| (group, c)))
            .filter(|(group, c)| {
                c.level == ConfidenceLevel::High
                    && c.target_field.eq_ignore_ascii_case(target_field)
                    && competing.iter().any(|m| {
                        m.source_object.eq_ignore_ascii_case(&group.source_object)
                            && m.source_field.eq_ignore_ascii_case(&c.source_field)
                    })
            });
        let (group, winner) = high.next()?;
        if high.next().is_some() {
            return None;
        }
        Some(AutoResolution {
            action: ResolutionAction::MapToExisting,
            details: Some(json!({
                "source_object": group.source_object,
                "source_field": winner.source_field,
                "target_object": group.target_object,
                "target_field": winner.target_field,
                "confidence": winner.confidence,
            })),
            reason: format!(
                "single high-confidence candidate {}.{} → {}.{} ({:.1})",
                group.source_object,
                winner.source_field,
                group.target_object,
                winner.target_field,
                winner.confidence
            ),
        })
    }
}

/// Run `policy` over every unresolved conflict and record its decisions.
///
/// Returns the ids that were auto-resolved.
pub fn apply_policy(
    ledger: &mut ConflictLedger,
    policy: &impl AutoResolvePolicy,
    context: &PolicyContext<'_>,
) -> Result<Vec<ConflictId>> {
    let decisions: Vec<(ConflictId, AutoResolution)> = ledger
        .unresolved()
        .filter_map(|conflict| {
            policy
                .decide(conflict, context)
                .map(|decision| (conflict.id, decision))
        })
        .collect();

    let mut resolved = Vec::with_capacity(decisions.len());
    for (id, decision) in decisions {
        ledger.auto_resolve(id, decision.action, decision.details, &decision.reason)?;
        resolved.push(id);
    }
    debug!(
        policy = policy.name(),
        resolved = resolved.len(),
        "applied auto-resolve policy"
    );
    Ok(resolved)
}
