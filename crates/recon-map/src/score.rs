//! Multi-factor confidence scoring for a single source/target pair.
//!
//! Seven factors in `[0, 1]` are combined by the configured weights into a
//! 0-100 confidence. Context flags adjust the result afterwards: automated
//! suggestions get a small boost, human-validated pairs are pinned at 100.

use recon_model::{
    ConfidenceLevel, FactorBreakdown, FieldDescriptor, MappingCandidate, Result, ScoreContext,
    score_at_least,
};
use recon_rules::{FactorWeights, LevelThresholds, ReconcileRules};
use tracing::trace;

use crate::similarity::{
    name_similarity, picklist_overlap, relationship_match, required_match, text_similarity,
    type_compatibility,
};

const MAX_CONFIDENCE: f64 = 100.0;

const TYPE_WARNING_BELOW: f64 = 0.5;
const REQUIRED_WARNING_BELOW: f64 = 0.5;
const PICKLIST_WARNING_BELOW: f64 = 0.5;
const TYPE_TRANSFORM_BELOW: f64 = 0.7;
const PICKLIST_TABLE_BELOW: f64 = 0.8;
const NAME_REVIEW_BELOW: f64 = 0.6;

/// Scores field pairs against a borrowed rule set.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceScorer<'a> {
    rules: &'a ReconcileRules,
}

impl<'a> ConfidenceScorer<'a> {
    pub fn new(rules: &'a ReconcileRules) -> Self {
        Self { rules }
    }

    pub fn rules(&self) -> &'a ReconcileRules {
        self.rules
    }

    /// Score one pair.
    ///
    /// Fails with `InvalidInput` if either descriptor has a blank name or
    /// type. Otherwise total and deterministic.
    pub fn score(
        &self,
        source: &FieldDescriptor,
        target: &FieldDescriptor,
        context: ScoreContext,
    ) -> Result<MappingCandidate> {
        source.validate()?;
        target.validate()?;
        Ok(self.score_unchecked(source, target, context))
    }

    /// Score a pair whose descriptors were already validated.
    pub(crate) fn score_unchecked(
        &self,
        source: &FieldDescriptor,
        target: &FieldDescriptor,
        context: ScoreContext,
    ) -> MappingCandidate {
        let factors = self.factors(source, target);
        let weighted = weighted_sum(&factors, &self.rules.weights);
        let adjusted = if context.user_validated {
            MAX_CONFIDENCE
        } else if context.ai_suggested {
            (weighted + self.rules.context.ai_boost).min(MAX_CONFIDENCE)
        } else {
            weighted
        };
        let confidence = round_one_decimal(adjusted);
        // Levels come from the unrounded score: 84.96 is medium even though
        // it displays as 85.0.
        let level = classify(adjusted, &self.rules.levels);

        trace!(
            source = %source.name,
            target = %target.name,
            weighted,
            confidence,
            level = level.as_str(),
            "scored pair"
        );

        MappingCandidate {
            source_field: source.name.clone(),
            target_field: target.name.clone(),
            confidence,
            level,
            warnings: warnings(source, target, &factors),
            recommendations: recommendations(source, target, &factors),
            factors,
        }
    }

    /// Compute the seven raw factors without weighting.
    pub fn factors(&self, source: &FieldDescriptor, target: &FieldDescriptor) -> FactorBreakdown {
        FactorBreakdown {
            name_similarity: name_similarity(&source.name, &target.name, self.rules),
            type_compatibility: type_compatibility(
                &source.field_type,
                &target.field_type,
                &self.rules.types,
            ),
            label_similarity: text_similarity(
                Some(source.effective_label()),
                Some(target.effective_label()),
            ),
            description_similarity: text_similarity(
                source.description.as_deref(),
                target.description.as_deref(),
            ),
            required_field_match: required_match(
                source.required,
                target.required,
                &self.rules.required,
            ),
            picklist_compatibility: picklist_overlap(source, target),
            relationship_match: relationship_match(source, target),
        }
    }
}

/// Weighted factor sum on the 0-100 scale, before any context adjustment.
pub fn weighted_sum(factors: &FactorBreakdown, weights: &FactorWeights) -> f64 {
    let weighted: f64 = factors
        .iter()
        .zip(weights.as_array())
        .map(|((_, value), weight)| value * weight)
        .sum();
    (weighted * MAX_CONFIDENCE).clamp(0.0, MAX_CONFIDENCE)
}

/// Map a 0-100 confidence onto a level.
pub fn classify(confidence: f64, levels: &LevelThresholds) -> ConfidenceLevel {
    if score_at_least(confidence, levels.high) {
        ConfidenceLevel::High
    } else if score_at_least(confidence, levels.medium) {
        ConfidenceLevel::Medium
    } else {
        ConfidenceLevel::Low
    }
}

fn round_one_decimal(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

fn warnings(
    source: &FieldDescriptor,
    target: &FieldDescriptor,
    factors: &FactorBreakdown,
) -> Vec<String> {
    let mut warnings = Vec::new();
    if factors.type_compatibility < TYPE_WARNING_BELOW {
        warnings.push(format!(
            "Type mismatch: {} → {} may require transformation",
            source.field_type, target.field_type
        ));
    }
    if factors.required_field_match < REQUIRED_WARNING_BELOW {
        if source.required && !target.required {
            warnings.push(
                "Source field is required but target is optional - data may be lost".to_string(),
            );
        } else if target.required && !source.required {
            warnings.push(
                "Target field is required but source is optional - default value needed"
                    .to_string(),
            );
        }
    }
    if factors.picklist_compatibility < PICKLIST_WARNING_BELOW
        && source.picklist().is_some()
        && target.picklist().is_some()
    {
        warnings.push("Picklist values have low overlap - value mapping required".to_string());
    }
    if let (Some(source_len), Some(target_len)) = (source.length, target.length)
        && source_len > target_len
    {
        warnings.push(format!(
            "Source field length ({source_len}) exceeds target ({target_len}) - truncation risk"
        ));
    }
    warnings
}

fn recommendations(
    source: &FieldDescriptor,
    target: &FieldDescriptor,
    factors: &FactorBreakdown,
) -> Vec<String> {
    let mut recommendations = Vec::new();
    if factors.type_compatibility < TYPE_TRANSFORM_BELOW {
        recommendations.push("Add data transformation rule to handle type conversion".to_string());
    }
    if factors.picklist_compatibility < PICKLIST_TABLE_BELOW
        && source.picklist().is_some()
        && target.picklist().is_some()
    {
        recommendations.push("Create picklist value mapping table".to_string());
    }
    if target.required && !source.required {
        recommendations.push("Define default value or validation rule".to_string());
    }
    if factors.name_similarity < NAME_REVIEW_BELOW {
        recommendations.push("Verify mapping with business stakeholders".to_string());
    }
    recommendations
}
