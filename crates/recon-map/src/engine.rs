//! Candidate generation over the source × target cross product.

use std::cmp::Ordering;

use recon_model::{
    AiSuggestion, FieldDescriptor, MappingCandidate, ObjectSchema, ReconError, Result,
    ScoreContext,
};
use recon_rules::ReconcileRules;
use serde::{Deserialize, Serialize};
use tracing::{debug, debug_span, warn};

use crate::score::ConfidenceScorer;
use crate::similarity::{TYPE_FALLBACK, type_compatibility};

/// Default minimum confidence, as a fraction of 100.
pub const DEFAULT_THRESHOLD: f64 = 0.7;

/// Options for a generation pass.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeneratorOptions {
    /// Minimum confidence in `[0, 1]`; candidates below `threshold * 100` are
    /// dropped. The bound is inclusive.
    pub threshold: f64,
    /// Skip pairs whose types share no family before scoring.
    pub prefilter_type_family: bool,
}

impl Default for GeneratorOptions {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            prefilter_type_family: false,
        }
    }
}

impl GeneratorOptions {
    pub fn with_threshold(threshold: f64) -> Self {
        Self {
            threshold,
            ..Self::default()
        }
    }

    fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.threshold) {
            return Err(ReconError::InvalidInput(format!(
                "threshold must be within 0.0..=1.0 (got {})",
                self.threshold
            )));
        }
        Ok(())
    }
}

/// Proposes and ranks field pairings.
///
/// Every source is scored against every target. Candidates competing for the
/// same target are all kept; choosing between them is left to the caller.
#[derive(Debug, Clone, Copy)]
pub struct CandidateGenerator<'a> {
    scorer: ConfidenceScorer<'a>,
}

impl<'a> CandidateGenerator<'a> {
    pub fn new(rules: &'a ReconcileRules) -> Self {
        Self {
            scorer: ConfidenceScorer::new(rules),
        }
    }

    pub fn scorer(&self) -> &ConfidenceScorer<'a> {
        &self.scorer
    }

    /// Score the full cross product and keep candidates at or above `threshold`.
    pub fn generate_candidates(
        &self,
        sources: &[FieldDescriptor],
        targets: &[FieldDescriptor],
        threshold: f64,
    ) -> Result<Vec<MappingCandidate>> {
        self.generate_with(sources, targets, &GeneratorOptions::with_threshold(threshold))
    }

    pub fn generate_with(
        &self,
        sources: &[FieldDescriptor],
        targets: &[FieldDescriptor],
        options: &GeneratorOptions,
    ) -> Result<Vec<MappingCandidate>> {
        options.validate()?;
        // Reject malformed input before any pair is scored.
        sources
            .iter()
            .chain(targets)
            .try_for_each(FieldDescriptor::validate)?;

        let types = &self.scorer.rules().types;
        let mut skipped = 0usize;
        let mut candidates = Vec::new();
        for source in sources {
            for target in targets {
                if options.prefilter_type_family
                    && type_compatibility(&source.field_type, &target.field_type, types)
                        <= TYPE_FALLBACK
                {
                    skipped += 1;
                    continue;
                }
                let candidate = self
                    .scorer
                    .score_unchecked(source, target, ScoreContext::default());
                if candidate.meets(options.threshold) {
                    candidates.push(candidate);
                }
            }
        }
        sort_candidates(&mut candidates);

        debug!(
            sources = sources.len(),
            targets = targets.len(),
            prefiltered = skipped,
            kept = candidates.len(),
            threshold = options.threshold,
            "generated candidates"
        );
        Ok(candidates)
    }

    /// Generate candidates between the fields of two objects.
    pub fn generate_for_objects(
        &self,
        source: &ObjectSchema,
        target: &ObjectSchema,
        options: &GeneratorOptions,
    ) -> Result<Vec<MappingCandidate>> {
        let span = debug_span!("generate", source = %source.name, target = %target.name);
        let _guard = span.enter();
        self.generate_with(&source.fields, &target.fields, options)
    }

    /// Fold externally suggested pairings into a candidate list.
    ///
    /// Each suggestion is re-scored with the `ai_suggested` flag; its own
    /// confidence is ignored. A re-scored suggestion replaces any existing
    /// candidate for the same pair. Suggestions naming unknown fields are
    /// skipped with a warning.
    pub fn merge_ai_suggestions(
        &self,
        mut candidates: Vec<MappingCandidate>,
        suggestions: &[AiSuggestion],
        sources: &[FieldDescriptor],
        targets: &[FieldDescriptor],
    ) -> Result<Vec<MappingCandidate>> {
        for suggestion in suggestions {
            let source = find_field(sources, &suggestion.source_field);
            let target = find_field(targets, &suggestion.target_field);
            let (Some(source), Some(target)) = (source, target) else {
                warn!(
                    source = %suggestion.source_field,
                    target = %suggestion.target_field,
                    "skipping suggestion for unknown field"
                );
                continue;
            };
            let rescored = self
                .scorer
                .score(source, target, ScoreContext::ai_suggested())?;
            match candidates.iter_mut().find(|c| {
                c.source_field.eq_ignore_ascii_case(&source.name)
                    && c.target_field.eq_ignore_ascii_case(&target.name)
            }) {
                Some(existing) => *existing = rescored,
                None => candidates.push(rescored),
            }
        }
        sort_candidates(&mut candidates);
        debug!(
            suggestions = suggestions.len(),
            total = candidates.len(),
            "merged suggestions"
        );
        Ok(candidates)
    }
}

/// Descending confidence, then source name and target name ascending
/// (case-insensitive).
pub fn sort_candidates(candidates: &mut [MappingCandidate]) {
    candidates.sort_by(compare_candidates);
}

fn compare_candidates(a: &MappingCandidate, b: &MappingCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then_with(|| {
            a.source_field
                .to_lowercase()
                .cmp(&b.source_field.to_lowercase())
        })
        .then_with(|| {
            a.target_field
                .to_lowercase()
                .cmp(&b.target_field.to_lowercase())
        })
}

fn find_field<'f>(fields: &'f [FieldDescriptor], name: &str) -> Option<&'f FieldDescriptor> {
    fields
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(name.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nan_threshold_rejected() {
        let rules = ReconcileRules::default();
        let generator = CandidateGenerator::new(&rules);
        let err = generator.generate_candidates(&[], &[], f64::NAN).unwrap_err();
        assert!(matches!(err, ReconError::InvalidInput(_)));
        assert!(generator.generate_candidates(&[], &[], 1.5).is_err());
    }

    #[test]
    fn prefilter_skips_unrelated_types() {
        let rules = ReconcileRules::default();
        let generator = CandidateGenerator::new(&rules);
        let sources = vec![FieldDescriptor::new("Active", "boolean")];
        let targets = vec![FieldDescriptor::new("Active", "date")];
        let options = GeneratorOptions {
            threshold: 0.0,
            prefilter_type_family: true,
        };
        let kept = generator.generate_with(&sources, &targets, &options).unwrap();
        assert!(kept.is_empty());
        let unfiltered = generator.generate_candidates(&sources, &targets, 0.0).unwrap();
        assert_eq!(unfiltered.len(), 1);
    }

    #[test]
    fn ties_break_on_source_then_target() {
        let candidate = |source: &str, target: &str, confidence: f64| MappingCandidate {
            source_field: source.to_string(),
            target_field: target.to_string(),
            confidence,
            level: recon_model::ConfidenceLevel::Medium,
            factors: recon_model::FactorBreakdown::default(),
            warnings: Vec::new(),
            recommendations: Vec::new(),
        };
        let mut ranked = vec![
            candidate("beta", "Zeta", 70.0),
            candidate("Alpha", "zeta", 70.0),
            candidate("alpha", "Eta", 70.0),
            candidate("Omega", "Eta", 90.0),
        ];
        sort_candidates(&mut ranked);
        let order: Vec<(&str, &str)> = ranked
            .iter()
            .map(|c| (c.source_field.as_str(), c.target_field.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Omega", "Eta"),
                ("alpha", "Eta"),
                ("Alpha", "zeta"),
                ("beta", "Zeta"),
            ]
        );
    }
}
