//! Scored mapping candidates.
//!
//! Candidates are transient: the scorer builds them for a single call and the
//! caller decides whether to keep them.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Qualitative confidence band.
///
/// Ordered so that `High > Medium > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    /// Weak match; requires manual confirmation.
    Low,
    /// Plausible match; should be reviewed.
    Medium,
    /// Near-certain match.
    High,
}

impl ConfidenceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
        }
    }

    /// Returns a human-readable description of the confidence level.
    #[must_use]
    pub fn description(&self) -> &'static str {
        match self {
            Self::High => "high confidence - likely correct",
            Self::Medium => "medium confidence - should review",
            Self::Low => "low confidence - needs verification",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The seven scoring dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Factor {
    NameSimilarity,
    TypeCompatibility,
    LabelSimilarity,
    DescriptionSimilarity,
    RequiredFieldMatch,
    PicklistCompatibility,
    RelationshipMatch,
}

impl Factor {
    pub const ALL: [Factor; 7] = [
        Factor::NameSimilarity,
        Factor::TypeCompatibility,
        Factor::LabelSimilarity,
        Factor::DescriptionSimilarity,
        Factor::RequiredFieldMatch,
        Factor::PicklistCompatibility,
        Factor::RelationshipMatch,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::NameSimilarity => "Name similarity",
            Self::TypeCompatibility => "Type compatibility",
            Self::LabelSimilarity => "Label similarity",
            Self::DescriptionSimilarity => "Description similarity",
            Self::RequiredFieldMatch => "Required-field match",
            Self::PicklistCompatibility => "Picklist compatibility",
            Self::RelationshipMatch => "Relationship match",
        }
    }
}

/// Per-factor sub-scores, each in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FactorBreakdown {
    pub name_similarity: f64,
    pub type_compatibility: f64,
    pub label_similarity: f64,
    pub description_similarity: f64,
    pub required_field_match: f64,
    pub picklist_compatibility: f64,
    pub relationship_match: f64,
}

impl FactorBreakdown {
    pub fn get(&self, factor: Factor) -> f64 {
        match factor {
            Factor::NameSimilarity => self.name_similarity,
            Factor::TypeCompatibility => self.type_compatibility,
            Factor::LabelSimilarity => self.label_similarity,
            Factor::DescriptionSimilarity => self.description_similarity,
            Factor::RequiredFieldMatch => self.required_field_match,
            Factor::PicklistCompatibility => self.picklist_compatibility,
            Factor::RelationshipMatch => self.relationship_match,
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = (Factor, f64)> + '_ {
        Factor::ALL.into_iter().map(|factor| (factor, self.get(factor)))
    }

    /// Human-readable explanation of the breakdown.
    pub fn explain(&self) -> String {
        self.iter()
            .map(|(factor, value)| format!("{}: {:.0}%", factor.label(), value * 100.0))
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Caller-supplied provenance of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ScoreContext {
    /// The pairing came from an automated suggestion.
    #[serde(default)]
    pub ai_suggested: bool,
    /// A human explicitly confirmed the pairing.
    #[serde(default)]
    pub user_validated: bool,
}

impl ScoreContext {
    pub fn ai_suggested() -> Self {
        Self {
            ai_suggested: true,
            user_validated: false,
        }
    }

    pub fn user_validated() -> Self {
        Self {
            ai_suggested: false,
            user_validated: true,
        }
    }
}

/// Slack for floating-point noise when a 0-100 score is compared to a bound.
///
/// `0.55 * 100.0` is `55.00000000000001`; without slack a confidence of
/// exactly `55.0` would miss a `0.55` threshold.
pub const SCORE_TOLERANCE: f64 = 1e-9;

/// Inclusive `score >= bound` on the 0-100 scale, tolerant of float noise.
pub fn score_at_least(score: f64, bound: f64) -> bool {
    score + SCORE_TOLERANCE >= bound
}

/// A proposed, unsaved source-to-target field pairing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingCandidate {
    pub source_field: String,
    pub target_field: String,
    /// Overall confidence on a 0-100 scale, rounded to one decimal.
    pub confidence: f64,
    pub level: ConfidenceLevel,
    pub factors: FactorBreakdown,
    #[serde(default)]
    pub warnings: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

impl MappingCandidate {
    /// True if the candidate meets a `[0, 1]` threshold (inclusive).
    pub fn meets(&self, threshold: f64) -> bool {
        score_at_least(self.confidence, threshold * 100.0)
    }
}

/// A pairing proposed by an external suggestion service.
///
/// The suggestion's own confidence is informational only; the engine always
/// re-scores the pair.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiSuggestion {
    pub source_field: String,
    pub target_field: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}
