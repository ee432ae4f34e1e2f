//! Reconciliation rules: weights, thresholds and type lookup tables.
//!
//! Rules are plain data loaded once at startup and passed by reference into
//! the scorer and validator. A TOML file only needs to name the sections it
//! overrides; everything else keeps the built-in default.
//!
//! ```toml
//! [weights]
//! name_similarity = 0.35
//! type_compatibility = 0.20
//!
//! [levels]
//! high = 90.0
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Result, RulesError};

const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconcileRules {
    pub weights: FactorWeights,
    pub levels: LevelThresholds,
    pub context: ContextAdjustment,
    pub required: RequiredPenalties,
    pub types: TypeRules,
    pub validator: ValidatorRules,
    pub naming: NamingRules,
}

impl ReconcileRules {
    /// Parse rules from TOML text. Call [`validate`](Self::validate) before use.
    pub fn from_toml_str(text: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(text)
    }

    /// Load rules from a TOML file and validate them.
    pub fn from_toml_path(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| RulesError::io(path, e))?;
        let rules = Self::from_toml_str(&text).map_err(|source| RulesError::Toml {
            path: path.to_path_buf(),
            source,
        })?;
        rules.validate()?;
        Ok(rules)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn validate(&self) -> Result<()> {
        self.weights.validate()?;
        self.levels.validate()?;
        self.context.validate()?;
        self.required.validate()?;
        self.naming.validate()?;
        Ok(())
    }
}

/// Weight of each factor in the overall confidence. Must sum to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FactorWeights {
    pub name_similarity: f64,
    pub type_compatibility: f64,
    pub label_similarity: f64,
    pub description_similarity: f64,
    pub required_field_match: f64,
    pub picklist_compatibility: f64,
    pub relationship_match: f64,
}

impl Default for FactorWeights {
    fn default() -> Self {
        Self {
            name_similarity: 0.30,
            type_compatibility: 0.25,
            label_similarity: 0.15,
            description_similarity: 0.10,
            required_field_match: 0.10,
            picklist_compatibility: 0.05,
            relationship_match: 0.05,
        }
    }
}

impl FactorWeights {
    pub fn as_array(&self) -> [f64; 7] {
        [
            self.name_similarity,
            self.type_compatibility,
            self.label_similarity,
            self.description_similarity,
            self.required_field_match,
            self.picklist_compatibility,
            self.relationship_match,
        ]
    }

    pub fn total(&self) -> f64 {
        self.as_array().iter().sum()
    }

    fn validate(&self) -> Result<()> {
        if self.as_array().iter().any(|w| !w.is_finite() || *w < 0.0) {
            return Err(RulesError::invalid("factor weights must be non-negative"));
        }
        let total = self.total();
        if (total - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(RulesError::invalid(format!(
                "factor weights must sum to 1.0 (got {total:.6})"
            )));
        }
        Ok(())
    }
}

/// Confidence band boundaries on the 0-100 scale.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LevelThresholds {
    pub high: f64,
    pub medium: f64,
}

impl Default for LevelThresholds {
    fn default() -> Self {
        Self {
            high: 85.0,
            medium: 60.0,
        }
    }
}

impl LevelThresholds {
    fn validate(&self) -> Result<()> {
        let in_range = |v: f64| (0.0..=100.0).contains(&v);
        if !in_range(self.high) || !in_range(self.medium) || self.medium > self.high {
            return Err(RulesError::invalid(format!(
                "level thresholds must satisfy 0 <= medium <= high <= 100 (got medium={}, high={})",
                self.medium, self.high
            )));
        }
        Ok(())
    }
}

/// Adjustments applied after the weighted sum.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ContextAdjustment {
    /// Points added to automated suggestions (capped at 100).
    pub ai_boost: f64,
}

impl Default for ContextAdjustment {
    fn default() -> Self {
        Self { ai_boost: 5.0 }
    }
}

impl ContextAdjustment {
    fn validate(&self) -> Result<()> {
        if !(0.0..=100.0).contains(&self.ai_boost) {
            return Err(RulesError::invalid("ai_boost must be within 0..=100"));
        }
        Ok(())
    }
}

/// Required-ness mismatch scores.
///
/// The two directions are scored differently. Which direction is worse has
/// not been confirmed by product owners; keep them separate.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequiredPenalties {
    /// Source required, target optional.
    pub source_only: f64,
    /// Source optional, target required.
    pub target_only: f64,
}

impl Default for RequiredPenalties {
    fn default() -> Self {
        Self {
            source_only: 0.5,
            target_only: 0.3,
        }
    }
}

impl RequiredPenalties {
    fn validate(&self) -> Result<()> {
        let in_unit = |v: f64| (0.0..=1.0).contains(&v);
        if !in_unit(self.source_only) || !in_unit(self.target_only) {
            return Err(RulesError::invalid(
                "required penalties must be within 0.0..=1.0",
            ));
        }
        Ok(())
    }
}

/// Type tables used by the scorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TypeRules {
    /// Compatible types per type. Lookups are symmetric.
    pub compatible: BTreeMap<String, BTreeSet<String>>,
    /// Numeric type family.
    pub numeric_family: BTreeSet<String>,
    /// Substrings marking a type as text-like.
    pub text_markers: Vec<String>,
}

impl Default for TypeRules {
    fn default() -> Self {
        let numeric = ["integer", "number", "double", "decimal", "currency", "percent"];
        let mut compatible = BTreeMap::new();
        let mut add = |key: &str, values: &[&str]| {
            compatible.insert(
                key.to_string(),
                values.iter().map(|v| (*v).to_string()).collect(),
            );
        };
        add(
            "string",
            &["text", "textarea", "email", "phone", "url", "picklist"],
        );
        add("text", &["string", "textarea", "email", "phone", "url"]);
        for family_member in numeric {
            let others: Vec<&str> = numeric
                .iter()
                .copied()
                .filter(|t| *t != family_member)
                .collect();
            add(family_member, &others);
        }
        add("boolean", &["checkbox"]);
        add("checkbox", &["boolean"]);
        add("date", &["datetime"]);
        add("datetime", &["date"]);
        add("reference", &["lookup", "masterdetail"]);
        add("lookup", &["reference", "masterdetail"]);
        add("masterdetail", &["reference", "lookup"]);
        Self {
            compatible,
            numeric_family: numeric.iter().map(|t| (*t).to_string()).collect(),
            text_markers: vec!["text".to_string(), "string".to_string()],
        }
    }
}

impl TypeRules {
    /// Symmetric table lookup. Inputs must already be lowercase.
    pub fn compatible(&self, a: &str, b: &str) -> bool {
        let listed = |from: &str, to: &str| self.compatible.get(from).is_some_and(|set| set.contains(to));
        listed(a, b) || listed(b, a)
    }

    pub fn is_numeric(&self, t: &str) -> bool {
        self.numeric_family.contains(t)
    }

    pub fn is_text_like(&self, t: &str) -> bool {
        self.text_markers.iter().any(|marker| t.contains(marker.as_str()))
    }
}

/// Type groups used by the validator's pass/fail gate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidatorRules {
    pub groups: BTreeMap<String, BTreeSet<String>>,
}

impl Default for ValidatorRules {
    fn default() -> Self {
        let mut groups = BTreeMap::new();
        let mut add = |group: &str, members: &[&str]| {
            groups.insert(
                group.to_string(),
                members.iter().map(|m| (*m).to_string()).collect(),
            );
        };
        add("string", &["string", "text", "textarea", "url", "email"]);
        add(
            "number",
            &["double", "int", "integer", "currency", "percent", "number"],
        );
        add("boolean", &["boolean", "checkbox"]);
        add("date", &["date", "datetime"]);
        Self { groups }
    }
}

impl ValidatorRules {
    /// Name of the group containing `t`, if any. Input must be lowercase.
    pub fn group_of(&self, t: &str) -> Option<&str> {
        self.groups
            .iter()
            .find(|(_, members)| members.contains(t))
            .map(|(group, _)| group.as_str())
    }
}

/// Field-name canonicalization rules.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingRules {
    /// Platform custom-field suffixes stripped before comparison.
    pub custom_suffixes: Vec<String>,
}

impl Default for NamingRules {
    fn default() -> Self {
        Self {
            custom_suffixes: vec!["__c".to_string(), "__pc".to_string(), "__r".to_string()],
        }
    }
}

impl NamingRules {
    fn validate(&self) -> Result<()> {
        for suffix in &self.custom_suffixes {
            // Separators are rewritten after stripping, so a suffix that starts
            // with '_' can never match a second time.
            if !suffix.starts_with('_') || suffix.trim_start_matches('_').is_empty() {
                return Err(RulesError::invalid(format!(
                    "custom suffix '{suffix}' must start with '_' and name a suffix"
                )));
            }
        }
        Ok(())
    }
}
