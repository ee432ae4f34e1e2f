//! Similarity primitives behind the seven confidence factors.
//!
//! Every function here returns a value in `[0, 1]`.

use std::collections::BTreeSet;

use rapidfuzz::distance::levenshtein;
use recon_model::FieldDescriptor;
use recon_rules::{ReconcileRules, RequiredPenalties, TypeRules};

use crate::normalize::{normalize_field_name, normalize_text};

const EDIT_WEIGHT: f64 = 0.6;
const TOKEN_WEIGHT: f64 = 0.4;
const NAME_CONTAINMENT: f64 = 0.85;
const TEXT_CONTAINMENT: f64 = 0.8;

const TYPE_EXACT: f64 = 1.0;
const TYPE_COMPATIBLE: f64 = 0.75;
const TYPE_SAME_FAMILY: f64 = 0.7;
/// Score for unrelated types. Never zero: unknown pairs are not disqualifying.
pub const TYPE_FALLBACK: f64 = 0.2;

const NEUTRAL: f64 = 0.5;
const NO_REFERENCE_OVERLAP: f64 = 0.3;

/// Edit-distance similarity: `1 - distance / longer length`, over chars.
pub fn levenshtein_similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    let distance = levenshtein::distance(a.chars(), b.chars());
    1.0 - distance as f64 / longest as f64
}

/// Jaccard overlap of whitespace/underscore-delimited tokens.
pub fn token_jaccard(a: &str, b: &str) -> f64 {
    let tokens = |s: &str| -> BTreeSet<String> {
        s.split(|c: char| c == '_' || c.is_whitespace())
            .filter(|t| !t.is_empty())
            .map(str::to_string)
            .collect()
    };
    jaccard(&tokens(a), &tokens(b))
}

/// 0.6 edit-distance similarity plus 0.4 token Jaccard.
pub fn blended_similarity(a: &str, b: &str) -> f64 {
    EDIT_WEIGHT * levenshtein_similarity(a, b) + TOKEN_WEIGHT * token_jaccard(a, b)
}

/// Name factor over normalized field names.
pub fn name_similarity(a: &str, b: &str, rules: &ReconcileRules) -> f64 {
    let a = normalize_field_name(a, &rules.naming);
    let b = normalize_field_name(b, &rules.naming);
    if a == b {
        return 1.0;
    }
    if !a.is_empty() && !b.is_empty() && (a.contains(&b) || b.contains(&a)) {
        return NAME_CONTAINMENT;
    }
    blended_similarity(&a, &b)
}

/// Label and description factor. Zero when either side is missing or blank.
pub fn text_similarity(a: Option<&str>, b: Option<&str>) -> f64 {
    let (Some(a), Some(b)) = (a, b) else {
        return 0.0;
    };
    let a = normalize_text(a);
    let b = normalize_text(b);
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }
    if a.contains(&b) || b.contains(&a) {
        return TEXT_CONTAINMENT;
    }
    blended_similarity(&a, &b)
}

pub fn type_compatibility(source: &str, target: &str, types: &TypeRules) -> f64 {
    let source = source.trim().to_lowercase();
    let target = target.trim().to_lowercase();
    if source == target {
        TYPE_EXACT
    } else if types.compatible(&source, &target) {
        TYPE_COMPATIBLE
    } else if (types.is_text_like(&source) && types.is_text_like(&target))
        || (types.is_numeric(&source) && types.is_numeric(&target))
    {
        TYPE_SAME_FAMILY
    } else {
        TYPE_FALLBACK
    }
}

pub fn required_match(source: bool, target: bool, penalties: &RequiredPenalties) -> f64 {
    match (source, target) {
        (true, false) => penalties.source_only,
        (false, true) => penalties.target_only,
        _ => 1.0,
    }
}

/// Case-insensitive Jaccard of picklist values. Neutral when either side has none.
pub fn picklist_overlap(source: &FieldDescriptor, target: &FieldDescriptor) -> f64 {
    match (source.picklist(), target.picklist()) {
        (Some(a), Some(b)) => jaccard(&lowercased(a), &lowercased(b)),
        _ => NEUTRAL,
    }
}

pub fn relationship_match(source: &FieldDescriptor, target: &FieldDescriptor) -> f64 {
    match (source.references(), target.references()) {
        (Some(a), Some(b)) => {
            if lowercased(a).intersection(&lowercased(b)).next().is_some() {
                1.0
            } else {
                NO_REFERENCE_OVERLAP
            }
        }
        _ => NEUTRAL,
    }
}

fn lowercased(values: &BTreeSet<String>) -> BTreeSet<String> {
    values.iter().map(|v| v.trim().to_lowercase()).collect()
}

fn jaccard(a: &BTreeSet<String>, b: &BTreeSet<String>) -> f64 {
    let union = a.union(b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(b).count() as f64 / union as f64
}
