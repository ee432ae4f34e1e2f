use std::fmt;

use recon_model::ValidationGate;
use serde::{Deserialize, Serialize};

/// A compatibility problem found by the validator.
///
/// Warnings never block on their own; the caller decides which become
/// conflicts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ValidationWarning {
    /// Source and target types sit in different known type groups.
    TypeMismatch {
        source_field: String,
        source_type: String,
        target_field: String,
        target_type: String,
    },
    /// A required target has no source value it can rely on.
    RequiredFieldUnmapped {
        target_field: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        source_field: Option<String>,
    },
    /// The source may hold longer values than the target accepts.
    LengthTruncation {
        source_field: String,
        source_length: u32,
        target_field: String,
        target_length: u32,
    },
}

impl ValidationWarning {
    pub fn code(&self) -> &'static str {
        match self {
            Self::TypeMismatch { .. } => "type_mismatch",
            Self::RequiredFieldUnmapped { .. } => "required_field_unmapped",
            Self::LengthTruncation { .. } => "length_truncation",
        }
    }

    pub fn target_field(&self) -> &str {
        match self {
            Self::TypeMismatch { target_field, .. }
            | Self::RequiredFieldUnmapped { target_field, .. }
            | Self::LengthTruncation { target_field, .. } => target_field,
        }
    }
}

impl fmt::Display for ValidationWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::TypeMismatch {
                source_type,
                target_type,
                ..
            } => write!(f, "Type mismatch: {source_type} → {target_type}"),
            Self::RequiredFieldUnmapped { target_field, .. } => write!(
                f,
                "Required field \"{target_field}\" has no source value mapped."
            ),
            Self::LengthTruncation {
                source_length,
                target_length,
                ..
            } => write!(
                f,
                "Source field length ({source_length}) exceeds target ({target_length}) - truncation risk"
            ),
        }
    }
}

/// Outcome of checking one mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub warnings: Vec<ValidationWarning>,
}

impl ValidationReport {
    pub fn new(warnings: Vec<ValidationWarning>) -> Self {
        Self { warnings }
    }

    pub fn passed(&self) -> bool {
        self.warnings.is_empty()
    }

    /// Warnings rendered as plain strings; empty means compatible.
    pub fn messages(&self) -> Vec<String> {
        self.warnings.iter().map(ToString::to_string).collect()
    }

    pub fn has_type_mismatch(&self) -> bool {
        self.warnings
            .iter()
            .any(|w| matches!(w, ValidationWarning::TypeMismatch { .. }))
    }
}

impl ValidationGate for ValidationReport {
    fn outstanding(&self) -> usize {
        self.warnings.len()
    }
}
