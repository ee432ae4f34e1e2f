//! Persisted field mappings and their review lifecycle.
//!
//! The caller owns and stores [`FieldMapping`] records. The engine only
//! enforces the status machine:
//!
//! ```text
//! pending ──(validator passes)──> validated ──> approved
//!    │                                │
//!    └────────────> rejected <────────┘
//! ```
//!
//! `approved` and `rejected` are terminal. Rolling back means creating a new
//! mapping.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingType {
    #[default]
    Direct,
    Transform,
    Lookup,
    Calculated,
    Formula,
}

impl MappingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::Transform => "transform",
            Self::Lookup => "lookup",
            Self::Calculated => "calculated",
            Self::Formula => "formula",
        }
    }

    /// True if values are copied without conversion.
    pub fn is_direct(&self) -> bool {
        matches!(self, Self::Direct)
    }
}

impl fmt::Display for MappingType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingType {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "direct" => Ok(Self::Direct),
            "transform" => Ok(Self::Transform),
            "lookup" => Ok(Self::Lookup),
            "calculated" => Ok(Self::Calculated),
            "formula" => Ok(Self::Formula),
            _ => Err(ReconError::InvalidInput(format!("unknown mapping type: {s}"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MappingStatus {
    #[default]
    Pending,
    Validated,
    Approved,
    Rejected,
}

impl MappingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Validated => "validated",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Approved | Self::Rejected)
    }

    /// Returns true if the lifecycle defines a move from `self` to `next`.
    pub fn can_transition_to(&self, next: MappingStatus) -> bool {
        matches!(
            (self, next),
            (Self::Pending, Self::Validated)
                | (Self::Validated, Self::Approved)
                | (Self::Pending | Self::Validated, Self::Rejected)
        )
    }
}

impl fmt::Display for MappingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MappingStatus {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "validated" => Ok(Self::Validated),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(ReconError::InvalidInput(format!(
                "unknown mapping status: {s}"
            ))),
        }
    }
}

/// Result of checking a mapping, as seen by the lifecycle.
///
/// Implemented by the validator's report so the model does not depend on it.
pub trait ValidationGate {
    /// Number of warnings still standing against the mapping.
    fn outstanding(&self) -> usize;
}

/// A caller-owned source-to-target field mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMapping {
    pub source_object: String,
    pub source_field: String,
    pub target_object: String,
    pub target_field: String,
    #[serde(default)]
    pub mapping_type: MappingType,
    #[serde(default)]
    pub is_required: bool,
    #[serde(default)]
    pub status: MappingStatus,
    /// Conversion applied for non-direct mappings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transform_rule: Option<String>,
    /// Value written when the source is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl FieldMapping {
    /// Create a pending direct mapping.
    pub fn new(
        source_object: impl Into<String>,
        source_field: impl Into<String>,
        target_object: impl Into<String>,
        target_field: impl Into<String>,
    ) -> Self {
        Self {
            source_object: source_object.into(),
            source_field: source_field.into(),
            target_object: target_object.into(),
            target_field: target_field.into(),
            mapping_type: MappingType::Direct,
            is_required: false,
            status: MappingStatus::Pending,
            transform_rule: None,
            default_value: None,
        }
    }

    pub fn with_type(mut self, mapping_type: MappingType) -> Self {
        self.mapping_type = mapping_type;
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_transform(mut self, rule: impl Into<String>) -> Self {
        self.mapping_type = MappingType::Transform;
        self.transform_rule = Some(rule.into());
        self
    }

    /// Reject mappings with blank object or field references.
    pub fn validate(&self) -> Result<()> {
        let parts = [
            ("source_object", &self.source_object),
            ("source_field", &self.source_field),
            ("target_object", &self.target_object),
            ("target_field", &self.target_field),
        ];
        for (name, value) in parts {
            if value.trim().is_empty() {
                return Err(ReconError::InvalidInput(format!(
                    "field mapping is missing {name}"
                )));
            }
        }
        Ok(())
    }

    /// Move to `validated`. Only allowed when the validator left nothing outstanding.
    pub fn mark_validated(&mut self, gate: &impl ValidationGate) -> Result<()> {
        self.check_transition(MappingStatus::Validated)?;
        let warnings = gate.outstanding();
        if warnings > 0 {
            return Err(ReconError::ValidationFailed { warnings });
        }
        self.status = MappingStatus::Validated;
        Ok(())
    }

    /// Move to `approved`. Only allowed from `validated`.
    pub fn approve(&mut self) -> Result<()> {
        self.check_transition(MappingStatus::Approved)?;
        self.status = MappingStatus::Approved;
        Ok(())
    }

    /// Move to `rejected` from any non-terminal state.
    pub fn reject(&mut self) -> Result<()> {
        self.check_transition(MappingStatus::Rejected)?;
        self.status = MappingStatus::Rejected;
        Ok(())
    }

    /// True unless the mapping was rejected.
    pub fn is_active(&self) -> bool {
        self.status != MappingStatus::Rejected
    }

    fn check_transition(&self, next: MappingStatus) -> Result<()> {
        if self.status.can_transition_to(next) {
            Ok(())
        } else {
            Err(ReconError::InvalidTransition {
                entity: "mapping",
                from: self.status.to_string(),
                to: next.to_string(),
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Outstanding(usize);

    impl ValidationGate for Outstanding {
        fn outstanding(&self) -> usize {
            self.0
        }
    }

    fn mapping() -> FieldMapping {
        FieldMapping::new("Product2", "ProductCode", "Product2", "ItemCode")
    }

    #[test]
    fn pending_cannot_jump_to_approved() {
        let mut m = mapping();
        let err = m.approve().unwrap_err();
        assert!(matches!(err, ReconError::InvalidTransition { .. }));
        assert_eq!(m.status, MappingStatus::Pending);
    }

    #[test]
    fn validated_then_approved() {
        let mut m = mapping();
        m.mark_validated(&Outstanding(0)).unwrap();
        m.approve().unwrap();
        assert_eq!(m.status, MappingStatus::Approved);
        assert!(m.reject().is_err());
    }

    #[test]
    fn warnings_block_validation() {
        let mut m = mapping();
        let err = m.mark_validated(&Outstanding(2)).unwrap_err();
        assert!(matches!(err, ReconError::ValidationFailed { warnings: 2 }));
        assert_eq!(m.status, MappingStatus::Pending);
    }

    #[test]
    fn reject_from_non_terminal_only() {
        let mut m = mapping();
        m.reject().unwrap();
        assert!(m.mark_validated(&Outstanding(0)).is_err());
        assert!(!m.is_active());
    }
}
