//! Mapping conflicts and their resolution vocabulary.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};
use crate::ids::{ConflictId, ConflictKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictType {
    CreateNewField,
    CreateNewObject,
    DataTypeMismatch,
    RequiredFieldMissing,
    DuplicateMapping,
}

impl ConflictType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateNewField => "create_new_field",
            Self::CreateNewObject => "create_new_object",
            Self::DataTypeMismatch => "data_type_mismatch",
            Self::RequiredFieldMissing => "required_field_missing",
            Self::DuplicateMapping => "duplicate_mapping",
        }
    }
}

impl fmt::Display for ConflictType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictType {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "create_new_field" => Ok(Self::CreateNewField),
            "create_new_object" => Ok(Self::CreateNewObject),
            "data_type_mismatch" => Ok(Self::DataTypeMismatch),
            "required_field_missing" => Ok(Self::RequiredFieldMissing),
            "duplicate_mapping" => Ok(Self::DuplicateMapping),
            _ => Err(ReconError::InvalidInput(format!("unknown conflict type: {s}"))),
        }
    }
}

/// Triage severity.
///
/// The derived ordering is total and strict: `Blocker > Error > Warning > Info`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConflictSeverity {
    Info,
    Warning,
    Error,
    Blocker,
}

impl ConflictSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Blocker => "blocker",
            Self::Error => "error",
            Self::Warning => "warning",
            Self::Info => "info",
        }
    }

    /// 1 for blockers down to 4 for info, matching triage display order.
    pub fn rank(&self) -> u8 {
        match self {
            Self::Blocker => 1,
            Self::Error => 2,
            Self::Warning => 3,
            Self::Info => 4,
        }
    }
}

impl fmt::Display for ConflictSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConflictSeverity {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "blocker" => Ok(Self::Blocker),
            "error" => Ok(Self::Error),
            "warning" => Ok(Self::Warning),
            "info" => Ok(Self::Info),
            _ => Err(ReconError::InvalidInput(format!(
                "unknown conflict severity: {s}"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionStatus {
    #[default]
    Unresolved,
    UserResolved,
    AutoResolved,
    Ignored,
}

impl ResolutionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
            Self::UserResolved => "user_resolved",
            Self::AutoResolved => "auto_resolved",
            Self::Ignored => "ignored",
        }
    }

    /// Every state other than `unresolved` is terminal.
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Unresolved)
    }
}

impl fmt::Display for ResolutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionAction {
    CreateCustomField,
    MapToExisting,
    SkipField,
    TransformData,
}

impl ResolutionAction {
    pub const ALL: [ResolutionAction; 4] = [
        Self::CreateCustomField,
        Self::MapToExisting,
        Self::SkipField,
        Self::TransformData,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CreateCustomField => "create_custom_field",
            Self::MapToExisting => "map_to_existing",
            Self::SkipField => "skip_field",
            Self::TransformData => "transform_data",
        }
    }
}

impl fmt::Display for ResolutionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ResolutionAction {
    type Err = ReconError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|action| action.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ReconError::InvalidResolutionAction(s.to_string()))
    }
}

/// Reference to one side of a conflict.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FieldRef {
    pub object: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_type: Option<String>,
}

impl FieldRef {
    pub fn object(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            field: None,
            data_type: None,
        }
    }

    pub fn field(object: impl Into<String>, field: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            field: Some(field.into()),
            data_type: None,
        }
    }

    pub fn with_type(mut self, data_type: impl Into<String>) -> Self {
        self.data_type = Some(data_type.into());
        self
    }
}

impl fmt::Display for FieldRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.field {
            Some(field) => write!(f, "{}.{}", self.object, field),
            None => f.write_str(&self.object),
        }
    }
}

/// Request to open a conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewConflict {
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FieldRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<FieldRef>,
    pub description: String,
}

impl NewConflict {
    pub fn new(
        conflict_type: ConflictType,
        severity: ConflictSeverity,
        description: impl Into<String>,
    ) -> Self {
        Self {
            conflict_type,
            severity,
            source: None,
            target: None,
            description: description.into(),
        }
    }

    pub fn with_source(mut self, source: FieldRef) -> Self {
        self.source = Some(source);
        self
    }

    pub fn with_target(mut self, target: FieldRef) -> Self {
        self.target = Some(target);
        self
    }

    /// Fingerprint over type and field references. Description and severity
    /// are not part of the key.
    pub fn key(&self) -> ConflictKey {
        let source_object = self.source.as_ref().map_or("", |r| r.object.as_str());
        let source_field = self
            .source
            .as_ref()
            .and_then(|r| r.field.as_deref())
            .unwrap_or("");
        let target_object = self.target.as_ref().map_or("", |r| r.object.as_str());
        let target_field = self
            .target
            .as_ref()
            .and_then(|r| r.field.as_deref())
            .unwrap_or("");
        ConflictKey::from_parts([
            self.conflict_type.as_str(),
            source_object,
            source_field,
            target_object,
            target_field,
        ])
    }
}

/// A structured mapping problem awaiting explicit resolution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappingConflict {
    pub id: ConflictId,
    pub key: ConflictKey,
    pub conflict_type: ConflictType,
    pub severity: ConflictSeverity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<FieldRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<FieldRef>,
    pub description: String,
    #[serde(default)]
    pub resolution_status: ResolutionStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_action: Option<ResolutionAction>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolution_details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resolved_at: Option<DateTime<Utc>>,
}

impl MappingConflict {
    /// Build an unresolved conflict from a request.
    pub fn open(id: ConflictId, request: NewConflict) -> Self {
        Self {
            id,
            key: request.key(),
            conflict_type: request.conflict_type,
            severity: request.severity,
            source: request.source,
            target: request.target,
            description: request.description,
            resolution_status: ResolutionStatus::Unresolved,
            resolution_action: None,
            resolution_details: None,
            user_notes: None,
            resolved_by: None,
            resolved_at: None,
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.resolution_status == ResolutionStatus::Unresolved
    }

    /// Triage order: most severe first, then oldest (lowest id) first.
    pub fn triage_cmp(&self, other: &Self) -> Ordering {
        other
            .severity
            .cmp(&self.severity)
            .then_with(|| self.id.cmp(&other.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn severity_order_is_strict() {
        let ordered = [
            ConflictSeverity::Info,
            ConflictSeverity::Warning,
            ConflictSeverity::Error,
            ConflictSeverity::Blocker,
        ];
        for pair in ordered.windows(2) {
            assert!(pair[0] < pair[1]);
            assert!(pair[0].rank() > pair[1].rank());
        }
    }

    #[test]
    fn unknown_action_is_rejected() {
        let err = "delete_everything".parse::<ResolutionAction>().unwrap_err();
        assert!(matches!(err, ReconError::InvalidResolutionAction(ref v) if v == "delete_everything"));
        assert_eq!(
            "MAP_TO_EXISTING".parse::<ResolutionAction>().unwrap(),
            ResolutionAction::MapToExisting
        );
    }

    #[test]
    fn key_ignores_description_and_severity() {
        let a = NewConflict::new(
            ConflictType::DuplicateMapping,
            ConflictSeverity::Error,
            "first",
        )
        .with_target(FieldRef::field("Product2", "ProductCode"));
        let mut b = a.clone();
        b.description = "second".to_string();
        b.severity = ConflictSeverity::Info;
        assert_eq!(a.key(), b.key());
    }

    #[test]
    fn conflict_serializes_snake_case() {
        let conflict = MappingConflict::open(
            ConflictId::new(1),
            NewConflict::new(
                ConflictType::CreateNewField,
                ConflictSeverity::Warning,
                "missing",
            ),
        );
        let json = serde_json::to_value(&conflict).unwrap();
        assert_eq!(json["conflict_type"], "create_new_field");
        assert_eq!(json["resolution_status"], "unresolved");
        assert_eq!(json["severity"], "warning");
    }
}
