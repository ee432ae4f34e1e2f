//! Conflict detection over a set of caller-owned mappings.

use std::collections::{BTreeMap, BTreeSet};

use recon_model::{
    ConflictSeverity, ConflictType, FieldMapping, FieldRef, NewConflict, ObjectSchema, Result,
    SchemaSnapshot,
};
use recon_rules::ReconcileRules;
use recon_validate::{MappingValidator, ValidationWarning};
use tracing::{debug, warn};

/// Everything detection looks at.
#[derive(Debug, Clone, Copy)]
pub struct ConflictScope<'a> {
    pub rules: &'a ReconcileRules,
    pub source: &'a SchemaSnapshot,
    pub target: &'a SchemaSnapshot,
    pub mappings: &'a [FieldMapping],
}

impl<'a> ConflictScope<'a> {
    pub fn new(
        rules: &'a ReconcileRules,
        source: &'a SchemaSnapshot,
        target: &'a SchemaSnapshot,
        mappings: &'a [FieldMapping],
    ) -> Self {
        Self {
            rules,
            source,
            target,
            mappings,
        }
    }
}

/// Produce conflict requests for every problem in `scope`.
///
/// Rejected mappings are ignored. Output order is deterministic: per-mapping
/// problems in mapping order, then duplicate targets, then uncovered required
/// targets.
pub fn detect_conflicts(scope: &ConflictScope<'_>) -> Result<Vec<NewConflict>> {
    let validator = MappingValidator::new(scope.rules);
    let active: Vec<&FieldMapping> = scope.mappings.iter().filter(|m| m.is_active()).collect();
    active.iter().try_for_each(|m| m.validate())?;

    let mut conflicts = Vec::new();
    let mut missing_objects = BTreeSet::new();
    let mut covered_objects: BTreeMap<String, &ObjectSchema> = BTreeMap::new();

    for mapping in &active {
        let Some(target_object) = scope.target.object(&mapping.target_object) else {
            if missing_objects.insert(mapping.target_object.to_lowercase()) {
                conflicts.push(NewConflict::new(
                    ConflictType::CreateNewObject,
                    ConflictSeverity::Blocker,
                    format!("Target object '{}' does not exist", mapping.target_object),
                )
                .with_target(FieldRef::object(&mapping.target_object)));
            }
            continue;
        };
        covered_objects
            .entry(target_object.name.to_lowercase())
            .or_insert(target_object);

        let source = scope
            .source
            .object(&mapping.source_object)
            .and_then(|o| o.field(&mapping.source_field));
        let source_ref = {
            let base = FieldRef::field(&mapping.source_object, &mapping.source_field);
            match source {
                Some(field) => base.with_type(&field.field_type),
                None => base,
            }
        };

        let Some(target) = target_object.field(&mapping.target_field) else {
            conflicts.push(
                NewConflict::new(
                    ConflictType::CreateNewField,
                    ConflictSeverity::Warning,
                    format!(
                        "Target field '{}.{}' does not exist",
                        target_object.name, mapping.target_field
                    ),
                )
                .with_source(source_ref)
                .with_target(FieldRef::field(&target_object.name, &mapping.target_field)),
            );
            continue;
        };

        let Some(source) = source else {
            warn!(
                source = %format!("{}.{}", mapping.source_object, mapping.source_field),
                "mapping source not found in source schema; skipping validation"
            );
            continue;
        };

        let target_ref =
            FieldRef::field(&target_object.name, &target.name).with_type(&target.field_type);
        let report = validator.validate_mapping(mapping, source, target)?;
        for warning in &report.warnings {
            let (conflict_type, severity) = match warning {
                ValidationWarning::TypeMismatch { .. } => {
                    (ConflictType::DataTypeMismatch, ConflictSeverity::Error)
                }
                ValidationWarning::RequiredFieldUnmapped { .. } => {
                    (ConflictType::RequiredFieldMissing, ConflictSeverity::Warning)
                }
                // Truncation stays a report-level warning.
                ValidationWarning::LengthTruncation { .. } => continue,
            };
            conflicts.push(
                NewConflict::new(conflict_type, severity, warning.to_string())
                    .with_source(source_ref.clone())
                    .with_target(target_ref.clone()),
            );
        }
    }

    conflicts.extend(duplicate_targets(&active, scope.target));

    for object in covered_objects.values() {
        for warning in validator.required_coverage(object, scope.mappings) {
            conflicts.push(
                NewConflict::new(
                    ConflictType::RequiredFieldMissing,
                    ConflictSeverity::Blocker,
                    format!(
                        "Required field '{}.{}' has no mapping",
                        object.name,
                        warning.target_field()
                    ),
                )
                .with_target(FieldRef::field(&object.name, warning.target_field())),
            );
        }
    }

    debug!(
        mappings = scope.mappings.len(),
        active = active.len(),
        conflicts = conflicts.len(),
        "detected conflicts"
    );
    Ok(conflicts)
}

fn duplicate_targets(active: &[&FieldMapping], target: &SchemaSnapshot) -> Vec<NewConflict> {
    let mut by_target: BTreeMap<(String, String), Vec<&FieldMapping>> = BTreeMap::new();
    for mapping in active {
        by_target
            .entry((
                mapping.target_object.to_lowercase(),
                mapping.target_field.to_lowercase(),
            ))
            .or_default()
            .push(*mapping);
    }

    by_target
        .into_values()
        .filter(|group| group.len() > 1)
        .map(|group| {
            let first = group[0];
            // Prefer the schema's spelling when the field exists.
            let (object, field) = target
                .object(&first.target_object)
                .and_then(|o| {
                    o.field(&first.target_field)
                        .map(|f| (o.name.clone(), f.name.clone()))
                })
                .unwrap_or_else(|| (first.target_object.clone(), first.target_field.clone()));
            let sources: Vec<String> = group
                .iter()
                .map(|m| format!("{}.{}", m.source_object, m.source_field))
                .collect();
            NewConflict::new(
                ConflictType::DuplicateMapping,
                ConflictSeverity::Error,
                format!(
                    "{} mappings target '{object}.{field}': {}",
                    group.len(),
                    sources.join(", ")
                ),
            )
            .with_target(FieldRef::field(object, field))
        })
        .collect()
}
