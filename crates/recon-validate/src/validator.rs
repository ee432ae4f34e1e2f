//! Binary compatibility gate for source/target field pairs.
//!
//! Unlike the scorer this does not rank anything. It reports type-group
//! mismatches and unmet required targets, and lets unknown types through.

use recon_model::{FieldDescriptor, FieldMapping, ObjectSchema, Result};
use recon_rules::ReconcileRules;
use tracing::debug;

use crate::report::{ValidationReport, ValidationWarning};

#[derive(Debug, Clone, Copy)]
pub struct MappingValidator<'a> {
    rules: &'a ReconcileRules,
}

impl<'a> MappingValidator<'a> {
    pub fn new(rules: &'a ReconcileRules) -> Self {
        Self { rules }
    }

    /// Check a descriptor pair. An empty list means compatible.
    pub fn validate(
        &self,
        source: &FieldDescriptor,
        target: &FieldDescriptor,
    ) -> Result<Vec<ValidationWarning>> {
        source.validate()?;
        target.validate()?;
        let mut warnings = Vec::new();
        if let Some(warning) = self.type_mismatch(source, target) {
            warnings.push(warning);
        }
        if target.required && source.may_be_empty() {
            warnings.push(ValidationWarning::RequiredFieldUnmapped {
                target_field: target.name.clone(),
                source_field: Some(source.name.clone()),
            });
        }
        Ok(warnings)
    }

    /// Commit-time check of a concrete mapping.
    ///
    /// Non-direct mappings carry their own conversion, so type mismatches are
    /// waived for them. A mapping-level default value satisfies a required
    /// target.
    pub fn validate_mapping(
        &self,
        mapping: &FieldMapping,
        source: &FieldDescriptor,
        target: &FieldDescriptor,
    ) -> Result<ValidationReport> {
        mapping.validate()?;
        let direct = mapping.mapping_type.is_direct();
        let has_default = mapping
            .default_value
            .as_deref()
            .is_some_and(|v| !v.trim().is_empty());

        let mut warnings: Vec<ValidationWarning> = self
            .validate(source, target)?
            .into_iter()
            .filter(|warning| match warning {
                ValidationWarning::TypeMismatch { .. } => direct,
                ValidationWarning::RequiredFieldUnmapped { .. } => !has_default,
                ValidationWarning::LengthTruncation { .. } => true,
            })
            .collect();

        if direct
            && let (Some(source_length), Some(target_length)) = (source.length, target.length)
            && source_length > target_length
        {
            warnings.push(ValidationWarning::LengthTruncation {
                source_field: source.name.clone(),
                source_length,
                target_field: target.name.clone(),
                target_length,
            });
        }

        debug!(
            source = %format!("{}.{}", mapping.source_object, mapping.source_field),
            target = %format!("{}.{}", mapping.target_object, mapping.target_field),
            mapping_type = mapping.mapping_type.as_str(),
            warnings = warnings.len(),
            "validated mapping"
        );
        Ok(ValidationReport::new(warnings))
    }

    /// Required fields of `target` that no active mapping points at.
    pub fn required_coverage(
        &self,
        target: &ObjectSchema,
        mappings: &[FieldMapping],
    ) -> Vec<ValidationWarning> {
        target
            .required_fields()
            .filter(|field| {
                !mappings.iter().any(|m| {
                    m.is_active()
                        && m.target_object.eq_ignore_ascii_case(&target.name)
                        && m.target_field.eq_ignore_ascii_case(&field.name)
                })
            })
            .map(|field| ValidationWarning::RequiredFieldUnmapped {
                target_field: field.name.clone(),
                source_field: None,
            })
            .collect()
    }

    fn type_mismatch(
        &self,
        source: &FieldDescriptor,
        target: &FieldDescriptor,
    ) -> Option<ValidationWarning> {
        let source_type = source.field_type.trim().to_lowercase();
        let target_type = target.field_type.trim().to_lowercase();
        let groups = &self.rules.validator;
        let source_group = groups.group_of(&source_type)?;
        let target_group = groups.group_of(&target_type)?;
        (source_group != target_group).then(|| ValidationWarning::TypeMismatch {
            source_field: source.name.clone(),
            source_type: source.field_type.clone(),
            target_field: target.name.clone(),
            target_type: target.field_type.clone(),
        })
    }
}
