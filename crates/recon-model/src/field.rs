//! Field and object descriptors supplied by schema introspection.
//!
//! A [`FieldDescriptor`] is an immutable snapshot of one field on one schema
//! version. The engine reads descriptors but never mutates them; optional
//! metadata is modelled with `Option` so that "no label" and "no picklist"
//! are typed states rather than empty strings.

use std::collections::{BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{ReconError, Result};

/// Metadata for a single field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldDescriptor {
    /// API name of the field (e.g., "ProductCode", "SBQQ__Status__c").
    pub name: String,
    /// Platform data type (e.g., "string", "picklist", "reference").
    #[serde(rename = "type")]
    pub field_type: String,
    /// Human-readable label.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    /// Free-text description or help text.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Maximum length for text fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub length: Option<u32>,
    /// Whether a value is mandatory.
    #[serde(default)]
    pub required: bool,
    /// Whether values must be unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unique: Option<bool>,
    /// Allowed values for picklist fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picklist_values: Option<BTreeSet<String>>,
    /// Objects referenced by lookup or master-detail fields.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub references_to: Option<BTreeSet<String>>,
    /// Value used when the field is empty.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<String>, field_type: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            field_type: field_type.into(),
            label: None,
            description: None,
            length: None,
            required: false,
            unique: None,
            picklist_values: None,
            references_to: None,
            default_value: None,
        }
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_length(mut self, length: u32) -> Self {
        self.length = Some(length);
        self
    }

    pub fn required(mut self, required: bool) -> Self {
        self.required = required;
        self
    }

    pub fn with_picklist<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.picklist_values = Some(values.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_references<I, S>(mut self, objects: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.references_to = Some(objects.into_iter().map(Into::into).collect());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    /// Reject descriptors with a blank name or type.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ReconError::invalid_input("field descriptor has an empty name"));
        }
        if self.field_type.trim().is_empty() {
            return Err(ReconError::invalid_input(format!(
                "field '{}' has an empty type",
                self.name
            )));
        }
        Ok(())
    }

    /// Label used for comparison. Fields without a label are labelled by name.
    pub fn effective_label(&self) -> &str {
        match self.label.as_deref() {
            Some(label) if !label.trim().is_empty() => label,
            _ => &self.name,
        }
    }

    /// Picklist values, treating an empty set as absent.
    pub fn picklist(&self) -> Option<&BTreeSet<String>> {
        self.picklist_values.as_ref().filter(|set| !set.is_empty())
    }

    /// Referenced objects, treating an empty set as absent.
    pub fn references(&self) -> Option<&BTreeSet<String>> {
        self.references_to.as_ref().filter(|set| !set.is_empty())
    }

    /// True if the field may hold no value at migration time.
    pub fn may_be_empty(&self) -> bool {
        !self.required && self.default_value.is_none()
    }
}

/// One object (table) of a schema version with its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ObjectSchema {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default)]
    pub fields: Vec<FieldDescriptor>,
}

impl ObjectSchema {
    pub fn new(name: impl Into<String>, fields: Vec<FieldDescriptor>) -> Self {
        Self {
            name: name.into(),
            label: None,
            fields,
        }
    }

    /// Case-insensitive field lookup.
    pub fn field(&self, name: &str) -> Option<&FieldDescriptor> {
        self.fields
            .iter()
            .find(|f| f.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn required_fields(&self) -> impl Iterator<Item = &FieldDescriptor> {
        self.fields.iter().filter(|f| f.required)
    }

    /// Validate every field and reject duplicate field names.
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(ReconError::invalid_input("object schema has an empty name"));
        }
        let mut seen = HashSet::new();
        for field in &self.fields {
            field.validate()?;
            if !seen.insert(field.name.to_lowercase()) {
                return Err(ReconError::invalid_input(format!(
                    "duplicate field '{}' on object '{}'",
                    field.name, self.name
                )));
            }
        }
        Ok(())
    }
}

/// A full schema version: the set of objects from one org or system.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaSnapshot {
    #[serde(default)]
    pub objects: Vec<ObjectSchema>,
}

impl SchemaSnapshot {
    pub fn object(&self, name: &str) -> Option<&ObjectSchema> {
        self.objects
            .iter()
            .find(|o| o.name.eq_ignore_ascii_case(name.trim()))
    }

    pub fn validate(&self) -> Result<()> {
        self.objects.iter().try_for_each(ObjectSchema::validate)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_name_or_type_is_invalid() {
        assert!(FieldDescriptor::new("", "string").validate().is_err());
        assert!(FieldDescriptor::new("Name", "  ").validate().is_err());
        assert!(FieldDescriptor::new("Name", "string").validate().is_ok());
    }

    #[test]
    fn effective_label_falls_back_to_name() {
        let field = FieldDescriptor::new("ProductCode", "string");
        assert_eq!(field.effective_label(), "ProductCode");
        let labelled = field.with_label("Product Code");
        assert_eq!(labelled.effective_label(), "Product Code");
    }

    #[test]
    fn empty_picklist_counts_as_absent() {
        let field = FieldDescriptor::new("Status", "picklist").with_picklist(Vec::<String>::new());
        assert!(field.picklist().is_none());
    }

    #[test]
    fn duplicate_fields_rejected() {
        let object = ObjectSchema::new(
            "Product2",
            vec![
                FieldDescriptor::new("Name", "string"),
                FieldDescriptor::new("NAME", "string"),
            ],
        );
        assert!(object.validate().is_err());
    }

    #[test]
    fn descriptor_deserializes_with_type_key() {
        let json = r#"{"name":"Status","type":"picklist","picklist_values":["A","B"]}"#;
        let field: FieldDescriptor = serde_json::from_str(json).unwrap();
        assert_eq!(field.picklist().map(BTreeSet::len), Some(2));
        assert!(!field.required);
    }
}
