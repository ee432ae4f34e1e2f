//! Loading schema exports, mappings, suggestions and ledgers from disk.
//!
//! Schemas and mappings are accepted as JSON or CSV, chosen by extension.
//! In CSV, list-valued columns (`picklist_values`, `references_to`) are
//! `;`-separated.

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use anyhow::{Context, Result, bail};
use recon_core::ConflictLedger;
use recon_model::{AiSuggestion, FieldDescriptor, FieldMapping, ObjectSchema, SchemaSnapshot};
use serde::Deserialize;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Csv,
}

fn format_of(path: &Path) -> Result<Format> {
    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_lowercase);
    match extension.as_deref() {
        Some("json") => Ok(Format::Json),
        Some("csv") => Ok(Format::Csv),
        _ => bail!(
            "unsupported file type for {} (expected .json or .csv)",
            path.display()
        ),
    }
}

/// One CSV row per field.
#[derive(Debug, Deserialize)]
struct FieldRow {
    object: String,
    name: String,
    #[serde(rename = "type")]
    field_type: String,
    #[serde(default)]
    label: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    length: Option<u32>,
    #[serde(default)]
    required: Option<String>,
    #[serde(default)]
    unique: Option<String>,
    #[serde(default)]
    picklist_values: Option<String>,
    #[serde(default)]
    references_to: Option<String>,
    #[serde(default)]
    default_value: Option<String>,
}

impl FieldRow {
    fn into_descriptor(self, line: u64) -> Result<(String, FieldDescriptor)> {
        let required = match self.required.as_deref() {
            Some(raw) => parse_flag(raw).with_context(|| format!("line {line}: required"))?,
            None => false,
        };
        let unique = match self.unique.as_deref() {
            Some(raw) => Some(parse_flag(raw).with_context(|| format!("line {line}: unique"))?),
            None => None,
        };
        let descriptor = FieldDescriptor {
            name: self.name.trim().to_string(),
            field_type: self.field_type.trim().to_string(),
            label: non_blank(self.label),
            description: non_blank(self.description),
            length: self.length,
            required,
            unique,
            picklist_values: split_list(self.picklist_values.as_deref()),
            references_to: split_list(self.references_to.as_deref()),
            default_value: non_blank(self.default_value),
        };
        Ok((self.object.trim().to_string(), descriptor))
    }
}

/// Load and validate a schema export.
pub fn load_schema(path: &Path) -> Result<SchemaSnapshot> {
    let snapshot = match format_of(path)? {
        Format::Json => read_json::<SchemaSnapshot>(path)?,
        Format::Csv => schema_from_csv(path)?,
    };
    snapshot
        .validate()
        .with_context(|| format!("invalid schema in {}", path.display()))?;
    debug!(
        path = %path.display(),
        objects = snapshot.objects.len(),
        fields = snapshot.objects.iter().map(|o| o.fields.len()).sum::<usize>(),
        "loaded schema"
    );
    Ok(snapshot)
}

fn schema_from_csv(path: &Path) -> Result<SchemaSnapshot> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("open {}", path.display()))?;
    let mut snapshot = SchemaSnapshot::default();
    for (idx, row) in reader.deserialize::<FieldRow>().enumerate() {
        let line = idx as u64 + 2;
        let row = row.with_context(|| format!("{}: line {line}", path.display()))?;
        let (object, descriptor) = row.into_descriptor(line)?;
        // Objects keep first-appearance order.
        match snapshot
            .objects
            .iter_mut()
            .find(|o| o.name.eq_ignore_ascii_case(&object))
        {
            Some(existing) => existing.fields.push(descriptor),
            None => snapshot
                .objects
                .push(ObjectSchema::new(object, vec![descriptor])),
        }
    }
    Ok(snapshot)
}

/// Load caller-owned field mappings.
pub fn load_mappings(path: &Path) -> Result<Vec<FieldMapping>> {
    let mappings: Vec<FieldMapping> = match format_of(path)? {
        Format::Json => read_json(path)?,
        Format::Csv => {
            let mut reader = csv::ReaderBuilder::new()
                .has_headers(true)
                .trim(csv::Trim::All)
                .from_path(path)
                .with_context(|| format!("open {}", path.display()))?;
            reader
                .deserialize::<FieldMapping>()
                .collect::<Result<Vec<_>, _>>()
                .with_context(|| format!("parse {}", path.display()))?
        }
    };
    for (idx, mapping) in mappings.iter().enumerate() {
        mapping
            .validate()
            .with_context(|| format!("mapping #{} in {}", idx + 1, path.display()))?;
    }
    Ok(mappings)
}

/// Load suggestions from a JSON array.
pub fn load_suggestions(path: &Path) -> Result<Vec<AiSuggestion>> {
    read_json(path)
}

/// Load a ledger, or start an empty one when the file does not exist yet.
pub fn load_ledger(path: &Path) -> Result<ConflictLedger> {
    if !path.exists() {
        debug!(path = %path.display(), "starting new ledger");
        return Ok(ConflictLedger::new());
    }
    read_json(path)
}

pub fn save_ledger(path: &Path, ledger: &ConflictLedger) -> Result<()> {
    let json = serde_json::to_string_pretty(ledger).context("serialize ledger")?;
    fs::write(path, json).with_context(|| format!("write {}", path.display()))
}

/// Split an `OBJECT.FIELD` reference.
pub fn parse_field_ref(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('.') {
        Some((object, field)) if !object.trim().is_empty() && !field.trim().is_empty() => {
            Ok((object.trim(), field.trim()))
        }
        _ => bail!("expected OBJECT.FIELD, got '{raw}'"),
    }
}

/// Split a `SOURCE=TARGET` object pair.
pub fn parse_object_pair(raw: &str) -> Result<(&str, &str)> {
    match raw.split_once('=') {
        Some((source, target)) if !source.trim().is_empty() && !target.trim().is_empty() => {
            Ok((source.trim(), target.trim()))
        }
        _ => bail!("expected SOURCE_OBJECT=TARGET_OBJECT, got '{raw}'"),
    }
}

fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let text = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse {}", path.display()))
}

fn parse_flag(raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "" | "false" | "no" | "n" | "0" => Ok(false),
        "true" | "yes" | "y" | "1" => Ok(true),
        other => bail!("expected a boolean, got '{other}'"),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn split_list(raw: Option<&str>) -> Option<BTreeSet<String>> {
    let values: BTreeSet<String> = raw?
        .split(';')
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    (!values.is_empty()).then_some(values)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_accept_common_spellings() {
        assert!(parse_flag("Yes").unwrap());
        assert!(!parse_flag("").unwrap());
        assert!(parse_flag("maybe").is_err());
    }

    #[test]
    fn list_columns_split_on_semicolon() {
        let values = split_list(Some("Draft; Approved;;")).unwrap();
        assert_eq!(values.len(), 2);
        assert!(split_list(Some(" ; ")).is_none());
    }

    #[test]
    fn field_refs_need_both_parts() {
        assert_eq!(parse_field_ref("Product2.ProductCode").unwrap(), ("Product2", "ProductCode"));
        assert!(parse_field_ref("Product2").is_err());
        assert!(parse_field_ref(".Code").is_err());
    }
}
