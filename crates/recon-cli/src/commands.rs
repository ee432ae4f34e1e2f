use std::collections::BTreeSet;
use std::path::Path;

use anyhow::{Context, Result, anyhow, bail};
use serde::Serialize;
use tracing::{debug, info, info_span};

use recon_cli::ingest::{
    load_ledger, load_mappings, load_schema, load_suggestions, parse_field_ref,
    parse_object_pair, save_ledger,
};
use recon_cli::render::{
    candidate_table, ledger_summary, score_details, triage_table, validation_table,
};
use recon_core::{
    ConflictLedger, ConflictScope, ObjectCandidates, PolicyContext, SingleHighConfidence,
    apply_policy, detect_conflicts,
};
use recon_map::{CandidateGenerator, ConfidenceScorer, GeneratorOptions};
use recon_model::{
    ConflictId, ConflictSeverity, FieldMapping, MappingConflict, ObjectSchema, ScoreContext,
    SchemaSnapshot,
};
use recon_rules::ReconcileRules;
use recon_validate::{MappingValidator, ValidationReport};

use crate::cli::{CandidatesArgs, IgnoreArgs, ResolveArgs, ScoreArgs, ValidateArgs};

pub fn load_rules(path: Option<&Path>) -> Result<ReconcileRules> {
    match path {
        Some(path) => ReconcileRules::from_toml_path(path).context("load rules"),
        None => Ok(ReconcileRules::default()),
    }
}

pub fn run_rules(rules: &ReconcileRules) -> Result<()> {
    print!("{}", rules.to_toml_string().context("serialize rules")?);
    Ok(())
}

pub fn run_score(args: &ScoreArgs, rules: &ReconcileRules) -> Result<()> {
    let source = load_schema(&args.schemas.source).context("load source schema")?;
    let target = load_schema(&args.schemas.target).context("load target schema")?;
    let (source_object, source_field) = parse_field_ref(&args.from)?;
    let (target_object, target_field) = parse_field_ref(&args.to)?;
    let source_field = source
        .object(source_object)
        .and_then(|o| o.field(source_field))
        .ok_or_else(|| anyhow!("source field {} not found", args.from))?;
    let target_field = target
        .object(target_object)
        .and_then(|o| o.field(target_field))
        .ok_or_else(|| anyhow!("target field {} not found", args.to))?;

    let context = ScoreContext {
        ai_suggested: args.ai_suggested,
        user_validated: args.user_validated,
    };
    let candidate = ConfidenceScorer::new(rules).score(source_field, target_field, context)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&candidate)?);
    } else {
        println!("{}", score_details(&candidate));
    }
    Ok(())
}

pub fn run_candidates(args: &CandidatesArgs, rules: &ReconcileRules) -> Result<()> {
    let source = load_schema(&args.schemas.source).context("load source schema")?;
    let target = load_schema(&args.schemas.target).context("load target schema")?;
    let suggestions = match &args.ai {
        Some(path) => load_suggestions(path).context("load suggestions")?,
        None => Vec::new(),
    };
    let pairs = object_pairs(&source, &target, &args.objects)?;
    if pairs.is_empty() {
        bail!("no object pairs to compare; name them with --object SOURCE=TARGET");
    }

    let generator = CandidateGenerator::new(rules);
    let options = GeneratorOptions {
        threshold: args.threshold,
        prefilter_type_family: args.prefilter,
    };
    let mut results = Vec::with_capacity(pairs.len());
    for (source_object, target_object) in pairs {
        let candidates = generator.generate_for_objects(source_object, target_object, &options)?;
        // Suggestions carry no object names; keep the ones that fit this pair.
        let relevant: Vec<_> = suggestions
            .iter()
            .filter(|s| {
                source_object.field(&s.source_field).is_some()
                    && target_object.field(&s.target_field).is_some()
            })
            .cloned()
            .collect();
        let candidates = if relevant.is_empty() {
            candidates
        } else {
            generator.merge_ai_suggestions(
                candidates,
                &relevant,
                &source_object.fields,
                &target_object.fields,
            )?
        };
        results.push(ObjectCandidates::new(
            &source_object.name,
            &target_object.name,
            candidates,
        ));
    }

    if args.json {
        println!("{}", serde_json::to_string_pretty(&results)?);
        return Ok(());
    }
    for result in &results {
        println!(
            "{} → {}: {} candidate(s)",
            result.source_object,
            result.target_object,
            result.candidates.len()
        );
        if !result.candidates.is_empty() {
            println!("{}", candidate_table(&result.candidates));
        }
    }
    Ok(())
}

/// Outcome of a validation run; the process exits non-zero on open blockers.
#[derive(Debug)]
pub struct ValidateOutcome {
    pub open_blockers: usize,
}

#[derive(Debug, Serialize)]
struct MappingResult<'a> {
    mapping: &'a FieldMapping,
    report: &'a ValidationReport,
}

#[derive(Debug, Serialize)]
struct ValidateJson<'a> {
    mappings: Vec<MappingResult<'a>>,
    conflicts: Vec<&'a MappingConflict>,
}

pub fn run_validate(args: &ValidateArgs, rules: &ReconcileRules) -> Result<ValidateOutcome> {
    let span = info_span!("validate", mappings = %args.mappings.display());
    let _guard = span.enter();

    let source = load_schema(&args.schemas.source).context("load source schema")?;
    let target = load_schema(&args.schemas.target).context("load target schema")?;
    let mappings = load_mappings(&args.mappings).context("load mappings")?;
    let mut ledger = match &args.ledger {
        Some(path) => load_ledger(path).context("load ledger")?,
        None => ConflictLedger::new(),
    };

    let validator = MappingValidator::new(rules);
    let mut reports = Vec::new();
    for mapping in &mappings {
        let source_field = source
            .object(&mapping.source_object)
            .and_then(|o| o.field(&mapping.source_field));
        let target_field = target
            .object(&mapping.target_object)
            .and_then(|o| o.field(&mapping.target_field));
        // Unresolvable fields surface as conflicts instead.
        if let (Some(source_field), Some(target_field)) = (source_field, target_field) {
            let report = validator.validate_mapping(mapping, source_field, target_field)?;
            reports.push((mapping, report));
        }
    }

    let detected = detect_conflicts(&ConflictScope::new(rules, &source, &target, &mappings))?;
    let before = ledger.len();
    for request in detected {
        ledger.open_conflict(request)?;
    }
    debug!(opened = ledger.len() - before, "recorded conflicts");

    if args.auto_resolve {
        let candidates = high_confidence_candidates(rules, &source, &target, &mappings)?;
        let context = PolicyContext {
            mappings: &mappings,
            candidates: &candidates,
        };
        let resolved = apply_policy(&mut ledger, &SingleHighConfidence, &context)?;
        info!(resolved = resolved.len(), "auto-resolved conflicts");
    }

    if let Some(path) = &args.ledger {
        save_ledger(path, &ledger).context("save ledger")?;
    }

    if args.json {
        let output = ValidateJson {
            mappings: reports
                .iter()
                .map(|(mapping, report)| MappingResult { mapping, report })
                .collect(),
            conflicts: ledger.triage(),
        };
        println!("{}", serde_json::to_string_pretty(&output)?);
    } else {
        if !reports.is_empty() {
            println!("{}", validation_table(&reports));
        }
        if !ledger.is_empty() {
            println!("{}", triage_table(&ledger));
        }
        println!("{}", ledger_summary(&ledger));
    }

    let open_blockers = ledger
        .open_by_severity()
        .get(&ConflictSeverity::Blocker)
        .copied()
        .unwrap_or(0);
    Ok(ValidateOutcome { open_blockers })
}

pub fn run_resolve(args: &ResolveArgs) -> Result<()> {
    let mut ledger = existing_ledger(&args.ledger)?;
    let details = args
        .details
        .as_deref()
        .map(serde_json::from_str::<serde_json::Value>)
        .transpose()
        .context("parse --details as JSON")?;
    let conflict = ledger.resolve_conflict_by(
        ConflictId::new(args.id),
        args.by.as_deref(),
        &args.action,
        details,
        &args.notes,
    )?;
    println!(
        "Resolved conflict #{} ({})",
        conflict.id,
        conflict
            .resolution_action
            .map(|action| action.to_string())
            .unwrap_or_default()
    );
    save_ledger(&args.ledger, &ledger).context("save ledger")?;
    Ok(())
}

pub fn run_ignore(args: &IgnoreArgs) -> Result<()> {
    let mut ledger = existing_ledger(&args.ledger)?;
    let conflict = ledger.ignore(ConflictId::new(args.id), &args.reason)?;
    println!("Ignored conflict #{}", conflict.id);
    save_ledger(&args.ledger, &ledger).context("save ledger")?;
    Ok(())
}

fn existing_ledger(path: &Path) -> Result<ConflictLedger> {
    if !path.exists() {
        bail!(
            "ledger {} does not exist; run `recon validate` first",
            path.display()
        );
    }
    load_ledger(path).context("load ledger")
}

fn object_pairs<'a>(
    source: &'a SchemaSnapshot,
    target: &'a SchemaSnapshot,
    requested: &[String],
) -> Result<Vec<(&'a ObjectSchema, &'a ObjectSchema)>> {
    if requested.is_empty() {
        return Ok(source
            .objects
            .iter()
            .filter_map(|s| target.object(&s.name).map(|t| (s, t)))
            .collect());
    }
    requested
        .iter()
        .map(|raw| {
            let (source_name, target_name) = parse_object_pair(raw)?;
            let source_object = source
                .object(source_name)
                .ok_or_else(|| anyhow!("source object {source_name} not found"))?;
            let target_object = target
                .object(target_name)
                .ok_or_else(|| anyhow!("target object {target_name} not found"))?;
            Ok((source_object, target_object))
        })
        .collect()
}

/// High-confidence candidates for every object pair the mappings connect,
/// grouped per pair.
fn high_confidence_candidates(
    rules: &ReconcileRules,
    source: &SchemaSnapshot,
    target: &SchemaSnapshot,
    mappings: &[FieldMapping],
) -> Result<Vec<ObjectCandidates>> {
    let generator = CandidateGenerator::new(rules);
    let options = GeneratorOptions::with_threshold(rules.levels.high / 100.0);
    let mut seen = BTreeSet::new();
    let mut candidates = Vec::new();
    for mapping in mappings.iter().filter(|m| m.is_active()) {
        let key = (
            mapping.source_object.to_lowercase(),
            mapping.target_object.to_lowercase(),
        );
        if !seen.insert(key) {
            continue;
        }
        if let (Some(source_object), Some(target_object)) = (
            source.object(&mapping.source_object),
            target.object(&mapping.target_object),
        ) {
            candidates.push(ObjectCandidates::new(
                &source_object.name,
                &target_object.name,
                generator.generate_for_objects(source_object, target_object, &options)?,
            ));
        }
    }
    Ok(candidates)
}
