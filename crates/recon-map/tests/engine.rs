use proptest::prelude::*;

use recon_map::{CandidateGenerator, GeneratorOptions};
use recon_model::{AiSuggestion, FieldDescriptor, ObjectSchema, ReconError};
use recon_rules::ReconcileRules;

fn sources() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("ProductCode", "string"),
        FieldDescriptor::new("IsActive", "boolean"),
    ]
}

fn targets() -> Vec<FieldDescriptor> {
    vec![
        FieldDescriptor::new("ItemCode", "string"),
        FieldDescriptor::new("Active", "boolean"),
    ]
}

#[test]
fn active_flag_pairs_rank_near_top() {
    let rules = ReconcileRules::default();
    let generator = CandidateGenerator::new(&rules);
    let candidates = generator
        .generate_candidates(&sources(), &targets(), 0.5)
        .unwrap();

    let position = candidates
        .iter()
        .position(|c| c.source_field == "IsActive" && c.target_field == "Active")
        .expect("IsActive -> Active present");
    assert!(position <= 1, "ranked at {position}: {candidates:?}");
    assert!(
        candidates
            .windows(2)
            .all(|pair| pair[0].confidence >= pair[1].confidence)
    );
}

#[test]
fn competing_sources_for_one_target_are_all_kept() {
    let rules = ReconcileRules::default();
    let generator = CandidateGenerator::new(&rules);
    let sources = vec![
        FieldDescriptor::new("Status", "picklist"),
        FieldDescriptor::new("Status__c", "picklist"),
    ];
    let targets = vec![FieldDescriptor::new("Status", "picklist")];
    let candidates = generator.generate_candidates(&sources, &targets, 0.7).unwrap();
    assert_eq!(candidates.len(), 2);
    assert!(candidates.iter().all(|c| c.target_field == "Status"));
}

#[test]
fn candidate_exactly_on_decimal_threshold_is_kept() {
    let rules = ReconcileRules::default();
    let generator = CandidateGenerator::new(&rules);
    let source = FieldDescriptor::new("Code", "richtext")
        .with_label("aaa")
        .required(true)
        .with_picklist(["x"]);
    let target = FieldDescriptor::new("Code", "longstring")
        .with_label("zzz")
        .with_picklist(["y"]);

    let all = generator
        .generate_candidates(std::slice::from_ref(&source), std::slice::from_ref(&target), 0.0)
        .unwrap();
    assert_eq!(all[0].confidence, 55.0);

    let kept = generator
        .generate_candidates(&[source], &[target], 0.55)
        .unwrap();
    assert_eq!(kept.len(), 1);
}

#[test]
fn malformed_descriptor_fails_whole_pass() {
    let rules = ReconcileRules::default();
    let generator = CandidateGenerator::new(&rules);
    let mut bad = targets();
    bad.push(FieldDescriptor::new("Broken", " "));
    let err = generator.generate_candidates(&sources(), &bad, 0.5).unwrap_err();
    assert!(matches!(err, ReconError::InvalidInput(_)));
}

#[test]
fn objects_generate_over_their_fields() {
    let rules = ReconcileRules::default();
    let generator = CandidateGenerator::new(&rules);
    let source = ObjectSchema::new("Product2", sources());
    let target = ObjectSchema::new("Item", targets());
    let from_objects = generator
        .generate_for_objects(&source, &target, &GeneratorOptions::with_threshold(0.5))
        .unwrap();
    let from_fields = generator
        .generate_candidates(&sources(), &targets(), 0.5)
        .unwrap();
    assert_eq!(from_objects, from_fields);
}

#[test]
fn ai_suggestions_are_rescored_not_trusted() {
    let rules = ReconcileRules::default();
    let generator = CandidateGenerator::new(&rules);
    let base = generator
        .generate_candidates(&sources(), &targets(), 0.0)
        .unwrap();
    let before = base
        .iter()
        .find(|c| c.source_field == "ProductCode" && c.target_field == "ItemCode")
        .map(|c| c.confidence)
        .unwrap();

    let suggestions = vec![
        AiSuggestion {
            source_field: "productcode".to_string(),
            target_field: "ITEMCODE".to_string(),
            confidence: Some(99.0),
            reason: Some("codes".to_string()),
        },
        AiSuggestion {
            source_field: "Missing".to_string(),
            target_field: "ItemCode".to_string(),
            confidence: None,
            reason: None,
        },
    ];
    let merged = generator
        .merge_ai_suggestions(base.clone(), &suggestions, &sources(), &targets())
        .unwrap();
    assert_eq!(merged.len(), base.len());
    let after = merged
        .iter()
        .find(|c| c.source_field == "ProductCode" && c.target_field == "ItemCode")
        .map(|c| c.confidence)
        .unwrap();
    let expected = (before + rules.context.ai_boost).min(100.0);
    assert!((after - expected).abs() <= 0.1, "{after} vs {expected}");
    assert!(after < 99.0);
}

fn field_strategy() -> impl Strategy<Value = FieldDescriptor> {
    (
        "[A-Z][a-zA-Z_]{1,12}",
        proptest::sample::select(vec!["string", "boolean", "double", "date", "picklist"]),
        any::<bool>(),
    )
        .prop_map(|(name, field_type, required)| {
            FieldDescriptor::new(name, field_type).required(required)
        })
}

proptest! {
    #[test]
    fn threshold_filter_is_exact(
        sources in proptest::collection::vec(field_strategy(), 0..6),
        targets in proptest::collection::vec(field_strategy(), 0..6),
        threshold in 0.0f64..=1.0,
    ) {
        let rules = ReconcileRules::default();
        let generator = CandidateGenerator::new(&rules);
        let kept = generator.generate_candidates(&sources, &targets, threshold).unwrap();
        prop_assert!(kept.iter().all(|c| c.meets(threshold)));

        let everything = generator.generate_candidates(&sources, &targets, 0.0).unwrap();
        prop_assert_eq!(everything.len(), sources.len() * targets.len());
        let expected = everything.iter().filter(|c| c.meets(threshold)).count();
        prop_assert_eq!(kept.len(), expected);
    }
}
