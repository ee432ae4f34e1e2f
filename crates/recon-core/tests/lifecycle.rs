use proptest::prelude::*;

use recon_core::{
    ConflictLedger, ConflictScope, ObjectCandidates, PolicyContext, SingleHighConfidence,
    apply_policy, detect_conflicts,
};
use recon_map::CandidateGenerator;
use recon_model::{
    ConfidenceLevel, ConflictId, ConflictSeverity, ConflictType, FieldDescriptor, FieldMapping, FieldRef,
    NewConflict, ObjectSchema, ReconError, ResolutionAction, ResolutionStatus, SchemaSnapshot,
};
use recon_rules::ReconcileRules;

fn source_schema() -> SchemaSnapshot {
    SchemaSnapshot {
        objects: vec![ObjectSchema::new(
            "Product2",
            vec![
                FieldDescriptor::new("ProductCode", "string"),
                FieldDescriptor::new("SKU__c", "string"),
                FieldDescriptor::new("IsActive", "boolean"),
                FieldDescriptor::new("ListPrice", "double"),
                FieldDescriptor::new("Family", "picklist"),
            ],
        )],
    }
}

fn target_schema() -> SchemaSnapshot {
    SchemaSnapshot {
        objects: vec![ObjectSchema::new(
            "Item",
            vec![
                FieldDescriptor::new("ProductCode", "string"),
                FieldDescriptor::new("Active", "date"),
                FieldDescriptor::new("Price", "currency").required(true),
                FieldDescriptor::new("Category", "string").required(true),
            ],
        )],
    }
}

fn mappings() -> Vec<FieldMapping> {
    vec![
        FieldMapping::new("Product2", "ProductCode", "Item", "ProductCode"),
        FieldMapping::new("Product2", "SKU__c", "Item", "ProductCode"),
        FieldMapping::new("Product2", "IsActive", "Item", "Active"),
        FieldMapping::new("Product2", "Family", "Item", "Segment"),
        FieldMapping::new("Product2", "ListPrice", "Catalog", "Price"),
    ]
}

#[test]
fn detection_covers_every_conflict_type() {
    let rules = ReconcileRules::default();
    let (source, target, mappings) = (source_schema(), target_schema(), mappings());
    let conflicts =
        detect_conflicts(&ConflictScope::new(&rules, &source, &target, &mappings)).unwrap();

    let kinds: Vec<(ConflictType, ConflictSeverity)> = conflicts
        .iter()
        .map(|c| (c.conflict_type, c.severity))
        .collect();
    assert_eq!(
        kinds,
        vec![
            (ConflictType::DataTypeMismatch, ConflictSeverity::Error),
            (ConflictType::CreateNewField, ConflictSeverity::Warning),
            (ConflictType::CreateNewObject, ConflictSeverity::Blocker),
            (ConflictType::DuplicateMapping, ConflictSeverity::Error),
            (ConflictType::RequiredFieldMissing, ConflictSeverity::Blocker),
            (ConflictType::RequiredFieldMissing, ConflictSeverity::Blocker),
        ]
    );
    assert_eq!(
        conflicts[3].description,
        "2 mappings target 'Item.ProductCode': Product2.ProductCode, Product2.SKU__c"
    );
    assert_eq!(
        conflicts[0].source.as_ref().and_then(|r| r.data_type.as_deref()),
        Some("boolean")
    );
}

#[test]
fn optional_source_into_required_target_is_a_warning() {
    let rules = ReconcileRules::default();
    let source = source_schema();
    let target = target_schema();
    let mappings = vec![
        FieldMapping::new("Product2", "ListPrice", "Item", "Price"),
        FieldMapping::new("Product2", "Family", "Item", "Category").with_default("General"),
    ];
    let conflicts =
        detect_conflicts(&ConflictScope::new(&rules, &source, &target, &mappings)).unwrap();
    assert_eq!(conflicts.len(), 1, "{conflicts:?}");
    assert_eq!(conflicts[0].conflict_type, ConflictType::RequiredFieldMissing);
    assert_eq!(conflicts[0].severity, ConflictSeverity::Warning);
    assert_eq!(
        conflicts[0].target.as_ref().map(ToString::to_string),
        Some("Item.Price".to_string())
    );
}

#[test]
fn detected_conflicts_open_once_in_ledger() {
    let rules = ReconcileRules::default();
    let (source, target, mappings) = (source_schema(), target_schema(), mappings());
    let scope = ConflictScope::new(&rules, &source, &target, &mappings);
    let mut ledger = ConflictLedger::new();
    for _ in 0..2 {
        for request in detect_conflicts(&scope).unwrap() {
            ledger.open_conflict(request).unwrap();
        }
    }
    assert_eq!(ledger.len(), 6);
    let triaged: Vec<ConflictSeverity> = ledger.triage().iter().map(|c| c.severity).collect();
    assert_eq!(
        triaged,
        vec![
            ConflictSeverity::Blocker,
            ConflictSeverity::Blocker,
            ConflictSeverity::Blocker,
            ConflictSeverity::Error,
            ConflictSeverity::Error,
            ConflictSeverity::Warning,
        ]
    );
    assert_eq!(
        ledger.open_by_severity().get(&ConflictSeverity::Blocker),
        Some(&3)
    );
}

#[test]
fn resolution_records_audit_trail() {
    let mut ledger = ConflictLedger::new();
    let id = ledger
        .open_conflict(
            NewConflict::new(
                ConflictType::CreateNewField,
                ConflictSeverity::Warning,
                "Target field 'Item.Segment' does not exist",
            )
            .with_target(FieldRef::field("Item", "Segment")),
        )
        .unwrap()
        .id;

    let err = ledger
        .resolve_conflict(id, "delete_target", None, "nope")
        .unwrap_err();
    assert!(matches!(err, ReconError::InvalidResolutionAction(_)));
    assert!(ledger.get(id).unwrap().is_unresolved());

    let details = serde_json::json!({ "field_name": "Segment__c", "type": "string" });
    let resolved = ledger
        .resolve_conflict_by(
            id,
            Some("analyst@example.com"),
            "create_custom_field",
            Some(details.clone()),
            "Segment is new in the target org",
        )
        .unwrap();
    assert_eq!(resolved.resolution_status, ResolutionStatus::UserResolved);
    assert_eq!(
        resolved.resolution_action,
        Some(ResolutionAction::CreateCustomField)
    );
    assert_eq!(resolved.resolution_details, Some(details));
    assert_eq!(resolved.resolved_by.as_deref(), Some("analyst@example.com"));
    assert!(resolved.resolved_at.is_some());

    let err = ledger.ignore(id, "changed my mind").unwrap_err();
    assert!(matches!(err, ReconError::InvalidTransition { .. }));
}

#[test]
fn unknown_id_is_not_found() {
    let mut ledger = ConflictLedger::new();
    let err = ledger.ignore(ConflictId::new(42), "later").unwrap_err();
    assert!(matches!(err, ReconError::ConflictNotFound(id) if id.get() == 42));
}

#[test]
fn ledger_round_trips_through_json() {
    let mut ledger = ConflictLedger::new();
    let id = ledger
        .open_conflict(NewConflict::new(
            ConflictType::CreateNewObject,
            ConflictSeverity::Blocker,
            "Target object 'Catalog' does not exist",
        ).with_target(FieldRef::object("Catalog")))
        .unwrap()
        .id;
    ledger.ignore(id, "object ships next release").unwrap();

    let json = serde_json::to_string(&ledger).unwrap();
    let mut restored: ConflictLedger = serde_json::from_str(&json).unwrap();
    assert_eq!(restored, ledger);
    let next = restored
        .open_conflict(NewConflict::new(
            ConflictType::CreateNewObject,
            ConflictSeverity::Blocker,
            "Target object 'Catalog' does not exist",
        ).with_target(FieldRef::object("Catalog")))
        .unwrap()
        .id;
    assert_eq!(next.get(), 2);
}

#[test]
fn single_high_candidate_auto_resolves_duplicate() {
    let rules = ReconcileRules::default();
    let (source, target, mappings) = (source_schema(), target_schema(), mappings());
    let mut ledger = ConflictLedger::new();
    for request in detect_conflicts(&ConflictScope::new(&rules, &source, &target, &mappings)).unwrap()
    {
        ledger.open_conflict(request).unwrap();
    }

    let generator = CandidateGenerator::new(&rules);
    let candidates = vec![ObjectCandidates::new(
        "Product2",
        "Item",
        generator
            .generate_candidates(&source.objects[0].fields, &target.objects[0].fields, 0.0)
            .unwrap(),
    )];
    let context = PolicyContext {
        mappings: &mappings,
        candidates: &candidates,
    };

    let resolved = apply_policy(&mut ledger, &SingleHighConfidence, &context).unwrap();
    assert_eq!(resolved.len(), 1);
    let conflict = ledger.get(resolved[0]).unwrap();
    assert_eq!(conflict.conflict_type, ConflictType::DuplicateMapping);
    assert_eq!(conflict.resolution_status, ResolutionStatus::AutoResolved);
    assert_eq!(
        conflict.resolution_details.as_ref().unwrap()["source_field"],
        "ProductCode"
    );
    assert_eq!(
        conflict.resolution_details.as_ref().unwrap()["source_object"],
        "Product2"
    );

    // Nothing left for the policy to do.
    assert!(
        apply_policy(&mut ledger, &SingleHighConfidence, &context)
            .unwrap()
            .is_empty()
    );
}

#[test]
fn candidates_from_other_object_pairs_do_not_settle_duplicates() {
    let rules = ReconcileRules::default();
    let source = SchemaSnapshot {
        objects: vec![
            ObjectSchema::new(
                "Account",
                vec![
                    FieldDescriptor::new("Title", "string"),
                    FieldDescriptor::new("Alias", "string"),
                ],
            ),
            ObjectSchema::new("Contact", vec![FieldDescriptor::new("Name", "string")]),
        ],
    };
    let target = SchemaSnapshot {
        objects: vec![
            ObjectSchema::new("Company", vec![FieldDescriptor::new("Name", "string")]),
            ObjectSchema::new("Person", vec![FieldDescriptor::new("Name", "string")]),
        ],
    };
    let mappings = vec![
        FieldMapping::new("Account", "Title", "Company", "Name"),
        FieldMapping::new("Account", "Alias", "Company", "Name"),
        FieldMapping::new("Contact", "Name", "Person", "Name"),
    ];
    let mut ledger = ConflictLedger::new();
    for request in detect_conflicts(&ConflictScope::new(&rules, &source, &target, &mappings)).unwrap()
    {
        ledger.open_conflict(request).unwrap();
    }
    let duplicate = ledger
        .unresolved()
        .find(|c| c.conflict_type == ConflictType::DuplicateMapping)
        .unwrap()
        .id;

    let generator = CandidateGenerator::new(&rules);
    let candidates: Vec<ObjectCandidates> = source
        .objects
        .iter()
        .zip(&target.objects)
        .map(|(s, t)| {
            ObjectCandidates::new(
                &s.name,
                &t.name,
                generator.generate_candidates(&s.fields, &t.fields, 0.0).unwrap(),
            )
        })
        .collect();
    // Contact.Name → Person.Name is high confidence, but it competes for nothing.
    assert!(
        candidates[1]
            .candidates
            .iter()
            .any(|c| c.level == ConfidenceLevel::High)
    );

    let context = PolicyContext {
        mappings: &mappings,
        candidates: &candidates,
    };
    let resolved = apply_policy(&mut ledger, &SingleHighConfidence, &context).unwrap();
    assert!(resolved.is_empty(), "{resolved:?}");
    assert!(ledger.get(duplicate).unwrap().is_unresolved());
}

fn action_strategy() -> impl Strategy<Value = String> {
    prop_oneof![
        proptest::sample::select(ResolutionAction::ALL.to_vec()).prop_map(|a| a.to_string()),
        "[a-z_]{1,20}",
    ]
}

proptest! {
    #[test]
    fn terminal_conflicts_never_change(
        action in action_strategy(),
        notes in "[a-z ]{0,12}",
        first in 0u8..3,
    ) {
        let mut ledger = ConflictLedger::new();
        let id = ledger
            .open_conflict(NewConflict::new(
                ConflictType::DuplicateMapping,
                ConflictSeverity::Error,
                "dup",
            ))
            .unwrap()
            .id;
        match first {
            0 => { ledger.ignore(id, "defer").unwrap(); }
            1 => { ledger.resolve_conflict(id, "skip_field", None, "skip").unwrap(); }
            _ => { ledger.auto_resolve(id, ResolutionAction::MapToExisting, None, "policy").unwrap(); }
        }
        let before = ledger.get(id).unwrap().clone();
        prop_assert!(ledger.resolve_conflict(id, &action, None, &notes).is_err());
        prop_assert!(ledger.ignore(id, &notes).is_err());
        prop_assert_eq!(ledger.get(id).unwrap(), &before);
    }
}
