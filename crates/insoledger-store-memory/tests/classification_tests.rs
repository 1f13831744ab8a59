mod common;

use common::*;
use uuid::Uuid;

use insoledger_core::{ClassificationService, LedgerStore};
use insoledger_domain::{
    ClassificationRule, LegalBucket, MatchField, MatchType, ServiceDateRule,
};
use insoledger_store_memory::MemoryLedgerStore;

#[test]
fn matching_rule_writes_a_suggestion() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    store
        .put_rule(contains_rule(
            case_id,
            "rent",
            "Miete",
            "Rent",
            LegalBucket::Neutral,
            10,
        ))
        .unwrap();
    let entry = insert_ist_entry(&store, case_id, date(2026, 1, 5), -120_000, "Miete Januar 2026");

    let outcome = ClassificationService::classify_batch(&store, case_id, None).unwrap();
    assert_eq!(outcome.classified, 1);
    assert_eq!(outcome.unchanged, 0);
    assert_eq!(outcome.errors, 0);

    let entry = store.entry(entry.id).unwrap();
    let bucket = entry.suggested_legal_bucket.unwrap();
    assert_eq!(bucket.value, LegalBucket::Neutral);
    assert!((bucket.confidence - 0.7).abs() < f64::EPSILON);
    assert_eq!(entry.suggested_category.unwrap().value, "Rent");
    // The suggestion never touches the authoritative fields.
    assert!(entry.legal_bucket.is_none());
    assert!(entry.category.is_none());
}

#[test]
fn unmatched_entries_surface_for_manual_triage() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    store
        .put_rule(contains_rule(
            case_id,
            "rent",
            "Miete",
            "Rent",
            LegalBucket::Neutral,
            10,
        ))
        .unwrap();
    let entry = insert_ist_entry(&store, case_id, date(2026, 1, 5), -9_900, "Büromaterial");

    let outcome = ClassificationService::classify_batch(&store, case_id, None).unwrap();
    assert_eq!(outcome.classified, 0);
    assert_eq!(outcome.unchanged, 1);
    assert!(!store.entry(entry.id).unwrap().has_suggestion());
}

#[test]
fn priority_decides_between_overlapping_rules() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    store
        .put_rule(contains_rule(
            case_id,
            "broad settlement",
            "Abschlag",
            "Sonstige",
            LegalBucket::Neutral,
            50,
        ))
        .unwrap();
    store
        .put_rule(contains_rule(
            case_id,
            "kv settlement",
            "KV Abschlag",
            "KV",
            LegalBucket::Masse,
            10,
        ))
        .unwrap();
    let entry = insert_ist_entry(&store, case_id, date(2025, 11, 14), 900_000, "KV Abschlag 11/25");

    ClassificationService::classify_batch(&store, case_id, None).unwrap();
    let entry = store.entry(entry.id).unwrap();
    assert_eq!(entry.suggested_category.unwrap().value, "KV");
}

#[test]
fn inactive_rules_never_match() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let mut rule = contains_rule(case_id, "rent", "Miete", "Rent", LegalBucket::Neutral, 10);
    rule.deactivate();
    store.put_rule(rule).unwrap();
    insert_ist_entry(&store, case_id, date(2026, 1, 5), -120_000, "Miete Januar 2026");

    let outcome = ClassificationService::classify_batch(&store, case_id, None).unwrap();
    assert_eq!(outcome.classified, 0);
    assert_eq!(outcome.unchanged, 1);
}

#[test]
fn service_date_rule_adds_an_orthogonal_suggestion() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let mut rule = contains_rule(case_id, "hzv", "HZV", "HZV", LegalBucket::Masse, 10);
    rule.service_date_rule = Some(ServiceDateRule::PreviousMonth);
    store.put_rule(rule).unwrap();
    let entry = insert_ist_entry(&store, case_id, date(2025, 11, 14), 310_000, "HZV Zahlung");

    ClassificationService::classify_batch(&store, case_id, None).unwrap();
    let entry = store.entry(entry.id).unwrap();
    let service = entry.suggested_service_period.unwrap().value;
    assert_eq!(service.rule, ServiceDateRule::PreviousMonth);
    assert_eq!(service.period.start, date(2025, 10, 1));
    assert_eq!(service.period.end, date(2025, 10, 31));
    // Orthogonal to classification: the category suggestion is also there.
    assert_eq!(entry.suggested_category.unwrap().value, "HZV");
}

#[test]
fn explicit_id_batches_ignore_review_state() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    store
        .put_rule(contains_rule(
            case_id,
            "rent",
            "Miete",
            "Rent",
            LegalBucket::Neutral,
            10,
        ))
        .unwrap();
    let first = insert_ist_entry(&store, case_id, date(2026, 1, 5), -120_000, "Miete Januar");
    let second = insert_ist_entry(&store, case_id, date(2026, 2, 5), -120_000, "Miete Februar");

    let outcome =
        ClassificationService::classify_batch(&store, case_id, Some(&[first.id])).unwrap();
    assert_eq!(outcome.classified, 1);
    assert!(store.entry(first.id).unwrap().has_suggestion());
    assert!(!store.entry(second.id).unwrap().has_suggestion());
}

#[test]
fn default_batch_skips_entries_that_already_carry_a_suggestion() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    store
        .put_rule(contains_rule(
            case_id,
            "rent",
            "Miete",
            "Rent",
            LegalBucket::Neutral,
            10,
        ))
        .unwrap();
    insert_ist_entry(&store, case_id, date(2026, 1, 5), -120_000, "Miete Januar");

    let first = ClassificationService::classify_batch(&store, case_id, None).unwrap();
    assert_eq!(first.classified, 1);
    let second = ClassificationService::classify_batch(&store, case_id, None).unwrap();
    assert_eq!(second.classified, 0);
    assert_eq!(second.unchanged, 0);
}

#[test]
fn reclassification_reflects_an_edited_rule_set() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let mut rule = contains_rule(case_id, "rent", "Miete", "Rent", LegalBucket::Neutral, 10);
    store.put_rule(rule.clone()).unwrap();
    let entry = insert_ist_entry(&store, case_id, date(2026, 1, 5), -120_000, "Miete Januar");

    ClassificationService::classify_batch(&store, case_id, None).unwrap();
    assert_eq!(
        store.entry(entry.id).unwrap().suggested_category.unwrap().value,
        "Rent"
    );

    rule.suggested_category = Some("Occupancy".into());
    store.put_rule(rule).unwrap();
    let outcome = ClassificationService::reclassify_unreviewed(&store, case_id).unwrap();
    assert_eq!(outcome.classified, 1);
    assert_eq!(
        store.entry(entry.id).unwrap().suggested_category.unwrap().value,
        "Occupancy"
    );
}

#[test]
fn stats_band_suggestions_by_confidence() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let mut exact = ClassificationRule::new(
        case_id,
        "exact",
        MatchField::Description,
        MatchType::Equals,
        "KV Abschlag",
    );
    exact.priority = 1;
    exact.suggested_legal_bucket = Some(LegalBucket::Masse);
    store.put_rule(exact).unwrap();
    store
        .put_rule(contains_rule(
            case_id,
            "rent",
            "Miete",
            "Rent",
            LegalBucket::Neutral,
            10,
        ))
        .unwrap();

    insert_ist_entry(&store, case_id, date(2025, 11, 14), 900_000, "KV Abschlag");
    insert_ist_entry(&store, case_id, date(2026, 1, 5), -120_000, "Miete Januar");
    insert_ist_entry(&store, case_id, date(2026, 1, 7), -9_900, "Büromaterial");

    ClassificationService::classify_batch(&store, case_id, None).unwrap();
    let stats = ClassificationService::classification_stats(&store, case_id).unwrap();
    assert_eq!(stats.total_unreviewed, 3);
    assert_eq!(stats.with_suggestion, 2);
    assert_eq!(stats.without_suggestion, 1);
    assert_eq!(stats.high_confidence, 1);
    assert_eq!(stats.medium_confidence, 1);
    assert_eq!(stats.low_confidence, 0);
}
