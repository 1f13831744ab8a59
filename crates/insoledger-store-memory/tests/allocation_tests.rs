mod common;

use common::*;
use rust_decimal::Decimal;
use uuid::Uuid;

use insoledger_core::{AllocationService, LedgerStore};
use insoledger_domain::{AllocationSource, EstateAllocation, EstateAssignment, Suggested};
use insoledger_store_memory::MemoryLedgerStore;

#[test]
fn date_default_splits_around_the_opening_date() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let before = insert_ist_entry(&store, case_id, date(2025, 10, 28), -50_000, "old invoice");
    let after = insert_ist_entry(&store, case_id, date(2025, 11, 3), 75_000, "new revenue");

    let outcome =
        AllocationService::resolve_estate_allocation(&store, case_id, None, &allocation_config())
            .unwrap();
    assert_eq!(outcome.updated, 2);

    let before = store.entry(before.id).unwrap();
    let estate = before.estate.unwrap();
    assert_eq!(estate.allocation, EstateAllocation::Altmasse);
    assert_eq!(estate.ratio, Decimal::ZERO);

    let after = store.entry(after.id).unwrap();
    let estate = after.estate.unwrap();
    assert_eq!(estate.allocation, EstateAllocation::Neumasse);
    assert_eq!(estate.ratio, Decimal::ONE);
    assert_eq!(estate.source, AllocationSource::Unresolved);
}

#[test]
fn contractual_override_produces_a_mixed_split() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let kv = insert_counterparty(&store, "Kassenärztliche Vereinigung", Some("KV"));
    let entry = insert_ist_entry(&store, case_id, date(2025, 11, 14), 900_000, "KV Abschlag");
    store
        .update_entry(entry.id, &mut |row| row.counterparty_id = Some(kv.id))
        .unwrap();

    AllocationService::resolve_estate_allocation(&store, case_id, None, &allocation_config())
        .unwrap();

    let estate = store.entry(entry.id).unwrap().estate.unwrap();
    assert_eq!(estate.allocation, EstateAllocation::Mixed);
    assert_eq!(estate.ratio, Decimal::from(2) / Decimal::from(3));
    assert_eq!(estate.source, AllocationSource::Contractual);
}

#[test]
fn prorata_override_uses_service_day_counts() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let hzv = insert_counterparty(&store, "Hausärztliche Vertragsgemeinschaft", Some("HZV"));
    let entry = insert_ist_entry(&store, case_id, date(2025, 10, 30), 310_000, "HZV Oktober");
    store
        .update_entry(entry.id, &mut |row| row.counterparty_id = Some(hzv.id))
        .unwrap();

    AllocationService::resolve_estate_allocation(&store, case_id, None, &allocation_config())
        .unwrap();

    let estate = store.entry(entry.id).unwrap().estate.unwrap();
    assert_eq!(estate.allocation, EstateAllocation::Mixed);
    // 28 of 31 October days precede the opening date.
    assert_eq!(estate.ratio, Decimal::from(3) / Decimal::from(31));
    let (altmasse, neumasse) = estate.split_cents(310_000);
    assert_eq!(neumasse, 30_000);
    assert_eq!(altmasse, 280_000);
}

#[test]
fn suggested_counterparty_resolves_the_payer_class() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let kv = insert_counterparty(&store, "Kassenärztliche Vereinigung", Some("KV"));
    let entry = insert_ist_entry(&store, case_id, date(2025, 11, 14), 900_000, "KV Abschlag");
    store
        .update_entry(entry.id, &mut |row| {
            row.suggested_counterparty_id = Some(Suggested::new(kv.id, 0.8, Uuid::new_v4()));
        })
        .unwrap();

    AllocationService::resolve_estate_allocation(&store, case_id, None, &allocation_config())
        .unwrap();

    let estate = store.entry(entry.id).unwrap().estate.unwrap();
    assert_eq!(estate.source, AllocationSource::Contractual);
}

#[test]
fn rerunning_the_resolver_is_a_no_op() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    insert_ist_entry(&store, case_id, date(2025, 10, 28), -50_000, "old invoice");
    insert_ist_entry(&store, case_id, date(2025, 11, 3), 75_000, "new revenue");

    let config = allocation_config();
    let first = AllocationService::resolve_estate_allocation(&store, case_id, None, &config).unwrap();
    assert_eq!(first.updated, 2);
    assert_eq!(first.skipped, 0);

    let second =
        AllocationService::resolve_estate_allocation(&store, case_id, None, &config).unwrap();
    assert_eq!(second.updated, 0);
    assert_eq!(second.skipped, 2);
}

#[test]
fn manual_assignments_are_sticky() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let entry = insert_ist_entry(&store, case_id, date(2025, 11, 3), 75_000, "disputed payment");
    store
        .update_entry(entry.id, &mut |row| {
            row.estate = Some(EstateAssignment::altmasse(
                AllocationSource::Manual,
                Some("reviewer decision".into()),
            ));
        })
        .unwrap();

    let outcome =
        AllocationService::resolve_estate_allocation(&store, case_id, None, &allocation_config())
            .unwrap();
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.skipped, 1);

    let estate = store.entry(entry.id).unwrap().estate.unwrap();
    assert_eq!(estate.allocation, EstateAllocation::Altmasse);
    assert_eq!(estate.source, AllocationSource::Manual);
}

#[test]
fn plan_entries_are_left_to_the_transfer_engine() {
    let store = MemoryLedgerStore::new();
    let case_id = Uuid::new_v4();
    let plan_entry = insert_plan_entry(&store, case_id, date(2025, 12, 1), -80_000, "forecast");

    let outcome = AllocationService::resolve_estate_allocation(
        &store,
        case_id,
        Some(&[plan_entry.id]),
        &allocation_config(),
    )
    .unwrap();
    assert_eq!(outcome.updated, 0);
    assert_eq!(outcome.skipped, 1);
    assert!(store.entry(plan_entry.id).unwrap().estate.is_none());
}
