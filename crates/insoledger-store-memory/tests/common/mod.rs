#![allow(dead_code)]

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use insoledger_core::LedgerStore;
use insoledger_domain::{
    AllocationConfig, ClassificationRule, ContractOverrideRule, Counterparty, DateWindow,
    LedgerEntry, LegalBucket, MatchField, MatchType, PeriodType, PlanConfig, ValueType,
};
use insoledger_store_memory::MemoryLedgerStore;

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Case opened on 2025-10-29, the cutoff every fixture revolves around.
pub fn opening_date() -> NaiveDate {
    date(2025, 10, 29)
}

/// Allocation config with the two contractual overrides of the engagement:
/// the Q4 KV settlement (one third old estate) and the October HZV
/// settlement split pro rata by service days.
pub fn allocation_config() -> AllocationConfig {
    let mut config = AllocationConfig::new(opening_date());
    config.overrides.push(ContractOverrideRule::new(
        "KV",
        DateWindow::new(date(2025, 10, 1), date(2026, 1, 1)),
        Decimal::from(2) / Decimal::from(3),
        "KV Q4 settlement: 1/3 old estate, 2/3 new estate",
    ));
    config.overrides.push(ContractOverrideRule::prorata(
        "HZV",
        DateWindow::new(date(2025, 10, 1), date(2025, 11, 1)),
        date(2025, 10, 1),
        date(2025, 10, 31),
        opening_date(),
        "HZV October settlement split by service days",
    ));
    config
}

pub fn monthly_plan(case_id: Uuid) -> PlanConfig {
    let mut plan = PlanConfig::new(case_id, date(2025, 11, 1), PeriodType::Monthly, 6);
    plan.opening_balance_cents = 2_500_000;
    plan
}

pub fn insert_ist_entry(
    store: &MemoryLedgerStore,
    case_id: Uuid,
    transaction_date: NaiveDate,
    amount_cents: i64,
    description: &str,
) -> LedgerEntry {
    let entry = LedgerEntry::new(
        case_id,
        transaction_date,
        amount_cents,
        description,
        ValueType::Ist,
    );
    store.insert_entry(entry.clone()).unwrap();
    entry
}

pub fn insert_plan_entry(
    store: &MemoryLedgerStore,
    case_id: Uuid,
    transaction_date: NaiveDate,
    amount_cents: i64,
    description: &str,
) -> LedgerEntry {
    let entry = LedgerEntry::new(
        case_id,
        transaction_date,
        amount_cents,
        description,
        ValueType::Plan,
    );
    store.insert_entry(entry.clone()).unwrap();
    entry
}

pub fn insert_counterparty(
    store: &MemoryLedgerStore,
    name: &str,
    category: Option<&str>,
) -> Counterparty {
    let counterparty = Counterparty::new(name, category.map(str::to_string));
    store.put_counterparty(counterparty.clone()).unwrap();
    counterparty
}

/// A contains-rule on the description that suggests a category and a legal
/// bucket, the most common rule shape in practice.
pub fn contains_rule(
    case_id: Uuid,
    name: &str,
    needle: &str,
    category: &str,
    bucket: LegalBucket,
    priority: i32,
) -> ClassificationRule {
    let mut rule = ClassificationRule::new(
        case_id,
        name,
        MatchField::Description,
        MatchType::Contains,
        needle,
    );
    rule.priority = priority;
    rule.suggested_category = Some(category.to_string());
    rule.suggested_legal_bucket = Some(bucket);
    rule
}
