//! Assigns every IST entry to the old or new insolvency estate.

use tracing::warn;
use uuid::Uuid;

use insoledger_domain::{
    AllocationConfig, AllocationSource, Counterparty, EstateAssignment, LedgerEntry, ValueType,
};

use crate::{CoreError, EntryFilter, LedgerStore};

/// Counters returned by an allocation run. Skips cover PLAN entries,
/// sticky manual assignments, unchanged recomputations and isolated
/// per-entry failures.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AllocationOutcome {
    pub updated: usize,
    pub skipped: usize,
}

pub struct AllocationService;

impl AllocationService {
    /// Resolves the estate allocation for the given entries, or for every
    /// IST entry of the case when no id set is supplied. Re-running over
    /// already-resolved entries is a no-op.
    pub fn resolve_estate_allocation(
        store: &dyn LedgerStore,
        case_id: Uuid,
        entry_ids: Option<&[Uuid]>,
        config: &AllocationConfig,
    ) -> Result<AllocationOutcome, CoreError> {
        let filter = match entry_ids {
            Some(ids) => EntryFilter::ids(ids.to_vec()),
            None => EntryFilter {
                value_type: Some(ValueType::Ist),
                ..EntryFilter::default()
            },
        };
        let entries = store.entries(case_id, &filter)?;

        let mut outcome = AllocationOutcome::default();
        for entry in entries {
            // PLAN entries inherit their allocation from the generating
            // effect at transfer time.
            if entry.value_type != ValueType::Ist {
                outcome.skipped += 1;
                continue;
            }
            if entry.is_manual_allocation() {
                outcome.skipped += 1;
                continue;
            }

            let counterparty = linked_counterparty(store, &entry)?;
            let assignment = Self::resolve_entry(&entry, config, counterparty.as_ref());
            if entry.estate.as_ref() == Some(&assignment) {
                outcome.skipped += 1;
                continue;
            }

            match store.update_entry(entry.id, &mut |row| {
                row.estate = Some(assignment.clone());
            }) {
                Ok(_) => outcome.updated += 1,
                Err(err) => {
                    warn!(entry = %entry.id, error = %err, "allocation write failed");
                    outcome.skipped += 1;
                }
            }
        }
        Ok(outcome)
    }

    /// Pure resolution for one entry. Ordered, first match wins: date
    /// default, then a contractual override for the counterparty's payer
    /// class. Without a resolvable counterparty the date default applies
    /// but is tagged `Unresolved` so audits can tell it apart from a
    /// confidently resolved assignment.
    pub fn resolve_entry(
        entry: &LedgerEntry,
        config: &AllocationConfig,
        counterparty: Option<&Counterparty>,
    ) -> EstateAssignment {
        let date_default = if entry.transaction_date < config.opening_date {
            EstateAssignment::altmasse(
                AllocationSource::DateRule,
                Some("before case opening".into()),
            )
        } else {
            EstateAssignment::neumasse(
                AllocationSource::DateRule,
                Some("on or after case opening".into()),
            )
        };

        let Some(counterparty) = counterparty else {
            return EstateAssignment {
                source: AllocationSource::Unresolved,
                note: Some("counterparty not resolvable".into()),
                ..date_default
            };
        };

        if let Some(category) = counterparty.category.as_deref() {
            if let Some(rule) = config.override_for(category, entry.transaction_date) {
                return rule.assignment();
            }
        }
        date_default
    }
}

/// The authoritative counterparty link wins; a suggested link is good
/// enough to resolve the payer class for allocation purposes.
fn linked_counterparty(
    store: &dyn LedgerStore,
    entry: &LedgerEntry,
) -> Result<Option<Counterparty>, CoreError> {
    let id = entry
        .counterparty_id
        .or_else(|| entry.suggested_counterparty_id.as_ref().map(|s| s.value));
    match id {
        Some(id) => store.counterparty(id),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use insoledger_domain::{ContractOverrideRule, DateWindow, EstateAllocation};
    use rust_decimal::Decimal;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn config() -> AllocationConfig {
        let mut config = AllocationConfig::new(date(2025, 10, 29));
        config.overrides.push(ContractOverrideRule::new(
            "KV",
            DateWindow::new(date(2025, 10, 1), date(2026, 1, 1)),
            Decimal::from(2) / Decimal::from(3),
            "Q4 settlement: one third old estate",
        ));
        config
    }

    fn ist_entry(d: NaiveDate, cents: i64) -> LedgerEntry {
        LedgerEntry::new(Uuid::new_v4(), d, cents, "payment", ValueType::Ist)
    }

    #[test]
    fn dates_before_opening_go_to_the_old_estate() {
        let entry = ist_entry(date(2025, 10, 28), -50_000);
        let counterparty = Counterparty::new("Landlord", None);
        let assignment =
            AllocationService::resolve_entry(&entry, &config(), Some(&counterparty));
        assert_eq!(assignment.allocation, EstateAllocation::Altmasse);
        assert_eq!(assignment.ratio, Decimal::ZERO);
        assert_eq!(assignment.source, AllocationSource::DateRule);
    }

    #[test]
    fn dates_on_or_after_opening_go_to_the_new_estate() {
        let entry = ist_entry(date(2025, 10, 29), 80_000);
        let counterparty = Counterparty::new("Landlord", None);
        let assignment =
            AllocationService::resolve_entry(&entry, &config(), Some(&counterparty));
        assert_eq!(assignment.allocation, EstateAllocation::Neumasse);
        assert_eq!(assignment.ratio, Decimal::ONE);
        assert_eq!(assignment.source, AllocationSource::DateRule);
    }

    #[test]
    fn contractual_override_beats_the_date_default() {
        let entry = ist_entry(date(2025, 11, 14), 900_000);
        let counterparty = Counterparty::new("Kassenärztliche Vereinigung", Some("KV".into()));
        let assignment =
            AllocationService::resolve_entry(&entry, &config(), Some(&counterparty));
        assert_eq!(assignment.allocation, EstateAllocation::Mixed);
        assert_eq!(assignment.ratio, Decimal::from(2) / Decimal::from(3));
        assert_eq!(assignment.source, AllocationSource::Contractual);
    }

    #[test]
    fn unresolved_counterparty_keeps_the_date_default_with_low_confidence() {
        let entry = ist_entry(date(2025, 11, 14), 900_000);
        let assignment = AllocationService::resolve_entry(&entry, &config(), None);
        assert_eq!(assignment.allocation, EstateAllocation::Neumasse);
        assert_eq!(assignment.ratio, Decimal::ONE);
        assert_eq!(assignment.source, AllocationSource::Unresolved);
    }

    #[test]
    fn override_outside_its_window_does_not_apply() {
        let entry = ist_entry(date(2026, 1, 2), 900_000);
        let counterparty = Counterparty::new("Kassenärztliche Vereinigung", Some("KV".into()));
        let assignment =
            AllocationService::resolve_entry(&entry, &config(), Some(&counterparty));
        assert_eq!(assignment.allocation, EstateAllocation::Neumasse);
        assert_eq!(assignment.source, AllocationSource::DateRule);
    }
}
