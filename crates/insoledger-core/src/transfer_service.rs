//! Materializes insolvency effects into PLAN ledger entries.
//!
//! Transfer is two-phase: compute the desired lineage rows for the
//! effect's current definition, then diff against the rows already carrying
//! its `source_effect_id`. Only stale rows are deleted and only missing
//! rows created, which keeps churn low while staying externally equivalent
//! to delete-then-recreate. Re-transferring an unchanged effect is a skip.

use rust_decimal::Decimal;
use tracing::debug;
use uuid::Uuid;

use insoledger_domain::{
    AllocationSource, EstateAssignment, InsolvencyEffect, LedgerEntry, PlanConfig, ValueType,
};

use crate::period::period_start_date;
use crate::{CoreError, LedgerStore};

/// Counters returned by a transfer run. `skipped` covers inactive effects,
/// effects without amounts and effects already up to date.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TransferOutcome {
    pub created: usize,
    pub deleted: usize,
    pub skipped: usize,
    pub errors: Vec<TransferFailure>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
/// Per-effect failure, isolated so the rest of the batch proceeds.
pub struct TransferFailure {
    pub effect_id: Uuid,
    pub message: String,
}

pub struct TransferService;

impl TransferService {
    pub fn transfer_effects(
        store: &dyn LedgerStore,
        case_id: Uuid,
        plan: &PlanConfig,
        effect_ids: &[Uuid],
    ) -> Result<TransferOutcome, CoreError> {
        let mut outcome = TransferOutcome::default();
        for &effect_id in effect_ids {
            let effect = match store.effect(effect_id) {
                Ok(effect) => effect,
                Err(CoreError::EffectNotFound(id)) => {
                    outcome.errors.push(TransferFailure {
                        effect_id: id,
                        message: "effect not found".into(),
                    });
                    continue;
                }
                Err(err) => return Err(err),
            };
            if effect.case_id != case_id {
                outcome.errors.push(TransferFailure {
                    effect_id,
                    message: "effect belongs to a different case".into(),
                });
                continue;
            }
            if !effect.is_active {
                outcome.skipped += 1;
                continue;
            }

            let desired = Self::desired_entries(plan, &effect);
            let current = store.entries_for_effect(effect.id)?;
            if desired.is_empty() && current.is_empty() {
                outcome.skipped += 1;
                continue;
            }

            // Keep rows that already match the desired definition; replace
            // everything else.
            let mut missing: Vec<LedgerEntry> = Vec::new();
            let mut kept: Vec<Uuid> = Vec::new();
            for wanted in desired {
                match current
                    .iter()
                    .find(|row| !kept.contains(&row.id) && rows_equivalent(row, &wanted))
                {
                    Some(row) => kept.push(row.id),
                    None => missing.push(wanted),
                }
            }
            let stale: Vec<Uuid> = current
                .iter()
                .map(|row| row.id)
                .filter(|id| !kept.contains(id))
                .collect();

            if missing.is_empty() && stale.is_empty() {
                outcome.skipped += 1;
                continue;
            }
            for id in stale {
                store.delete_entry(id)?;
                outcome.deleted += 1;
            }
            for row in missing {
                store.insert_entry(row)?;
                outcome.created += 1;
            }
        }
        debug!(
            case = %case_id,
            created = outcome.created,
            deleted = outcome.deleted,
            skipped = outcome.skipped,
            "effect transfer finished"
        );
        Ok(outcome)
    }

    /// PLAN rows the effect's current definition calls for: one per
    /// non-zero period inside the plan window, dated at the period start
    /// and stamped with the lineage link.
    pub fn desired_entries(plan: &PlanConfig, effect: &InsolvencyEffect) -> Vec<LedgerEntry> {
        effect
            .amounts_by_period
            .iter()
            .filter(|(_, &cents)| cents != 0)
            .filter(|(&period_index, _)| period_index < plan.period_count)
            .map(|(&period_index, &cents)| {
                let mut entry = LedgerEntry::new(
                    effect.case_id,
                    period_start_date(plan, period_index),
                    effect.signed_amount(cents),
                    effect.name.clone(),
                    ValueType::Plan,
                );
                entry.note = effect.note.clone();
                entry.legal_bucket = effect.effect_group.default_bucket();
                entry.category = effect.category.clone();
                entry.estate = Some(EstateAssignment::from_ratio(
                    effect.estate_ratio.unwrap_or(Decimal::ONE),
                    AllocationSource::Contractual,
                    Some("inherited from effect".into()),
                ));
                entry.source_effect_id = Some(effect.id);
                entry
            })
            .collect()
    }

    /// Deletes every ledger row derived from the given effect. Entries
    /// without the lineage link are untouched by construction.
    pub fn remove_effect(store: &dyn LedgerStore, effect_id: Uuid) -> Result<usize, CoreError> {
        let rows = store.entries_for_effect(effect_id)?;
        let mut deleted = 0;
        for row in rows {
            store.delete_entry(row.id)?;
            deleted += 1;
        }
        Ok(deleted)
    }

    /// Subset of the given effect ids that already have lineage rows.
    pub fn transferred_effect_ids(
        store: &dyn LedgerStore,
        effect_ids: &[Uuid],
    ) -> Result<Vec<Uuid>, CoreError> {
        let mut transferred = Vec::new();
        for &effect_id in effect_ids {
            if !store.entries_for_effect(effect_id)?.is_empty() {
                transferred.push(effect_id);
            }
        }
        Ok(transferred)
    }
}

/// Rows are interchangeable when every effect-controlled field agrees;
/// review state and ids deliberately stay out of the comparison.
fn rows_equivalent(current: &LedgerEntry, wanted: &LedgerEntry) -> bool {
    current.transaction_date == wanted.transaction_date
        && current.amount_cents == wanted.amount_cents
        && current.description == wanted.description
        && current.note == wanted.note
        && current.legal_bucket == wanted.legal_bucket
        && current.category == wanted.category
        && current.estate == wanted.estate
}
