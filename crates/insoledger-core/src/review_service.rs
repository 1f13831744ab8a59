//! Review governance: the confirm/adjust state machine with its
//! append-only audit trail.
//!
//! Authoritative classification and allocation fields change only through
//! these transitions; the audit trail is the history, the entry's current
//! fields are a projection of it.

use std::fmt::Display;

use chrono::{NaiveDate, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use insoledger_domain::{
    AuditAction, AuditLogEntry, EstateAllocation, EstateAssignment, AllocationSource, FieldChange,
    LedgerEntry, LegalBucket, ReviewStatus, ValueType,
};

use crate::{CoreError, EntryFilter, LedgerStore};

/// Sparse set of field corrections accepted by an adjustment.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EntryAdjustment {
    pub amount_cents: Option<i64>,
    pub description: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub legal_bucket: Option<LegalBucket>,
    pub category: Option<String>,
    pub estate_allocation: Option<EstateAllocation>,
    pub estate_ratio: Option<Decimal>,
}

impl EntryAdjustment {
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}

/// Review coverage of a case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReviewStatistics {
    pub total: usize,
    pub unreviewed: usize,
    pub confirmed: usize,
    pub adjusted: usize,
}

/// Counters of a bulk confirmation; per-entry rejections are collected
/// instead of aborting the batch.
#[derive(Debug, Clone, Default)]
pub struct BulkReviewOutcome {
    pub confirmed: usize,
    pub errors: Vec<(Uuid, String)>,
}

pub struct ReviewService;

impl ReviewService {
    /// Confirms an unreviewed entry: stamps the reviewer and promotes every
    /// populated suggestion into its authoritative field. Without
    /// suggestions the entry is confirmed as manually correct as-is. The
    /// suggestion fields themselves stay untouched for traceability.
    pub fn confirm(
        store: &dyn LedgerStore,
        entry_id: Uuid,
        actor: &str,
    ) -> Result<LedgerEntry, CoreError> {
        let entry = store.entry(entry_id)?;
        if entry.review.status != ReviewStatus::Unreviewed {
            return Err(CoreError::Governance(format!(
                "entry is {}; re-opening a reviewed entry goes through adjust",
                entry.review.status
            )));
        }
        if entry.value_type == ValueType::Ist && entry.estate.is_none() {
            return Err(CoreError::Governance(
                "estate allocation unresolved; resolve or set it before confirming".into(),
            ));
        }

        let mut changes = vec![FieldChange::new(
            "review_status",
            Some(entry.review.status.to_string()),
            Some(ReviewStatus::Confirmed.to_string()),
        )];
        let mut promoted = entry.clone();
        promote_suggestions(&mut promoted);
        diff_entries(&entry, &promoted, &mut changes);

        let updated = store.update_entry(entry_id, &mut |row| {
            promote_suggestions(row);
            row.review.status = ReviewStatus::Confirmed;
            row.review.reviewed_by = Some(actor.to_string());
            row.review.reviewed_at = Some(Utc::now());
        })?;

        store.append_audit(
            AuditLogEntry::new(entry_id, entry.case_id, AuditAction::Confirmed, actor)
                .with_changes(changes),
        )?;
        Ok(updated)
    }

    /// Adjusts an entry with a mandatory reason and a sparse change set.
    /// The previous amount is snapshotted when the amount changes, and one
    /// audit row with the full before/after diff is appended. Contract
    /// violations reject synchronously with no partial state change.
    pub fn adjust(
        store: &dyn LedgerStore,
        entry_id: Uuid,
        actor: &str,
        reason: &str,
        adjustment: &EntryAdjustment,
    ) -> Result<LedgerEntry, CoreError> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(CoreError::Governance(
                "adjustment requires a non-empty reason".into(),
            ));
        }
        if adjustment.is_empty() {
            return Err(CoreError::Governance(
                "adjustment requires at least one field change".into(),
            ));
        }
        let entry = store.entry(entry_id)?;
        let estate = manual_estate(adjustment)?;

        let mut target = entry.clone();
        if let Some(amount) = adjustment.amount_cents {
            target.amount_cents = amount;
        }
        if let Some(description) = &adjustment.description {
            target.description = description.clone();
        }
        if let Some(date) = adjustment.transaction_date {
            target.transaction_date = date;
        }
        if let Some(bucket) = adjustment.legal_bucket {
            target.legal_bucket = Some(bucket);
        }
        if let Some(category) = &adjustment.category {
            target.category = Some(category.clone());
        }
        if let Some(estate) = &estate {
            target.estate = Some(estate.clone());
        }

        let mut changes = vec![FieldChange::new(
            "review_status",
            Some(entry.review.status.to_string()),
            Some(ReviewStatus::Adjusted.to_string()),
        )];
        diff_entries(&entry, &target, &mut changes);

        let amount_changed = target.amount_cents != entry.amount_cents;
        let previous_amount = entry.amount_cents;
        let updated = store.update_entry(entry_id, &mut |row| {
            row.amount_cents = target.amount_cents;
            row.description = target.description.clone();
            row.transaction_date = target.transaction_date;
            row.legal_bucket = target.legal_bucket;
            row.category = target.category.clone();
            row.estate = target.estate.clone();
            if amount_changed {
                row.review.previous_amount_cents = Some(previous_amount);
            }
            row.review.status = ReviewStatus::Adjusted;
            row.review.reviewed_by = Some(actor.to_string());
            row.review.reviewed_at = Some(Utc::now());
            row.review.change_reason = Some(reason.to_string());
        })?;

        store.append_audit(
            AuditLogEntry::new(entry_id, entry.case_id, AuditAction::Adjusted, actor)
                .with_reason(reason)
                .with_changes(changes),
        )?;
        Ok(updated)
    }

    /// Confirms a batch of entries, isolating per-entry rejections.
    pub fn bulk_confirm(
        store: &dyn LedgerStore,
        entry_ids: &[Uuid],
        actor: &str,
    ) -> Result<BulkReviewOutcome, CoreError> {
        let mut outcome = BulkReviewOutcome::default();
        for &entry_id in entry_ids {
            match Self::confirm(store, entry_id, actor) {
                Ok(_) => outcome.confirmed += 1,
                Err(CoreError::Storage(message)) => {
                    return Err(CoreError::Storage(message));
                }
                Err(err) => outcome.errors.push((entry_id, err.to_string())),
            }
        }
        Ok(outcome)
    }

    pub fn review_statistics(
        store: &dyn LedgerStore,
        case_id: Uuid,
    ) -> Result<ReviewStatistics, CoreError> {
        let mut stats = ReviewStatistics::default();
        for entry in store.entries(case_id, &EntryFilter::default())? {
            stats.total += 1;
            match entry.review.status {
                ReviewStatus::Unreviewed => stats.unreviewed += 1,
                ReviewStatus::Confirmed => stats.confirmed += 1,
                ReviewStatus::Adjusted => stats.adjusted += 1,
            }
        }
        Ok(stats)
    }
}

/// Accepts every populated suggestion as the authoritative value.
fn promote_suggestions(row: &mut LedgerEntry) {
    if let Some(suggested) = &row.suggested_legal_bucket {
        row.legal_bucket = Some(suggested.value);
    }
    if let Some(suggested) = &row.suggested_category {
        row.category = Some(suggested.value.clone());
    }
    if let Some(suggested) = &row.suggested_bank_account_id {
        row.bank_account_id = Some(suggested.value);
    }
    if let Some(suggested) = &row.suggested_counterparty_id {
        row.counterparty_id = Some(suggested.value);
    }
    if let Some(suggested) = &row.suggested_location_id {
        row.location_id = Some(suggested.value);
    }
    if let Some(suggested) = &row.suggested_service_period {
        row.service_period = Some(suggested.value.period);
    }
}

/// A manual estate correction; setting either allocation or ratio makes
/// the assignment sticky against the resolver.
fn manual_estate(adjustment: &EntryAdjustment) -> Result<Option<EstateAssignment>, CoreError> {
    if adjustment.estate_allocation.is_none() && adjustment.estate_ratio.is_none() {
        return Ok(None);
    }
    if let Some(ratio) = adjustment.estate_ratio {
        if ratio < Decimal::ZERO || ratio > Decimal::ONE {
            return Err(CoreError::Validation(format!(
                "estate ratio {ratio} outside [0, 1]"
            )));
        }
    }
    let assignment = match (adjustment.estate_allocation, adjustment.estate_ratio) {
        (Some(allocation), Some(ratio)) => {
            let derived = EstateAssignment::from_ratio(ratio, AllocationSource::Manual, None);
            if allocation != derived.allocation && allocation != EstateAllocation::Unknown {
                return Err(CoreError::Validation(format!(
                    "allocation {allocation} conflicts with ratio {ratio}"
                )));
            }
            EstateAssignment {
                allocation,
                ..derived
            }
        }
        (Some(EstateAllocation::Altmasse), None) => {
            EstateAssignment::altmasse(AllocationSource::Manual, None)
        }
        (Some(EstateAllocation::Neumasse), None) => {
            EstateAssignment::neumasse(AllocationSource::Manual, None)
        }
        (Some(allocation), None) => {
            return Err(CoreError::Validation(format!(
                "{allocation} allocation requires an explicit ratio"
            )));
        }
        (None, Some(ratio)) => {
            EstateAssignment::from_ratio(ratio, AllocationSource::Manual, None)
        }
        (None, None) => {
            unreachable!("both allocation and ratio None handled by early return above")
        }
    };
    Ok(Some(assignment))
}

fn diff_entries(before: &LedgerEntry, after: &LedgerEntry, changes: &mut Vec<FieldChange>) {
    push_change(
        changes,
        "amount_cents",
        diff_value(&before.amount_cents, &after.amount_cents),
    );
    push_change(
        changes,
        "description",
        diff_value(&before.description, &after.description),
    );
    push_change(
        changes,
        "transaction_date",
        diff_value(&before.transaction_date, &after.transaction_date),
    );
    push_change(
        changes,
        "legal_bucket",
        diff_option(before.legal_bucket.as_ref(), after.legal_bucket.as_ref()),
    );
    push_change(
        changes,
        "category",
        diff_option(before.category.as_ref(), after.category.as_ref()),
    );
    push_change(
        changes,
        "bank_account_id",
        diff_option(before.bank_account_id.as_ref(), after.bank_account_id.as_ref()),
    );
    push_change(
        changes,
        "counterparty_id",
        diff_option(
            before.counterparty_id.as_ref(),
            after.counterparty_id.as_ref(),
        ),
    );
    push_change(
        changes,
        "location_id",
        diff_option(before.location_id.as_ref(), after.location_id.as_ref()),
    );
    push_change(
        changes,
        "service_period",
        diff_pair(
            before.service_period.map(|p| format!("{}..{}", p.start, p.end)),
            after.service_period.map(|p| format!("{}..{}", p.start, p.end)),
        ),
    );
    push_change(
        changes,
        "estate",
        diff_pair(
            before
                .estate
                .as_ref()
                .map(|e| format!("{} ({})", e.allocation, e.ratio)),
            after
                .estate
                .as_ref()
                .map(|e| format!("{} ({})", e.allocation, e.ratio)),
        ),
    );
}

fn diff_value<T: Display + PartialEq>(
    before: &T,
    after: &T,
) -> Option<(Option<String>, Option<String>)> {
    (before != after).then(|| (Some(before.to_string()), Some(after.to_string())))
}

fn diff_option<T: Display + PartialEq>(
    before: Option<&T>,
    after: Option<&T>,
) -> Option<(Option<String>, Option<String>)> {
    diff_pair(
        before.map(ToString::to_string),
        after.map(ToString::to_string),
    )
}

fn diff_pair(
    before: Option<String>,
    after: Option<String>,
) -> Option<(Option<String>, Option<String>)> {
    (before != after).then_some((before, after))
}

fn push_change(
    changes: &mut Vec<FieldChange>,
    field: &str,
    diff: Option<(Option<String>, Option<String>)>,
) {
    if let Some((before, after)) = diff {
        changes.push(FieldChange::new(field, before, after));
    }
}
