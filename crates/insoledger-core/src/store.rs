use chrono::NaiveDate;
use uuid::Uuid;

use insoledger_domain::{
    AuditLogEntry, ClassificationRule, Counterparty, InsolvencyEffect, LedgerEntry, ReviewStatus,
    ValueType,
};

use crate::CoreError;

/// Filter predicates for ranged entry queries. The date range is half-open:
/// `from` inclusive, `to` exclusive.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    pub ids: Option<Vec<Uuid>>,
    pub value_type: Option<ValueType>,
    pub review_status: Option<ReviewStatus>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub exclude_transfer_pairs: bool,
    pub without_suggestion: bool,
}

impl EntryFilter {
    pub fn ids(ids: Vec<Uuid>) -> Self {
        Self {
            ids: Some(ids),
            ..Self::default()
        }
    }

    /// Shared predicate so every backend filters identically.
    pub fn matches(&self, entry: &LedgerEntry) -> bool {
        if let Some(ids) = &self.ids {
            if !ids.contains(&entry.id) {
                return false;
            }
        }
        if let Some(value_type) = self.value_type {
            if entry.value_type != value_type {
                return false;
            }
        }
        if let Some(status) = self.review_status {
            if entry.review.status != status {
                return false;
            }
        }
        if let Some(from) = self.from {
            if entry.transaction_date < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if entry.transaction_date >= to {
                return false;
            }
        }
        if self.exclude_transfer_pairs && entry.is_transfer_pair() {
            return false;
        }
        if self.without_suggestion && entry.has_suggestion() {
            return false;
        }
        true
    }
}

/// Abstraction over ledger persistence. Every engine operation receives an
/// implementation explicitly instead of reaching for a process-wide handle,
/// which keeps the core testable against an in-memory fake.
///
/// Contracts a backend must honor:
/// - `entries` returns rows ordered by `(transaction_date, id)`.
/// - `update_entry` applies the closure under single-row atomicity and
///   refreshes `updated_at`; concurrent updates never interleave partial
///   field writes.
/// - `append_audit` is append-only; audit reads return newest first.
pub trait LedgerStore: Send + Sync {
    fn insert_entry(&self, entry: LedgerEntry) -> Result<(), CoreError>;
    fn entry(&self, id: Uuid) -> Result<LedgerEntry, CoreError>;
    fn entries(&self, case_id: Uuid, filter: &EntryFilter) -> Result<Vec<LedgerEntry>, CoreError>;
    fn update_entry(
        &self,
        id: Uuid,
        apply: &mut dyn FnMut(&mut LedgerEntry),
    ) -> Result<LedgerEntry, CoreError>;
    fn delete_entry(&self, id: Uuid) -> Result<(), CoreError>;
    /// All entries whose lineage points at the given effect.
    fn entries_for_effect(&self, effect_id: Uuid) -> Result<Vec<LedgerEntry>, CoreError>;

    fn rules(&self, case_id: Uuid) -> Result<Vec<ClassificationRule>, CoreError>;
    fn effect(&self, id: Uuid) -> Result<InsolvencyEffect, CoreError>;
    fn counterparty(&self, id: Uuid) -> Result<Option<Counterparty>, CoreError>;

    fn append_audit(&self, row: AuditLogEntry) -> Result<(), CoreError>;
    fn audit_for_entry(&self, entry_id: Uuid) -> Result<Vec<AuditLogEntry>, CoreError>;
    fn audit_for_case(&self, case_id: Uuid) -> Result<Vec<AuditLogEntry>, CoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use insoledger_domain::Suggested;

    fn entry(date: NaiveDate) -> LedgerEntry {
        LedgerEntry::new(Uuid::new_v4(), date, 1_000, "payment", ValueType::Ist)
    }

    #[test]
    fn date_range_is_half_open() {
        let from = NaiveDate::from_ymd_opt(2025, 11, 1).unwrap();
        let to = NaiveDate::from_ymd_opt(2025, 12, 1).unwrap();
        let filter = EntryFilter {
            from: Some(from),
            to: Some(to),
            ..EntryFilter::default()
        };
        assert!(filter.matches(&entry(from)));
        assert!(filter.matches(&entry(to.pred_opt().unwrap())));
        assert!(!filter.matches(&entry(to)));
        assert!(!filter.matches(&entry(from.pred_opt().unwrap())));
    }

    #[test]
    fn suggestion_and_transfer_filters_apply() {
        let date = NaiveDate::from_ymd_opt(2025, 11, 5).unwrap();
        let mut suggested = entry(date);
        suggested.suggested_category = Some(Suggested::new("Rent".into(), 0.7, Uuid::new_v4()));
        let mut paired = entry(date);
        paired.transfer_partner_entry_id = Some(Uuid::new_v4());

        let filter = EntryFilter {
            without_suggestion: true,
            exclude_transfer_pairs: true,
            ..EntryFilter::default()
        };
        assert!(!filter.matches(&suggested));
        assert!(!filter.matches(&paired));
        assert!(filter.matches(&entry(date)));
    }
}
