//! Two-pass aggregation of ledger entries into the rolling liquidity table.
//!
//! Pass one is an order-independent reduction into (period, category,
//! estate) cells; pass two is the strictly sequential running-balance fold.
//! For a fixed entry set and plan the output is a pure function, so
//! dashboards can treat it as cache-invalidation-safe derived data.

use std::collections::{BTreeMap, BTreeSet};

use chrono::NaiveDate;
use tracing::warn;
use uuid::Uuid;

use insoledger_domain::{
    AggregationReport, AggregationWarning, AllocationSource, CategoryAggregate, EstateAssignment,
    EstateSplit, LedgerEntry, PeriodAggregate, PlanConfig, ValueType,
};

use crate::period::{period_offset, period_start_date};
use crate::{CoreError, EntryFilter, LedgerStore};

/// Scope filters applied before aggregation. Internal transfer pairs are
/// excluded unless explicitly requested.
#[derive(Debug, Clone, Default)]
pub struct AggregationScope {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub include_transfer_pairs: bool,
}

pub struct AggregationService;

impl AggregationService {
    /// Fetches the case's entries under the scope filters and aggregates
    /// them against the plan grid. Read-only and side-effect-free.
    pub fn aggregate(
        store: &dyn LedgerStore,
        case_id: Uuid,
        plan: &PlanConfig,
        scope: &AggregationScope,
    ) -> Result<AggregationReport, CoreError> {
        let filter = EntryFilter {
            from: scope.from,
            to: scope.to,
            exclude_transfer_pairs: !scope.include_transfer_pairs,
            ..EntryFilter::default()
        };
        let entries = store.entries(case_id, &filter)?;
        Ok(Self::aggregate_entries(case_id, plan, &entries))
    }

    /// Pure aggregation over an already-fetched entry set.
    pub fn aggregate_entries(
        case_id: Uuid,
        plan: &PlanConfig,
        entries: &[LedgerEntry],
    ) -> AggregationReport {
        let mut warnings = Vec::new();
        let mut located: Vec<(u32, &LedgerEntry)> = Vec::with_capacity(entries.len());
        for entry in entries {
            match period_offset(plan, entry.transaction_date) {
                Ok(index) => located.push((index, entry)),
                Err(err) => {
                    warn!(entry = %entry.id, error = %err, "entry outside plan window");
                    warnings.push(AggregationWarning {
                        entry_id: entry.id,
                        transaction_date: entry.transaction_date,
                        message: err.to_string(),
                    });
                }
            }
        }

        // IST precedence is decided per (period, category) cell, so a
        // period can mix IST-backed categories with PLAN-backed ones.
        let ist_cells: BTreeSet<(u32, Option<&str>)> = located
            .iter()
            .filter(|(_, entry)| entry.value_type == ValueType::Ist)
            .map(|(index, entry)| (*index, entry.category.as_deref()))
            .collect();

        let mut accumulators: BTreeMap<u32, PeriodAccumulator> = BTreeMap::new();
        let mut plan_suppressed = 0;
        for (index, entry) in located {
            if entry.value_type == ValueType::Plan
                && ist_cells.contains(&(index, entry.category.as_deref()))
            {
                plan_suppressed += 1;
                continue;
            }
            accumulators.entry(index).or_default().add(entry);
        }

        // Sequential pass: the closing balance of period k seeds period k+1.
        let mut periods = Vec::with_capacity(plan.period_count as usize);
        let mut total_inflow = 0;
        let mut total_outflow = 0;
        let mut opening = plan.opening_balance_cents;
        for index in 0..plan.period_count {
            let accumulator = accumulators.remove(&index).unwrap_or_default();
            total_inflow += accumulator.inflow_cents;
            total_outflow += accumulator.outflow_cents;
            let closing =
                opening + accumulator.inflow_cents + accumulator.outflow_cents;
            periods.push(accumulator.into_aggregate(
                index,
                period_start_date(plan, index),
                opening,
                closing,
            ));
            opening = closing;
        }

        AggregationReport {
            case_id,
            plan_id: plan.id,
            periods,
            warnings,
            total_inflow_cents: total_inflow,
            total_outflow_cents: total_outflow,
            plan_suppressed,
        }
    }
}

#[derive(Default)]
struct PeriodAccumulator {
    inflow_cents: i64,
    outflow_cents: i64,
    estate_totals: EstateSplit,
    categories: BTreeMap<Option<String>, (EstateSplit, usize)>,
}

impl PeriodAccumulator {
    fn add(&mut self, entry: &LedgerEntry) {
        if entry.amount_cents >= 0 {
            self.inflow_cents += entry.amount_cents;
        } else {
            self.outflow_cents += entry.amount_cents;
        }

        // Unresolved entries count as fully new estate until the resolver
        // or a reviewer says otherwise.
        let default_assignment =
            EstateAssignment::neumasse(AllocationSource::Unresolved, None);
        let assignment = entry.estate.as_ref().unwrap_or(&default_assignment);
        let (altmasse, neumasse) = assignment.split_cents(entry.amount_cents);

        self.estate_totals.accumulate(altmasse, neumasse);
        let (split, count) = self
            .categories
            .entry(entry.category.clone())
            .or_default();
        split.accumulate(altmasse, neumasse);
        *count += 1;
    }

    fn into_aggregate(
        self,
        period_index: u32,
        start_date: NaiveDate,
        opening_balance_cents: i64,
        closing_balance_cents: i64,
    ) -> PeriodAggregate {
        let categories = self
            .categories
            .into_iter()
            .map(|(category, (split, entry_count))| CategoryAggregate {
                category,
                split,
                entry_count,
            })
            .collect();
        PeriodAggregate {
            period_index,
            start_date,
            opening_balance_cents,
            inflow_cents: self.inflow_cents,
            outflow_cents: self.outflow_cents,
            closing_balance_cents,
            estate_totals: self.estate_totals,
            categories,
        }
    }
}
