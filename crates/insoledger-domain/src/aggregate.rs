//! Derived period aggregates for the rolling liquidity forecast.
//!
//! Aggregates are recomputable at any time and are never persisted as a
//! source of truth; the report intentionally carries no timestamp so two
//! runs over the same inputs are bit-identical.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Amount split across the two estates, in cents.
pub struct EstateSplit {
    pub altmasse_cents: i64,
    pub neumasse_cents: i64,
}

impl EstateSplit {
    pub fn total_cents(&self) -> i64 {
        self.altmasse_cents + self.neumasse_cents
    }

    pub fn accumulate(&mut self, altmasse_cents: i64, neumasse_cents: i64) {
        self.altmasse_cents += altmasse_cents;
        self.neumasse_cents += neumasse_cents;
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Per-category subtotal of one period, split by estate. `None` collects
/// entries whose category is still unassigned.
pub struct CategoryAggregate {
    pub category: Option<String>,
    pub split: EstateSplit,
    pub entry_count: usize,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct PeriodAggregate {
    pub period_index: u32,
    pub start_date: NaiveDate,
    pub opening_balance_cents: i64,
    /// Sum of positive amounts in the period.
    pub inflow_cents: i64,
    /// Sum of negative amounts in the period; stored negative.
    pub outflow_cents: i64,
    pub closing_balance_cents: i64,
    pub estate_totals: EstateSplit,
    /// Sorted by category key; unassigned entries come first.
    pub categories: Vec<CategoryAggregate>,
}

impl PeriodAggregate {
    pub fn net_cashflow_cents(&self) -> i64 {
        self.inflow_cents + self.outflow_cents
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Non-fatal finding produced during aggregation, e.g. an entry outside
/// the plan window.
pub struct AggregationWarning {
    pub entry_id: Uuid,
    pub transaction_date: NaiveDate,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct AggregationReport {
    pub case_id: Uuid,
    pub plan_id: Uuid,
    pub periods: Vec<PeriodAggregate>,
    pub warnings: Vec<AggregationWarning>,
    pub total_inflow_cents: i64,
    pub total_outflow_cents: i64,
    /// PLAN entries excluded because IST data covered their period and
    /// category.
    pub plan_suppressed: usize,
}

impl AggregationReport {
    pub fn closing_balance_cents(&self) -> i64 {
        self.periods
            .last()
            .map(|period| period.closing_balance_cents)
            .unwrap_or(0)
    }
}
