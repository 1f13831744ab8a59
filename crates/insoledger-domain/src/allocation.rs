//! Alt-/Neumasse allocation model and contractual override rules.

use std::fmt;

use chrono::NaiveDate;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Identifiable;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Which insolvency estate a cash movement belongs to.
pub enum EstateAllocation {
    /// Entirely pre-opening estate.
    Altmasse,
    /// Entirely post-opening estate.
    Neumasse,
    /// Split across both estates according to the ratio.
    Mixed,
    /// No automatic assignment possible; review required.
    Unknown,
}

impl fmt::Display for EstateAllocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EstateAllocation::Altmasse => "Altmasse",
            EstateAllocation::Neumasse => "Neumasse",
            EstateAllocation::Mixed => "Mixed",
            EstateAllocation::Unknown => "Unknown",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Provenance of an estate assignment. Manual assignments are sticky and
/// never overwritten by the resolver.
pub enum AllocationSource {
    Manual,
    Contractual,
    DateRule,
    /// Date-default fallback taken without a resolvable counterparty.
    Unresolved,
}

impl fmt::Display for AllocationSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            AllocationSource::Manual => "Manual",
            AllocationSource::Contractual => "Contractual",
            AllocationSource::DateRule => "Date rule",
            AllocationSource::Unresolved => "Unresolved",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
/// Resolved estate split for one entry. The ratio is the Neumasse share.
pub struct EstateAssignment {
    pub allocation: EstateAllocation,
    pub ratio: Decimal,
    pub source: AllocationSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl EstateAssignment {
    pub fn altmasse(source: AllocationSource, note: Option<String>) -> Self {
        Self {
            allocation: EstateAllocation::Altmasse,
            ratio: Decimal::ZERO,
            source,
            note,
        }
    }

    pub fn neumasse(source: AllocationSource, note: Option<String>) -> Self {
        Self {
            allocation: EstateAllocation::Neumasse,
            ratio: Decimal::ONE,
            source,
            note,
        }
    }

    /// Builds an assignment from a Neumasse ratio, clamped to `[0, 1]`.
    /// Strictly fractional ratios yield `Mixed`.
    pub fn from_ratio(ratio: Decimal, source: AllocationSource, note: Option<String>) -> Self {
        let ratio = ratio.clamp(Decimal::ZERO, Decimal::ONE);
        let allocation = if ratio == Decimal::ZERO {
            EstateAllocation::Altmasse
        } else if ratio == Decimal::ONE {
            EstateAllocation::Neumasse
        } else {
            EstateAllocation::Mixed
        };
        Self {
            allocation,
            ratio,
            source,
            note,
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.source, AllocationSource::Manual)
    }

    /// Splits an amount into `(altmasse, neumasse)` cents. The Neumasse
    /// share is rounded half-to-even; the Altmasse share takes the exact
    /// remainder so both shares always reconstruct the original amount.
    pub fn split_cents(&self, amount_cents: i64) -> (i64, i64) {
        let neumasse = (Decimal::from(amount_cents) * self.ratio)
            .round_dp_with_strategy(0, RoundingStrategy::MidpointNearestEven)
            .to_i64()
            // ratio is clamped to [0, 1]; the rounded product stays in i64
            .unwrap_or(amount_cents);
        (amount_cents - neumasse, neumasse)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Half-open date window `[from, to)`.
pub struct DateWindow {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

impl DateWindow {
    pub fn new(from: NaiveDate, to: NaiveDate) -> Self {
        Self { from, to }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        date >= self.from && date < self.to
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
/// Contractual override for the estate split of one payer class inside a
/// date window. Takes precedence over the date default, never over a
/// manually set assignment.
pub struct ContractOverrideRule {
    pub counterparty_category: String,
    pub window: DateWindow,
    /// Neumasse share granted by the contract clause.
    pub ratio: Decimal,
    pub note: String,
}

impl ContractOverrideRule {
    pub fn new(
        counterparty_category: impl Into<String>,
        window: DateWindow,
        ratio: Decimal,
        note: impl Into<String>,
    ) -> Self {
        Self {
            counterparty_category: counterparty_category.into(),
            window,
            ratio: ratio.clamp(Decimal::ZERO, Decimal::ONE),
            note: note.into(),
        }
    }

    /// Builds an override whose ratio is derived pro rata from a service
    /// window cut by the opening date (e.g. 3/31 Neumasse for an October
    /// settlement opened on the 29th).
    pub fn prorata(
        counterparty_category: impl Into<String>,
        window: DateWindow,
        service_start: NaiveDate,
        service_end: NaiveDate,
        opening_date: NaiveDate,
        note: impl Into<String>,
    ) -> Self {
        let ratio = prorata_ratio(service_start, service_end, opening_date);
        Self::new(counterparty_category, window, ratio, note)
    }

    pub fn applies_to(&self, category: &str, date: NaiveDate) -> bool {
        self.counterparty_category == category && self.window.contains(date)
    }

    pub fn assignment(&self) -> EstateAssignment {
        EstateAssignment::from_ratio(
            self.ratio,
            AllocationSource::Contractual,
            Some(self.note.clone()),
        )
    }
}

/// Neumasse share of a service window cut by the opening date: days on or
/// after the opening date over total days, both ends inclusive.
pub fn prorata_ratio(
    service_start: NaiveDate,
    service_end: NaiveDate,
    opening_date: NaiveDate,
) -> Decimal {
    if service_end < service_start {
        return Decimal::ZERO;
    }
    if service_end < opening_date {
        return Decimal::ZERO;
    }
    if service_start >= opening_date {
        return Decimal::ONE;
    }
    let total_days = (service_end - service_start).num_days() + 1;
    let altmasse_days = (opening_date - service_start).num_days();
    let neumasse_days = total_days - altmasse_days;
    Decimal::from(neumasse_days) / Decimal::from(total_days)
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
/// Case-level allocation parameters: the legal opening date plus the
/// ordered contractual override list.
pub struct AllocationConfig {
    pub opening_date: NaiveDate,
    #[serde(default)]
    pub overrides: Vec<ContractOverrideRule>,
}

impl AllocationConfig {
    pub fn new(opening_date: NaiveDate) -> Self {
        Self {
            opening_date,
            overrides: Vec::new(),
        }
    }

    /// First override matching the payer class and date, in list order.
    pub fn override_for(&self, category: &str, date: NaiveDate) -> Option<&ContractOverrideRule> {
        self.overrides
            .iter()
            .find(|rule| rule.applies_to(category, date))
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Payer or payee identity an entry can be linked to. The category is what
/// contractual override rules key on.
pub struct Counterparty {
    pub id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
}

impl Counterparty {
    pub fn new(name: impl Into<String>, category: Option<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            category,
        }
    }
}

impl Identifiable for Counterparty {
    fn id(&self) -> Uuid {
        self.id
    }
}
