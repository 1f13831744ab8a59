//! One-off plan effects that materialize into PLAN ledger entries.

use std::collections::BTreeMap;
use std::fmt;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Identifiable, LegalBucket};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum EffectType {
    Inflow,
    Outflow,
}

impl fmt::Display for EffectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EffectType::Inflow => "Inflow",
            EffectType::Outflow => "Outflow",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Coarse grouping of insolvency-specific plan effects.
pub enum EffectGroup {
    ProcedureCost,
    WagePrefinancing,
    WageRepayment,
    Other,
}

impl EffectGroup {
    /// Legal bucket the derived ledger entries carry by default.
    pub fn default_bucket(&self) -> Option<LegalBucket> {
        match self {
            EffectGroup::ProcedureCost => Some(LegalBucket::Masse),
            _ => None,
        }
    }
}

impl fmt::Display for EffectGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EffectGroup::ProcedureCost => "Procedure cost",
            EffectGroup::WagePrefinancing => "Wage prefinancing",
            EffectGroup::WageRepayment => "Wage repayment",
            EffectGroup::Other => "Other",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
/// A one-off, period-anchored plan line. Not itself part of the ledger; it
/// becomes ledger rows only through the transfer engine, which keeps the
/// lineage link for safe re-transfer.
pub struct InsolvencyEffect {
    pub id: Uuid,
    pub case_id: Uuid,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub effect_type: EffectType,
    pub effect_group: EffectGroup,
    /// Unsigned cents per period offset; the effect type supplies the sign.
    #[serde(default)]
    pub amounts_by_period: BTreeMap<u32, i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    /// Neumasse share the derived entries inherit; defaults to fully new
    /// estate when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estate_ratio: Option<Decimal>,
    pub is_active: bool,
}

impl InsolvencyEffect {
    pub fn new(
        case_id: Uuid,
        name: impl Into<String>,
        effect_type: EffectType,
        effect_group: EffectGroup,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            name: name.into(),
            note: None,
            effect_type,
            effect_group,
            amounts_by_period: BTreeMap::new(),
            category: None,
            estate_ratio: None,
            is_active: true,
        }
    }

    /// Sets the amount for one period; zero removes the period entirely.
    pub fn set_amount(&mut self, period_index: u32, amount_cents: i64) {
        if amount_cents == 0 {
            self.amounts_by_period.remove(&period_index);
        } else {
            self.amounts_by_period
                .insert(period_index, amount_cents.abs());
        }
    }

    pub fn has_amounts(&self) -> bool {
        self.amounts_by_period.values().any(|cents| *cents != 0)
    }

    /// Applies the effect type's sign to a per-period amount.
    pub fn signed_amount(&self, amount_cents: i64) -> i64 {
        match self.effect_type {
            EffectType::Inflow => amount_cents.abs(),
            EffectType::Outflow => -amount_cents.abs(),
        }
    }
}

impl Identifiable for InsolvencyEffect {
    fn id(&self) -> Uuid {
        self.id
    }
}
