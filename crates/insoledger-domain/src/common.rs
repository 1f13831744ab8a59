//! Shared enums and traits for ledger primitives.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Exposes a stable identifier for entities stored in the ledger.
pub trait Identifiable {
    fn id(&self) -> Uuid;
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
/// Distinguishes realized cash movements from forecast ones.
pub enum ValueType {
    Ist,
    Plan,
}

impl fmt::Display for ValueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ValueType::Ist => "IST",
            ValueType::Plan => "PLAN",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Direction of a cash movement. Derived from the amount sign, never stored.
pub enum FlowType {
    Inflow,
    Outflow,
}

impl FlowType {
    /// Positive amounts flow in, negative amounts flow out.
    pub fn from_amount(amount_cents: i64) -> Self {
        if amount_cents >= 0 {
            FlowType::Inflow
        } else {
            FlowType::Outflow
        }
    }
}

impl fmt::Display for FlowType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FlowType::Inflow => "Inflow",
            FlowType::Outflow => "Outflow",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Review lifecycle state of a ledger entry.
#[derive(Default)]
pub enum ReviewStatus {
    #[default]
    Unreviewed,
    Confirmed,
    Adjusted,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ReviewStatus::Unreviewed => "Unreviewed",
            ReviewStatus::Confirmed => "Confirmed",
            ReviewStatus::Adjusted => "Adjusted",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Coarse legal classification of a ledger entry.
pub enum LegalBucket {
    /// Part of the insolvency estate.
    Masse,
    /// Subject to a segregation right.
    Absonderung,
    /// Neither estate-relevant nor segregated.
    Neutral,
}

impl fmt::Display for LegalBucket {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            LegalBucket::Masse => "Masse",
            LegalBucket::Absonderung => "Absonderung",
            LegalBucket::Neutral => "Neutral",
        };
        f.write_str(label)
    }
}
