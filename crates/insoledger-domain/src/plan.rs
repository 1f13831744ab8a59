//! Plan configuration consumed by period math and aggregation.

use std::fmt;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::Identifiable;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PeriodType {
    Weekly,
    Monthly,
}

impl fmt::Display for PeriodType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            PeriodType::Weekly => "Weekly",
            PeriodType::Monthly => "Monthly",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Parameters of one liquidity plan: the period grid and the opening
/// balance that seeds the running-balance fold.
pub struct PlanConfig {
    pub id: Uuid,
    pub case_id: Uuid,
    pub start_date: NaiveDate,
    pub period_type: PeriodType,
    pub period_count: u32,
    pub opening_balance_cents: i64,
}

impl PlanConfig {
    pub fn new(
        case_id: Uuid,
        start_date: NaiveDate,
        period_type: PeriodType,
        period_count: u32,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            start_date,
            period_type,
            period_count,
            opening_balance_cents: 0,
        }
    }
}

impl Identifiable for PlanConfig {
    fn id(&self) -> Uuid {
        self.id
    }
}
