use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use insoledger_domain::{
    AllocationConfig, ContractOverrideRule, DateWindow, PeriodType, PlanConfig,
};

use crate::ConfigError;

/// On-disk case settings: everything the surrounding application agrees on
/// before the engines run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CaseSettings {
    pub case_id: Uuid,
    pub case_name: String,
    /// Legal opening date of the insolvency proceedings.
    pub opening_date: NaiveDate,
    pub plan: PlanSettings,
    #[serde(default)]
    pub overrides: Vec<OverrideSettings>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanSettings {
    pub id: Uuid,
    pub start_date: NaiveDate,
    pub period_type: PeriodType,
    pub period_count: u32,
    #[serde(default)]
    pub opening_balance_cents: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
/// One contractual override clause as it appears in the settings file.
pub struct OverrideSettings {
    pub counterparty_category: String,
    pub valid_from: NaiveDate,
    pub valid_to: NaiveDate,
    /// Neumasse share granted by the clause.
    pub neumasse_ratio: Decimal,
    pub note: String,
}

impl CaseSettings {
    /// Rejects settings no engine should ever see: empty plans, inverted
    /// windows, out-of-range ratios.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.plan.period_count == 0 {
            return Err(ConfigError::Invalid("plan has zero periods".into()));
        }
        for rule in &self.overrides {
            if rule.valid_from >= rule.valid_to {
                return Err(ConfigError::Invalid(format!(
                    "override `{}` has an empty validity window",
                    rule.note
                )));
            }
            if rule.neumasse_ratio < Decimal::ZERO || rule.neumasse_ratio > Decimal::ONE {
                return Err(ConfigError::Invalid(format!(
                    "override `{}` has ratio {} outside [0, 1]",
                    rule.note, rule.neumasse_ratio
                )));
            }
        }
        Ok(())
    }

    pub fn plan_config(&self) -> PlanConfig {
        PlanConfig {
            id: self.plan.id,
            case_id: self.case_id,
            start_date: self.plan.start_date,
            period_type: self.plan.period_type,
            period_count: self.plan.period_count,
            opening_balance_cents: self.plan.opening_balance_cents,
        }
    }

    pub fn allocation_config(&self) -> AllocationConfig {
        AllocationConfig {
            opening_date: self.opening_date,
            overrides: self
                .overrides
                .iter()
                .map(|rule| {
                    ContractOverrideRule::new(
                        rule.counterparty_category.clone(),
                        DateWindow::new(rule.valid_from, rule.valid_to),
                        rule.neumasse_ratio,
                        rule.note.clone(),
                    )
                })
                .collect(),
        }
    }
}
