//! Ledger entries, the single source of truth for every cash movement.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::allocation::EstateAssignment;
use crate::common::{FlowType, Identifiable, LegalBucket, ReviewStatus, ValueType};
use crate::rule::ServiceDateRule;

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
/// A machine-produced suggestion for a single field, kept structurally
/// apart from the authoritative value it shadows. Suggestions are written
/// only by the classification and allocation engines and promoted only by
/// review governance.
pub struct Suggested<T> {
    pub value: T,
    pub confidence: f64,
    pub rule_id: Uuid,
}

impl<T> Suggested<T> {
    pub fn new(value: T, confidence: f64, rule_id: Uuid) -> Self {
        Self {
            value,
            confidence,
            rule_id,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Billing period an amount pertains to, independent of its cash date.
pub struct ServicePeriod {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl ServicePeriod {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Service period derived by a rule, together with the rule variant that
/// produced it.
pub struct ServiceDateSuggestion {
    pub rule: ServiceDateRule,
    pub period: ServicePeriod,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq, Eq)]
/// Normalized import fields rules are allowed to match on. Raw import rows
/// never reach the ledger; these stable keys do.
pub struct NormalizedFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operator_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub billing_period: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_hint: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_id: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize, PartialEq)]
/// Review lifecycle state attached to an entry.
pub struct ReviewState {
    pub status: ReviewStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewed_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub change_reason: Option<String>,
    /// Snapshot taken before an adjusting amount correction.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_amount_cents: Option<i64>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LedgerEntry {
    pub id: Uuid,
    pub case_id: Uuid,
    /// Calendar date of the cash effect, not the booking date.
    pub transaction_date: NaiveDate,
    /// Signed minor-currency units; the sign determines the flow direction.
    pub amount_cents: i64,
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub value_type: ValueType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub legal_bucket: Option<LegalBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_period: Option<ServicePeriod>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bank_account_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub counterparty_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location_id: Option<Uuid>,
    /// Paired entry of an internal transfer; paired entries are excluded
    /// from aggregation by default.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_partner_entry_id: Option<Uuid>,
    #[serde(default)]
    pub normalized: NormalizedFields,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estate: Option<EstateAssignment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_legal_bucket: Option<Suggested<LegalBucket>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category: Option<Suggested<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_bank_account_id: Option<Suggested<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_counterparty_id: Option<Suggested<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_location_id: Option<Suggested<Uuid>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_service_period: Option<Suggested<ServiceDateSuggestion>>,
    #[serde(default)]
    pub review: ReviewState,
    /// Lineage to the insolvency effect that generated this entry; `None`
    /// for imported and manually entered rows.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_effect_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl LedgerEntry {
    pub fn new(
        case_id: Uuid,
        transaction_date: NaiveDate,
        amount_cents: i64,
        description: impl Into<String>,
        value_type: ValueType,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            case_id,
            transaction_date,
            amount_cents,
            description: description.into(),
            note: None,
            value_type,
            legal_bucket: None,
            category: None,
            service_period: None,
            bank_account_id: None,
            counterparty_id: None,
            location_id: None,
            transfer_partner_entry_id: None,
            normalized: NormalizedFields::default(),
            estate: None,
            suggested_legal_bucket: None,
            suggested_category: None,
            suggested_bank_account_id: None,
            suggested_counterparty_id: None,
            suggested_location_id: None,
            suggested_service_period: None,
            review: ReviewState::default(),
            source_effect_id: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn flow_type(&self) -> FlowType {
        FlowType::from_amount(self.amount_cents)
    }

    pub fn is_transfer_pair(&self) -> bool {
        self.transfer_partner_entry_id.is_some()
    }

    pub fn is_manual_allocation(&self) -> bool {
        self.estate
            .as_ref()
            .map(EstateAssignment::is_manual)
            .unwrap_or(false)
    }

    pub fn has_suggestion(&self) -> bool {
        self.suggested_legal_bucket.is_some()
            || self.suggested_category.is_some()
            || self.suggested_bank_account_id.is_some()
            || self.suggested_counterparty_id.is_some()
            || self.suggested_location_id.is_some()
            || self.suggested_service_period.is_some()
    }

    pub fn clear_suggestions(&mut self) {
        self.suggested_legal_bucket = None;
        self.suggested_category = None;
        self.suggested_bank_account_id = None;
        self.suggested_counterparty_id = None;
        self.suggested_location_id = None;
        self.suggested_service_period = None;
    }
}

impl Identifiable for LedgerEntry {
    fn id(&self) -> Uuid {
        self.id
    }
}
