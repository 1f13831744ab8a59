//! User-maintained classification rules and their matcher vocabulary.

use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::common::{Identifiable, LegalBucket};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Normalized entry fields a rule may match on. Rules never see raw import
/// rows; the vocabulary is fixed.
pub enum MatchField {
    Description,
    LocationHint,
    CounterpartyHint,
    OperatorId,
    BillingPeriod,
    CategoryHint,
    AccountName,
    PayerId,
    ReferenceId,
    /// Matched via `AmountRange` only.
    Amount,
}

impl MatchField {
    pub fn is_textual(&self) -> bool {
        !matches!(self, MatchField::Amount)
    }
}

impl fmt::Display for MatchField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchField::Description => "Description",
            MatchField::LocationHint => "Location hint",
            MatchField::CounterpartyHint => "Counterparty hint",
            MatchField::OperatorId => "Operator id",
            MatchField::BillingPeriod => "Billing period",
            MatchField::CategoryHint => "Category hint",
            MatchField::AccountName => "Account name",
            MatchField::PayerId => "Payer id",
            MatchField::ReferenceId => "Reference id",
            MatchField::Amount => "Amount",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Closed set of matcher kinds. Text matchers compare case-insensitively on
/// trimmed values; `AmountRange` is an inclusive interval test.
pub enum MatchType {
    Contains,
    StartsWith,
    EndsWith,
    Equals,
    Regex,
    AmountRange,
}

impl MatchType {
    /// Base confidence granted by the matcher alone; exact matches score
    /// highest, broad interval tests lowest.
    pub fn base_confidence(&self) -> f64 {
        match self {
            MatchType::Equals => 0.9,
            MatchType::StartsWith | MatchType::EndsWith => 0.8,
            MatchType::Regex => 0.75,
            MatchType::Contains => 0.7,
            MatchType::AmountRange => 0.6,
        }
    }
}

impl fmt::Display for MatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            MatchType::Contains => "contains",
            MatchType::StartsWith => "starts with",
            MatchType::EndsWith => "ends with",
            MatchType::Equals => "equals",
            MatchType::Regex => "matches pattern",
            MatchType::AmountRange => "within amount range",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
/// Maps a payment month to the billing month it pertains to.
pub enum ServiceDateRule {
    /// Payment in month M settles services of month M.
    SameMonth,
    /// Payment in month M settles services of month M-1.
    PreviousMonth,
}

impl fmt::Display for ServiceDateRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ServiceDateRule::SameMonth => "Same month",
            ServiceDateRule::PreviousMonth => "Previous month",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
/// Ordered, user-maintained classification rule. Deactivation is a soft
/// flag so match history stays attributable.
pub struct ClassificationRule {
    pub id: Uuid,
    pub case_id: Uuid,
    pub name: String,
    pub is_active: bool,
    /// Lower values evaluate first.
    pub priority: i32,
    pub match_field: MatchField,
    pub match_type: MatchType,
    pub match_value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_legal_bucket: Option<LegalBucket>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_bank_account_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_counterparty_id: Option<Uuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assign_location_id: Option<Uuid>,
    #[serde(default)]
    pub confidence_bonus: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_date_rule: Option<ServiceDateRule>,
}

impl ClassificationRule {
    pub fn new(
        case_id: Uuid,
        name: impl Into<String>,
        match_field: MatchField,
        match_type: MatchType,
        match_value: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            case_id,
            name: name.into(),
            is_active: true,
            priority: 100,
            match_field,
            match_type,
            match_value: match_value.into(),
            suggested_category: None,
            suggested_legal_bucket: None,
            assign_bank_account_id: None,
            assign_counterparty_id: None,
            assign_location_id: None,
            confidence_bonus: 0.0,
            service_date_rule: None,
        }
    }

    /// True when the rule carries at least one suggestion or assignment.
    pub fn has_payload(&self) -> bool {
        self.suggested_category.is_some()
            || self.suggested_legal_bucket.is_some()
            || self.assign_bank_account_id.is_some()
            || self.assign_counterparty_id.is_some()
            || self.assign_location_id.is_some()
            || self.service_date_rule.is_some()
    }

    pub fn deactivate(&mut self) {
        self.is_active = false;
    }
}

impl Identifiable for ClassificationRule {
    fn id(&self) -> Uuid {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn base_confidence_orders_matchers_by_precision() {
        assert!(MatchType::Equals.base_confidence() > MatchType::StartsWith.base_confidence());
        assert!(MatchType::StartsWith.base_confidence() > MatchType::Contains.base_confidence());
        assert!(MatchType::Contains.base_confidence() > MatchType::AmountRange.base_confidence());
    }

    #[test]
    fn payload_detection_covers_every_target() {
        let case_id = Uuid::new_v4();
        let mut rule = ClassificationRule::new(
            case_id,
            "rent",
            MatchField::Description,
            MatchType::Contains,
            "Miete",
        );
        assert!(!rule.has_payload());
        rule.suggested_legal_bucket = Some(LegalBucket::Neutral);
        assert!(rule.has_payload());
        rule.suggested_legal_bucket = None;
        rule.service_date_rule = Some(ServiceDateRule::PreviousMonth);
        assert!(rule.has_payload());
    }
}
