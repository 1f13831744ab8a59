//! Rule-based classification of ledger entries.
//!
//! The engine produces suggestions only; authoritative fields are touched
//! exclusively by review governance. Rules are validated when they are
//! saved, so match time never sees an unparseable pattern.

use chrono::{Datelike, NaiveDate};
use regex::{Regex, RegexBuilder};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use tracing::{debug, warn};
use uuid::Uuid;

use insoledger_domain::{
    ClassificationRule, LedgerEntry, LegalBucket, MatchField, MatchType, ReviewStatus,
    ServiceDateRule, ServiceDateSuggestion, ServicePeriod, Suggested,
};

use crate::period::{days_in_month, shift_month};
use crate::{CoreError, EntryFilter, LedgerStore};

/// Counters returned by a classification batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationOutcome {
    pub classified: usize,
    pub unchanged: usize,
    pub errors: usize,
}

/// Suggestion coverage over the unreviewed entries of a case.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ClassificationStats {
    pub total_unreviewed: usize,
    pub with_suggestion: usize,
    pub without_suggestion: usize,
    /// Confidence above 0.8.
    pub high_confidence: usize,
    /// Confidence between 0.5 and 0.8.
    pub medium_confidence: usize,
    /// Confidence below 0.5.
    pub low_confidence: usize,
}

enum Matcher {
    Contains(String),
    StartsWith(String),
    EndsWith(String),
    Equals(String),
    Regex(Regex),
    AmountRange {
        min_cents: Option<i64>,
        max_cents: Option<i64>,
    },
}

struct CompiledRule {
    rule: ClassificationRule,
    matcher: Matcher,
}

struct RuleSuggestion {
    rule_id: Uuid,
    confidence: f64,
    category: Option<String>,
    legal_bucket: Option<LegalBucket>,
    bank_account_id: Option<Uuid>,
    counterparty_id: Option<Uuid>,
    location_id: Option<Uuid>,
    service: Option<ServiceDateSuggestion>,
}

pub struct ClassificationService;

impl ClassificationService {
    /// Validates a rule definition the way the rule editor must before
    /// saving: the pattern has to compile, amount bounds have to parse, and
    /// the rule has to carry at least one suggestion payload.
    pub fn validate_rule(rule: &ClassificationRule) -> Result<(), CoreError> {
        compile_matcher(rule).map_err(|message| CoreError::InvalidRule {
            name: rule.name.clone(),
            message,
        })?;
        if !rule.has_payload() {
            return Err(CoreError::InvalidRule {
                name: rule.name.clone(),
                message: "rule assigns nothing; add a suggestion or dimension target".into(),
            });
        }
        if !(0.0..=1.0).contains(&rule.confidence_bonus) {
            return Err(CoreError::InvalidRule {
                name: rule.name.clone(),
                message: format!(
                    "confidence bonus {} outside [0, 1]",
                    rule.confidence_bonus
                ),
            });
        }
        Ok(())
    }

    /// Classifies the given entries, or every unreviewed entry of the case
    /// that has no suggestion yet. Per-entry failures are isolated and
    /// counted; the batch never aborts on a single bad entry.
    pub fn classify_batch(
        store: &dyn LedgerStore,
        case_id: Uuid,
        entry_ids: Option<&[Uuid]>,
    ) -> Result<ClassificationOutcome, CoreError> {
        let rules = compiled_rules(store, case_id)?;
        let filter = match entry_ids {
            Some(ids) => EntryFilter::ids(ids.to_vec()),
            None => EntryFilter {
                review_status: Some(ReviewStatus::Unreviewed),
                without_suggestion: true,
                ..EntryFilter::default()
            },
        };
        let entries = store.entries(case_id, &filter)?;

        let mut outcome = ClassificationOutcome::default();
        for entry in entries {
            match suggestion_for(&entry, &rules) {
                Some(suggestion) => {
                    let result = store.update_entry(entry.id, &mut |row| {
                        apply_suggestion(row, &suggestion);
                    });
                    match result {
                        Ok(_) => outcome.classified += 1,
                        Err(err) => {
                            warn!(entry = %entry.id, error = %err, "suggestion write failed");
                            outcome.errors += 1;
                        }
                    }
                }
                // No rule matched; the entry surfaces for manual triage.
                None => outcome.unchanged += 1,
            }
        }
        debug!(
            case = %case_id,
            classified = outcome.classified,
            unchanged = outcome.unchanged,
            errors = outcome.errors,
            "classification batch finished"
        );
        Ok(outcome)
    }

    /// Clears the suggestions of every unreviewed entry and classifies
    /// again. Useful after the rule set changed.
    pub fn reclassify_unreviewed(
        store: &dyn LedgerStore,
        case_id: Uuid,
    ) -> Result<ClassificationOutcome, CoreError> {
        let filter = EntryFilter {
            review_status: Some(ReviewStatus::Unreviewed),
            ..EntryFilter::default()
        };
        for entry in store.entries(case_id, &filter)? {
            store.update_entry(entry.id, &mut |row| row.clear_suggestions())?;
        }
        Self::classify_batch(store, case_id, None)
    }

    pub fn classification_stats(
        store: &dyn LedgerStore,
        case_id: Uuid,
    ) -> Result<ClassificationStats, CoreError> {
        let filter = EntryFilter {
            review_status: Some(ReviewStatus::Unreviewed),
            ..EntryFilter::default()
        };
        let mut stats = ClassificationStats::default();
        for entry in store.entries(case_id, &filter)? {
            stats.total_unreviewed += 1;
            let confidence = entry
                .suggested_legal_bucket
                .as_ref()
                .map(|s| s.confidence)
                .or_else(|| entry.suggested_category.as_ref().map(|s| s.confidence));
            match confidence {
                Some(confidence) => {
                    stats.with_suggestion += 1;
                    if confidence > 0.8 {
                        stats.high_confidence += 1;
                    } else if confidence >= 0.5 {
                        stats.medium_confidence += 1;
                    } else {
                        stats.low_confidence += 1;
                    }
                }
                None => stats.without_suggestion += 1,
            }
        }
        Ok(stats)
    }
}

/// Active rules of the case, compiled and ordered by ascending priority.
/// Rules that fail to compile are skipped with a warning; the save-time
/// validation should have rejected them already.
fn compiled_rules(store: &dyn LedgerStore, case_id: Uuid) -> Result<Vec<CompiledRule>, CoreError> {
    let mut rules: Vec<ClassificationRule> = store
        .rules(case_id)?
        .into_iter()
        .filter(|rule| rule.is_active)
        .collect();
    rules.sort_by(|a, b| a.priority.cmp(&b.priority).then(a.name.cmp(&b.name)));

    let mut compiled = Vec::with_capacity(rules.len());
    for rule in rules {
        match compile_matcher(&rule) {
            Ok(matcher) => compiled.push(CompiledRule { rule, matcher }),
            Err(reason) => warn!(rule = %rule.name, reason, "skipping invalid rule"),
        }
    }
    Ok(compiled)
}

fn compile_matcher(rule: &ClassificationRule) -> Result<Matcher, String> {
    match rule.match_type {
        MatchType::AmountRange => {
            if rule.match_field != MatchField::Amount {
                return Err("amount ranges match the Amount field only".into());
            }
            let (min_cents, max_cents) = parse_amount_range(&rule.match_value)?;
            Ok(Matcher::AmountRange {
                min_cents,
                max_cents,
            })
        }
        MatchType::Regex => {
            if !rule.match_field.is_textual() {
                return Err("pattern matchers need a textual field".into());
            }
            let regex = RegexBuilder::new(&rule.match_value)
                .case_insensitive(true)
                .build()
                .map_err(|err| format!("unparseable pattern: {err}"))?;
            Ok(Matcher::Regex(regex))
        }
        text => {
            if !rule.match_field.is_textual() {
                return Err("text matchers need a textual field".into());
            }
            let pattern = rule.match_value.trim().to_lowercase();
            if pattern.is_empty() {
                return Err("empty match value".into());
            }
            Ok(match text {
                MatchType::Contains => Matcher::Contains(pattern),
                MatchType::StartsWith => Matcher::StartsWith(pattern),
                MatchType::EndsWith => Matcher::EndsWith(pattern),
                MatchType::Equals => Matcher::Equals(pattern),
                // Covered by the outer arms.
                MatchType::Regex | MatchType::AmountRange => unreachable!(),
            })
        }
    }
}

/// Bounds come as EUR decimals in `min-max` form with either end optional:
/// `100-500`, `100-`, `-500`. Both ends are inclusive.
fn parse_amount_range(value: &str) -> Result<(Option<i64>, Option<i64>), String> {
    let trimmed = value.trim();
    let Some((min_raw, max_raw)) = trimmed.split_once('-') else {
        return Err(format!("amount range `{trimmed}` is not in min-max form"));
    };
    let min_cents = parse_eur_cents(min_raw)?;
    let max_cents = parse_eur_cents(max_raw)?;
    if min_cents.is_none() && max_cents.is_none() {
        return Err("amount range needs at least one bound".into());
    }
    if let (Some(min), Some(max)) = (min_cents, max_cents) {
        if min > max {
            return Err(format!("amount range `{trimmed}` has min above max"));
        }
    }
    Ok((min_cents, max_cents))
}

fn parse_eur_cents(raw: &str) -> Result<Option<i64>, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }
    let value: Decimal = trimmed
        .parse()
        .map_err(|_| format!("`{trimmed}` is not a number"))?;
    if value.is_sign_negative() {
        return Err(format!("amount bound `{trimmed}` must not be negative"));
    }
    (value * Decimal::from(100))
        .round()
        .to_i64()
        .map(Some)
        .ok_or_else(|| format!("amount bound `{trimmed}` is out of range"))
}

fn suggestion_for(entry: &LedgerEntry, rules: &[CompiledRule]) -> Option<RuleSuggestion> {
    for compiled in rules {
        if !rule_matches(compiled, entry) {
            continue;
        }
        let rule = &compiled.rule;
        let confidence =
            (rule.match_type.base_confidence() + rule.confidence_bonus).min(1.0);
        let service = rule
            .service_date_rule
            .map(|service_rule| ServiceDateSuggestion {
                rule: service_rule,
                period: service_period(entry.transaction_date, service_rule),
            });
        // First matching rule wins.
        return Some(RuleSuggestion {
            rule_id: rule.id,
            confidence,
            category: rule.suggested_category.clone(),
            legal_bucket: rule.suggested_legal_bucket,
            bank_account_id: rule.assign_bank_account_id,
            counterparty_id: rule.assign_counterparty_id,
            location_id: rule.assign_location_id,
            service,
        });
    }
    None
}

fn rule_matches(compiled: &CompiledRule, entry: &LedgerEntry) -> bool {
    match &compiled.matcher {
        Matcher::AmountRange {
            min_cents,
            max_cents,
        } => {
            let amount = entry.amount_cents.abs();
            min_cents.map_or(true, |min| amount >= min)
                && max_cents.map_or(true, |max| amount <= max)
        }
        matcher => {
            let Some(value) = field_value(entry, compiled.rule.match_field) else {
                return false;
            };
            match matcher {
                Matcher::Contains(pattern) => normalized(value).contains(pattern),
                Matcher::StartsWith(pattern) => normalized(value).starts_with(pattern),
                Matcher::EndsWith(pattern) => normalized(value).ends_with(pattern),
                Matcher::Equals(pattern) => normalized(value) == *pattern,
                Matcher::Regex(regex) => regex.is_match(value),
                Matcher::AmountRange { .. } => false,
            }
        }
    }
}

fn normalized(value: &str) -> String {
    value.trim().to_lowercase()
}

fn field_value(entry: &LedgerEntry, field: MatchField) -> Option<&str> {
    let fields = &entry.normalized;
    match field {
        MatchField::Description => Some(entry.description.as_str()),
        MatchField::LocationHint => fields.location_hint.as_deref(),
        MatchField::CounterpartyHint => fields.counterparty_hint.as_deref(),
        MatchField::OperatorId => fields.operator_id.as_deref(),
        MatchField::BillingPeriod => fields.billing_period.as_deref(),
        MatchField::CategoryHint => fields.category_hint.as_deref(),
        MatchField::AccountName => fields.account_name.as_deref(),
        MatchField::PayerId => fields.payer_id.as_deref(),
        MatchField::ReferenceId => fields.reference_id.as_deref(),
        MatchField::Amount => None,
    }
}

/// Calendar month the payment settles, per the rule variant.
fn service_period(transaction_date: NaiveDate, rule: ServiceDateRule) -> ServicePeriod {
    let month_first = transaction_date
        .with_day(1)
        .unwrap_or(transaction_date);
    let start = match rule {
        ServiceDateRule::SameMonth => month_first,
        ServiceDateRule::PreviousMonth => shift_month(month_first, -1),
    };
    let end = start
        .with_day(days_in_month(start.year(), start.month()))
        .unwrap_or(start);
    ServicePeriod::new(start, end)
}

/// Writes the winning rule's payload into the entry's suggestion fields.
/// Every shadow field is rewritten so a later run with a different winning
/// rule leaves no stale mix behind. Authoritative fields stay untouched.
fn apply_suggestion(row: &mut LedgerEntry, s: &RuleSuggestion) {
    row.suggested_category = s
        .category
        .clone()
        .map(|value| Suggested::new(value, s.confidence, s.rule_id));
    row.suggested_legal_bucket = s
        .legal_bucket
        .map(|value| Suggested::new(value, s.confidence, s.rule_id));
    row.suggested_bank_account_id = s
        .bank_account_id
        .map(|value| Suggested::new(value, s.confidence, s.rule_id));
    row.suggested_counterparty_id = s
        .counterparty_id
        .map(|value| Suggested::new(value, s.confidence, s.rule_id));
    row.suggested_location_id = s
        .location_id
        .map(|value| Suggested::new(value, s.confidence, s.rule_id));
    row.suggested_service_period = s
        .service
        .map(|value| Suggested::new(value, s.confidence, s.rule_id));
}
