// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2025 Daniel Negri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program. If not, see <https://www.gnu.org/licenses/>.

//! Date-keyed billing policies.
//!
//! A [`RuleSetCollection`] maps effective start dates to [`RuleSet`]s. The
//! rule set governing a given day is the one with the latest start date on or
//! before that day.
//!
//! # Example
//!
//! ```
//! use balance_ledger_rs::RuleSetCollection;
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//!
//! let rule_sets = RuleSetCollection::from_json(
//!     r#"{"2015-01-01": {"overduePercentage": 0.015, "minOverdueCharge": 5,
//!                        "daysOverdueForRep": 30, "daysOverdueForAgency": 90}}"#,
//! );
//! assert!(rule_sets.validate());
//!
//! let day = NaiveDate::from_ymd_opt(2016, 3, 1).unwrap();
//! assert_eq!(rule_sets.pick(day).unwrap().min_overdue_charge, dec!(5));
//! ```

use crate::base::{is_decimal_text, is_integer_text, parse_date, scalar_text};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::str::FromStr;

/// One version of the company's billing policy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleSet {
    #[serde(skip)]
    pub effective_from: NaiveDate,
    /// Fraction of the outstanding credit charged as an overdue fee.
    pub overdue_percentage: Decimal,
    /// Floor for the overdue fee.
    pub min_overdue_charge: Decimal,
    pub days_overdue_for_rep: u32,
    pub days_overdue_for_agency: u32,
}

impl RuleSet {
    /// Fee charged against `amount` once it is overdue: the percentage of the
    /// amount or the minimum charge, whichever is larger.
    ///
    /// Returns `None` if the percentage of `amount` is not representable.
    pub fn overdue_fee(&self, amount: Decimal) -> Option<Decimal> {
        self.overdue_percentage
            .checked_mul(amount)
            .map(|fee| fee.max(self.min_overdue_charge))
    }

    fn from_object(effective_from: NaiveDate, fields: &Map<String, Value>) -> Result<Self, Vec<String>> {
        let mut problems = Vec::new();

        let mut decimal = |name: &str| -> Option<Decimal> {
            let parsed = fields
                .get(name)
                .and_then(scalar_text)
                .filter(|text| is_decimal_text(text, false))
                .and_then(|text| Decimal::from_str(&text).ok());
            if parsed.is_none() {
                problems.push(field_problem(effective_from, name, fields.get(name)));
            }
            parsed
        };
        let overdue_percentage = decimal("overduePercentage");
        let min_overdue_charge = decimal("minOverdueCharge");

        let mut days = |name: &str| -> Option<u32> {
            let parsed = fields
                .get(name)
                .and_then(scalar_text)
                .filter(|text| is_integer_text(text))
                .and_then(|text| text.parse::<u32>().ok());
            if parsed.is_none() {
                problems.push(field_problem(effective_from, name, fields.get(name)));
            }
            parsed
        };
        let days_overdue_for_rep = days("daysOverdueForRep");
        let days_overdue_for_agency = days("daysOverdueForAgency");

        match (
            overdue_percentage,
            min_overdue_charge,
            days_overdue_for_rep,
            days_overdue_for_agency,
        ) {
            (Some(overdue_percentage), Some(min_overdue_charge), Some(rep), Some(agency)) => Ok(Self {
                effective_from,
                overdue_percentage,
                min_overdue_charge,
                days_overdue_for_rep: rep,
                days_overdue_for_agency: agency,
            }),
            _ => Err(problems),
        }
    }
}

fn field_problem(effective_from: NaiveDate, name: &str, value: Option<&Value>) -> String {
    match value {
        None => format!("rule set {effective_from}: missing field '{name}'"),
        Some(value) => format!("rule set {effective_from}: field '{name}' has invalid value {value}"),
    }
}

/// Every rule set the company has ever published, keyed by start date.
///
/// Construction never fails; malformed entries are recorded and make
/// [`validate`](Self::validate) return `false`.
#[derive(Debug, Clone, Default)]
pub struct RuleSetCollection {
    rule_sets: BTreeMap<NaiveDate, RuleSet>,
    /// Entries seen in the input, including rejected ones.
    entries: usize,
    problems: Vec<String>,
}

impl RuleSetCollection {
    /// Builds a collection from a mapping of `YYYY-MM-DD` keys to rule-set
    /// objects.
    pub fn from_value(raw: &Value) -> Self {
        let mut collection = Self::default();

        let Some(entries) = raw.as_object() else {
            collection
                .problems
                .push("rule sets must be a mapping of dates to rule sets".to_string());
            return collection;
        };

        for (key, value) in entries {
            collection.entries += 1;

            let Some(effective_from) = parse_date(key) else {
                collection
                    .problems
                    .push(format!("rule set key '{key}' is not a YYYY-MM-DD date"));
                continue;
            };
            let Some(fields) = value.as_object() else {
                collection
                    .problems
                    .push(format!("rule set {effective_from}: not an object"));
                continue;
            };

            match RuleSet::from_object(effective_from, fields) {
                Ok(rule_set) => {
                    collection.rule_sets.insert(effective_from, rule_set);
                }
                Err(problems) => collection.problems.extend(problems),
            }
        }

        collection
    }

    /// Builds a collection from serialized JSON. Text that does not
    /// deserialize yields an invalid collection.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<Value>(text) {
            Ok(raw) => Self::from_value(&raw),
            Err(e) => Self {
                problems: vec![format!("rule sets are not valid JSON: {e}")],
                ..Self::default()
            },
        }
    }

    /// Builds a collection from already-typed rule sets.
    ///
    /// Negative amounts are recorded as problems since the typed fields
    /// cannot rule them out.
    pub fn from_rule_sets(rule_sets: impl IntoIterator<Item = RuleSet>) -> Self {
        let mut collection = Self::default();
        for rule_set in rule_sets {
            collection.entries += 1;
            if rule_set.overdue_percentage.is_sign_negative()
                || rule_set.min_overdue_charge.is_sign_negative()
            {
                collection
                    .problems
                    .push(format!("rule set {}: negative amount", rule_set.effective_from));
                continue;
            }
            collection.rule_sets.insert(rule_set.effective_from, rule_set);
        }
        collection
    }

    /// Returns `true` if the collection is non-empty and every entry is well
    /// formed.
    pub fn validate(&self) -> bool {
        self.entries > 0 && self.problems.is_empty()
    }

    /// Describes every rejected entry.
    pub fn problems(&self) -> &[String] {
        &self.problems
    }

    /// Returns the rule set in force on `date`, if any started on or before it.
    pub fn pick(&self, date: NaiveDate) -> Option<&RuleSet> {
        self.rule_sets
            .range(..=date)
            .next_back()
            .map(|(_, rule_set)| rule_set)
    }

    pub fn len(&self) -> usize {
        self.rule_sets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rule_sets.is_empty()
    }

    /// Accepted rule sets in start-date order.
    pub fn iter(&self) -> impl Iterator<Item = &RuleSet> {
        self.rule_sets.values()
    }
}

/// Checks raw rule sets without keeping the parsed result.
pub fn validate_rule_sets(raw: &Value) -> bool {
    RuleSetCollection::from_value(raw).validate()
}
