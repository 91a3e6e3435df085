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

//! Raw event validation.
//!
//! Events arrive as JSON objects. [`EventValidator::validate`] checks every
//! field of every event and reports every problem at once, so a data-entry
//! operator can fix a whole file in one pass. Only when nothing is wrong does
//! it hand back typed [`LedgerEvent`]s.

use crate::base::{NetDays, is_decimal_text, is_integer_text, parse_date, scalar_text};
use crate::error::{ValidationError, ValidationErrors};
use crate::event::LedgerEvent;
use rust_decimal::Decimal;
use serde_json::{Map, Value};
use std::str::FromStr;

const DATE: &str = "date";
const AMOUNT: &str = "amount";
const DESCRIPTION: &str = "description";
const NOTES: &str = "notes";
const NET_DAYS: &str = "netD";
const OVERDUE_FEE_CREATED: &str = "overdueFeeCreated";

/// Validates and normalizes raw ledger events.
#[derive(Debug, Clone, Copy, Default)]
pub struct EventValidator;

impl EventValidator {
    /// Parses every event, collecting every problem found.
    ///
    /// # Errors
    ///
    /// Returns all [`ValidationError`]s if any event is malformed.
    pub fn validate(&self, raw_events: &[Value]) -> Result<Vec<LedgerEvent>, ValidationErrors> {
        let mut errors = ValidationErrors::new();
        let mut events = Vec::with_capacity(raw_events.len());

        for (index, raw) in raw_events.iter().enumerate() {
            match raw.as_object() {
                Some(fields) => {
                    if let Some(event) = parse_event(index, fields, &mut errors) {
                        events.push(event);
                    }
                }
                None => errors.push(ValidationError::NotAnObject { index }),
            }
        }

        if errors.is_empty() {
            Ok(events)
        } else {
            Err(errors)
        }
    }

    /// Convenience form returning only the messages; empty means valid.
    pub fn messages(&self, raw_events: &[Value]) -> Vec<String> {
        match self.validate(raw_events) {
            Ok(_) => Vec::new(),
            Err(errors) => errors.messages(),
        }
    }
}

/// Checks one event. Returns `None` if anything was wrong; the problems are
/// pushed onto `errors`.
fn parse_event(index: usize, fields: &Map<String, Value>, errors: &mut ValidationErrors) -> Option<LedgerEvent> {
    let before = errors.len();

    let date = required(index, fields, DATE, errors).and_then(|value| {
        let parsed = value.as_str().and_then(parse_date);
        if parsed.is_none() {
            errors.push(ValidationError::InvalidDate {
                index,
                value: display_value(value),
            });
        }
        parsed
    });

    let amount = required(index, fields, AMOUNT, errors).and_then(|value| {
        let parsed = scalar_text(value)
            .filter(|text| is_decimal_text(text, true))
            .and_then(|text| Decimal::from_str(&text).ok());
        if parsed.is_none() {
            errors.push(invalid(index, AMOUNT, value));
        }
        parsed
    });

    let mut text = |field: &'static str| {
        required(index, fields, field, errors).and_then(|value| {
            let parsed = value.as_str().map(str::to_owned);
            if parsed.is_none() {
                errors.push(invalid(index, field, value));
            }
            parsed
        })
    };
    let description = text(DESCRIPTION);
    let notes = text(NOTES);

    let net_days = required(index, fields, NET_DAYS, errors).and_then(|value| {
        let parsed = scalar_text(value)
            .filter(|text| is_integer_text(text))
            .and_then(|text| text.parse::<u32>().ok())
            .map(NetDays);
        if parsed.is_none() {
            errors.push(invalid(index, NET_DAYS, value));
        }
        parsed
    });

    if fields.contains_key(OVERDUE_FEE_CREATED) {
        errors.push(ValidationError::ReservedField {
            index,
            field: OVERDUE_FEE_CREATED,
        });
    }

    if errors.len() > before {
        return None;
    }
    Some(LedgerEvent::new(date?, amount?, description?, notes?, net_days?))
}

fn required<'a>(
    index: usize,
    fields: &'a Map<String, Value>,
    field: &'static str,
    errors: &mut ValidationErrors,
) -> Option<&'a Value> {
    let value = fields.get(field);
    if value.is_none() {
        errors.push(ValidationError::MissingField { index, field });
    }
    value
}

fn invalid(index: usize, field: &'static str, value: &Value) -> ValidationError {
    ValidationError::InvalidField {
        index,
        field,
        value: display_value(value),
    }
}

/// Strings are shown bare, everything else as JSON.
fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
