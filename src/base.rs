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

//! Core value types shared by rule sets, events, and the engine.

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Number of days after a credit's date before it becomes due (`netD`).
///
/// [`NetDays::NEVER_OVERDUE`] is a sentinel: rows carrying it never fall due,
/// which is how system-generated fee rows are kept out of fee generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Deserialize, Serialize)]
#[serde(transparent)]
pub struct NetDays(pub u32);

impl NetDays {
    pub const NEVER_OVERDUE: NetDays = NetDays(999);

    pub fn is_never_overdue(self) -> bool {
        self == Self::NEVER_OVERDUE
    }

    /// Returns `date + self` days, or `None` for the sentinel.
    pub fn due_date(self, date: NaiveDate) -> Option<NaiveDate> {
        if self.is_never_overdue() {
            return None;
        }
        date.checked_add_days(Days::new(u64::from(self.0)))
    }
}

impl fmt::Display for NetDays {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Parses a strict `YYYY-MM-DD` calendar date.
///
/// chrono alone accepts unpadded months and days, so the shape is checked
/// before handing the text over.
pub fn parse_date(text: &str) -> Option<NaiveDate> {
    let bytes = text.as_bytes();
    if bytes.len() != 10 || bytes[4] != b'-' || bytes[7] != b'-' {
        return None;
    }
    let digits_ok = bytes
        .iter()
        .enumerate()
        .all(|(i, b)| i == 4 || i == 7 || b.is_ascii_digit());
    if !digits_ok {
        return None;
    }
    NaiveDate::parse_from_str(text, "%Y-%m-%d").ok()
}

/// Matches `digits` or `digits.digits`, optionally with a leading `-`.
pub(crate) fn is_decimal_text(text: &str, allow_sign: bool) -> bool {
    let unsigned = match text.strip_prefix('-') {
        Some(rest) if allow_sign => rest,
        Some(_) => return false,
        None => text,
    };
    let (whole, fraction) = match unsigned.split_once('.') {
        Some((whole, fraction)) => (whole, Some(fraction)),
        None => (unsigned, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && fraction.is_none_or(all_digits)
}

/// Renders a JSON string or number as text for pattern checks.
///
/// Anything else (null, bool, array, object) has no textual form here.
pub(crate) fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Matches one or more ASCII digits.
pub(crate) fn is_integer_text(text: &str) -> bool {
    !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit())
}
