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

//! Computation results.

use crate::error::LedgerError;
use crate::event::LedgerEvent;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Serialize;
use std::fmt;

/// How aggressively an account should be pursued, in ascending severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum EscalationFlag {
    #[serde(rename = "No unpaid credits")]
    NoUnpaidCredits,
    #[serde(rename = "Unpaid credits but none late")]
    UnpaidCreditsNoneLate,
    #[serde(rename = "Overdue credit")]
    OverdueCredit,
    #[serde(rename = "Use internal collection representative")]
    InternalCollection,
    #[serde(rename = "Use external collection agency")]
    ExternalAgency,
}

impl EscalationFlag {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoUnpaidCredits => "No unpaid credits",
            Self::UnpaidCreditsNoneLate => "Unpaid credits but none late",
            Self::OverdueCredit => "Overdue credit",
            Self::InternalCollection => "Use internal collection representative",
            Self::ExternalAgency => "Use external collection agency",
        }
    }
}

impl fmt::Display for EscalationFlag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A successful computation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Balance {
    /// Rounded to [`Balance::DECIMAL_PRECISION`] places.
    pub net_balance: Decimal,
    pub overdue_balance: Decimal,
    pub escalation_flag: EscalationFlag,
    pub timeline: Vec<LedgerEvent>,
}

impl Balance {
    pub const DECIMAL_PRECISION: u32 = 2;

    /// Rounds half away from zero and always carries exactly two places.
    pub fn round(amount: Decimal) -> Decimal {
        let mut rounded =
            amount.round_dp_with_strategy(Self::DECIMAL_PRECISION, RoundingStrategy::MidpointAwayFromZero);
        rounded.rescale(Self::DECIMAL_PRECISION);
        rounded
    }
}

/// The externally visible outcome of a computation.
///
/// On failure only `error_messages` is set; no partial balance is ever
/// reported.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceSnapshot {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub net_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub overdue_balance: Option<Decimal>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub escalation_flag: Option<EscalationFlag>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub balance_timeline: Option<Vec<LedgerEvent>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_messages: Option<String>,
}

impl BalanceSnapshot {
    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            error_messages: Some(message.into()),
            ..Self::default()
        }
    }

    pub fn is_error(&self) -> bool {
        self.error_messages.is_some()
    }
}

impl From<Balance> for BalanceSnapshot {
    fn from(balance: Balance) -> Self {
        Self {
            net_balance: Some(balance.net_balance),
            overdue_balance: Some(balance.overdue_balance),
            escalation_flag: Some(balance.escalation_flag),
            balance_timeline: Some(balance.timeline),
            error_messages: None,
        }
    }
}

impl From<LedgerError> for BalanceSnapshot {
    fn from(error: LedgerError) -> Self {
        Self::failed(error.to_string())
    }
}

impl From<Result<Balance, LedgerError>> for BalanceSnapshot {
    fn from(result: Result<Balance, LedgerError>) -> Self {
        match result {
            Ok(balance) => balance.into(),
            Err(error) => error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn flags_are_ordered_by_severity() {
        assert!(EscalationFlag::NoUnpaidCredits < EscalationFlag::UnpaidCreditsNoneLate);
        assert!(EscalationFlag::UnpaidCreditsNoneLate < EscalationFlag::OverdueCredit);
        assert!(EscalationFlag::OverdueCredit < EscalationFlag::InternalCollection);
        assert!(EscalationFlag::InternalCollection < EscalationFlag::ExternalAgency);
    }

    #[test]
    fn flag_serializes_as_display_text() {
        for flag in [
            EscalationFlag::NoUnpaidCredits,
            EscalationFlag::UnpaidCreditsNoneLate,
            EscalationFlag::OverdueCredit,
            EscalationFlag::InternalCollection,
            EscalationFlag::ExternalAgency,
        ] {
            assert_eq!(serde_json::to_value(flag).unwrap(), flag.to_string());
        }
    }

    #[test]
    fn rounding_always_has_two_places() {
        assert_eq!(Balance::round(dec!(105)).to_string(), "105.00");
        assert_eq!(Balance::round(dec!(1.005)).to_string(), "1.01");
        assert_eq!(Balance::round(dec!(-1.005)).to_string(), "-1.01");
        assert_eq!(Balance::round(dec!(2.3349)).to_string(), "2.33");
    }

    #[test]
    fn failed_snapshot_serializes_only_errors() {
        let snapshot = BalanceSnapshot::from(LedgerError::InvalidRuleSets);
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json, serde_json::json!({"errorMessages": "Invalid ruleSets"}));
        assert!(snapshot.is_error());
    }

    #[test]
    fn successful_snapshot_carries_every_field() {
        let snapshot = BalanceSnapshot::from(Balance {
            net_balance: Balance::round(dec!(12.5)),
            overdue_balance: dec!(0),
            escalation_flag: EscalationFlag::NoUnpaidCredits,
            timeline: Vec::new(),
        });
        let json = serde_json::to_value(&snapshot).unwrap();
        assert_eq!(json["netBalance"], "12.50");
        assert_eq!(json["overdueBalance"], "0");
        assert_eq!(json["escalationFlag"], "No unpaid credits");
        assert_eq!(json["balanceTimeline"], serde_json::json!([]));
        assert!(json.get("errorMessages").is_none());
    }
}
