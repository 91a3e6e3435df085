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

//! Ledger events.
//!
//! A positive amount is a credit (money owed), anything else is a debit (a
//! payment). Credits move through a small state machine while the engine
//! replays them:
//!
//! ```text
//! Open ──partial payment──► PartiallyPaid ──remaining paid──► FullyPaid
//!   └────────────────────────full payment───────────────────────┘
//! ```
//!
//! Independently, a credit past its due date gets exactly one overdue fee and
//! is then marked so it never gets another. Fee rows themselves carry
//! [`NetDays::NEVER_OVERDUE`] and the marker, so they never earn a fee.

use crate::base::NetDays;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;

/// One credit, debit, or system-generated fee in an account's history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEvent {
    pub date: NaiveDate,
    pub amount: Decimal,
    pub description: String,
    pub notes: String,
    #[serde(rename = "netD")]
    pub net_days: NetDays,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    overdue_fee_created: bool,
    /// Set only on rows the engine generates as fees.
    #[serde(skip)]
    overdue_fee: bool,
    /// Description as submitted, before payment annotations.
    #[serde(skip)]
    label: String,
}

/// Where a credit stands in its payment lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentState {
    Open,
    PartiallyPaid,
    FullyPaid,
}

impl LedgerEvent {
    pub fn new(
        date: NaiveDate,
        amount: Decimal,
        description: impl Into<String>,
        notes: impl Into<String>,
        net_days: NetDays,
    ) -> Self {
        let description = description.into();
        Self {
            date,
            amount,
            label: description.clone(),
            description,
            notes: notes.into(),
            net_days,
            overdue_fee_created: false,
            overdue_fee: false,
        }
    }

    /// Builds the fee charged against `credit` because it went unpaid past
    /// its due date. The fee is dated on that due date.
    pub(crate) fn overdue_fee_for(credit: &LedgerEvent, due: NaiveDate, fee: Decimal, notes: String) -> Self {
        let mut row = Self::new(
            due,
            fee,
            format!("Overdue fee for credit dated {}", credit.date),
            notes,
            NetDays::NEVER_OVERDUE,
        );
        row.overdue_fee_created = true;
        row.overdue_fee = true;
        row
    }

    pub fn is_credit(&self) -> bool {
        self.amount > Decimal::ZERO
    }

    /// `true` once an overdue fee has been generated against this row, and on
    /// every fee row.
    pub fn overdue_fee_created(&self) -> bool {
        self.overdue_fee_created
    }

    /// `true` for rows the engine generated as overdue fees.
    pub fn is_overdue_fee(&self) -> bool {
        self.overdue_fee
    }

    /// The day this row falls due.
    ///
    /// Fee rows are owed from the day they are charged even though their
    /// `netD` is the never-overdue sentinel; other rows fall due `netD` days
    /// after their date.
    pub fn due_date(&self) -> Option<NaiveDate> {
        if self.overdue_fee {
            return Some(self.date);
        }
        self.net_days.due_date(self.date)
    }

    /// `true` if the row is due on or before `as_of`.
    pub fn is_past_due(&self, as_of: NaiveDate) -> bool {
        self.due_date().is_some_and(|due| due <= as_of)
    }

    /// `true` if the row should get an overdue fee as of `as_of`.
    pub fn needs_overdue_fee(&self, as_of: NaiveDate) -> bool {
        !self.overdue_fee_created
            && !self.net_days.is_never_overdue()
            && self.net_days.due_date(self.date).is_some_and(|due| due <= as_of)
    }

    pub(crate) fn mark_overdue_fee_created(&mut self) {
        self.overdue_fee_created = true;
    }

    /// Records that `applied` of this credit was paid on `paid_on`, leaving
    /// `self.amount - applied` outstanding.
    ///
    /// A full payment moves the row's date to the payment date; a partial one
    /// keeps the original date so the credit's due date does not move.
    pub(crate) fn apply_payment(&mut self, applied: Decimal, paid_on: NaiveDate) -> PaymentState {
        self.amount -= applied;
        if self.amount.is_zero() {
            self.description = format!("{} (paid in full)", self.label);
            self.notes = format!("{applied} paid in full on {paid_on}; {}", self.notes);
            self.date = paid_on;
            PaymentState::FullyPaid
        } else {
            self.description = format!("{} (partially paid, {} outstanding)", self.label, self.amount);
            self.notes = format!("{applied} partial payment applied on {paid_on}; {}", self.notes);
            PaymentState::PartiallyPaid
        }
    }
}
