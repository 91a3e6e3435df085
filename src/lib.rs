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

//! # Balance Ledger
//!
//! This library computes a running balance for a single account: given the
//! account's credits and debits and the company's date-versioned billing
//! rules, it reports the net balance, the overdue portion of it, how hard to
//! chase the account, and a timeline including generated overdue fees and
//! payment allocations.
//!
//! ## Core Components
//!
//! - [`RuleSetCollection`]: Billing policies keyed by start date
//! - [`EventValidator`]: Exhaustive validation of raw ledger events
//! - [`BalanceEngine`]: FIFO payment allocation, overdue fees, escalation
//! - [`BalanceSnapshot`]: The externally visible result
//!
//! ## Example
//!
//! ```
//! use balance_ledger_rs::{BalanceEngine, EscalationFlag, RuleSetCollection};
//! use chrono::NaiveDate;
//! use rust_decimal_macros::dec;
//! use serde_json::json;
//!
//! let rule_sets = RuleSetCollection::from_value(&json!({
//!     "2015-01-01": {
//!         "overduePercentage": 0.015,
//!         "minOverdueCharge": 5,
//!         "daysOverdueForRep": 30,
//!         "daysOverdueForAgency": 90
//!     }
//! }));
//! let engine = BalanceEngine::new(rule_sets);
//!
//! let events = json!([
//!     {"date": "2016-01-01", "amount": 100, "description": "Invoice 1", "notes": "", "netD": 30}
//! ]);
//! let today = NaiveDate::from_ymd_opt(2016, 3, 11).unwrap();
//! let snapshot = engine.compute_balance(&events, today);
//!
//! assert_eq!(snapshot.net_balance, Some(dec!(105.00)));
//! assert_eq!(snapshot.overdue_balance, Some(dec!(105)));
//! assert_eq!(snapshot.escalation_flag, Some(EscalationFlag::InternalCollection));
//! ```
//!
//! ## Thread Safety
//!
//! A computation owns all of its working state, so one [`BalanceEngine`] can
//! compute any number of accounts in parallel.

mod base;
pub mod batch;
mod credit_queue;
mod engine;
pub mod error;
mod event;
pub mod input;
mod rule_set;
mod snapshot;
mod validator;

pub use base::{NetDays, parse_date};
pub use engine::BalanceEngine;
pub use error::{LedgerError, ValidationError, ValidationErrors};
pub use event::{LedgerEvent, PaymentState};
pub use rule_set::{RuleSet, RuleSetCollection, validate_rule_sets};
pub use snapshot::{Balance, BalanceSnapshot, EscalationFlag};
pub use validator::EventValidator;
