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

//! Balance computation engine.
//!
//! The [`BalanceEngine`] replays one account's events in date order against
//! the company's rule sets and reports where the account stands.
//!
//! # Replay
//!
//! For each event, oldest first:
//!
//! - **Rule set**: the rule set in force on the event's date is selected; an
//!   event older than every rule set fails the whole computation.
//! - **Fees**: every queued credit that fell due on or before the event's date
//!   and has no fee yet gets one overdue fee, which is itself queued.
//! - **Credits** join the unpaid-credit queue; **debits** add to the funds pool.
//! - **Allocation**: pooled funds pay queued credits oldest first, splitting a
//!   credit when the pool runs out part way.
//!
//! Once every event is replayed, fees are caught up to `today`, and the
//! overdue balance and escalation flag are evaluated as of `today`.
//!
//! # Ownership
//!
//! All working state lives in a [`Replay`] created per call, so a single
//! engine can serve any number of accounts, including from several threads.

use crate::credit_queue::{Rows, Timeline, UnpaidCreditQueue};
use crate::error::LedgerError;
use crate::event::{LedgerEvent, PaymentState};
use crate::rule_set::{RuleSet, RuleSetCollection};
use crate::snapshot::{Balance, BalanceSnapshot, EscalationFlag};
use crate::validator::EventValidator;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde_json::Value;
use tracing::{debug, warn};

/// Computes account balances under a fixed set of rule sets.
///
/// # Invariants
///
/// - At most one overdue fee is generated per credit.
/// - The funds pool is never negative between allocation passes.
/// - A failed computation reports no balance at all.
#[derive(Debug, Clone)]
pub struct BalanceEngine {
    rule_sets: RuleSetCollection,
    validator: EventValidator,
}

impl BalanceEngine {
    pub fn new(rule_sets: RuleSetCollection) -> Self {
        Self {
            rule_sets,
            validator: EventValidator,
        }
    }

    pub fn rule_sets(&self) -> &RuleSetCollection {
        &self.rule_sets
    }

    /// Returns `true` if the engine's rule sets are usable.
    pub fn validate_rule_sets(&self) -> bool {
        self.rule_sets.validate()
    }

    /// Validates raw events and computes the account's snapshot as of `today`.
    ///
    /// `raw_events` must be a JSON array of event objects. Any problem with the
    /// rule sets or the events yields a snapshot carrying only
    /// `error_messages`.
    pub fn compute_balance(&self, raw_events: &Value, today: NaiveDate) -> BalanceSnapshot {
        self.compute_raw(raw_events, today).into()
    }

    /// Like [`compute_balance`](Self::compute_balance), for serialized JSON.
    pub fn compute_balance_json(&self, raw_events: &str, today: NaiveDate) -> BalanceSnapshot {
        match serde_json::from_str::<Value>(raw_events) {
            Ok(raw) => self.compute_balance(&raw, today),
            Err(e) => LedgerError::Malformed(e.to_string()).into(),
        }
    }

    fn compute_raw(&self, raw_events: &Value, today: NaiveDate) -> Result<Balance, LedgerError> {
        // Rule sets are reported ahead of any event problem.
        if !self.rule_sets.validate() {
            return Err(LedgerError::InvalidRuleSets);
        }
        let raw_events = raw_events
            .as_array()
            .ok_or_else(|| LedgerError::Malformed("events must be a list".to_string()))?;
        let events = self.validator.validate(raw_events)?;
        self.replay(events, today)
    }

    /// Replays already-typed events.
    ///
    /// # Errors
    ///
    /// - [`LedgerError::InvalidRuleSets`] - The rule sets failed validation.
    /// - [`LedgerError::RuleSetNotFound`] - An event predates every rule set.
    /// - [`LedgerError::AmountOverflow`] - A total or fee left the decimal range.
    pub fn compute(&self, events: Vec<LedgerEvent>, today: NaiveDate) -> Result<Balance, LedgerError> {
        if !self.rule_sets.validate() {
            return Err(LedgerError::InvalidRuleSets);
        }
        self.replay(events, today)
    }

    /// Replays events against rule sets already known to be valid.
    fn replay(&self, mut events: Vec<LedgerEvent>, today: NaiveDate) -> Result<Balance, LedgerError> {
        // Stable: same-day events keep their submitted order.
        events.sort_by_key(|event| event.date);

        let mut replay = Replay::default();
        for event in events {
            let rule_set = self
                .rule_sets
                .pick(event.date)
                .ok_or(LedgerError::RuleSetNotFound(event.date))?;
            replay.charge_overdue_fees(event.date, rule_set)?;
            replay.apply(event)?;
        }

        match self.rule_sets.pick(today) {
            Some(rule_set) => replay.charge_overdue_fees(today, rule_set)?,
            None => warn!(%today, "no rule set in force today; skipping overdue fee catch-up"),
        }

        replay.finish(today, self.rule_sets.pick(today))
    }
}

/// Working state of one computation.
#[derive(Debug, Default)]
struct Replay {
    rows: Rows,
    unpaid: UnpaidCreditQueue,
    timeline: Timeline,
    /// Debits not yet allocated to a credit.
    funds: Decimal,
    net_balance: Decimal,
}

impl Replay {
    /// Charges one fee against each queued credit due on or before `as_of`
    /// that has not had one yet.
    fn charge_overdue_fees(&mut self, as_of: NaiveDate, rule_set: &RuleSet) -> Result<(), LedgerError> {
        let due: Vec<_> = self
            .unpaid
            .iter()
            .filter(|&id| self.rows[id].needs_overdue_fee(as_of))
            .collect();

        for id in due {
            let credit = &self.rows[id];
            let Some(due_date) = credit.net_days.due_date(credit.date) else {
                continue;
            };
            let fee = rule_set
                .overdue_fee(credit.amount)
                .ok_or(LedgerError::AmountOverflow(as_of))?;
            let net_balance = self
                .net_balance
                .checked_add(fee)
                .ok_or(LedgerError::AmountOverflow(as_of))?;
            let notes = format!(
                "rule set effective {}: {} of {} (minimum {})",
                rule_set.effective_from, rule_set.overdue_percentage, credit.amount, rule_set.min_overdue_charge
            );
            let fee_row = LedgerEvent::overdue_fee_for(credit, due_date, fee, notes);
            debug!(credit_date = %credit.date, %due_date, %fee, "charging overdue fee");

            self.rows[id].mark_overdue_fee_created();
            self.net_balance = net_balance;
            let fee_id = self.rows.insert(fee_row);
            self.timeline.append(fee_id);
            self.unpaid.push(fee_id);
        }
        Ok(())
    }

    fn apply(&mut self, event: LedgerEvent) -> Result<(), LedgerError> {
        let paid_on = event.date;
        let amount = event.amount;
        let is_credit = event.is_credit();

        let overflow = move || LedgerError::AmountOverflow(paid_on);
        let net_balance = self.net_balance.checked_add(amount).ok_or_else(overflow)?;
        let funds = if is_credit {
            self.funds
        } else {
            self.funds.checked_sub(amount).ok_or_else(overflow)?
        };

        let id = self.rows.insert(event);
        self.timeline.append(id);
        self.net_balance = net_balance;
        self.funds = funds;
        if is_credit {
            self.unpaid.push(id);
        }

        self.allocate(paid_on);
        Ok(())
    }

    /// Pays queued credits oldest first until funds or credits run out.
    fn allocate(&mut self, paid_on: NaiveDate) {
        while self.funds > Decimal::ZERO {
            let Some(id) = self.unpaid.front() else {
                break;
            };
            let outstanding = self.rows[id].amount;
            let applied = self.funds.min(outstanding);

            let state = self.rows[id].apply_payment(applied, paid_on);
            self.funds -= applied;
            if state == PaymentState::FullyPaid {
                self.unpaid.pop_front();
            }
            self.timeline.append(id);
            debug!(%paid_on, %applied, ?state, "applied payment");
        }
        debug_assert!(
            self.funds >= Decimal::ZERO,
            "Invariant violated: funds pool went negative: {}",
            self.funds
        );
    }

    fn finish(self, today: NaiveDate, rule_set: Option<&RuleSet>) -> Result<Balance, LedgerError> {
        let overdue_balance = self
            .unpaid
            .iter()
            .map(|id| &self.rows[id])
            .filter(|row| row.is_past_due(today))
            .try_fold(Decimal::ZERO, |total, row| total.checked_add(row.amount))
            .ok_or(LedgerError::AmountOverflow(today))?;

        let escalation_flag = escalate(self.unpaid.front().map(|id| &self.rows[id]), today, rule_set);

        Ok(Balance {
            net_balance: Balance::round(self.net_balance),
            overdue_balance,
            escalation_flag,
            timeline: self.timeline.into_sorted_rows(&self.rows),
        })
    }
}

/// Scores collection urgency from the oldest unpaid credit.
///
/// Each later check overrides the earlier ones, so whichever threshold is
/// reached decides the flag even when the agency threshold sits below the
/// representative's.
fn escalate(oldest: Option<&LedgerEvent>, today: NaiveDate, rule_set: Option<&RuleSet>) -> EscalationFlag {
    let Some(oldest) = oldest else {
        return EscalationFlag::NoUnpaidCredits;
    };
    let mut flag = EscalationFlag::UnpaidCreditsNoneLate;

    let Some(due) = oldest.due_date().filter(|&due| due <= today) else {
        return flag;
    };
    flag = EscalationFlag::OverdueCredit;

    let Some(rule_set) = rule_set else {
        return flag;
    };
    let days_overdue = (today - due).num_days();
    if days_overdue >= i64::from(rule_set.days_overdue_for_rep) {
        flag = EscalationFlag::InternalCollection;
    }
    if days_overdue >= i64::from(rule_set.days_overdue_for_agency) {
        flag = EscalationFlag::ExternalAgency;
    }
    flag
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::base::NetDays;
    use rust_decimal_macros::dec;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn rule_set(rep: u32, agency: u32) -> RuleSet {
        RuleSet {
            effective_from: date(2015, 1, 1),
            overdue_percentage: dec!(0.015),
            min_overdue_charge: dec!(5),
            days_overdue_for_rep: rep,
            days_overdue_for_agency: agency,
        }
    }

    fn credit(day: u32, amount: Decimal, net_days: u32) -> LedgerEvent {
        LedgerEvent::new(date(2016, 1, day), amount, format!("credit {day}"), "", NetDays(net_days))
    }

    #[test]
    fn fee_generation_is_idempotent() {
        let mut replay = Replay::default();
        replay.apply(credit(1, dec!(100), 10)).unwrap();

        let rules = rule_set(30, 90);
        replay.charge_overdue_fees(date(2016, 1, 20), &rules).unwrap();
        replay.charge_overdue_fees(date(2016, 1, 25), &rules).unwrap();

        assert_eq!(replay.unpaid.iter().count(), 2);
        assert_eq!(replay.net_balance, dec!(105));
    }

    #[test]
    fn fee_is_not_charged_before_due_date() {
        let mut replay = Replay::default();
        replay.apply(credit(1, dec!(100), 10)).unwrap();
        replay.charge_overdue_fees(date(2016, 1, 10), &rule_set(30, 90)).unwrap();
        assert_eq!(replay.unpaid.iter().count(), 1);
    }

    #[test]
    fn fee_uses_outstanding_amount() {
        let mut replay = Replay::default();
        replay.apply(credit(1, dec!(1000), 10)).unwrap();
        replay.apply(LedgerEvent::new(date(2016, 1, 2), dec!(-600), "cheque", "", NetDays(0))).unwrap();

        replay.charge_overdue_fees(date(2016, 1, 11), &rule_set(30, 90)).unwrap();
        // 1.5% of the remaining 400 is 6, above the minimum of 5.
        let fee = replay.unpaid.iter().nth(1).unwrap();
        assert_eq!(replay.rows[fee].amount, dec!(6.000));
    }

    #[test]
    fn allocation_splits_the_head_credit() {
        let mut replay = Replay::default();
        replay.apply(credit(1, dec!(50), 10)).unwrap();
        replay.apply(credit(2, dec!(30), 10)).unwrap();
        replay.apply(LedgerEvent::new(date(2016, 1, 3), dec!(-60), "cheque", "", NetDays(0))).unwrap();

        assert_eq!(replay.unpaid.iter().count(), 1);
        let head = replay.unpaid.front().unwrap();
        assert_eq!(replay.rows[head].amount, dec!(20));
        assert_eq!(replay.funds, Decimal::ZERO);
        assert_eq!(replay.net_balance, dec!(20));
    }

    #[test]
    fn overpayment_stays_in_the_pool() {
        let mut replay = Replay::default();
        replay.apply(LedgerEvent::new(date(2016, 1, 1), dec!(-80), "prepayment", "", NetDays(0))).unwrap();
        assert_eq!(replay.funds, dec!(80));

        replay.apply(credit(2, dec!(50), 10)).unwrap();
        assert_eq!(replay.unpaid.front(), None);
        assert_eq!(replay.funds, dec!(30));
    }

    #[test]
    fn net_balance_overflow_is_an_error() {
        let mut replay = Replay::default();
        replay.apply(credit(1, Decimal::MAX, 10)).unwrap();

        let err = replay.apply(credit(2, Decimal::ONE, 10)).unwrap_err();
        assert_eq!(err, LedgerError::AmountOverflow(date(2016, 1, 2)));
        // The failed event left no trace.
        assert_eq!(replay.net_balance, Decimal::MAX);
        assert_eq!(replay.unpaid.iter().count(), 1);
    }

    #[test]
    fn debit_overflow_is_an_error() {
        let mut replay = Replay::default();
        replay
            .apply(LedgerEvent::new(date(2016, 1, 1), Decimal::MIN, "prepayment", "", NetDays(0)))
            .unwrap();

        let err = replay
            .apply(LedgerEvent::new(date(2016, 1, 2), dec!(-1), "cheque", "", NetDays(0)))
            .unwrap_err();
        assert_eq!(err, LedgerError::AmountOverflow(date(2016, 1, 2)));
        assert_eq!(replay.funds, Decimal::MAX);
    }

    #[test]
    fn fee_overflow_is_an_error() {
        let mut replay = Replay::default();
        replay.apply(credit(1, dec!(100000000000), 10)).unwrap();

        let mut rules = rule_set(30, 90);
        rules.overdue_percentage = dec!(100000000000000000000);
        let err = replay.charge_overdue_fees(date(2016, 1, 20), &rules).unwrap_err();
        assert_eq!(err, LedgerError::AmountOverflow(date(2016, 1, 20)));
        assert!(!replay.rows[replay.unpaid.front().unwrap()].overdue_fee_created());
    }

    #[test]
    fn escalation_levels() {
        let today = date(2016, 3, 1);
        let rules = rule_set(30, 90);

        assert_eq!(escalate(None, today, Some(&rules)), EscalationFlag::NoUnpaidCredits);

        let not_late = credit(1, dec!(10), 120);
        assert_eq!(
            escalate(Some(&not_late), today, Some(&rules)),
            EscalationFlag::UnpaidCreditsNoneLate
        );

        // Due 2016-02-20, ten days late.
        let late = credit(1, dec!(10), 50);
        assert_eq!(escalate(Some(&late), today, Some(&rules)), EscalationFlag::OverdueCredit);
        assert_eq!(
            escalate(Some(&late), today, Some(&rule_set(5, 90))),
            EscalationFlag::InternalCollection
        );
        assert_eq!(
            escalate(Some(&late), today, Some(&rule_set(5, 9))),
            EscalationFlag::ExternalAgency
        );
        // Agency threshold below the representative's still wins once reached.
        assert_eq!(
            escalate(Some(&late), today, Some(&rule_set(30, 9))),
            EscalationFlag::ExternalAgency
        );
        // Without a rule set, thresholds cannot be applied.
        assert_eq!(escalate(Some(&late), today, None), EscalationFlag::OverdueCredit);
    }
}
