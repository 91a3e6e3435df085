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

//! Ledger rows and the unpaid-credit queue.
//!
//! Rows live in a single arena owned by one computation. The unpaid-credit
//! queue and the timeline both refer to rows by [`RowId`], so a credit that is
//! paid down is updated in exactly one place and every view of it sees the
//! change.

use crate::event::LedgerEvent;
use std::collections::VecDeque;
use std::ops::{Index, IndexMut};

/// Position of a row in its [`Rows`] arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RowId(usize);

/// Append-only arena of ledger rows.
#[derive(Debug, Default)]
pub(crate) struct Rows {
    rows: Vec<LedgerEvent>,
}

impl Rows {
    pub(crate) fn insert(&mut self, row: LedgerEvent) -> RowId {
        self.rows.push(row);
        RowId(self.rows.len() - 1)
    }
}

impl Index<RowId> for Rows {
    type Output = LedgerEvent;

    fn index(&self, id: RowId) -> &LedgerEvent {
        &self.rows[id.0]
    }
}

impl IndexMut<RowId> for Rows {
    fn index_mut(&mut self, id: RowId) -> &mut LedgerEvent {
        &mut self.rows[id.0]
    }
}

/// Credits not yet fully paid, oldest first.
///
/// Entries stay queued while partially paid and leave only once their amount
/// reaches zero.
#[derive(Debug, Default)]
pub(crate) struct UnpaidCreditQueue {
    ids: VecDeque<RowId>,
}

impl UnpaidCreditQueue {
    pub(crate) fn push(&mut self, id: RowId) {
        self.ids.push_back(id);
    }

    /// The oldest unpaid credit.
    pub(crate) fn front(&self) -> Option<RowId> {
        self.ids.front().copied()
    }

    pub(crate) fn pop_front(&mut self) -> Option<RowId> {
        self.ids.pop_front()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = RowId> + '_ {
        self.ids.iter().copied()
    }
}

/// Every row a computation touched, ordered by its last touch.
///
/// Each touch stamps the row with the next sequence number, so a row appears
/// at most once and touching it again moves it behind everything touched
/// before.
#[derive(Debug, Default)]
pub(crate) struct Timeline {
    /// Last-touch sequence number, indexed by [`RowId`].
    touched: Vec<Option<u64>>,
    next: u64,
}

impl Timeline {
    pub(crate) fn append(&mut self, id: RowId) {
        if self.touched.len() <= id.0 {
            self.touched.resize(id.0 + 1, None);
        }
        self.touched[id.0] = Some(self.next);
        self.next += 1;
    }

    /// Copies the touched rows out, sorted by date and then by last touch.
    pub(crate) fn into_sorted_rows(self, rows: &Rows) -> Vec<LedgerEvent> {
        let mut order: Vec<(RowId, u64)> = self
            .touched
            .into_iter()
            .enumerate()
            .filter_map(|(index, seq)| seq.map(|seq| (RowId(index), seq)))
            .collect();
        order.sort_unstable_by_key(|&(id, seq)| (rows[id].date, seq));
        order.into_iter().map(|(id, _)| rows[id].clone()).collect()
    }
}
