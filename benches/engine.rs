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

//! Benchmarks for the balance engine.
//!
//! Run with: cargo bench
//!
//! Benchmarks include:
//! - Replaying a single account of growing length
//! - Validating raw events
//! - Computing many accounts in parallel against one engine
//! - Scaling with the number of threads

use balance_ledger_rs::{BalanceEngine, EventValidator, LedgerEvent, NetDays, RuleSet, RuleSetCollection};
use chrono::{Days, NaiveDate};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde_json::{Value, json};

// =============================================================================
// Helper Functions
// =============================================================================

fn day(offset: u64) -> NaiveDate {
    NaiveDate::from_ymd_opt(2016, 1, 1)
        .and_then(|d| d.checked_add_days(Days::new(offset)))
        .unwrap()
}

fn today() -> NaiveDate {
    day(900)
}

fn make_engine() -> BalanceEngine {
    BalanceEngine::new(RuleSetCollection::from_rule_sets([
        RuleSet {
            effective_from: NaiveDate::from_ymd_opt(2015, 1, 1).unwrap(),
            overdue_percentage: Decimal::new(15, 3),
            min_overdue_charge: Decimal::new(5, 0),
            days_overdue_for_rep: 30,
            days_overdue_for_agency: 90,
        },
        RuleSet {
            effective_from: day(365),
            overdue_percentage: Decimal::new(2, 2),
            min_overdue_charge: Decimal::new(10, 0),
            days_overdue_for_rep: 45,
            days_overdue_for_agency: 120,
        },
    ]))
}

/// Alternating invoices and smaller payments, one event every other day.
fn make_events(count: usize) -> Vec<LedgerEvent> {
    (0..count)
        .map(|i| {
            let date = day(i as u64 * 2 % 800);
            if i % 3 == 2 {
                LedgerEvent::new(date, Decimal::new(-7500, 2), "payment", "", NetDays(0))
            } else {
                LedgerEvent::new(date, Decimal::new(10000 + i as i64, 2), "invoice", "", NetDays(30))
            }
        })
        .collect()
}

fn make_raw_events(count: usize) -> Vec<Value> {
    make_events(count)
        .iter()
        .map(|e| {
            json!({
                "date": e.date.to_string(),
                "amount": e.amount.to_string(),
                "description": e.description,
                "notes": e.notes,
                "netD": e.net_days.0,
            })
        })
        .collect()
}

// =============================================================================
// Single-Account Benchmarks
// =============================================================================

fn bench_single_account(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_account");
    let engine = make_engine();

    for count in [10, 100, 1_000, 10_000].iter() {
        let events = make_events(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &events, |b, events| {
            b.iter(|| engine.compute(black_box(events.clone()), today()).unwrap())
        });
    }
    group.finish();
}

fn bench_validation(c: &mut Criterion) {
    let mut group = c.benchmark_group("validation");

    for count in [100, 1_000, 10_000].iter() {
        let raw = make_raw_events(*count);
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::from_parameter(count), &raw, |b, raw| {
            b.iter(|| EventValidator.validate(black_box(raw)).unwrap())
        });
    }
    group.finish();
}

fn bench_end_to_end(c: &mut Criterion) {
    let engine = make_engine();
    let raw = Value::Array(make_raw_events(1_000));

    c.bench_function("compute_balance_1000", |b| {
        b.iter(|| engine.compute_balance(black_box(&raw), today()))
    });
}

// =============================================================================
// Multi-Threaded Benchmarks
// =============================================================================

fn bench_parallel_accounts(c: &mut Criterion) {
    let mut group = c.benchmark_group("parallel_accounts");
    let engine = make_engine();

    for num_accounts in [10, 100, 1_000].iter() {
        let accounts: Vec<_> = (0..*num_accounts).map(|i| make_events(50 + i % 50)).collect();
        group.throughput(Throughput::Elements(*num_accounts as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_accounts),
            &accounts,
            |b, accounts| {
                b.iter(|| {
                    let balances: Vec<_> = accounts
                        .par_iter()
                        .map(|events| engine.compute(events.clone(), today()).unwrap())
                        .collect();
                    black_box(balances);
                })
            },
        );
    }
    group.finish();
}

fn bench_thread_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("thread_scaling");
    let engine = make_engine();
    let accounts: Vec<_> = (0..1_000).map(|i| make_events(50 + i % 50)).collect();

    for num_threads in [1, 2, 4, 8].iter() {
        group.throughput(Throughput::Elements(accounts.len() as u64));
        group.bench_with_input(
            BenchmarkId::from_parameter(num_threads),
            num_threads,
            |b, &num_threads| {
                let pool = rayon::ThreadPoolBuilder::new()
                    .num_threads(num_threads)
                    .build()
                    .unwrap();

                b.iter(|| {
                    pool.install(|| {
                        accounts.par_iter().for_each(|events| {
                            black_box(engine.compute(events.clone(), today()).unwrap());
                        });
                    })
                })
            },
        );
    }
    group.finish();
}

criterion_group!(single_threaded, bench_single_account, bench_validation, bench_end_to_end);
criterion_group!(multi_threaded, bench_parallel_accounts, bench_thread_scaling);
criterion_main!(single_threaded, multi_threaded);
