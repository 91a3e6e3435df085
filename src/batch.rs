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

//! Running every rule-set file against every customer file.
//!
//! Each rule-set file gets its own scoped worker thread with its own
//! [`BalanceEngine`]; the engine keeps no state between computations, so the
//! workers share nothing but the results map.

use crate::engine::BalanceEngine;
use crate::error::LedgerError;
use crate::input::{io_error, load_events, load_rule_sets};
use crate::rule_set::RuleSetCollection;
use crate::snapshot::BalanceSnapshot;
use chrono::NaiveDate;
use dashmap::DashMap;
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A raw input together with the file stem it was loaded from.
#[derive(Debug, Clone)]
pub struct Named {
    pub name: String,
    pub raw: Value,
}

impl Named {
    pub fn new(name: impl Into<String>, raw: Value) -> Self {
        Self {
            name: name.into(),
            raw,
        }
    }
}

/// The snapshot for one rule-set file and one customer file.
#[derive(Debug, Clone)]
pub struct BatchOutcome {
    pub rules: String,
    pub customer: String,
    pub snapshot: BalanceSnapshot,
}

#[derive(Debug, Clone, Default)]
pub struct BatchReport {
    /// Sorted by rule-set name, then customer name.
    pub outcomes: Vec<BatchOutcome>,
    /// Rule-set files that failed validation and were skipped.
    pub rejected_rules: Vec<String>,
}

/// Computes every valid rule set against every customer as of `today`.
///
/// # Errors
///
/// Returns [`LedgerError::WorkerPanicked`] if a worker thread panics.
pub fn run(rules: &[Named], customers: &[Named], today: NaiveDate) -> Result<BatchReport, LedgerError> {
    let results: DashMap<(String, String), BalanceSnapshot> = DashMap::new();
    let mut rejected_rules = Vec::new();

    let mut engines = Vec::new();
    for named in rules {
        let collection = RuleSetCollection::from_value(&named.raw);
        if collection.validate() {
            engines.push((named.name.as_str(), BalanceEngine::new(collection)));
        } else {
            warn!(rules = %named.name, problems = ?collection.problems(), "skipping invalid rule sets");
            rejected_rules.push(named.name.clone());
        }
    }

    crossbeam::thread::scope(|scope| {
        for (rules_name, engine) in &engines {
            let results = &results;
            scope.spawn(move |_| {
                for customer in customers {
                    let snapshot = engine.compute_balance(&customer.raw, today);
                    match &snapshot.error_messages {
                        Some(errors) => {
                            info!(rules = %rules_name, customer = %customer.name, %errors, "computation failed")
                        }
                        None => info!(
                            rules = %rules_name,
                            customer = %customer.name,
                            net_balance = ?snapshot.net_balance,
                            escalation = ?snapshot.escalation_flag,
                            "computed balance"
                        ),
                    }
                    results.insert((rules_name.to_string(), customer.name.clone()), snapshot);
                }
            });
        }
    })
    .map_err(|_| LedgerError::WorkerPanicked)?;

    let mut outcomes: Vec<BatchOutcome> = results
        .into_iter()
        .map(|((rules, customer), snapshot)| BatchOutcome {
            rules,
            customer,
            snapshot,
        })
        .collect();
    outcomes.sort_by(|a, b| (&a.rules, &a.customer).cmp(&(&b.rules, &b.customer)));

    Ok(BatchReport {
        outcomes,
        rejected_rules,
    })
}

/// Loads every `.json` rule-set file in `dir`, sorted by name.
///
/// # Errors
///
/// Fails on the first unreadable directory or file.
pub fn load_rules_dir(dir: &Path) -> Result<Vec<Named>, LedgerError> {
    load_dir(dir, &["json"], load_rule_sets)
}

/// Loads every `.json` or `.csv` customer events file in `dir`, sorted by name.
///
/// # Errors
///
/// Fails on the first unreadable directory or file.
pub fn load_customers_dir(dir: &Path) -> Result<Vec<Named>, LedgerError> {
    load_dir(dir, &["json", "csv"], load_events)
}

fn load_dir(
    dir: &Path,
    extensions: &[&str],
    load: fn(&Path) -> Result<Value, LedgerError>,
) -> Result<Vec<Named>, LedgerError> {
    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(|e| io_error(dir, e))? {
        let path = entry.map_err(|e| io_error(dir, e))?.path();
        let wanted = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| extensions.iter().any(|want| ext.eq_ignore_ascii_case(want)));
        if path.is_file() && wanted {
            paths.push(path);
        }
    }
    paths.sort();

    paths
        .into_iter()
        .map(|path| {
            let name = path
                .file_stem()
                .map(|stem| stem.to_string_lossy().into_owned())
                .unwrap_or_default();
            Ok(Named::new(name, load(&path)?))
        })
        .collect()
}

/// Writes each outcome to `<out_dir>/<rules>__<customer>.json`.
///
/// # Errors
///
/// Returns [`LedgerError::Io`] if the directory or a file cannot be written.
pub fn write_report(report: &BatchReport, out_dir: &Path) -> Result<Vec<PathBuf>, LedgerError> {
    fs::create_dir_all(out_dir).map_err(|e| io_error(out_dir, e))?;

    let mut written = Vec::with_capacity(report.outcomes.len());
    for outcome in &report.outcomes {
        let path = out_dir.join(format!("{}__{}.json", outcome.rules, outcome.customer));
        let json = serde_json::to_string_pretty(&outcome.snapshot)
            .map_err(|e| LedgerError::Malformed(e.to_string()))?;
        fs::write(&path, json).map_err(|e| io_error(&path, e))?;
        written.push(path);
    }
    Ok(written)
}
