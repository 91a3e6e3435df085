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

use balance_ledger_rs::batch::{self, BatchReport};
use balance_ledger_rs::input::{load_events, load_rule_sets};
use balance_ledger_rs::{BalanceEngine, BalanceSnapshot, LedgerError, RuleSetCollection, parse_date};
use chrono::{Local, NaiveDate};
use clap::{Parser, Subcommand};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;
use tracing_subscriber::EnvFilter;

/// Balance Ledger - compute account balances from ledger events
///
/// Replays an account's credits and debits against date-versioned billing
/// rules and prints the balance, overdue amount, and escalation flag.
#[derive(Parser, Debug)]
#[command(name = "balance-ledger")]
#[command(about = "Computes account balances, overdue fees, and collection escalation", long_about = None)]
struct Args {
    /// Date the balance is evaluated on (YYYY-MM-DD), defaults to today
    #[arg(long, global = true, env = "LEDGER_TODAY", value_parser = parse_today)]
    today: Option<NaiveDate>,

    /// Log filter, e.g. `info` or `balance_ledger_rs=debug`
    #[arg(long, global = true, env = "LEDGER_LOG", default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compute one account and print its snapshot as JSON
    Compute {
        /// JSON file mapping start dates to rule sets
        #[arg(long, value_name = "FILE")]
        rules: PathBuf,

        /// JSON or CSV file of ledger events
        ///
        /// CSV header: date,amount,description,notes,netD
        #[arg(long, value_name = "FILE")]
        events: PathBuf,
    },
    /// Compute every rule-set file against every customer file
    Batch {
        /// Directory of rule-set JSON files
        #[arg(long, value_name = "DIR")]
        rules_dir: PathBuf,

        /// Directory of customer event files (JSON or CSV)
        #[arg(long, value_name = "DIR")]
        customers_dir: PathBuf,

        /// Directory the `<rules>__<customer>.json` results are written to
        #[arg(long, value_name = "DIR")]
        out_dir: PathBuf,
    },
}

fn parse_today(text: &str) -> Result<NaiveDate, String> {
    parse_date(text).ok_or_else(|| format!("'{text}' is not a YYYY-MM-DD date"))
}

fn main() {
    let args = Args::parse();
    init_tracing(&args.log_level);

    // One reading of the clock per run.
    let today = args.today.unwrap_or_else(|| Local::now().date_naive());

    let result = match args.command {
        Command::Compute { rules, events } => compute(&rules, &events, today),
        Command::Batch {
            rules_dir,
            customers_dir,
            out_dir,
        } => run_batch(&rules_dir, &customers_dir, &out_dir, today),
    };

    match result {
        Ok(true) => {}
        Ok(false) => process::exit(1),
        Err(e) => {
            eprintln!("Error: {e}");
            process::exit(2);
        }
    }
}

fn init_tracing(filter: &str) {
    let filter = EnvFilter::try_new(filter).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Prints one snapshot. Returns `Ok(false)` if the snapshot carries errors.
fn compute(rules: &Path, events: &Path, today: NaiveDate) -> Result<bool, LedgerError> {
    let rule_sets = RuleSetCollection::from_value(&load_rule_sets(rules)?);
    for problem in rule_sets.problems() {
        tracing::warn!(%problem, "rejected rule set");
    }

    let engine = BalanceEngine::new(rule_sets);
    let snapshot = engine.compute_balance(&load_events(events)?, today);
    write_snapshot(&snapshot, std::io::stdout())?;
    Ok(!snapshot.is_error())
}

fn write_snapshot<W: Write>(snapshot: &BalanceSnapshot, mut writer: W) -> Result<(), LedgerError> {
    let json = serde_json::to_string_pretty(snapshot).map_err(|e| LedgerError::Malformed(e.to_string()))?;
    writeln!(writer, "{json}").map_err(|e| LedgerError::Io {
        path: "<stdout>".to_string(),
        message: e.to_string(),
    })
}

/// Runs the cross product. Returns `Ok(false)` if any rule-set file was
/// rejected or any computation failed.
fn run_batch(
    rules_dir: &Path,
    customers_dir: &Path,
    out_dir: &Path,
    today: NaiveDate,
) -> Result<bool, LedgerError> {
    let rules = batch::load_rules_dir(rules_dir)?;
    let customers = batch::load_customers_dir(customers_dir)?;
    tracing::info!(rule_sets = rules.len(), customers = customers.len(), %today, "starting batch");

    let report = batch::run(&rules, &customers, today)?;
    let written = batch::write_report(&report, out_dir)?;
    tracing::info!(files = written.len(), out_dir = %out_dir.display(), "batch complete");

    print_summary(&report);
    Ok(report.rejected_rules.is_empty() && report.outcomes.iter().all(|o| !o.snapshot.is_error()))
}

fn print_summary(report: &BatchReport) {
    for rules in &report.rejected_rules {
        println!("{rules}: Invalid ruleSets");
    }
    for outcome in &report.outcomes {
        let status = match (&outcome.snapshot.error_messages, outcome.snapshot.escalation_flag) {
            (Some(errors), _) => errors.replace('\n', "; "),
            (None, Some(flag)) => flag.to_string(),
            (None, None) => String::new(),
        };
        println!("{} x {}: {status}", outcome.rules, outcome.customer);
    }
}
