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

//! Loading rule sets and events from disk.
//!
//! Rule sets are JSON objects keyed by start date. Events are a JSON array of
//! objects, or a CSV file with the header `date,amount,description,notes,netD`.
//! Loading only decodes; validation happens in the engine.

use crate::error::LedgerError;
use csv::{ReaderBuilder, Trim};
use serde_json::{Map, Value};
use std::fs;
use std::io::Read;
use std::path::Path;

/// Reads a JSON rule-set file.
///
/// # Errors
///
/// Returns [`LedgerError::Io`] if the file cannot be read and
/// [`LedgerError::Malformed`] if it is not JSON.
pub fn load_rule_sets(path: &Path) -> Result<Value, LedgerError> {
    read_json(path)
}

/// Reads an events file, picking the decoder from the extension.
///
/// # Errors
///
/// Returns [`LedgerError::Io`] if the file cannot be read and
/// [`LedgerError::Malformed`] if it cannot be decoded.
pub fn load_events(path: &Path) -> Result<Value, LedgerError> {
    let is_csv = path
        .extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| ext.eq_ignore_ascii_case("csv"));

    if is_csv {
        let file = fs::File::open(path).map_err(|e| io_error(path, e))?;
        events_from_csv(file)
    } else {
        read_json(path)
    }
}

/// Decodes CSV events into the same shape as JSON events.
///
/// Every cell stays a string so the validator sees exactly what was typed.
/// Cells a short row does not reach are left out, which the validator reports
/// as missing fields.
///
/// # Errors
///
/// Returns [`LedgerError::Malformed`] if the CSV structure is unreadable.
pub fn events_from_csv<R: Read>(reader: R) -> Result<Value, LedgerError> {
    let mut rdr = ReaderBuilder::new()
        .trim(Trim::All)
        .flexible(true)
        .has_headers(true)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| LedgerError::Malformed(e.to_string()))?
        .clone();

    let mut events = Vec::new();
    for record in rdr.records() {
        let record = record.map_err(|e| LedgerError::Malformed(e.to_string()))?;
        let event: Map<String, Value> = headers
            .iter()
            .zip(record.iter())
            .map(|(name, cell)| (name.to_string(), Value::String(cell.to_string())))
            .collect();
        events.push(Value::Object(event));
    }

    Ok(Value::Array(events))
}

fn read_json(path: &Path) -> Result<Value, LedgerError> {
    let text = fs::read_to_string(path).map_err(|e| io_error(path, e))?;
    serde_json::from_str(&text)
        .map_err(|e| LedgerError::Malformed(format!("{}: {e}", path.display())))
}

pub(crate) fn io_error(path: &Path, error: std::io::Error) -> LedgerError {
    LedgerError::Io {
        path: path.display().to_string(),
        message: error.to_string(),
    }
}
