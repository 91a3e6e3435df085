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

//! Error types for balance computation.

use chrono::NaiveDate;
use std::fmt;
use thiserror::Error;

/// Balance computation errors.
///
/// The `Display` text of each variant is the message surfaced to callers in
/// [`BalanceSnapshot::error_messages`](crate::BalanceSnapshot).
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LedgerError {
    /// Rule-set collection is empty or has a malformed entry
    #[error("Invalid ruleSets")]
    InvalidRuleSets,

    /// One or more events failed validation
    #[error("{0}")]
    InvalidEvents(ValidationErrors),

    /// An event predates every rule set
    #[error("Rule Set not found for {0}")]
    RuleSetNotFound(NaiveDate),

    /// A running total or a fee left the representable decimal range
    #[error("Amount overflow on {0}")]
    AmountOverflow(NaiveDate),

    /// Input text could not be deserialized
    #[error("malformed input: {0}")]
    Malformed(String),

    /// Reading or writing a harness file failed
    #[error("{path}: {message}")]
    Io { path: String, message: String },

    /// A batch worker thread panicked
    #[error("batch worker panicked")]
    WorkerPanicked,
}

/// A single problem found in a single raw event.
///
/// `index` is the event's position in the submitted list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Event {index}: not an object")]
    NotAnObject { index: usize },

    #[error("Event {index}: missing required field '{field}'")]
    MissingField { index: usize, field: &'static str },

    #[error("Event {index}: invalid date '{value}'")]
    InvalidDate { index: usize, value: String },

    #[error("Event {index}: field '{field}' has invalid value '{value}'")]
    InvalidField {
        index: usize,
        field: &'static str,
        value: String,
    },

    #[error("Event {index}: field '{field}' is reserved for system-generated rows")]
    ReservedField { index: usize, field: &'static str },
}

/// Every problem found across a batch of events, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationErrors(Vec<ValidationError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, error: ValidationError) {
        self.0.push(error);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ValidationError> {
        self.0.iter()
    }

    /// One message per problem.
    pub fn messages(&self) -> Vec<String> {
        self.0.iter().map(ToString::to_string).collect()
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.messages().join("\n"))
    }
}

impl From<ValidationErrors> for LedgerError {
    fn from(errors: ValidationErrors) -> Self {
        LedgerError::InvalidEvents(errors)
    }
}
