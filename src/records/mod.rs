//! Input records and validation
//!
//! Three record sets feed an analysis run:
//! - actors (`suspects.csv`: `suspect_id`, `name`)
//! - call logs (`call_logs.csv`: `from`, `to`, `duration`)
//! - transactions (`transactions.csv`: `from`, `to`, `amount`)
//!
//! Every row is validated before it can reach the graph builder. Malformed
//! rows are rejected with the record set, row number and field that failed;
//! nothing is silently coerced.

mod loader;
mod sample;

pub use loader::{load_dataset, load_or_sample, read_rows, ACTORS_FILE, CALLS_FILE, TRANSACTIONS_FILE};
pub use sample::sample_dataset;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// One raw row as read from a tabular source: column name -> cell text.
pub type RawRow = HashMap<String, String>;

/// Which record set a record (or an error) belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RecordSet {
    Actors,
    Calls,
    Transactions,
}

impl RecordSet {
    /// Columns every row of this set must carry
    pub fn required_columns(&self) -> &'static [&'static str] {
        match self {
            RecordSet::Actors => &["suspect_id", "name"],
            RecordSet::Calls => &["from", "to", "duration"],
            RecordSet::Transactions => &["from", "to", "amount"],
        }
    }
}

impl fmt::Display for RecordSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecordSet::Actors => write!(f, "suspects"),
            RecordSet::Calls => write!(f, "call_logs"),
            RecordSet::Transactions => write!(f, "transactions"),
        }
    }
}

/// Malformed or missing input. The only error kind that escapes the core.
#[derive(Error, Debug)]
pub enum DataError {
    #[error("{record_set} file not found: {}", path.display())]
    NotFound { record_set: RecordSet, path: PathBuf },

    #[error("{record_set} is missing columns: {}", columns.join(", "))]
    MissingColumns {
        record_set: RecordSet,
        columns: Vec<String>,
    },

    #[error("{record_set} row {row}: missing required field '{field}'")]
    MissingField {
        record_set: RecordSet,
        row: usize,
        field: &'static str,
    },

    #[error("{record_set} row {row}: field '{field}' is not a finite non-negative number: '{value}'")]
    InvalidNumber {
        record_set: RecordSet,
        row: usize,
        field: &'static str,
        value: String,
    },

    #[error("{record_set} row {row}: source and target are both '{id}'")]
    SelfReference {
        record_set: RecordSet,
        row: usize,
        id: String,
    },

    #[error("{record_set}: unreadable input: {message}")]
    Malformed {
        record_set: RecordSet,
        message: String,
    },
}

/// A known actor (suspect)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Actor {
    pub actor_id: String,
    pub name: String,
}

/// A single call between two actors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallRecord {
    pub source: String,
    pub target: String,
    /// Call duration (seconds)
    pub duration: f64,
}

impl CallRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, duration: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            duration,
        }
    }
}

/// A single money transfer between two actors
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub source: String,
    pub target: String,
    pub amount: f64,
}

impl TransactionRecord {
    pub fn new(source: impl Into<String>, target: impl Into<String>, amount: f64) -> Self {
        Self {
            source: source.into(),
            target: target.into(),
            amount,
        }
    }
}

/// The three validated record sets of one analysis run
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Dataset {
    pub actors: Vec<Actor>,
    pub calls: Vec<CallRecord>,
    pub transactions: Vec<TransactionRecord>,
}

impl Dataset {
    /// Look up an actor's display name, falling back to the id itself
    pub fn actor_name<'a>(&'a self, actor_id: &'a str) -> &'a str {
        self.actors
            .iter()
            .find(|a| a.actor_id == actor_id)
            .map(|a| a.name.as_str())
            .unwrap_or(actor_id)
    }
}

/// Check that a header row carries every column the record set requires.
pub fn validate_columns<S: AsRef<str>>(record_set: RecordSet, headers: &[S]) -> Result<(), DataError> {
    let missing: Vec<String> = record_set
        .required_columns()
        .iter()
        .filter(|col| !headers.iter().any(|h| h.as_ref().trim() == **col))
        .map(|col| col.to_string())
        .collect();

    if missing.is_empty() {
        Ok(())
    } else {
        Err(DataError::MissingColumns {
            record_set,
            columns: missing,
        })
    }
}

fn required_text(
    row: &RawRow,
    record_set: RecordSet,
    row_number: usize,
    field: &'static str,
) -> Result<String, DataError> {
    row.get(field)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .map(|v| v.to_string())
        .ok_or(DataError::MissingField {
            record_set,
            row: row_number,
            field,
        })
}

fn required_number(
    row: &RawRow,
    record_set: RecordSet,
    row_number: usize,
    field: &'static str,
) -> Result<f64, DataError> {
    let text = required_text(row, record_set, row_number, field)?;
    match text.parse::<f64>() {
        Ok(v) if v.is_finite() && v >= 0.0 => Ok(v),
        _ => Err(DataError::InvalidNumber {
            record_set,
            row: row_number,
            field,
            value: text,
        }),
    }
}

fn endpoints(row: &RawRow, record_set: RecordSet, row_number: usize) -> Result<(String, String), DataError> {
    let source = required_text(row, record_set, row_number, "from")?;
    let target = required_text(row, record_set, row_number, "to")?;
    if source == target {
        return Err(DataError::SelfReference {
            record_set,
            row: row_number,
            id: source,
        });
    }
    Ok((source, target))
}

/// Validate actor rows. Row numbers in errors are 1-based data rows.
pub fn validate_actors(rows: &[RawRow]) -> Result<Vec<Actor>, DataError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            Ok(Actor {
                actor_id: required_text(row, RecordSet::Actors, i + 1, "suspect_id")?,
                name: required_text(row, RecordSet::Actors, i + 1, "name")?,
            })
        })
        .collect()
}

/// Validate call-log rows.
pub fn validate_calls(rows: &[RawRow]) -> Result<Vec<CallRecord>, DataError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let (source, target) = endpoints(row, RecordSet::Calls, i + 1)?;
            let duration = required_number(row, RecordSet::Calls, i + 1, "duration")?;
            Ok(CallRecord {
                source,
                target,
                duration,
            })
        })
        .collect()
}

/// Validate transaction rows.
pub fn validate_transactions(rows: &[RawRow]) -> Result<Vec<TransactionRecord>, DataError> {
    rows.iter()
        .enumerate()
        .map(|(i, row)| {
            let (source, target) = endpoints(row, RecordSet::Transactions, i + 1)?;
            let amount = required_number(row, RecordSet::Transactions, i + 1, "amount")?;
            Ok(TransactionRecord {
                source,
                target,
                amount,
            })
        })
        .collect()
}
