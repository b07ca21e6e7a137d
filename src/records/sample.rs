//! Built-in demonstration dataset
//!
//! Eight actors, ten calls and eight transactions. Small enough to read at a
//! glance, connected enough that every analysis produces something.

use super::{Actor, CallRecord, Dataset, TransactionRecord};

const ACTORS: [(&str, &str); 8] = [
    ("S001", "John Doe"),
    ("S002", "Jane Smith"),
    ("S003", "Bob Wilson"),
    ("S004", "Alice Brown"),
    ("S005", "Charlie Davis"),
    ("S006", "Diana Evans"),
    ("S007", "Frank Miller"),
    ("S008", "Grace Lee"),
];

const CALLS: [(&str, &str, f64); 10] = [
    ("S001", "S002", 120.0),
    ("S001", "S003", 45.0),
    ("S002", "S003", 300.0),
    ("S003", "S004", 180.0),
    ("S004", "S005", 90.0),
    ("S005", "S006", 250.0),
    ("S001", "S004", 60.0),
    ("S006", "S007", 150.0),
    ("S007", "S008", 200.0),
    ("S002", "S005", 75.0),
];

const TRANSACTIONS: [(&str, &str, f64); 8] = [
    ("S001", "S002", 5000.0),
    ("S002", "S004", 12000.0),
    ("S003", "S005", 3500.0),
    ("S001", "S006", 8000.0),
    ("S004", "S007", 15000.0),
    ("S005", "S008", 2500.0),
    ("S006", "S008", 6000.0),
    ("S002", "S003", 9500.0),
];

/// The sample dataset used by `netsleuth demo` and when no data files exist.
pub fn sample_dataset() -> Dataset {
    Dataset {
        actors: ACTORS
            .iter()
            .map(|(id, name)| Actor {
                actor_id: id.to_string(),
                name: name.to_string(),
            })
            .collect(),
        calls: CALLS
            .iter()
            .map(|&(s, t, d)| CallRecord::new(s, t, d))
            .collect(),
        transactions: TRANSACTIONS
            .iter()
            .map(|&(s, t, a)| TransactionRecord::new(s, t, a))
            .collect(),
    }
}
