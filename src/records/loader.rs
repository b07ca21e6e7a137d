//! CSV loading for the three record sets

use super::{
    sample_dataset, validate_actors, validate_calls, validate_columns, validate_transactions,
    DataError, Dataset, RawRow, RecordSet,
};
use std::fs::File;
use std::path::Path;
use tracing::{info, warn};

pub const ACTORS_FILE: &str = "suspects.csv";
pub const CALLS_FILE: &str = "call_logs.csv";
pub const TRANSACTIONS_FILE: &str = "transactions.csv";

/// Read every row of a CSV file into column -> text maps, after checking the
/// header carries the record set's required columns.
pub fn read_rows(path: &Path, record_set: RecordSet) -> Result<Vec<RawRow>, DataError> {
    if !path.exists() {
        return Err(DataError::NotFound {
            record_set,
            path: path.to_path_buf(),
        });
    }

    let malformed = |e: &dyn std::fmt::Display| DataError::Malformed {
        record_set,
        message: e.to_string(),
    };

    let file = File::open(path).map_err(|e| malformed(&e))?;
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(false)
        .from_reader(file);

    let headers: Vec<String> = reader
        .headers()
        .map_err(|e| malformed(&e))?
        .iter()
        .map(|h| h.to_string())
        .collect();
    validate_columns(record_set, &headers)?;

    let mut rows = Vec::new();
    for result in reader.deserialize::<RawRow>() {
        rows.push(result.map_err(|e| malformed(&e))?);
    }

    info!("Loaded {} {} records from {}", rows.len(), record_set, path.display());
    Ok(rows)
}

/// Load and validate `suspects.csv`, `call_logs.csv` and `transactions.csv`
/// from a data directory.
pub fn load_dataset(data_dir: &Path) -> Result<Dataset, DataError> {
    let actors = validate_actors(&read_rows(&data_dir.join(ACTORS_FILE), RecordSet::Actors)?)?;
    let calls = validate_calls(&read_rows(&data_dir.join(CALLS_FILE), RecordSet::Calls)?)?;
    let transactions = validate_transactions(&read_rows(
        &data_dir.join(TRANSACTIONS_FILE),
        RecordSet::Transactions,
    )?)?;

    info!(
        "Dataset loaded: {} actors, {} calls, {} transactions",
        actors.len(),
        calls.len(),
        transactions.len()
    );

    Ok(Dataset {
        actors,
        calls,
        transactions,
    })
}

/// Load the dataset, or use the built-in sample when any file is absent.
///
/// Only a missing file triggers the fallback. Malformed records are still
/// returned as errors.
pub fn load_or_sample(data_dir: &Path) -> Result<Dataset, DataError> {
    match load_dataset(data_dir) {
        Err(DataError::NotFound { record_set, path }) => {
            warn!(
                "{} not found at {}, using built-in sample data",
                record_set,
                path.display()
            );
            Ok(sample_dataset())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_dataset_roundtrip() {
        let dir = tempdir().unwrap();
        write(dir.path(), ACTORS_FILE, "suspect_id,name,age\nS1,Ann,30\nS2,Bob,41\n");
        write(dir.path(), CALLS_FILE, "from,to,duration,timestamp\nS1,S2,60,2024-01-01\n");
        write(dir.path(), TRANSACTIONS_FILE, "from,to,amount\nS2,S1,250.5\n");

        let dataset = load_dataset(dir.path()).unwrap();
        assert_eq!(dataset.actors.len(), 2);
        assert_eq!(dataset.calls[0].duration, 60.0);
        assert_eq!(dataset.transactions[0].amount, 250.5);
    }

    #[test]
    fn test_missing_column_is_rejected() {
        let dir = tempdir().unwrap();
        write(dir.path(), CALLS_FILE, "from,to\nS1,S2\n");
        let err = read_rows(&dir.path().join(CALLS_FILE), RecordSet::Calls).unwrap_err();
        assert!(matches!(err, DataError::MissingColumns { .. }));
    }

    #[test]
    fn test_load_or_sample_falls_back_only_when_missing() {
        let dir = tempdir().unwrap();
        let dataset = load_or_sample(dir.path()).unwrap();
        assert_eq!(dataset.actors.len(), sample_dataset().actors.len());

        write(dir.path(), ACTORS_FILE, "suspect_id,name\nS1,\n");
        write(dir.path(), CALLS_FILE, "from,to,duration\n");
        write(dir.path(), TRANSACTIONS_FILE, "from,to,amount\n");
        let err = load_or_sample(dir.path()).unwrap_err();
        assert!(matches!(err, DataError::MissingField { field: "name", .. }));
    }
}
