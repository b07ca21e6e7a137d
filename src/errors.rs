//! Errors raised inside the graph algorithms
//!
//! These never reach library callers: the analyzers catch them, log a warning
//! and substitute a documented fallback (uniform PageRank, degree centrality
//! for eigenvector, k-means for community detection).

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AlgorithmError {
    #[error("{algorithm} did not converge within {iterations} iterations")]
    NonConvergence {
        algorithm: &'static str,
        iterations: usize,
    },

    #[error("{algorithm} produced non-finite values")]
    NonFinite { algorithm: &'static str },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("degenerate input: {0}")]
    Degenerate(String),
}

pub type AlgoResult<T> = Result<T, AlgorithmError>;
