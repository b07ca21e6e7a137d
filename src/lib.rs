//! netsleuth - graph analytics for fraud networks
//!
//! Builds a weighted relationship graph from call and transaction records,
//! ranks likely kingpins by centrality, partitions actors into rings and
//! scores each actor's risk with a weakly-supervised tree ensemble.

pub mod brief;
pub mod cli;
pub mod config;
pub mod errors;
pub mod graph;
pub mod kingpin;
pub mod math;
pub mod pipeline;
pub mod records;
pub mod rings;
pub mod risk;
pub mod scaler;
