//! Relationship graph and the algorithms that run over it

pub mod algo;
mod builder;
pub mod louvain;
mod model;

pub use builder::{build, GraphBuilder};
pub use model::{EdgeData, EdgeType, GraphStats, NetworkGraph};
