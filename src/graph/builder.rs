//! Graph construction from call and transaction records

use super::model::{EdgeData, NetworkGraph};
use crate::records::{CallRecord, TransactionRecord};
use tracing::{info, warn};

/// Incremental builder. Records for an already-linked pair merge into the
/// existing edge instead of creating a parallel one.
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: NetworkGraph,
    calls: usize,
    transactions: usize,
    skipped: usize,
}

impl GraphBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_call(&mut self, source: &str, target: &str, duration: f64) -> &mut Self {
        if let Some((a, b)) = self.endpoints(source, target) {
            match self.graph.find_edge_index(a, b) {
                Some(e) => {
                    if let Some(data) = self.graph.edge_data_mut(e) {
                        data.add_call(duration);
                    }
                }
                None => {
                    self.graph.insert_edge(a, b, EdgeData::from_call(duration));
                }
            }
            self.calls += 1;
        }
        self
    }

    pub fn add_transaction(&mut self, source: &str, target: &str, amount: f64) -> &mut Self {
        if let Some((a, b)) = self.endpoints(source, target) {
            match self.graph.find_edge_index(a, b) {
                Some(e) => {
                    if let Some(data) = self.graph.edge_data_mut(e) {
                        data.add_transaction(amount);
                    }
                }
                None => {
                    self.graph.insert_edge(a, b, EdgeData::from_transaction(amount));
                }
            }
            self.transactions += 1;
        }
        self
    }

    /// Register an actor that may have no records
    pub fn add_actor(&mut self, id: &str) -> &mut Self {
        self.graph.ensure_node(id);
        self
    }

    fn endpoints(&mut self, source: &str, target: &str) -> Option<(usize, usize)> {
        if source == target {
            // Validation rejects these; anything arriving here is dropped.
            warn!("Skipping self-referencing record for '{}'", source);
            self.skipped += 1;
            return None;
        }
        Some((self.graph.ensure_node(source), self.graph.ensure_node(target)))
    }

    pub fn finish(self) -> NetworkGraph {
        info!(
            "Built graph with {} nodes and {} edges",
            self.graph.node_count(),
            self.graph.edge_count()
        );
        info!(
            "Processed {} calls and {} transactions ({} skipped)",
            self.calls, self.transactions, self.skipped
        );
        self.graph
    }
}

/// Build the relationship graph. All calls are merged first, then all
/// transactions, so node order follows first reference in that sequence.
pub fn build(calls: &[CallRecord], transactions: &[TransactionRecord]) -> NetworkGraph {
    let mut builder = GraphBuilder::new();
    for call in calls {
        builder.add_call(&call.source, &call.target, call.duration);
    }
    for tx in transactions {
        builder.add_transaction(&tx.source, &tx.target, tx.amount);
    }
    builder.finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::EdgeType;

    #[test]
    fn test_repeated_calls_merge() {
        let g = build(
            &[
                CallRecord::new("a", "b", 10.0),
                CallRecord::new("b", "a", 20.0),
                CallRecord::new("a", "b", 5.0),
            ],
            &[],
        );
        assert_eq!(g.edge_count(), 1);
        let e = g.edge("a", "b").unwrap();
        assert_eq!(e.weight, 35.0);
        assert_eq!(e.call_count, Some(3));
        assert_eq!(e.edge_type, EdgeType::Call);
        assert!(e.total_amount.is_none());
    }

    #[test]
    fn test_merge_is_order_independent() {
        let records = [
            CallRecord::new("a", "b", 1.5),
            CallRecord::new("b", "a", 2.5),
            CallRecord::new("a", "b", 4.0),
        ];
        let forward = build(&records, &[]);
        let mut reversed_records = records.to_vec();
        reversed_records.reverse();
        let reversed = build(&reversed_records, &[]);

        let (f, r) = (forward.edge("a", "b").unwrap(), reversed.edge("a", "b").unwrap());
        assert_eq!(f.weight, r.weight);
        assert_eq!(f.call_count, r.call_count);
    }

    #[test]
    fn test_call_then_transaction_becomes_mixed() {
        let g = build(
            &[CallRecord::new("x", "y", 5.0)],
            &[TransactionRecord::new("y", "x", 100.0)],
        );
        assert_eq!(g.edge_count(), 1);
        let e = g.edge("x", "y").unwrap();
        assert_eq!(e.weight, 5.0);
        assert_eq!(e.total_amount, Some(100.0));
        assert_eq!(e.edge_type, EdgeType::Mixed);
        assert_eq!(e.call_count, Some(1));
        assert_eq!(e.tx_count, Some(1));
    }

    #[test]
    fn test_transaction_then_call_becomes_mixed() {
        let mut builder = GraphBuilder::new();
        builder
            .add_transaction("p", "q", 40.0)
            .add_call("q", "p", 3.0);
        let g = builder.finish();
        let e = g.edge("p", "q").unwrap();
        assert_eq!(e.edge_type, EdgeType::Mixed);
        assert_eq!(e.weight, 43.0);
        assert_eq!(e.call_count, Some(1));
        assert_eq!(e.tx_count, Some(1));
    }

    #[test]
    fn test_mixed_never_reverts() {
        let mut builder = GraphBuilder::new();
        builder
            .add_call("a", "b", 1.0)
            .add_transaction("a", "b", 10.0)
            .add_call("a", "b", 1.0)
            .add_transaction("b", "a", 10.0)
            .add_call("b", "a", 1.0);
        let g = builder.finish();
        let e = g.edge("a", "b").unwrap();
        assert_eq!(e.edge_type, EdgeType::Mixed);
        assert_eq!(e.call_count, Some(3));
        assert_eq!(e.tx_count, Some(2));
        assert_eq!(e.total_amount, Some(20.0));
        assert_eq!(e.weight, 3.0);
    }

    #[test]
    fn test_node_order_follows_first_reference() {
        let g = build(
            &[CallRecord::new("c", "a", 1.0)],
            &[TransactionRecord::new("b", "c", 1.0)],
        );
        let nodes: Vec<&str> = g.nodes().collect();
        assert_eq!(nodes, vec!["c", "a", "b"]);
    }

    #[test]
    fn test_isolated_actor() {
        let mut builder = GraphBuilder::new();
        builder.add_call("a", "b", 1.0).add_actor("z").add_actor("a");
        let g = builder.finish();
        assert_eq!(g.node_count(), 3);
        assert_eq!(g.degree_of("z"), 0);
        assert!(!g.is_connected());
    }

    #[test]
    fn test_self_reference_skipped() {
        let g = build(&[CallRecord::new("a", "a", 1.0)], &[]);
        assert_eq!(g.node_count(), 0);
        assert_eq!(g.edge_count(), 0);
    }
}
