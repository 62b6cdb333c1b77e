//! Propagation cost: density of the transitive closure.
//!
//! The exact computation is one BFS per node, quadratic in the worst case,
//! so scopes above the configured node guard switch to an evenly spaced
//! sample of start nodes and the result is flagged approximate instead of
//! letting latency grow unbounded.

use std::collections::VecDeque;

use petgraph::graph::NodeIndex;
use serde::Serialize;
use tracing::debug;
use trellis_core::AlgorithmConfig;

use crate::view::GraphView;

/// A result that may have been computed on a sample rather than the full
/// scope.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Guarded<T> {
    pub value: T,
    pub approximate: bool,
}

/// Mean fraction of the graph reachable from a node, itself included.
/// 1/n for a graph with no edges, 1.0 for a complete reachability relation.
pub fn propagation_cost(view: &GraphView, cfg: &AlgorithmConfig) -> Guarded<f64> {
    let graph = view.graph();
    let n = graph.node_count();
    if n == 0 {
        return Guarded {
            value: 0.0,
            approximate: false,
        };
    }

    let starts: Vec<NodeIndex> = graph.node_indices().collect();
    let (sampled, approximate) = if n <= cfg.size_guard_nodes {
        (starts, false)
    } else {
        // Evenly spaced over the sorted node order, sqrt-scaled count.
        let count = ((n as f64).sqrt() * 5.0).max(200.0).min(n as f64) as usize;
        let step = (n / count).max(1);
        (starts.into_iter().step_by(step).collect(), true)
    };
    debug!(nodes = n, sampled = sampled.len(), approximate, "propagation cost");

    let mut total_reachable = 0usize;
    let mut seen = vec![0u32; n];
    let mut epoch = 0u32;
    for &start in &sampled {
        epoch += 1;
        seen[start.index()] = epoch;
        let mut reachable = 1usize;
        let mut queue = VecDeque::from([start]);
        while let Some(current) = queue.pop_front() {
            for next in graph.neighbors(current) {
                if seen[next.index()] != epoch {
                    seen[next.index()] = epoch;
                    reachable += 1;
                    queue.push_back(next);
                }
            }
        }
        total_reachable += reachable;
    }

    Guarded {
        value: total_reachable as f64 / (sampled.len() * n) as f64,
        approximate,
    }
}
