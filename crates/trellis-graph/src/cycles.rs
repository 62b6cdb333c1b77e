//! Cycle detection over strongly connected components.

use std::collections::HashSet;

use petgraph::algo::tarjan_scc;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use trellis_core::SymbolId;

use crate::view::GraphView;

/// A non-trivial strongly connected component.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CycleComponent {
    /// Member symbols in ascending id order.
    pub members: Vec<SymbolId>,
    /// Internal edges over all edges touching a member. 1.0 means the
    /// component is sealed off; low values mean the cycle is entangled with
    /// the rest of the graph.
    pub tangle_ratio: f64,
}

/// Components of two or more mutually reachable nodes, ordered by their
/// smallest member.
pub fn cycles(view: &GraphView) -> Vec<CycleComponent> {
    let graph = view.graph();
    let mut components: Vec<CycleComponent> = tarjan_scc(graph)
        .into_iter()
        .filter(|component| component.len() > 1)
        .map(|component| {
            let inside: HashSet<_> = component.iter().copied().collect();
            let mut internal = 0usize;
            let mut touching = 0usize;
            for edge in graph.edge_references() {
                let source_in = inside.contains(&edge.source());
                let target_in = inside.contains(&edge.target());
                if source_in && target_in {
                    internal += 1;
                    touching += 1;
                } else if source_in || target_in {
                    touching += 1;
                }
            }
            let mut members: Vec<SymbolId> =
                component.iter().map(|&index| graph[index]).collect();
            members.sort_unstable();
            CycleComponent {
                members,
                tangle_ratio: internal as f64 / touching.max(1) as f64,
            }
        })
        .collect();
    components.sort_by(|a, b| a.members.cmp(&b.members));
    components
}
