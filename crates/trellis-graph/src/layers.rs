//! Dependency layering over the SCC condensation.
//!
//! A node's layer is the length of the longest path reaching it from the
//! root set (nodes with no incoming edges), computed on the condensation so
//! cycles cannot make the walk diverge; every member of a cycle shares its
//! component's layer. The result is a flat symbol-to-layer map. Consumers
//! key off that shape, so it must stay a direct mapping rather than
//! grouped per-layer lists.

use std::collections::HashMap;

use petgraph::algo::tarjan_scc;
use petgraph::visit::EdgeRef;
use serde::Serialize;
use trellis_core::SymbolId;

use crate::view::GraphView;

pub fn layers(view: &GraphView) -> HashMap<SymbolId, u32> {
    let graph = view.graph();
    if graph.node_count() == 0 {
        return HashMap::new();
    }

    // tarjan_scc emits components in reverse topological order.
    let components = tarjan_scc(graph);
    let mut component_of = vec![0usize; graph.node_count()];
    for (id, component) in components.iter().enumerate() {
        for &index in component {
            component_of[index.index()] = id;
        }
    }

    let mut layer = vec![0u32; components.len()];
    for id in (0..components.len()).rev() {
        for &index in &components[id] {
            for edge in graph.edges(index) {
                let successor = component_of[edge.target().index()];
                if successor != id {
                    layer[successor] = layer[successor].max(layer[id] + 1);
                }
            }
        }
    }

    graph
        .node_indices()
        .map(|index| (graph[index], layer[component_of[index.index()]]))
        .collect()
}

/// An edge that fails to descend the layering: its source sits at or above
/// its target's layer. These are exactly the edges inside cycles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LayerViolation {
    pub source: SymbolId,
    pub target: SymbolId,
    pub source_layer: u32,
    pub target_layer: u32,
}

/// Edges whose source layer is not strictly below the target layer, sorted
/// by (source, target).
pub fn layer_violations(
    view: &GraphView,
    layers: &HashMap<SymbolId, u32>,
) -> Vec<LayerViolation> {
    let graph = view.graph();
    let mut violations: Vec<LayerViolation> = graph
        .edge_references()
        .filter_map(|edge| {
            let source = graph[edge.source()];
            let target = graph[edge.target()];
            let source_layer = *layers.get(&source)?;
            let target_layer = *layers.get(&target)?;
            (source_layer >= target_layer).then_some(LayerViolation {
                source,
                target,
                source_layer,
                target_layer,
            })
        })
        .collect();
    violations.sort_unstable_by_key(|v| (v.source, v.target));
    violations.dedup();
    violations
}
