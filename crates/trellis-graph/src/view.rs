//! Ephemeral petgraph view over an exported scope.
//!
//! Nodes are inserted in sorted symbol-id order and edges in sorted
//! (source, target, kind) order, so two views built from the same scope are
//! structurally identical regardless of how the export was assembled.

use std::collections::HashMap;

use petgraph::Direction;
use petgraph::graph::{DiGraph, NodeIndex};
use trellis_core::{EdgeKind, SymbolId};
use trellis_store::GraphScope;

pub struct GraphView {
    graph: DiGraph<SymbolId, EdgeKind>,
    indices: HashMap<SymbolId, NodeIndex>,
}

impl GraphView {
    pub fn from_scope(scope: &GraphScope) -> Self {
        let mut ids: Vec<SymbolId> = scope.nodes.iter().map(|n| n.id).collect();
        ids.sort_unstable();
        ids.dedup();

        let mut graph = DiGraph::with_capacity(ids.len(), scope.edges.len());
        let mut indices = HashMap::with_capacity(ids.len());
        for id in ids {
            let index = graph.add_node(id);
            indices.insert(id, index);
        }

        let mut edges: Vec<(SymbolId, SymbolId, EdgeKind)> = scope
            .edges
            .iter()
            .map(|e| (e.source, e.target, e.kind))
            .collect();
        edges.sort_unstable_by(|a, b| {
            (a.0, a.1, a.2.as_str()).cmp(&(b.0, b.1, b.2.as_str()))
        });
        edges.dedup();
        for (source, target, kind) in edges {
            if let (Some(&s), Some(&t)) = (indices.get(&source), indices.get(&target)) {
                graph.add_edge(s, t, kind);
            }
        }

        GraphView { graph, indices }
    }

    pub fn graph(&self) -> &DiGraph<SymbolId, EdgeKind> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn is_empty(&self) -> bool {
        self.graph.node_count() == 0
    }

    pub fn index_of(&self, id: SymbolId) -> Option<NodeIndex> {
        self.indices.get(&id).copied()
    }

    pub fn symbol_of(&self, index: NodeIndex) -> SymbolId {
        self.graph[index]
    }

    /// All symbol ids in ascending order.
    pub fn symbols(&self) -> Vec<SymbolId> {
        let mut ids: Vec<SymbolId> = self.indices.keys().copied().collect();
        ids.sort_unstable();
        ids
    }

    /// Successors of a node in ascending symbol-id order. Algorithms that
    /// walk the graph use this so ties break the same way every run.
    pub fn sorted_successors(&self, index: NodeIndex) -> Vec<NodeIndex> {
        let mut out: Vec<NodeIndex> = self
            .graph
            .neighbors_directed(index, Direction::Outgoing)
            .collect();
        out.sort_unstable_by_key(|&n| self.graph[n]);
        out.dedup();
        out
    }
}
