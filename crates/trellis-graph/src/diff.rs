//! Symmetric difference between two graph snapshots.
//!
//! Keys are the stable symbol ids, so a diff between snapshots taken
//! before and after an index pass shows exactly the blast radius of the
//! change, independent of export order.

use std::collections::BTreeSet;

use serde::Serialize;
use trellis_core::{EdgeKind, SymbolId};
use trellis_store::GraphScope;

/// An edge in delta form, enough to identify it across snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DeltaEdge {
    pub source: SymbolId,
    pub target: SymbolId,
    pub kind: EdgeKind,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GraphDelta {
    pub added_nodes: Vec<SymbolId>,
    pub removed_nodes: Vec<SymbolId>,
    pub added_edges: Vec<DeltaEdge>,
    pub removed_edges: Vec<DeltaEdge>,
}

impl GraphDelta {
    pub fn is_empty(&self) -> bool {
        self.added_nodes.is_empty()
            && self.removed_nodes.is_empty()
            && self.added_edges.is_empty()
            && self.removed_edges.is_empty()
    }
}

pub fn snapshot_diff(before: &GraphScope, after: &GraphScope) -> GraphDelta {
    let nodes_before: BTreeSet<SymbolId> = before.nodes.iter().map(|n| n.id).collect();
    let nodes_after: BTreeSet<SymbolId> = after.nodes.iter().map(|n| n.id).collect();

    let edges_before = edge_keys(before);
    let edges_after = edge_keys(after);

    GraphDelta {
        added_nodes: nodes_after.difference(&nodes_before).copied().collect(),
        removed_nodes: nodes_before.difference(&nodes_after).copied().collect(),
        added_edges: edges_after
            .difference(&edges_before)
            .map(delta_edge)
            .collect(),
        removed_edges: edges_before
            .difference(&edges_after)
            .map(delta_edge)
            .collect(),
    }
}

type EdgeKey = (SymbolId, SymbolId, &'static str);

fn edge_keys(scope: &GraphScope) -> BTreeSet<EdgeKey> {
    scope
        .edges
        .iter()
        .map(|e| (e.source, e.target, e.kind.as_str()))
        .collect()
}

fn delta_edge(key: &EdgeKey) -> DeltaEdge {
    DeltaEdge {
        source: key.0,
        target: key.1,
        kind: EdgeKind::parse_tag(key.2),
    }
}
