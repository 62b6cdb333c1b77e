//! Louvain-style community detection on the undirected projection.
//!
//! The usual Louvain implementation shuffles node visit order; this one
//! visits nodes in ascending index order and breaks modularity-gain ties
//! toward the smallest community id, so the same graph always produces the
//! same clustering. Edge direction is ignored and parallel edges between
//! the same pair accumulate weight.

use std::collections::{BTreeMap, HashMap};

use petgraph::visit::EdgeRef;
use tracing::debug;
use trellis_core::SymbolId;

use crate::view::GraphView;

/// Cluster id per symbol. Ids are dense, starting at 0, numbered by the
/// smallest symbol id in each cluster.
pub fn clusters(view: &GraphView) -> HashMap<SymbolId, u32> {
    let graph = view.graph();
    let n = graph.node_count();
    if n == 0 {
        return HashMap::new();
    }

    // Symmetric adjacency; weight between distinct nodes is stored on both
    // sides, intra-node loop weight once under the node's own key.
    let mut adj: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); n];
    for edge in graph.edge_references() {
        let (a, b) = (edge.source().index(), edge.target().index());
        if a == b {
            continue;
        }
        *adj[a].entry(b).or_insert(0.0) += 1.0;
        *adj[b].entry(a).or_insert(0.0) += 1.0;
    }

    // assignment[i] = node representing i in the current aggregated graph.
    let mut assignment: Vec<usize> = (0..n).collect();
    let mut levels = 0usize;
    while let Some(communities) = one_level(&adj) {
        let (aggregated, renumbered) = aggregate(&adj, &communities);
        for slot in assignment.iter_mut() {
            *slot = renumbered[&communities[*slot]];
        }
        levels += 1;
        if aggregated.len() == adj.len() {
            break;
        }
        adj = aggregated;
    }
    debug!(nodes = n, levels, "clusters");

    // Dense ids in order of first appearance over ascending node index.
    let mut dense: HashMap<usize, u32> = HashMap::new();
    let mut result = HashMap::with_capacity(n);
    for index in graph.node_indices() {
        let next = dense.len() as u32;
        let id = *dense.entry(assignment[index.index()]).or_insert(next);
        result.insert(graph[index], id);
    }
    result
}

/// One round of local moving. Returns the community per node when at least
/// one node moved, `None` when the partition is already stable.
fn one_level(adj: &[BTreeMap<usize, f64>]) -> Option<Vec<usize>> {
    let n = adj.len();
    let degree: Vec<f64> = (0..n)
        .map(|i| {
            adj[i]
                .iter()
                .map(|(&j, &w)| if j == i { 2.0 * w } else { w })
                .sum()
        })
        .collect();
    let total: f64 = degree.iter().sum();
    if total == 0.0 {
        return None;
    }

    let mut community: Vec<usize> = (0..n).collect();
    let mut community_degree: Vec<f64> = degree.clone();
    let mut any_moved = false;

    loop {
        let mut moved = false;
        for i in 0..n {
            let mut links: BTreeMap<usize, f64> = BTreeMap::new();
            for (&j, &w) in &adj[i] {
                if j != i {
                    *links.entry(community[j]).or_insert(0.0) += w;
                }
            }

            let old = community[i];
            community_degree[old] -= degree[i];

            let mut best = old;
            let mut best_gain =
                links.get(&old).copied().unwrap_or(0.0) - degree[i] * community_degree[old] / total;
            for (&candidate, &weight) in &links {
                let gain = weight - degree[i] * community_degree[candidate] / total;
                if gain > best_gain {
                    best_gain = gain;
                    best = candidate;
                }
            }

            community_degree[best] += degree[i];
            if best != old {
                community[i] = best;
                moved = true;
                any_moved = true;
            }
        }
        if !moved {
            break;
        }
    }

    any_moved.then_some(community)
}

/// Collapse each community into a single node. Returns the aggregated
/// adjacency and the community-id to new-node-id renumbering, numbered by
/// first appearance in node order.
fn aggregate(
    adj: &[BTreeMap<usize, f64>],
    communities: &[usize],
) -> (Vec<BTreeMap<usize, f64>>, HashMap<usize, usize>) {
    let mut renumbered: HashMap<usize, usize> = HashMap::new();
    for &community in communities {
        let next = renumbered.len();
        renumbered.entry(community).or_insert(next);
    }

    let mut aggregated: Vec<BTreeMap<usize, f64>> = vec![BTreeMap::new(); renumbered.len()];
    for (i, neighbors) in adj.iter().enumerate() {
        let ci = renumbered[&communities[i]];
        for (&j, &w) in neighbors {
            let cj = renumbered[&communities[j]];
            if i == j {
                *aggregated[ci].entry(ci).or_insert(0.0) += w;
            } else if ci == cj {
                // Each internal pair is seen from both endpoints.
                *aggregated[ci].entry(ci).or_insert(0.0) += w / 2.0;
            } else {
                *aggregated[ci].entry(cj).or_insert(0.0) += w;
            }
        }
    }
    (aggregated, renumbered)
}
