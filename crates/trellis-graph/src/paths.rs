//! Bounded k-shortest-path search for trace queries.
//!
//! Yen's algorithm over unweighted BFS: the shortest path first, then spur
//! paths that branch off each prefix of an accepted path with the already
//! used continuations blocked. Paths are loopless. Candidate ordering is
//! (length, node sequence), so equal-length alternatives come out in a
//! stable order.

use std::collections::{BTreeSet, HashMap, HashSet, VecDeque};

use petgraph::graph::NodeIndex;
use trellis_core::SymbolId;

use crate::view::GraphView;

pub fn k_shortest_paths(
    view: &GraphView,
    source: SymbolId,
    target: SymbolId,
    k: usize,
) -> Vec<Vec<SymbolId>> {
    let (Some(source), Some(target)) = (view.index_of(source), view.index_of(target)) else {
        return Vec::new();
    };
    if k == 0 {
        return Vec::new();
    }

    let mut accepted: Vec<Vec<NodeIndex>> = Vec::new();
    let Some(first) = bfs_path(view, source, target, &HashSet::new(), &HashSet::new()) else {
        return Vec::new();
    };
    accepted.push(first);

    // Candidates keyed by (length, symbol sequence) for deterministic pops.
    let mut candidates: BTreeSet<(usize, Vec<SymbolId>)> = BTreeSet::new();
    let mut index_by_symbols: HashMap<Vec<SymbolId>, Vec<NodeIndex>> = HashMap::new();

    while accepted.len() < k {
        let previous = accepted[accepted.len() - 1].clone();
        for spur_at in 0..previous.len() - 1 {
            let spur_node = previous[spur_at];
            let root = &previous[..=spur_at];

            let mut banned_edges: HashSet<(NodeIndex, NodeIndex)> = HashSet::new();
            for path in &accepted {
                if path.len() > spur_at + 1 && path[..=spur_at] == *root {
                    banned_edges.insert((path[spur_at], path[spur_at + 1]));
                }
            }
            let banned_nodes: HashSet<NodeIndex> = root[..spur_at].iter().copied().collect();

            if let Some(spur) = bfs_path(view, spur_node, target, &banned_nodes, &banned_edges) {
                let mut full: Vec<NodeIndex> = root[..spur_at].to_vec();
                full.extend(spur);
                let symbols: Vec<SymbolId> =
                    full.iter().map(|&index| view.symbol_of(index)).collect();
                if index_by_symbols.insert(symbols.clone(), full).is_none() {
                    candidates.insert((symbols.len(), symbols));
                }
            }
        }

        let Some(next) = candidates.pop_first() else {
            break;
        };
        let Some(path) = index_by_symbols.get(&next.1) else {
            break;
        };
        accepted.push(path.clone());
    }

    accepted
        .into_iter()
        .map(|path| path.into_iter().map(|index| view.symbol_of(index)).collect())
        .collect()
}

/// Shortest path by BFS, honoring banned nodes and banned first-hop edges.
/// Successors are visited in symbol order, so among equal-length paths the
/// lexicographically smallest wins.
fn bfs_path(
    view: &GraphView,
    source: NodeIndex,
    target: NodeIndex,
    banned_nodes: &HashSet<NodeIndex>,
    banned_edges: &HashSet<(NodeIndex, NodeIndex)>,
) -> Option<Vec<NodeIndex>> {
    if banned_nodes.contains(&source) {
        return None;
    }
    if source == target {
        return Some(vec![source]);
    }

    let mut predecessor: HashMap<NodeIndex, NodeIndex> = HashMap::new();
    let mut queue = VecDeque::from([source]);
    while let Some(current) = queue.pop_front() {
        for next in view.sorted_successors(current) {
            if banned_nodes.contains(&next)
                || banned_edges.contains(&(current, next))
                || next == source
                || predecessor.contains_key(&next)
            {
                continue;
            }
            predecessor.insert(next, current);
            if next == target {
                let mut path = vec![target];
                let mut walk = target;
                while let Some(&previous) = predecessor.get(&walk) {
                    path.push(previous);
                    walk = previous;
                }
                path.reverse();
                return Some(path);
            }
            queue.push_back(next);
        }
    }
    None
}
