use std::collections::HashMap;

use trellis_core::{AlgorithmConfig, EdgeKind, FileId, SymbolId, SymbolKind};
use trellis_store::{GraphScope, ScopeEdge, ScopeNode};

use crate::view::GraphView;
use crate::{
    clusters, cycles, k_shortest_paths, layer_violations, layers, pagerank, propagation_cost,
    snapshot_diff,
};

fn scope(nodes: &[i64], edges: &[(i64, i64)]) -> GraphScope {
    GraphScope {
        nodes: nodes
            .iter()
            .map(|&id| ScopeNode {
                id: SymbolId(id),
                name: format!("n{id}"),
                kind: SymbolKind::Function,
                file: FileId(0),
                path: "src/lib.rs".to_string(),
            })
            .collect(),
        edges: edges
            .iter()
            .map(|&(source, target)| ScopeEdge {
                source: SymbolId(source),
                target: SymbolId(target),
                kind: EdgeKind::Calls,
            })
            .collect(),
    }
}

fn view(nodes: &[i64], edges: &[(i64, i64)]) -> GraphView {
    GraphView::from_scope(&scope(nodes, edges))
}

fn rank_of(ranks: &[(SymbolId, f64)], id: i64) -> f64 {
    ranks
        .iter()
        .find(|(symbol, _)| *symbol == SymbolId(id))
        .map(|(_, score)| *score)
        .unwrap()
}

#[test]
fn pagerank_mutual_pair_converges_to_equal_scores() {
    let view = view(&[1, 2], &[(1, 2), (2, 1)]);
    let ranks = pagerank(&view, &AlgorithmConfig::default());

    assert_eq!(ranks.len(), 2);
    assert!((rank_of(&ranks, 1) - rank_of(&ranks, 2)).abs() < 1e-6);
    let total: f64 = ranks.iter().map(|(_, score)| score).sum();
    assert!((total - 1.0).abs() < 1e-6);
}

#[test]
fn pagerank_chain_favors_the_sink() {
    let view = view(&[1, 2, 3], &[(1, 2), (2, 3)]);
    let ranks = pagerank(&view, &AlgorithmConfig::default());

    assert!(rank_of(&ranks, 3) > rank_of(&ranks, 2));
    assert!(rank_of(&ranks, 2) > rank_of(&ranks, 1));
    assert_eq!(ranks[0].0, SymbolId(3));
}

#[test]
fn pagerank_honors_configured_damping() {
    let cfg = AlgorithmConfig {
        pagerank_damping: Some(0.5),
        ..AlgorithmConfig::default()
    };
    let view = view(&[1, 2, 3], &[(1, 2), (2, 3)]);
    let ranks = pagerank(&view, &cfg);

    let total: f64 = ranks.iter().map(|(_, score)| score).sum();
    assert!((total - 1.0).abs() < 1e-6);
}

#[test]
fn pagerank_empty_graph_is_empty() {
    let view = view(&[], &[]);
    assert!(pagerank(&view, &AlgorithmConfig::default()).is_empty());
}

#[test]
fn cycles_reports_component_and_tangle_ratio() {
    // Triangle 1-2-3 with an extra edge feeding in from 4.
    let view = view(&[1, 2, 3, 4], &[(1, 2), (2, 3), (3, 1), (4, 1)]);
    let found = cycles(&view);

    assert_eq!(found.len(), 1);
    assert_eq!(
        found[0].members,
        vec![SymbolId(1), SymbolId(2), SymbolId(3)]
    );
    assert!((found[0].tangle_ratio - 0.75).abs() < 1e-9);
}

#[test]
fn cycles_closed_triangle_has_tangle_ratio_one() {
    let view = view(&[1, 2, 3], &[(1, 2), (2, 3), (3, 1)]);
    let found = cycles(&view);

    assert_eq!(found.len(), 1);
    assert!((found[0].tangle_ratio - 1.0).abs() < 1e-9);
}

#[test]
fn cycles_absent_in_a_dag() {
    let view = view(&[1, 2, 3], &[(1, 2), (2, 3), (1, 3)]);
    assert!(cycles(&view).is_empty());
}

#[test]
fn clusters_separate_two_triangles() {
    let view = view(
        &[1, 2, 3, 4, 5, 6],
        &[(1, 2), (2, 3), (3, 1), (4, 5), (5, 6), (6, 4), (3, 4)],
    );
    let assignment = clusters(&view);

    assert_eq!(assignment[&SymbolId(1)], assignment[&SymbolId(2)]);
    assert_eq!(assignment[&SymbolId(1)], assignment[&SymbolId(3)]);
    assert_eq!(assignment[&SymbolId(4)], assignment[&SymbolId(5)]);
    assert_eq!(assignment[&SymbolId(4)], assignment[&SymbolId(6)]);
    assert_ne!(assignment[&SymbolId(1)], assignment[&SymbolId(4)]);
    // Dense ids numbered from the smallest member.
    assert_eq!(assignment[&SymbolId(1)], 0);
    assert_eq!(assignment[&SymbolId(4)], 1);
}

#[test]
fn clusters_isolated_nodes_each_get_their_own() {
    let view = view(&[1, 2, 3], &[]);
    let assignment = clusters(&view);

    assert_eq!(assignment.len(), 3);
    assert_eq!(assignment[&SymbolId(1)], 0);
    assert_eq!(assignment[&SymbolId(2)], 1);
    assert_eq!(assignment[&SymbolId(3)], 2);
}

#[test]
fn clusters_are_insertion_order_independent() {
    let forward = scope(&[1, 2, 3, 4], &[(1, 2), (2, 1), (3, 4), (4, 3)]);
    let mut reversed = forward.clone();
    reversed.nodes.reverse();
    reversed.edges.reverse();

    let a = clusters(&GraphView::from_scope(&forward));
    let b = clusters(&GraphView::from_scope(&reversed));
    assert_eq!(a, b);
}

#[test]
fn layers_assign_longest_path_from_roots() {
    let view = view(&[1, 2, 3], &[(1, 2), (2, 3)]);
    let map = layers(&view);

    assert_eq!(map[&SymbolId(1)], 0);
    assert_eq!(map[&SymbolId(2)], 1);
    assert_eq!(map[&SymbolId(3)], 2);
    assert!(layer_violations(&view, &map).is_empty());
}

#[test]
fn layers_diamond_takes_the_longer_arm() {
    // 1 -> 2 -> 3 -> 5 and 1 -> 4 -> 5: node 5 sits at layer 3.
    let view = view(&[1, 2, 3, 4, 5], &[(1, 2), (2, 3), (3, 5), (1, 4), (4, 5)]);
    let map = layers(&view);

    assert_eq!(map[&SymbolId(4)], 1);
    assert_eq!(map[&SymbolId(5)], 3);
}

#[test]
fn layers_cycle_members_share_a_layer_and_violate() {
    let view = view(&[1, 2, 3], &[(1, 2), (2, 3), (3, 2)]);
    let map = layers(&view);

    assert_eq!(map[&SymbolId(1)], 0);
    assert_eq!(map[&SymbolId(2)], map[&SymbolId(3)]);

    let violations = layer_violations(&view, &map);
    assert_eq!(violations.len(), 2);
    assert!(violations.iter().all(|v| v.source_layer == v.target_layer));
}

#[test]
fn shortest_paths_come_out_shortest_first() {
    let view = view(&[1, 2, 3, 4], &[(1, 4), (1, 2), (2, 4), (1, 3), (3, 4)]);
    let paths = k_shortest_paths(&view, SymbolId(1), SymbolId(4), 3);

    assert_eq!(paths.len(), 3);
    assert_eq!(paths[0], vec![SymbolId(1), SymbolId(4)]);
    assert_eq!(paths[1], vec![SymbolId(1), SymbolId(2), SymbolId(4)]);
    assert_eq!(paths[2], vec![SymbolId(1), SymbolId(3), SymbolId(4)]);
}

#[test]
fn shortest_paths_stop_at_k() {
    let view = view(&[1, 2, 3, 4], &[(1, 4), (1, 2), (2, 4), (1, 3), (3, 4)]);
    assert_eq!(k_shortest_paths(&view, SymbolId(1), SymbolId(4), 2).len(), 2);
}

#[test]
fn shortest_paths_empty_when_disconnected_or_missing() {
    let view = view(&[1, 2, 3], &[(1, 2)]);
    assert!(k_shortest_paths(&view, SymbolId(1), SymbolId(3), 4).is_empty());
    assert!(k_shortest_paths(&view, SymbolId(1), SymbolId(99), 4).is_empty());
}

#[test]
fn snapshot_diff_reports_symmetric_difference() {
    let before = scope(&[1, 2], &[(1, 2)]);
    let after = scope(&[2, 3], &[(2, 3)]);
    let delta = snapshot_diff(&before, &after);

    assert_eq!(delta.added_nodes, vec![SymbolId(3)]);
    assert_eq!(delta.removed_nodes, vec![SymbolId(1)]);
    assert_eq!(delta.added_edges.len(), 1);
    assert_eq!(delta.added_edges[0].source, SymbolId(2));
    assert_eq!(delta.removed_edges.len(), 1);
    assert_eq!(delta.removed_edges[0].target, SymbolId(2));
}

#[test]
fn snapshot_diff_of_identical_scopes_is_empty() {
    let snapshot = scope(&[1, 2], &[(1, 2)]);
    assert!(snapshot_diff(&snapshot, &snapshot).is_empty());
}

#[test]
fn propagation_cost_exact_on_a_chain() {
    let view = view(&[1, 2, 3], &[(1, 2), (2, 3)]);
    let cost = propagation_cost(&view, &AlgorithmConfig::default());

    // Reachable sets: {1,2,3}, {2,3}, {3}.
    assert!(!cost.approximate);
    assert!((cost.value - 6.0 / 9.0).abs() < 1e-9);
}

#[test]
fn propagation_cost_flags_sampled_results() {
    let cfg = AlgorithmConfig {
        size_guard_nodes: 2,
        ..AlgorithmConfig::default()
    };
    let view = view(&[1, 2, 3, 4], &[(1, 2), (2, 3), (3, 4)]);
    let cost = propagation_cost(&view, &cfg);

    assert!(cost.approximate);
    assert!(cost.value > 0.0);
}

#[test]
fn view_construction_is_order_independent() {
    let forward = scope(&[1, 2, 3], &[(1, 2), (2, 3)]);
    let mut reversed = forward.clone();
    reversed.nodes.reverse();
    reversed.edges.reverse();

    let a = pagerank(&GraphView::from_scope(&forward), &AlgorithmConfig::default());
    let b = pagerank(&GraphView::from_scope(&reversed), &AlgorithmConfig::default());
    assert_eq!(a, b);
}

#[test]
fn view_drops_edges_with_unknown_endpoints() {
    let mut scope = scope(&[1, 2], &[(1, 2)]);
    scope.edges.push(ScopeEdge {
        source: SymbolId(1),
        target: SymbolId(99),
        kind: EdgeKind::Calls,
    });
    let view = GraphView::from_scope(&scope);
    assert_eq!(view.edge_count(), 1);
}

#[test]
fn clusters_cover_every_node() {
    let view = view(&[1, 2, 3, 4], &[(1, 2), (3, 4)]);
    let assignment: HashMap<SymbolId, u32> = clusters(&view);
    assert_eq!(assignment.len(), 4);
}
