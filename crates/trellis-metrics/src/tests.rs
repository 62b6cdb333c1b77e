use std::collections::HashMap;

use trellis_core::{
    EdgeKind, EdgeOrigin, FileRole, Language, MetricKind, MetricOwner, SymbolId, SymbolKind,
    VcsStats, Visibility,
};
use trellis_store::{EdgeWrite, FileWrite, MetricWrite, Store, SymbolWrite, WriteBatch};

use crate::{NullVcsProvider, VcsMetricsProvider, merge_vcs_stats};
use crate::{recompute_file_scores, refresh_file_scores};

fn store() -> Store {
    Store::open_in_memory().unwrap()
}

fn symbol(path: &str, name: &str, line: u32) -> SymbolWrite {
    SymbolWrite {
        id: SymbolId::derive(path, SymbolKind::Function, name),
        kind: SymbolKind::Function,
        name: name.to_string(),
        qualified_name: name.to_string(),
        signature: Some(format!("fn {name}()")),
        line_start: line,
        line_end: line + 5,
        visibility: Visibility::Public,
    }
}

fn call_edge(source: SymbolId, target: Option<SymbolId>) -> EdgeWrite {
    EdgeWrite {
        source_symbol: Some(source),
        target_symbol: target,
        kind: EdgeKind::Calls,
        origin: EdgeOrigin::Structural,
        confidence: 1.0,
        candidate_count: if target.is_some() { 1 } else { 0 },
        line: Some(3),
    }
}

fn file_write(path: &str, symbols: Vec<SymbolWrite>, edges: Vec<EdgeWrite>) -> FileWrite {
    FileWrite {
        path: path.to_string(),
        language: Language::Rust,
        hash: format!("hash-of-{path}"),
        mtime_ms: 1_000,
        line_count: 100,
        role: FileRole::Source,
        symbols,
        edges,
    }
}

fn file_id(store: &Store, path: &str) -> trellis_core::FileId {
    store.file_by_path(path).unwrap().unwrap().id
}

fn stats(churn: u64) -> VcsStats {
    VcsStats {
        commit_count: 3,
        total_churn: churn,
        distinct_authors: 2,
        blame_age_days: 42.5,
        entropy: 0.8,
    }
}

struct MapProvider(HashMap<String, VcsStats>);

impl MapProvider {
    fn with(entries: &[(&str, u64)]) -> Self {
        MapProvider(
            entries
                .iter()
                .map(|&(path, churn)| (path.to_string(), stats(churn)))
                .collect(),
        )
    }
}

impl VcsMetricsProvider for MapProvider {
    fn stats_for(&self, rel_path: &str) -> Option<VcsStats> {
        self.0.get(rel_path).cloned()
    }
}

#[test]
fn null_provider_merges_nothing() {
    let store = store();
    let alpha = symbol("src/a.rs", "alpha", 1);
    store
        .apply_batch(&WriteBatch {
            upserts: vec![file_write("src/a.rs", vec![alpha], vec![])],
            ..Default::default()
        })
        .unwrap();

    let merged = merge_vcs_stats(&store, &NullVcsProvider).unwrap();
    assert_eq!(merged, 0);
    assert!(store.vcs_stats_all().unwrap().is_empty());

    let file = file_id(&store, "src/a.rs");
    assert_eq!(
        store
            .metric(MetricOwner::File(file), MetricKind::Churn)
            .unwrap(),
        None
    );
}

#[test]
fn merge_writes_stats_and_metric_rows() {
    let store = store();
    let alpha = symbol("src/a.rs", "alpha", 1);
    store
        .apply_batch(&WriteBatch {
            upserts: vec![file_write("src/a.rs", vec![alpha], vec![])],
            ..Default::default()
        })
        .unwrap();

    let merged = merge_vcs_stats(&store, &MapProvider::with(&[("src/a.rs", 120)])).unwrap();
    assert_eq!(merged, 1);

    let file = file_id(&store, "src/a.rs");
    assert_eq!(store.vcs_stats(file).unwrap(), Some(stats(120)));
    assert_eq!(
        store
            .metric(MetricOwner::File(file), MetricKind::Churn)
            .unwrap(),
        Some(120.0)
    );
    assert_eq!(
        store
            .metric(MetricOwner::File(file), MetricKind::BlameAge)
            .unwrap(),
        Some(42.5)
    );
    assert_eq!(
        store
            .metric(MetricOwner::File(file), MetricKind::Entropy)
            .unwrap(),
        Some(0.8)
    );
}

#[test]
fn merge_skips_files_without_history() {
    let store = store();
    store
        .apply_batch(&WriteBatch {
            upserts: vec![
                file_write("src/a.rs", vec![symbol("src/a.rs", "alpha", 1)], vec![]),
                file_write("src/b.rs", vec![symbol("src/b.rs", "beta", 1)], vec![]),
            ],
            ..Default::default()
        })
        .unwrap();

    let merged = merge_vcs_stats(&store, &MapProvider::with(&[("src/a.rs", 10)])).unwrap();
    assert_eq!(merged, 1);
    assert!(store.vcs_stats(file_id(&store, "src/b.rs")).unwrap().is_none());
}

#[test]
fn scores_of_an_empty_store_are_empty() {
    assert!(recompute_file_scores(&store()).unwrap().is_empty());
}

#[test]
fn untouched_file_scores_full_health_and_zero_debt() {
    let store = store();
    let alpha = symbol("src/a.rs", "alpha", 1);
    let beta = symbol("src/b.rs", "beta", 1);
    // A one-way reference keeps beta alive without forming a cycle.
    let a_to_b = call_edge(alpha.id, Some(beta.id));
    store
        .apply_batch(&WriteBatch {
            upserts: vec![
                file_write("src/a.rs", vec![alpha], vec![a_to_b]),
                file_write("src/b.rs", vec![beta], vec![]),
            ],
            ..Default::default()
        })
        .unwrap();

    let scores = recompute_file_scores(&store).unwrap();
    let b = scores.iter().find(|s| s.path == "src/b.rs").unwrap();
    assert!((b.health - 1.0).abs() < 1e-9);
    assert!(b.debt.abs() < 1e-9);
    assert!(b.hotspot.abs() < 1e-9);
}

#[test]
fn cycle_membership_costs_health() {
    let store = store();
    let alpha = symbol("src/a.rs", "alpha", 1);
    let beta = symbol("src/b.rs", "beta", 1);
    let a_to_b = call_edge(alpha.id, Some(beta.id));
    let b_to_a = call_edge(beta.id, Some(alpha.id));
    store
        .apply_batch(&WriteBatch {
            upserts: vec![
                file_write("src/a.rs", vec![alpha], vec![a_to_b]),
                file_write("src/b.rs", vec![beta], vec![b_to_a]),
            ],
            ..Default::default()
        })
        .unwrap();

    let scores = recompute_file_scores(&store).unwrap();
    assert_eq!(scores.len(), 2);
    for score in &scores {
        // Only the cycle penalty applies: no complexity, no dead exports.
        assert!((score.health - 0.7).abs() < 1e-9);
        assert!((score.debt - 0.3).abs() < 1e-9);
    }
}

#[test]
fn dead_exports_cost_a_tenth_of_health() {
    let store = store();
    store
        .apply_batch(&WriteBatch {
            upserts: vec![file_write(
                "src/a.rs",
                vec![symbol("src/a.rs", "alpha", 1)],
                vec![],
            )],
            ..Default::default()
        })
        .unwrap();

    let scores = recompute_file_scores(&store).unwrap();
    assert_eq!(scores.len(), 1);
    assert!((scores[0].health - 0.9).abs() < 1e-9);
    assert!((scores[0].debt - 0.1).abs() < 1e-9);
}

#[test]
fn hotspot_is_churn_percentile_times_normalized_complexity() {
    let store = store();
    let cold = symbol("src/cold.rs", "cold", 1);
    let warm = symbol("src/warm.rs", "warm", 1);
    let hot = symbol("src/hot.rs", "hot", 1);
    let complexity = vec![
        MetricWrite::for_symbol(cold.id, MetricKind::Complexity, 4.0),
        MetricWrite::for_symbol(warm.id, MetricKind::Complexity, 4.0),
        MetricWrite::for_symbol(hot.id, MetricKind::Complexity, 4.0),
    ];
    store
        .apply_batch(&WriteBatch {
            upserts: vec![
                file_write("src/cold.rs", vec![cold], vec![]),
                file_write("src/warm.rs", vec![warm], vec![]),
                file_write("src/hot.rs", vec![hot], vec![]),
            ],
            metrics: complexity,
            ..Default::default()
        })
        .unwrap();
    merge_vcs_stats(
        &store,
        &MapProvider::with(&[("src/warm.rs", 50), ("src/hot.rs", 50)]),
    )
    .unwrap();

    let scores = recompute_file_scores(&store).unwrap();
    let hotspot_of = |path: &str| scores.iter().find(|s| s.path == path).unwrap().hotspot;

    // Equal complexity everywhere, so hotspot reduces to the churn
    // percentile: strictly-less count over three files.
    assert!(hotspot_of("src/cold.rs").abs() < 1e-9);
    assert!((hotspot_of("src/warm.rs") - 1.0 / 3.0).abs() < 1e-9);
    assert!((hotspot_of("src/hot.rs") - 1.0 / 3.0).abs() < 1e-9);
}

#[test]
fn churned_complexity_drives_debt_ordering() {
    let store = store();
    let calm = symbol("src/calm.rs", "calm", 1);
    let busy = symbol("src/busy.rs", "busy", 1);
    store
        .apply_batch(&WriteBatch {
            upserts: vec![
                file_write("src/calm.rs", vec![calm.clone()], vec![]),
                file_write("src/busy.rs", vec![busy.clone()], vec![]),
            ],
            metrics: vec![
                MetricWrite::for_symbol(calm.id, MetricKind::Complexity, 1.0),
                MetricWrite::for_symbol(busy.id, MetricKind::Complexity, 12.0),
            ],
            ..Default::default()
        })
        .unwrap();
    merge_vcs_stats(&store, &MapProvider::with(&[("src/busy.rs", 400)])).unwrap();

    let scores = recompute_file_scores(&store).unwrap();
    assert_eq!(scores[0].path, "src/busy.rs");
    assert!(scores[0].debt > scores[1].debt);
    assert!(scores[0].hotspot > scores[1].hotspot);
    assert!(scores[0].health < scores[1].health);
}

#[test]
fn god_files_lose_a_fifth_of_health() {
    let store = store();
    let hub = symbol("src/hub.rs", "hub", 1);
    let mut upserts = vec![file_write("src/hub.rs", vec![hub.clone()], vec![])];
    // 41 distinct callers push the hub's cross-file degree past the guard.
    for i in 0..41 {
        let path = format!("src/caller_{i}.rs");
        let caller = symbol(&path, "call_hub", 1);
        let edge = call_edge(caller.id, Some(hub.id));
        upserts.push(file_write(&path, vec![caller], vec![edge]));
    }
    store
        .apply_batch(&WriteBatch {
            upserts,
            ..Default::default()
        })
        .unwrap();

    let scores = recompute_file_scores(&store).unwrap();
    let hub_score = scores.iter().find(|s| s.path == "src/hub.rs").unwrap();
    assert!((hub_score.health - 0.8).abs() < 1e-9);
    // Callers export one unreferenced symbol each.
    let caller_score = scores.iter().find(|s| s.path == "src/caller_0.rs").unwrap();
    assert!((caller_score.health - 0.9).abs() < 1e-9);
    // Worst debt sorts first.
    assert_eq!(scores[0].path, "src/hub.rs");
}

#[test]
fn refresh_persists_score_metric_rows() {
    let store = store();
    store
        .apply_batch(&WriteBatch {
            upserts: vec![file_write(
                "src/a.rs",
                vec![symbol("src/a.rs", "alpha", 1)],
                vec![],
            )],
            ..Default::default()
        })
        .unwrap();

    let scores = refresh_file_scores(&store).unwrap();
    assert_eq!(scores.len(), 1);

    let file = file_id(&store, "src/a.rs");
    assert_eq!(
        store
            .metric(MetricOwner::File(file), MetricKind::Hotspot)
            .unwrap(),
        Some(scores[0].hotspot)
    );
    assert_eq!(
        store
            .metric(MetricOwner::File(file), MetricKind::Health)
            .unwrap(),
        Some(scores[0].health)
    );
    assert_eq!(
        store
            .metric(MetricOwner::File(file), MetricKind::Debt)
            .unwrap(),
        Some(scores[0].debt)
    );
}

#[test]
fn refresh_is_idempotent() {
    let store = store();
    store
        .apply_batch(&WriteBatch {
            upserts: vec![file_write(
                "src/a.rs",
                vec![symbol("src/a.rs", "alpha", 1)],
                vec![],
            )],
            ..Default::default()
        })
        .unwrap();

    let first = refresh_file_scores(&store).unwrap();
    let second = refresh_file_scores(&store).unwrap();
    assert_eq!(first, second);
}
