//! End-to-end tests over temporary project trees: full index passes through
//! the real on-disk store, incremental re-runs, lookups, graph algorithms,
//! scores, and CLI smoke checks.

use std::fs;
use std::path::Path;
use std::process::Command;
use std::time::Duration;

use tempfile::TempDir;
use trellis_core::{EdgeKind, EdgeOrigin, IndexReport, SymbolKind};
use trellis_graph::GraphView;
use trellis_indexer::{Indexer, WalkDiscovery};
use trellis_metrics::refresh_file_scores;
use trellis_store::{EdgeDirection, EngineContext, Lookup, Scope};

const APP_PY: &str = r#"import os

API_TIMEOUT = 30

def load_users():
    return []

@app.route("/users")
def list_users():
    return load_users()

def read_key():
    return os.getenv("API_KEY")
"#;

const DOTENV: &str = "API_KEY=secret\n";

fn write_project(root: &Path) {
    fs::write(root.join("app.py"), APP_PY).unwrap();
    fs::write(root.join(".env"), DOTENV).unwrap();
}

fn run_index(root: &Path) -> (EngineContext, IndexReport) {
    let ctx = EngineContext::open(root).unwrap();
    let report = Indexer::new(root)
        .run(&ctx, &WalkDiscovery::new(), None)
        .unwrap();
    (ctx, report)
}

fn find(ctx: &EngineContext, query: &str) -> trellis_core::Symbol {
    match ctx.store.lookup_symbol(query).unwrap() {
        Lookup::Found(symbol) => symbol,
        other => panic!("expected unique match for {query}, got {other:?}"),
    }
}

#[test]
fn first_pass_indexes_the_tree() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());

    let (ctx, report) = run_index(dir.path());
    assert_eq!(report.files_scanned, 2);
    assert_eq!(report.files_added, 2);
    assert!(report.symbols_added > 0);
    assert!(report.edges_added > 0);

    let skeleton = ctx.store.file_skeleton("app.py").unwrap().unwrap();
    assert!(!skeleton.is_empty());
    let lines: Vec<u32> = skeleton.iter().map(|s| s.line_start).collect();
    let mut sorted = lines.clone();
    sorted.sort_unstable();
    assert_eq!(lines, sorted, "skeleton must be in position order");
}

#[test]
fn second_pass_is_a_noop() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());

    run_index(dir.path());
    let (_, report) = run_index(dir.path());
    assert!(report.is_noop(), "unchanged tree must not touch the store");
}

#[test]
fn symbol_lookup_finds_functions_and_constants() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    let (ctx, _) = run_index(dir.path());

    let function = find(&ctx, "load_users");
    assert_eq!(function.kind, SymbolKind::Function);

    let constant = find(&ctx, "API_TIMEOUT");
    assert_eq!(constant.kind, SymbolKind::Constant);

    assert!(matches!(
        ctx.store.lookup_symbol("does_not_exist").unwrap(),
        Lookup::NotFound
    ));
}

#[test]
fn in_file_call_resolves_with_full_confidence() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    let (ctx, _) = run_index(dir.path());

    let caller = find(&ctx, "list_users");
    let callee = find(&ctx, "load_users");

    let out = ctx.store.edges_for(caller.id, EdgeDirection::Out).unwrap();
    let call = out
        .iter()
        .find(|e| e.target_symbol == Some(callee.id))
        .expect("list_users must call load_users");
    assert_eq!(call.kind, EdgeKind::Calls);
    assert_eq!(call.origin, EdgeOrigin::Structural);
    assert!((call.confidence - 1.0).abs() < f32::EPSILON);
}

#[test]
fn env_read_binds_to_the_dotenv_key() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    let (ctx, _) = run_index(dir.path());

    let key = find(&ctx, "API_KEY");
    assert_eq!(key.kind, SymbolKind::EnvVariable);

    let incoming = ctx.store.edges_for(key.id, EdgeDirection::In).unwrap();
    let binding = incoming
        .iter()
        .find(|e| e.kind == EdgeKind::ConfigBinding)
        .expect("os.getenv must bind to the .env key");
    assert_eq!(binding.origin, EdgeOrigin::Bridge);
}

#[test]
fn route_decorator_produces_a_route_symbol() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    let (ctx, _) = run_index(dir.path());

    let route = find(&ctx, "ANY /users");
    assert_eq!(route.kind, SymbolKind::Route);

    let handler = find(&ctx, "list_users");
    let out = ctx.store.edges_for(route.id, EdgeDirection::Out).unwrap();
    assert!(
        out.iter().any(|e| e.target_symbol == Some(handler.id)),
        "route must be wired to its handler"
    );
}

#[test]
fn modified_file_is_reextracted() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    run_index(dir.path());

    // Outrun the mtime slack window before rewriting.
    std::thread::sleep(Duration::from_millis(10));
    let extended = format!("{APP_PY}\ndef new_helper():\n    return 1\n");
    fs::write(dir.path().join("app.py"), extended).unwrap();

    let (ctx, report) = run_index(dir.path());
    assert_eq!(report.files_modified, 1);
    let added = find(&ctx, "new_helper");
    assert_eq!(added.kind, SymbolKind::Function);
}

#[test]
fn deleted_file_drops_its_symbols() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    run_index(dir.path());

    fs::remove_file(dir.path().join(".env")).unwrap();
    let (ctx, report) = run_index(dir.path());
    assert_eq!(report.files_deleted, 1);
    assert!(matches!(
        ctx.store.lookup_symbol("API_KEY").unwrap(),
        Lookup::NotFound
    ));
}

#[test]
fn pagerank_covers_the_exported_scope() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    let (ctx, _) = run_index(dir.path());

    let scope = ctx.store.export_scope(Scope::Project).unwrap();
    let view = GraphView::from_scope(&scope);
    let ranked = trellis_graph::pagerank(&view, &ctx.config.algorithms);

    assert_eq!(ranked.len(), view.node_count());
    let total: f64 = ranked.iter().map(|&(_, score)| score).sum();
    assert!((total - 1.0).abs() < 1e-6, "scores must stay a distribution");
    for window in ranked.windows(2) {
        assert!(window[0].1 >= window[1].1, "output must be sorted by score");
    }
}

#[test]
fn score_refresh_covers_every_tracked_file() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());
    let (ctx, _) = run_index(dir.path());

    let scores = refresh_file_scores(&ctx.store).unwrap();
    assert_eq!(scores.len(), 2);
    for score in &scores {
        assert!((0.0..=1.0).contains(&score.health));
        assert!(score.debt >= 0.0);
    }
}

#[test]
fn cli_help_names_the_tool() {
    let output = Command::new(env!("CARGO_BIN_EXE_trellis"))
        .arg("--help")
        .output()
        .expect("binary must run");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("trellis"));
    assert!(stdout.contains("Incremental code-graph index and analysis"));
}

#[test]
fn cli_index_then_symbol_round_trip() {
    let dir = TempDir::new().unwrap();
    write_project(dir.path());

    let index = Command::new(env!("CARGO_BIN_EXE_trellis"))
        .args(["--root"])
        .arg(dir.path())
        .arg("index")
        .output()
        .expect("binary must run");
    assert!(index.status.success(), "index failed: {index:?}");

    let symbol = Command::new(env!("CARGO_BIN_EXE_trellis"))
        .args(["--root"])
        .arg(dir.path())
        .args(["symbol", "load_users"])
        .output()
        .expect("binary must run");
    assert!(symbol.status.success(), "symbol lookup failed: {symbol:?}");
    let stdout = String::from_utf8_lossy(&symbol.stdout);
    assert!(stdout.contains("load_users"));
    assert!(stdout.contains("app.py"));
}
