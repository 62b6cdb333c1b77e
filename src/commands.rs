//! Subcommand implementations. Thin glue over the engine crates: every
//! command opens the store for the given root, calls library code, and
//! prints to stdout. Logging goes to stderr via tracing.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use trellis_core::{EdgeKind, FileId, MetricKind, MetricOwner, Symbol, SymbolId, SymbolKind};
use trellis_graph::{GraphView, k_shortest_paths, pagerank, propagation_cost, snapshot_diff};
use trellis_indexer::{Indexer, WalkDiscovery};
use trellis_metrics::refresh_file_scores;
use trellis_store::{
    EdgeDirection, EngineContext, GraphScope, Lookup, MetricWrite, Scope, ScopeEdge, ScopeNode,
    Store,
};

pub fn index(root: PathBuf, exclude: &[String], changed: &[PathBuf], scores: bool) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let discovery = WalkDiscovery::with_excludes(exclude)?;
    let indexer = Indexer::new(&root);

    let explicit = (!changed.is_empty()).then_some(changed);
    let report = indexer.run(&ctx, &discovery, explicit)?;

    println!("files scanned:  {}", report.files_scanned);
    println!(
        "files changed:  +{} ~{} -{}",
        report.files_added, report.files_modified, report.files_deleted
    );
    println!(
        "symbols:        +{} -{}",
        report.symbols_added, report.symbols_removed
    );
    println!(
        "edges:          +{} -{} ({} unresolved)",
        report.edges_added, report.edges_removed, report.unresolved
    );
    for diagnostic in &report.diagnostics {
        println!("warning: {}: {}", diagnostic.path, diagnostic.message);
    }

    if scores {
        let scored = refresh_file_scores(&ctx.store)?;
        println!("scores refreshed for {} files", scored.len());
    }
    Ok(())
}

pub fn symbol(root: PathBuf, query: &str) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let found = resolve_symbol(&ctx.store, query)?;
    let path = path_of(&ctx.store, &found)?;
    println!("{} {}", found.kind.as_str(), found.qualified_name);
    println!("  {}:{}-{}", path, found.line_start, found.line_end);
    println!("  visibility: {}", found.visibility.as_str());
    if let Some(signature) = &found.signature {
        println!("  {signature}");
    }
    Ok(())
}

pub fn skeleton(root: PathBuf, path: &str) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let Some(symbols) = ctx.store.file_skeleton(path)? else {
        bail!("file not tracked: {path}");
    };
    for symbol in symbols {
        println!(
            "{:>5}  {:<14} {}",
            symbol.line_start,
            symbol.kind.as_str(),
            symbol.qualified_name
        );
    }
    Ok(())
}

pub fn edges(root: PathBuf, query: &str, direction: &str) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let found = resolve_symbol(&ctx.store, query)?;

    let directions: &[EdgeDirection] = match direction {
        "in" => &[EdgeDirection::In],
        "out" => &[EdgeDirection::Out],
        "both" => &[EdgeDirection::In, EdgeDirection::Out],
        other => bail!("unknown direction {other:?}; use in, out, or both"),
    };

    for &dir in directions {
        let edges = ctx.store.edges_for(found.id, dir)?;
        let counterparts: Vec<SymbolId> = edges
            .iter()
            .filter_map(|e| match dir {
                EdgeDirection::In => e.source_symbol,
                EdgeDirection::Out => e.target_symbol,
            })
            .collect();
        let names: BTreeMap<SymbolId, String> = ctx
            .store
            .symbols_by_ids(&counterparts)?
            .into_iter()
            .map(|s| (s.id, s.qualified_name))
            .collect();

        let arrow = match dir {
            EdgeDirection::In => "<-",
            EdgeDirection::Out => "->",
        };
        for edge in edges {
            let counterpart = match dir {
                EdgeDirection::In => edge.source_symbol,
                EdgeDirection::Out => edge.target_symbol,
            };
            let label = counterpart
                .and_then(|id| names.get(&id).cloned())
                .unwrap_or_else(|| format!("<unresolved, {} candidates>", edge.candidate_count));
            let line = edge.line.map(|l| format!(" line {l}")).unwrap_or_default();
            println!(
                "{arrow} {:<16} {label}  [{:.2}{line}]",
                edge.kind.as_str(),
                edge.confidence
            );
        }
    }
    Ok(())
}

pub fn metric(
    root: PathBuf,
    kind: &str,
    symbol: Option<&str>,
    file: Option<&str>,
) -> anyhow::Result<()> {
    let Some(kind) = MetricKind::parse_tag(kind) else {
        bail!("unknown metric kind {kind:?}");
    };
    let ctx = EngineContext::open(&root)?;

    let owner = match (symbol, file) {
        (Some(query), None) => MetricOwner::Symbol(resolve_symbol(&ctx.store, query)?.id),
        (None, Some(path)) => {
            let record = ctx
                .store
                .file_by_path(path)?
                .with_context(|| format!("file not tracked: {path}"))?;
            MetricOwner::File(record.id)
        }
        _ => bail!("pass exactly one of --symbol or --file"),
    };

    match ctx.store.metric(owner, kind)? {
        Some(value) => println!("{value}"),
        None => bail!("no {} value recorded", kind.as_str()),
    }
    Ok(())
}

pub fn rank(
    root: PathBuf,
    center: Option<&str>,
    hops: u32,
    limit: usize,
    store: bool,
) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let scope = load_scope(&ctx, center, hops)?;
    let view = GraphView::from_scope(&scope);
    let labels = label_map(&scope);

    let ranked = pagerank(&view, &ctx.config.algorithms);
    for (id, score) in ranked.iter().take(limit) {
        println!("{score:.6}  {}", labels.get(id).map_or("?", String::as_str));
    }

    if store {
        let metrics: Vec<MetricWrite> = ranked
            .iter()
            .map(|&(id, score)| MetricWrite::for_symbol(id, MetricKind::PageRank, score))
            .collect();
        ctx.store.put_metrics(&metrics)?;
        println!("stored {} pagerank values", metrics.len());
    }
    Ok(())
}

pub fn cycles(root: PathBuf, center: Option<&str>, hops: u32) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let scope = load_scope(&ctx, center, hops)?;
    let view = GraphView::from_scope(&scope);
    let labels = label_map(&scope);

    let components = trellis_graph::cycles(&view);
    if components.is_empty() {
        println!("no cycles");
    }
    for (index, component) in components.iter().enumerate() {
        println!(
            "cycle {index}: {} symbols, tangle {:.2}",
            component.members.len(),
            component.tangle_ratio
        );
        for member in &component.members {
            println!("  {}", labels.get(member).map_or("?", String::as_str));
        }
    }

    let cost = propagation_cost(&view, &ctx.config.algorithms);
    let marker = if cost.approximate { " (approximate)" } else { "" };
    println!("propagation cost: {:.4}{marker}", cost.value);
    Ok(())
}

pub fn clusters(
    root: PathBuf,
    center: Option<&str>,
    hops: u32,
    store: bool,
) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let scope = load_scope(&ctx, center, hops)?;
    let view = GraphView::from_scope(&scope);
    let labels = label_map(&scope);

    let assignment = trellis_graph::clusters(&view);
    let mut grouped: BTreeMap<u32, Vec<SymbolId>> = BTreeMap::new();
    for (&id, &cluster) in &assignment {
        grouped.entry(cluster).or_default().push(id);
    }
    for (cluster, mut members) in grouped {
        members.sort();
        println!("cluster {cluster} ({} symbols)", members.len());
        for member in members {
            println!("  {}", labels.get(&member).map_or("?", String::as_str));
        }
    }

    if store {
        let metrics: Vec<MetricWrite> = assignment
            .iter()
            .map(|(&id, &cluster)| {
                MetricWrite::for_symbol(id, MetricKind::Cluster, f64::from(cluster))
            })
            .collect();
        ctx.store.put_metrics(&metrics)?;
        println!("stored {} cluster assignments", metrics.len());
    }
    Ok(())
}

pub fn layers(
    root: PathBuf,
    center: Option<&str>,
    hops: u32,
    store: bool,
) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let scope = load_scope(&ctx, center, hops)?;
    let view = GraphView::from_scope(&scope);
    let labels = label_map(&scope);

    let assignment = trellis_graph::layers(&view);
    let mut grouped: BTreeMap<u32, Vec<SymbolId>> = BTreeMap::new();
    for (&id, &layer) in &assignment {
        grouped.entry(layer).or_default().push(id);
    }
    for (layer, mut members) in grouped {
        members.sort();
        println!("layer {layer}:");
        for member in members {
            println!("  {}", labels.get(&member).map_or("?", String::as_str));
        }
    }

    let violations = trellis_graph::layer_violations(&view, &assignment);
    println!("violations: {}", violations.len());
    for violation in &violations {
        println!(
            "  {} (layer {}) -> {} (layer {})",
            labels.get(&violation.source).map_or("?", String::as_str),
            violation.source_layer,
            labels.get(&violation.target).map_or("?", String::as_str),
            violation.target_layer
        );
    }

    if store {
        let metrics: Vec<MetricWrite> = assignment
            .iter()
            .map(|(&id, &layer)| MetricWrite::for_symbol(id, MetricKind::Layer, f64::from(layer)))
            .collect();
        ctx.store.put_metrics(&metrics)?;
        println!("stored {} layer assignments", metrics.len());
    }
    Ok(())
}

pub fn trace(root: PathBuf, source: &str, target: &str, k: usize) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let from = resolve_symbol(&ctx.store, source)?;
    let to = resolve_symbol(&ctx.store, target)?;

    let scope = ctx.store.export_scope(Scope::Project)?;
    let view = GraphView::from_scope(&scope);
    let labels = label_map(&scope);

    let paths = k_shortest_paths(&view, from.id, to.id, k);
    if paths.is_empty() {
        bail!(
            "no path from {} to {}",
            from.qualified_name,
            to.qualified_name
        );
    }
    for path in paths {
        let rendered: Vec<&str> = path
            .iter()
            .map(|id| labels.get(id).map_or("?", String::as_str))
            .collect();
        println!("{}", rendered.join(" -> "));
    }
    Ok(())
}

pub fn snapshot(root: PathBuf, out: &Path) -> anyhow::Result<()> {
    let ctx = EngineContext::open(&root)?;
    let scope = ctx.store.export_scope(Scope::Project)?;
    let snapshot = Snapshot::from_scope(&scope);
    let json = serde_json::to_string_pretty(&snapshot)?;
    fs::write(out, json).with_context(|| format!("writing {}", out.display()))?;
    println!(
        "snapshot written: {} nodes, {} edges",
        snapshot.nodes.len(),
        snapshot.edges.len()
    );
    Ok(())
}

pub fn diff(root: PathBuf, before: &Path, after: Option<&Path>) -> anyhow::Result<()> {
    let before_scope = read_snapshot(before)?;
    let after_scope = match after {
        Some(path) => read_snapshot(path)?,
        None => {
            let ctx = EngineContext::open(&root)?;
            ctx.store.export_scope(Scope::Project)?
        }
    };

    let delta = snapshot_diff(&before_scope, &after_scope);
    if delta.is_empty() {
        println!("no differences");
        return Ok(());
    }
    println!("{}", serde_json::to_string_pretty(&delta)?);
    Ok(())
}

pub fn clear(root: PathBuf) -> anyhow::Result<()> {
    let db = Store::default_path(&root);
    if !db.exists() {
        println!("no index at {}", db.display());
        return Ok(());
    }
    fs::remove_file(&db)?;
    for suffix in ["-wal", "-shm"] {
        let mut sidecar = db.clone().into_os_string();
        sidecar.push(suffix);
        let sidecar = PathBuf::from(sidecar);
        if sidecar.exists() {
            fs::remove_file(&sidecar)?;
        }
    }
    println!("index cleared: {}", db.display());
    Ok(())
}

/// Name lookup that refuses to guess: ambiguity lists the candidates.
fn resolve_symbol(store: &Store, query: &str) -> anyhow::Result<Symbol> {
    match store.lookup_symbol(query)? {
        Lookup::Found(symbol) => Ok(symbol),
        Lookup::Ambiguous(candidates) => {
            let listed: Vec<String> = candidates
                .iter()
                .map(|s| format!("{} {}", s.kind.as_str(), s.qualified_name))
                .collect();
            bail!(
                "{query:?} is ambiguous; candidates:\n  {}",
                listed.join("\n  ")
            )
        }
        Lookup::NotFound => bail!("no symbol matches {query:?}"),
    }
}

fn path_of(store: &Store, symbol: &Symbol) -> anyhow::Result<String> {
    Ok(store
        .file_by_id(symbol.file)?
        .map(|record| record.path)
        .unwrap_or_default())
}

fn load_scope(ctx: &EngineContext, center: Option<&str>, hops: u32) -> anyhow::Result<GraphScope> {
    let scope = match center {
        Some(query) => {
            let symbol = resolve_symbol(&ctx.store, query)?;
            Scope::Neighborhood {
                center: symbol.id,
                hops,
            }
        }
        None => Scope::Project,
    };
    Ok(ctx.store.export_scope(scope)?)
}

fn label_map(scope: &GraphScope) -> BTreeMap<SymbolId, String> {
    scope
        .nodes
        .iter()
        .map(|node| (node.id, format!("{} ({})", node.name, node.path)))
        .collect()
}

/// On-disk snapshot format: the exported scope with tags instead of enums,
/// so snapshots stay readable in a text editor.
#[derive(Serialize, Deserialize)]
struct Snapshot {
    nodes: Vec<SnapshotNode>,
    edges: Vec<SnapshotEdge>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotNode {
    id: i64,
    name: String,
    kind: String,
    file: i64,
    path: String,
}

#[derive(Serialize, Deserialize)]
struct SnapshotEdge {
    source: i64,
    target: i64,
    kind: String,
}

impl Snapshot {
    fn from_scope(scope: &GraphScope) -> Self {
        Snapshot {
            nodes: scope
                .nodes
                .iter()
                .map(|node| SnapshotNode {
                    id: node.id.0,
                    name: node.name.clone(),
                    kind: node.kind.as_str().to_string(),
                    file: node.file.0,
                    path: node.path.clone(),
                })
                .collect(),
            edges: scope
                .edges
                .iter()
                .map(|edge| SnapshotEdge {
                    source: edge.source.0,
                    target: edge.target.0,
                    kind: edge.kind.as_str().to_string(),
                })
                .collect(),
        }
    }

    fn into_scope(self) -> GraphScope {
        GraphScope {
            nodes: self
                .nodes
                .into_iter()
                .map(|node| ScopeNode {
                    id: SymbolId(node.id),
                    name: node.name,
                    kind: SymbolKind::parse_tag(&node.kind),
                    file: FileId(node.file),
                    path: node.path,
                })
                .collect(),
            edges: self
                .edges
                .into_iter()
                .map(|edge| ScopeEdge {
                    source: SymbolId(edge.source),
                    target: SymbolId(edge.target),
                    kind: EdgeKind::parse_tag(&edge.kind),
                })
                .collect(),
        }
    }
}

fn read_snapshot(path: &Path) -> anyhow::Result<GraphScope> {
    let text =
        fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
    let snapshot: Snapshot =
        serde_json::from_str(&text).with_context(|| format!("parsing {}", path.display()))?;
    Ok(snapshot.into_scope())
}
