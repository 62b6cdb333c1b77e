//! Per-file score folds.
//!
//! Hotspot, health, and debt are folds over state the store already holds:
//! mean symbol complexity, cross-file degrees, public-symbol usage, merged
//! churn, and cycle membership from the project graph. Weights are fixed.

use std::collections::{HashMap, HashSet};

use serde::Serialize;
use tracing::{debug, info};
use trellis_core::{FileId, MetricKind};
use trellis_graph::{GraphView, cycles};
use trellis_store::{MetricWrite, Scope, Store};

use crate::MetricsError;

const WEIGHT_COMPLEXITY: f64 = 0.4;
const WEIGHT_CYCLE: f64 = 0.3;
const WEIGHT_GOD: f64 = 0.2;
const WEIGHT_DEAD: f64 = 0.1;

/// Cross-file fan-in plus fan-out above this marks a god file.
const GOD_DEGREE: u32 = 40;

/// Churn percentile scales the debt multiplier up to 16x.
const HOTSPOT_FACTOR: f64 = 15.0;

/// Scores for one file, all in `[0, 1]` except debt which is unbounded.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileScore {
    pub file: FileId,
    pub path: String,
    pub hotspot: f64,
    pub health: f64,
    pub debt: f64,
}

/// Recompute scores for every tracked file from current store state.
/// Sorted worst debt first, ties broken by path.
pub fn recompute_file_scores(store: &Store) -> Result<Vec<FileScore>, MetricsError> {
    let files = store.load_file_records()?;
    if files.is_empty() {
        return Ok(Vec::new());
    }

    let complexity_norm = normalized_complexity(store)?;
    let churn_pctile = churn_percentiles(store, &files.iter().map(|f| f.id).collect::<Vec<_>>())?;
    let cycle_files = cycle_file_set(store)?;
    let god_files = god_file_set(store)?;
    let dead_ratio = dead_export_ratios(store)?;

    let mut scores: Vec<FileScore> = files
        .into_iter()
        .map(|file| {
            let complexity = complexity_norm.get(&file.id).copied().unwrap_or(0.0);
            let churn = churn_pctile.get(&file.id).copied().unwrap_or(0.0);
            let in_cycle = cycle_files.contains(&file.id);
            let god = god_files.contains(&file.id);
            let dead = dead_ratio.get(&file.id).copied().unwrap_or(0.0);

            let penalty = WEIGHT_COMPLEXITY * complexity
                + WEIGHT_CYCLE * f64::from(u8::from(in_cycle))
                + WEIGHT_GOD * f64::from(u8::from(god))
                + WEIGHT_DEAD * dead;
            let health = (1.0 - penalty).clamp(0.0, 1.0);
            let hotspot = churn * complexity;
            let debt = (1.0 - health) * (1.0 + churn * HOTSPOT_FACTOR);

            debug!(path = %file.path, hotspot, health, debt, "file scored");
            FileScore {
                file: file.id,
                path: file.path,
                hotspot,
                health,
                debt,
            }
        })
        .collect();

    scores.sort_by(|a, b| {
        b.debt
            .partial_cmp(&a.debt)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then_with(|| a.path.cmp(&b.path))
    });
    Ok(scores)
}

/// Recompute and persist scores as hotspot/health/debt metric records.
pub fn refresh_file_scores(store: &Store) -> Result<Vec<FileScore>, MetricsError> {
    let scores = recompute_file_scores(store)?;
    let mut metrics = Vec::with_capacity(scores.len() * 3);
    for score in &scores {
        metrics.push(MetricWrite::for_file(
            score.file,
            MetricKind::Hotspot,
            score.hotspot,
        ));
        metrics.push(MetricWrite::for_file(
            score.file,
            MetricKind::Health,
            score.health,
        ));
        metrics.push(MetricWrite::for_file(score.file, MetricKind::Debt, score.debt));
    }
    store.put_metrics(&metrics)?;
    info!(files = scores.len(), "file scores refreshed");
    Ok(scores)
}

/// Mean symbol complexity per file, scaled so the worst file sits at 1.0.
fn normalized_complexity(store: &Store) -> Result<HashMap<FileId, f64>, MetricsError> {
    let means = store.file_mean_complexity()?;
    let max = means
        .iter()
        .map(|&(_, mean)| mean)
        .fold(0.0f64, f64::max);
    if max <= 0.0 {
        return Ok(HashMap::new());
    }
    Ok(means
        .into_iter()
        .map(|(file, mean)| (file, mean / max))
        .collect())
}

/// Percentile rank of each file's total churn among all tracked files.
/// Files without merged stats count as zero churn.
fn churn_percentiles(
    store: &Store,
    files: &[FileId],
) -> Result<HashMap<FileId, f64>, MetricsError> {
    let merged: HashMap<FileId, u64> = store
        .vcs_stats_all()?
        .into_iter()
        .map(|(file, stats)| (file, stats.total_churn))
        .collect();

    let mut churns: Vec<u64> = files
        .iter()
        .map(|id| merged.get(id).copied().unwrap_or(0))
        .collect();
    churns.sort_unstable();
    let n = churns.len() as f64;

    Ok(files
        .iter()
        .map(|&id| {
            let churn = merged.get(&id).copied().unwrap_or(0);
            let below = churns.partition_point(|&c| c < churn);
            (id, below as f64 / n)
        })
        .collect())
}

/// Files owning at least one symbol inside a dependency cycle.
fn cycle_file_set(store: &Store) -> Result<HashSet<FileId>, MetricsError> {
    let scope = store.export_scope(Scope::Project)?;
    let file_of: HashMap<_, _> = scope.nodes.iter().map(|n| (n.id, n.file)).collect();
    let view = GraphView::from_scope(&scope);

    let mut in_cycle = HashSet::new();
    for component in cycles(&view) {
        for member in component.members {
            if let Some(&file) = file_of.get(&member) {
                in_cycle.insert(file);
            }
        }
    }
    Ok(in_cycle)
}

fn god_file_set(store: &Store) -> Result<HashSet<FileId>, MetricsError> {
    Ok(store
        .file_degrees()?
        .into_iter()
        .filter(|&(_, fan_in, fan_out)| fan_in + fan_out > GOD_DEGREE)
        .map(|(file, _, _)| file)
        .collect())
}

/// Fraction of a file's public symbols that nothing references.
fn dead_export_ratios(store: &Store) -> Result<HashMap<FileId, f64>, MetricsError> {
    Ok(store
        .public_symbol_usage()?
        .into_iter()
        .filter(|&(_, public, _)| public > 0)
        .map(|(file, public, dead)| (file, f64::from(dead) / f64::from(public)))
        .collect())
}
