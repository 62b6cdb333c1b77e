//! Version-control statistics intake.
//!
//! The engine never shells out to git. A `VcsMetricsProvider` hands over
//! per-file stats keyed by repository-relative path and we merge them
//! verbatim into the store, mirroring the churn-derived numbers as metric
//! records so the fold pass can read everything through one interface.

use tracing::{debug, info};
use trellis_core::{MetricKind, VcsStats};
use trellis_store::{MetricWrite, Store};

use crate::MetricsError;

/// External collaborator that knows version-control history.
///
/// Paths are repository-relative with `/` separators, matching the store's
/// file records. Returning `None` means the provider has no history for the
/// file and nothing is merged for it.
pub trait VcsMetricsProvider {
    fn stats_for(&self, rel_path: &str) -> Option<VcsStats>;
}

/// Provider for roots without version control. Never has stats.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullVcsProvider;

impl VcsMetricsProvider for NullVcsProvider {
    fn stats_for(&self, _rel_path: &str) -> Option<VcsStats> {
        None
    }
}

/// Merge provider stats for every tracked file into the store.
///
/// Each hit upserts the raw `VcsStats` row and mirrors churn, blame age,
/// and entropy as per-file metric records. Returns the number of files
/// that received stats.
pub fn merge_vcs_stats(
    store: &Store,
    provider: &dyn VcsMetricsProvider,
) -> Result<usize, MetricsError> {
    let files = store.load_file_records()?;
    let mut metrics = Vec::new();
    let mut merged = 0usize;

    for file in &files {
        let Some(stats) = provider.stats_for(&file.path) else {
            continue;
        };
        store.upsert_vcs_stats(file.id, &stats)?;
        metrics.push(MetricWrite::for_file(
            file.id,
            MetricKind::Churn,
            stats.total_churn as f64,
        ));
        metrics.push(MetricWrite::for_file(
            file.id,
            MetricKind::BlameAge,
            stats.blame_age_days,
        ));
        metrics.push(MetricWrite::for_file(
            file.id,
            MetricKind::Entropy,
            stats.entropy,
        ));
        merged += 1;
        debug!(path = %file.path, churn = stats.total_churn, "merged vcs stats");
    }

    store.put_metrics(&metrics)?;
    info!(files = files.len(), merged, "vcs stats merge complete");
    Ok(merged)
}
