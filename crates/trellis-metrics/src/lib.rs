//! Trellis Metrics — hotspot, health, and debt scoring.
//!
//! Per-symbol cognitive complexity arrives from the indexing pipeline;
//! churn, blame age, and entropy arrive from an external version-control
//! provider. This crate folds those numbers into per-file scores with fixed
//! weighting rules and writes them back as metric records. Nothing here
//! parses version-control history itself.

use thiserror::Error;
use trellis_store::StoreError;

pub mod folds;
pub mod vcs;

#[cfg(test)]
mod tests;

pub use folds::{FileScore, recompute_file_scores, refresh_file_scores};
pub use vcs::{NullVcsProvider, VcsMetricsProvider, merge_vcs_stats};

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error(transparent)]
    Store(#[from] StoreError),
}
