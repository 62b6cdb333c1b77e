//! Trellis Graph — in-memory algorithms over exported scopes
//!
//! Every algorithm here operates on a [`GraphView`], an ephemeral petgraph
//! structure materialized from a store export. Nothing in this crate is
//! persisted; results are handed back to the caller, which may choose to
//! write them as metrics. All algorithms are deterministic: node iteration
//! follows sorted symbol ids and no randomness is involved anywhere.

pub mod clusters;
pub mod cycles;
pub mod diff;
pub mod layers;
pub mod pagerank;
pub mod paths;
pub mod propagation;
pub mod view;

#[cfg(test)]
mod tests;

pub use clusters::clusters;
pub use cycles::{CycleComponent, cycles};
pub use diff::{DeltaEdge, GraphDelta, snapshot_diff};
pub use layers::{LayerViolation, layer_violations, layers};
pub use pagerank::pagerank;
pub use paths::k_shortest_paths;
pub use propagation::{Guarded, propagation_cost};
pub use view::GraphView;
