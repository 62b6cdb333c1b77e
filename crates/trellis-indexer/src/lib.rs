//! Trellis Indexer — change detection, extraction, resolution, coordination.
//!
//! The pipeline is: discover tracked files, diff them against the store,
//! extract symbols and raw references from changed files on the rayon pool,
//! resolve references against a per-run symbol table (bridges included), and
//! commit the result as transactional write batches.

use thiserror::Error;
use trellis_store::StoreError;

pub mod bridges;
pub mod changes;
pub mod complexity;
pub mod coordinator;
pub mod discovery;
pub mod extractor;
pub mod languages;
pub mod resolver;

#[cfg(test)]
mod tests;

pub use changes::{ChangeSet, ChangedFile, detect_changes};
pub use coordinator::Indexer;
pub use discovery::{FileDiscovery, TrackedFile, WalkDiscovery};
pub use extractor::{Extraction, RawReference, RawReferenceKind, SymbolDraft, extract_file};
pub use resolver::{Resolution, SymbolTable};

/// Errors that abort an indexing run outright. Per-file problems never land
/// here; they aggregate as diagnostics in the report.
#[derive(Debug, Error)]
pub enum IndexError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("file discovery failed: {0}")]
    Discovery(String),
}
