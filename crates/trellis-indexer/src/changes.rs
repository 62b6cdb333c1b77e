//! Filesystem-vs-store change detection.
//!
//! mtime agreement (within 1 ms) short-circuits hashing; otherwise the
//! sha256 content hash is authoritative, so a touch without an edit costs one
//! hash and changes nothing downstream. Unreadable files get a bounded retry
//! and are then treated as deleted, never silently skipped.

use std::collections::BTreeMap;
use std::io::Read;
use std::path::Path;
use std::time::Duration;

use rayon::prelude::*;
use sha2::{Digest, Sha256};
use tracing::{debug, warn};
use trellis_core::{ChangeDetectorConfig, Diagnostic, DiagnosticKind, FileRecord};

use crate::discovery::TrackedFile;

const HASH_BUF: usize = 64 * 1024;
const MTIME_SLACK_MS: i64 = 1;

/// A tracked file that needs (re-)extraction, with its content hash already
/// computed.
#[derive(Debug, Clone)]
pub struct ChangedFile {
    pub tracked: TrackedFile,
    pub hash: String,
}

/// Partition of the tracked set against the stored set.
#[derive(Debug, Default)]
pub struct ChangeSet {
    pub added: Vec<ChangedFile>,
    pub modified: Vec<ChangedFile>,
    /// Paths present in the store but gone (or unreadable) on disk.
    pub deleted: Vec<String>,
    pub unchanged: usize,
    pub diagnostics: Vec<Diagnostic>,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.added.is_empty() && self.modified.is_empty() && self.deleted.is_empty()
    }
}

enum Outcome {
    Unchanged,
    Added(ChangedFile),
    Modified(ChangedFile),
    /// Unreadable after retries; `was_stored` decides whether a deletion
    /// must be issued.
    Unreadable { was_stored: bool, message: String },
}

/// Diff the tracked file list against the stored records.
///
/// Hashing runs on the rayon pool; the outcome is assembled in sorted path
/// order so the result is deterministic regardless of scheduling.
pub fn detect_changes(
    tracked: &[TrackedFile],
    stored: &[FileRecord],
    cfg: &ChangeDetectorConfig,
) -> ChangeSet {
    let stored_by_path: BTreeMap<&str, &FileRecord> =
        stored.iter().map(|r| (r.path.as_str(), r)).collect();

    let mut outcomes: Vec<(String, Outcome)> = tracked
        .par_iter()
        .map(|file| (file.rel_path.clone(), classify(file, stored_by_path.get(file.rel_path.as_str()).copied(), cfg)))
        .collect();
    outcomes.sort_by(|a, b| a.0.cmp(&b.0));

    let mut set = ChangeSet::default();
    for (path, outcome) in outcomes {
        match outcome {
            Outcome::Unchanged => set.unchanged += 1,
            Outcome::Added(file) => set.added.push(file),
            Outcome::Modified(file) => set.modified.push(file),
            Outcome::Unreadable { was_stored, message } => {
                warn!(path = %path, "file unreadable, treating as deleted");
                if was_stored {
                    set.deleted.push(path.clone());
                }
                set.diagnostics.push(Diagnostic {
                    path,
                    kind: DiagnosticKind::Unreadable,
                    message,
                });
            }
        }
    }

    // Stored but no longer tracked.
    let tracked_paths: std::collections::BTreeSet<&str> =
        tracked.iter().map(|f| f.rel_path.as_str()).collect();
    for record in stored {
        if !tracked_paths.contains(record.path.as_str()) {
            set.deleted.push(record.path.clone());
        }
    }
    set.deleted.sort();
    set.deleted.dedup();

    debug!(
        added = set.added.len(),
        modified = set.modified.len(),
        deleted = set.deleted.len(),
        unchanged = set.unchanged,
        "change detection complete"
    );
    set
}

fn classify(
    file: &TrackedFile,
    stored: Option<&FileRecord>,
    cfg: &ChangeDetectorConfig,
) -> Outcome {
    if let Some(record) = stored {
        if (file.mtime_ms - record.mtime_ms).abs() <= MTIME_SLACK_MS {
            return Outcome::Unchanged;
        }
    }

    match hash_with_retries(&file.abs_path, cfg) {
        Ok(hash) => match stored {
            Some(record) if record.hash == hash => Outcome::Unchanged,
            Some(_) => Outcome::Modified(ChangedFile {
                tracked: file.clone(),
                hash,
            }),
            None => Outcome::Added(ChangedFile {
                tracked: file.clone(),
                hash,
            }),
        },
        Err(e) => Outcome::Unreadable {
            was_stored: stored.is_some(),
            message: e.to_string(),
        },
    }
}

fn hash_with_retries(path: &Path, cfg: &ChangeDetectorConfig) -> std::io::Result<String> {
    let mut last_err = None;
    for attempt in 0..=cfg.retry_budget {
        if attempt > 0 {
            std::thread::sleep(Duration::from_millis(cfg.retry_delay_ms));
        }
        match hash_file(path) {
            Ok(hash) => return Ok(hash),
            Err(e) => last_err = Some(e),
        }
    }
    Err(last_err.unwrap_or_else(|| std::io::Error::other("unreadable")))
}

/// Streaming sha256 of the file content, hex-encoded.
pub fn hash_file(path: &Path) -> std::io::Result<String> {
    let mut file = std::fs::File::open(path)?;
    let mut hasher = Sha256::new();
    let mut buf = vec![0u8; HASH_BUF];
    loop {
        let n = file.read(&mut buf)?;
        if n == 0 {
            break;
        }
        hasher.update(&buf[..n]);
    }
    Ok(hex_digest(&hasher.finalize()))
}

pub fn hash_bytes(content: &[u8]) -> String {
    hex_digest(&Sha256::digest(content))
}

fn hex_digest(digest: &[u8]) -> String {
    let mut out = String::with_capacity(digest.len() * 2);
    for byte in digest {
        out.push_str(&format!("{byte:02x}"));
    }
    out
}
