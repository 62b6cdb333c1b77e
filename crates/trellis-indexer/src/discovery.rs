//! Tracked-file discovery.
//!
//! The default provider walks the project with `ignore`, honoring
//! `.gitignore`/`.ignore` files, and always skips the `.trellis` state
//! directory. Alternative providers (a fixed list in tests, a VCS manifest)
//! implement the same trait.

use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

use globset::{Glob, GlobSet, GlobSetBuilder};
use ignore::WalkBuilder;
use tracing::debug;

use crate::IndexError;

/// A file the project considers part of itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrackedFile {
    pub abs_path: PathBuf,
    /// Root-relative path with `/` separators; the store's unique key.
    pub rel_path: String,
    /// Modification time in milliseconds since the epoch; 0 if unavailable.
    pub mtime_ms: i64,
}

pub trait FileDiscovery: Send + Sync {
    fn tracked_files(&self, root: &Path) -> Result<Vec<TrackedFile>, IndexError>;
}

/// Ignore-rules-honoring directory walk.
pub struct WalkDiscovery {
    excludes: Option<GlobSet>,
}

impl WalkDiscovery {
    pub fn new() -> Self {
        WalkDiscovery { excludes: None }
    }

    /// Additional exclusion globs on top of the ignore files.
    pub fn with_excludes(patterns: &[String]) -> Result<Self, IndexError> {
        let mut builder = GlobSetBuilder::new();
        for pattern in patterns {
            let glob = Glob::new(pattern)
                .map_err(|e| IndexError::Discovery(format!("bad exclude glob {pattern:?}: {e}")))?;
            builder.add(glob);
        }
        let set = builder
            .build()
            .map_err(|e| IndexError::Discovery(e.to_string()))?;
        Ok(WalkDiscovery {
            excludes: Some(set),
        })
    }
}

impl Default for WalkDiscovery {
    fn default() -> Self {
        Self::new()
    }
}

impl FileDiscovery for WalkDiscovery {
    fn tracked_files(&self, root: &Path) -> Result<Vec<TrackedFile>, IndexError> {
        let mut files = Vec::new();
        let walker = WalkBuilder::new(root)
            .hidden(false)
            .filter_entry(|entry| entry.file_name() != ".trellis" && entry.file_name() != ".git")
            .build();

        for entry in walker {
            let entry = entry.map_err(|e| IndexError::Discovery(e.to_string()))?;
            if !entry.file_type().is_some_and(|t| t.is_file()) {
                continue;
            }
            let Some(rel) = relative_key(root, entry.path()) else {
                continue;
            };
            if let Some(excludes) = &self.excludes {
                if excludes.is_match(&rel) {
                    continue;
                }
            }
            files.push(TrackedFile {
                abs_path: entry.path().to_path_buf(),
                mtime_ms: mtime_ms(entry.path()),
                rel_path: rel,
            });
        }

        files.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        debug!(count = files.len(), "discovered tracked files");
        Ok(files)
    }
}

/// Root-relative path with forward slashes, or `None` for paths outside the
/// root.
pub fn relative_key(root: &Path, path: &Path) -> Option<String> {
    let rel = path.strip_prefix(root).ok()?;
    let key = rel.to_string_lossy().replace('\\', "/");
    if key.is_empty() { None } else { Some(key) }
}

pub fn mtime_ms(path: &Path) -> i64 {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .ok()
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

/// Fixed file list, mostly for tests and explicit-path indexing.
pub struct StaticDiscovery {
    files: Vec<PathBuf>,
}

impl StaticDiscovery {
    pub fn new(files: Vec<PathBuf>) -> Self {
        StaticDiscovery { files }
    }
}

impl FileDiscovery for StaticDiscovery {
    fn tracked_files(&self, root: &Path) -> Result<Vec<TrackedFile>, IndexError> {
        let mut tracked = Vec::new();
        for path in &self.files {
            let abs = if path.is_absolute() {
                path.clone()
            } else {
                root.join(path)
            };
            let Some(rel) = relative_key(root, &abs) else {
                return Err(IndexError::Discovery(format!(
                    "{} is outside the project root",
                    abs.display()
                )));
            };
            tracked.push(TrackedFile {
                mtime_ms: mtime_ms(&abs),
                abs_path: abs,
                rel_path: rel,
            });
        }
        tracked.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));
        Ok(tracked)
    }
}
