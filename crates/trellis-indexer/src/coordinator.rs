//! The indexing pipeline.
//!
//! One run: discover, detect changes, extract changed files in parallel,
//! build the symbol table, resolve references, write batches. Batches commit
//! independently, so an interrupted run leaves a consistent store and the
//! next run resumes through change detection. Files are processed in sorted
//! path order inside each phase and resolution always reads a complete
//! symbol table, which makes unrelated changes commute.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use rayon::prelude::*;
use tracing::{debug, info, warn};
use trellis_core::{FileRole, IndexReport, Language, MetricKind, SymbolId};
use trellis_store::{EdgeWrite, EngineContext, FileWrite, MetricWrite, SymbolWrite, WriteBatch};

use crate::IndexError;
use crate::bridges::BridgeRegistry;
use crate::changes::{self, ChangedFile};
use crate::discovery::FileDiscovery;
use crate::extractor::{self, Extraction, RawReference};
use crate::resolver::{self, Resolution, SymbolTable, TableEntry};

/// One changed file after extraction, ready for resolution.
struct ExtractedFile {
    rel_path: String,
    language: Language,
    role: FileRole,
    hash: String,
    mtime_ms: i64,
    line_count: u32,
    extraction: Extraction,
    /// Store ids for the extraction's symbol drafts, index-aligned.
    symbol_ids: Vec<SymbolId>,
}

pub struct Indexer {
    root: PathBuf,
}

impl Indexer {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Indexer { root: root.into() }
    }

    /// Run one incremental index pass.
    ///
    /// `explicit_changed` narrows re-extraction to the given paths (watcher
    /// integration); deletion detection still covers the whole tracked set.
    pub fn run(
        &self,
        ctx: &EngineContext,
        discovery: &dyn FileDiscovery,
        explicit_changed: Option<&[PathBuf]>,
    ) -> Result<IndexReport, IndexError> {
        let tracked = discovery.tracked_files(&self.root)?;
        let stored = ctx.store.load_file_records()?;
        debug!(tracked = tracked.len(), stored = stored.len(), "change detection");

        let mut changes = changes::detect_changes(&tracked, &stored, &ctx.config.change_detector);
        if let Some(explicit) = explicit_changed {
            let keep = self.relative_set(explicit);
            changes.added.retain(|f| keep.contains(&f.tracked.rel_path));
            changes.modified.retain(|f| keep.contains(&f.tracked.rel_path));
        }

        let mut report = IndexReport {
            files_scanned: tracked.len(),
            ..IndexReport::default()
        };
        report.diagnostics.append(&mut changes.diagnostics);

        if changes.is_empty() {
            info!("index up to date");
            return Ok(report);
        }
        info!(
            added = changes.added.len(),
            modified = changes.modified.len(),
            deleted = changes.deleted.len(),
            "indexing"
        );

        // Extraction is pure per file; order restored by sorting afterwards.
        let mut work: Vec<&ChangedFile> = changes.added.iter().chain(&changes.modified).collect();
        work.sort_by(|a, b| a.tracked.rel_path.cmp(&b.tracked.rel_path));

        let mut extracted: Vec<ExtractedFile> = work
            .par_iter()
            .filter_map(|changed| extract_one(changed))
            .collect();
        extracted.sort_by(|a, b| a.rel_path.cmp(&b.rel_path));

        let table = self.build_symbol_table(ctx, &changes.deleted, &extracted)?;

        let bridges = BridgeRegistry::default();
        let edges_per_file: Vec<Vec<EdgeWrite>> = extracted
            .par_iter()
            .map(|file| resolve_file(file, &table, &bridges, ctx))
            .collect();

        // Committed in path-sorted chunks; each chunk is atomic on its own.
        let batch_files = ctx.config.indexer.batch_files.max(1);
        let mut deletes: Vec<String> = changes.deleted.clone();
        let mut pending: Vec<(ExtractedFile, Vec<EdgeWrite>)> =
            extracted.into_iter().zip(edges_per_file).collect();

        while !pending.is_empty() || !deletes.is_empty() {
            let chunk: Vec<(ExtractedFile, Vec<EdgeWrite>)> = pending
                .drain(..pending.len().min(batch_files))
                .collect();

            let mut batch = WriteBatch {
                deletes: std::mem::take(&mut deletes),
                ..WriteBatch::default()
            };
            for (file, edges) in chunk {
                for (index, draft) in file.extraction.symbols.iter().enumerate() {
                    if let Some(complexity) = draft.complexity {
                        batch.metrics.push(MetricWrite::for_symbol(
                            file.symbol_ids[index],
                            MetricKind::Complexity,
                            complexity,
                        ));
                    }
                }
                report
                    .diagnostics
                    .extend(file.extraction.diagnostics.iter().cloned());
                batch.upserts.push(file_write(file, edges));
            }

            let summary = ctx.store.apply_batch(&batch)?;
            report.files_deleted += summary.files_deleted;
            report.symbols_added += summary.symbols_added;
            report.symbols_removed += summary.symbols_removed;
            report.edges_added += summary.edges_added;
            report.edges_removed += summary.edges_removed;
            report.unresolved += summary.unresolved;
        }

        report.files_added = changes.added.len();
        report.files_modified = changes.modified.len();
        info!(
            symbols_added = report.symbols_added,
            edges_added = report.edges_added,
            unresolved = report.unresolved,
            "index pass complete"
        );
        Ok(report)
    }

    /// Stored symbols minus changed and deleted files, plus the fresh
    /// extractions.
    fn build_symbol_table(
        &self,
        ctx: &EngineContext,
        deleted: &[String],
        extracted: &[ExtractedFile],
    ) -> Result<SymbolTable, IndexError> {
        let mut stale: BTreeSet<&str> = deleted.iter().map(String::as_str).collect();
        for file in extracted {
            stale.insert(&file.rel_path);
        }

        let table = SymbolTable::new();
        for (symbol, path) in ctx.store.symbols_with_paths()? {
            if stale.contains(path.as_str()) {
                continue;
            }
            table.insert(TableEntry {
                id: symbol.id,
                kind: symbol.kind,
                name: symbol.name,
                qualified_name: symbol.qualified_name,
                path,
            });
        }
        for file in extracted {
            for (index, draft) in file.extraction.symbols.iter().enumerate() {
                table.insert(TableEntry {
                    id: file.symbol_ids[index],
                    kind: draft.kind,
                    name: draft.name.clone(),
                    qualified_name: draft.qualified_name.clone(),
                    path: file.rel_path.clone(),
                });
            }
        }
        Ok(table)
    }

    fn relative_set(&self, paths: &[PathBuf]) -> BTreeSet<String> {
        paths
            .iter()
            .map(|p| {
                p.strip_prefix(&self.root)
                    .unwrap_or(p)
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }
}

fn extract_one(changed: &ChangedFile) -> Option<ExtractedFile> {
    let rel_path = changed.tracked.rel_path.clone();
    let content = match fs::read_to_string(&changed.tracked.abs_path) {
        Ok(content) => content,
        Err(err) => {
            warn!(path = %rel_path, error = %err, "unreadable during extraction; skipped");
            return None;
        }
    };

    let path = Path::new(&rel_path);
    let language = Language::from_path(path);
    let role = FileRole::classify(path);
    let extraction = extractor::extract_file(&rel_path, language, role, &content);

    let symbol_ids = extraction
        .symbols
        .iter()
        .map(|draft| SymbolId::derive(&rel_path, draft.kind, &draft.qualified_name))
        .collect();

    Some(ExtractedFile {
        rel_path,
        language,
        role,
        hash: changed.hash.clone(),
        mtime_ms: changed.tracked.mtime_ms,
        line_count: content.lines().count() as u32,
        extraction,
        symbol_ids,
    })
}

fn resolve_file(
    file: &ExtractedFile,
    table: &SymbolTable,
    bridges: &BridgeRegistry,
    ctx: &EngineContext,
) -> Vec<EdgeWrite> {
    file.extraction
        .references
        .iter()
        .map(|raw| {
            let source_symbol = raw.enclosing.map(|index| file.symbol_ids[index]);
            match resolver::resolve(raw, &file.rel_path, table, bridges, &ctx.config.resolver) {
                Resolution::Resolved {
                    target,
                    kind,
                    origin,
                    confidence,
                } => EdgeWrite {
                    source_symbol,
                    target_symbol: Some(target),
                    kind,
                    origin,
                    confidence: confidence as f32,
                    candidate_count: 0,
                    line: Some(raw.line),
                },
                Resolution::Unresolved { candidates } => unresolved_edge(raw, source_symbol, candidates),
            }
        })
        .collect()
}

fn unresolved_edge(raw: &RawReference, source_symbol: Option<SymbolId>, candidates: u32) -> EdgeWrite {
    EdgeWrite {
        source_symbol,
        target_symbol: None,
        kind: resolver::edge_kind_for(raw.kind, None),
        origin: raw.origin,
        confidence: 0.0,
        candidate_count: candidates,
        line: Some(raw.line),
    }
}

fn file_write(file: ExtractedFile, edges: Vec<EdgeWrite>) -> FileWrite {
    let symbols = file
        .extraction
        .symbols
        .iter()
        .enumerate()
        .map(|(index, draft)| SymbolWrite {
            id: file.symbol_ids[index],
            kind: draft.kind,
            name: draft.name.clone(),
            qualified_name: draft.qualified_name.clone(),
            signature: draft.signature.clone(),
            line_start: draft.line_start,
            line_end: draft.line_end,
            visibility: draft.visibility,
        })
        .collect();

    FileWrite {
        path: file.rel_path,
        language: file.language,
        hash: file.hash,
        mtime_ms: file.mtime_ms,
        line_count: file.line_count,
        role: file.role,
        symbols,
        edges,
    }
}
