//! Transactional write batches.
//!
//! A batch is all-or-nothing: file upserts, per-file symbol replacement, and
//! provenance-scoped edge regeneration happen inside one transaction, and
//! referential integrity is validated before commit. A violation rolls the
//! whole batch back and surfaces as [`StoreError::Integrity`].

use std::collections::HashSet;

use rusqlite::{params, Transaction, TransactionBehavior};
use trellis_core::{
    EdgeKind, EdgeOrigin, FileId, FileRole, Language, MetricKind, MetricOwner, SymbolId,
    SymbolKind, Visibility,
};

use crate::{Store, StoreError};

/// Everything to write for one (added or modified) file.
///
/// File ids are assigned by the store; edges within a `FileWrite` implicitly
/// carry the file's own id as provenance and source file.
#[derive(Debug, Clone)]
pub struct FileWrite {
    pub path: String,
    pub language: Language,
    pub hash: String,
    pub mtime_ms: i64,
    pub line_count: u32,
    pub role: FileRole,
    pub symbols: Vec<SymbolWrite>,
    pub edges: Vec<EdgeWrite>,
}

#[derive(Debug, Clone)]
pub struct SymbolWrite {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub signature: Option<String>,
    pub line_start: u32,
    pub line_end: u32,
    pub visibility: Visibility,
}

#[derive(Debug, Clone)]
pub struct EdgeWrite {
    pub source_symbol: Option<SymbolId>,
    pub target_symbol: Option<SymbolId>,
    pub kind: EdgeKind,
    pub origin: EdgeOrigin,
    pub confidence: f32,
    pub candidate_count: u32,
    pub line: Option<u32>,
}

#[derive(Debug, Clone)]
pub struct MetricWrite {
    pub owner: MetricOwner,
    pub kind: MetricKind,
    pub value: f64,
}

/// One transactional unit of index output.
#[derive(Debug, Clone, Default)]
pub struct WriteBatch {
    /// Added or modified files, each replacing its previous symbol set and
    /// provenance-owned edges.
    pub upserts: Vec<FileWrite>,
    /// Paths of files no longer tracked.
    pub deletes: Vec<String>,
    /// Metric records to upsert alongside (typically per-symbol complexity).
    pub metrics: Vec<MetricWrite>,
}

impl WriteBatch {
    pub fn is_empty(&self) -> bool {
        self.upserts.is_empty() && self.deletes.is_empty() && self.metrics.is_empty()
    }
}

/// Row counts for one committed batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BatchSummary {
    pub files_upserted: usize,
    pub files_deleted: usize,
    pub symbols_added: usize,
    pub symbols_removed: usize,
    pub edges_added: usize,
    pub edges_removed: usize,
    pub unresolved: usize,
}

impl Store {
    /// Apply a write batch atomically.
    ///
    /// Ordering inside the transaction: deletions first, then upserts in
    /// sorted path order, then metrics, then an integrity sweep. In-edges of
    /// symbols that vanish are demoted to unresolved rather than cascaded
    /// away; the owning file's next re-index regenerates or retires them.
    pub fn apply_batch(&self, batch: &WriteBatch) -> Result<BatchSummary, StoreError> {
        if batch.is_empty() {
            return Ok(BatchSummary::default());
        }

        let mut conn = self.conn();
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;
        let mut summary = BatchSummary::default();

        let mut deletes: Vec<&str> = batch.deletes.iter().map(String::as_str).collect();
        deletes.sort_unstable();
        for path in deletes {
            summary_delete_file(&tx, path, &mut summary)?;
        }

        let mut upserts: Vec<&FileWrite> = batch.upserts.iter().collect();
        upserts.sort_unstable_by(|a, b| a.path.cmp(&b.path));
        for write in upserts {
            apply_file_write(&tx, write, &mut summary)?;
        }

        for metric in &batch.metrics {
            let (owner_kind, owner_id) = match metric.owner {
                MetricOwner::Symbol(id) => ("symbol", id.0),
                MetricOwner::File(id) => ("file", id.0),
            };
            tx.execute(
                "INSERT OR REPLACE INTO metrics (owner_kind, owner_id, kind, value) \
                 VALUES (?1, ?2, ?3, ?4)",
                params![owner_kind, owner_id, metric.kind.as_str(), metric.value],
            )?;
        }

        validate_integrity(&tx)?;
        tx.commit()?;
        Ok(summary)
    }
}

fn summary_delete_file(
    tx: &Transaction<'_>,
    path: &str,
    summary: &mut BatchSummary,
) -> Result<(), StoreError> {
    let file_id: Option<i64> = tx
        .query_row("SELECT id FROM files WHERE path = ?1", params![path], |r| {
            r.get(0)
        })
        .map(Some)
        .or_else(|e| match e {
            rusqlite::Error::QueryReturnedNoRows => Ok(None),
            other => Err(other),
        })?;
    let Some(file_id) = file_id else {
        return Ok(());
    };

    let old_ids = symbol_ids_for_file(tx, file_id)?;
    demote_foreign_in_edges(tx, file_id, &old_ids)?;

    summary.edges_removed += tx.execute(
        "DELETE FROM edges WHERE provenance_file_id = ?1",
        params![file_id],
    )?;
    delete_symbol_metrics(tx, &old_ids)?;
    tx.execute(
        "DELETE FROM metrics WHERE owner_kind = 'file' AND owner_id = ?1",
        params![file_id],
    )?;
    tx.execute("DELETE FROM vcs_stats WHERE file_id = ?1", params![file_id])?;
    summary.symbols_removed += tx.execute(
        "DELETE FROM symbols WHERE file_id = ?1",
        params![file_id],
    )?;
    tx.execute("DELETE FROM files WHERE id = ?1", params![file_id])?;
    summary.files_deleted += 1;
    Ok(())
}

fn apply_file_write(
    tx: &Transaction<'_>,
    write: &FileWrite,
    summary: &mut BatchSummary,
) -> Result<(), StoreError> {
    tx.execute(
        "INSERT INTO files (path, language, hash, mtime_ms, line_count, role) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6) \
         ON CONFLICT(path) DO UPDATE SET \
           language = excluded.language, hash = excluded.hash, \
           mtime_ms = excluded.mtime_ms, line_count = excluded.line_count, \
           role = excluded.role",
        params![
            write.path,
            write.language.as_str(),
            write.hash,
            write.mtime_ms,
            write.line_count,
            write.role.as_str(),
        ],
    )?;
    let file_id: i64 = tx.query_row(
        "SELECT id FROM files WHERE path = ?1",
        params![write.path],
        |r| r.get(0),
    )?;
    summary.files_upserted += 1;

    let old_ids = symbol_ids_for_file(tx, file_id)?;
    let new_ids: HashSet<i64> = write.symbols.iter().map(|s| s.id.0).collect();
    let vanished: Vec<i64> = old_ids.iter().copied().filter(|id| !new_ids.contains(id)).collect();

    demote_foreign_in_edges(tx, file_id, &vanished)?;
    summary.edges_removed += tx.execute(
        "DELETE FROM edges WHERE provenance_file_id = ?1",
        params![file_id],
    )?;
    delete_symbol_metrics(tx, &vanished)?;

    // Replace the file's symbol set atomically
    tx.execute("DELETE FROM symbols WHERE file_id = ?1", params![file_id])?;
    summary.symbols_removed += vanished.len();
    let old_set: HashSet<i64> = old_ids.iter().copied().collect();
    for symbol in &write.symbols {
        tx.execute(
            "INSERT OR REPLACE INTO symbols \
             (id, file_id, kind, name, qualified_name, signature, line_start, line_end, visibility) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                symbol.id.0,
                file_id,
                symbol.kind.as_str(),
                symbol.name,
                symbol.qualified_name,
                symbol.signature,
                symbol.line_start,
                symbol.line_end,
                symbol.visibility.as_str(),
            ],
        )?;
        if !old_set.contains(&symbol.id.0) {
            summary.symbols_added += 1;
        }
    }

    for edge in &write.edges {
        tx.execute(
            "INSERT INTO edges \
             (provenance_file_id, source_file_id, source_symbol_id, target_symbol_id, \
              kind, origin, confidence, candidate_count, line) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                file_id,
                file_id,
                edge.source_symbol.map(|s| s.0),
                edge.target_symbol.map(|s| s.0),
                edge.kind.as_str(),
                edge.origin.as_str(),
                edge.confidence,
                edge.candidate_count,
                edge.line,
            ],
        )?;
        summary.edges_added += 1;
        if edge.target_symbol.is_none() {
            summary.unresolved += 1;
        }
    }

    Ok(())
}

fn symbol_ids_for_file(tx: &Transaction<'_>, file_id: i64) -> Result<Vec<i64>, StoreError> {
    let mut stmt = tx.prepare("SELECT id FROM symbols WHERE file_id = ?1")?;
    let ids = stmt
        .query_map(params![file_id], |r| r.get(0))?
        .collect::<Result<Vec<i64>, _>>()?;
    Ok(ids)
}

/// Demote edges from *other* files that target the given symbols to
/// unresolved, preserving the provenance invariant: only the owning file's
/// re-index may delete its edges.
fn demote_foreign_in_edges(
    tx: &Transaction<'_>,
    file_id: i64,
    targets: &[i64],
) -> Result<(), StoreError> {
    for chunk in targets.chunks(crate::queries::SQL_CHUNK) {
        let placeholders = crate::queries::placeholders(chunk.len());
        let sql = format!(
            "UPDATE edges SET target_symbol_id = NULL, candidate_count = 0 \
             WHERE provenance_file_id != {file_id} AND target_symbol_id IN ({placeholders})"
        );
        let mut stmt = tx.prepare(&sql)?;
        stmt.execute(rusqlite::params_from_iter(chunk.iter()))?;
    }
    Ok(())
}

fn delete_symbol_metrics(tx: &Transaction<'_>, ids: &[i64]) -> Result<(), StoreError> {
    for chunk in ids.chunks(crate::queries::SQL_CHUNK) {
        let placeholders = crate::queries::placeholders(chunk.len());
        let sql = format!(
            "DELETE FROM metrics WHERE owner_kind = 'symbol' AND owner_id IN ({placeholders})"
        );
        let mut stmt = tx.prepare(&sql)?;
        stmt.execute(rusqlite::params_from_iter(chunk.iter()))?;
    }
    Ok(())
}

/// Referential sweep run before every commit. Any hit means the batch is bad;
/// the transaction is rolled back untouched.
fn validate_integrity(tx: &Transaction<'_>) -> Result<(), StoreError> {
    let dangling_targets: i64 = tx.query_row(
        "SELECT COUNT(*) FROM edges e LEFT JOIN symbols s ON e.target_symbol_id = s.id \
         WHERE e.target_symbol_id IS NOT NULL AND s.id IS NULL",
        [],
        |r| r.get(0),
    )?;
    if dangling_targets > 0 {
        return Err(StoreError::Integrity(format!(
            "{dangling_targets} edge(s) target nonexistent symbols"
        )));
    }

    let dangling_sources: i64 = tx.query_row(
        "SELECT COUNT(*) FROM edges e LEFT JOIN symbols s ON e.source_symbol_id = s.id \
         WHERE e.source_symbol_id IS NOT NULL AND s.id IS NULL",
        [],
        |r| r.get(0),
    )?;
    if dangling_sources > 0 {
        return Err(StoreError::Integrity(format!(
            "{dangling_sources} edge(s) originate from nonexistent symbols"
        )));
    }

    let orphan_provenance: i64 = tx.query_row(
        "SELECT COUNT(*) FROM edges e LEFT JOIN files f ON e.provenance_file_id = f.id \
         WHERE f.id IS NULL",
        [],
        |r| r.get(0),
    )?;
    if orphan_provenance > 0 {
        return Err(StoreError::Integrity(format!(
            "{orphan_provenance} edge(s) have no provenance file"
        )));
    }

    Ok(())
}

/// Re-export for FileId-based metric writes after the file row exists.
impl MetricWrite {
    pub fn for_symbol(id: SymbolId, kind: MetricKind, value: f64) -> Self {
        MetricWrite {
            owner: MetricOwner::Symbol(id),
            kind,
            value,
        }
    }

    pub fn for_file(id: FileId, kind: MetricKind, value: f64) -> Self {
        MetricWrite {
            owner: MetricOwner::File(id),
            kind,
            value,
        }
    }
}
