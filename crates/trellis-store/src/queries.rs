//! Read-side queries: point lookups, bulk loads, and scoped graph export.
//!
//! Every bulk operation that expands to an `IN (...)` list is chunked so no
//! statement exceeds SQLite's bound-variable limit, and every listing query
//! carries an `ORDER BY` so results are deterministic across runs.

use std::collections::HashSet;

use rusqlite::{params, params_from_iter, Row};
use tracing::debug;
use trellis_core::{
    Edge, EdgeKind, EdgeOrigin, FileId, FileRecord, FileRole, Language, MetricKind, MetricOwner,
    Symbol, SymbolId, SymbolKind, VcsStats, Visibility,
};

use crate::batch::MetricWrite;
use crate::{Store, StoreError};

/// Hard per-statement bound for `IN (...)` expansion, comfortably under
/// SQLite's default 999-variable limit. The configurable
/// `store.chunk_size` governs bulk export batching and is clamped to this.
pub(crate) const SQL_CHUNK: usize = 500;

pub(crate) fn placeholders(n: usize) -> String {
    let mut out = String::with_capacity(n * 2);
    for i in 0..n {
        if i > 0 {
            out.push(',');
        }
        out.push('?');
    }
    out
}

/// Outcome of a name lookup. Ambiguity is a value the caller must handle,
/// never a silent first-match guess.
#[derive(Debug, Clone)]
pub enum Lookup {
    Found(Symbol),
    /// Several symbols share the queried name; all of them, in a stable
    /// order, so the caller can present the choices.
    Ambiguous(Vec<Symbol>),
    NotFound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EdgeDirection {
    /// Edges targeting the symbol.
    In,
    /// Edges originating at the symbol.
    Out,
}

/// What portion of the graph to export.
#[derive(Debug, Clone, Copy)]
pub enum Scope {
    /// Every symbol and every resolved edge.
    Project,
    /// The symbols within `hops` undirected steps of `center`, plus the
    /// resolved edges among them.
    Neighborhood { center: SymbolId, hops: u32 },
}

/// A symbol as it appears in an exported scope: enough to label a graph
/// node without further queries.
#[derive(Debug, Clone, PartialEq)]
pub struct ScopeNode {
    pub id: SymbolId,
    pub name: String,
    pub kind: SymbolKind,
    pub file: FileId,
    pub path: String,
}

/// A resolved edge between two in-scope symbols.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScopeEdge {
    pub source: SymbolId,
    pub target: SymbolId,
    pub kind: EdgeKind,
}

/// Materialized slice of the graph, ready to hand to the algorithm layer.
#[derive(Debug, Clone, Default)]
pub struct GraphScope {
    pub nodes: Vec<ScopeNode>,
    pub edges: Vec<ScopeEdge>,
}

impl GraphScope {
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }
}

const SYMBOL_COLUMNS: &str =
    "id, file_id, kind, name, qualified_name, signature, line_start, line_end, visibility";

fn symbol_from_row(row: &Row<'_>) -> rusqlite::Result<Symbol> {
    Ok(Symbol {
        id: SymbolId(row.get(0)?),
        file: FileId(row.get(1)?),
        kind: SymbolKind::parse_tag(&row.get::<_, String>(2)?),
        name: row.get(3)?,
        qualified_name: row.get(4)?,
        signature: row.get(5)?,
        line_start: row.get(6)?,
        line_end: row.get(7)?,
        visibility: Visibility::parse_tag(&row.get::<_, String>(8)?),
    })
}

const EDGE_COLUMNS: &str = "id, provenance_file_id, source_file_id, source_symbol_id, \
     target_symbol_id, kind, origin, confidence, candidate_count, line";

fn edge_from_row(row: &Row<'_>) -> rusqlite::Result<Edge> {
    Ok(Edge {
        id: row.get(0)?,
        provenance: FileId(row.get(1)?),
        source_file: FileId(row.get(2)?),
        source_symbol: row.get::<_, Option<i64>>(3)?.map(SymbolId),
        target_symbol: row.get::<_, Option<i64>>(4)?.map(SymbolId),
        kind: EdgeKind::parse_tag(&row.get::<_, String>(5)?),
        origin: EdgeOrigin::parse_tag(&row.get::<_, String>(6)?),
        confidence: row.get(7)?,
        candidate_count: row.get(8)?,
        line: row.get(9)?,
    })
}

fn file_from_row(row: &Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        id: FileId(row.get(0)?),
        path: row.get(1)?,
        language: Language::parse_tag(&row.get::<_, String>(2)?),
        hash: row.get(3)?,
        mtime_ms: row.get(4)?,
        line_count: row.get(5)?,
        role: FileRole::parse_tag(&row.get::<_, String>(6)?),
    })
}

impl Store {
    /// All tracked files, ordered by path. The change detector diffs this
    /// against the filesystem.
    pub fn load_file_records(&self) -> Result<Vec<FileRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, path, language, hash, mtime_ms, line_count, role \
             FROM files ORDER BY path",
        )?;
        let records = stmt
            .query_map([], file_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    pub fn file_by_path(&self, path: &str) -> Result<Option<FileRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, path, language, hash, mtime_ms, line_count, role \
             FROM files WHERE path = ?1",
        )?;
        let mut rows = stmt.query_map(params![path], file_from_row)?;
        Ok(rows.next().transpose()?)
    }

    pub fn file_by_id(&self, id: FileId) -> Result<Option<FileRecord>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT id, path, language, hash, mtime_ms, line_count, role \
             FROM files WHERE id = ?1",
        )?;
        let mut rows = stmt.query_map(params![id.0], file_from_row)?;
        Ok(rows.next().transpose()?)
    }

    pub fn symbol_by_id(&self, id: SymbolId) -> Result<Option<Symbol>, StoreError> {
        let conn = self.conn();
        let mut stmt =
            conn.prepare(&format!("SELECT {SYMBOL_COLUMNS} FROM symbols WHERE id = ?1"))?;
        let mut rows = stmt.query_map(params![id.0], symbol_from_row)?;
        Ok(rows.next().transpose()?)
    }

    /// Look a symbol up by name: exact short-name matches first, falling back
    /// to exact qualified-name matches. Multiple hits surface as
    /// [`Lookup::Ambiguous`] rather than picking one.
    pub fn lookup_symbol(&self, query: &str) -> Result<Lookup, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE name = ?1 \
             ORDER BY qualified_name, file_id"
        ))?;
        let mut matches = stmt
            .query_map(params![query], symbol_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        if matches.is_empty() {
            let mut stmt = conn.prepare(&format!(
                "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE qualified_name = ?1 \
                 ORDER BY file_id"
            ))?;
            matches = stmt
                .query_map(params![query], symbol_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
        }

        Ok(match matches.len() {
            0 => Lookup::NotFound,
            1 => Lookup::Found(matches.remove(0)),
            _ => Lookup::Ambiguous(matches),
        })
    }

    /// The symbols of one file, ordered by position. `None` when the file is
    /// not tracked.
    pub fn file_skeleton(&self, path: &str) -> Result<Option<Vec<Symbol>>, StoreError> {
        let Some(record) = self.file_by_path(path)? else {
            return Ok(None);
        };
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE file_id = ?1 \
             ORDER BY line_start, line_end DESC, name"
        ))?;
        let symbols = stmt
            .query_map(params![record.id.0], symbol_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(symbols))
    }

    /// Edges touching a symbol in the given direction, ordered by row id.
    pub fn edges_for(
        &self,
        symbol: SymbolId,
        direction: EdgeDirection,
    ) -> Result<Vec<Edge>, StoreError> {
        let column = match direction {
            EdgeDirection::In => "target_symbol_id",
            EdgeDirection::Out => "source_symbol_id",
        };
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT {EDGE_COLUMNS} FROM edges WHERE {column} = ?1 ORDER BY id"
        ))?;
        let edges = stmt
            .query_map(params![symbol.0], edge_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(edges)
    }

    /// Every symbol in the store paired with its file's path, ordered by
    /// (path, line). This is the resolver's input table.
    pub fn symbols_with_paths(&self) -> Result<Vec<(Symbol, String)>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(&format!(
            "SELECT s.{}, f.path FROM symbols s JOIN files f ON s.file_id = f.id \
             ORDER BY f.path, s.line_start, s.id",
            SYMBOL_COLUMNS.replace(", ", ", s.")
        ))?;
        let rows = stmt
            .query_map([], |row| Ok((symbol_from_row(row)?, row.get::<_, String>(9)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Fetch symbols by id, chunked. Missing ids are silently skipped.
    pub fn symbols_by_ids(&self, ids: &[SymbolId]) -> Result<Vec<Symbol>, StoreError> {
        let conn = self.conn();
        let mut out = Vec::with_capacity(ids.len());
        for chunk in ids.chunks(self.chunk_size().min(SQL_CHUNK)) {
            let sql = format!(
                "SELECT {SYMBOL_COLUMNS} FROM symbols WHERE id IN ({}) ORDER BY id",
                placeholders(chunk.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(chunk.iter().map(|s| s.0)), symbol_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            out.extend(rows);
        }
        Ok(out)
    }

    pub fn metric(&self, owner: MetricOwner, kind: MetricKind) -> Result<Option<f64>, StoreError> {
        let (owner_kind, owner_id) = owner_key(owner);
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT value FROM metrics WHERE owner_kind = ?1 AND owner_id = ?2 AND kind = ?3",
        )?;
        let mut rows = stmt.query_map(params![owner_kind, owner_id, kind.as_str()], |r| r.get(0))?;
        Ok(rows.next().transpose()?)
    }

    /// All metric rows of one kind for symbol owners, ordered by owner id.
    pub fn symbol_metrics(&self, kind: MetricKind) -> Result<Vec<(SymbolId, f64)>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT owner_id, value FROM metrics \
             WHERE owner_kind = 'symbol' AND kind = ?1 ORDER BY owner_id",
        )?;
        let rows = stmt
            .query_map(params![kind.as_str()], |r| {
                Ok((SymbolId(r.get(0)?), r.get(1)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// All metric rows of one kind for file owners, ordered by owner id.
    pub fn file_metrics(&self, kind: MetricKind) -> Result<Vec<(FileId, f64)>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT owner_id, value FROM metrics \
             WHERE owner_kind = 'file' AND kind = ?1 ORDER BY owner_id",
        )?;
        let rows = stmt
            .query_map(params![kind.as_str()], |r| Ok((FileId(r.get(0)?), r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Upsert metric rows outside a write batch, in one transaction. Used by
    /// the algorithm layer after a full recompute.
    pub fn put_metrics(&self, metrics: &[MetricWrite]) -> Result<(), StoreError> {
        if metrics.is_empty() {
            return Ok(());
        }
        let mut conn = self.conn();
        let tx = conn.transaction()?;
        {
            let mut stmt = tx.prepare(
                "INSERT OR REPLACE INTO metrics (owner_kind, owner_id, kind, value) \
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            for metric in metrics {
                let (owner_kind, owner_id) = owner_key(metric.owner);
                stmt.execute(params![owner_kind, owner_id, metric.kind.as_str(), metric.value])?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    pub fn upsert_vcs_stats(&self, file: FileId, stats: &VcsStats) -> Result<(), StoreError> {
        self.conn().execute(
            "INSERT OR REPLACE INTO vcs_stats \
             (file_id, commit_count, total_churn, distinct_authors, blame_age_days, entropy) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                file.0,
                stats.commit_count,
                stats.total_churn as i64,
                stats.distinct_authors,
                stats.blame_age_days,
                stats.entropy,
            ],
        )?;
        Ok(())
    }

    pub fn vcs_stats(&self, file: FileId) -> Result<Option<VcsStats>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT commit_count, total_churn, distinct_authors, blame_age_days, entropy \
             FROM vcs_stats WHERE file_id = ?1",
        )?;
        let mut rows = stmt.query_map(params![file.0], vcs_from_row)?;
        Ok(rows.next().transpose()?)
    }

    pub fn vcs_stats_all(&self) -> Result<Vec<(FileId, VcsStats)>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT file_id, commit_count, total_churn, distinct_authors, blame_age_days, entropy \
             FROM vcs_stats ORDER BY file_id",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok((
                    FileId(r.get(0)?),
                    VcsStats {
                        commit_count: r.get(1)?,
                        total_churn: r.get::<_, i64>(2)? as u64,
                        distinct_authors: r.get(3)?,
                        blame_age_days: r.get(4)?,
                        entropy: r.get(5)?,
                    },
                ))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Mean complexity of each file's scored symbols. Files with no scored
    /// symbols are absent.
    pub fn file_mean_complexity(&self) -> Result<Vec<(FileId, f64)>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.file_id, AVG(m.value) FROM metrics m \
             JOIN symbols s ON m.owner_id = s.id \
             WHERE m.owner_kind = 'symbol' AND m.kind = 'complexity' \
             GROUP BY s.file_id ORDER BY s.file_id",
        )?;
        let rows = stmt
            .query_map([], |r| Ok((FileId(r.get(0)?), r.get(1)?)))?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Cross-file fan-in and fan-out per file, counting resolved edges whose
    /// endpoints live in different files.
    pub fn file_degrees(&self) -> Result<Vec<(FileId, u32, u32)>, StoreError> {
        let conn = self.conn();
        let mut degrees: std::collections::BTreeMap<i64, (u32, u32)> = Default::default();
        {
            let mut stmt = conn.prepare(
                "SELECT tgt.file_id, COUNT(*) FROM edges e \
                 JOIN symbols src ON e.source_symbol_id = src.id \
                 JOIN symbols tgt ON e.target_symbol_id = tgt.id \
                 WHERE src.file_id != tgt.file_id GROUP BY tgt.file_id",
            )?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, u32>(1)?)))?;
            for row in rows {
                let (file, count) = row?;
                degrees.entry(file).or_default().0 = count;
            }
        }
        {
            let mut stmt = conn.prepare(
                "SELECT src.file_id, COUNT(*) FROM edges e \
                 JOIN symbols src ON e.source_symbol_id = src.id \
                 JOIN symbols tgt ON e.target_symbol_id = tgt.id \
                 WHERE src.file_id != tgt.file_id GROUP BY src.file_id",
            )?;
            let rows = stmt.query_map([], |r| Ok((r.get::<_, i64>(0)?, r.get::<_, u32>(1)?)))?;
            for row in rows {
                let (file, count) = row?;
                degrees.entry(file).or_default().1 = count;
            }
        }
        Ok(degrees
            .into_iter()
            .map(|(file, (fan_in, fan_out))| (FileId(file), fan_in, fan_out))
            .collect())
    }

    /// Per file: (public symbol count, public symbols with no incoming edge).
    pub fn public_symbol_usage(&self) -> Result<Vec<(FileId, u32, u32)>, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.file_id, COUNT(*), \
               SUM(CASE WHEN NOT EXISTS \
                 (SELECT 1 FROM edges e WHERE e.target_symbol_id = s.id) \
               THEN 1 ELSE 0 END) \
             FROM symbols s WHERE s.visibility = 'public' \
             GROUP BY s.file_id ORDER BY s.file_id",
        )?;
        let rows = stmt
            .query_map([], |r| {
                Ok((FileId(r.get(0)?), r.get::<_, u32>(1)?, r.get::<_, u32>(2)?))
            })?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    /// Count of edges with no resolved target.
    pub fn unresolved_count(&self) -> Result<usize, StoreError> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*) FROM edges WHERE target_symbol_id IS NULL",
            [],
            |r| r.get(0),
        )?;
        Ok(count as usize)
    }

    /// Materialize a scope of the graph for the algorithm layer. Only
    /// resolved edges are exported; unresolved references have no node to
    /// attach to.
    pub fn export_scope(&self, scope: Scope) -> Result<GraphScope, StoreError> {
        match scope {
            Scope::Project => self.export_project(),
            Scope::Neighborhood { center, hops } => self.export_neighborhood(center, hops),
        }
    }

    fn export_project(&self) -> Result<GraphScope, StoreError> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT s.id, s.name, s.kind, s.file_id, f.path \
             FROM symbols s JOIN files f ON s.file_id = f.id \
             ORDER BY s.id",
        )?;
        let nodes = stmt
            .query_map([], scope_node_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        let mut stmt = conn.prepare(
            "SELECT source_symbol_id, target_symbol_id, kind FROM edges \
             WHERE source_symbol_id IS NOT NULL AND target_symbol_id IS NOT NULL \
             ORDER BY id",
        )?;
        let edges = stmt
            .query_map([], scope_edge_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        debug!(nodes = nodes.len(), edges = edges.len(), "exported project scope");
        Ok(GraphScope { nodes, edges })
    }

    /// Chunked breadth-first expansion from the center, following edges in
    /// both directions, then one pass to collect the edges among the
    /// discovered set.
    fn export_neighborhood(&self, center: SymbolId, hops: u32) -> Result<GraphScope, StoreError> {
        let chunk = self.chunk_size().min(SQL_CHUNK);
        let conn = self.conn();

        let mut seen: HashSet<i64> = HashSet::new();
        seen.insert(center.0);
        let mut frontier: Vec<i64> = vec![center.0];

        for _ in 0..hops {
            if frontier.is_empty() {
                break;
            }
            let mut next: Vec<i64> = Vec::new();
            for ids in frontier.chunks(chunk) {
                let marks = placeholders(ids.len());
                let sql = format!(
                    "SELECT source_symbol_id, target_symbol_id FROM edges \
                     WHERE source_symbol_id IS NOT NULL AND target_symbol_id IS NOT NULL \
                       AND (source_symbol_id IN ({marks}) OR target_symbol_id IN ({marks}))"
                );
                let mut stmt = conn.prepare(&sql)?;
                let rows = stmt.query_map(
                    params_from_iter(ids.iter().chain(ids.iter())),
                    |r| Ok((r.get::<_, i64>(0)?, r.get::<_, i64>(1)?)),
                )?;
                for row in rows {
                    let (source, target) = row?;
                    for id in [source, target] {
                        if seen.insert(id) {
                            next.push(id);
                        }
                    }
                }
            }
            next.sort_unstable();
            frontier = next;
        }

        let mut members: Vec<i64> = seen.iter().copied().collect();
        members.sort_unstable();

        let mut nodes = Vec::with_capacity(members.len());
        for ids in members.chunks(chunk) {
            let sql = format!(
                "SELECT s.id, s.name, s.kind, s.file_id, f.path \
                 FROM symbols s JOIN files f ON s.file_id = f.id \
                 WHERE s.id IN ({}) ORDER BY s.id",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt
                .query_map(params_from_iter(ids.iter()), scope_node_from_row)?
                .collect::<Result<Vec<_>, _>>()?;
            nodes.extend(rows);
        }

        let mut edges = Vec::new();
        for ids in members.chunks(chunk) {
            let sql = format!(
                "SELECT source_symbol_id, target_symbol_id, kind FROM edges \
                 WHERE source_symbol_id IN ({}) AND target_symbol_id IS NOT NULL \
                 ORDER BY id",
                placeholders(ids.len())
            );
            let mut stmt = conn.prepare(&sql)?;
            let rows = stmt.query_map(params_from_iter(ids.iter()), scope_edge_from_row)?;
            for row in rows {
                let edge = row?;
                if seen.contains(&edge.target.0) {
                    edges.push(edge);
                }
            }
        }

        debug!(
            center = center.0,
            hops,
            nodes = nodes.len(),
            edges = edges.len(),
            "exported neighborhood scope"
        );
        Ok(GraphScope { nodes, edges })
    }
}

fn owner_key(owner: MetricOwner) -> (&'static str, i64) {
    match owner {
        MetricOwner::Symbol(id) => ("symbol", id.0),
        MetricOwner::File(id) => ("file", id.0),
    }
}

fn scope_node_from_row(row: &Row<'_>) -> rusqlite::Result<ScopeNode> {
    Ok(ScopeNode {
        id: SymbolId(row.get(0)?),
        name: row.get(1)?,
        kind: SymbolKind::parse_tag(&row.get::<_, String>(2)?),
        file: FileId(row.get(3)?),
        path: row.get(4)?,
    })
}

fn scope_edge_from_row(row: &Row<'_>) -> rusqlite::Result<ScopeEdge> {
    Ok(ScopeEdge {
        source: SymbolId(row.get(0)?),
        target: SymbolId(row.get(1)?),
        kind: EdgeKind::parse_tag(&row.get::<_, String>(2)?),
    })
}

fn vcs_from_row(row: &Row<'_>) -> rusqlite::Result<VcsStats> {
    Ok(VcsStats {
        commit_count: row.get(0)?,
        total_churn: row.get::<_, i64>(1)? as u64,
        distinct_authors: row.get(2)?,
        blame_age_days: row.get(3)?,
        entropy: row.get(4)?,
    })
}
