//! Cross-file reference resolution.
//!
//! `resolve` is a pure function of (reference, symbol table, config), so the
//! outcome never depends on file processing order. The match order is fixed:
//! same file, same module, unique global name, bridges, then an optional
//! fuzzy pass. Two or more equally good candidates mean Unresolved; the
//! resolver never guesses.

use std::path::Path;

use dashmap::DashMap;
use fuzzy_matcher::FuzzyMatcher;
use fuzzy_matcher::skim::SkimMatcherV2;
use trellis_core::{EdgeKind, EdgeOrigin, ResolverConfig, SymbolId, SymbolKind};

use crate::bridges::BridgeRegistry;
use crate::extractor::{RawReference, RawReferenceKind};

/// One resolvable symbol as the resolver sees it.
#[derive(Debug, Clone, PartialEq)]
pub struct TableEntry {
    pub id: SymbolId,
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    /// Workspace-relative file path the symbol lives in.
    pub path: String,
}

/// Per-run symbol index. Thread-safe so parallel extraction results can be
/// inserted concurrently; every lookup sorts its candidates so reads are
/// deterministic regardless of insertion order.
#[derive(Default)]
pub struct SymbolTable {
    entries: DashMap<SymbolId, TableEntry>,
    by_qualified: DashMap<String, Vec<SymbolId>>,
    by_name: DashMap<String, Vec<SymbolId>>,
    by_file: DashMap<String, Vec<SymbolId>>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable::default()
    }

    pub fn insert(&self, entry: TableEntry) {
        self.by_qualified
            .entry(normalize(&entry.qualified_name))
            .or_default()
            .push(entry.id);
        self.by_name
            .entry(entry.name.clone())
            .or_default()
            .push(entry.id);
        self.by_file
            .entry(entry.path.clone())
            .or_default()
            .push(entry.id);
        self.entries.insert(entry.id, entry);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entry(&self, id: SymbolId) -> Option<TableEntry> {
        self.entries.get(&id).map(|e| e.value().clone())
    }

    pub fn ids_with_name(&self, name: &str) -> Vec<SymbolId> {
        let mut ids = self
            .by_name
            .get(name)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn ids_with_qualified(&self, qualified: &str) -> Vec<SymbolId> {
        let mut ids = self
            .by_qualified
            .get(&normalize(qualified))
            .map(|e| e.value().clone())
            .unwrap_or_default();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    pub fn ids_in_file(&self, path: &str) -> Vec<SymbolId> {
        let mut ids = self
            .by_file
            .get(path)
            .map(|e| e.value().clone())
            .unwrap_or_default();
        ids.sort_unstable();
        ids.dedup();
        ids
    }

    /// All entries of one kind, sorted by qualified name then id.
    pub fn of_kind(&self, kind: SymbolKind) -> Vec<TableEntry> {
        let mut entries: Vec<TableEntry> = self
            .entries
            .iter()
            .filter(|e| e.value().kind == kind)
            .map(|e| e.value().clone())
            .collect();
        entries.sort_by(|a, b| {
            a.qualified_name
                .cmp(&b.qualified_name)
                .then(a.id.cmp(&b.id))
        });
        entries
    }

    fn sorted_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.by_name.iter().map(|e| e.key().clone()).collect();
        names.sort_unstable();
        names
    }
}

/// `Outer::inner` and `Outer.inner` are the same logical path.
fn normalize(qualified: &str) -> String {
    qualified.replace("::", ".")
}

fn module_of(path: &str) -> String {
    Path::new(path)
        .parent()
        .and_then(|p| p.to_str())
        .unwrap_or("")
        .to_string()
}

/// Outcome of resolving one raw reference.
#[derive(Debug, Clone, PartialEq)]
pub enum Resolution {
    Resolved {
        target: SymbolId,
        kind: EdgeKind,
        origin: EdgeOrigin,
        confidence: f64,
    },
    Unresolved {
        candidates: u32,
    },
}

pub fn resolve(
    raw: &RawReference,
    origin_path: &str,
    table: &SymbolTable,
    bridges: &BridgeRegistry,
    cfg: &ResolverConfig,
) -> Resolution {
    // Same file.
    let local = matching(table, &table.ids_in_file(origin_path), raw);
    match local.len() {
        1 => return resolved(table, local[0], raw, 1.0),
        n if n >= 2 => return Resolution::Unresolved { candidates: n as u32 },
        _ => {}
    }

    // Same module (sibling files in the same directory).
    let module = module_of(origin_path);
    let global = candidate_ids(table, raw);
    let siblings: Vec<SymbolId> = global
        .iter()
        .copied()
        .filter(|id| {
            table
                .entry(*id)
                .is_some_and(|entry| module_of(&entry.path) == module)
        })
        .collect();
    match siblings.len() {
        1 => return resolved(table, siblings[0], raw, 0.9),
        n if n >= 2 => return Resolution::Unresolved { candidates: n as u32 },
        _ => {}
    }

    // Unique global match.
    match global.len() {
        1 => return resolved(table, global[0], raw, 0.8),
        n if n >= 2 => return Resolution::Unresolved { candidates: n as u32 },
        _ => {}
    }

    // Cross-language bridges.
    if let Some(target) = bridges.resolve(raw, table) {
        return Resolution::Resolved {
            target: target.target,
            kind: target.kind,
            origin: EdgeOrigin::Bridge,
            confidence: target.confidence,
        };
    }

    if cfg.fuzzy_enabled {
        if let Some(resolution) = fuzzy_resolve(raw, table, cfg) {
            return resolution;
        }
    }

    Resolution::Unresolved { candidates: 0 }
}

/// Candidates for the reference anywhere in the project: qualified match
/// when a qualifier was written, falling back to the bare name (the written
/// qualifier is often an import alias the table cannot see).
fn candidate_ids(table: &SymbolTable, raw: &RawReference) -> Vec<SymbolId> {
    if let Some(qualifier) = &raw.qualifier {
        let qualified = table.ids_with_qualified(&format!("{qualifier}.{}", raw.name));
        if !qualified.is_empty() {
            return qualified;
        }
    }
    table.ids_with_name(&raw.name)
}

/// Filter a candidate pool to the ones the written reference matches.
fn matching(table: &SymbolTable, pool: &[SymbolId], raw: &RawReference) -> Vec<SymbolId> {
    pool.iter()
        .copied()
        .filter(|id| {
            let Some(entry) = table.entry(*id) else {
                return false;
            };
            match &raw.qualifier {
                Some(qualifier) => {
                    normalize(&entry.qualified_name)
                        == normalize(&format!("{qualifier}.{}", raw.name))
                }
                None => entry.name == raw.name,
            }
        })
        .collect()
}

fn resolved(table: &SymbolTable, target: SymbolId, raw: &RawReference, confidence: f64) -> Resolution {
    let target_kind = table.entry(target).map(|e| e.kind);
    // Cross-language references are bridge edges no matter which step
    // found the target.
    let origin = match raw.kind {
        RawReferenceKind::HttpCall
        | RawReferenceKind::TemplateVar
        | RawReferenceKind::EnvRead => EdgeOrigin::Bridge,
        _ => raw.origin,
    };
    Resolution::Resolved {
        target,
        kind: edge_kind_for(raw.kind, target_kind),
        origin,
        confidence,
    }
}

/// Last-resort fuzzy pass. Only accepts a match when exactly one name
/// clears the score floor and that name is itself unambiguous.
fn fuzzy_resolve(
    raw: &RawReference,
    table: &SymbolTable,
    cfg: &ResolverConfig,
) -> Option<Resolution> {
    let matcher = SkimMatcherV2::default();
    let mut above_floor: Vec<(i64, String)> = Vec::new();
    for name in table.sorted_names() {
        if let Some(score) = matcher.fuzzy_match(&name, &raw.name) {
            if score >= cfg.fuzzy_min_score {
                above_floor.push((score, name));
            }
        }
    }
    if above_floor.is_empty() || above_floor.len() > cfg.max_ambiguous_candidates {
        return None;
    }
    above_floor.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
    if above_floor.len() >= 2 && above_floor[0].0 == above_floor[1].0 {
        return None;
    }
    let ids = table.ids_with_name(&above_floor[0].1);
    if ids.len() != 1 {
        return None;
    }
    Some(resolved(table, ids[0], raw, 0.6))
}

/// Edge kind from the reference kind, refined by what the target turned out
/// to be: inheriting from a trait or interface is Implements, instantiating
/// a concrete type is Instantiates.
pub(crate) fn edge_kind_for(raw: RawReferenceKind, target: Option<SymbolKind>) -> EdgeKind {
    match raw {
        RawReferenceKind::Call => EdgeKind::Calls,
        RawReferenceKind::Import => EdgeKind::Imports,
        RawReferenceKind::Inherit => match target {
            Some(SymbolKind::Trait) | Some(SymbolKind::Interface) => EdgeKind::Implements,
            _ => EdgeKind::Inherits,
        },
        RawReferenceKind::TypeUse => match target {
            Some(SymbolKind::Class) | Some(SymbolKind::Struct) => EdgeKind::Instantiates,
            _ => EdgeKind::TypeReference,
        },
        RawReferenceKind::HttpCall => EdgeKind::RestRoute,
        RawReferenceKind::TemplateVar => EdgeKind::TemplateBinding,
        RawReferenceKind::EnvRead => EdgeKind::ConfigBinding,
        RawReferenceKind::Other => EdgeKind::Reference,
    }
}
