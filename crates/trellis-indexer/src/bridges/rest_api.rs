//! Frontend HTTP call sites to backend route definitions.

use trellis_core::{EdgeKind, SymbolId, SymbolKind};

use super::{Bridge, BridgeTarget};
use crate::extractor::{RawReference, RawReferenceKind};
use crate::resolver::SymbolTable;

pub struct RestApiBridge;

impl Bridge for RestApiBridge {
    fn applies(&self, raw: &RawReference) -> bool {
        raw.kind == RawReferenceKind::HttpCall
    }

    fn resolve(&self, raw: &RawReference, table: &SymbolTable) -> Option<BridgeTarget> {
        let call_path = raw.name.as_str();

        // Score every route by how many literal segments it pins down; a
        // unique best match wins, a tie resolves to nothing.
        let mut best: Option<(usize, SymbolId)> = None;
        let mut tied = false;
        for route in table.of_kind(SymbolKind::Route) {
            let Some((_, route_path)) = route.qualified_name.split_once(' ') else {
                continue;
            };
            let Some(literal_segments) = match_path(route_path, call_path) else {
                continue;
            };
            match &best {
                Some((score, _)) if literal_segments < *score => {}
                Some((score, _)) if literal_segments == *score => tied = true,
                _ => {
                    best = Some((literal_segments, route.id));
                    tied = false;
                }
            }
        }

        let (_, id) = best?;
        if tied {
            return None;
        }
        Some(BridgeTarget {
            target: id,
            kind: EdgeKind::RestRoute,
            confidence: 0.7,
        })
    }
}

/// Match a concrete request path against a route template, returning the
/// number of literal segments when they line up. Parameter segments
/// (`:id`, `{id}`, `<id>`) match any one concrete segment.
fn match_path(template: &str, concrete: &str) -> Option<usize> {
    let template_segments: Vec<&str> = segments(template);
    let concrete_segments: Vec<&str> = segments(concrete);
    if template_segments.len() != concrete_segments.len() {
        return None;
    }

    let mut literals = 0;
    for (expected, actual) in template_segments.iter().zip(&concrete_segments) {
        if is_parameter(expected) {
            continue;
        }
        if expected != actual {
            return None;
        }
        literals += 1;
    }
    Some(literals)
}

fn segments(path: &str) -> Vec<&str> {
    path.trim_matches('/')
        .split('/')
        .filter(|s| !s.is_empty())
        .collect()
}

fn is_parameter(segment: &str) -> bool {
    segment.starts_with(':')
        || (segment.starts_with('{') && segment.ends_with('}'))
        || (segment.starts_with('<') && segment.ends_with('>'))
}
