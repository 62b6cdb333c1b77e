//! Template references to their binding symbols.

use trellis_core::{EdgeKind, SymbolKind};

use super::{Bridge, BridgeTarget};
use crate::extractor::{RawReference, RawReferenceKind};
use crate::resolver::SymbolTable;

pub struct TemplateBridge;

impl Bridge for TemplateBridge {
    fn applies(&self, raw: &RawReference) -> bool {
        raw.kind == RawReferenceKind::TemplateVar
    }

    fn resolve(&self, raw: &RawReference, table: &SymbolTable) -> Option<BridgeTarget> {
        // Includes and dotted block references first: `detail` carries the
        // raw expression, whose dotted form may name `template.block`.
        if let Some(detail) = &raw.detail {
            let dotted = detail.trim();
            let blocks = table.of_kind(SymbolKind::TemplateBlock);
            let qualified: Vec<_> = blocks
                .iter()
                .filter(|b| b.qualified_name == dotted)
                .collect();
            if let [block] = qualified.as_slice() {
                return Some(BridgeTarget {
                    target: block.id,
                    kind: EdgeKind::TemplateBinding,
                    confidence: 0.7,
                });
            }
        }

        // Otherwise the bare name may bind a template block by stem.
        let blocks = table.of_kind(SymbolKind::TemplateBlock);
        let named: Vec<_> = blocks.iter().filter(|b| b.name == raw.name).collect();
        if let [block] = named.as_slice() {
            return Some(BridgeTarget {
                target: block.id,
                kind: EdgeKind::TemplateBinding,
                confidence: 0.7,
            });
        }
        None
    }
}
