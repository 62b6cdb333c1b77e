//! TypeScript extractor.
//!
//! Thin over the JavaScript walker; the TS grammars emit a superset of the JS
//! node kinds, so the only decision here is TSX versus plain TS.

use super::{LanguageExtractor, javascript};
use crate::extractor::Extraction;

pub struct TypeScriptExtractor;

impl LanguageExtractor for TypeScriptExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        let language = if path.ends_with(".tsx") {
            tree_sitter_typescript::LANGUAGE_TSX
        } else {
            tree_sitter_typescript::LANGUAGE_TYPESCRIPT
        };
        javascript::run(&language.into(), "typescript", path, content)
    }
}
