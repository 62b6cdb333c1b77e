//! C++ extractor.
//!
//! Thin over the C walker, which already understands the C++-only node kinds
//! (classes, namespaces, qualified method definitions).

use super::{LanguageExtractor, c};
use crate::extractor::Extraction;

pub struct CppExtractor;

impl LanguageExtractor for CppExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        c::run(&tree_sitter_cpp::LANGUAGE.into(), "cpp", path, content)
    }
}
