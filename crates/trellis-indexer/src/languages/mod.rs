//! Language extractors.
//!
//! Closed registry: eight grammar-backed languages, structured config and
//! template scanners, and a line-oriented generic fallback. Extractors are
//! stateless unit structs; parsers are built per call inside the worker
//! thread, so the whole registry is `Send + Sync` by construction.

pub mod c;
pub mod config;
pub mod cpp;
pub mod generic;
pub mod go;
pub mod java;
pub mod javascript;
pub mod python;
pub mod rust;
pub mod template;
pub mod typescript;

use tree_sitter::{Node, Parser, Tree};
use trellis_core::Language;

use crate::extractor::Extraction;

/// One language's symbol-and-reference extractor. Infallible by contract:
/// malformed input degrades to partial output plus a diagnostic.
pub trait LanguageExtractor: Send + Sync {
    fn extract(&self, path: &str, content: &str) -> Extraction;
}

/// Route a file to its extractor.
pub fn extractor_for(path: &str, language: Language) -> &'static dyn LanguageExtractor {
    match language {
        Language::Rust => &rust::RustExtractor,
        Language::TypeScript => &typescript::TypeScriptExtractor,
        Language::JavaScript => &javascript::JavaScriptExtractor,
        Language::Python => &python::PythonExtractor,
        Language::Go => &go::GoExtractor,
        Language::Java => &java::JavaExtractor,
        Language::C => &c::CExtractor,
        Language::Cpp => &cpp::CppExtractor,
        Language::Yaml => &config::YamlExtractor,
        _ => {
            if config::is_env_file(path) {
                &config::EnvFileExtractor
            } else if template::is_template_file(path) {
                &template::TemplateExtractor
            } else {
                &generic::GenericExtractor
            }
        }
    }
}

pub fn has_grammar(language: Language) -> bool {
    matches!(
        language,
        Language::Rust
            | Language::TypeScript
            | Language::JavaScript
            | Language::Python
            | Language::Go
            | Language::Java
            | Language::C
            | Language::Cpp
    )
}

// ── Shared tree-sitter helpers ──────────────────────────

pub(crate) fn parse(language: &tree_sitter::Language, content: &str) -> Option<Tree> {
    let mut parser = Parser::new();
    parser.set_language(language).ok()?;
    parser.parse(content, None)
}

pub(crate) fn line_of(node: Node<'_>) -> u32 {
    node.start_position().row as u32 + 1
}

pub(crate) fn end_line_of(node: Node<'_>) -> u32 {
    node.end_position().row as u32 + 1
}

pub(crate) fn text<'a>(node: Node<'_>, source: &'a str) -> &'a str {
    node.utf8_text(source.as_bytes()).unwrap_or("")
}

/// First line of the definition, trimmed and bounded, as the signature.
pub(crate) fn signature_of(node: Node<'_>, source: &str) -> Option<String> {
    let line = text(node, source).lines().next()?.trim();
    if line.is_empty() {
        return None;
    }
    let mut sig: String = line.chars().take(160).collect();
    if let Some(stripped) = sig.strip_suffix('{') {
        sig = stripped.trim_end().to_string();
    }
    Some(sig)
}

/// Split a written callee path (`mod::f`, `obj.f`) into qualifier and name.
pub(crate) fn split_callee(written: &str) -> (Option<String>, String) {
    let written = written.trim();
    let colon = written.rfind("::");
    let dot = written.rfind('.');
    let split = match (colon, dot) {
        (Some(c), Some(d)) => Some(if c > d { (c, 2) } else { (d, 1) }),
        (Some(c), None) => Some((c, 2)),
        (None, Some(d)) => Some((d, 1)),
        (None, None) => None,
    };
    match split {
        Some((idx, sep_len)) => {
            let name = &written[idx + sep_len..];
            if name.is_empty() {
                (None, written.to_string())
            } else {
                (Some(written[..idx].to_string()), name.to_string())
            }
        }
        None => (None, written.to_string()),
    }
}

/// Strip matching string-literal quotes.
pub(crate) fn unquote(literal: &str) -> &str {
    let t = literal.trim();
    t.strip_prefix(['"', '\'', '`'])
        .and_then(|s| s.strip_suffix(['"', '\'', '`']))
        .unwrap_or(t)
}
