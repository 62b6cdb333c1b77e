//! Template scanner for Jinja-style and similar templates.
//!
//! Each template file contributes a TemplateBlock symbol for the file itself
//! plus one per `{% block %}`, and TemplateVar references for `{{ expr }}`
//! interpolations and `{% include %}` / `{% extends %}` targets. The
//! references are heuristic; the template bridge turns them into edges.

use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use trellis_core::SymbolKind;

use super::{LanguageExtractor, unquote};
use crate::extractor::{Extraction, RawReference, RawReferenceKind, SymbolDraft};

const TEMPLATE_EXTENSIONS: &[&str] = &[
    "html", "htm", "j2", "jinja", "jinja2", "tmpl", "tpl", "hbs", "ejs", "erb", "mustache",
];

pub fn is_template_file(path: &str) -> bool {
    Path::new(path)
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| TEMPLATE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

static INTERPOLATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\{\{-?\s*(?P<expr>[^}]+?)\s*-?\}\}").expect("invalid interpolation regex")
});

static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{%-?\s*(?P<tag>block|include|extends)\s+(?P<arg>[^%]+?)\s*-?%\}"#)
        .expect("invalid tag regex")
});

pub struct TemplateExtractor;

impl LanguageExtractor for TemplateExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::default();

        // The file itself is an includable unit, named by its stem.
        let stem = template_stem(path);
        if !stem.is_empty() {
            let mut draft = SymbolDraft::new(SymbolKind::TemplateBlock, &stem, stem.clone());
            draft.line_start = 1;
            draft.line_end = content.lines().count().max(1) as u32;
            extraction.symbols.push(draft);
        }

        for (row, line) in content.lines().enumerate() {
            let line_no = row as u32 + 1;

            for captures in TAG.captures_iter(line) {
                let (Some(tag), Some(arg)) = (captures.name("tag"), captures.name("arg")) else {
                    continue;
                };
                match tag.as_str() {
                    "block" => {
                        let name = arg.as_str().trim().to_string();
                        if name.is_empty() {
                            continue;
                        }
                        let qualified = format!("{stem}.{name}");
                        let mut draft =
                            SymbolDraft::new(SymbolKind::TemplateBlock, &name, qualified);
                        draft.line_start = line_no;
                        draft.line_end = line_no;
                        extraction.symbols.push(draft);
                    }
                    _ => {
                        // include/extends targets point at another template's
                        // stem.
                        let target = unquote(arg.as_str().trim());
                        let target_stem = template_stem(target);
                        if target_stem.is_empty() {
                            continue;
                        }
                        let mut reference = RawReference::heuristic(
                            RawReferenceKind::TemplateVar,
                            target_stem,
                            line_no,
                        );
                        reference.detail = Some(target.to_string());
                        extraction.references.push(reference);
                    }
                }
            }

            for captures in INTERPOLATION.captures_iter(line) {
                let Some(expr) = captures.name("expr") else {
                    continue;
                };
                let written = expr.as_str();
                let Some(root) = expression_root(written) else {
                    continue;
                };
                let mut reference =
                    RawReference::heuristic(RawReferenceKind::TemplateVar, root, line_no);
                reference.detail = Some(written.to_string());
                extraction.references.push(reference);
            }
        }
        extraction
    }
}

/// `templates/users/detail.html` names the template `detail`.
fn template_stem(path: &str) -> String {
    Path::new(path)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("")
        .to_string()
}

/// Leading identifier of an interpolation: `user.name | upper` binds `user`.
fn expression_root(expr: &str) -> Option<String> {
    let root: String = expr
        .trim()
        .chars()
        .take_while(|c| c.is_alphanumeric() || *c == '_')
        .collect();
    let starts_ok = root.chars().next().is_some_and(|c| c.is_alphabetic() || c == '_');
    (starts_ok && !root.is_empty()).then_some(root)
}
