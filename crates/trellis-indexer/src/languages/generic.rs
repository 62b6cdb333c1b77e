//! Line-oriented fallback for languages with no grammar.
//!
//! Regex scan for definition-like lines and import-like lines. Everything it
//! produces is heuristic: references carry Heuristic origin so downstream
//! edges get a reduced confidence, and complexity comes from the indentation
//! approximation.

use std::sync::LazyLock;

use regex::Regex;
use trellis_core::SymbolKind;

use super::LanguageExtractor;
use crate::complexity;
use crate::extractor::{Extraction, RawReference, RawReferenceKind, SymbolDraft};

pub struct GenericExtractor;

static DEFINITION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"^\s*(?:pub\s+|export\s+|public\s+|private\s+|static\s+|async\s+)*(?P<kw>fn|def|func|function|sub|proc|class|struct|interface|trait|module)\s+(?P<name>[A-Za-z_][A-Za-z0-9_]*)",
    )
    .expect("invalid definition regex")
});

static IMPORT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^\s*(?:import|require|use|include|from)\s+["'<]?(?P<module>[A-Za-z0-9_./-]+)"#)
        .expect("invalid import regex")
});

impl LanguageExtractor for GenericExtractor {
    fn extract(&self, _path: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let lines: Vec<&str> = content.lines().collect();

        for (row, line) in lines.iter().enumerate() {
            let line_no = row as u32 + 1;

            if let Some(captures) = DEFINITION.captures(line) {
                let Some(name) = captures.name("name") else {
                    continue;
                };
                let Some(keyword) = captures.name("kw") else {
                    continue;
                };
                let kind = kind_for(keyword.as_str());
                let end_row = body_end(&lines, row);

                let mut draft =
                    SymbolDraft::new(kind, name.as_str(), name.as_str().to_string());
                draft.line_start = line_no;
                draft.line_end = end_row as u32 + 1;
                draft.signature = Some(line.trim().chars().take(160).collect());
                if matches!(kind, SymbolKind::Function) {
                    let body = lines[row..=end_row].join("\n");
                    draft.complexity = Some(complexity::indentation_score(&body));
                }
                extraction.symbols.push(draft);
                continue;
            }

            if let Some(captures) = IMPORT.captures(line) {
                if let Some(module) = captures.name("module") {
                    let written = module.as_str();
                    let stem = written
                        .rsplit(['/', '.'])
                        .next()
                        .unwrap_or(written)
                        .to_string();
                    if stem.is_empty() {
                        continue;
                    }
                    let mut reference =
                        RawReference::heuristic(RawReferenceKind::Import, stem, line_no);
                    reference.detail = Some(written.to_string());
                    extraction.references.push(reference);
                }
            }
        }
        extraction
    }
}

fn kind_for(keyword: &str) -> SymbolKind {
    match keyword {
        "class" => SymbolKind::Class,
        "struct" => SymbolKind::Struct,
        "interface" => SymbolKind::Interface,
        "trait" => SymbolKind::Trait,
        "module" => SymbolKind::Module,
        _ => SymbolKind::Function,
    }
}

/// Last row of the indented block opened at `start`: the run of following
/// lines that are blank or indented deeper than the definition line.
fn body_end(lines: &[&str], start: usize) -> usize {
    let base = indent_of(lines[start]);
    let mut end = start;
    for (offset, line) in lines[start + 1..].iter().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        if indent_of(line) <= base {
            break;
        }
        end = start + 1 + offset;
    }
    end
}

fn indent_of(line: &str) -> usize {
    line.chars()
        .take_while(|c| *c == ' ' || *c == '\t')
        .map(|c| if c == '\t' { 4 } else { 1 })
        .sum()
}
