//! Structured config scanners: dotenv files and YAML.
//!
//! Config files define the other side of env/config bridge edges: an
//! `.env` line `DATABASE_URL=...` becomes an EnvVariable symbol that
//! `os.getenv("DATABASE_URL")` call sites resolve to.

use std::path::Path;

use trellis_core::SymbolKind;

use super::LanguageExtractor;
use crate::extractor::{Extraction, SymbolDraft};

pub fn is_env_file(path: &str) -> bool {
    let name = Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("");
    name == ".env" || name.starts_with(".env.")
}

// ── dotenv ──────────────────────────────────────────────

pub struct EnvFileExtractor;

impl LanguageExtractor for EnvFileExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let mut keys = Vec::new();
        for item in dotenvy::from_read_iter(content.as_bytes()) {
            match item {
                Ok((key, _)) => keys.push(key),
                Err(_) => {
                    extraction.push_parse_error(path, "malformed dotenv line; partial extraction");
                    break;
                }
            }
        }

        for key in keys {
            let line = line_of_key(content, &key);
            let mut draft = SymbolDraft::new(SymbolKind::EnvVariable, &key, key.clone());
            draft.line_start = line;
            draft.line_end = line;
            extraction.symbols.push(draft);
        }
        extraction
    }
}

/// First line declaring `key`, allowing the `export KEY=` form.
fn line_of_key(content: &str, key: &str) -> u32 {
    for (row, line) in content.lines().enumerate() {
        let trimmed = line.trim_start();
        let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
        if let Some(rest) = trimmed.strip_prefix(key) {
            if rest.trim_start().starts_with('=') {
                return row as u32 + 1;
            }
        }
    }
    1
}

// ── YAML ────────────────────────────────────────────────

pub struct YamlExtractor;

impl LanguageExtractor for YamlExtractor {
    fn extract(&self, path: &str, content: &str) -> Extraction {
        let mut extraction = Extraction::default();
        let value: serde_yaml::Value = match serde_yaml::from_str(content) {
            Ok(value) => value,
            Err(err) => {
                extraction.push_parse_error(path, format!("yaml: {err}"));
                return extraction;
            }
        };

        let mut keys = Vec::new();
        collect_keys(&value, "", &mut keys);

        let mut lines = LineFinder::new(content);
        for dotted in keys {
            let last = dotted.rsplit('.').next().unwrap_or(&dotted);
            let line = lines.next_occurrence(last);
            let mut draft = SymbolDraft::new(SymbolKind::ConfigKey, last, dotted.clone());
            draft.line_start = line;
            draft.line_end = line;
            extraction.symbols.push(draft);
        }
        extraction
    }
}

/// Leaf keys as dotted paths (`database.pool.size`); sequences flatten
/// through without indexing so list-of-mappings keys still appear once each.
fn collect_keys(value: &serde_yaml::Value, prefix: &str, out: &mut Vec<String>) {
    match value {
        serde_yaml::Value::Mapping(mapping) => {
            for (key, child) in mapping {
                let Some(key) = key.as_str() else {
                    continue;
                };
                let dotted = if prefix.is_empty() {
                    key.to_string()
                } else {
                    format!("{prefix}.{key}")
                };
                match child {
                    serde_yaml::Value::Mapping(_) | serde_yaml::Value::Sequence(_) => {
                        collect_keys(child, &dotted, out);
                    }
                    _ => out.push(dotted),
                }
            }
        }
        serde_yaml::Value::Sequence(items) => {
            for item in items {
                collect_keys(item, prefix, out);
            }
        }
        _ => {}
    }
}

/// Assigns each key the first not-yet-consumed line that declares it, so
/// repeated key names under different parents land on distinct lines.
struct LineFinder<'a> {
    lines: Vec<&'a str>,
    consumed: Vec<bool>,
}

impl<'a> LineFinder<'a> {
    fn new(content: &'a str) -> Self {
        let lines: Vec<&str> = content.lines().collect();
        let consumed = vec![false; lines.len()];
        LineFinder { lines, consumed }
    }

    fn next_occurrence(&mut self, key: &str) -> u32 {
        for (row, line) in self.lines.iter().enumerate() {
            if self.consumed[row] {
                continue;
            }
            let trimmed = line.trim_start().trim_start_matches("- ");
            if let Some(rest) = trimmed.strip_prefix(key) {
                if rest.starts_with(':') {
                    self.consumed[row] = true;
                    return row as u32 + 1;
                }
            }
        }
        1
    }
}
