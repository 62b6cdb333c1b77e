//! Extraction framework shared by all language extractors.
//!
//! Extraction is pure per file and infallible by contract: malformed source
//! yields whatever symbols could be recovered plus a single ParseError
//! diagnostic. Resolution happens later, against the full symbol table; here
//! references are raw names with location context.

use trellis_core::{Diagnostic, DiagnosticKind, EdgeOrigin, FileRole, Language, SymbolKind, Visibility};

use crate::languages;

/// A symbol as the extractor sees it, before a store id is assigned.
#[derive(Debug, Clone, PartialEq)]
pub struct SymbolDraft {
    pub kind: SymbolKind,
    pub name: String,
    pub qualified_name: String,
    pub signature: Option<String>,
    pub line_start: u32,
    pub line_end: u32,
    pub visibility: Visibility,
    /// Cognitive complexity, scored at extraction time for callable kinds.
    pub complexity: Option<f64>,
}

impl SymbolDraft {
    pub fn new(kind: SymbolKind, name: impl Into<String>, qualified: impl Into<String>) -> Self {
        SymbolDraft {
            kind,
            name: name.into(),
            qualified_name: qualified.into(),
            signature: None,
            line_start: 0,
            line_end: 0,
            visibility: Visibility::Public,
            complexity: None,
        }
    }
}

/// What a raw (unresolved) reference points at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RawReferenceKind {
    Call,
    Import,
    Inherit,
    TypeUse,
    /// HTTP call site; `detail` carries the URL or path literal.
    HttpCall,
    /// Template variable or include; `detail` carries the raw expression.
    TemplateVar,
    /// Environment variable read; `name` is the key.
    EnvRead,
    Other,
}

/// A by-name reference found in a file, resolved later against the symbol
/// table.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReference {
    pub name: String,
    /// Qualifier as written (`module.name`, `Type::name`), if any.
    pub qualifier: Option<String>,
    pub kind: RawReferenceKind,
    /// How the reference was found; pattern-scanned references carry
    /// [`EdgeOrigin::Heuristic`] and a lower confidence downstream.
    pub origin: EdgeOrigin,
    pub line: u32,
    /// Index into the extraction's symbol list of the enclosing definition.
    pub enclosing: Option<usize>,
    /// Bridge payload: URL literal, template expression, config key.
    pub detail: Option<String>,
}

impl RawReference {
    pub fn new(kind: RawReferenceKind, name: impl Into<String>, line: u32) -> Self {
        RawReference {
            name: name.into(),
            qualifier: None,
            kind,
            origin: EdgeOrigin::Structural,
            line,
            enclosing: None,
            detail: None,
        }
    }

    pub fn heuristic(kind: RawReferenceKind, name: impl Into<String>, line: u32) -> Self {
        RawReference {
            origin: EdgeOrigin::Heuristic,
            ..RawReference::new(kind, name, line)
        }
    }
}

/// Everything one extractor produced for one file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Extraction {
    pub symbols: Vec<SymbolDraft>,
    pub references: Vec<RawReference>,
    pub diagnostics: Vec<Diagnostic>,
}

impl Extraction {
    pub fn push_parse_error(&mut self, path: &str, message: impl Into<String>) {
        self.diagnostics.push(Diagnostic {
            path: path.to_string(),
            kind: DiagnosticKind::ParseError,
            message: message.into(),
        });
    }
}

/// Extract one file through the closed registry.
///
/// Source files in languages with no grammar fall back to the generic
/// extractor and record a NoGrammar diagnostic so the report shows where
/// coverage is thin.
pub fn extract_file(path: &str, language: Language, role: FileRole, content: &str) -> Extraction {
    let extractor = languages::extractor_for(path, language);
    let mut extraction = extractor.extract(path, content);

    if role == FileRole::Source && !languages::has_grammar(language) {
        extraction.diagnostics.push(Diagnostic {
            path: path.to_string(),
            kind: DiagnosticKind::NoGrammar,
            message: format!("no grammar for {}; generic extraction used", language.as_str()),
        });
    }
    extraction
}
